pub mod exchangerate_api;
pub mod util;

pub use exchangerate_api::ExchangeRateApiProvider;
pub use util::RetryPolicy;
