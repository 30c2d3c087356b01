//! Validates conversion requests and serves them from cached or freshly
//! fetched rate tables.

use crate::core::cache::RateCache;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::currency::{CurrencyCode, RateProvider, RateTable};
use crate::core::error::{ConversionError, FetchError, Result};
use crate::providers::exchangerate_api::ExchangeRateApiProvider;
use crate::providers::util::{RetryPolicy, with_retry};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Decimal places kept in converted amounts.
pub const DISPLAY_PRECISION: i32 = 2;

/// Values too large to scale have no fractional digits left and pass through.
fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(DISPLAY_PRECISION);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() {
        return Err(ConversionError::InvalidInput(format!(
            "Amount must be a finite number, got {amount}"
        )));
    }
    if amount < 0.0 {
        return Err(ConversionError::InvalidInput(format!(
            "Amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}

pub struct CurrencyConverter<P: RateProvider> {
    provider: P,
    cache: RateCache,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl CurrencyConverter<ExchangeRateApiProvider> {
    /// Builds a converter talking to the provider described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let provider = ExchangeRateApiProvider::new(
            &config.provider.base_url,
            config.provider.api_key.clone(),
            config.request_timeout(),
        )?;
        Ok(Self::new(provider, config))
    }
}

impl<P: RateProvider> CurrencyConverter<P> {
    pub fn new(provider: P, config: &AppConfig) -> Self {
        Self::with_clock(
            provider,
            config.cache_ttl(),
            config.retry_policy(),
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        provider: P,
        ttl: chrono::Duration,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        CurrencyConverter {
            provider,
            cache: RateCache::new(ttl, Arc::clone(&clock)),
            clock,
            retry,
        }
    }

    /// Converts `amount` from one currency to another, rounded to
    /// [`DISPLAY_PRECISION`] decimal places.
    ///
    /// Identical source and target codes return `amount` untouched without
    /// consulting the provider.
    #[instrument(name = "Convert", skip(self))]
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        let result = self.try_convert(amount, from, to).await;
        if let Err(e) = &result {
            error!(amount, from, to, error = %e, "Conversion failed");
        }
        result
    }

    async fn try_convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        validate_amount(amount)?;
        let from: CurrencyCode = from.parse()?;
        let to: CurrencyCode = to.parse()?;

        if from == to {
            debug!("Same currency, returning amount unchanged");
            return Ok(amount);
        }

        let table = self.rates_for(&from).await?;
        let rate = table
            .rate(&to)
            .ok_or_else(|| ConversionError::UnknownCurrency {
                base: from.to_string(),
                code: to.to_string(),
            })?;

        let product = amount * rate;
        if !product.is_finite() {
            return Err(ConversionError::InvalidInput(format!(
                "Converting {amount} {from} at rate {rate} overflows"
            )));
        }
        let converted = round_to_precision(product);
        info!("Converted {} {} to {:.2} {}", amount, from, converted, to);
        Ok(converted)
    }

    /// Returns the rate table for `base`, from cache while fresh.
    #[instrument(name = "GetExchangeRates", skip(self))]
    pub async fn get_exchange_rates(&self, base: &str) -> Result<Arc<RateTable>> {
        let result = match base.parse::<CurrencyCode>() {
            Ok(code) => self.rates_for(&code).await,
            Err(e) => Err(e),
        };
        result.inspect_err(|e| {
            error!(base, error = %e, "Failed to fetch exchange rates");
        })
    }

    /// Currency codes the provider quotes against `base`, sorted.
    pub async fn supported_currencies(&self, base: &str) -> Result<Vec<String>> {
        let table = self.get_exchange_rates(base).await?;
        Ok(table.currencies().map(String::from).collect())
    }

    /// A fresh cached table for `base`, without fetching.
    pub async fn cached_rates(&self, base: &str) -> Option<Arc<RateTable>> {
        let base: CurrencyCode = base.parse().ok()?;
        self.cache.get(&base).await
    }

    async fn rates_for(&self, base: &CurrencyCode) -> Result<Arc<RateTable>> {
        if let Some(table) = self.cache.get(base).await {
            info!("Using cached rates for {}", base);
            return Ok(table);
        }

        let rates = with_retry(
            &self.retry,
            || self.provider.fetch_rates(base),
            FetchError::is_transient,
        )
        .await
        .map_err(|(source, attempts)| ConversionError::RateFetch {
            base: base.to_string(),
            attempts,
            source,
        })?;

        let table = Arc::new(RateTable::new(base.clone(), rates, self.clock.now()));
        self.cache.put(Arc::clone(&table)).await;
        info!("Successfully fetched rates for {}", base);
        Ok(table)
    }
}
