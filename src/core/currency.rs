//! Currency codes, rate tables and the rate provider abstraction

use crate::core::error::{ConversionError, FetchError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Three letter currency code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(CurrencyCode(code))
        } else {
            Err(ConversionError::InvalidInput(format!(
                "Malformed currency code: '{s}'"
            )))
        }
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of multipliers relative to one base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: CurrencyCode,
    rates: BTreeMap<String, f64>,
    fetched_at: DateTime<Utc>,
}

impl RateTable {
    /// Builds a table from raw provider rates. Keys are uppercased and any
    /// non-finite, zero or negative rate is dropped.
    pub fn new(
        base: CurrencyCode,
        raw: impl IntoIterator<Item = (String, f64)>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut rates = BTreeMap::new();
        for (code, rate) in raw {
            let code = code.trim().to_ascii_uppercase();
            if !rate.is_finite() || rate <= 0.0 {
                warn!(base = %base, code = %code, rate, "Dropping invalid rate");
                continue;
            }
            rates.insert(code, rate);
        }

        RateTable {
            base,
            rates,
            fetched_at,
        }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code.as_str()).copied()
    }

    /// Currency codes in the table, sorted.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the raw rate map for `base` in a single attempt.
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<BTreeMap<String, f64>, FetchError>;
}
