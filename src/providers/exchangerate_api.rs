use crate::core::currency::{CurrencyCode, RateProvider};
use crate::core::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Fetches rate tables from an exchangerate-api style endpoint:
/// `GET {base_url}/{BASE}` returning `{"base": "USD", "rates": {...}}`.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("fxconv/0.1")
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(alias = "base_code")]
    base: Option<String>,
    rates: BTreeMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<BTreeMap<String, f64>, FetchError> {
        let url = format!("{}/{}", self.base_url, base);
        debug!("Requesting rates from {}", url);

        let mut request_url = reqwest::Url::parse(&url)
            .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        if let Some(key) = &self.api_key {
            request_url.query_pairs_mut().append_pair("access_key", key);
        }

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("{e} for base: {base} URL: {url}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("{e} while reading body for {base}")))?;

        let data: RatesResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::Payload(format!("Failed to parse JSON response for {base}: {e}"))
        })?;

        if let Some(reported) = data.base.as_deref() {
            if !reported.trim().eq_ignore_ascii_case(base.as_str()) {
                return Err(FetchError::Payload(format!(
                    "Requested rates for {base} but provider returned base {reported}"
                )));
            }
        }

        debug!(count = data.rates.len(), "Received rates");
        Ok(data.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "base": "USD",
        "date": "2024-01-01",
        "rates": {
            "EUR": 0.85,
            "GBP": 0.73,
            "JPY": 110.0
        }
    }"#;

    async fn create_mock_server(base: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/{base}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(uri: &str, api_key: Option<&str>) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(uri, api_key.map(String::from), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server = create_mock_server("USD", 200, MOCK_JSON).await;

        let rates = provider(&mock_server.uri(), None)
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(rates["EUR"], 0.85);
        assert_eq!(rates["JPY"], 110.0);
    }

    #[tokio::test]
    async fn test_base_code_alias_and_missing_base() {
        let mock_server = create_mock_server(
            "EUR",
            200,
            r#"{"result": "success", "base_code": "EUR", "rates": {"USD": 1.18}}"#,
        )
        .await;
        let rates = provider(&mock_server.uri(), None)
            .fetch_rates(&"EUR".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(rates["USD"], 1.18);

        let mock_server = create_mock_server("GBP", 200, r#"{"rates": {"USD": 1.37}}"#).await;
        let rates = provider(&mock_server.uri(), None)
            .fetch_rates(&"GBP".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(rates["USD"], 1.37);
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query_param() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/USD"))
            .and(query_param("access_key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rates = provider(&mock_server.uri(), Some("secret"))
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(rates["GBP"], 0.73);
    }

    #[tokio::test]
    async fn test_no_api_key_sends_no_query() {
        let mock_server = create_mock_server("USD", 200, MOCK_JSON).await;
        let provider = provider(&mock_server.uri(), Some("  "));

        provider.fetch_rates(&"USD".parse().unwrap()).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query().is_none());
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = create_mock_server("USD", 500, "").await;

        let result = provider(&mock_server.uri(), None)
            .fetch_rates(&"USD".parse().unwrap())
            .await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(
            err,
            FetchError::Status {
                status: 500,
                url: format!("{}/USD", mock_server.uri())
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        // "rate" instead of "rates"
        let mock_server = create_mock_server("USD", 200, r#"{"base": "USD", "rate": {}}"#).await;

        let err = provider(&mock_server.uri(), None)
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap_err();

        assert!(!err.is_transient());
        assert!(
            err.to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let mock_server = create_mock_server("USD", 200, "<html>oops</html>").await;

        let err = provider(&mock_server.uri(), None)
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Payload(_)));
    }

    #[tokio::test]
    async fn test_base_mismatch() {
        let mock_server = create_mock_server("EUR", 200, MOCK_JSON).await;

        let err = provider(&mock_server.uri(), None)
            .fetch_rates(&"EUR".parse().unwrap())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Malformed rates payload: Requested rates for EUR but provider returned base USD"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let err = provider("http://127.0.0.1:1", None)
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let err = provider("not a url", None)
            .fetch_rates(&"USD".parse().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert!(!err.is_transient());
    }
}
