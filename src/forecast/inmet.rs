//! HTTP access to the INMET per-municipality forecast endpoint.

use crate::forecast::error::ForecastError;
use crate::forecast::parse::parse_inmet_response;
use bon::bon;
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::pin::pin;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_URL_TEMPLATE: &str = "https://apiprevmet3.inmet.gov.br/previsao/{ibge}";
const URL_PLACEHOLDER: &str = "{ibge}";
const USER_AGENT: &str = concat!("inmet-humidity/", env!("CARGO_PKG_VERSION"));

/// `date -> RHmin` for one municipality.
pub type DayMap = BTreeMap<NaiveDate, Option<f64>>;

/// Client for the INMET forecast API, one request per IBGE code.
#[derive(Debug, Clone)]
pub struct InmetClient {
    client: Client,
    url_template: String,
    max_concurrent: usize,
    pause_every: usize,
    pause: Duration,
}

#[bon]
impl InmetClient {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `.url_template(String)`: Optional. URL with an `{ibge}` placeholder. Defaults to
    ///   [`DEFAULT_URL_TEMPLATE`].
    /// * `.timeout(Duration)`: Optional. Per-request timeout. Defaults to 8 seconds.
    /// * `.max_concurrent(usize)`: Optional. Requests in flight at once. Defaults to 16.
    /// * `.pause_every(usize)`: Optional. Completed requests between two courtesy pauses
    ///   towards the INMET API. Defaults to 200 (about 1000 forecast rows). `0` never pauses.
    /// * `.pause(Duration)`: Optional. Length of the courtesy pause. Defaults to 200 ms.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidUrlTemplate`] when the template lacks `{ibge}` and
    /// [`ForecastError::ClientBuild`] when the HTTP client cannot be created.
    #[builder]
    pub fn new(
        url_template: Option<String>,
        timeout: Option<Duration>,
        max_concurrent: Option<usize>,
        pause_every: Option<usize>,
        pause: Option<Duration>,
    ) -> Result<Self, ForecastError> {
        let url_template = url_template.unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());
        if !url_template.contains(URL_PLACEHOLDER) {
            return Err(ForecastError::InvalidUrlTemplate(url_template));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout.unwrap_or(Duration::from_secs(8)))
            .build()
            .map_err(ForecastError::ClientBuild)?;

        Ok(Self {
            client,
            url_template,
            max_concurrent: max_concurrent.unwrap_or(16).max(1),
            pause_every: pause_every.unwrap_or(200),
            pause: pause.unwrap_or(Duration::from_millis(200)),
        })
    }
}

impl InmetClient {
    pub fn forecast_url(&self, ibge: &str) -> String {
        self.url_template.replace(URL_PLACEHOLDER, ibge)
    }

    /// Fetches and parses the forecast of one municipality.
    pub async fn fetch_one(&self, ibge: &str) -> Result<DayMap, ForecastError> {
        let url = self.forecast_url(ibge);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ForecastError::NetworkRequest(url.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::HttpStatus { url, status });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ForecastError::JsonDecode(url.clone(), e))?;
        Ok(parse_inmet_response(ibge, &body))
    }

    /// Fetches every code with bounded concurrency.
    ///
    /// A failure for one municipality never fails the batch: it is logged and the
    /// municipality is simply absent from the result. Every `pause_every` completed
    /// requests, no new request starts for `pause`.
    pub async fn fetch_all(&self, codes: Vec<String>) -> HashMap<String, DayMap> {
        let total = codes.len();
        let mut responses = pin!(stream::iter(codes)
            .map(|code| async move {
                let result = self.fetch_one(&code).await;
                (code, result)
            })
            .buffer_unordered(self.max_concurrent));

        let mut forecasts = HashMap::with_capacity(total);
        let mut failures = 0usize;
        let mut completed = 0usize;
        while let Some((code, result)) = responses.next().await {
            match result {
                Ok(days) => {
                    forecasts.insert(code, days);
                }
                Err(e) => {
                    failures += 1;
                    debug!("Forecast fetch failed for {}: {}", code, e);
                }
            }

            completed += 1;
            if self.pause_every > 0 && completed % self.pause_every == 0 && completed < total {
                debug!("Fetched {} of {}, pausing {:?}", completed, total, self.pause);
                sleep(self.pause).await;
            }
        }

        if failures > 0 {
            warn!(
                "Forecast fetch failed for {} of {} municipalities",
                failures, total
            );
        }
        info!(
            "Fetched forecasts for {} of {} municipalities",
            forecasts.len(),
            total
        );
        forecasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Result<InmetClient, ForecastError> {
        InmetClient::builder()
            .url_template(format!("{}/previsao/{{ibge}}", server.uri()))
            .timeout(Duration::from_secs(2))
            .max_concurrent(4)
            .build()
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let result = InmetClient::builder()
            .url_template("https://example.org/previsao".to_string())
            .build();
        assert!(matches!(result, Err(ForecastError::InvalidUrlTemplate(_))));
    }

    #[test]
    fn test_default_template() -> Result<(), ForecastError> {
        let client = InmetClient::builder().build()?;
        assert_eq!(
            client.forecast_url("5300108"),
            "https://apiprevmet3.inmet.gov.br/previsao/5300108"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_one_parses_body() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/previsao/5300108"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "5300108": { "20/08/2024": { "umidade_min": 21 } }
            })))
            .mount(&server)
            .await;

        let days = client_for(&server)?.fetch_one("5300108").await?;
        let date = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
        assert_eq!(days.get(&date), Some(&Some(21.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_one_reports_http_status() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/previsao/0000000"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server)?.fetch_one("0000000").await;
        assert!(matches!(
            result,
            Err(ForecastError::HttpStatus { status, .. }) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failures() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/previsao/3550308"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "2024-08-20": { "umidade_min": 44 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/previsao/3304557"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let forecasts = client_for(&server)?
            .fetch_all(vec![
                "3550308".to_string(),
                "3304557".to_string(),
                "5300108".to_string(), // unmatched route -> 404
            ])
            .await;

        assert_eq!(forecasts.len(), 1);
        assert!(forecasts.contains_key("3550308"));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_all_pauses_between_batches() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "20/08/2024": { "umidade_min": 30 }
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = InmetClient::builder()
            .url_template(format!("{}/previsao/{{ibge}}", server.uri()))
            .max_concurrent(4)
            .pause_every(1)
            .pause(Duration::from_millis(100))
            .build()?;

        let started = std::time::Instant::now();
        let forecasts = client
            .fetch_all(vec![
                "5300108".to_string(),
                "3550308".to_string(),
                "3304557".to_string(),
            ])
            .await;

        assert_eq!(forecasts.len(), 3);
        // Two pauses: none after the last response.
        assert!(started.elapsed() >= Duration::from_millis(200));
        Ok(())
    }
}
