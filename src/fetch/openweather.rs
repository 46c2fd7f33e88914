//! OpenWeather `air_pollution` endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::auth::UrlParam;
use super::{BasicClient, HttpClient, ReadingSource, fetch_bytes};
use crate::observation::ObservationRow;
use crate::pollutant::Pollutant;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    dt: i64,
    main: AirPollutionMain,
    components: HashMap<String, Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionMain {
    aqi: Option<u8>,
}

/// Decodes the first entry of an `air_pollution` response body.
///
/// Component names the engine does not know are skipped.
pub fn parse_air_pollution(bytes: &[u8]) -> Result<ObservationRow> {
    let response: AirPollutionResponse =
        serde_json::from_slice(bytes).context("Failed to decode air pollution response")?;

    let entry = response
        .list
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Air pollution response has no entries"))?;

    let timestamp = DateTime::from_timestamp(entry.dt, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid reading timestamp {}", entry.dt))?;

    let mut row = ObservationRow::new(timestamp);
    row.provider_index = entry.main.aqi;
    for (name, value) in entry.components {
        match name.parse::<Pollutant>() {
            Ok(pollutant) => row.set(pollutant, value),
            Err(_) => debug!(component = %name, "Skipping unknown component"),
        }
    }

    Ok(row)
}

/// Current air pollution for one location.
pub struct OpenWeatherSource<C> {
    client: C,
    base_url: String,
    lat: f64,
    lon: f64,
}

impl<C: HttpClient> OpenWeatherSource<C> {
    pub fn new(client: C, base_url: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            lat,
            lon,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/data/2.5/air_pollution?lat={}&lon={}",
            self.base_url.trim_end_matches('/'),
            self.lat,
            self.lon
        )
    }
}

impl OpenWeatherSource<UrlParam<BasicClient>> {
    /// Source against the public API, authenticated with `appid`.
    pub fn with_api_key(api_key: &str, lat: f64, lon: f64) -> Result<Self> {
        let client = UrlParam::new(
            BasicClient::new().context("Failed to build HTTP client")?,
            "appid",
            api_key,
        );
        Ok(Self::new(client, DEFAULT_BASE_URL, lat, lon))
    }
}

#[async_trait]
impl<C: HttpClient> ReadingSource for OpenWeatherSource<C> {
    #[tracing::instrument(skip(self), fields(lat = self.lat, lon = self.lon))]
    async fn latest(&self) -> Result<ObservationRow> {
        let bytes = fetch_bytes(&self.client, &self.url()).await?;
        debug!(bytes = bytes.len(), "Air pollution response received");

        let row = parse_air_pollution(&bytes)?;
        info!(timestamp = %row.timestamp, provider_index = ?row.provider_index, "Fetched reading");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Answers every request with a fixed status and body, and keeps the
    /// last requested URL.
    struct FixedResponse {
        status: u16,
        body: &'static str,
        last_url: Mutex<Option<String>>,
    }

    impl FixedResponse {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                last_url: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl HttpClient for FixedResponse {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            *self.last_url.lock().unwrap() = Some(req.url().to_string());
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    const SAMPLE: &str = r#"{
        "coord": { "lon": 73.0479, "lat": 33.6844 },
        "list": [{
            "main": { "aqi": 4 },
            "components": {
                "co": 453.95, "no": 0.12, "no2": 14.4, "o3": 91.55,
                "so2": 9.01, "pm2_5": 48.33, "pm10": 70.21, "nh3": 9.88
            },
            "dt": 1752483600
        }]
    }"#;

    #[test]
    fn test_parse_air_pollution() {
        let row = parse_air_pollution(SAMPLE.as_bytes()).unwrap();

        assert_eq!(row.timestamp, Utc.timestamp_opt(1752483600, 0).unwrap());
        assert_eq!(row.provider_index, Some(4));
        assert_eq!(row.get(Pollutant::Co), Some(453.95));
        assert_eq!(row.get(Pollutant::Pm2_5), Some(48.33));
        assert_eq!(row.get(Pollutant::Nh3), Some(9.88));
    }

    #[test]
    fn test_parse_air_pollution_null_and_unknown_components() {
        let body = r#"{ "list": [{
            "main": { "aqi": null },
            "components": { "co": null, "pm1": 3.0, "o3": 60.0 },
            "dt": 1752483600
        }] }"#;
        let row = parse_air_pollution(body.as_bytes()).unwrap();
        assert_eq!(row.provider_index, None);
        assert_eq!(row.get(Pollutant::Co), None);
        assert_eq!(row.get(Pollutant::O3), Some(60.0));
    }

    #[test]
    fn test_parse_air_pollution_empty_list() {
        let err = parse_air_pollution(br#"{ "list": [] }"#).unwrap_err();
        assert!(err.to_string().contains("no entries"));
    }

    #[test]
    fn test_parse_air_pollution_malformed() {
        assert!(parse_air_pollution(b"<html>").is_err());
    }

    #[tokio::test]
    async fn test_latest_decodes_success_body() {
        let client = FixedResponse::new(200, SAMPLE);
        let source = OpenWeatherSource::new(client, "http://localhost", 33.6844, 73.0479);

        let row = source.latest().await.unwrap();

        assert_eq!(row.timestamp, Utc.timestamp_opt(1752483600, 0).unwrap());
        assert_eq!(row.provider_index, Some(4));
        assert_eq!(row.get(Pollutant::O3), Some(91.55));
        assert_eq!(row.get(Pollutant::Pm10), Some(70.21));
        assert_eq!(
            source.client.last_url.lock().unwrap().as_deref(),
            Some("http://localhost/data/2.5/air_pollution?lat=33.6844&lon=73.0479")
        );
    }

    #[tokio::test]
    async fn test_latest_non_success_status_is_error() {
        for status in [401, 500] {
            let client = FixedResponse::new(status, r#"{"cod":401,"message":"Invalid API key"}"#);
            let source = OpenWeatherSource::new(client, "http://localhost", 0.0, 0.0);

            let err = source.latest().await.unwrap_err();
            assert!(err.to_string().contains(&status.to_string()), "{err}");
        }
    }

    #[tokio::test]
    async fn test_latest_with_api_key_param() {
        let client = UrlParam::new(FixedResponse::new(200, SAMPLE), "appid", "secret");
        let source = OpenWeatherSource::new(client, "http://localhost", 1.5, 2.5);

        source.latest().await.unwrap();

        let url = source.client.inner.last_url.lock().unwrap().clone().unwrap();
        assert!(url.ends_with("lat=1.5&lon=2.5&appid=secret"), "{url}");
    }

    #[test]
    fn test_url() {
        let source = OpenWeatherSource::new(BasicClient::new().unwrap(), "http://localhost:8080/", 33.6844, 73.0479);
        assert_eq!(
            source.url(),
            "http://localhost:8080/data/2.5/air_pollution?lat=33.6844&lon=73.0479"
        );
    }
}
