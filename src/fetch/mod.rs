//! Reading sources: HTTP plumbing and the OpenWeather air-pollution API.

mod basic;
mod client;
pub mod auth;
pub mod openweather;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use openweather::OpenWeatherSource;

use anyhow::Result;
use async_trait::async_trait;

use crate::observation::ObservationRow;

/// Supplies the current set of raw concentrations.
#[async_trait]
pub trait ReadingSource {
    async fn latest(&self) -> Result<ObservationRow>;
}

/// GETs `url` and returns the body. Non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("Request failed with status {}: {}", status, body));
    }

    Ok(resp.bytes().await?.to_vec())
}
