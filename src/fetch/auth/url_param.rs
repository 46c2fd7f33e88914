use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// `param_name` is the query parameter name (`"appid"` for OpenWeather) and
/// `key` is its value.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }

    /// Adds the key to a request in place.
    pub fn apply(&self, req: &mut reqwest::Request) {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.apply(&mut req);
        self.inner.execute(req).await
    }
}
