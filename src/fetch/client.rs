use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Wrappers such as [`super::auth::UrlParam`]
/// decorate a client before it reaches the network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
