//! HTTP client wrapper.
//!
//! One configured `reqwest` client with a fixed base URL, a cookie store for
//! the session, a request timeout and a response interceptor: 401 and 403 are
//! handed to the [`AuthHandler`] exactly once and come back as terminal
//! errors; every other status passes through to the caller.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::navigation::{AuthHandler, LogAuthHandler};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Request payload.
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(reqwest::multipart::Form),
}

/// Configured request sender shared by every resource.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    login_url: String,
    upgrade_url: String,
    auth: Arc<dyn AuthHandler>,
}

impl ApiClient {
    /// Build the client from `config`, logging redirects by default.
    ///
    /// # Errors
    /// Returns `Error::Config` if the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;
        Ok(ApiClient {
            client,
            base: config.base_url.clone(),
            login_url: config.login_url.clone(),
            upgrade_url: config.upgrade_url.clone(),
            auth: Arc::new(LogAuthHandler),
        })
    }

    /// Replace the handler that performs the 401/403 redirects.
    pub fn with_auth_handler(mut self, auth: Arc<dyn AuthHandler>) -> Self {
        self.auth = auth;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL for `segments` under the base, each segment percent-encoded.
    ///
    /// # Errors
    /// Returns `Error::Config` if the base URL cannot carry a path.
    pub fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base URL cannot carry a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    /// URL for a relative `path` such as `"dbtc/fan/42"`.
    ///
    /// # Errors
    /// See [`ApiClient::endpoint`].
    pub fn url(&self, path: &str) -> Result<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.endpoint(&segments)
    }

    /// Send a request to `url` and run the response interceptor.
    ///
    /// # Errors
    /// - `Error::Unauthenticated` / `Error::Forbidden` after the handler redirected
    /// - `Error::NotFound`, `Error::Validation`, `Error::Server` for other failures
    /// - `Error::Timeout` / `Error::Network` when no response arrived
    pub async fn send(&self, method: Method, url: Url, body: RequestBody) -> Result<Response> {
        debug!("→ {} {}", method, url);
        let mut req = self.client.request(method.clone(), url.clone());
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(&value),
            RequestBody::Multipart(form) => req.multipart(form),
        };

        let resp = req.send().await?;
        debug!("← {} {} {}", method, url, resp.status());
        self.intercept(resp).await
    }

    /// Send to a relative `path`.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn request(&self, method: Method, path: &str, body: RequestBody) -> Result<Response> {
        let url = self.url(path)?;
        self.send(method, url, body).await
    }

    /// Send and decode a JSON response body.
    ///
    /// # Errors
    /// See [`ApiClient::send`]; `Error::Deserialization` for a mismatched body.
    pub async fn send_json<T: DeserializeOwned>(&self, method: Method, url: Url, body: RequestBody) -> Result<T> {
        let resp = self.send(method, url, body).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and ignore the response body.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn send_unit(&self, method: Method, url: Url, body: RequestBody) -> Result<()> {
        self.send(method, url, body).await?;
        Ok(())
    }

    /// GET a relative path and decode JSON.
    ///
    /// # Errors
    /// See [`ApiClient::send_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.send_json(Method::GET, url, RequestBody::Empty).await
    }

    async fn intercept(&self, resp: Response) -> Result<Response> {
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                self.auth.on_unauthenticated(&self.login_url);
                Err(Error::Unauthenticated {
                    redirect: self.login_url.clone(),
                })
            }
            StatusCode::FORBIDDEN => {
                self.auth.on_forbidden(&self.upgrade_url);
                Err(Error::Forbidden {
                    redirect: self.upgrade_url.clone(),
                })
            }
            s if s.is_success() || s.is_redirection() || s.is_informational() => Ok(resp),
            s => {
                let url = resp.url().to_string();
                let message = resp.text().await.unwrap_or_default();
                Err(status_error(s, url, message))
            }
        }
    }
}

fn status_error(status: StatusCode, url: String, message: String) -> Error {
    if status == StatusCode::NOT_FOUND {
        Error::NotFound(url)
    } else if status.is_server_error() {
        Error::Server {
            status: status.as_u16(),
            message,
        }
    } else {
        Error::Validation {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> ApiClient {
        let config = ClientConfig::default().with_base_url(base).unwrap();
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_relative_paths_stay_under_base() {
        let api = api("http://localhost:3003/api");
        assert_eq!(
            api.url("/dbtc/your-collection").unwrap().as_str(),
            "http://localhost:3003/api/dbtc/your-collection"
        );
        assert_eq!(
            api.url("dbtc/fan/42").unwrap().as_str(),
            "http://localhost:3003/api/dbtc/fan/42"
        );
    }

    #[test]
    fn test_segments_are_encoded() {
        let api = api("http://localhost:3003/api/");
        let url = api
            .endpoint(&["user", "settings", "yourCollectionView", "cards/gallery"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3003/api/user/settings/yourCollectionView/cards%2Fgallery"
        );
    }

    #[test]
    fn test_status_error_mapping() {
        let url = "http://x/y".to_string();
        assert!(status_error(StatusCode::NOT_FOUND, url.clone(), String::new()).is_not_found());
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, url.clone(), String::new()),
            Error::Server { status: 502, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, url, "name".into()),
            Error::Validation { status: 422, .. }
        ));
    }
}
