//! Where dashboard data comes from.
//!
//! [`DashboardSource`] and [`ProfileSource`] decouple the view and the admin session from
//! HTTP, so both can be driven by in-memory fakes in tests. [`HttpDashboardSource`] is the
//! real backend client.

use crate::config::{paths, DashboardConfig};
use crate::error::DashboardError;
use crate::model::DashboardPayload;
use crate::payload::parse_dashboard;
use crate::profile::AdminProfile;
use crate::timeout::TimeoutPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Supplies the raw dashboard record set.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Fetch the current record set and (optionally) backend stats.
    async fn fetch_dashboard(&self) -> Result<DashboardPayload, DashboardError>;
}

/// Supplies the signed-in admin's profile.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self) -> Result<AdminProfile, DashboardError>;
}

#[async_trait]
impl<T: DashboardSource + ?Sized> DashboardSource for Arc<T> {
    async fn fetch_dashboard(&self) -> Result<DashboardPayload, DashboardError> {
        (**self).fetch_dashboard().await
    }
}

#[async_trait]
impl<T: ProfileSource + ?Sized> ProfileSource for Arc<T> {
    async fn fetch_profile(&self) -> Result<AdminProfile, DashboardError> {
        (**self).fetch_profile().await
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Body of a create-key request. Validated on construction, the same way the backend
/// validates it (owner required, limit and window at least 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    owner_name: String,
    rate_limit: u64,
    window_seconds: u64,
}

impl NewApiKey {
    pub fn new(
        owner_name: impl Into<String>,
        rate_limit: u64,
        window_seconds: u64,
    ) -> Result<Self, DashboardError> {
        let owner_name = owner_name.into().trim().to_string();
        if owner_name.is_empty() {
            return Err(DashboardError::InvalidRequest("Owner name is required.".into()));
        }
        if rate_limit == 0 {
            return Err(DashboardError::InvalidRequest("Rate limit must be at least 1.".into()));
        }
        if window_seconds == 0 {
            return Err(DashboardError::InvalidRequest("Window must be at least 1 second.".into()));
        }
        Ok(Self { owner_name, rate_limit, window_seconds })
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn rate_limit(&self) -> u64 {
        self.rate_limit
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }
}

/// Backend acknowledgement of a created key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub owner_name: String,
}

// ids arrive as numbers from some backends and strings from others
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Backend client over HTTP.
///
/// Holds a cookie store so the session established by [`login`](Self::login) is sent on
/// every later call. Auth calls run under the configured timeout; the dashboard fetch does
/// not, because [`DashboardView`](crate::view::DashboardView) wraps it itself.
#[derive(Clone, Debug)]
pub struct HttpDashboardSource {
    client: reqwest::Client,
    config: Arc<DashboardConfig>,
    timeout: TimeoutPolicy,
}

impl HttpDashboardSource {
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-built client (custom TLS, proxies, ...).
    pub fn with_client(client: reqwest::Client, config: DashboardConfig) -> Self {
        let timeout = config.timeout_policy();
        Self { client, config: Arc::new(config), timeout }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Start a session. The backend answers with the admin profile.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminProfile, DashboardError> {
        let url = self.config.api_url(paths::LOGIN);
        self.timeout
            .execute(|| async {
                let response =
                    self.client.post(&url).json(&LoginRequest { username, password }).send().await?;
                let body = read_success(response).await?;
                AdminProfile::from_json(&body)
            })
            .await
    }

    /// Create an API key. Callers that show a dashboard should bump their
    /// [`ChangeSignal`](crate::view::ChangeSignal) afterwards so the view refetches.
    pub async fn create_key(&self, key: &NewApiKey) -> Result<CreatedApiKey, DashboardError> {
        let url = self.config.api_url(paths::CREATE_KEY);
        tracing::debug!(%url, owner = key.owner_name(), "creating api key");
        self.timeout
            .execute(|| async {
                let response = self.client.post(&url).json(key).send().await?;
                let body = read_success(response).await?;
                serde_json::from_slice(&body)
                    .map_err(|e| DashboardError::MalformedPayload(e.to_string()))
            })
            .await
    }

    /// End the session.
    pub async fn logout(&self) -> Result<(), DashboardError> {
        let url = self.config.api_url(paths::LOGOUT);
        self.timeout
            .execute(|| async {
                let response = self.client.post(&url).send().await?;
                read_success(response).await.map(|_| ())
            })
            .await
    }
}

#[async_trait]
impl DashboardSource for HttpDashboardSource {
    async fn fetch_dashboard(&self) -> Result<DashboardPayload, DashboardError> {
        let url = self.config.api_url(paths::DASHBOARD);
        tracing::debug!(%url, "fetching dashboard");
        let response = self.client.get(&url).send().await?;
        let body = read_success(response).await?;
        parse_dashboard(&body)
    }
}

#[async_trait]
impl ProfileSource for HttpDashboardSource {
    async fn fetch_profile(&self) -> Result<AdminProfile, DashboardError> {
        let url = self.config.api_url(paths::ME);
        self.timeout
            .execute(|| async {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let body = read_success(response).await?;
                AdminProfile::from_json(&body)
            })
            .await
    }
}

/// Body of a 2xx response, or the mapped [`DashboardError::Http`].
async fn read_success(response: reqwest::Response) -> Result<Vec<u8>, DashboardError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        Ok(body.to_vec())
    } else {
        Err(DashboardError::from_response(status.as_u16(), &String::from_utf8_lossy(&body)))
    }
}
