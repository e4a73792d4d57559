use std::{future::Future, sync::Arc};

use moka::future::Cache;
use serde_json::{Value, json};
use tokio::{
    sync::{Mutex, RwLock},
    time::sleep,
};

use crate::{
    config::SessionSettings,
    deezer::transport::Transport,
    error::{ApiError, AuthError, TransportError},
    utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Memoized by request signature for the configured TTL.
    Cached,
    /// Always hits the network.
    Uncached,
}

/// Owner of the gateway token.
///
/// Cheap to share behind an `Arc`: every pipeline instance calls through the same
/// session. A caller that sees an expired token refreshes it only if nobody else
/// already did, then retries its own call.
pub struct Session {
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
    token: RwLock<Option<String>>,
    refresh_lock: Mutex<()>,
    cache: Cache<String, Value>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, settings: SessionSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.cache_capacity)
            .time_to_live(settings.cache_ttl)
            .build();

        Self {
            transport,
            settings,
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache,
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Fetches a fresh API token for the stored credential.
    ///
    /// A user id of zero means the credential is not valid. The caller must
    /// clear it instead of trying again.
    pub async fn authenticate(&self) -> Result<String, AuthError> {
        let current = self.token().await.unwrap_or_default();
        let query = self.gateway_query("deezer.getUserData", &current);

        let response = self
            .transport
            .post_json(&self.settings.gateway_url, &query, &json!({}))
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if has_error(&response) {
            return Err(AuthError::Unavailable(response["error"].to_string()));
        }

        let results = &response["results"];
        let user_id = match &results["USER"]["USER_ID"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
            _ => 0,
        };
        if user_id == 0 {
            return Err(AuthError::InvalidCredential);
        }

        let token = results["checkForm"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unavailable("no API token in user data".to_string()))?
            .to_string();

        log::debug!("authenticated as user {user_id}");
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Issues a gateway call and returns its `results` object.
    ///
    /// Expired tokens are refreshed and the same call is re-issued, at most
    /// `token_refresh_limit` times in a row.
    pub async fn call(
        &self,
        method: &str,
        body: Value,
        mode: RequestMode,
    ) -> Result<Value, ApiError> {
        let mut refreshes = 0u32;

        loop {
            let token = match self.token().await {
                Some(token) => token,
                None => {
                    self.refresh(None).await?;
                    self.token().await.unwrap_or_default()
                }
            };

            let response = match mode {
                RequestMode::Cached => self.cached_post(method, &body, &token).await?,
                RequestMode::Uncached => self.post(method, &body, &token).await?,
            };

            match into_results(method, response) {
                Err(ApiError::TokenExpired) => {
                    let limit = self.settings.token_refresh_limit;
                    refreshes += 1;
                    if refreshes > limit {
                        return Err(AuthError::RefreshLimit(limit).into());
                    }

                    log::debug!("{method}: token expired, refreshing ({refreshes})");
                    self.refresh(Some(token)).await?;
                    sleep(self.settings.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    /// Cached GET against the public catalog API, e.g. `album/302127`.
    pub async fn public_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!(
            "{}/{}",
            self.settings.public_api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let key = utils::request_signature(&url, "");

        if let Some(hit) = self.cache.get(&key).await {
            log::trace!("cache hit for {url}");
            return Ok(hit);
        }

        let response = self.with_retry(|| self.transport.get_json(&url)).await?;

        if response.get("error").is_some_and(|e| !e.is_null()) {
            return Err(ApiError::NotFound(path.to_string()));
        }

        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }

    /// Uncached GET of raw bytes. A 403 is returned at once, it is not retried here.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.with_retry(|| self.transport.get_bytes(url)).await
    }

    async fn refresh(&self, stale: Option<String>) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.token().await;
        if current.is_some() && current != stale {
            log::trace!("token already refreshed by another caller");
            return Ok(());
        }

        self.authenticate().await.map(|_| ())
    }

    async fn cached_post(
        &self,
        method: &str,
        body: &Value,
        token: &str,
    ) -> Result<Value, TransportError> {
        let key = utils::request_signature(method, &body.to_string());

        if let Some(hit) = self.cache.get(&key).await {
            log::trace!("cache hit for {method}");
            return Ok(hit);
        }

        let response = self.post(method, body, token).await?;
        if !has_error(&response) {
            self.cache.insert(key, response.clone()).await;
        }
        Ok(response)
    }

    async fn post(&self, method: &str, body: &Value, token: &str) -> Result<Value, TransportError> {
        let url = &self.settings.gateway_url;
        self.with_retry(|| {
            let query = self.gateway_query(method, token);
            async move { self.transport.post_json(url, &query, body).await }
        })
        .await
    }

    /// Retries every transport failure except 403 after a fixed delay.
    async fn with_retry<F, Fut, T>(&self, op: F) -> Result<T, TransportError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempts = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_forbidden() => return Err(err),
                Err(err) => {
                    attempts += 1;
                    if self
                        .settings
                        .transport_retries
                        .is_some_and(|max| attempts > max)
                    {
                        return Err(err);
                    }

                    log::debug!("transport error ({err}), retry {attempts}");
                    sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    fn gateway_query(&self, method: &str, token: &str) -> Vec<(String, String)> {
        vec![
            ("api_version".to_string(), "1.0".to_string()),
            ("api_token".to_string(), token.to_string()),
            ("input".to_string(), "3".to_string()),
            ("method".to_string(), method.to_string()),
            ("cid".to_string(), utils::correlation_id().to_string()),
        ]
    }
}

fn has_error(response: &Value) -> bool {
    match response.get("error") {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Splits a gateway response into its `results` or a typed error.
fn into_results(method: &str, mut response: Value) -> Result<Value, ApiError> {
    if !has_error(&response) {
        return Ok(response["results"].take());
    }

    let error = &response["error"];
    if error.get("VALID_TOKEN_REQUIRED").is_some() {
        Err(ApiError::TokenExpired)
    } else if error.get("DATA_ERROR").is_some() {
        Err(ApiError::NotFound(method.to_string()))
    } else {
        Err(ApiError::Unexpected(format!("{method}: {error}")))
    }
}
