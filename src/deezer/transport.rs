use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    Client, Url,
    cookie::Jar,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::Value;

use crate::error::TransportError;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36"
);

/// One HTTP exchange, without any retry or caching.
///
/// Non-2xx responses must be reported as [`TransportError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value, TransportError>;

    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Browser-like reqwest client carrying the `arl` session cookie.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(site_url: &str, arl: &str) -> Result<Self, TransportError> {
        let site = Url::parse(site_url).map_err(|e| TransportError::Network(e.to_string()))?;
        let domain = site.host_str().unwrap_or("www.deezer.com");
        let cookie_domain = domain.trim_start_matches("www.");

        let jar = Jar::default();
        jar.add_cookie_str(
            &format!("arl={arl}; Domain=.{cookie_domain}; Path=/"),
            &site,
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            header::ACCEPT_CHARSET,
            HeaderValue::from_static("utf-8,ISO-8859-1;q=0.8,*;q=0.7"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_provider(Arc::new(jar))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(url)
            .query(query)
            .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body.to_string())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
