//! Avatars Service Client
//!
//! Talks to the avatars/proxy inventory service. Authenticated with an
//! `X-Api-Key` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{Avatar, AvatarsApi, PatchAvatar, Proxy};

/// HTTP client for the avatars inventory service.
pub struct AvatarsHttpClient {
    pub base_url: String,
    api_key: String,
    http: Client,
}

impl AvatarsHttpClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: Client::new(),
        }
    }

    /// Send a request to the avatars service and return the JSON body.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            "PATCH" => self.http.patch(&url),
            "DELETE" => self.http.delete(&url),
            _ => self.http.get(&url),
        };

        builder = builder
            .header("Content-Type", "application/json")
            .header("X-Api-Key", &self.api_key);

        if let Some(b) = body {
            builder = builder.json(&b);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Avatars API request failed: {} {}", method, path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Avatars API error: {} {} -> {}: {}",
                method,
                path,
                status.as_u16(),
                text
            );
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = resp.text().await.unwrap_or_default();
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Avatars API returned non-JSON body for {} {}", method, path))
    }

    /// Decode a mandatory response body into `T`.
    fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
        serde_json::from_value(value)
            .with_context(|| format!("Avatars API returned an unexpected shape for {}", what))
    }
}

#[async_trait]
impl AvatarsApi for AvatarsHttpClient {
    async fn list_avatars(&self) -> Result<Vec<Avatar>> {
        let result = self.request("GET", "/avatars", None).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(result, "avatar list")
    }

    async fn get_avatar(&self, id: &str) -> Result<Avatar> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/avatars/{}", encoded), None)
            .await?;
        Self::decode(result, "avatar")
    }

    async fn patch_avatar(&self, id: &str, patch: &PatchAvatar) -> Result<Avatar> {
        let encoded = urlencoding::encode(id);
        let body = serde_json::to_value(patch)?;
        let result = self
            .request("PATCH", &format!("/avatars/{}", encoded), Some(body))
            .await?;
        Self::decode(result, "patched avatar")
    }

    async fn list_proxies(&self) -> Result<Vec<Proxy>> {
        let result = self.request("GET", "/proxies", None).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(result, "proxy list")
    }

    async fn assign_proxy(&self, avatar_id: &str, proxy_id: &str) -> Result<()> {
        let avatar = urlencoding::encode(avatar_id);
        let proxy = urlencoding::encode(proxy_id);
        self.request(
            "POST",
            &format!("/avatars/{}/proxy/{}", avatar, proxy),
            None,
        )
        .await?;
        Ok(())
    }

    async fn unassign_proxy(&self, avatar_id: &str) -> Result<()> {
        let avatar = urlencoding::encode(avatar_id);
        self.request("DELETE", &format!("/avatars/{}/proxy", avatar), None)
            .await?;
        Ok(())
    }
}
