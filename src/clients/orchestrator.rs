//! Orchestrator Service Client
//!
//! Talks to the orchestrator service that plans and runs multi-avatar
//! missions and owns the category/chat tree. Authenticated with an
//! `X-Api-Key` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{
    Category, Chat, Mission, NewMission, OrchestratorApi, OrchestratorCharacter,
    ResolvePhoneUpload, Scenario,
};

/// HTTP client for the orchestrator service.
pub struct OrchestratorHttpClient {
    pub base_url: String,
    api_key: String,
    http: Client,
}

impl OrchestratorHttpClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: Client::new(),
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            "PUT" => self.http.put(&url),
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
            .with_context(|| format!("Orchestrator API request failed: {} {}", method, path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Orchestrator API error: {} {} -> {}: {}",
                method,
                path,
                status.as_u16(),
                text
            );
        }

        let text = resp.text().await.unwrap_or_default();
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| {
            format!(
                "Orchestrator API returned non-JSON body for {} {}",
                method, path
            )
        })
    }

    fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
        serde_json::from_value(value).with_context(|| {
            format!("Orchestrator API returned an unexpected shape for {}", what)
        })
    }

    fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(value, what)
    }
}

#[async_trait]
impl OrchestratorApi for OrchestratorHttpClient {
    async fn list_characters(&self) -> Result<Vec<OrchestratorCharacter>> {
        let result = self.request("GET", "/characters", None).await?;
        Self::decode_list(result, "character list")
    }

    async fn add_characters(&self, ids: &[String]) -> Result<()> {
        let body = serde_json::json!({ "ids": ids });
        self.request("POST", "/characters", Some(body)).await?;
        Ok(())
    }

    async fn delete_character(&self, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request("DELETE", &format!("/characters/{}", encoded), None)
            .await?;
        Ok(())
    }

    async fn get_chat(&self, id: &str) -> Result<Chat> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/chats/{}", encoded), None)
            .await?;
        Self::decode(result, "chat")
    }

    async fn chat_characters(&self, id: &str) -> Result<Vec<OrchestratorCharacter>> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/chats/{}/characters", encoded), None)
            .await?;
        Self::decode_list(result, "chat character list")
    }

    async fn root_category(&self) -> Result<Category> {
        let result = self.request("GET", "/categories/root", None).await?;
        Self::decode(result, "root category")
    }

    async fn descendant_categories(&self, id: &str) -> Result<Vec<Category>> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/categories/{}/descendants", encoded), None)
            .await?;
        Self::decode_list(result, "descendant categories")
    }

    async fn chats_in_category(&self, id: &str) -> Result<Vec<Chat>> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/categories/{}/chats", encoded), None)
            .await?;
        Self::decode_list(result, "category chats")
    }

    async fn list_missions(&self) -> Result<Vec<Mission>> {
        let result = self.request("GET", "/missions", None).await?;
        Self::decode_list(result, "mission list")
    }

    async fn get_mission(&self, id: &str) -> Result<Mission> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/mission?id={}", encoded), None)
            .await?;
        Self::decode(result, "mission")
    }

    async fn delete_mission(&self, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request("DELETE", &format!("/mission?id={}", encoded), None)
            .await?;
        Ok(())
    }

    async fn create_mission(&self, mission: &NewMission) -> Result<Mission> {
        let body = serde_json::to_value(mission)?;
        let result = self.request("POST", "/missions", Some(body)).await?;
        Self::decode(result, "created mission")
    }

    async fn set_mission_description(&self, id: &str, description: &str) -> Result<()> {
        let body = serde_json::json!({ "id": id, "description": description });
        self.request("POST", "/mission/description", Some(body))
            .await?;
        Ok(())
    }

    async fn plan_mission(&self, id: &str) -> Result<Vec<Scenario>> {
        let body = serde_json::json!({ "id": id });
        let result = self.request("POST", "/missions/plan", Some(body)).await?;

        // Planning returns either a bare array or {"scenarios": [...]}.
        let scenarios = if result.is_array() {
            result
        } else {
            result["scenarios"].clone()
        };
        Self::decode_list(scenarios, "planned scenarios")
    }

    async fn run_mission(&self, id: &str) -> Result<()> {
        let body = serde_json::json!({ "id": id });
        self.request("POST", "/missions/run", Some(body)).await?;
        Ok(())
    }

    async fn upload_resolve_phone_results(&self, upload: ResolvePhoneUpload) -> Result<()> {
        let path = "/missions/resolve_phone_results";
        let url = format!("{}{}", self.base_url, path);

        let file_part = Part::bytes(upload.csv_bytes)
            .file_name(upload.file_name)
            .mime_str("text/csv")
            .context("Failed to build CSV multipart part")?;

        let mut form = Form::new().part("file", file_part);
        if let Some(mission_id) = upload.mission_id {
            form = form.text("mission_id", mission_id);
        }
        if let Some(batch_size) = upload.batch_size {
            form = form.text("batch_size", batch_size.to_string());
        }
        if let Some(extra) = upload.extra {
            form = form.text("params", extra.to_string());
        }

        let resp = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Orchestrator API request failed: POST {}", path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Orchestrator API error: POST {} -> {}: {}",
                path,
                status.as_u16(),
                text
            );
        }
        Ok(())
    }

    async fn mission_statistics(&self, mission_id: Option<&str>) -> Result<Value> {
        let path = match mission_id {
            Some(id) => format!("/missions/statistics?id={}", urlencoding::encode(id)),
            None => "/missions/statistics".to_string(),
        };
        self.request("GET", &path, None).await
    }

    async fn missions_with_statistics(&self) -> Result<Value> {
        self.request("GET", "/missions/missions-with-statistics", None)
            .await
    }

    async fn missions_with_exposure_and_stats(&self) -> Result<Value> {
        self.request("GET", "/missions/missions-with-exposure-and-stats", None)
            .await
    }
}
