//! Operator Service Client
//!
//! Talks to the operator service that runs browser-automation workers
//! per avatar. Paths are scoped by operator slot. This service carries
//! no API-key header; the asymmetry with the other two services is
//! inherited from the deployed configuration and preserved here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{
    ActivationStatus, OperatorApi, OtpSubmission, ProfileWorkerView, Scenario, ScenarioResult,
};

/// HTTP client for the operator service.
pub struct OperatorHttpClient {
    pub base_url: String,
    http: Client,
}

impl OperatorHttpClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: Client::new(),
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            "DELETE" => self.http.delete(&url),
            _ => self.http.get(&url),
        };

        builder = builder.header("Content-Type", "application/json");

        if let Some(b) = body {
            builder = builder.json(&b);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Operator API request failed: {} {}", method, path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Operator API error: {} {} -> {}: {}",
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
            format!("Operator API returned non-JSON body for {} {}", method, path)
        })
    }

    fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
        serde_json::from_value(value)
            .with_context(|| format!("Operator API returned an unexpected shape for {}", what))
    }
}

#[async_trait]
impl OperatorApi for OperatorHttpClient {
    async fn list_characters(&self, slot: u32) -> Result<Vec<ProfileWorkerView>> {
        let result = self
            .request("GET", &format!("/{}/characters", slot), None)
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(result, "character list")
    }

    async fn start_character(&self, slot: u32, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request(
            "POST",
            &format!("/{}/characters/{}/start", slot, encoded),
            None,
        )
        .await?;
        Ok(())
    }

    async fn stop_character(&self, slot: u32, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request(
            "POST",
            &format!("/{}/characters/{}/stop", slot, encoded),
            None,
        )
        .await?;
        Ok(())
    }

    async fn start_all(&self, slot: u32) -> Result<()> {
        self.request("POST", &format!("/{}/start", slot), None)
            .await?;
        Ok(())
    }

    async fn stop_all(&self, slot: u32) -> Result<()> {
        self.request("POST", &format!("/{}/stop", slot), None)
            .await?;
        Ok(())
    }

    async fn get_scenarios(&self, slot: u32) -> Result<Vec<ScenarioResult>> {
        let result = self
            .request("GET", &format!("/{}/scenario", slot), None)
            .await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(result, "scenario list")
    }

    async fn get_scenario(&self, slot: u32, id: &str) -> Result<ScenarioResult> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request("GET", &format!("/{}/scenario/{}", slot, encoded), None)
            .await?;
        Self::decode(result, "scenario")
    }

    async fn submit_scenario(&self, slot: u32, scenario: &Scenario) -> Result<String> {
        let body = serde_json::to_value(scenario)?;
        let result = self
            .request("POST", &format!("/{}/scenario", slot), Some(body))
            .await?;

        let id = result["id"]
            .as_str()
            .or_else(|| result["scenario_id"].as_str())
            .unwrap_or_default()
            .to_string();
        if id.is_empty() {
            anyhow::bail!("Operator API accepted a scenario but returned no id");
        }
        Ok(id)
    }

    async fn stop_scenario(&self, slot: u32, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request("DELETE", &format!("/{}/scenario/{}", slot, encoded), None)
            .await?;
        Ok(())
    }

    async fn activate_profile(&self, slot: u32, id: &str) -> Result<()> {
        let encoded = urlencoding::encode(id);
        self.request(
            "POST",
            &format!("/{}/characters/{}/activate", slot, encoded),
            None,
        )
        .await?;
        Ok(())
    }

    async fn activation_status(&self, slot: u32, id: &str) -> Result<ActivationStatus> {
        let encoded = urlencoding::encode(id);
        let result = self
            .request(
                "GET",
                &format!("/{}/characters/{}/activation_status", slot, encoded),
                None,
            )
            .await?;

        // The service returns either a bare string or {"status": "..."}.
        let status_value = if result.is_string() {
            result
        } else {
            result["status"].clone()
        };
        Self::decode(status_value, "activation status")
    }

    async fn submit_otp(&self, slot: u32, id: &str, otp: &OtpSubmission) -> Result<()> {
        let encoded = urlencoding::encode(id);
        let body = serde_json::to_value(otp)?;
        self.request(
            "POST",
            &format!("/{}/characters/{}/otp", slot, encoded),
            Some(body),
        )
        .await?;
        Ok(())
    }
}
