//! Notion-backed records store.
//!
//! The lead database keeps one page per contact with an `Email` property, a
//! local-format `Telefone` property and a `Data Agendada pelo Lead` text
//! property the relay writes the scheduled time back into.

use relay_common::error::RelayError;
use relay_engine::resolve::RecordsStore;

const NOTION_VERSION: &str = "2022-06-28";

/// Notion API client scoped to one lead database.
pub struct NotionRecords {
    http: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

impl NotionRecords {
    pub fn new(http: reqwest::Client, token: &str, database_id: &str) -> Self {
        Self::with_base_url(http, "https://api.notion.com", token, database_id)
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base_url(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: &str,
        database_id: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.to_string(),
            database_id: database_id.to_string(),
        }
    }

    /// Email/phone equality predicates, OR-combined when both are present.
    fn build_filter(email: Option<&str>, phone: Option<&str>) -> Option<serde_json::Value> {
        let mut predicates = Vec::new();
        if let Some(email) = email {
            predicates.push(serde_json::json!({
                "property": "Email",
                "email": { "equals": email }
            }));
        }
        if let Some(phone) = phone {
            predicates.push(serde_json::json!({
                "property": "Telefone",
                "phone_number": { "equals": phone }
            }));
        }
        match predicates.len() {
            0 => None,
            1 => Some(predicates.into_iter().next().unwrap()),
            _ => Some(serde_json::json!({ "or": predicates })),
        }
    }

    async fn query(&self, filter: serde_json::Value) -> Result<serde_json::Value, RelayError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/databases/{}/query",
                self.base_url, self.database_id
            ))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&serde_json::json!({ "filter": filter }))
            .send()
            .await
            .map_err(|e| RelayError::Records(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Records(format!(
                "query returned {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| RelayError::Records(e.to_string()))
    }

    /// First result in the store's return order, or None.
    fn first_result(response: &serde_json::Value) -> Option<&serde_json::Value> {
        response.get("results")?.as_array()?.first()
    }
}

impl RecordsStore for NotionRecords {
    async fn find_record(
        &self,
        email: Option<&str>,
        phone_query: Option<&str>,
    ) -> Result<Option<String>, RelayError> {
        let Some(filter) = Self::build_filter(email, phone_query) else {
            return Ok(None);
        };

        let response = self.query(filter).await?;
        Ok(Self::first_result(&response)
            .and_then(|page| page.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string))
    }

    async fn phone_by_email(&self, email: &str) -> Result<Option<String>, RelayError> {
        let filter = serde_json::json!({
            "property": "Email",
            "email": { "equals": email }
        });

        let response = self.query(filter).await?;
        let phone = Self::first_result(&response)
            .and_then(|page| page.pointer("/properties/Telefone/phone_number"))
            .and_then(|p| p.as_str())
            .map(str::to_string);
        Ok(phone)
    }

    async fn update_schedule(&self, record_id: &str, formatted: &str) -> Result<(), RelayError> {
        let payload = serde_json::json!({
            "properties": {
                "Data Agendada pelo Lead": {
                    "rich_text": [{ "text": { "content": formatted } }]
                }
            }
        });

        let resp = self
            .http
            .patch(format!("{}/v1/pages/{record_id}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::Records(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(RelayError::Records(format!("update returned {status}")));
        }

        tracing::debug!(record_id, "Schedule written back to records store");
        Ok(())
    }
}
