//! reqwest implementation of [`AirtableApi`].

use crate::error::RemoteError;
use crate::traits::AirtableApi;
use crate::types::{
    BaseInfo, FieldDefinition, Fields, RecordUpdate, RemoteRecord, TableHandle, TableSchema,
    UpsertResult,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sync_core::config::MAX_RECORDS_PER_REQUEST;

/// Page size used when listing records.
const LIST_PAGE_SIZE: usize = 100;

/// Client for the Airtable Web API.
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct BasesPage {
    #[serde(default)]
    bases: Vec<BaseInfo>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct TablesResponse {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

#[derive(Deserialize)]
struct RecordsPage {
    #[serde(default)]
    records: Vec<RemoteRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<RemoteRecord>,
}

#[derive(Deserialize)]
struct DeletedRecord {
    id: String,
    #[serde(default)]
    deleted: bool,
}

#[derive(Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    records: Vec<DeletedRecord>,
}

impl AirtableClient {
    pub const DEFAULT_API_URL: &'static str = "https://api.airtable.com";

    /// Client against the public API.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(token, Self::DEFAULT_API_URL)
    }

    /// Client against another API root, e.g. a proxy or a local test server.
    pub fn with_api_url(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn records_url(&self, table: &TableHandle) -> String {
        self.url(&format!("/v0/{}/{}", table.base_id, table.table_id))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let err = RemoteError::from_response(status.as_u16(), &body);
            tracing::debug!("Airtable responded with an error: {err}");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            RemoteError::new(
                Some(status.as_u16()),
                None,
                format!("failed to decode response: {e}"),
            )
        })
    }
}

fn check_batch_size(len: usize) -> Result<(), RemoteError> {
    if len > MAX_RECORDS_PER_REQUEST {
        return Err(RemoteError::new(
            None,
            None,
            format!("batch of {len} records exceeds the limit of {MAX_RECORDS_PER_REQUEST} per request"),
        ));
    }
    Ok(())
}

fn fields_payload(records: &[Fields]) -> Vec<serde_json::Value> {
    records.iter().map(|fields| json!({ "fields": fields })).collect()
}

#[async_trait::async_trait]
impl AirtableApi for AirtableClient {
    async fn list_bases(&self) -> Result<Vec<BaseInfo>, RemoteError> {
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self.http.get(self.url("/v0/meta/bases"));
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset)]);
            }
            let page: BasesPage = self.send(request).await?;
            bases.extend(page.bases);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!("Listed {} bases", bases.len());
        Ok(bases)
    }

    async fn list_tables(&self, base_id: &str) -> Result<Vec<TableSchema>, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/v0/meta/bases/{base_id}/tables")));
        let response: TablesResponse = self.send(request).await?;
        Ok(response.tables)
    }

    async fn create_table(
        &self,
        base_id: &str,
        name: &str,
        fields: &[FieldDefinition],
    ) -> Result<TableSchema, RemoteError> {
        let request = self
            .http
            .post(self.url(&format!("/v0/meta/bases/{base_id}/tables")))
            .json(&json!({ "name": name, "fields": fields }));
        self.send(request).await
    }

    async fn list_record_ids(&self, table: &TableHandle) -> Result<Vec<String>, RemoteError> {
        let url = format!("{}/listRecords", self.records_url(table));
        let mut ids = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut body = json!({ "fields": [], "pageSize": LIST_PAGE_SIZE });
            if let Some(offset) = &offset {
                body["offset"] = json!(offset);
            }
            let page: RecordsPage = self.send(self.http.post(&url).json(&body)).await?;
            ids.extend(page.records.into_iter().map(|r| r.id));

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }

    async fn batch_create(
        &self,
        table: &TableHandle,
        records: &[Fields],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        check_batch_size(records.len())?;
        let request = self.http.post(self.records_url(table)).json(&json!({
            "records": fields_payload(records),
            "typecast": true,
        }));
        let response: RecordsResponse = self.send(request).await?;
        Ok(response.records)
    }

    async fn batch_update(
        &self,
        table: &TableHandle,
        records: &[RecordUpdate],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        check_batch_size(records.len())?;
        let request = self.http.patch(self.records_url(table)).json(&json!({
            "records": records,
            "typecast": true,
        }));
        let response: RecordsResponse = self.send(request).await?;
        Ok(response.records)
    }

    async fn batch_upsert(
        &self,
        table: &TableHandle,
        records: &[Fields],
        key_fields: &[String],
    ) -> Result<UpsertResult, RemoteError> {
        check_batch_size(records.len())?;
        let request = self.http.patch(self.records_url(table)).json(&json!({
            "performUpsert": { "fieldsToMergeOn": key_fields },
            "records": fields_payload(records),
            "typecast": true,
        }));
        self.send(request).await
    }

    async fn batch_delete(
        &self,
        table: &TableHandle,
        record_ids: &[String],
    ) -> Result<Vec<String>, RemoteError> {
        check_batch_size(record_ids.len())?;
        let query: Vec<(&str, &str)> = record_ids
            .iter()
            .map(|id| ("records[]", id.as_str()))
            .collect();
        let request = self.http.delete(self.records_url(table)).query(&query);
        let response: DeleteResponse = self.send(request).await?;
        Ok(response
            .records
            .into_iter()
            .filter(|r| r.deleted)
            .map(|r| r.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let client = AirtableClient::with_api_url("pat", "http://localhost:8080/");
        assert_eq!(client.url("/v0/meta/bases"), "http://localhost:8080/v0/meta/bases");
        assert_eq!(AirtableClient::new("pat").api_url(), "https://api.airtable.com");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = AirtableClient::new("patSECRET");
        assert!(!format!("{client:?}").contains("patSECRET"));
    }

    #[test]
    fn test_batch_size_limit() {
        assert!(check_batch_size(MAX_RECORDS_PER_REQUEST).is_ok());
        assert!(check_batch_size(MAX_RECORDS_PER_REQUEST + 1).is_err());
    }
}
