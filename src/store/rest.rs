use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use crate::store::error::{BackendError, ServiceErrorBody};
use crate::store::traits::{DataService, ListQuery, Row, StorageService};

/// Client for the remote row service (`/rest/v1/<table>`) and its blob
/// storage (`/storage/v1/...`)
#[derive(Debug, Clone)]
pub struct RestDataService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestDataService {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for the data service")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn send(&self, relation: &str, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let err = classify_failure(relation, status, &text);
        warn!("{} request failed with {}: {}", relation, status, err);
        Err(err)
    }

    async fn rows(&self, relation: &str, request: RequestBuilder) -> Result<Vec<Row>, BackendError> {
        let response = self.send(relation, request).await?;
        response
            .json::<Vec<Row>>()
            .await
            .map_err(BackendError::from)
    }
}

/// Turn a non-success response into a classified error
pub fn classify_failure(relation: &str, status: StatusCode, text: &str) -> BackendError {
    let body: ServiceErrorBody = serde_json::from_str(text).unwrap_or_else(|_| ServiceErrorBody {
        message: Some(if text.is_empty() {
            status.to_string()
        } else {
            text.to_string()
        }),
        ..Default::default()
    });

    if body.code.is_none() {
        match status {
            StatusCode::NOT_FOUND => {
                return BackendError::RelationMissing {
                    relation: relation.to_string(),
                }
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => return BackendError::Timeout,
            _ => {}
        }
    }

    BackendError::from_service(relation, body)
}

fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{}", value)));
    }
    if let Some(column) = &query.order_by {
        params.push(("order".to_string(), format!("{}.asc", column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait::async_trait]
impl DataService for RestDataService {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Row>, BackendError> {
        debug!("GET {} {:?}", table, query);
        let request = self.client.get(self.table_url(table)).query(&list_params(query));
        self.rows(table, request).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        self.rows(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::unknown("insert returned no row"))
    }

    async fn update(&self, table: &str, row: Row, id: &str) -> Result<Row, BackendError> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&row);
        self.rows(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NotFound)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))]);
        self.send(table, request).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageService for RestDataService {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        let request = self.client.get(self.storage_url(&format!("bucket/{}", bucket)));
        let response = self.authorize(request).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            // the storage API answers 400 "Bucket not found" as well as 404
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(classify_failure(bucket, status, &text))
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let request = self.client.post(self.storage_url("bucket")).json(&serde_json::json!({
            "id": bucket,
            "name": bucket,
            "public": true,
        }));
        self.send(bucket, request).await?;
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.storage_url(&format!("object/{}/{}", bucket, path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send(bucket, request).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("object/public/{}/{}", bucket, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_follow_row_service_grammar() {
        let query = ListQuery::new().eq("ativo", "true").order_by("tipo").limit(10);
        assert_eq!(
            list_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("ativo".to_string(), "eq.true".to_string()),
                ("order".to_string(), "tipo.asc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_failure_classification() {
        let missing = classify_failure(
            "vidros",
            StatusCode::NOT_FOUND,
            r#"{"code":"PGRST205","message":"Could not find the table 'public.vidros'"}"#,
        );
        assert!(missing.is_relation_missing());

        let bare_404 = classify_failure("vidros", StatusCode::NOT_FOUND, "");
        assert!(bare_404.is_relation_missing());

        let fk = classify_failure(
            "trilhos",
            StatusCode::CONFLICT,
            r#"{"code":"23503","message":"violates foreign key constraint"}"#,
        );
        assert!(matches!(fk, BackendError::ForeignKeyViolation { .. }));

        let gateway = classify_failure("trilhos", StatusCode::GATEWAY_TIMEOUT, "upstream timeout");
        assert_eq!(gateway, BackendError::Timeout);

        let raw = classify_failure("trilhos", StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(raw.to_string(), "boom");
    }

    #[test]
    fn test_urls_are_built_from_trimmed_base() {
        let service =
            RestDataService::new("https://db.example.com/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(service.base_url(), "https://db.example.com");
        assert_eq!(
            service.public_url("catalogo", "vidros/1-a.png"),
            "https://db.example.com/storage/v1/object/public/catalogo/vidros/1-a.png"
        );
    }
}
