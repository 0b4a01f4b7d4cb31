use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, StatusCode},
};

use crate::model::Attachment;

/// Axum extractor for a photo upload sent as the raw request body
///
/// - Content-Type: MIME type of the file
/// - X-File-Name: Original file name (defaults to "photo")
#[async_trait]
impl<S> FromRequest<S> for Attachment
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = extract_header_value(req.headers(), "content-type")
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name =
            extract_header_value(req.headers(), "x-file-name").unwrap_or_else(|| "photo".to_string());

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| (rejection.status(), rejection.body_text()))?;

        Ok(Attachment {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_attachment_extraction() {
        let request = Request::builder()
            .header("content-type", "image/png")
            .header("x-file-name", "slim.png")
            .body(Body::from(vec![1u8, 2, 3]))
            .unwrap();

        let attachment = Attachment::from_request(request, &()).await.unwrap();
        assert_eq!(attachment.file_name, "slim.png");
        assert_eq!(attachment.content_type, "image/png");
        assert_eq!(attachment.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_headers_use_defaults() {
        let request = Request::builder().body(Body::from("x")).unwrap();

        let attachment = Attachment::from_request(request, &()).await.unwrap();
        assert_eq!(attachment.file_name, "photo");
        assert_eq!(attachment.content_type, "application/octet-stream");
    }
}
