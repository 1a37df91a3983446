use crate::services::envelope::{ApiResponse, ProxyRequest};
use crate::storage::{ObjectStore, PutObjectRequest};
use crate::utils::PassportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Object metadata key holding the passport's nationality code.
pub const NATIONALITY_METADATA_KEY: &str = "passportnationality";
pub const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";
pub const FILENAME_PARAM: &str = "filename";

const INVALID_INPUT_MESSAGE: &str =
    "Invalid input. Must provide imageBase64, nationality and a filename query parameter.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody {
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default)]
    nationality: Option<String>,
}

/// A validated upload: target key, decoded image and nationality code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub key: String,
    pub image: Vec<u8>,
    pub nationality: String,
}

impl UploadRequest {
    pub fn parse(request: &ProxyRequest) -> Result<Self, PassportError> {
        let malformed = |reason: &str| PassportError::MalformedUpload(reason.to_string());

        let key = request
            .query_param(FILENAME_PARAM)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| malformed("missing filename query parameter"))?;

        let raw_body = request.body.as_deref().ok_or_else(|| malformed("missing body"))?;
        let body: UploadBody = serde_json::from_str(raw_body)
            .map_err(|e| PassportError::MalformedUpload(format!("body is not valid JSON: {}", e)))?;

        let image_base64 = body
            .image_base64
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| malformed("missing imageBase64"))?;
        // Codes are looked up exactly at extraction time, so store them trimmed
        let nationality = body
            .nationality
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| malformed("missing nationality"))?;

        let image = STANDARD
            .decode(image_base64.trim())
            .map_err(|e| PassportError::MalformedUpload(format!("imageBase64 is not valid base64: {}", e)))?;

        Ok(UploadRequest {
            key: key.to_string(),
            image,
            nationality,
        })
    }
}

/// Stores uploaded passport images with their nationality tag.
pub struct UploadHandler<S: ObjectStore> {
    store: S,
    bucket: String,
}

impl<S: ObjectStore> UploadHandler<S> {
    pub fn new(store: S, bucket: &str) -> Self {
        UploadHandler {
            store,
            bucket: bucket.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handle(&self, request: &ProxyRequest) -> ApiResponse {
        let upload = match UploadRequest::parse(request) {
            Ok(upload) => upload,
            Err(e) => {
                warn!("Rejected upload: {}", e);
                return ApiResponse::json(e.status_code(), json!({ "message": INVALID_INPUT_MESSAGE }));
            }
        };

        let key = upload.key.clone();
        match self.upload(upload) {
            Ok(()) => {
                info!("Uploaded s3://{}/{}", self.bucket, key);
                ApiResponse::json(200, json!({ "message": "Image uploaded successfully!" }))
                    .with_header("Access-Control-Allow-Origin", "*")
                    .with_header("Access-Control-Allow-Methods", "POST, OPTIONS")
                    .with_header("Access-Control-Allow-Credentials", "true")
            }
            Err(e) => {
                error!("Error uploading image to s3://{}/{}: {}", self.bucket, key, e);
                ApiResponse::json(
                    e.status_code(),
                    json!({ "message": "Failed to upload image.", "error": e.to_string() }),
                )
            }
        }
    }

    pub fn upload(&self, upload: UploadRequest) -> Result<(), PassportError> {
        let mut metadata = BTreeMap::new();
        metadata.insert(NATIONALITY_METADATA_KEY.to_string(), upload.nationality);

        self.store.put_object(PutObjectRequest {
            bucket: self.bucket.clone(),
            key: upload.key,
            body: upload.image,
            content_type: UPLOAD_CONTENT_TYPE.to_string(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, ObjectMetadata};
    use std::collections::HashMap;

    fn proxy_request(body: Option<serde_json::Value>, filename: Option<&str>) -> ProxyRequest {
        ProxyRequest {
            body: body.map(|b| b.to_string()),
            query_string_parameters: filename
                .map(|f| HashMap::from([(FILENAME_PARAM.to_string(), f.to_string())])),
        }
    }

    fn valid_request() -> ProxyRequest {
        proxy_request(
            Some(json!({ "imageBase64": STANDARD.encode("test-image"), "nationality": "UK" })),
            Some("test-image.jpg"),
        )
    }

    struct FailingStore;

    impl ObjectStore for FailingStore {
        fn put_object(&self, _request: PutObjectRequest) -> Result<(), PassportError> {
            Err(PassportError::StorageError("S3 upload failed".to_string()))
        }

        fn head_object(&self, _bucket: &str, _key: &str) -> Result<ObjectMetadata, PassportError> {
            Err(PassportError::StorageError("S3 head failed".to_string()))
        }
    }

    #[test]
    fn test_upload_stores_image_with_nationality() {
        let handler = UploadHandler::new(MemoryObjectStore::new(), "test-bucket");

        let response = handler.handle(&valid_request());

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body_json().unwrap()["message"], "Image uploaded successfully!");
        assert_eq!(
            response.headers.get("Access-Control-Allow-Methods").map(String::as_str),
            Some("POST, OPTIONS")
        );

        let store = handler.store();
        assert_eq!(store.get_object("test-bucket", "test-image.jpg"), Some(b"test-image".to_vec()));
        let head = store.head_object("test-bucket", "test-image.jpg").unwrap();
        assert_eq!(head.content_type, UPLOAD_CONTENT_TYPE);
        assert_eq!(head.metadata.get(NATIONALITY_METADATA_KEY).map(String::as_str), Some("UK"));
    }

    #[test]
    fn test_missing_inputs_are_rejected_without_storing() {
        let handler = UploadHandler::new(MemoryObjectStore::new(), "test-bucket");
        let image = STANDARD.encode("test-image");

        let cases = vec![
            proxy_request(None, None),
            proxy_request(Some(json!({ "imageBase64": image, "nationality": "UK" })), None),
            proxy_request(Some(json!({ "imageBase64": image, "nationality": "UK" })), Some("")),
            proxy_request(Some(json!({ "nationality": "UK" })), Some("a.jpg")),
            proxy_request(Some(json!({ "imageBase64": image })), Some("a.jpg")),
            proxy_request(Some(json!({ "imageBase64": image, "nationality": " " })), Some("a.jpg")),
            proxy_request(Some(json!({ "imageBase64": "***", "nationality": "UK" })), Some("a.jpg")),
            ProxyRequest {
                body: Some("not json".to_string()),
                ..proxy_request(None, Some("a.jpg"))
            },
        ];

        for request in cases {
            let response = handler.handle(&request);
            assert_eq!(response.status_code, 400, "request: {:?}", request);
            assert_eq!(response.body_json().unwrap()["message"], INVALID_INPUT_MESSAGE);
        }
        assert!(handler.store().is_empty());
    }

    #[test]
    fn test_storage_failure_is_server_error() {
        let handler = UploadHandler::new(FailingStore, "test-bucket");

        let response = handler.handle(&valid_request());

        assert_eq!(response.status_code, 500);
        let body = response.body_json().unwrap();
        assert_eq!(body["message"], "Failed to upload image.");
        assert_eq!(body["error"], "Storage error: S3 upload failed");
        assert!(response.headers.is_empty());
    }

    #[test]
    fn test_padded_nationality_is_stored_trimmed() {
        let handler = UploadHandler::new(MemoryObjectStore::new(), "test-bucket");
        let request = proxy_request(
            Some(json!({ "imageBase64": STANDARD.encode("test-image"), "nationality": " UK \t" })),
            Some("padded.jpg"),
        );

        let response = handler.handle(&request);

        assert_eq!(response.status_code, 200);
        let head = handler.store().head_object("test-bucket", "padded.jpg").unwrap();
        assert_eq!(head.metadata.get(NATIONALITY_METADATA_KEY).map(String::as_str), Some("UK"));
    }

    #[test]
    fn test_parse_decodes_payload() {
        let upload = UploadRequest::parse(&valid_request()).unwrap();
        assert_eq!(upload.key, "test-image.jpg");
        assert_eq!(upload.image, b"test-image".to_vec());
        assert_eq!(upload.nationality, "UK");
    }
}
