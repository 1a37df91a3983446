use crate::utils::PassportError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_type: String,
    pub content_length: u64,
    /// User metadata; keys are always lowercase.
    pub metadata: BTreeMap<String, String>,
}

/// Put/head access to object storage.
pub trait ObjectStore {
    fn put_object(&self, request: PutObjectRequest) -> Result<(), PassportError>;

    fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, PassportError>;
}

fn metadata_for(request: &PutObjectRequest) -> ObjectMetadata {
    ObjectMetadata {
        content_type: request.content_type.clone(),
        content_length: request.body.len() as u64,
        metadata: request
            .metadata
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect(),
    }
}

/// Resolves `<root>/<bucket>/<key>`, refusing anything that could escape `root`.
pub(crate) fn object_path(root: &Path, bucket: &str, key: &str) -> Result<PathBuf, PassportError> {
    let invalid_segment = |segment: &str| segment.is_empty() || segment == "." || segment == "..";

    if invalid_segment(bucket) || bucket.contains(['/', '\\']) {
        return Err(PassportError::StorageError(format!("Invalid bucket name: {:?}", bucket)));
    }
    if key.contains('\\') || key.split('/').any(invalid_segment) {
        return Err(PassportError::StorageError(format!("Invalid object key: {:?}", key)));
    }

    let mut path = root.join(bucket);
    path.extend(key.split('/'));
    Ok(path)
}

/// Appends `suffix` to the file name of `path`.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Object store laid out on the local filesystem, one directory per bucket.
/// Metadata lives in a `<key>.metadata.json` file next to the object.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    const METADATA_SUFFIX: &'static str = ".metadata.json";

    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FsObjectStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PassportError> {
        let path = object_path(&self.root, bucket, key)?;
        fs::read(&path).map_err(|e| {
            PassportError::StorageError(format!("Failed to read s3://{}/{}: {}", bucket, key, e))
        })
    }
}

impl ObjectStore for FsObjectStore {
    fn put_object(&self, request: PutObjectRequest) -> Result<(), PassportError> {
        let path = object_path(&self.root, &request.bucket, &request.key)?;
        let storage_error = |e: std::io::Error| {
            PassportError::StorageError(format!(
                "Failed to write s3://{}/{}: {}",
                request.bucket, request.key, e
            ))
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(storage_error)?;
        }
        fs::write(&path, &request.body).map_err(storage_error)?;

        let metadata = serde_json::to_vec_pretty(&metadata_for(&request))?;
        fs::write(with_suffix(&path, Self::METADATA_SUFFIX), metadata).map_err(storage_error)?;

        debug!("Stored {} bytes at {}", request.body.len(), path.display());
        Ok(())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, PassportError> {
        let path = object_path(&self.root, bucket, key)?;
        let json = fs::read(with_suffix(&path, Self::METADATA_SUFFIX)).map_err(|e| {
            PassportError::StorageError(format!("No such object s3://{}/{}: {}", bucket, key, e))
        })?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// In-process object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), (Vec<u8>, ObjectMetadata)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.read().ok()?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(body, _)| body.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(&self, request: PutObjectRequest) -> Result<(), PassportError> {
        let metadata = metadata_for(&request);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| PassportError::StorageError("Object store lock poisoned".to_string()))?;
        objects.insert((request.bucket, request.key), (request.body, metadata));
        Ok(())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, PassportError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| PassportError::StorageError("Object store lock poisoned".to_string()))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| PassportError::StorageError(format!("No such object s3://{}/{}", bucket, key)))
    }
}
