use crate::models::{AnalyzeDocumentResponse, AnnotatedNode};
use crate::storage::object_store::{object_path, with_suffix};
use crate::utils::PassportError;
use log::debug;
use std::fs;
use std::path::PathBuf;

/// Form-style document analysis of a stored object.
pub trait FormAnalyzer {
    fn analyze_form(&self, bucket: &str, key: &str) -> Result<Vec<AnnotatedNode>, PassportError>;
}

/// Replays AnalyzeDocument responses saved as `<root>/<bucket>/<key>.json`.
pub struct SavedResponseAnalyzer {
    root: PathBuf,
}

impl SavedResponseAnalyzer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        SavedResponseAnalyzer { root: root.into() }
    }

    pub fn load_response<P: Into<PathBuf>>(path: P) -> Result<AnalyzeDocumentResponse, PassportError> {
        let path = path.into();
        let json = fs::read(&path).map_err(|e| {
            PassportError::AnalysisError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&json).map_err(|e| {
            PassportError::AnalysisError(format!("Malformed analysis response {}: {}", path.display(), e))
        })
    }
}

impl FormAnalyzer for SavedResponseAnalyzer {
    fn analyze_form(&self, bucket: &str, key: &str) -> Result<Vec<AnnotatedNode>, PassportError> {
        let path = with_suffix(&object_path(&self.root, bucket, key)?, ".json");
        let response = Self::load_response(path)?;
        debug!("Analysis of s3://{}/{} returned {} blocks", bucket, key, response.blocks.len());
        Ok(response.into_nodes())
    }
}

/// Returns the same nodes for every object.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer {
    nodes: Vec<AnnotatedNode>,
}

impl StaticAnalyzer {
    pub fn new(nodes: Vec<AnnotatedNode>) -> Self {
        StaticAnalyzer { nodes }
    }
}

impl FormAnalyzer for StaticAnalyzer {
    fn analyze_form(&self, _bucket: &str, _key: &str) -> Result<Vec<AnnotatedNode>, PassportError> {
        Ok(self.nodes.clone())
    }
}
