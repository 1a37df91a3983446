//! S3 object storage and Textract form analysis.
//!
//! The SDK clients are async; each backend drives them on a small runtime of
//! its own so the handlers stay synchronous.

use crate::models::{AnnotatedNode, Block, Relationship};
use crate::storage::{FormAnalyzer, ObjectMetadata, ObjectStore, PutObjectRequest};
use crate::utils::PassportError;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::types::{Document, FeatureType, S3Object};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Shared SDK configuration plus the runtime the SDK calls are driven on.
#[derive(Clone)]
pub struct AwsContext {
    runtime: Arc<Runtime>,
    config: aws_config::SdkConfig,
}

impl AwsContext {
    /// Loads credentials and region from the standard AWS provider chain.
    pub fn load() -> Result<Self, PassportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PassportError::InvalidConfiguration(format!("Failed to start AWS runtime: {}", e)))?;
        let config = runtime.block_on(aws_config::load_defaults(BehaviorVersion::latest()));
        Ok(AwsContext {
            runtime: Arc::new(runtime),
            config,
        })
    }
}

pub struct S3ObjectStore {
    context: AwsContext,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(context: &AwsContext) -> Self {
        S3ObjectStore {
            client: aws_sdk_s3::Client::new(&context.config),
            context: context.clone(),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(&self, request: PutObjectRequest) -> Result<(), PassportError> {
        let metadata: HashMap<String, String> = request.metadata.into_iter().collect();
        let put = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(request.body))
            .send();

        self.context.runtime.block_on(put).map_err(|e| {
            PassportError::StorageError(format!(
                "PutObject s3://{}/{} failed: {}",
                request.bucket,
                request.key,
                aws_sdk_s3::error::DisplayErrorContext(&e)
            ))
        })?;
        Ok(())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, PassportError> {
        let head = self.client.head_object().bucket(bucket).key(key).send();
        let output = self.context.runtime.block_on(head).map_err(|e| {
            PassportError::StorageError(format!(
                "HeadObject s3://{}/{} failed: {}",
                bucket,
                key,
                aws_sdk_s3::error::DisplayErrorContext(&e)
            ))
        })?;

        Ok(ObjectMetadata {
            content_type: output.content_type().unwrap_or_default().to_string(),
            content_length: output.content_length().unwrap_or(0).max(0) as u64,
            metadata: output
                .metadata()
                .map(|m| m.iter().map(|(k, v)| (k.to_lowercase(), v.clone())).collect())
                .unwrap_or_default(),
        })
    }
}

/// Synchronous AnalyzeDocument with the FORMS feature.
pub struct TextractFormAnalyzer {
    context: AwsContext,
    client: aws_sdk_textract::Client,
}

impl TextractFormAnalyzer {
    pub fn new(context: &AwsContext) -> Self {
        TextractFormAnalyzer {
            client: aws_sdk_textract::Client::new(&context.config),
            context: context.clone(),
        }
    }
}

impl FormAnalyzer for TextractFormAnalyzer {
    fn analyze_form(&self, bucket: &str, key: &str) -> Result<Vec<AnnotatedNode>, PassportError> {
        let document = Document::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();
        let request = self
            .client
            .analyze_document()
            .document(document)
            .feature_types(FeatureType::Forms)
            .send();

        let output = self.context.runtime.block_on(request).map_err(|e| {
            PassportError::AnalysisError(format!(
                "AnalyzeDocument s3://{}/{} failed: {}",
                bucket,
                key,
                DisplayErrorContext(&e)
            ))
        })?;
        debug!("Textract returned {} blocks for s3://{}/{}", output.blocks().len(), bucket, key);

        Ok(output.blocks().iter().map(|b| AnnotatedNode::from(block_from_sdk(b))).collect())
    }
}

/// Converts an SDK block into the wire shape shared with saved responses.
pub fn block_from_sdk(block: &aws_sdk_textract::types::Block) -> Block {
    Block {
        id: block.id().unwrap_or_default().to_string(),
        block_type: block.block_type().map(|t| t.as_str().to_string()).unwrap_or_default(),
        entity_types: block.entity_types().iter().map(|t| t.as_str().to_string()).collect(),
        text: block.text().map(str::to_string),
        selection_status: block.selection_status().map(|s| s.as_str().to_string()),
        relationships: block
            .relationships()
            .iter()
            .map(|rel| Relationship {
                relation_type: rel.r#type().map(|t| t.as_str().to_string()).unwrap_or_default(),
                ids: rel.ids().to_vec(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkRelation, NodeKind, NodeRole, SelectionState};
    use aws_sdk_textract::types::{
        Block as SdkBlock, BlockType, EntityType, Relationship as SdkRelationship, RelationshipType,
        SelectionStatus,
    };

    #[test]
    fn test_sdk_key_block_becomes_key_node() {
        let block = SdkBlock::builder()
            .id("k1")
            .block_type(BlockType::KeyValueSet)
            .entity_types(EntityType::Key)
            .relationships(
                SdkRelationship::builder()
                    .r#type(RelationshipType::Value)
                    .ids("v1")
                    .build(),
            )
            .relationships(
                SdkRelationship::builder()
                    .r#type(RelationshipType::Child)
                    .ids("w1")
                    .ids("w2")
                    .build(),
            )
            .build();

        let node = AnnotatedNode::from(block_from_sdk(&block));

        assert_eq!(node.id, "k1");
        assert_eq!(node.role(), Some(NodeRole::Key));
        assert_eq!(node.targets(LinkRelation::Value).collect::<Vec<_>>(), vec!["v1"]);
        assert_eq!(node.targets(LinkRelation::Child).collect::<Vec<_>>(), vec!["w1", "w2"]);
    }

    #[test]
    fn test_sdk_word_and_selection_blocks() {
        let word = SdkBlock::builder().id("w").block_type(BlockType::Word).text("Surname").build();
        let selection = SdkBlock::builder()
            .id("s")
            .block_type(BlockType::SelectionElement)
            .selection_status(SelectionStatus::Selected)
            .build();

        assert_eq!(
            AnnotatedNode::from(block_from_sdk(&word)).kind,
            NodeKind::Word("Surname".to_string())
        );
        assert_eq!(
            AnnotatedNode::from(block_from_sdk(&selection)).kind,
            NodeKind::Selection(SelectionState::Selected)
        );
    }
}
