use crate::models::*;
use crate::processing::*;
use crate::utils::PassportError;

/// Runs the pure part of the extraction pipeline: block graph reduction
/// followed by per-nationality field resolution.
pub struct PassportExtractor<'a> {
    resolver: FieldResolver<'a>,
}

impl Default for PassportExtractor<'static> {
    fn default() -> Self {
        PassportExtractor {
            resolver: FieldResolver::default(),
        }
    }
}

impl<'a> PassportExtractor<'a> {
    pub fn new(mappings: &'a FieldMappings) -> Self {
        PassportExtractor {
            resolver: FieldResolver::new(mappings),
        }
    }

    pub fn extract(
        &self,
        nodes: &[AnnotatedNode],
        nationality_code: &str,
    ) -> Result<ResolvedRecord, PassportError> {
        // Step 1: Rebuild label -> value pairs from the block graph
        let fields = BlockGraphReducer::reduce(nodes);

        // Step 2: Map labels onto the canonical passport fields
        self.resolver.resolve(&fields, nationality_code)
    }
}
