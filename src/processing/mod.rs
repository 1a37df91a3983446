pub mod block_graph;
pub mod field_resolver;

pub use block_graph::BlockGraphReducer;
pub use field_resolver::{FieldResolver, LabelMatcher};
