pub mod block;
pub mod fields;
pub mod mappings;

pub use block::*;
pub use fields::*;
pub use mappings::*;
