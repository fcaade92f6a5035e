pub mod error;
pub mod graph;
pub mod id;
pub mod ops;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use graph::{DataGraph, InputEdge};
pub use id::NodeId;
pub use ops::{CmpOp, Op, OpKind};
pub use types::{ConstValue, ValueType};
