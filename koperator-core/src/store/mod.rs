mod errors;
pub use errors::{Result, StoreError};

mod store;
pub use store::{ClusterStore, NodeLabelSource, StoreOp};

mod memory_store;
pub use memory_store::{MemoryClusterStore, StaticNodeLabels};
