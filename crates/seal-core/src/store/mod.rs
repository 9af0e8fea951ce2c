pub mod memory;
pub mod types;

pub use memory::InMemoryRecordStore;
pub use types::{ChainHead, CommitConflict, CommitOutcome, RecordStore};
