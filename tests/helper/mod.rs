//! Shared test doubles

pub mod catalog;
pub mod registry;

#[allow(unused_imports)]
pub use catalog::{MemoryCatalog, RecordingFetcher, artifact};
#[allow(unused_imports)]
pub use registry::MockImageRegistry;
