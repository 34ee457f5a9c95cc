//! Streaming analysis engine: sources, memory governance, progress, and
//! the two-pass orchestrator.

mod memory;
mod orchestrator;
mod progress;
mod source;

pub use memory::{MemoryAction, MemoryManager};
pub use orchestrator::{EngineError, StreamingOrchestrator};
pub use progress::{ProgressCallback, ProgressUpdate};
pub use source::{CsvFileSource, MemorySource, RowBatch, RowSource};
