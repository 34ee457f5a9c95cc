//! Progress reporting callback surface.

/// One progress emission. Sent at phase boundaries and every N chunks.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Phase label: "initializing", "sampling", "analyzing", "finalizing".
    pub stage: String,
    /// Best-effort completion percentage in [0, 100]; 0 when the total is
    /// unknown (streaming input with no size hint).
    pub percentage: f64,
    pub message: String,
    pub current_step: u64,
    pub total_steps: u64,
}

/// Host-supplied observer. Invoked synchronously from the pull loop, so it
/// should return quickly.
pub type ProgressCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
    every_chunks: u64,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>, every_chunks: u64) -> Self {
        Self {
            callback,
            every_chunks: every_chunks.max(1),
        }
    }

    pub fn phase(&self, stage: &str, message: String, step: u64, total: u64) {
        self.emit(ProgressUpdate {
            stage: stage.to_string(),
            percentage: if total == 0 {
                0.0
            } else {
                (step as f64 / total as f64 * 100.0).min(100.0)
            },
            message,
            current_step: step,
            total_steps: total,
        });
    }

    /// Chunk-cadence emission; only fires on the configured interval.
    pub fn chunk(&self, chunks_processed: u64, rows: u64) {
        if chunks_processed % self.every_chunks != 0 {
            return;
        }
        self.emit(ProgressUpdate {
            stage: "analyzing".to_string(),
            percentage: 0.0,
            message: format!("{rows} rows through {chunks_processed} chunks"),
            current_step: chunks_processed,
            total_steps: 0,
        });
    }

    fn emit(&self, update: ProgressUpdate) {
        if let Some(cb) = &self.callback {
            cb(&update);
        }
    }
}
