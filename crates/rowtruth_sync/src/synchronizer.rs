//! The retrying pass runner.

use crate::error::{SyncError, SyncResult};
use crate::filter::ViewFilter;
use crate::reconcile::{reconcile, SyncAction};
use crate::stream::IdAndChecksumSource;
use std::sync::Arc;

/// Configuration for synchronization passes.
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// Maximum number of passes attempted before giving up.
    pub max_attempts: u32,
}

impl SynchronizerConfig {
    /// Creates a configuration with the given attempt limit.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Creates a configuration that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1)
    }
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// The result of a completed pass.
#[derive(Debug, Clone)]
pub struct SyncPassReport {
    /// The salt both legs were checksummed under.
    pub salt: u64,
    /// How many passes were attempted, including the successful one.
    pub attempts: u32,
    /// The repairs the replica needs, ascending by object id.
    pub actions: Vec<SyncAction>,
}

/// Drives reconciliation passes between the truth store and one replica.
///
/// Each pass mints a fresh random salt, opens both checksum streams under
/// it, and merge-joins them. An aborted pass (stream failure, ordering
/// violation) retains no state; the next attempt starts over with a new
/// salt. Applying the resulting actions is the replica owner's job.
pub struct Synchronizer {
    truth: Arc<dyn IdAndChecksumSource>,
    replica: Arc<dyn IdAndChecksumSource>,
    config: SynchronizerConfig,
}

impl Synchronizer {
    /// Creates a synchronizer between a truth-side source and a replica.
    #[must_use]
    pub fn new(truth: Arc<dyn IdAndChecksumSource>, replica: Arc<dyn IdAndChecksumSource>) -> Self {
        Self {
            truth,
            replica,
            config: SynchronizerConfig::default(),
        }
    }

    /// Sets the pass configuration.
    #[must_use]
    pub fn with_config(mut self, config: SynchronizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs one reconciliation pass over the objects the filter selects,
    /// retrying aborted passes up to the configured limit.
    ///
    /// # Errors
    ///
    /// Returns a passes-exhausted error wrapping the last failure once the
    /// attempt limit is reached.
    pub fn run_pass(&self, filter: &dyn ViewFilter) -> SyncResult<SyncPassReport> {
        let mut last_error: Option<SyncError> = None;

        for attempt in 1..=self.config.max_attempts {
            let salt: u64 = rand::random();
            tracing::debug!(salt, attempt, "starting reconciliation pass");

            match self.attempt_pass(salt, filter) {
                Ok(actions) => {
                    tracing::info!(
                        salt,
                        attempt,
                        repairs = actions.len(),
                        "reconciliation pass complete"
                    );
                    return Ok(SyncPassReport {
                        salt,
                        attempts: attempt,
                        actions,
                    });
                }
                Err(e) => {
                    tracing::warn!(salt, attempt, error = %e, "reconciliation pass aborted");
                    last_error = Some(e);
                }
            }
        }

        Err(SyncError::PassesExhausted {
            attempts: self.config.max_attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts were made".to_string()),
        })
    }

    fn attempt_pass(&self, salt: u64, filter: &dyn ViewFilter) -> SyncResult<Vec<SyncAction>> {
        let truth_stream = self.truth.stream_ids_and_checksums(salt, filter)?;
        let replica_stream = self.replica.stream_ids_and_checksums(salt, filter)?;
        reconcile(truth_stream, replica_stream)
    }
}
