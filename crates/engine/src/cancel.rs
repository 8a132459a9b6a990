use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BoqError, Result};

/// Cooperative cancellation flag shared between a caller and a combination run.
///
/// Checked between document loads and once more before emission starts. Never
/// consulted during the atomic write itself.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BoqError::Cancelled)
        } else {
            Ok(())
        }
    }
}
