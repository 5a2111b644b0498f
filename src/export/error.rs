use std::time::Duration;

use thiserror::Error;

/// Refresh failures; the previously published table stays live
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    #[error("snapshot store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
}

impl ExportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::StoreUnavailable(_) => "store_unavailable",
            ExportError::Timeout(_) => "timeout",
        }
    }
}
