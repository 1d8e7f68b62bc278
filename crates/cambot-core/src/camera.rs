//! Still-camera port and the capture failure taxonomy.

use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;

/// Geometry and extra flags for one still capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    /// Extra flags in caller-supplied order. Entries with no value render as
    /// bare flags.
    pub params: Vec<(String, Option<String>)>,
}

/// Failure modes of one capture invocation, roughly in increasing severity.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("capture process failed ({status}): {stderr}")]
    Process { status: ExitStatus, stderr: String },

    #[error("capture timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The child survived the kill. Requires operator attention; the camera
    /// may stay busy until the process dies on its own.
    #[error("capture timed out after {timeout:?}, and the process could not be killed: {source}")]
    TimeoutUnkillable {
        timeout: Duration,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error during capture: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive still camera.
///
/// Implementations must guarantee at most one capture process runs at any
/// instant, whatever the caller does. The call blocks the consumer for the
/// whole invocation; that serialization is intentional.
#[async_trait]
pub trait StillCamera: Send + Sync {
    async fn capture(&self, opts: CaptureOptions) -> Result<Vec<u8>, CaptureError>;
}
