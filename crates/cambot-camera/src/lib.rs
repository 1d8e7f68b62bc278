//! Still-camera adapter: invokes the external capture binary.
//!
//! `libcamera-still` (or whatever `CAMERA_BIN` points at) writes the JPEG to
//! stdout. This adapter owns the camera-exclusivity lock and the wall-clock
//! timeout around each invocation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use cambot_core::camera::{CaptureError, CaptureOptions, StillCamera};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
    sync::Mutex,
    task::JoinHandle,
};
use tracing::debug;

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub binary: PathBuf,
    /// Hard wall-clock bound for one invocation; the process is killed when
    /// it expires.
    pub timeout: Duration,
}

/// Adapter for the external still-capture process.
pub struct StillCameraClient {
    cfg: CameraConfig,
    // At most one capture process may run at any instant, independent of how
    // many consumers exist. Held across the whole invocation.
    lock: Mutex<()>,
}

#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

impl StillCameraClient {
    pub fn new(cfg: CameraConfig) -> Self {
        Self {
            cfg,
            lock: Mutex::new(()),
        }
    }

    /// Argument list for one capture: fixed geometry/output flags first, then
    /// the configured extras in order. Entries with no value are bare flags.
    fn build_args(opts: &CaptureOptions) -> Vec<String> {
        let mut args = vec![
            "--width".to_string(),
            opts.width.to_string(),
            "--height".to_string(),
            opts.height.to_string(),
            "--encoding".to_string(),
            "jpg".to_string(),
            "--output".to_string(),
            "-".to_string(), // stream to stdout
        ];
        for (flag, value) in &opts.params {
            args.push(flag.clone());
            if let Some(value) = value {
                args.push(value.clone());
            }
        }
        args
    }

    async fn run_once(&self, opts: &CaptureOptions) -> Result<Vec<u8>, CaptureError> {
        let args = Self::build_args(opts);
        debug!(binary = %self.cfg.binary.display(), ?args, "starting capture process");

        let mut child = Command::new(&self.cfg.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.cfg.binary.display().to_string(),
                source,
            })?;

        // Drain both pipes in the background: the capture binary logs
        // verbosely on stderr, and a full pipe would wedge it mid-capture.
        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::Io(std::io::Error::other("capture stdout was not captured"))
        })?;
        let stdout_task: JoinHandle<std::io::Result<Vec<u8>>> = tokio::spawn(async move {
            let mut stdout = stdout;
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok(buf)
        });
        let stderr_task: Option<JoinHandle<StderrTail>> = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = StderrTail::default();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tail.push_line(line);
                }
                tail
            })
        });

        let status = match tokio::time::timeout(self.cfg.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                // kill() also reaps the child, so a successful kill leaves
                // nothing behind.
                return match child.kill().await {
                    Ok(()) => Err(CaptureError::Timeout {
                        timeout: self.cfg.timeout,
                    }),
                    Err(source) => Err(CaptureError::TimeoutUnkillable {
                        timeout: self.cfg.timeout,
                        source,
                    }),
                };
            }
        };

        if !status.success() {
            let stderr = match stderr_task {
                Some(task) => task.await.map(|t| t.snapshot()).unwrap_or_default(),
                None => String::new(),
            };
            return Err(CaptureError::Process { status, stderr });
        }

        stdout_task
            .await
            .map_err(|e| CaptureError::Io(std::io::Error::other(e)))?
            .map_err(CaptureError::Io)
    }
}

#[async_trait]
impl StillCamera for StillCameraClient {
    async fn capture(&self, opts: CaptureOptions) -> Result<Vec<u8>, CaptureError> {
        let _guard = self.lock.lock().await;
        self.run_once(&opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    fn opts() -> CaptureOptions {
        CaptureOptions {
            width: 1600,
            height: 1200,
            params: vec![],
        }
    }

    #[test]
    fn args_keep_fixed_flags_first_and_params_in_order() {
        let opts = CaptureOptions {
            width: 800,
            height: 600,
            params: vec![
                ("--rotation".to_string(), Some("180".to_string())),
                ("--hflip".to_string(), None),
            ],
        };

        let args = StillCameraClient::build_args(&opts);
        assert_eq!(
            args,
            vec![
                "--width", "800", "--height", "600", "--encoding", "jpg", "--output", "-",
                "--rotation", "180", "--hflip",
            ]
        );
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn client(binary: PathBuf, timeout: Duration) -> StillCameraClient {
            StillCameraClient::new(CameraConfig { binary, timeout })
        }

        #[tokio::test]
        async fn returns_stdout_bytes_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let bin = write_script(dir.path(), "fake-still", "printf 'JPEGDATA'");

            let camera = client(bin, Duration::from_secs(5));
            let bytes = camera.capture(opts()).await.unwrap();
            assert_eq!(bytes, b"JPEGDATA");
        }

        #[tokio::test]
        async fn nonzero_exit_is_a_process_error_with_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let bin = write_script(dir.path(), "fake-still", "echo boom >&2; exit 3");

            let camera = client(bin, Duration::from_secs(5));
            let err = camera.capture(opts()).await.unwrap_err();
            match err {
                CaptureError::Process { status, stderr } => {
                    assert_eq!(status.code(), Some(3));
                    assert!(stderr.contains("boom"));
                }
                other => panic!("expected process error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn missing_binary_is_a_spawn_error() {
            let camera = client(PathBuf::from("/nonexistent/fake-still"), Duration::from_secs(5));
            let err = camera.capture(opts()).await.unwrap_err();
            assert!(matches!(err, CaptureError::Spawn { .. }));
        }

        #[tokio::test]
        async fn overrunning_process_times_out_and_recovers() {
            let dir = tempfile::tempdir().unwrap();
            let slow_marker = dir.path().join("slow");
            let bin = write_script(
                dir.path(),
                "fake-still",
                &format!(
                    "if [ -e '{}' ]; then sleep 30; fi\nprintf 'IMG'",
                    slow_marker.display()
                ),
            );

            let camera = client(bin, Duration::from_millis(200));

            fs::write(&slow_marker, "").unwrap();
            let err = camera.capture(opts()).await.unwrap_err();
            assert!(matches!(err, CaptureError::Timeout { .. }));

            // The camera is free again: an unrelated capture right after the
            // timeout succeeds.
            fs::remove_file(&slow_marker).unwrap();
            let bytes = camera.capture(opts()).await.unwrap();
            assert_eq!(bytes, b"IMG");
        }

        #[tokio::test]
        async fn concurrent_captures_never_overlap() {
            let dir = tempfile::tempdir().unwrap();
            let lock_file = dir.path().join("busy");
            // `set -C` makes the redirect fail if the lock file already
            // exists, i.e. if another capture process is still running.
            let bin = write_script(
                dir.path(),
                "fake-still",
                &format!(
                    "set -C\nif ! echo $$ > '{lock}' 2>/dev/null; then exit 9; fi\nsleep 0.2\nrm -f '{lock}'\nprintf 'IMG'",
                    lock = lock_file.display()
                ),
            );

            let camera = Arc::new(client(bin, Duration::from_secs(5)));
            let (a, b) = tokio::join!(
                camera.capture(opts()),
                camera.capture(opts())
            );

            assert_eq!(a.unwrap(), b"IMG");
            assert_eq!(b.unwrap(), b"IMG");
        }
    }
}
