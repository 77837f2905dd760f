// File: src/process.rs
//
// Process Supervision and Output Draining
//
// One supervisor owns exactly one OS process plus the two background tasks
// that copy its stdout/stderr into a per-node log file. Termination is the
// only path that releases the process, and it always joins the drainers
// first so no background reader outlives the supervisor.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use log::{debug, trace, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{HarnessError, Result};

/// Combined stdout/stderr capture file, inside the node's working directory.
pub const LOG_FILE_NAME: &str = "node.log";

/// Shared append-only sink both drainers of one process write into.
pub type LogSink = Arc<Mutex<File>>;

/// Copy bytes from `reader` into `sink` until the producer closes the
/// stream. No backpressure: the sink is a plain log file and the drainers
/// run off the scenario's critical path.
pub fn spawn_drainer<R>(mut reader: R, sink: LogSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let mut file = sink.lock().await;
                    if let Err(e) = file.write_all(&buf[..n]).await {
                        warn!("log sink write failed: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    trace!("drain read ended: {}", e);
                    break;
                }
            }
        }
    })
}

/// Owns the lifecycle of one externally-launched node process.
pub struct ProcessSupervisor {
    executable: PathBuf,
    child: Option<Child>,
    drainers: Vec<JoinHandle<()>>,
}

impl ProcessSupervisor {
    /// Spawn `executable` with `args` in `workdir`, piping both output
    /// channels into `workdir/node.log` via two drain tasks.
    pub async fn launch(executable: &Path, args: &[String], workdir: &Path) -> Result<Self> {
        debug!("launching {} in {}", executable.display(), workdir.display());
        let mut child = Command::new(executable)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Backstop for scope exits that never reach terminate().
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Launch {
                path: executable.to_path_buf(),
                source,
            })?;

        let sink: LogSink = Arc::new(Mutex::new(File::create(workdir.join(LOG_FILE_NAME)).await?));

        let mut drainers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drainers.push(spawn_drainer(stdout, sink.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            drainers.push(spawn_drainer(stderr, sink));
        }

        Ok(Self {
            executable: executable.to_path_buf(),
            child: Some(child),
            drainers,
        })
    }

    /// OS pid, while the process handle is held.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    /// Kill the process and wait for both drainers to finish.
    ///
    /// Idempotent: killing an already-exited process is not an error, and a
    /// second call finds nothing left to do.
    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                trace!("kill {}: {}", self.executable.display(), e);
            }
            match child.wait().await {
                Ok(status) => debug!("{} exited with {}", self.executable.display(), status),
                Err(e) => warn!("failed to reap {}: {}", self.executable.display(), e),
            }
        }
        // Once the child is dead both pipes hit EOF, so the drainers finish
        // on their own; joining here guarantees the log file is complete.
        for drainer in self.drainers.drain(..) {
            let _ = drainer.await;
        }
    }

    /// Whether terminate() has already released the process.
    pub fn is_terminated(&self) -> bool {
        self.child.is_none() && self.drainers.is_empty()
    }
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("executable", &self.executable)
            .field("pid", &self.id())
            .finish()
    }
}
