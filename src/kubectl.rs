//! Running the `kubectl` binary
//!
//! Every invocation is attempted once. Captured calls return stdout; streamed
//! calls forward stdout line by line until the process exits or the caller
//! cancels.

use miette::Diagnostic;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use which::which;

/// Lines buffered between the reader task and the printer.
const LINE_BUFFER: usize = 64;

#[derive(Error, Debug, Diagnostic)]
pub enum KubectlError {
    #[error("kubectl was not found on PATH")]
    #[diagnostic(
        code(riff::kubectl::not_found),
        help("install kubectl and make sure it is on your PATH")
    )]
    NotFound(#[source] which::Error),

    #[error("failed to run kubectl {args}")]
    Spawn {
        args: String,
        #[source]
        source: io::Error,
    },

    #[error("kubectl {args} failed with {status}: {stderr}")]
    NonZeroExit {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("kubectl {args} ended with {status}")]
    StreamExit { args: String, status: String },

    #[error("kubectl {args} has no stdout pipe")]
    MissingStdout { args: String },

    #[error("failed to read kubectl output")]
    Read(#[source] io::Error),

    #[error("failed to print kubectl output")]
    Output(#[source] io::Error),
}

/// How a streamed invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The process exited successfully.
    Exited,
    /// The cancellation token fired and the process was killed.
    Cancelled,
}

/// The operations `riff` needs from the Kubernetes CLI.
#[allow(async_fn_in_trait)]
pub trait Kubectl {
    /// Run to completion and return stdout.
    async fn exec_for_string(&self, args: &[String]) -> Result<String, KubectlError>;

    /// Run and write every stdout line to `out` as it arrives.
    async fn stream_lines<W: Write>(
        &self,
        args: &[String],
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, KubectlError>;
}

/// `kubectl` found on the local machine.
#[derive(Debug, Clone)]
pub struct KubectlCli {
    program: PathBuf,
}

impl KubectlCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `kubectl` on `PATH`.
    pub fn locate() -> Result<Self, KubectlError> {
        let program = which("kubectl").map_err(KubectlError::NotFound)?;
        debug!("Using kubectl at {}", program.display());
        Ok(Self::new(program))
    }
}

impl Kubectl for KubectlCli {
    async fn exec_for_string(&self, args: &[String]) -> Result<String, KubectlError> {
        let rendered = args.join(" ");
        debug!("Running kubectl {rendered}");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| KubectlError::Spawn {
                args: rendered.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(KubectlError::NonZeroExit {
                args: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn stream_lines<W: Write>(
        &self,
        args: &[String],
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, KubectlError> {
        let rendered = args.join(" ");
        debug!("Streaming kubectl {rendered}");

        // kill_on_drop reaps the child on every early return below
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| KubectlError::Spawn {
                args: rendered.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KubectlError::MissingStdout {
                args: rendered.clone(),
            })?;

        let (tx, mut rx) = mpsc::channel::<String>(LINE_BUFFER);
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok::<(), io::Error>(())
        });

        loop {
            tokio::select! {
                line = rx.recv() => match line {
                    Some(line) => {
                        writeln!(out, "{line}")
                            .and_then(|()| out.flush())
                            .map_err(KubectlError::Output)?;
                    }
                    None => break,
                },
                () = cancel.cancelled() => {
                    debug!("Stopping kubectl {rendered}");
                    reader.abort();
                    child.kill().await.map_err(KubectlError::Read)?;
                    return Ok(StreamEnd::Cancelled);
                }
            }
        }

        match reader.await {
            Ok(result) => result.map_err(KubectlError::Read)?,
            Err(join_error) => return Err(KubectlError::Read(io::Error::other(join_error))),
        }

        let status = child.wait().await.map_err(KubectlError::Read)?;
        if cancel.is_cancelled() || interrupted(&status) {
            return Ok(StreamEnd::Cancelled);
        }
        if !status.success() {
            return Err(KubectlError::StreamExit {
                args: rendered,
                status: status.to_string(),
            });
        }

        Ok(StreamEnd::Exited)
    }
}

/// kubectl shares riff's process group, so Ctrl-C can end it before the
/// cancellation token fires.
#[cfg(unix)]
fn interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn interrupted(_status: &ExitStatus) -> bool {
    false
}
