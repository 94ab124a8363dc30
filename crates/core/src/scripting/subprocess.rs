//! Generator subprocess with merged, line-oriented output.
//!
//! stdout and stderr are both attached to the write end of a single OS
//! pipe, so the bytes arrive in exactly the order the child wrote them.
//! The read end is drained by a reader task that splits on `\n`, decodes
//! lossily (malformed UTF-8 becomes U+FFFD) and forwards each line over an
//! unbounded channel.

use std::io;
use std::process::{ExitStatus, Stdio};

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
#[cfg(unix)]
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::executor::{GeneratorError, GeneratorInvocation};

/// A spawned generator whose output is being read.
#[derive(Debug)]
pub struct RunningGenerator {
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
    reader: JoinHandle<io::Result<()>>,
}

impl RunningGenerator {
    /// OS process id, if the child has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next line of merged output, or `None` once the pipe is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Wait for the reader to hit end-of-stream and for the process to exit.
    ///
    /// Lines not yet consumed through [`next_line`](Self::next_line) are
    /// discarded.
    pub async fn wait(mut self) -> Result<ExitStatus, GeneratorError> {
        self.lines.close();
        let status = self.child.wait().await?;
        match self.reader.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GeneratorError::Io(e)),
            Err(e) => {
                return Err(GeneratorError::Io(io::Error::other(format!(
                    "output reader task failed: {e}"
                ))));
            }
        }
        Ok(status)
    }
}

/// Spawn the generator described by `invocation` with merged output.
///
/// Must be called from within a tokio runtime.
pub fn spawn_merged(invocation: &GeneratorInvocation) -> Result<RunningGenerator, GeneratorError> {
    let mut cmd = invocation.command();
    spawn_command(&mut cmd, invocation.program())
}

fn spawn_command(cmd: &mut Command, program: String) -> Result<RunningGenerator, GeneratorError> {
    let (read_end, stdout_end, stderr_end) = merged_pipe()?;

    cmd.stdin(Stdio::null())
        .stdout(stdout_end)
        .stderr(stderr_end)
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|source| GeneratorError::Spawn { program, source })?;

    // The command still owns our copies of the write end; they must be
    // closed or the reader never sees end-of-stream.
    cmd.stdout(Stdio::null()).stderr(Stdio::null());

    let (tx, lines) = mpsc::unbounded_channel();
    let reader = spawn_reader(read_end, tx);

    Ok(RunningGenerator {
        child,
        lines,
        reader,
    })
}

/// One line of raw output as text, trailing whitespace (including `\r`)
/// trimmed.
fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Unix: async pipe
// ---------------------------------------------------------------------------

/// Pipe whose write end is handed to the child twice, for stdout and stderr.
#[cfg(unix)]
fn merged_pipe() -> io::Result<(pipe::Receiver, Stdio, Stdio)> {
    let (sender, receiver) = pipe::pipe()?;
    // The child expects ordinary blocking descriptors.
    let write_end = sender.into_blocking_fd()?;
    let stderr_end = write_end.try_clone()?;
    Ok((receiver, Stdio::from(write_end), Stdio::from(stderr_end)))
}

#[cfg(unix)]
fn spawn_reader(
    read_end: pipe::Receiver,
    tx: mpsc::UnboundedSender<String>,
) -> JoinHandle<io::Result<()>> {
    tokio::spawn(async move { forward_lines(read_end, &tx).await })
}

/// Read `source` to the end, sending one decoded line per `\n`.
///
/// A final line without a terminating newline is still delivered. Stops
/// early, without error, if the receiver has gone away.
#[cfg(unix)]
async fn forward_lines<R: AsyncRead + Unpin>(
    source: R,
    tx: &mpsc::UnboundedSender<String>,
) -> io::Result<()> {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        if tx.send(decode_line(&buf)).is_err() {
            return Ok(());
        }
    }
}

// ---------------------------------------------------------------------------
// Other targets: std pipe drained on a blocking thread
// ---------------------------------------------------------------------------

#[cfg(not(unix))]
fn merged_pipe() -> io::Result<(io::PipeReader, Stdio, Stdio)> {
    let (read_end, write_end) = io::pipe()?;
    let stderr_end = write_end.try_clone()?;
    Ok((read_end, Stdio::from(write_end), Stdio::from(stderr_end)))
}

#[cfg(not(unix))]
fn spawn_reader(
    read_end: io::PipeReader,
    tx: mpsc::UnboundedSender<String>,
) -> JoinHandle<io::Result<()>> {
    use std::io::{BufRead, BufReader};

    tokio::task::spawn_blocking(move || {
        let mut reader = BufReader::new(read_end);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            if tx.send(decode_line(&buf)).is_err() {
                return Ok(());
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
