use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::ChannelError;
use crate::protocol::{classify_line, LineVerdict};

/// The default per-read deadline `D` from §4.3 and §6.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(100);

/// One live subprocess player's I/O handle (§3 "Subprocess handle", §4.3). Owned exclusively by
/// the adapter that spawned it; lifetime is one match.
pub struct SubprocessChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<tokio::process::ChildStdout>>,
    /// Set by a background task the moment any bytes arrive on the child's stderr. A stack trace
    /// is the usual case, but per §6 any non-empty stderr output counts as `runtime_error`.
    stderr_rx: watch::Receiver<Option<String>>,
}

/// Builds the command line for a player program by dispatching on its file extension (§4.3):
/// `.py` -> `python3`, `.js` -> `node`, `.class` -> `java -cp <dir> <classname>`, anything else
/// is assumed to be directly executable.
pub fn command_for(source_path: &Path) -> Command {
    match source_path.extension().and_then(OsStr::to_str) {
        Some("py") => {
            let mut cmd = Command::new("python3");
            cmd.arg(source_path);
            cmd
        }
        Some("js") => {
            let mut cmd = Command::new("node");
            cmd.arg(source_path);
            cmd
        }
        Some("class") => {
            let dir = source_path.parent().unwrap_or_else(|| Path::new("."));
            let classname = source_path.file_stem().and_then(OsStr::to_str).unwrap_or_default();
            let mut cmd = Command::new("java");
            cmd.arg("-cp").arg(dir).arg(classname);
            cmd
        }
        _ => Command::new(source_path),
    }
}

impl SubprocessChannel {
    /// Spawns the child with piped stdin/stdout/stderr. The child is killed on drop so a match
    /// that exits early (error, panic unwind) never leaks a zombie process.
    pub fn spawn(source_path: &Path) -> Result<Self, ChannelError> {
        let mut command = command_for(source_path);
        command.kill_on_drop(true).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");
        let stdout = BufReader::new(stdout).lines();
        let stderr = child.stderr.take().expect("stderr was piped");
        let stderr_rx = watch_first_bytes(stderr);
        Ok(Self { child, stdin, stdout, stderr_rx })
    }

    /// Writes the initial handshake line `"<W> <H> <N> <no>\n"` (§4.3).
    pub async fn send_handshake(&mut self, width: usize, height: usize, n: u32, no: u32) -> Result<(), ChannelError> {
        self.send_line(&format!("{width} {height} {n} {no}")).await
    }

    /// Writes one line and flushes.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Reads lines under the deadline until a non-filter line arrives, per §4.3's filter rules.
    /// Returns the raw move line on success. `debug` lines are reported through `on_debug`. Races
    /// the stdout read against the stderr watch so that non-empty stderr (§6: "a stack-trace to
    /// stderr or stdout") is reported as `runtime_error` without waiting for the deadline to
    /// elapse.
    pub async fn read_move(
        &mut self,
        deadline: Duration,
        mut on_debug: impl FnMut(&str),
    ) -> Result<String, ChannelError> {
        let stdout = &mut self.stdout;
        let stderr_rx = &mut self.stderr_rx;
        // Once the stderr watcher task has exited with nothing to report, it will never produce
        // another change, so stop racing it to avoid spinning the select loop.
        let mut stderr_live = true;
        let deadline_result = timeout(deadline, async {
            loop {
                if let Some(text) = stderr_rx.borrow().clone() {
                    return Err(ChannelError::RuntimeError(text));
                }
                if !stderr_live {
                    let line = stdout.next_line().await?.ok_or(ChannelError::StreamClosed)?;
                    let line = line.trim_end().to_string();
                    match classify_line(&line) {
                        LineVerdict::Debug => on_debug(&line),
                        LineVerdict::RuntimeError => return Err(ChannelError::RuntimeError(line)),
                        LineVerdict::Move(m) => return Ok(m),
                    }
                    continue;
                }
                tokio::select! {
                    changed = stderr_rx.changed() => {
                        if changed.is_err() {
                            stderr_live = false;
                        }
                    }
                    line = stdout.next_line() => {
                        let line = line?.ok_or(ChannelError::StreamClosed)?;
                        let line = line.trim_end().to_string();
                        match classify_line(&line) {
                            LineVerdict::Debug => on_debug(&line),
                            LineVerdict::RuntimeError => return Err(ChannelError::RuntimeError(line)),
                            LineVerdict::Move(m) => return Ok(m),
                        }
                    }
                }
            }
        })
        .await;
        match deadline_result {
            Ok(inner) => inner,
            Err(_elapsed) => Err(ChannelError::Timeout),
        }
    }

    /// Terminates the child cooperatively: sends `quit`, waits briefly, then kills. Idempotent
    /// and must not raise if the child has already exited (§4.3 "Teardown").
    pub async fn stop(mut self) {
        let _ = self.send_line("quit").await;
        match timeout(Duration::from_millis(200), self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                let _ = self.child.start_kill();
                let _ = self.child.wait().await;
            }
        }
    }
}

/// Spawns a background task that waits for the first bytes on `stderr` and publishes them through
/// the returned receiver. Only the first chunk is captured — one non-empty write is all §6
/// requires to classify a child as having produced `runtime_error`.
fn watch_first_bytes(mut stderr: tokio::process::ChildStderr) -> watch::Receiver<Option<String>> {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        if let Ok(n) = stderr.read(&mut buf).await {
            if n > 0 {
                let _ = tx.send(Some(String::from_utf8_lossy(&buf[..n]).into_owned()));
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn command_dispatch_table_matches_extension() {
        let py = command_for(&PathBuf::from("bots/alice.py"));
        assert_eq!(py.as_std().get_program(), "python3");

        let js = command_for(&PathBuf::from("bots/bob.js"));
        assert_eq!(js.as_std().get_program(), "node");

        let class = command_for(&PathBuf::from("bots/Carl.class"));
        assert_eq!(class.as_std().get_program(), "java");

        let native = command_for(&PathBuf::from("bots/dave"));
        assert_eq!(native.as_std().get_program(), "bots/dave");
    }

    #[tokio::test]
    async fn echo_bot_responds_to_handshake_and_read() {
        // a tiny shell script stands in for a player: it ignores the handshake line and always
        // answers "3"
        let dir = tempfile_dir();
        let script = dir.join("always_three.sh");
        std::fs::write(&script, "#!/bin/sh\nread _line\nwhile true; do echo 3; read _m; done\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut channel = SubprocessChannel::spawn(&script).unwrap();
        channel.send_handshake(7, 6, 2, 1).await.unwrap();
        let mv = channel.read_move(Duration::from_millis(500), |_| {}).await.unwrap();
        assert_eq!(mv, "3");
        channel.stop().await;
    }

    #[tokio::test]
    async fn stderr_output_is_reported_as_runtime_error_without_waiting_out_the_deadline() {
        // mimics an uncaught Python exception: the traceback goes to stderr, stdout stays silent
        let dir = tempfile_dir();
        let script = dir.join("throws.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nread _line\n>&2 echo 'Traceback (most recent call last):'\nsleep 5\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut channel = SubprocessChannel::spawn(&script).unwrap();
        channel.send_handshake(7, 6, 2, 1).await.unwrap();
        // a deadline far longer than the script needs to write to stderr; if the stderr race
        // didn't work this would time out instead of reporting runtime_error
        let start = std::time::Instant::now();
        let result = channel.read_move(Duration::from_secs(5), |_| {}).await;
        assert!(matches!(result, Err(ChannelError::RuntimeError(_))));
        assert!(start.elapsed() < Duration::from_secs(1));
        channel.stop().await;
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("umpire-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
