// src/exec/command.rs

//! Subprocess helpers shared by provisioning steps and checks.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Build a shell command appropriate for the platform.
///
/// stdin is closed, stdout/stderr are piped and the child is killed when
/// its handle is dropped. On unix the child leads its own process group so
/// [`kill_tree`] can reach everything it starts.
pub fn shell_command(cmd: &str) -> Command {
    let mut c = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };
    c.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    c.process_group(0);
    c
}

/// Kill `child` together with every process in its process group, then
/// reap it.
pub async fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(errno) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                debug!(pid, %errno, "killpg failed; killing the child only");
            }
        }
    }
    child.kill().await
}

/// Collects a child's stdout and stderr, line by line, into one log in
/// arrival order.
pub struct OutputCollector {
    rx: mpsc::UnboundedReceiver<String>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputCollector {
    /// Take the child's pipes and start draining them.
    pub fn attach(child: &mut Child, label: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone(), label.to_string(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx, label.to_string(), "stderr"));
        }

        Self { rx, readers }
    }

    /// Wait (at most `grace`) for the pipes to close and return the log.
    ///
    /// A grandchild can keep a pipe open after the child itself was killed;
    /// readers still running after `grace` are aborted and whatever was read
    /// so far is returned.
    pub async fn finish(mut self, grace: Duration) -> String {
        let deadline = tokio::time::Instant::now() + grace;
        for reader in self.readers.iter_mut() {
            if tokio::time::timeout_at(deadline, &mut *reader).await.is_err() {
                debug!("output reader still busy after grace period; aborting");
                reader.abort();
            }
        }

        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines.join("\n")
    }
}

fn spawn_reader<R>(
    pipe: R,
    tx: mpsc::UnboundedSender<String>,
    label: String,
    stream: &'static str,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!(target: "checkrun::output", job = %label, stream, "{}", line);
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}
