use crate::error::{Result, StatusError};
use crate::status_parser::{self, StatusReport};
use clap::ValueEnum;
use gix::bstr::ByteSlice;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Source of per-repository working-tree status.
pub trait StatusSource {
    /// `Ok(None)` means the repository has no changes.
    fn status(&self, repo: &Path) -> Result<Option<StatusReport>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    /// Scrape the human-readable `git status` report
    Long,
    /// Read `git status --porcelain`
    Porcelain,
}

/// Runs the `git` executable in each repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    pub program: PathBuf,
    pub format: StatusFormat,
    pub timeout: Duration,
}

impl GitCli {
    pub fn new(format: StatusFormat, timeout: Duration) -> Self {
        GitCli {
            program: PathBuf::from("git"),
            format,
            timeout,
        }
    }

    /// Use another executable in place of `git` from `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, repo: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-C")
            .arg(repo)
            .arg("-c")
            .arg("color.status=false")
            .arg("status");

        match self.format {
            // Section headers are only recognized in English
            StatusFormat::Long => {
                cmd.env("LC_ALL", "C");
            }
            StatusFormat::Porcelain => {
                cmd.arg("--porcelain");
            }
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl StatusSource for GitCli {
    fn status(&self, repo: &Path) -> Result<Option<StatusReport>> {
        let output = run_with_timeout(self.command(repo), self.timeout)?;

        if !output.status.success() {
            return Err(StatusError::Failed {
                code: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(match self.format {
            StatusFormat::Long => status_parser::parse_long(&output.stdout),
            StatusFormat::Porcelain => status_parser::parse_porcelain(&output.stdout),
        })
    }
}

struct CapturedOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

type PipeOutput = (Pipe, io::Result<Vec<u8>>);

/// Runs `cmd` to completion and collects its output, all within `timeout`.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CapturedOutput> {
    let mut child = cmd.spawn().map_err(StatusError::Spawn)?;
    let deadline = Instant::now() + timeout;

    // Drain both pipes so a large report can't block the child
    let (tx, rx) = mpsc::channel();
    let mut pending = 0;
    if let Some(pipe) = child.stdout.take() {
        drain(Pipe::Stdout, pipe, tx.clone());
        pending += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        drain(Pipe::Stderr, pipe, tx.clone());
        pending += 1;
    }
    drop(tx);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => return Err(abort(&mut child, err.into())),
        }
        if Instant::now() >= deadline {
            return Err(abort(&mut child, StatusError::Timeout(timeout)));
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Processes git left in the background can keep the pipes open
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for _ in 0..pending {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (pipe, bytes) = match rx.recv_timeout(remaining) {
            Ok(output) => output,
            Err(RecvTimeoutError::Timeout) => return Err(StatusError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::other("output reader exited early").into());
            }
        };
        match pipe {
            Pipe::Stdout => stdout = bytes?,
            Pipe::Stderr => stderr = bytes?,
        }
    }

    Ok(CapturedOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Kill and reap `child`, handing back `err` for the caller to return.
fn abort(child: &mut Child, err: StatusError) -> StatusError {
    let _ = child.kill();
    let _ = child.wait();
    err
}

fn drain<R: Read + Send + 'static>(pipe: Pipe, mut reader: R, tx: Sender<PipeOutput>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send((pipe, result));
    });
}

/// Short name of the checked-out branch, `None` when detached or unreadable.
pub fn current_branch(repo_path: &Path) -> Option<String> {
    let repo = match gix::open(repo_path) {
        Ok(repo) => repo,
        Err(err) => {
            tracing::debug!(path = %repo_path.display(), %err, "could not open repository");
            return None;
        }
    };

    // head_name also resolves an unborn branch
    let head = repo.head_name().ok()??;
    head.as_bstr()
        .to_str()
        .ok()
        .and_then(|name| name.strip_prefix("refs/heads/"))
        .map(str::to_string)
}
