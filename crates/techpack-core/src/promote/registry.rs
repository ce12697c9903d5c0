//! Container registry client
//!
//! Narrow capability surface the promotion engine drives: pull a
//! reference, tag it, push the new reference. The production
//! implementation shells out to the `docker` CLI; pulls and pushes are
//! blocking calls bounded by a fixed timeout.

use std::cell::Cell;
use std::io::Read;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bounded wait for one pull or push.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capability-based registry client.
pub trait RegistryClient {
    /// Pull `reference`; blocks until complete or timeout.
    fn pull(&self, reference: &str) -> Result<()>;
    /// Tag `source` as `image:tag`.
    fn tag(&self, source: &str, image: &str, tag: &str) -> Result<()>;
    /// Push `reference`; blocks until complete or timeout.
    fn push(&self, reference: &str) -> Result<()>;
}

/// Registry credentials, passed in explicitly rather than read from the
/// environment by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

/// `RegistryClient` backed by the `docker` CLI.
pub struct DockerCliClient {
    timeout: Duration,
    auth: Option<RegistryAuth>,
    logged_in: Cell<bool>,
}

impl DockerCliClient {
    pub fn new(auth: Option<RegistryAuth>) -> Self {
        Self {
            timeout: TRANSFER_TIMEOUT,
            auth,
            logged_in: Cell::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `docker login` once, when credentials are configured.
    fn ensure_login(&self) -> Result<()> {
        if self.logged_in.get() {
            return Ok(());
        }
        if let Some(auth) = &self.auth {
            let mut child = Command::new("docker")
                .args(["login", "--username", &auth.username, "--password-stdin"])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(auth.password.as_bytes())?;
            }
            let output = child.wait_with_output()?;
            if !output.status.success() {
                return Err(Error::RegistryCommand {
                    command: "docker login".into(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            tracing::info!(username = %auth.username, "registry login succeeded");
        }
        self.logged_in.set(true);
        Ok(())
    }

    /// Run a docker command to completion without a transfer bound.
    fn run(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("docker").args(args).output()?;
        if !output.status.success() {
            return Err(Error::RegistryCommand {
                command: format!("docker {}", args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Run a docker command with the transfer timeout.
    ///
    /// Polls the child until it exits or the deadline passes; on timeout
    /// the child is killed and the whole promotion run fails.
    fn run_bounded(&self, args: &[&str], reference: &str) -> Result<()> {
        self.run_bounded_program("docker", args, reference)
    }

    fn run_bounded_program(&self, program: &str, args: &[&str], reference: &str) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr on its own thread: a child that fills the pipe
        // buffer would otherwise block on write and never exit.
        let mut stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait()? {
                Some(status) if status.success() => return Ok(()),
                Some(_) => {
                    let message = stderr_reader
                        .take()
                        .and_then(|handle| handle.join().ok())
                        .unwrap_or_default();
                    return Err(Error::RegistryCommand {
                        command: format!("docker {}", args.join(" ")),
                        message: message.trim().to_string(),
                    });
                }
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::RegistryTimeout {
                            reference: reference.to_string(),
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl RegistryClient for DockerCliClient {
    fn pull(&self, reference: &str) -> Result<()> {
        self.ensure_login()?;
        tracing::info!(%reference, "pulling image");
        self.run_bounded(&["pull", reference], reference)
    }

    fn tag(&self, source: &str, image: &str, tag: &str) -> Result<()> {
        let target = format!("{image}:{tag}");
        tracing::info!(%source, %target, "tagging image");
        self.run(&["tag", source, &target])
    }

    fn push(&self, reference: &str) -> Result<()> {
        self.ensure_login()?;
        tracing::info!(%reference, "pushing image");
        self.run_bounded(&["push", reference], reference)
    }
}
