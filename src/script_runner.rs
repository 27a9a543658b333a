//! Helper Program Execution
//!
//! Every record this module returns originates from one invocation of the
//! helper program. The helper is an untrusted black box, so this is the only
//! place that talks to it, and it does so under a fixed contract:
//!
//! - argv is `[helper, verb, argument]`, passed straight to `execve` with no
//!   shell in between, so keys are never interpolated into a command line
//! - the helper path must be absolute, so the file checked for execute
//!   permission is the file that runs; `PATH` is never searched for it
//! - the environment is cleared down to a `PATH`
//! - only stdout is captured, through a close-on-exec pipe, and at most
//!   [`MAX_REPLY_LEN`] bytes of it are kept; stderr goes to `/dev/null`
//!   unless the configuration asks for it to be inherited
//! - the exit code is the verdict: 0 found, 1 not found, 2 try again,
//!   anything else unavailable
//!
//! There is no timeout: a helper that never exits blocks the calling thread.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use nix::unistd::{AccessFlags, access};
use tracing::{debug, warn};

use crate::config::HelperConfig;
use crate::types::{HelperStatus, Verb};

/// Size of the reply scratch buffer
pub const REPLY_CAPACITY: usize = 4096;

/// Bytes of helper output kept; one byte of the buffer stays reserved
pub const MAX_REPLY_LEN: usize = REPLY_CAPACITY - 1;

/// Captured helper output, held on the stack
pub struct RawReply {
    bytes: [u8; REPLY_CAPACITY],
    len: usize,
}

impl RawReply {
    pub const fn new() -> Self {
        Self {
            bytes: [0; REPLY_CAPACITY],
            len: 0,
        }
    }

    /// Build a reply from literal output, truncated like a real capture
    pub fn from_bytes(output: &[u8]) -> Self {
        let mut reply = Self::new();
        let len = output.len().min(MAX_REPLY_LEN);
        reply.bytes[..len].copy_from_slice(&output[..len]);
        reply.len = len;
        reply
    }

    /// Everything captured, untrimmed
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First line of output without its line terminator.
    ///
    /// `None` when that line is empty, which callers treat as "no entry".
    pub fn line(&self) -> Option<&[u8]> {
        let captured = self.as_bytes();
        let line = match captured.iter().position(|&b| b == b'\n') {
            Some(end) => &captured[..end],
            None => captured,
        };
        let trimmed = match line.iter().rposition(|&b| b != b'\r' && b != b'\n') {
            Some(last) => &line[..=last],
            None => &line[..0],
        };
        (!trimmed.is_empty()).then_some(trimmed)
    }

    fn fill_from<R: Read>(&mut self, source: &mut R) {
        self.len = 0;
        while self.len < MAX_REPLY_LEN {
            match source.read(&mut self.bytes[self.len..MAX_REPLY_LEN]) {
                Ok(0) => break,
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("stopped reading helper output: {}", e);
                    break;
                }
            }
        }
    }
}

impl Default for RawReply {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawReply")
            .field("len", &self.len)
            .field("bytes", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// Something that can answer a verb with a status and at most one line.
///
/// [`ScriptHelper`] is the production implementation; tests substitute
/// in-memory helpers.
pub trait Helper: Send + Sync {
    /// Run `verb` with an optional `argument`.
    ///
    /// When `reply` is `Some`, the helper's output is stored there. When it is
    /// `None` the output is discarded.
    fn run(&self, verb: Verb, argument: Option<&str>, reply: Option<&mut RawReply>)
    -> HelperStatus;
}

/// Runs the configured helper program as a child process
#[derive(Debug, Clone)]
pub struct ScriptHelper {
    config: HelperConfig,
}

impl ScriptHelper {
    pub fn new(config: HelperConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    fn spawn(&self, verb: Verb, argument: Option<&str>) -> io::Result<Child> {
        let mut cmd = Command::new(self.config.helper_path());
        cmd.arg(verb.as_str());
        if let Some(argument) = argument {
            cmd.arg(argument);
        }
        cmd.env_clear()
            .env("PATH", self.config.search_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.config.inherits_stderr() {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        cmd.spawn()
    }
}

impl Helper for ScriptHelper {
    fn run(
        &self,
        verb: Verb,
        argument: Option<&str>,
        reply: Option<&mut RawReply>,
    ) -> HelperStatus {
        let helper = self.config.helper_path();
        if !helper.is_absolute() {
            warn!("helper path {} is not absolute", helper.display());
            return HelperStatus::Unavailable;
        }
        if !is_executable_file(helper) {
            warn!("helper {} is missing or not executable", helper.display());
            return HelperStatus::Unavailable;
        }

        debug!("running {} {} {:?}", helper.display(), verb, argument);

        let mut child = match self.spawn(verb, argument) {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn helper {}: {}", helper.display(), e);
                return HelperStatus::Unavailable;
            }
        };

        if let Some(mut stdout) = child.stdout.take() {
            if let Some(reply) = reply {
                reply.fill_from(&mut stdout);
            }
            drain(&mut stdout);
        }

        let status = match wait_uninterrupted(&mut child) {
            Ok(status) => status,
            Err(e) => {
                warn!("failed to wait for helper {}: {}", helper.display(), e);
                return HelperStatus::Unavailable;
            }
        };

        let outcome = HelperStatus::from_exit_code(status.code());
        debug!("helper {} {} exited with {} -> {}", helper.display(), verb, status, outcome);
        outcome
    }
}

/// Whether `path` names a regular file the current process may execute
pub fn is_executable_file(path: &std::path::Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    metadata.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

/// Read and discard the rest of the pipe so the child never blocks on it
fn drain(stdout: &mut ChildStdout) {
    if let Err(e) = io::copy(stdout, &mut io::sink()) {
        debug!("stopped draining helper output: {}", e);
    }
}

fn wait_uninterrupted(child: &mut Child) -> io::Result<ExitStatus> {
    loop {
        match child.wait() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
