//! Configuration management module
//!
//! Locates the helper program. The environment override is read once per
//! process; later changes to the variable are ignored. In secure execution
//! (setuid or setgid hosts such as `su` or `passwd`) the override is never
//! consulted, and a relative override is always ignored.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use nix::libc;
use nix::unistd::{getegid, geteuid, getgid, getuid};
use tracing::warn;

/// Where the helper lives when nothing overrides it
pub const DEFAULT_HELPER_PATH: &str = "/usr/lib/nss-script/helper";

/// Environment variable naming an alternative helper
pub const HELPER_PATH_ENV: &str = "NSS_SCRIPT_HELPER";

/// `PATH` handed to the helper; the rest of its environment is empty
pub const DEFAULT_SEARCH_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

static GLOBAL_CONFIG: OnceLock<HelperConfig> = OnceLock::new();

/// How to reach the helper program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    helper_path: PathBuf,
    search_path: String,
    inherit_stderr: bool,
}

impl HelperConfig {
    /// Create a configuration for an explicit helper path.
    ///
    /// The runner refuses relative paths, so callers holding one should make
    /// it absolute first.
    pub fn new(helper_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            inherit_stderr: false,
        }
    }

    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key), secure_execution())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Falls back to [`DEFAULT_HELPER_PATH`] when the override is unset,
    /// empty or relative, and whenever `secure` is set; `lookup` is not
    /// called at all in that case.
    pub fn from_lookup<F>(lookup: F, secure: bool) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if secure {
            return Self::default();
        }
        match lookup(HELPER_PATH_ENV) {
            Some(path) if Path::new(&path).is_absolute() => Self::new(path),
            Some(path) if !path.is_empty() => {
                warn!(
                    "ignoring relative {}={}",
                    HELPER_PATH_ENV,
                    Path::new(&path).display()
                );
                Self::default()
            }
            _ => Self::default(),
        }
    }

    /// Process-wide configuration, resolved from the environment on first use
    pub fn global() -> &'static HelperConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            let config = Self::from_env();
            tracing::debug!("using helper {}", config.helper_path.display());
            config
        })
    }

    /// Replace the `PATH` given to the helper
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = search_path.into();
        self
    }

    /// Let the helper write to our stderr instead of `/dev/null`.
    ///
    /// Off by default: inside a daemon fd 2 may be a socket or a log file.
    pub fn with_inherited_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }

    #[inline]
    pub fn helper_path(&self) -> &Path {
        &self.helper_path
    }

    #[inline]
    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    #[inline]
    pub fn inherits_stderr(&self) -> bool {
        self.inherit_stderr
    }
}

/// Whether the process runs with privileges its invoker may not have.
///
/// Mirrors glibc's `secure_getenv`: the kernel's `AT_SECURE` flag, plus a
/// real/effective id mismatch for hosts that changed ids after exec.
pub fn secure_execution() -> bool {
    // SAFETY: getauxval has no preconditions and returns 0 for unknown types.
    let at_secure = unsafe { libc::getauxval(libc::AT_SECURE) } != 0;
    at_secure || getuid() != geteuid() || getgid() != getegid()
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HELPER_PATH)
    }
}
