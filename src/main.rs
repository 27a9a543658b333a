//! nss-script-query - run NSS lookups through the helper from the command line
//!
//! Uses the same resolver, parser and buffer code as the shared object, so a
//! helper can be checked without touching `/etc/nsswitch.conf`.

use std::fmt::Display;
use std::mem::MaybeUninit;
use std::process::ExitCode;

use anyhow::Context;
use nix::libc;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use nss_script::cli::{Cli, Database};
use nss_script::{
    BufferWriter, GroupEntry, HelperConfig, NssError, PasswdEntry, Record, Resolver, ScriptHelper,
    ShadowEntry,
};

/// Initialize the logger; `RUST_LOG` overrides the default level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// A record the tool knows how to allocate and read back
trait Queryable: Record {
    type Owned: Serialize + Display;

    fn blank() -> Self;

    /// # Safety
    ///
    /// `self` must have been filled from a buffer that is still alive.
    unsafe fn read_back(&self) -> Self::Owned;
}

fn zeroed<T>() -> T {
    // SAFETY: only instantiated for libc record structs, for which all-zero
    // (null pointers, zero ids) is a valid value.
    unsafe { MaybeUninit::zeroed().assume_init() }
}

impl Queryable for libc::passwd {
    type Owned = PasswdEntry;

    fn blank() -> Self {
        zeroed()
    }

    unsafe fn read_back(&self) -> PasswdEntry {
        unsafe { PasswdEntry::from_raw(self) }
    }
}

impl Queryable for libc::group {
    type Owned = GroupEntry;

    fn blank() -> Self {
        zeroed()
    }

    unsafe fn read_back(&self) -> GroupEntry {
        unsafe { GroupEntry::from_raw(self) }
    }
}

impl Queryable for libc::spwd {
    type Owned = ShadowEntry;

    fn blank() -> Self {
        zeroed()
    }

    unsafe fn read_back(&self) -> ShadowEntry {
        unsafe { ShadowEntry::from_raw(self) }
    }
}

/// Run one lookup, growing the buffer while it is too small
fn fetch<R, F>(cli: &Cli, mut lookup: F) -> anyhow::Result<Option<R::Owned>>
where
    R: Queryable,
    F: FnMut(&mut R, &mut BufferWriter<'_>) -> Result<(), NssError>,
{
    let mut size = cli.buffer_size.max(1);
    loop {
        let mut buf = vec![0u8; size];
        let mut out = R::blank();
        match lookup(&mut out, &mut BufferWriter::new(&mut buf)) {
            // SAFETY: `out` points into `buf`, which outlives this read.
            Ok(()) => return Ok(Some(unsafe { out.read_back() })),
            Err(NssError::NotFound) => return Ok(None),
            Err(NssError::BufferTooSmall) if size < cli.max_buffer_size => {
                size = size.saturating_mul(2).min(cli.max_buffer_size);
                debug!("buffer too small, retrying with {} bytes", size);
            }
            Err(e) => return Err(e).with_context(|| format!("lookup failed with {} bytes", size)),
        }
    }
}

fn print<T: Serialize + Display>(cli: &Cli, entry: &T) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string(entry)?);
    } else {
        println!("{}", entry);
    }
    Ok(())
}

fn lookup<R: Queryable>(resolver: &Resolver<ScriptHelper>, cli: &Cli, key: &str) -> anyhow::Result<bool> {
    let entry = match key.parse::<u32>() {
        Ok(id) if R::KIND.by_id_verb().is_some() => {
            fetch::<R, _>(cli, |out, buf| resolver.get_by_id(id, out, buf))?
        }
        _ => fetch::<R, _>(cli, |out, buf| resolver.get_by_name(key, out, buf))?,
    };

    match entry {
        Some(entry) => {
            print(cli, &entry)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn enumerate<R: Queryable>(resolver: &Resolver<ScriptHelper>, cli: &Cli) -> anyhow::Result<bool> {
    resolver.begin::<R>()?;

    let mut count = 0usize;
    let outcome = loop {
        match fetch::<R, _>(cli, |out, buf| resolver.next(out, buf)) {
            Ok(Some(entry)) => {
                if let Err(e) = print(cli, &entry) {
                    break Err(e);
                }
                count += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    resolver.end::<R>()?;
    info!("enumerated {} {} entries", count, R::KIND);
    outcome.map(|()| count > 0)
}

fn run<R: Queryable>(resolver: &Resolver<ScriptHelper>, cli: &Cli) -> anyhow::Result<bool> {
    match cli.key.as_deref() {
        Some(key) => lookup::<R>(resolver, cli, key),
        None => enumerate::<R>(resolver, cli),
    }
}

/// Helper from `--helper` (made absolute) or the environment.
///
/// Unlike the shared object, the tool lets the helper's stderr through so
/// its diagnostics reach the terminal.
fn helper_config(cli: &Cli) -> anyhow::Result<HelperConfig> {
    let config = match &cli.helper {
        Some(path) => {
            let path = std::path::absolute(path)
                .with_context(|| format!("cannot resolve helper path {}", path.display()))?;
            HelperConfig::new(path)
        }
        None => HelperConfig::from_env(),
    };
    Ok(config.with_inherited_stderr(true))
}

fn main() -> ExitCode {
    init_logger();

    let cli = Cli::parse_args();
    let config = match helper_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nss-script-query: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("using helper {}", config.helper_path().display());
    let resolver = Resolver::new(ScriptHelper::new(config));

    let found = match cli.database {
        Database::Passwd => run::<libc::passwd>(&resolver, &cli),
        Database::Group => run::<libc::group>(&resolver, &cli),
        Database::Shadow => run::<libc::spwd>(&resolver, &cli),
    };

    match found {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("nss-script-query: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
