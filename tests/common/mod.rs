//! Shared helper-script fixtures for the integration tests.
//!
//! All scripts are written once, before any test spawns a child, so no
//! executable is still open for writing while another thread execs it.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;

/// A small user database answering every verb the module sends
pub const DIRECTORY_HELPER: &str = r#"#!/bin/sh
case "$1" in
  getpwnam)
    case "$2" in
      alice) echo "alice:x:1001:1001:Alice Smith:/home/alice:/bin/zsh" ;;
      bob) echo "bob:x:1002:1002:Bob:/home/bob:/bin/bash" ;;
      slowuser) echo "slowuser:x:1003:1003::/home/slowuser:/bin/sh"; exit 2 ;;
      silent) exit 0 ;;
      broken) echo "broken:x:uid:1003::/:/bin/sh" ;;
      short) echo "short:x:1004" ;;
      *) exit 1 ;;
    esac ;;
  getpwuid)
    case "$2" in
      1001) echo "alice:x:1001:1001:Alice Smith:/home/alice:/bin/zsh" ;;
      1002) echo "bob:x:1002:1002:Bob:/home/bob:/bin/bash" ;;
      *) exit 1 ;;
    esac ;;
  getpwent)
    case "$2" in
      0) echo "alice:x:1001:1001:Alice Smith:/home/alice:/bin/zsh" ;;
      1) echo "bob:x:1002:1002:Bob:/home/bob:/bin/bash" ;;
      2) echo "carol:x:1005:1005:Carol:/home/carol:/bin/sh" ;;
      *) exit 1 ;;
    esac ;;
  getgrnam)
    case "$2" in
      devs) echo "devs:x:500:alice,bob,alice," ;;
      empty) echo "empty:x:501" ;;
      *) exit 1 ;;
    esac ;;
  getgrgid)
    case "$2" in
      500) echo "devs:x:500:alice,bob,alice," ;;
      *) exit 1 ;;
    esac ;;
  getgrent)
    case "$2" in
      0) echo "devs:x:500:alice,bob" ;;
      1) echo "empty:x:501:" ;;
      *) exit 1 ;;
    esac ;;
  getspnam)
    case "$2" in
      bob) echo "bob:!" ;;
      alice) echo 'alice:$6$salt$hash:19500:0:99999:7:::' ;;
      odd) echo "odd:!:yesterday" ;;
      *) exit 1 ;;
    esac ;;
  getspent)
    case "$2" in
      0) echo "bob:!" ;;
      *) exit 1 ;;
    esac ;;
  setpwent|endpwent|setgrent|endgrent) exit 0 ;;
  setspent|endspent) exit 3 ;;
  *) exit 3 ;;
esac
"#;

/// Echoes its argv back on one line
pub const ARGV_HELPER: &str = r#"#!/bin/sh
printf '%s|%s|%s\n' "$#" "$1" "$2"
"#;

/// Reports the parts of its environment the module controls
pub const ENV_HELPER: &str = r#"#!/bin/sh
printf 'PATH=%s HOME=%s LANG=%s\n' "$PATH" "${HOME-unset}" "${LANG-unset}"
"#;

/// Exits with the code given as its argument after printing a record
pub const EXIT_HELPER: &str = r#"#!/bin/sh
echo "user:x:1:1::/:/bin/sh"
exit "$2"
"#;

/// Writes far more than one pipe buffer before its record line
pub const FLOOD_HELPER: &str = r#"#!/bin/sh
i=0
while [ $i -lt 3000 ]; do
  echo "padding line $i padding padding padding padding padding padding padding"
  i=$((i + 1))
done
exit 0
"#;

/// Answers every lookup; lives in a directory used only as a search path
pub const SEARCHABLE_HELPER: &str = r#"#!/bin/sh
echo "found-through-path:x:1:1::/:/bin/sh"
"#;

/// Reports where its stderr points
pub const STDERR_HELPER: &str = r#"#!/bin/sh
readlink /proc/$$/fd/2
"#;

/// Dies from a signal instead of exiting
pub const KILLED_HELPER: &str = r#"#!/bin/sh
echo "user:x:1:1::/:/bin/sh"
kill -9 $$
"#;

pub struct Fixture {
    _dir: TempDir,
    pub directory: PathBuf,
    pub argv: PathBuf,
    pub env: PathBuf,
    pub exit: PathBuf,
    pub flood: PathBuf,
    pub killed: PathBuf,
    pub not_executable: PathBuf,
    pub stderr: PathBuf,
    /// Directory holding an executable named [`SEARCHABLE_NAME`]
    pub search_dir: PathBuf,
}

/// File name of the helper inside [`Fixture::search_dir`]
pub const SEARCHABLE_NAME: &str = "searchable-helper";

fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write helper script");
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod helper script");
    path
}

pub fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let dir = tempfile::tempdir().expect("create fixture dir");
        let root = dir.path().to_path_buf();
        let search_dir = root.join("search");
        fs::create_dir(&search_dir).expect("create search dir");
        write_script(&search_dir, SEARCHABLE_NAME, SEARCHABLE_HELPER, 0o755);
        Fixture {
            directory: write_script(&root, "directory", DIRECTORY_HELPER, 0o755),
            argv: write_script(&root, "argv", ARGV_HELPER, 0o755),
            env: write_script(&root, "env", ENV_HELPER, 0o755),
            exit: write_script(&root, "exit", EXIT_HELPER, 0o755),
            flood: write_script(&root, "flood", FLOOD_HELPER, 0o755),
            killed: write_script(&root, "killed", KILLED_HELPER, 0o755),
            not_executable: write_script(&root, "plain", DIRECTORY_HELPER, 0o644),
            stderr: write_script(&root, "stderr", STDERR_HELPER, 0o755),
            search_dir,
            _dir: dir,
        }
    })
}
