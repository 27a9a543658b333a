//! Owned copies of filled records
//!
//! Reads a `passwd`, `group` or `spwd` back out of the caller's buffer into
//! plain Rust values, for printing and for assertions in tests.

use std::ffi::CStr;
use std::fmt;

use nix::libc::{self, c_char};
use serde::Serialize;

use crate::line_parser::AGING_UNSET;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswdEntry {
    pub name: String,
    pub passwd: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub dir: String,
    pub shell: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub passwd: String,
    pub gid: u32,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowEntry {
    pub name: String,
    pub passwd: String,
    pub last_change: i64,
    pub min: i64,
    pub max: i64,
    pub warn: i64,
    pub inactive: i64,
    pub expire: i64,
    pub flag: u64,
}

/// # Safety
///
/// `p` must be null or point to a NUL terminated string.
unsafe fn owned(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
}

impl PasswdEntry {
    /// # Safety
    ///
    /// Every string pointer in `raw` must be null or valid.
    pub unsafe fn from_raw(raw: &libc::passwd) -> Self {
        unsafe {
            Self {
                name: owned(raw.pw_name),
                passwd: owned(raw.pw_passwd),
                uid: raw.pw_uid,
                gid: raw.pw_gid,
                gecos: owned(raw.pw_gecos),
                dir: owned(raw.pw_dir),
                shell: owned(raw.pw_shell),
            }
        }
    }
}

impl GroupEntry {
    /// # Safety
    ///
    /// String pointers must be null or valid and `gr_mem` must be null or a
    /// NULL terminated table.
    pub unsafe fn from_raw(raw: &libc::group) -> Self {
        let mut members = Vec::new();
        if !raw.gr_mem.is_null() {
            let mut slot = raw.gr_mem;
            unsafe {
                while !(*slot).is_null() {
                    members.push(owned(*slot));
                    slot = slot.add(1);
                }
            }
        }

        unsafe {
            Self {
                name: owned(raw.gr_name),
                passwd: owned(raw.gr_passwd),
                gid: raw.gr_gid,
                members,
            }
        }
    }
}

impl ShadowEntry {
    /// # Safety
    ///
    /// Every string pointer in `raw` must be null or valid.
    #[allow(clippy::useless_conversion)]
    pub unsafe fn from_raw(raw: &libc::spwd) -> Self {
        unsafe {
            Self {
                name: owned(raw.sp_namp),
                passwd: owned(raw.sp_pwdp),
                last_change: i64::from(raw.sp_lstchg),
                min: i64::from(raw.sp_min),
                max: i64::from(raw.sp_max),
                warn: i64::from(raw.sp_warn),
                inactive: i64::from(raw.sp_inact),
                expire: i64::from(raw.sp_expire),
                flag: u64::from(raw.sp_flag),
            }
        }
    }
}

impl fmt::Display for PasswdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.passwd, self.uid, self.gid, self.gecos, self.dir, self.shell
        )
    }
}

impl fmt::Display for GroupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.name, self.passwd, self.gid, self.members.join(","))
    }
}

impl fmt::Display for ShadowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.passwd)?;
        for value in [
            self.last_change,
            self.min,
            self.max,
            self.warn,
            self.inactive,
            self.expire,
        ] {
            if value == AGING_UNSET {
                f.write_str(":")?;
            } else {
                write!(f, ":{}", value)?;
            }
        }
        write!(f, ":{}", self.flag)
    }
}
