//! glibc NSS entry points
//!
//! glibc loads `libnss_script.so.2` for every database configured with the
//! `script` service in `/etc/nsswitch.conf` and resolves the symbols below by
//! name. Each one forwards to a process-wide [`Resolver`] and turns the
//! outcome into an `enum nss_status` plus `*errnop`.
//!
//! Nothing may unwind into the caller: every entry point runs inside
//! `catch_unwind`, and a panic is reported as `NSS_STATUS_UNAVAIL`.

use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use nix::libc::{self, c_char, c_int, gid_t, size_t, uid_t};

use crate::buffer::BufferWriter;
use crate::config::HelperConfig;
use crate::error::{NssError, Result, Unavailable};
use crate::records::Record;
use crate::resolver::Resolver;
use crate::script_runner::ScriptHelper;
use crate::types::NssStatus;

static RESOLVER: OnceLock<Resolver<ScriptHelper>> = OnceLock::new();

/// The resolver behind every exported symbol
pub fn resolver() -> &'static Resolver<ScriptHelper> {
    RESOLVER.get_or_init(|| Resolver::new(ScriptHelper::new(HelperConfig::global().clone())))
}

/// Run `lookup`, converting its outcome (or a panic) into a host status.
fn guarded<F>(errnop: *mut c_int, lookup: F) -> NssStatus
where
    F: FnOnce() -> Result<()>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(lookup))
        .unwrap_or(Err(NssError::Unavailable(Unavailable::Panicked)));

    match outcome {
        Ok(()) => NssStatus::Success,
        Err(e) => {
            if !errnop.is_null() {
                // SAFETY: glibc passes a valid errno location or null.
                unsafe { *errnop = e.errno() };
            }
            e.status()
        }
    }
}

/// Borrow a lookup key from C.
///
/// # Safety
///
/// `key` must be null or point to a NUL terminated string.
unsafe fn key<'a>(key: *const c_char) -> Result<&'a str> {
    if key.is_null() {
        return Err(Unavailable::NullArgument.into());
    }
    // SAFETY: non-null and NUL terminated per the caller's contract.
    unsafe { CStr::from_ptr(key) }
        .to_str()
        .map_err(|_| Unavailable::InvalidKey.into())
}

/// # Safety
///
/// `result` must be null or valid for writes; `buffer` must be valid for
/// `buflen` bytes.
unsafe fn by_name<R: Record>(
    name: *const c_char,
    result: *mut R,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    guarded(errnop, || {
        let name = unsafe { key(name) }?;
        let out = unsafe { result.as_mut() }.ok_or(Unavailable::NullArgument)?;
        let mut buf = unsafe { BufferWriter::from_raw_parts(buffer, buflen) };
        resolver().get_by_name(name, out, &mut buf)
    })
}

/// # Safety
///
/// Same contract as [`by_name`].
unsafe fn by_id<R: Record>(
    id: u32,
    result: *mut R,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    guarded(errnop, || {
        let out = unsafe { result.as_mut() }.ok_or(Unavailable::NullArgument)?;
        let mut buf = unsafe { BufferWriter::from_raw_parts(buffer, buflen) };
        resolver().get_by_id(id, out, &mut buf)
    })
}

/// # Safety
///
/// Same contract as [`by_name`].
unsafe fn next<R: Record>(
    result: *mut R,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    guarded(errnop, || {
        let out = unsafe { result.as_mut() }.ok_or(Unavailable::NullArgument)?;
        let mut buf = unsafe { BufferWriter::from_raw_parts(buffer, buflen) };
        resolver().next(out, &mut buf)
    })
}

fn begin<R: Record>() -> NssStatus {
    guarded(std::ptr::null_mut(), || resolver().begin::<R>())
}

fn end<R: Record>() -> NssStatus {
    guarded(std::ptr::null_mut(), || resolver().end::<R>())
}

// passwd

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_setpwent(_stayopen: c_int) -> NssStatus {
    begin::<libc::passwd>()
}

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_endpwent() -> NssStatus {
    end::<libc::passwd>()
}

/// # Safety
///
/// glibc's `getpwent_r` contract: `result` and `errnop` valid, `buffer`
/// valid for `buflen` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getpwent_r(
    result: *mut libc::passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { next(result, buffer, buflen, errnop) }
}

/// # Safety
///
/// glibc's `getpwnam_r` contract; `name` is NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getpwnam_r(
    name: *const c_char,
    result: *mut libc::passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { by_name(name, result, buffer, buflen, errnop) }
}

/// # Safety
///
/// glibc's `getpwuid_r` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getpwuid_r(
    uid: uid_t,
    result: *mut libc::passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { by_id(uid, result, buffer, buflen, errnop) }
}

// group

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_setgrent(_stayopen: c_int) -> NssStatus {
    begin::<libc::group>()
}

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_endgrent() -> NssStatus {
    end::<libc::group>()
}

/// # Safety
///
/// glibc's `getgrent_r` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getgrent_r(
    result: *mut libc::group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { next(result, buffer, buflen, errnop) }
}

/// # Safety
///
/// glibc's `getgrnam_r` contract; `name` is NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getgrnam_r(
    name: *const c_char,
    result: *mut libc::group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { by_name(name, result, buffer, buflen, errnop) }
}

/// # Safety
///
/// glibc's `getgrgid_r` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getgrgid_r(
    gid: gid_t,
    result: *mut libc::group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { by_id(gid, result, buffer, buflen, errnop) }
}

// shadow

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_setspent(_stayopen: c_int) -> NssStatus {
    begin::<libc::spwd>()
}

#[unsafe(no_mangle)]
pub extern "C" fn _nss_script_endspent() -> NssStatus {
    end::<libc::spwd>()
}

/// # Safety
///
/// glibc's `getspent_r` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getspent_r(
    result: *mut libc::spwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { next(result, buffer, buflen, errnop) }
}

/// # Safety
///
/// glibc's `getspnam_r` contract; `name` is NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _nss_script_getspnam_r(
    name: *const c_char,
    result: *mut libc::spwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> NssStatus {
    unsafe { by_name(name, result, buffer, buflen, errnop) }
}
