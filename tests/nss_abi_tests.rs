//! Tests for the exported NSS symbols
//!
//! Calls the `_nss_script_*` functions the way glibc does, against a helper
//! selected through `NSS_SCRIPT_HELPER`. The process-wide resolver reads the
//! variable once, so every test goes through `setup()` before its first call.
//! Each database is enumerated by at most one test since cursors are shared.

mod common;

use std::mem::MaybeUninit;
use std::ptr;
use std::sync::Once;

use nix::libc::{self, c_char, c_int};

use nss_script::config::HELPER_PATH_ENV;
use nss_script::nss_abi::*;
use nss_script::{GroupEntry, NssStatus, PasswdEntry, ShadowEntry};

fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let helper = &common::fixture().directory;
        // SAFETY: runs before any test in this binary reads the environment.
        unsafe { std::env::set_var(HELPER_PATH_ENV, helper) };
    });
}

fn zeroed<T>() -> T {
    unsafe { MaybeUninit::zeroed().assume_init() }
}

fn getpwnam(name: &[u8], buflen: usize) -> (NssStatus, c_int, Option<PasswdEntry>) {
    setup();
    let mut buf = vec![0u8; buflen];
    let mut pwd: libc::passwd = zeroed();
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getpwnam_r(
            name.as_ptr().cast(),
            &mut pwd,
            buf.as_mut_ptr().cast(),
            buf.len(),
            &mut errno,
        )
    };
    let entry = (status == NssStatus::Success).then(|| unsafe { PasswdEntry::from_raw(&pwd) });
    (status, errno, entry)
}

// =============================================================================
// passwd
// =============================================================================

#[test]
fn test_getpwnam_alice() {
    let (status, _, entry) = getpwnam(b"alice\0", 4096);
    assert_eq!(status, NssStatus::Success);
    let entry = entry.unwrap();
    assert_eq!(entry.name, "alice");
    assert_eq!(entry.uid, 1001);
    assert_eq!(entry.gecos, "Alice Smith");
    assert_eq!(entry.shell, "/bin/zsh");
}

#[test]
fn test_getpwnam_small_buffer_sets_erange() {
    let (status, errno, entry) = getpwnam(b"alice\0", 10);
    assert_eq!(status, NssStatus::TryAgain);
    assert_eq!(errno, libc::ERANGE);
    assert!(entry.is_none());
}

#[test]
fn test_getpwnam_try_again_sets_eagain() {
    let (status, errno, _) = getpwnam(b"slowuser\0", 4096);
    assert_eq!(status, NssStatus::TryAgain);
    assert_eq!(errno, libc::EAGAIN);
}

#[test]
fn test_getpwnam_unknown_is_not_found() {
    let (status, errno, _) = getpwnam(b"mallory\0", 4096);
    assert_eq!(status, NssStatus::NotFound);
    assert_eq!(errno, libc::ENOENT);
}

#[test]
fn test_getpwnam_malformed_is_unavailable() {
    let (status, errno, _) = getpwnam(b"broken\0", 4096);
    assert_eq!(status, NssStatus::Unavail);
    assert_eq!(errno, libc::ENOENT);
}

#[test]
fn test_getpwnam_invalid_utf8_key() {
    let (status, _, _) = getpwnam(b"al\xffce\0", 4096);
    assert_eq!(status, NssStatus::Unavail);
}

#[test]
fn test_null_arguments_are_unavailable() {
    setup();
    let mut buf = [0u8; 256];
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getpwnam_r(
            c"alice".as_ptr(),
            ptr::null_mut(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            &mut errno,
        )
    };
    assert_eq!(status, NssStatus::Unavail);

    let mut pwd: libc::passwd = zeroed();
    let status = unsafe {
        _nss_script_getpwnam_r(ptr::null(), &mut pwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Unavail);

    // A null buffer behaves like an empty one
    let status = unsafe {
        _nss_script_getpwnam_r(c"alice".as_ptr(), &mut pwd, ptr::null_mut(), 4096, &mut errno)
    };
    assert_eq!(status, NssStatus::TryAgain);
    assert_eq!(errno, libc::ERANGE);
}

#[test]
fn test_getpwuid() {
    setup();
    let mut buf = [0u8; 1024];
    let mut pwd: libc::passwd = zeroed();
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getpwuid_r(1002, &mut pwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    assert_eq!(unsafe { PasswdEntry::from_raw(&pwd) }.name, "bob");
}

#[test]
fn test_passwd_enumeration_with_erange_retries() {
    setup();
    assert_eq!(_nss_script_setpwent(0), NssStatus::Success);

    let mut names = Vec::new();
    let mut buflen = 8;
    loop {
        let mut buf = vec![0u8; buflen];
        let mut pwd: libc::passwd = zeroed();
        let mut errno: c_int = 0;
        let status = unsafe {
            _nss_script_getpwent_r(&mut pwd, buf.as_mut_ptr().cast::<c_char>(), buf.len(), &mut errno)
        };
        match status {
            NssStatus::Success => names.push(unsafe { PasswdEntry::from_raw(&pwd) }.name),
            NssStatus::TryAgain if errno == libc::ERANGE => buflen *= 2,
            NssStatus::NotFound => break,
            other => panic!("unexpected status {:?} errno {}", other, errno),
        }
        assert!(names.len() <= 3 && buflen <= 4096, "enumeration did not stop");
    }

    assert_eq!(_nss_script_endpwent(), NssStatus::Success);
    assert_eq!(names, ["alice", "bob", "carol"]);
}

// =============================================================================
// group
// =============================================================================

#[test]
fn test_getgrnam_and_getgrgid() {
    setup();
    let mut errno: c_int = 0;

    let mut buf = [0u8; 1024];
    let mut grp: libc::group = zeroed();
    let status = unsafe {
        _nss_script_getgrnam_r(c"devs".as_ptr(), &mut grp, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    let by_name = unsafe { GroupEntry::from_raw(&grp) };

    let mut buf = [0u8; 1024];
    let mut grp: libc::group = zeroed();
    let status = unsafe {
        _nss_script_getgrgid_r(500, &mut grp, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    let by_gid = unsafe { GroupEntry::from_raw(&grp) };

    assert_eq!(by_name, by_gid);
    assert_eq!(by_name.members, ["alice", "bob"]);
}

#[test]
fn test_group_enumeration() {
    setup();
    assert_eq!(_nss_script_setgrent(1), NssStatus::Success);

    let mut groups = Vec::new();
    for _ in 0..4 {
        let mut buf = [0u8; 1024];
        let mut grp: libc::group = zeroed();
        let mut errno: c_int = 0;
        let status = unsafe {
            _nss_script_getgrent_r(&mut grp, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
        };
        if status != NssStatus::Success {
            assert_eq!(status, NssStatus::NotFound);
            break;
        }
        groups.push(unsafe { GroupEntry::from_raw(&grp) });
    }

    assert_eq!(_nss_script_endgrent(), NssStatus::Success);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].members, ["alice", "bob"]);
    assert!(groups[1].members.is_empty());
}

// =============================================================================
// shadow
// =============================================================================

#[test]
fn test_getspnam_defaults() {
    setup();
    let mut buf = [0u8; 256];
    let mut spwd: libc::spwd = zeroed();
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getspnam_r(c"bob".as_ptr(), &mut spwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    let entry = unsafe { ShadowEntry::from_raw(&spwd) };
    assert_eq!(entry.to_string(), "bob:!:::::::0");
}

#[test]
fn test_getspnam_full_record() {
    setup();
    let mut buf = [0u8; 256];
    let mut spwd: libc::spwd = zeroed();
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getspnam_r(c"alice".as_ptr(), &mut spwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    let entry = unsafe { ShadowEntry::from_raw(&spwd) };
    assert_eq!(entry.passwd, "$6$salt$hash");
    assert_eq!(entry.last_change, 19500);
    assert_eq!(entry.max, 99999);
    assert_eq!(entry.inactive, -1);
}

#[test]
fn test_shadow_enumeration_ignores_setspent_failure() {
    setup();
    // The helper exits 3 for setspent and endspent
    assert_eq!(_nss_script_setspent(0), NssStatus::Success);

    let mut buf = [0u8; 256];
    let mut spwd: libc::spwd = zeroed();
    let mut errno: c_int = 0;
    let status = unsafe {
        _nss_script_getspent_r(&mut spwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::Success);
    assert_eq!(unsafe { ShadowEntry::from_raw(&spwd) }.name, "bob");

    let status = unsafe {
        _nss_script_getspent_r(&mut spwd, buf.as_mut_ptr().cast(), buf.len(), &mut errno)
    };
    assert_eq!(status, NssStatus::NotFound);
    assert_eq!(errno, libc::ENOENT);
    assert_eq!(_nss_script_endspent(), NssStatus::Success);
}
