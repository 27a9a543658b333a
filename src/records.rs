//! Filling the host's record structs
//!
//! Each record kind parses its reply line completely before touching the
//! caller's buffer, then writes every string, and only then stores the
//! resulting pointers into the output struct. A failure at any point leaves
//! the struct exactly as it was.

use nix::libc::{self, c_long, c_ulong};

use crate::buffer::BufferWriter;
use crate::error::{MalformedReply, Result};
use crate::line_parser::{GroupLine, PasswdLine, ShadowLine};
use crate::types::RecordKind;

/// A C struct the helper's reply can be marshalled into.
pub trait Record {
    const KIND: RecordKind;

    /// Parse `line` and populate `self`, placing strings in `buf`.
    fn fill(&mut self, line: &str, buf: &mut BufferWriter<'_>) -> Result<()>;
}

impl Record for libc::passwd {
    const KIND: RecordKind = RecordKind::Passwd;

    fn fill(&mut self, line: &str, buf: &mut BufferWriter<'_>) -> Result<()> {
        let entry = PasswdLine::parse(line)?;

        let name = buf.write_str(entry.name)?;
        let passwd = buf.write_str(entry.passwd)?;
        let gecos = buf.write_str(entry.gecos)?;
        let dir = buf.write_str(entry.dir)?;
        let shell = buf.write_str(entry.shell)?;

        self.pw_name = name;
        self.pw_passwd = passwd;
        self.pw_uid = entry.uid;
        self.pw_gid = entry.gid;
        self.pw_gecos = gecos;
        self.pw_dir = dir;
        self.pw_shell = shell;
        Ok(())
    }
}

impl Record for libc::group {
    const KIND: RecordKind = RecordKind::Group;

    fn fill(&mut self, line: &str, buf: &mut BufferWriter<'_>) -> Result<()> {
        let entry = GroupLine::parse(line)?;

        let name = buf.write_str(entry.name)?;
        let passwd = buf.write_str(entry.passwd)?;
        let members = buf.write_str_array(entry.members)?;

        self.gr_name = name;
        self.gr_passwd = passwd;
        self.gr_gid = entry.gid;
        self.gr_mem = members;
        Ok(())
    }
}

impl Record for libc::spwd {
    const KIND: RecordKind = RecordKind::Shadow;

    fn fill(&mut self, line: &str, buf: &mut BufferWriter<'_>) -> Result<()> {
        let entry = ShadowLine::parse(line)?;
        let last_change = long_field(entry.last_change, "lastchg")?;
        let min = long_field(entry.min, "min")?;
        let max = long_field(entry.max, "max")?;
        let warn = long_field(entry.warn, "warn")?;
        let inactive = long_field(entry.inactive, "inact")?;
        let expire = long_field(entry.expire, "expire")?;
        let flag = ulong_field(entry.flag, "flag")?;

        let name = buf.write_str(entry.name)?;
        let passwd = buf.write_str(entry.passwd)?;

        self.sp_namp = name;
        self.sp_pwdp = passwd;
        self.sp_lstchg = last_change;
        self.sp_min = min;
        self.sp_max = max;
        self.sp_warn = warn;
        self.sp_inact = inactive;
        self.sp_expire = expire;
        self.sp_flag = flag;
        Ok(())
    }
}

/// `long` is 32 bits on some targets; values that do not fit are malformed.
#[allow(clippy::useless_conversion)]
fn long_field(value: i64, name: &'static str) -> std::result::Result<c_long, MalformedReply> {
    c_long::try_from(value).map_err(|_| MalformedReply::InvalidNumber(name))
}

#[allow(clippy::useless_conversion)]
fn ulong_field(value: u64, name: &'static str) -> std::result::Result<c_ulong, MalformedReply> {
    c_ulong::try_from(value).map_err(|_| MalformedReply::InvalidNumber(name))
}
