//! Reply line parsing
//!
//! The helper answers with a single colon separated line in the classic
//! `/etc/passwd`, `/etc/group` or `/etc/shadow` layout. The parsers here
//! borrow from that line and never allocate. Every numeric field is checked
//! in full before a record is handed out, so a value is never truncated.

use std::fmt;

use crate::error::MalformedReply;
use crate::types::RecordKind;

const FIELD_SEPARATOR: char = ':';
const MEMBER_SEPARATOR: char = ',';

/// Default for an absent or empty shadow aging field
pub const AGING_UNSET: i64 = -1;

/// Default for an absent or empty shadow flag field
pub const FLAG_UNSET: u64 = 0;

/// `name:password:uid:gid:gecos:home:shell`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswdLine<'a> {
    pub name: &'a str,
    pub passwd: &'a str,
    pub uid: u32,
    pub gid: u32,
    pub gecos: &'a str,
    pub dir: &'a str,
    pub shell: &'a str,
}

/// `name:password:gid[:member,member,...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLine<'a> {
    pub name: &'a str,
    pub passwd: &'a str,
    pub gid: u32,
    pub members: Members<'a>,
}

/// `name:password[:lastchg:min:max:warn:inactive:expire:flag]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowLine<'a> {
    pub name: &'a str,
    pub passwd: &'a str,
    pub last_change: i64,
    pub min: i64,
    pub max: i64,
    pub warn: i64,
    pub inactive: i64,
    pub expire: i64,
    pub flag: u64,
}

/// Split `line` into its colon fields, rejecting lines that are too short.
///
/// Fields beyond the ones a record uses are ignored.
fn fields<'a, const N: usize>(
    line: &'a str,
    kind: RecordKind,
) -> Result<[Option<&'a str>; N], MalformedReply> {
    if line.is_empty() {
        return Err(MalformedReply::Empty);
    }

    let mut out = [None; N];
    let mut found = 0;
    for field in line.split(FIELD_SEPARATOR) {
        if found < N {
            out[found] = Some(field);
        }
        found += 1;
    }

    let required = kind.required_fields();
    if found < required {
        return Err(MalformedReply::TooFewFields {
            kind,
            found,
            required,
        });
    }
    Ok(out)
}

impl<'a> PasswdLine<'a> {
    pub fn parse(line: &'a str) -> Result<Self, MalformedReply> {
        let [name, passwd, uid, gid, gecos, dir, shell] =
            fields::<7>(line, RecordKind::Passwd)?.map(Option::unwrap_or_default);

        Ok(Self {
            name,
            passwd,
            uid: parse_u32(uid).ok_or(MalformedReply::InvalidNumber("uid"))?,
            gid: parse_u32(gid).ok_or(MalformedReply::InvalidNumber("gid"))?,
            gecos,
            dir,
            shell,
        })
    }
}

impl<'a> GroupLine<'a> {
    pub fn parse(line: &'a str) -> Result<Self, MalformedReply> {
        let [name, passwd, gid, members] = fields::<4>(line, RecordKind::Group)?;
        let name = name.unwrap_or_default();
        let passwd = passwd.unwrap_or_default();
        let gid = gid.unwrap_or_default();

        Ok(Self {
            name,
            passwd,
            gid: parse_u32(gid).ok_or(MalformedReply::InvalidNumber("gid"))?,
            members: Members::new(members.unwrap_or_default()),
        })
    }
}

impl<'a> ShadowLine<'a> {
    pub fn parse(line: &'a str) -> Result<Self, MalformedReply> {
        let [name, passwd, last_change, min, max, warn, inactive, expire, flag] =
            fields::<9>(line, RecordKind::Shadow)?;

        Ok(Self {
            name: name.unwrap_or_default(),
            passwd: passwd.unwrap_or_default(),
            last_change: aging_field(last_change, "lastchg")?,
            min: aging_field(min, "min")?,
            max: aging_field(max, "max")?,
            warn: aging_field(warn, "warn")?,
            inactive: aging_field(inactive, "inact")?,
            expire: aging_field(expire, "expire")?,
            flag: match flag {
                None | Some("") => FLAG_UNSET,
                Some(raw) => parse_u64(raw).ok_or(MalformedReply::InvalidNumber("flag"))?,
            },
        })
    }
}

/// Absent and empty fields default; anything else must parse completely.
fn aging_field(raw: Option<&str>, name: &'static str) -> Result<i64, MalformedReply> {
    match raw {
        None | Some("") => Ok(AGING_UNSET),
        Some(raw) => parse_i64(raw).ok_or(MalformedReply::InvalidNumber(name)),
    }
}

/// Group members, split lazily from the raw member field.
///
/// Empty tokens and repeated names are skipped; the first occurrence of each
/// name keeps its position.
#[derive(Debug, Clone, Copy)]
pub struct Members<'a> {
    field: &'a str,
}

impl<'a> Members<'a> {
    pub fn new(field: &'a str) -> Self {
        Self { field }
    }

    pub fn iter(&self) -> MembersIter<'a> {
        MembersIter {
            field: self.field,
            offset: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl PartialEq for Members<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Members<'_> {}

impl<'a> IntoIterator for Members<'a> {
    type Item = &'a str;
    type IntoIter = MembersIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the distinct, non-empty names of a member field
#[derive(Debug, Clone)]
pub struct MembersIter<'a> {
    field: &'a str,
    offset: usize,
}

impl<'a> Iterator for MembersIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.offset < self.field.len() {
            let start = self.offset;
            let rest = &self.field[start..];
            let token = match rest.find(MEMBER_SEPARATOR) {
                Some(end) => {
                    self.offset = start + end + 1;
                    &rest[..end]
                }
                None => {
                    self.offset = self.field.len();
                    rest
                }
            };

            if token.is_empty() {
                continue;
            }
            let seen_before = self.field[..start]
                .split(MEMBER_SEPARATOR)
                .any(|earlier| earlier == token);
            if !seen_before {
                return Some(token);
            }
        }
        None
    }
}

/// Whole-field unsigned decimal parse. Signs, blanks and empty input fail.
pub fn parse_u32(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

pub fn parse_u64(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Whole-field signed decimal parse, allowing a single leading `-`
pub fn parse_i64(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for PasswdLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.passwd, self.uid, self.gid, self.gecos, self.dir, self.shell
        )
    }
}

impl fmt::Display for GroupLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:", self.name, self.passwd, self.gid)?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(member)?;
        }
        Ok(())
    }
}

impl fmt::Display for ShadowLine<'_> {
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
