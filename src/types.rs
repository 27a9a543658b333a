//! Closed vocabulary shared by every layer of the module.
//!
//! Record kinds, helper verbs and the two status enums are plain Rust enums so
//! that every dispatch over them is an exhaustive `match`.

use nix::libc::c_int;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The three databases this module answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Passwd,
    Group,
    Shadow,
}

impl RecordKind {
    /// Verb for a lookup keyed by name.
    pub fn by_name_verb(self) -> Verb {
        match self {
            Self::Passwd => Verb::GetPwNam,
            Self::Group => Verb::GetGrNam,
            Self::Shadow => Verb::GetSpNam,
        }
    }

    /// Verb for a lookup keyed by numeric id. Shadow entries have none.
    pub fn by_id_verb(self) -> Option<Verb> {
        match self {
            Self::Passwd => Some(Verb::GetPwUid),
            Self::Group => Some(Verb::GetGrGid),
            Self::Shadow => None,
        }
    }

    pub fn begin_verb(self) -> Verb {
        match self {
            Self::Passwd => Verb::SetPwEnt,
            Self::Group => Verb::SetGrEnt,
            Self::Shadow => Verb::SetSpEnt,
        }
    }

    pub fn next_verb(self) -> Verb {
        match self {
            Self::Passwd => Verb::GetPwEnt,
            Self::Group => Verb::GetGrEnt,
            Self::Shadow => Verb::GetSpEnt,
        }
    }

    pub fn end_verb(self) -> Verb {
        match self {
            Self::Passwd => Verb::EndPwEnt,
            Self::Group => Verb::EndGrEnt,
            Self::Shadow => Verb::EndSpEnt,
        }
    }

    /// Minimum number of colon separated fields a reply line must carry.
    pub fn required_fields(self) -> usize {
        match self {
            Self::Passwd => 7,
            Self::Group => 3,
            Self::Shadow => 2,
        }
    }
}

/// First argument handed to the helper program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
    GetPwNam,
    GetPwUid,
    SetPwEnt,
    GetPwEnt,
    EndPwEnt,
    GetGrNam,
    GetGrGid,
    SetGrEnt,
    GetGrEnt,
    EndGrEnt,
    GetSpNam,
    SetSpEnt,
    GetSpEnt,
    EndSpEnt,
}

impl Verb {
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Outcome of one helper invocation, decoded from its exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HelperStatus {
    Success,
    NotFound,
    TryAgain,
    Unavailable,
}

impl HelperStatus {
    /// 0 success, 1 no such entry, 2 transient failure, anything else unavailable.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            Some(1) => Self::NotFound,
            Some(2) => Self::TryAgain,
            _ => Self::Unavailable,
        }
    }
}

/// `enum nss_status` as glibc defines it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NssStatus {
    TryAgain = -2,
    Unavail = -1,
    NotFound = 0,
    Success = 1,
    Return = 2,
}

impl NssStatus {
    #[inline]
    pub fn as_raw(self) -> c_int {
        self as c_int
    }
}
