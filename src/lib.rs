//! nss-script
//!
//! A glibc NSS module that answers passwd, group and shadow lookups by
//! running an external helper program and marshalling its one-line reply into
//! the caller's `struct passwd`, `struct group` or `struct spwd`.

pub mod buffer;
pub mod cli;
pub mod config;
pub mod entry;
pub mod enumeration;
pub mod error;
pub mod line_parser;
pub mod nss_abi;
pub mod records;
pub mod resolver;
pub mod script_runner;
pub mod types;

// Re-export main types for convenience
pub use buffer::BufferWriter;
pub use config::HelperConfig;
pub use entry::{GroupEntry, PasswdEntry, ShadowEntry};
pub use enumeration::EnumerationState;
pub use error::{BufferTooSmall, MalformedReply, NssError, Unavailable};
pub use line_parser::{GroupLine, Members, PasswdLine, ShadowLine};
pub use records::Record;
pub use resolver::Resolver;
pub use script_runner::{Helper, RawReply, ScriptHelper};
pub use types::{HelperStatus, NssStatus, RecordKind, Verb};
