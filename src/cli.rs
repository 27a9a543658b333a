use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::types::RecordKind;

/// Query the helper exactly the way the NSS module does
#[derive(Parser, Debug)]
#[command(name = "nss-script-query")]
#[command(about = "Resolve passwd, group and shadow entries through the nss-script helper")]
#[command(version)]
pub struct Cli {
    /// Helper program to run (defaults to $NSS_SCRIPT_HELPER or the system helper)
    #[arg(long)]
    pub helper: Option<PathBuf>,

    /// Initial scratch buffer size in bytes; doubled while too small
    #[arg(long, default_value_t = 1024)]
    pub buffer_size: usize,

    /// Give up once the buffer would exceed this many bytes
    #[arg(long, default_value_t = 1 << 20)]
    pub max_buffer_size: usize,

    /// Print entries as JSON instead of colon separated lines
    #[arg(long)]
    pub json: bool,

    /// Database to query
    #[arg(value_enum)]
    pub database: Database,

    /// Name or numeric id; omit to enumerate every entry
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Database {
    Passwd,
    Group,
    Shadow,
}

impl From<Database> for RecordKind {
    fn from(db: Database) -> Self {
        match db {
            Database::Passwd => RecordKind::Passwd,
            Database::Group => RecordKind::Group,
            Database::Shadow => RecordKind::Shadow,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
