use std::path::PathBuf;
use std::str::FromStr;

use bnk_types::{Endian, MediaId};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bnkw",
    about = "Inspect soundbanks and swap their embedded media",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Byte order of the bank; overrides the config file
    #[arg(long, global = true)]
    pub endian: Option<EndianArg>,

    /// TOML file with codec options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum EndianArg {
    Little,
    Big,
}

impl From<EndianArg> for Endian {
    fn from(arg: EndianArg) -> Self {
        match arg {
            EndianArg::Little => Endian::Little,
            EndianArg::Big => Endian::Big,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show section sizes and counts
    Info(BankArgs),
    /// List embedded media
    List(BankArgs),
    /// List hierarchy objects
    Objects(ObjectsArgs),
    /// Write embedded media to disk
    Extract(ExtractArgs),
    /// Replace embedded media and write a new bank
    Replace(ReplaceArgs),
    /// Check that the bank rewrites byte for byte
    Verify(BankArgs),
}

#[derive(Args)]
pub struct BankArgs {
    pub bank: PathBuf,
}

#[derive(Args)]
pub struct ObjectsArgs {
    pub bank: PathBuf,
    /// Only objects of this kind (e.g. `Sound`, `Event`)
    #[arg(long)]
    pub kind: Option<String>,
}

#[derive(Args)]
pub struct ExtractArgs {
    pub bank: PathBuf,
    /// Media id, decimal or 0x-prefixed hex
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    pub id: Option<MediaId>,
    /// Extract every entry as `<id>.wem`
    #[arg(long)]
    pub all: bool,
    /// Output file, or directory with `--all`
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct ReplaceArgs {
    pub bank: PathBuf,
    /// `<id>=<file>` pairs
    #[arg(short = 'r', long = "replace", value_name = "ID=FILE")]
    pub replacements: Vec<ReplacementSpec>,
    /// Directory scanned for `<id>.wem` files
    #[arg(long)]
    pub from_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub output: PathBuf,
}

/// One `<id>=<file>` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplacementSpec {
    pub id: MediaId,
    pub path: PathBuf,
}

impl FromStr for ReplacementSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=FILE, got {s:?}"))?;
        if path.is_empty() {
            return Err(format!("missing file for media {id}"));
        }
        let id = id.trim().parse::<MediaId>().map_err(|e| e.to_string())?;
        Ok(Self {
            id,
            path: PathBuf::from(path),
        })
    }
}
