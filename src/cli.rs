use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use indexmap::IndexMap;
use log::LevelFilter;

/// XSD schema version selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaVersion {
    #[value(name = "1.0")]
    V10,
    #[value(name = "1.1")]
    V11,
}

impl SchemaVersion {
    /// Parse the form used by `vc:minVersion` attributes.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim() {
            "1.0" => Some(SchemaVersion::V10),
            "1.1" => Some(SchemaVersion::V11),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V10 => write!(f, "1.0"),
            SchemaVersion::V11 => write!(f, "1.1"),
        }
    }
}

/// When to defuse XML entity expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Defuse {
    /// Defuse every input.
    Always,
    /// Defuse only inputs that were given as URLs.
    #[default]
    Remote,
    /// Never defuse; entity substitution is enabled.
    Never,
}

impl Defuse {
    /// Whether defusing applies to an input, given how it was supplied.
    pub fn applies(self, remote: bool) -> bool {
        match self {
            Defuse::Always => true,
            Defuse::Remote => remote,
            Defuse::Never => false,
        }
    }
}

/// Validate XML files against an XSD schema.
///
/// If the --include option is set, it shouldn't usually be necessary to set
/// --schema, --version or --location.
#[derive(Parser, Debug, Clone)]
#[command(name = "xsd-validate")]
pub struct Cli {
    /// Search path for schemas and XML files
    #[arg(short = 'I', long = "include", value_name = "DIR", action = ArgAction::Append)]
    pub include: Vec<PathBuf>,

    /// Path or URL to XSD schema; default: set from first file
    #[arg(short = 'S', long = "schema")]
    pub schema: Option<String>,

    /// XSD schema version; default: set from schema
    #[arg(short = 'V', long = "version", value_enum)]
    pub version: Option<SchemaVersion>,

    /// Fallback schema location (NAMESPACE, PATH) pairs; default: set from
    /// first file and schema
    #[arg(
        short = 'L',
        long = "location",
        num_args = 2,
        value_names = ["NAMESPACE", "PATH"],
        action = ArgAction::Append
    )]
    pub location: Vec<String>,

    /// Use lazy (streaming) validation mode (slower but uses less memory)
    #[arg(long)]
    pub lazy: bool,

    /// When to defuse XML data
    #[arg(long, value_enum, default_value_t = Defuse::Remote)]
    pub defuse: Defuse,

    /// Output terse error messages
    #[arg(short = 't', long)]
    pub terse: bool,

    /// Verbosity level (can specify it multiple times; alternative to
    /// --loglevel)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Logging level (alternative to --verbose)
    #[arg(short = 'l', long, default_value_t = 0)]
    pub loglevel: i32,

    /// XML files to be validated
    #[arg(value_name = "FILE", required = true)]
    pub file: Vec<String>,
}

impl Cli {
    /// Parse the process arguments, honoring `@filename` indirection.
    pub fn parse_args() -> std::io::Result<Self> {
        let args = expand_argfiles(std::env::args_os())?;
        Ok(Self::parse_from(args))
    }

    /// Explicit `-L` pairs, in flag order.
    pub fn locations(&self) -> IndexMap<String, PathBuf> {
        self.location
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), PathBuf::from(&pair[1])))
            .collect()
    }

    /// Level derived from `-v` and `-l`, whichever asks for more.
    ///
    /// `-v` counts are shifted down by one so that `-vv` means info, matching
    /// the historical interface of the tool this replaces.
    pub fn level_filter(&self) -> LevelFilter {
        match (self.verbose as i32 - 1).max(self.loglevel) {
            i if i <= 0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Replace each `@filename` argument with the lines of that file, one
/// argument per line.
pub fn expand_argfiles<I>(args: I) -> std::io::Result<Vec<OsString>>
where
    I: IntoIterator<Item = OsString>,
{
    let mut expanded = Vec::new();
    for arg in args {
        match arg.to_str() {
            Some(s) if s.len() > 1 && s.starts_with('@') => {
                let content = std::fs::read_to_string(&s[1..])?;
                expanded.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(OsString::from),
                );
            }
            _ => expanded.push(arg),
        }
    }
    Ok(expanded)
}
