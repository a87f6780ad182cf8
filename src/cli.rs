//! Command-line interface definitions and parsing.

use crate::datetime::parse_timezone;
use crate::error::{Error, Result};
use crate::jumplist::JumpListKind;
use crate::output::OutputFormat;
use clap::Parser;
use is_terminal::IsTerminal;
use std::fs;
use std::path::{Path, PathBuf};

/// Default cap on accepted input size (64 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

/// Input file types supported by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// Automatic Destinations jump list (.automaticDestinations-ms)
    AutomaticDestinations,
    /// Custom Destinations jump list (.customDestinations-ms)
    CustomDestinations,
}

impl InputType {
    pub fn detect(path: &Path) -> Option<Self> {
        JumpListKind::from_path(path).map(Self::from)
    }

    pub fn kind(self) -> JumpListKind {
        match self {
            InputType::AutomaticDestinations => JumpListKind::Automatic,
            InputType::CustomDestinations => JumpListKind::Custom,
        }
    }
}

impl From<JumpListKind> for InputType {
    fn from(kind: JumpListKind) -> Self {
        match kind {
            JumpListKind::Automatic => InputType::AutomaticDestinations,
            JumpListKind::Custom => InputType::CustomDestinations,
        }
    }
}

/// jl - Windows Jump List decoder
#[derive(Parser, Debug)]
#[command(name = "jl", version)]
#[command(about = "jl - Windows Jump List decoder")]
#[command(long_about = "Decodes Windows Jump Lists into flat records:
• .automaticDestinations-ms: DestList index joined with embedded shell links
• .customDestinations-ms: carved shell links

Directories are scanned (non-recursively) for jump list files.")]
pub struct Args {
    /// Jump list files or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format (default: human on a terminal, json otherwise)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (use "-" for stdout, default: stdout)
    #[arg(long)]
    pub output: Option<String>,

    /// Display timestamps in this timezone ("UTC" or an IANA name like "Europe/Berlin")
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Only keep entries whose target, DestList or resolved path matches (regex, case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Skip input files larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parsed and validated CLI configuration
#[derive(Debug)]
pub struct Config {
    pub inputs: Vec<(PathBuf, InputType)>,
    pub format: OutputFormat,
    pub output: Option<String>,
    pub timezone: chrono_tz::Tz,
    pub filter_regex: Option<regex::Regex>,
    pub max_size: u64,
    pub verbose: u8,
}

impl Config {
    /// Parse and validate CLI arguments into a configuration
    pub fn from_args(args: Args) -> Result<Self> {
        let mut inputs = Vec::new();
        for input in &args.inputs {
            inputs.extend(Self::expand_input(input)?);
        }
        if inputs.is_empty() {
            return Err(Error::InvalidInput("no jump list files found".to_string()));
        }

        let timezone = parse_timezone(&args.timezone)?;

        let filter_regex = match &args.filter {
            Some(pattern) => Some(
                regex::RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        Error::InvalidInput(format!("Invalid regex pattern '{}': {}", pattern, e))
                    })?,
            ),
            None => None,
        };

        let to_terminal = matches!(args.output.as_deref(), None | Some("-"))
            && std::io::stdout().is_terminal();
        let format = args
            .format
            .unwrap_or_else(|| OutputFormat::default_for(to_terminal));

        Ok(Config {
            inputs,
            format,
            output: args.output,
            timezone,
            filter_regex,
            max_size: args.max_size,
            verbose: args.verbose,
        })
    }

    /// A file must be a jump list; a directory yields the jump lists inside it
    fn expand_input(path: &Path) -> Result<Vec<(PathBuf, InputType)>> {
        if path.is_dir() {
            let mut found: Vec<(PathBuf, InputType)> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .filter_map(|p| InputType::detect(&p).map(|t| (p, t)))
                .collect();
            found.sort_by(|a, b| a.0.cmp(&b.0));
            log::info!("{}: {} jump list files", path.display(), found.len());
            return Ok(found);
        }

        let input_type = InputType::detect(path).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown file type: {} (expected .automaticDestinations-ms or .customDestinations-ms)",
                path.display()
            ))
        })?;
        Ok(vec![(path.to_path_buf(), input_type)])
    }
}
