//! # jl - Windows Jump List decoder
//!
//! Reconstructs a user's recent-items history from the two Jump List formats:
//! `.automaticDestinations-ms` files (a compound document holding the
//! `DestList` MRU index plus one shell link per entry) and
//! `.customDestinations-ms` files (shell links written back to back).
//!
//! ## Features
//!
//! - Compound document reader with mini stream and DIFAT support
//! - DestList decoding for Windows 7 through 11 layouts
//! - Shell link decoding including LinkInfo and tracker data
//! - Droid identifiers decoded to timestamps and hardware addresses
//! - Display names for known folder and shell namespace paths
//! - Multiple output formats (human-readable, JSON, CSV)
//!
//! ```no_run
//! let artifact = jl::decode(std::path::Path::new("1b4dd67f29cb1962.automaticDestinations-ms"))?;
//! for entry in &artifact.entries {
//!     println!("{:?}", entry.shortcut.as_ref().and_then(|s| s.target_path.as_ref()));
//! }
//! # Ok::<(), jl::Error>(())
//! ```

pub mod app;
pub mod carve;
pub mod cli;
pub mod datetime;
pub mod destlist;
pub mod error;
pub mod guid;
pub mod jumplist;
pub mod known_ids;
pub mod lnk_parser;
pub mod ole;
pub mod output;
pub mod path_resolver;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
pub use guid::StructuredIdentifier;
pub use jumplist::{decode, decode_bytes, JumpListArtifact, JumpListEntry, JumpListKind};
pub use output::{JumpListRow, OutputFormat, OutputWriter};
