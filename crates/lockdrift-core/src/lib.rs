//! # lockdrift-core
//!
//! Drift detection between a resolved lockfile and a requirements manifest.
//!
//! This crate provides functionality to:
//! - Parse a sectioned JSON lockfile into a canonical name → pin mapping
//! - Parse a requirements manifest, filtering lines by environment markers
//! - Compare the two mappings under configurable strictness
//!
//! The loaders are independent pure reads; the comparator is a pure
//! function of their outputs. Nothing here resolves, fetches, or validates
//! packages: drift detection only.
//!
//! ## Example
//!
//! ```rust
//! use lockdrift_core::{compare, lockfile, requirements, MarkerEnv};
//!
//! # fn example() -> lockdrift_core::Result<()> {
//! let lock = lockfile::parse(
//!     r#"{"default": {"requests": {"version": "==2.31.0"}}}"#,
//!     &["default"],
//! )?;
//! let reqs = requirements::parse("requests==2.31.0\n", &MarkerEnv::host())?;
//! let diff = compare(&lock, &reqs, false);
//! assert!(diff.ok);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]

pub mod compare;
pub mod error;
pub mod lockfile;
pub mod markers;
pub mod requirements;
pub mod types;

// Re-export main types and entry points
pub use compare::{compare, DiffResult, Mismatch};
pub use error::{Error, Result};
pub use markers::{MarkerEnv, MarkerError};
pub use types::{ManifestMapping, PackageName, Pin, SourceKind, SourceRef};
