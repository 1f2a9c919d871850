//! Core identity and pin types shared by both loaders.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical package identity.
///
/// Raw names vary in case and use `-`, `_`, and `.` interchangeably;
/// canonicalization lowercases the name and collapses every separator run
/// into a single `-`, so `Foo_Bar`, `foo-bar`, and `FOO.BAR` are the same
/// key. Canonicalization is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Canonicalize a raw package name.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let mut canonical = String::with_capacity(raw.len());
        let mut prev_separator = false;
        for ch in raw.chars() {
            if matches!(ch, '-' | '_' | '.') {
                if !prev_separator {
                    canonical.push('-');
                }
                prev_separator = true;
            } else {
                prev_separator = false;
                canonical.extend(ch.to_lowercase());
            }
        }
        PackageName(canonical)
    }

    /// The canonical form as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of non-registry source a pin can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Version-control checkout pinned to a ref or revision.
    Git,
    /// Local or remote file (sdist, wheel).
    File,
    /// Direct URL reference.
    Url,
}

/// A non-registry source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// What kind of source this is.
    pub kind: SourceKind,
    /// Repository URL, file path, or direct URL.
    pub location: String,
    /// VCS ref or revision, when the kind carries one.
    pub reference: Option<String>,
}

/// How a package's version or source is pinned.
///
/// Both loaders normalize into this shape. `Display` renders the canonical
/// comparison string, so two pins agree exactly when their rendered forms
/// are byte-identical; the loaders are responsible for producing identical
/// text for genuinely equal pins (exact versions are stored bare, with any
/// equality operator stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pin {
    /// A precise version, stored without an equality operator prefix.
    Exact(String),
    /// A VCS, file, or URL source.
    Source(SourceRef),
    /// Any other constraint text, preserved verbatim.
    Opaque(String),
    /// No constraint at all (requirements side only).
    Unpinned,
}

impl Pin {
    /// Build an exact pin from a version that may carry a `==` or `===`
    /// operator prefix, as lockfiles conventionally store it.
    pub fn exact(version: &str) -> Self {
        let trimmed = version.trim();
        let bare = trimmed
            .strip_prefix("===")
            .or_else(|| trimmed.strip_prefix("=="))
            .unwrap_or(trimmed);
        Pin::Exact(bare.trim().to_string())
    }

    /// Whether this pin constrains anything worth comparing.
    ///
    /// Unpinned requirements (and empty opaque text) are skipped by the
    /// comparator rather than reported as mismatches.
    pub fn is_pinned(&self) -> bool {
        match self {
            Pin::Unpinned => false,
            Pin::Opaque(text) => !text.is_empty(),
            Pin::Exact(_) | Pin::Source(_) => true,
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Exact(version) => f.write_str(version),
            Pin::Source(source) => match source.kind {
                SourceKind::Git => write!(
                    f,
                    "git:{}@{}",
                    source.location,
                    source.reference.as_deref().unwrap_or("")
                ),
                SourceKind::File => write!(f, "file:{}", source.location),
                SourceKind::Url => write!(f, "url:{}", source.location),
            },
            Pin::Opaque(text) => f.write_str(text),
            Pin::Unpinned => Ok(()),
        }
    }
}

/// One loader's view of its manifest: canonical name to pin.
///
/// The ordered map keeps reporting sorted by name and makes duplicate
/// declarations overwrite (last seen wins).
pub type ManifestMapping = BTreeMap<PackageName, Pin>;


#[cfg(test)]
#[cfg(feature = "property-tests")]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: canonicalizing a canonical name is a no-op.
        #[test]
        fn canonicalization_is_idempotent(raw in "[A-Za-z0-9._-]{1,40}") {
            let once = PackageName::new(&raw);
            let twice = PackageName::new(once.as_str());
            prop_assert_eq!(once, twice);
        }

        /// Property: the three separator characters are interchangeable.
        #[test]
        fn separators_are_interchangeable(
            head in "[a-z0-9]{1,10}",
            sep in "[-_.]",
            tail in "[a-z0-9]{1,10}"
        ) {
            let spelled = format!("{head}{sep}{tail}");
            let dashed = format!("{head}-{tail}");
            prop_assert_eq!(PackageName::new(&spelled), PackageName::new(&dashed));
        }

        /// Property: case never affects identity.
        #[test]
        fn case_is_ignored(raw in "[A-Za-z]{1,20}") {
            prop_assert_eq!(
                PackageName::new(&raw),
                PackageName::new(&raw.to_lowercase())
            );
        }
    }
}
