//! Lockfile loading.
//!
//! The lockfile is a JSON document with one object per section (by default
//! `default` and `develop`), each mapping a raw package name to a loosely
//! typed metadata record. Pin extraction follows a fixed precedence so the
//! result stays auditable: resolved version, then VCS ref/rev, then file,
//! then url, falling back to the verbatim record.

use crate::types::{ManifestMapping, PackageName, Pin, SourceKind, SourceRef};
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read and parse a lockfile, keeping entries from the given sections.
pub fn load(path: &Path, sections: &[&str]) -> Result<ManifestMapping> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents, sections)
}

/// Parse lockfile contents into a canonical name → pin mapping.
///
/// Sections are processed in the order given; a package appearing in
/// several sections keeps the last section's pin. Requested sections
/// missing from the document contribute nothing. A document, section, or
/// metadata record of the wrong JSON shape is a fatal parse error.
pub fn parse(contents: &str, sections: &[&str]) -> Result<ManifestMapping> {
    let document: Value = serde_json::from_str(contents)?;
    let Value::Object(root) = document else {
        return Err(Error::LockFormat {
            detail: "top level is not an object".to_string(),
        });
    };

    let mut deps = ManifestMapping::new();
    for section in sections {
        let Some(entries) = root.get(*section) else {
            continue;
        };
        let Value::Object(entries) = entries else {
            return Err(Error::LockFormat {
                detail: format!("section `{section}` is not an object"),
            });
        };
        debug!(section = *section, entries = entries.len(), "reading lock section");
        for (raw_name, meta) in entries {
            let Value::Object(meta) = meta else {
                return Err(Error::LockFormat {
                    detail: format!("entry `{raw_name}` in section `{section}` is not an object"),
                });
            };
            deps.insert(PackageName::new(raw_name), entry_pin(meta));
        }
    }
    Ok(deps)
}

/// Extract the pin for one lock entry; the first applicable rule wins.
fn entry_pin(meta: &serde_json::Map<String, Value>) -> Pin {
    if let Some(version) = string_field(meta, "version") {
        return Pin::exact(version);
    }
    if let Some(reference) = string_field(meta, "ref").or_else(|| string_field(meta, "rev")) {
        return Pin::Source(SourceRef {
            kind: SourceKind::Git,
            location: string_field(meta, "git").unwrap_or_default().to_string(),
            reference: Some(reference.to_string()),
        });
    }
    if let Some(file) = string_field(meta, "file") {
        return Pin::Source(SourceRef {
            kind: SourceKind::File,
            location: file.to_string(),
            reference: None,
        });
    }
    if let Some(url) = string_field(meta, "url") {
        return Pin::Source(SourceRef {
            kind: SourceKind::Url,
            location: url.to_string(),
            reference: None,
        });
    }
    // Nothing recognizable; keep the whole record for string comparison.
    Pin::Opaque(Value::Object(meta.clone()).to_string())
}

fn string_field<'a>(meta: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    meta.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> PackageName {
        PackageName::new(raw)
    }

    #[test]
    fn version_field_becomes_exact_pin() {
        let deps = parse(
            r#"{"default": {"requests": {"version": "==2.31.0", "hashes": []}}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps[&name("requests")], Pin::Exact("2.31.0".to_string()));
    }

    #[test]
    fn bare_version_field_also_becomes_exact_pin() {
        let deps = parse(
            r#"{"default": {"requests": {"version": "2.31.0"}}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps[&name("requests")], Pin::Exact("2.31.0".to_string()));
    }

    #[test]
    fn ref_takes_precedence_over_rev() {
        let deps = parse(
            r#"{"default": {"mylib": {
                "git": "https://github.com/example/mylib",
                "ref": "v1.0",
                "rev": "abc123"
            }}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(
            deps[&name("mylib")],
            Pin::Source(SourceRef {
                kind: SourceKind::Git,
                location: "https://github.com/example/mylib".to_string(),
                reference: Some("v1.0".to_string()),
            })
        );
    }

    #[test]
    fn rev_is_used_when_ref_is_absent() {
        let deps = parse(
            r#"{"default": {"mylib": {"git": "https://example.com/r.git", "rev": "abc123"}}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(
            deps[&name("mylib")].to_string(),
            "git:https://example.com/r.git@abc123"
        );
    }

    #[test]
    fn git_location_may_be_missing() {
        let deps = parse(r#"{"default": {"mylib": {"ref": "v2"}}}"#, &["default"]).unwrap();
        assert_eq!(deps[&name("mylib")].to_string(), "git:@v2");
    }

    #[test]
    fn file_and_url_fields() {
        let deps = parse(
            r#"{"default": {
                "local": {"file": "./dist/local-1.0.tar.gz"},
                "remote": {"url": "https://example.com/pkg.whl"}
            }}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps[&name("local")].to_string(), "file:./dist/local-1.0.tar.gz");
        assert_eq!(deps[&name("remote")].to_string(), "url:https://example.com/pkg.whl");
    }

    #[test]
    fn version_wins_over_source_fields() {
        let deps = parse(
            r#"{"default": {"both": {"version": "==1.0", "url": "https://example.com/x.whl"}}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps[&name("both")], Pin::Exact("1.0".to_string()));
    }

    #[test]
    fn unrecognized_record_is_kept_verbatim() {
        let deps = parse(
            r#"{"default": {"odd": {"markers": "python_version >= '3.8'"}}}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(
            deps[&name("odd")],
            Pin::Opaque(r#"{"markers":"python_version >= '3.8'"}"#.to_string())
        );
    }

    #[test]
    fn later_sections_override_earlier_ones() {
        let contents = r#"{
            "default": {"shared": {"version": "==1.0"}},
            "develop": {"shared": {"version": "==2.0"}}
        }"#;
        let deps = parse(contents, &["default", "develop"]).unwrap();
        assert_eq!(deps[&name("shared")], Pin::Exact("2.0".to_string()));

        let deps = parse(contents, &["develop", "default"]).unwrap();
        assert_eq!(deps[&name("shared")], Pin::Exact("1.0".to_string()));
    }

    #[test]
    fn unknown_sections_are_silently_empty() {
        let deps = parse(r#"{"default": {"a": {"version": "==1.0"}}}"#, &["nope"]).unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn names_are_canonicalized_with_last_seen_winning() {
        let deps = parse(
            r#"{"default": {
                "Foo_Bar": {"version": "==1.0"},
                "foo-bar": {"version": "==2.0"}
            }}"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[&name("foo-bar")], Pin::Exact("2.0".to_string()));
    }

    #[test]
    fn malformed_documents_are_fatal() {
        assert!(matches!(
            parse("[]", &["default"]),
            Err(Error::LockFormat { .. })
        ));
        assert!(matches!(
            parse(r#"{"default": ["not", "a", "map"]}"#, &["default"]),
            Err(Error::LockFormat { .. })
        ));
        assert!(matches!(
            parse(r#"{"default": {"pkg": "==1.0"}}"#, &["default"]),
            Err(Error::LockFormat { .. })
        ));
        assert!(matches!(parse("not json", &["default"]), Err(Error::Json(_))));
    }

    #[test]
    fn non_requested_sections_are_ignored() {
        let deps = parse(
            r#"{
                "_meta": {"hash": {"sha256": "abc"}},
                "default": {"a": {"version": "==1.0"}},
                "develop": {"b": {"version": "==2.0"}}
            }"#,
            &["default"],
        )
        .unwrap();
        assert_eq!(deps.len(), 1);
        assert!(deps.contains_key(&name("a")));
    }
}
