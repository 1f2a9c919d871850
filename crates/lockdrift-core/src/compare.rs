//! Comparison of the two manifest mappings.
//!
//! Pins compare as their rendered strings. Both loaders store exact pins
//! bare (no `==` prefix), so a true exact equality reduces to identical
//! text on both sides; everything else is a literal string comparison.

use crate::types::{ManifestMapping, PackageName, Pin};

/// A package whose locked pin disagrees with its requested pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Canonical package name.
    pub name: PackageName,
    /// Pin from the requirements manifest.
    pub requested: Pin,
    /// Pin from the lockfile.
    pub locked: Pin,
}

/// Structured outcome of comparing a lockfile against requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Requested packages absent from the lock, sorted by name.
    pub missing_in_lock: Vec<PackageName>,
    /// Pinned requirements whose lock entry disagrees, sorted by name.
    pub version_mismatches: Vec<Mismatch>,
    /// Locked packages never requested; populated only in strict mode.
    pub extra_in_lock: Vec<PackageName>,
    /// True when nothing drifted (extras count only in strict mode).
    pub ok: bool,
}

/// Diff the lock mapping against the requirements mapping.
///
/// An unpinned requirement never produces a mismatch: when its package is
/// locked it passes silently, when it is not it shows up in
/// `missing_in_lock` like any other absent package.
pub fn compare(lock: &ManifestMapping, reqs: &ManifestMapping, strict: bool) -> DiffResult {
    let mut missing_in_lock = Vec::new();
    let mut version_mismatches = Vec::new();

    for (name, requested) in reqs {
        match lock.get(name) {
            None => missing_in_lock.push(name.clone()),
            Some(locked) => {
                if requested.is_pinned() && requested.to_string() != locked.to_string() {
                    version_mismatches.push(Mismatch {
                        name: name.clone(),
                        requested: requested.clone(),
                        locked: locked.clone(),
                    });
                }
            }
        }
    }

    let mut extra_in_lock = Vec::new();
    if strict {
        extra_in_lock.extend(
            lock.keys()
                .filter(|name| !reqs.contains_key(*name))
                .cloned(),
        );
    }

    let ok =
        missing_in_lock.is_empty() && version_mismatches.is_empty() && extra_in_lock.is_empty();
    DiffResult {
        missing_in_lock,
        version_mismatches,
        extra_in_lock,
        ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerEnv;
    use crate::{lockfile, requirements};

    fn name(raw: &str) -> PackageName {
        PackageName::new(raw)
    }

    fn load(lock_json: &str, reqs_text: &str) -> (ManifestMapping, ManifestMapping) {
        let lock = lockfile::parse(lock_json, &["default", "develop"]).unwrap();
        let reqs = requirements::parse(reqs_text, &MarkerEnv::host()).unwrap();
        (lock, reqs)
    }

    #[test]
    fn identical_pins_compare_clean() {
        let (lock, reqs) = load(
            r#"{"default": {"requests": {"version": "==2.31.0"}}}"#,
            "requests==2.31.0\n",
        );
        let diff = compare(&lock, &reqs, true);
        assert!(diff.ok);
        assert!(diff.missing_in_lock.is_empty());
        assert!(diff.version_mismatches.is_empty());
        assert!(diff.extra_in_lock.is_empty());
    }

    // The loaders must reconstruct identical literal text for a true
    // equality even though the two artifacts spell it differently.
    #[test]
    fn exact_pin_formats_agree_across_loaders() {
        let (lock, reqs) = load(
            r#"{"default": {"requests": {"version": "2.31.0"}}}"#,
            "requests == 2.31.0\n",
        );
        assert!(compare(&lock, &reqs, false).ok);
    }

    #[test]
    fn version_mismatch_is_reported_with_both_pins() {
        let (lock, reqs) = load(
            r#"{"default": {"flask": {"version": "2.0.0"}}}"#,
            "flask==2.1.0\n",
        );
        let diff = compare(&lock, &reqs, false);
        assert!(!diff.ok);
        assert_eq!(
            diff.version_mismatches,
            vec![Mismatch {
                name: name("flask"),
                requested: Pin::Exact("2.1.0".to_string()),
                locked: Pin::Exact("2.0.0".to_string()),
            }]
        );
    }

    #[test]
    fn missing_and_strict_extras() {
        let (lock, reqs) = load(
            r#"{"default": {"numpy": {"version": "1.26.0"}}}"#,
            "pandas==2.0.0\n",
        );

        let diff = compare(&lock, &reqs, false);
        assert!(!diff.ok);
        assert_eq!(diff.missing_in_lock, vec![name("pandas")]);
        assert!(diff.extra_in_lock.is_empty());

        let strict = compare(&lock, &reqs, true);
        assert_eq!(strict.missing_in_lock, vec![name("pandas")]);
        assert_eq!(strict.extra_in_lock, vec![name("numpy")]);
    }

    #[test]
    fn url_pins_match_across_loaders() {
        let (lock, reqs) = load(
            r#"{"default": {"somepkg": {"url": "https://example.com/pkg.whl"}}}"#,
            "somepkg @ https://example.com/pkg.whl\n",
        );
        assert!(compare(&lock, &reqs, true).ok);
    }

    #[test]
    fn unpinned_requirement_with_lock_entry_passes_silently() {
        let (lock, reqs) = load(
            r#"{"default": {"somepkg": {"version": "==9.9.9"}}}"#,
            "somepkg\n",
        );
        let diff = compare(&lock, &reqs, false);
        assert!(diff.ok);
    }

    #[test]
    fn unpinned_requirement_without_lock_entry_is_missing() {
        let (lock, reqs) = load(r#"{"default": {}}"#, "somepkg\n");
        let diff = compare(&lock, &reqs, false);
        assert!(!diff.ok);
        assert_eq!(diff.missing_in_lock, vec![name("somepkg")]);
        assert!(diff.version_mismatches.is_empty());
    }

    #[test]
    fn opaque_range_differs_from_locked_exact() {
        let (lock, reqs) = load(
            r#"{"default": {"flask": {"version": "==1.1.0"}}}"#,
            "flask>=1.0,<2.0\n",
        );
        let diff = compare(&lock, &reqs, false);
        assert_eq!(diff.version_mismatches.len(), 1);
        assert_eq!(
            diff.version_mismatches[0].requested,
            Pin::Opaque(">=1.0,<2.0".to_string())
        );
    }

    #[test]
    fn names_canonicalize_before_comparison() {
        let (lock, reqs) = load(
            r#"{"default": {"Foo_Bar": {"version": "==1.0"}}}"#,
            "foo-bar==1.0\n",
        );
        assert!(compare(&lock, &reqs, true).ok);
    }

    #[test]
    fn develop_section_entries_count() {
        let (lock, reqs) = load(
            r#"{"default": {}, "develop": {"pytest": {"version": "==8.0.0"}}}"#,
            "pytest==8.0.0\n",
        );
        assert!(compare(&lock, &reqs, false).ok);
    }

    #[test]
    fn strict_mode_is_monotonic() {
        let (lock, reqs) = load(
            r#"{"default": {
                "numpy": {"version": "1.26.0"},
                "flask": {"version": "2.0.0"}
            }}"#,
            "flask==2.1.0\npandas==2.0.0\n",
        );

        let loose = compare(&lock, &reqs, false);
        let strict = compare(&lock, &reqs, true);

        // Strict can only add extras, never change the other two lists.
        assert_eq!(loose.missing_in_lock, strict.missing_in_lock);
        assert_eq!(loose.version_mismatches, strict.version_mismatches);
        assert!(loose.extra_in_lock.is_empty());
        assert_eq!(strict.extra_in_lock, vec![name("numpy")]);
        assert!(!loose.ok && !strict.ok);
    }

    #[test]
    fn reports_are_sorted_by_name() {
        let (lock, reqs) = load(
            r#"{"default": {}}"#,
            "zope-interface==5.0\nattrs==23.0\nmarkupsafe==2.1\n",
        );
        let diff = compare(&lock, &reqs, false);
        assert_eq!(
            diff.missing_in_lock,
            vec![name("attrs"), name("markupsafe"), name("zope-interface")]
        );
    }
}
