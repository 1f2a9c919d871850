//! Report rendering for comparison results.

use lockdrift_core::{DiffResult, Mismatch, Pin};
use serde_json::json;

/// Render the requirements-side pin the way the manifest spells it: exact
/// pins keep their `==` operator, everything else uses the canonical form.
fn requirement_text(pin: &Pin) -> String {
    match pin {
        Pin::Exact(version) => format!("=={version}"),
        other => other.to_string(),
    }
}

pub fn print_human(diff: &DiffResult) {
    if diff.ok {
        println!("✅ Versions match between lockfile and requirements.");
        return;
    }

    println!("Dependency check FAILED.");
    if !diff.missing_in_lock.is_empty() {
        println!("\nMissing in lockfile (present in requirements):");
        for name in &diff.missing_in_lock {
            println!("  - {name}");
        }
    }
    if !diff.version_mismatches.is_empty() {
        println!("\nVersion mismatches:");
        for Mismatch {
            name,
            requested,
            locked,
        } in &diff.version_mismatches
        {
            println!(
                "  - {name}: requirements has {}, lock has {locked}",
                requirement_text(requested)
            );
        }
    }
    if !diff.extra_in_lock.is_empty() {
        println!("\nExtras in lockfile (not in requirements):");
        for name in &diff.extra_in_lock {
            println!("  - {name}");
        }
    }
}

pub fn print_json(diff: &DiffResult) {
    let value = json!({
        "ok": diff.ok,
        "missing_in_lock": diff.missing_in_lock,
        "version_mismatches": diff.version_mismatches.iter().map(|m| json!({
            "name": m.name,
            "requirements": requirement_text(&m.requested),
            "lock": m.locked.to_string(),
        })).collect::<Vec<_>>(),
        "extra_in_lock": diff.extra_in_lock,
    });

    match serde_json::to_string_pretty(&value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("Error serializing results: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_pins_restore_their_operator() {
        assert_eq!(requirement_text(&Pin::Exact("2.1.0".to_string())), "==2.1.0");
        assert_eq!(
            requirement_text(&Pin::Opaque(">=1.0,<2.0".to_string())),
            ">=1.0,<2.0"
        );
        assert_eq!(requirement_text(&Pin::Unpinned), "");
    }
}
