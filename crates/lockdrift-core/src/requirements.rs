//! Requirements manifest loading.
//!
//! Parses the line-oriented requirements format: one declaration per logical
//! line, with comments, include directives, and option lines skipped, and
//! environment markers filtering declarations out per platform. Only exact
//! (`==`) pins are extracted structurally; compound ranges are preserved
//! verbatim for string-level comparison.

use crate::markers::{self, MarkerEnv};
use crate::types::{ManifestMapping, PackageName, Pin, SourceKind, SourceRef};
use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Operators recognized in a version specifier, longest first so `==`
/// never matches as the prefix of `===`.
const SPECIFIER_OPS: [&str; 8] = ["===", "==", "!=", "<=", ">=", "~=", "<", ">"];

/// Read and parse a requirements file.
pub fn load(path: &Path, env: &MarkerEnv) -> Result<ManifestMapping> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, env)
}

/// Parse requirements text into a canonical name → pin mapping.
///
/// A malformed declaration is fatal for the whole load; this deliberately
/// does not attempt partial recovery of broken manifests.
pub fn parse(text: &str, env: &MarkerEnv) -> Result<ManifestMapping> {
    let mut deps = ManifestMapping::new();
    for (line_no, line) in logical_lines(text) {
        if is_ignorable(&line) {
            continue;
        }
        match parse_line(&line, line_no, env)? {
            Some((name, pin)) => {
                deps.insert(name, pin);
            }
            None => {
                debug!(line = line_no, "requirement skipped by environment marker");
            }
        }
    }
    Ok(deps)
}

/// Join physical lines ending in `\` into logical lines, keeping the
/// 1-based number of each logical line's first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (idx, raw) in text.lines().enumerate() {
        let (start, mut buffer) = pending.take().unwrap_or_else(|| (idx + 1, String::new()));
        match raw.strip_suffix('\\') {
            Some(stripped) => {
                buffer.push_str(stripped);
                pending = Some((start, buffer));
            }
            None => {
                buffer.push_str(raw);
                lines.push((start, buffer));
            }
        }
    }
    if let Some(entry) = pending {
        lines.push(entry);
    }
    lines
}

/// Lines that never declare a requirement: blanks, comments, include
/// directives, and option lines.
fn is_ignorable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || line.starts_with("-r ") || line.starts_with("--")
}

/// Parse one logical line. Returns `None` when the line's marker does not
/// apply to the environment; the line then contributes nothing at all.
fn parse_line(line: &str, line_no: usize, env: &MarkerEnv) -> Result<Option<(PackageName, Pin)>> {
    let fail = |reason: String| Error::Requirement {
        line: line_no,
        text: line.trim().to_string(),
        reason,
    };

    let (body, marker) = split_marker(line);
    if let Some(marker) = marker {
        let applies = markers::evaluate(marker, env).map_err(|e| fail(e.to_string()))?;
        if !applies {
            return Ok(None);
        }
    }

    let body = body.trim();

    // Direct reference: `name[extras] @ url`. The URL beats any specifier.
    if let Some((name_part, url)) = body.split_once('@') {
        let (raw_name, extras, rest) = split_components(name_part).map_err(&fail)?;
        if !rest.is_empty() {
            return Err(fail(format!("unexpected `{rest}` before `@`")));
        }
        validate_extras(extras).map_err(&fail)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(fail("missing URL after `@`".to_string()));
        }
        return Ok(Some((
            PackageName::new(raw_name),
            Pin::Source(SourceRef {
                kind: SourceKind::Url,
                location: url.to_string(),
                reference: None,
            }),
        )));
    }

    let (raw_name, extras, spec_text) = split_components(body).map_err(&fail)?;
    validate_extras(extras).map_err(&fail)?;

    let mut spec_text = spec_text.trim();
    if let Some(inner) = spec_text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        spec_text = inner.trim();
    }

    let pin = if spec_text.is_empty() {
        Pin::Unpinned
    } else {
        parse_specifiers(spec_text).map_err(&fail)?
    };
    Ok(Some((PackageName::new(raw_name), pin)))
}

/// Split a requirement line into its body and optional marker expression.
/// The split is on the first `;` outside of quotes.
fn split_marker(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == ';' => return (&line[..i], Some(&line[i + 1..])),
            None => {}
        }
    }
    (line, None)
}

/// Split the requirement body into name, optional extras, and the
/// remaining specifier text.
fn split_components(body: &str) -> std::result::Result<(&str, Option<&str>, &str), String> {
    let body = body.trim();
    let mut name_end = 0;
    for (i, ch) in body.char_indices() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            name_end = i + ch.len_utf8();
        } else {
            break;
        }
    }
    if name_end == 0 {
        return Err("missing package name".to_string());
    }
    let name = &body[..name_end];
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(format!("invalid package name `{name}`"));
    }

    let mut rest = body[name_end..].trim_start();
    let mut extras = None;
    if let Some(after) = rest.strip_prefix('[') {
        let Some(close) = after.find(']') else {
            return Err("unclosed extras bracket".to_string());
        };
        extras = Some(&after[..close]);
        rest = after[close + 1..].trim_start();
    }
    Ok((name, extras, rest))
}

fn validate_extras(extras: Option<&str>) -> std::result::Result<(), String> {
    let Some(extras) = extras else {
        return Ok(());
    };
    for extra in extras.split(',') {
        let extra = extra.trim();
        if extra.is_empty()
            || !extra
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(format!("invalid extra `{extra}`"));
        }
    }
    Ok(())
}

/// Parse a comma-separated specifier set. The first exact (`==`) clause
/// wins; a set without one is preserved verbatim as opaque text.
fn parse_specifiers(text: &str) -> std::result::Result<Pin, String> {
    let mut clauses = Vec::new();
    for raw_clause in text.split(',') {
        let clause = raw_clause.trim();
        if clause.is_empty() {
            return Err("empty specifier clause".to_string());
        }
        let Some(op) = SPECIFIER_OPS.iter().find(|op| clause.starts_with(**op)) else {
            return Err(format!("unrecognized specifier `{clause}`"));
        };
        let version = clause[op.len()..].trim();
        if version.is_empty() {
            return Err(format!("missing version in `{clause}`"));
        }
        if !version.chars().all(is_version_char) {
            return Err(format!("invalid version `{version}`"));
        }
        clauses.push((*op, version));
    }
    if let Some((_, version)) = clauses.iter().find(|(op, _)| *op == "==") {
        return Ok(Pin::Exact((*version).to_string()));
    }
    Ok(Pin::Opaque(
        clauses
            .iter()
            .map(|(op, version)| format!("{op}{version}"))
            .collect::<Vec<_>>()
            .join(","),
    ))
}

fn is_version_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '*' | '+' | '!' | '-' | '_')
}
