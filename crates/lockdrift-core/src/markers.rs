//! Environment marker evaluation.
//!
//! A requirement line may carry a trailing `; marker` expression that guards
//! whether the requirement applies to the current environment. The marker
//! grammar is a small expression language: `or`-chains of `and`-chains of
//! comparisons between quoted strings and environment variables, with
//! parentheses for grouping. `and` binds tighter than `or`.
//!
//! Evaluation is a pure function over an explicit [`MarkerEnv`] snapshot so
//! tests can substitute synthetic platforms.

use std::cmp::Ordering;
use thiserror::Error;

/// Immutable snapshot of the environment markers are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEnv {
    /// `os_name`: `posix` or `nt`.
    pub os_name: String,
    /// `sys_platform`: `linux`, `darwin`, `win32`, ...
    pub sys_platform: String,
    /// `platform_system`: `Linux`, `Darwin`, `Windows`, ...
    pub platform_system: String,
    /// `platform_machine`: `x86_64`, `aarch64`, ...
    pub platform_machine: String,
    /// `platform_release`: kernel release string, often unavailable.
    pub platform_release: String,
    /// `platform_version`: kernel version string, often unavailable.
    pub platform_version: String,
    /// `python_version`: `major.minor`, e.g. `3.12`.
    pub python_version: String,
    /// `python_full_version`: `major.minor.patch`, e.g. `3.12.0`.
    pub python_full_version: String,
    /// `implementation_name`: `cpython`, `pypy`, ...
    pub implementation_name: String,
    /// `platform_python_implementation`: `CPython`, `PyPy`, ...
    pub platform_python_implementation: String,
    /// `extra`: only meaningful inside package metadata; empty here.
    pub extra: String,
}

impl MarkerEnv {
    /// Environment describing the host this process runs on.
    ///
    /// Platform fields come from the build target. Interpreter fields keep
    /// conventional CPython defaults and should be overridden when the
    /// checked project targets something else.
    pub fn host() -> Self {
        let (sys_platform, platform_system) = if cfg!(target_os = "windows") {
            ("win32", "Windows")
        } else if cfg!(target_os = "macos") {
            ("darwin", "Darwin")
        } else {
            ("linux", "Linux")
        };
        MarkerEnv {
            os_name: if cfg!(windows) { "nt" } else { "posix" }.to_string(),
            sys_platform: sys_platform.to_string(),
            platform_system: platform_system.to_string(),
            platform_machine: std::env::consts::ARCH.to_string(),
            platform_release: String::new(),
            platform_version: String::new(),
            python_version: "3.12".to_string(),
            python_full_version: "3.12.0".to_string(),
            implementation_name: "cpython".to_string(),
            platform_python_implementation: "CPython".to_string(),
            extra: String::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        let value = match name {
            "os_name" => &self.os_name,
            "sys_platform" => &self.sys_platform,
            "platform_system" => &self.platform_system,
            "platform_machine" => &self.platform_machine,
            "platform_release" => &self.platform_release,
            "platform_version" => &self.platform_version,
            "python_version" => &self.python_version,
            "python_full_version" => &self.python_full_version,
            "implementation_name" => &self.implementation_name,
            "platform_python_implementation" => &self.platform_python_implementation,
            "extra" => &self.extra,
            _ => return None,
        };
        Some(value)
    }
}

/// Error produced while parsing or evaluating a marker expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MarkerError(String);

impl MarkerError {
    fn new(message: impl Into<String>) -> Self {
        MarkerError(message.into())
    }
}

/// Evaluate a marker expression against the given environment.
pub fn evaluate(expr: &str, env: &MarkerEnv) -> Result<bool, MarkerError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(MarkerError::new("empty marker expression"));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        env,
    };
    let value = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(MarkerError::new("trailing tokens after marker expression"));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Variable names and the `and` / `or` / `not` / `in` keywords.
    Ident(String),
    /// Quoted string literal.
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, MarkerError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        match ch {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let quote = ch;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(MarkerError::new("unterminated string literal"));
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '=' | '!' | '<' | '>' | '~' => {
                let pair: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let two_char = match pair.as_str() {
                    "==" => Some("=="),
                    "!=" => Some("!="),
                    "<=" => Some("<="),
                    ">=" => Some(">="),
                    "~=" => Some("~="),
                    _ => None,
                };
                if let Some(op) = two_char {
                    tokens.push(Token::Op(op));
                    i += 2;
                } else if ch == '<' {
                    tokens.push(Token::Op("<"));
                    i += 1;
                } else if ch == '>' {
                    tokens.push(Token::Op(">"));
                    i += 1;
                } else {
                    return Err(MarkerError::new(format!("stray `{ch}` in marker")));
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(MarkerError::new(format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a MarkerEnv,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<bool, MarkerError> {
        let mut value = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<bool, MarkerError> {
        let mut value = self.atom()?;
        while self.eat_keyword("and") {
            let rhs = self.atom()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn atom(&mut self) -> Result<bool, MarkerError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let value = self.or_expr()?;
            match self.next() {
                Some(Token::RParen) => Ok(value),
                _ => Err(MarkerError::new("expected `)`")),
            }
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<bool, MarkerError> {
        let lhs = self.operand()?;
        let op = self.comparison_op()?;
        let rhs = self.operand()?;
        Ok(apply(&lhs, op, &rhs))
    }

    fn comparison_op(&mut self) -> Result<CmpOp, MarkerError> {
        match self.next() {
            Some(Token::Op("==")) => Ok(CmpOp::Eq),
            Some(Token::Op("!=")) => Ok(CmpOp::Ne),
            Some(Token::Op("<")) => Ok(CmpOp::Lt),
            Some(Token::Op("<=")) => Ok(CmpOp::Le),
            Some(Token::Op(">")) => Ok(CmpOp::Gt),
            Some(Token::Op(">=")) => Ok(CmpOp::Ge),
            Some(Token::Op(op)) => Err(MarkerError::new(format!(
                "unsupported operator `{op}` in marker"
            ))),
            Some(Token::Ident(word)) if word == "in" => Ok(CmpOp::In),
            Some(Token::Ident(word)) if word == "not" => match self.next() {
                Some(Token::Ident(word)) if word == "in" => Ok(CmpOp::NotIn),
                _ => Err(MarkerError::new("expected `in` after `not`")),
            },
            _ => Err(MarkerError::new("expected comparison operator")),
        }
    }

    fn operand(&mut self) -> Result<String, MarkerError> {
        match self.next() {
            Some(Token::Str(literal)) => Ok(literal),
            Some(Token::Ident(name)) => match self.env.lookup(&name) {
                Some(value) => Ok(value.to_string()),
                None => Err(MarkerError::new(format!(
                    "unknown marker variable `{name}`"
                ))),
            },
            _ => Err(MarkerError::new("expected string or marker variable")),
        }
    }
}

fn apply(lhs: &str, op: CmpOp, rhs: &str) -> bool {
    match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Lt => ordering(lhs, rhs) == Ordering::Less,
        CmpOp::Le => ordering(lhs, rhs) != Ordering::Greater,
        CmpOp::Gt => ordering(lhs, rhs) == Ordering::Greater,
        CmpOp::Ge => ordering(lhs, rhs) != Ordering::Less,
        CmpOp::In => rhs.contains(lhs),
        CmpOp::NotIn => !rhs.contains(lhs),
    }
}

/// Version-aware ordering: two dot-separated numeric strings compare
/// segment-by-segment (so `3.10 >= 3.7` holds); anything else falls back
/// to lexicographic comparison.
fn ordering(lhs: &str, rhs: &str) -> Ordering {
    match (numeric_segments(lhs), numeric_segments(rhs)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => lhs.cmp(rhs),
    }
}

fn numeric_segments(text: &str) -> Option<Vec<u64>> {
    text.split('.').map(|segment| segment.parse().ok()).collect()
}
