//! Binding probe values into assertion templates.
//!
//! Templates use `$N` placeholders and single- or double-quoted string
//! literals, e.g. `'$0' == 'ns-a' && $1 > 0`. Rendering produces an
//! expression in the evaluator's syntax: every literal becomes
//! double-quoted with `\` and `"` escaped, bare placeholders are inlined
//! verbatim so numbers and booleans keep their type.

use super::evaluate::ExpressionError;
use super::Binding;
use std::iter::Peekable;
use std::str::Chars;

pub const DEFAULT_NOT_A_NUMBER_LITERAL: &str = "(0.0 / 0.0)";
pub const DEFAULT_NOT_A_STRING_LITERAL: &str = "<unavailable>";

/// Text rendered in place of values that could not be captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelLiterals {
    /// Expression inlined for bare placeholders; must compare false.
    pub not_a_number: String,
    /// String contents used inside literals or quoted when bare.
    pub not_a_string: String,
}

impl Default for SentinelLiterals {
    fn default() -> Self {
        Self {
            not_a_number: DEFAULT_NOT_A_NUMBER_LITERAL.to_string(),
            not_a_string: DEFAULT_NOT_A_STRING_LITERAL.to_string(),
        }
    }
}

/// Where a placeholder occurs in a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderUsage {
    pub bare: bool,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Code(String),
    Placeholder(usize),
    Literal(Vec<Piece>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Placeholder(usize),
}

/// An assertion template parsed once per test and rendered per combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionTemplate {
    segments: Vec<Segment>,
}

impl AssertionTemplate {
    pub fn parse(template: &str) -> Result<Self, ExpressionError> {
        let mut segments = Vec::new();
        let mut code = String::new();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\'' | '"' => {
                    flush_code(&mut segments, &mut code);
                    let pieces = parse_literal(&mut chars, ch, template)?;
                    segments.push(Segment::Literal(pieces));
                }
                '$' => match take_placeholder(&mut chars) {
                    Ok(index) => {
                        flush_code(&mut segments, &mut code);
                        segments.push(Segment::Placeholder(index));
                    }
                    Err(raw) => code.push_str(&raw),
                },
                _ => code.push(ch),
            }
        }
        flush_code(&mut segments, &mut code);
        Ok(Self { segments })
    }

    /// Render one complete combination into a literal expression.
    pub fn render(
        &self,
        bindings: &[Binding<'_>],
        sentinels: &SentinelLiterals,
    ) -> Result<String, ExpressionError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Code(code) => out.push_str(code),
                Segment::Placeholder(index) => {
                    push_bare(&mut out, lookup(bindings, *index)?, sentinels);
                }
                Segment::Literal(pieces) => {
                    out.push('"');
                    for piece in pieces {
                        match piece {
                            Piece::Text(text) => push_escaped(&mut out, text),
                            Piece::Placeholder(index) => {
                                let text = match lookup(bindings, *index)? {
                                    Binding::Line(line) => line,
                                    Binding::Failed => "",
                                    Binding::NotANumber | Binding::NotAString => {
                                        sentinels.not_a_string.as_str()
                                    }
                                };
                                push_escaped(&mut out, text);
                            }
                        }
                    }
                    out.push('"');
                }
            }
        }
        Ok(out)
    }

    /// First probe whose binding cannot support a verdict: a value that was
    /// never captured, or an empty line used as a bare placeholder.
    pub fn unusable_binding(&self, bindings: &[Binding<'_>]) -> Option<usize> {
        bindings
            .iter()
            .position(|binding| !matches!(binding, Binding::Line(_)))
            .or_else(|| {
                bindings.iter().enumerate().find_map(|(index, binding)| {
                    let empty = matches!(binding, Binding::Line(line) if line.trim().is_empty());
                    (empty && self.usage(index).bare).then_some(index)
                })
            })
    }

    pub fn usage(&self, index: usize) -> PlaceholderUsage {
        let mut usage = PlaceholderUsage::default();
        for segment in &self.segments {
            match segment {
                Segment::Placeholder(found) if *found == index => usage.bare = true,
                Segment::Literal(pieces) => {
                    if pieces
                        .iter()
                        .any(|piece| matches!(piece, Piece::Placeholder(found) if *found == index))
                    {
                        usage.quoted = true;
                    }
                }
                _ => {}
            }
        }
        usage
    }
}

fn flush_code(segments: &mut Vec<Segment>, code: &mut String) {
    if !code.is_empty() {
        segments.push(Segment::Code(std::mem::take(code)));
    }
}

fn parse_literal(
    chars: &mut Peekable<Chars<'_>>,
    quote: char,
    template: &str,
) -> Result<Vec<Piece>, ExpressionError> {
    let unbalanced = || ExpressionError::UnbalancedQuote {
        template: template.to_string(),
        quote,
    };
    let mut pieces = Vec::new();
    let mut text = String::new();
    loop {
        let ch = chars.next().ok_or_else(unbalanced)?;
        match ch {
            c if c == quote => {
                if !text.is_empty() {
                    pieces.push(Piece::Text(text));
                }
                return Ok(pieces);
            }
            '\\' => text.push(chars.next().ok_or_else(unbalanced)?),
            '$' => match take_placeholder(chars) {
                Ok(index) => {
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Placeholder(index));
                }
                Err(raw) => text.push_str(&raw),
            },
            _ => text.push(ch),
        }
    }
}

/// Consume the digits after a `$`. Returns the raw text when the run is not
/// a usable index so the caller can keep it verbatim.
fn take_placeholder(chars: &mut Peekable<Chars<'_>>) -> Result<usize, String> {
    let mut digits = String::new();
    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_digit() {
            break;
        }
        digits.push(ch);
        chars.next();
    }
    if digits.is_empty() {
        return Err("$".to_string());
    }
    digits.parse().map_err(|_| format!("${digits}"))
}

fn lookup<'a>(bindings: &[Binding<'a>], index: usize) -> Result<Binding<'a>, ExpressionError> {
    bindings
        .get(index)
        .copied()
        .ok_or(ExpressionError::UnboundPlaceholder {
            index,
            bound: bindings.len(),
        })
}

fn push_bare(out: &mut String, binding: Binding<'_>, sentinels: &SentinelLiterals) {
    match binding {
        Binding::Line(line) if !line.trim().is_empty() => out.push_str(line.trim()),
        Binding::Line(_) | Binding::Failed | Binding::NotANumber => {
            out.push_str(&sentinels.not_a_number)
        }
        Binding::NotAString => {
            out.push('"');
            push_escaped(out, &sentinels.not_a_string);
            out.push('"');
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
}
