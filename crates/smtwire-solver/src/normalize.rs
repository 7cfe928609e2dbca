//! Turning raw solver text into a [`Response`].
//!
//! Two rewrites run before the reply reaches the S-expression parser: legacy
//! `bv<value>[<width>]` literals become `#b` literals, and leading
//! `(error "...")` forms are collapsed into a single error message.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use smtwire_syntax::parse_sexprs;

use crate::response::Response;

/// Wider legacy literals are left as they are.
const MAX_LEGACY_WIDTH: usize = 1 << 16;

fn legacy_bitvector() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"bv([0-9]+)\[([0-9]+)\]").unwrap())
}

fn leading_error() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\A\s*\(\s*error\s+"((?:[^"\\]|\\.|"")*)"\s*\)"#).unwrap()
    })
}

/// Normalize one complete reply.
pub fn normalize(raw: &str) -> Response {
    let text = rewrite_legacy_bitvectors(raw);
    if let Some(message) = error_message(&text) {
        return Response::error(message);
    }
    match parse_sexprs(&text) {
        Ok(items) => Response::from_sexprs(items),
        Err(e) => Response::error(format!(
            "Failed to parse the solver response `{}`: {e}",
            text.trim()
        )),
    }
}

/// Rewrite every `bv<value>[<width>]` into `#b` followed by `width` bits of
/// `value`, most significant first, until none remain.
pub fn rewrite_legacy_bitvectors(text: &str) -> Cow<'_, str> {
    let re = legacy_bitvector();
    if !re.is_match(text) {
        return Cow::Borrowed(text);
    }
    let mut current = text.to_string();
    loop {
        let next = re.replace_all(&current, |caps: &Captures<'_>| match caps[2].parse::<usize>() {
            Ok(width) if width <= MAX_LEGACY_WIDTH => format!("#b{}", decimal_to_bits(&caps[1], width)),
            _ => caps[0].to_string(),
        });
        if next == current {
            break;
        }
        current = next.into_owned();
        if !re.is_match(&current) {
            break;
        }
    }
    Cow::Owned(current)
}

/// The low `width` bits of a decimal numeral of any length.
fn decimal_to_bits(decimal: &str, width: usize) -> String {
    let mut digits: Vec<u8> = decimal.bytes().map(|b| b - b'0').collect();
    let mut bits = vec!['0'; width];
    for slot in bits.iter_mut().rev() {
        let mut remainder = 0u8;
        for d in digits.iter_mut() {
            let current = remainder * 10 + *d;
            *d = current / 2;
            remainder = current % 2;
        }
        if remainder == 1 {
            *slot = '1';
        }
    }
    bits.into_iter().collect()
}

/// Messages of the `(error "...")` forms at the very start of `text`, joined
/// with `"; "`. `None` when the text does not start with one.
pub fn leading_errors(text: &str) -> Option<String> {
    let re = leading_error();
    let mut rest = text;
    let mut messages = Vec::new();
    while let Some(caps) = re.captures(rest) {
        messages.push(caps[1].to_string());
        rest = &rest[caps[0].len()..];
    }
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// The error carried by a reply, if any: the joined leading error forms, or
/// the whole trimmed text when it mentions `error` without a structured form.
pub fn error_message(text: &str) -> Option<String> {
    if !text.contains("error") {
        return None;
    }
    Some(leading_errors(text).unwrap_or_else(|| text.trim().to_string()))
}

/// Collects reply chunks until their parentheses balance.
///
/// Parentheses inside string literals, quoted symbols and comments do not
/// count. Scanner state carries across chunks.
#[derive(Debug, Default)]
pub struct ParenAccumulator {
    text: String,
    depth: i64,
    in_string: bool,
    escaped: bool,
    in_quoted: bool,
    in_comment: bool,
}

impl ParenAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk; returns true once the accumulated text is balanced.
    pub fn push(&mut self, chunk: &str) -> bool {
        for c in chunk.chars() {
            if self.in_comment {
                self.in_comment = c != '\n';
            } else if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else {
                    self.in_string = c != '"';
                }
            } else if self.in_quoted {
                self.in_quoted = c != '|';
            } else {
                match c {
                    '(' => self.depth += 1,
                    ')' => self.depth -= 1,
                    '"' => self.in_string = true,
                    '|' => self.in_quoted = true,
                    ';' => self.in_comment = true,
                    _ => {}
                }
            }
        }
        self.text.push_str(&chunk.replace('\r', ""));
        self.is_balanced()
    }

    pub fn is_balanced(&self) -> bool {
        self.depth <= 0 && !self.in_string && !self.in_quoted
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
