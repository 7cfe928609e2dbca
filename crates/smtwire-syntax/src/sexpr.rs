//! Generic S-expressions, the common currency between the reader, the
//! command lowering and solver replies.

use std::fmt;

/// A parsed S-expression. Atoms keep their source spelling; only string
/// literals are unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(tag = "kind", content = "value"))]
pub enum SExpr {
    Symbol(String),
    /// Keyword name without the leading colon.
    Keyword(String),
    Numeral(String),
    Decimal(String),
    /// Binary digits without the `#b` prefix.
    Binary(String),
    /// Hex digits without the `#x` prefix.
    Hex(String),
    String(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn symbol(name: impl Into<String>) -> Self {
        SExpr::Symbol(name.into())
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        SExpr::Keyword(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        SExpr::String(value.into())
    }

    pub fn numeral(n: u64) -> Self {
        SExpr::Numeral(n.to_string())
    }

    pub fn list(items: Vec<SExpr>) -> Self {
        SExpr::List(items)
    }

    pub fn bool(b: bool) -> Self {
        SExpr::Symbol(if b { "true" } else { "false" }.to_string())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// `Some(true)` / `Some(false)` for the symbols `true` and `false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_symbol() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SExpr::Numeral(digits) => digits.parse().ok(),
            _ => None,
        }
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, SExpr::List(_))
    }
}

/// True when `name` cannot be written as a simple symbol and needs `|...|`.
pub fn symbol_needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_digit() => true,
        Some(c) => !is_symbol_char(c) || chars.any(|c| !is_symbol_char(c)),
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c)
}

pub fn write_symbol(f: &mut impl fmt::Write, name: &str) -> fmt::Result {
    if symbol_needs_quotes(name) {
        write!(f, "|{name}|")
    } else {
        f.write_str(name)
    }
}

/// Writes `value` as an SMT-LIB string literal, doubling embedded quotes.
pub fn write_string_literal(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        if c == '"' {
            f.write_str("\"\"")?;
        } else {
            f.write_char(c)?;
        }
    }
    f.write_char('"')
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Symbol(s) => write_symbol(f, s),
            SExpr::Keyword(k) => write!(f, ":{k}"),
            SExpr::Numeral(n) | SExpr::Decimal(n) => f.write_str(n),
            SExpr::Binary(b) => write!(f, "#b{b}"),
            SExpr::Hex(h) => write!(f, "#x{h}"),
            SExpr::String(s) => write_string_literal(f, s),
            SExpr::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}
