//! Solver dialects: the standard printer plus per-solver operator rewrites.

use std::fmt;
use std::str::FromStr;

use smtwire_syntax::ast::{Command, Expr, QualIdent};
use smtwire_syntax::{PrintError, Printer};

/// Raised when a tree cannot be written, e.g. an application with no arguments.
pub type TranslateError = PrintError;

const CHAINABLE: &[&str] = &["=", "<", "<=", ">", ">="];

/// Rewrite rules for one solver's concrete syntax. Each flag only affects
/// applications with more than two arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dialect {
    /// `(- a b c)` becomes `(- (- a b) c)`.
    pub left_assoc_minus: bool,
    /// `(=> a b c)` becomes `(=> a (=> b c))`.
    pub right_assoc_implies: bool,
    /// `(< a b c)` becomes `(and (< a b) (< b c))`.
    pub expand_chains: bool,
}

impl Dialect {
    pub const STANDARD: Dialect = Dialect {
        left_assoc_minus: false,
        right_assoc_implies: false,
        expand_chains: false,
    };

    pub const Z3: Dialect = Dialect {
        left_assoc_minus: true,
        right_assoc_implies: false,
        expand_chains: false,
    };

    /// For solvers whose parser only accepts binary forms.
    pub const BINARY: Dialect = Dialect {
        left_assoc_minus: true,
        right_assoc_implies: true,
        expand_chains: true,
    };

    pub fn translate_expr(&self, expr: &Expr) -> Result<String, TranslateError> {
        self.expr_to_string(expr)
    }

    pub fn translate_command(&self, cmd: &Command) -> Result<String, TranslateError> {
        self.command_to_string(cmd)
    }

    fn write_left_assoc(&self, out: &mut String, head: &QualIdent, args: &[Expr]) -> Result<(), PrintError> {
        match args.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                out.push('(');
                self.write_qual_ident(out, head);
                out.push(' ');
                self.write_left_assoc(out, head, rest)?;
                out.push(' ');
                self.write_expr(out, last)?;
                out.push(')');
                Ok(())
            }
            Some((only, _)) => self.write_expr(out, only),
            None => Err(PrintError::EmptyApplication(head.id.symbol.clone())),
        }
    }

    fn write_right_assoc(&self, out: &mut String, head: &QualIdent, args: &[Expr]) -> Result<(), PrintError> {
        match args.split_first() {
            Some((first, rest)) if !rest.is_empty() => {
                out.push('(');
                self.write_qual_ident(out, head);
                out.push(' ');
                self.write_expr(out, first)?;
                out.push(' ');
                self.write_right_assoc(out, head, rest)?;
                out.push(')');
                Ok(())
            }
            Some((only, _)) => self.write_expr(out, only),
            None => Err(PrintError::EmptyApplication(head.id.symbol.clone())),
        }
    }

    fn write_chain(&self, out: &mut String, head: &QualIdent, args: &[Expr]) -> Result<(), PrintError> {
        out.push_str("(and");
        for pair in args.windows(2) {
            out.push_str(" (");
            self.write_qual_ident(out, head);
            out.push(' ');
            self.write_expr(out, &pair[0])?;
            out.push(' ');
            self.write_expr(out, &pair[1])?;
            out.push(')');
        }
        out.push(')');
        Ok(())
    }
}

impl Printer for Dialect {
    fn write_app(&self, out: &mut String, head: &QualIdent, args: &[Expr]) -> Result<(), PrintError> {
        if args.is_empty() {
            return Err(PrintError::EmptyApplication(head.id.symbol.clone()));
        }
        if args.len() > 2 {
            match head.plain_symbol() {
                Some("-") if self.left_assoc_minus => return self.write_left_assoc(out, head, args),
                Some("=>") if self.right_assoc_implies => {
                    return self.write_right_assoc(out, head, args)
                }
                Some(op) if self.expand_chains && CHAINABLE.contains(&op) => {
                    return self.write_chain(out, head, args)
                }
                _ => {}
            }
        }
        out.push('(');
        self.write_qual_ident(out, head);
        for arg in args {
            out.push(' ');
            self.write_expr(out, arg)?;
        }
        out.push(')');
        Ok(())
    }
}

/// Named dialect presets, as selected from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Standard,
    #[default]
    Z3,
    Binary,
}

impl DialectKind {
    pub fn dialect(self) -> Dialect {
        match self {
            DialectKind::Standard => Dialect::STANDARD,
            DialectKind::Z3 => Dialect::Z3,
            DialectKind::Binary => Dialect::BINARY,
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::Standard => "standard",
            DialectKind::Z3 => "z3",
            DialectKind::Binary => "binary",
        })
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(DialectKind::Standard),
            "z3" => Ok(DialectKind::Z3),
            "binary" => Ok(DialectKind::Binary),
            other => Err(format!("unknown dialect `{other}` (expected standard, z3 or binary)")),
        }
    }
}
