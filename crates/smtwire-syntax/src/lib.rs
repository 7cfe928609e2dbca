//! SMT-LIB2 syntax for smtwire: an S-expression reader, the command and term
//! AST it lowers into, and the standard printer that dialects build on.

pub mod ast;
pub mod errors;
pub mod lower;
pub mod parser;
pub mod printer;
pub mod sexpr;

pub use ast::{Command, Expr, Sort, Span, Spanned};
pub use errors::{ParseError, PrintError, ShapeError};
pub use parser::{parse_script, parse_sexprs, ScriptReader};
pub use printer::{Printer, StandardPrinter};
pub use sexpr::SExpr;
