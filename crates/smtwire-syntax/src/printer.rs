//! Standard SMT-LIB2 concrete syntax.
//!
//! [`Printer`] carries the standard rendering as default methods. Solver
//! dialects implement the trait and override only the hooks they need; since
//! the defaults recurse through `self`, an override applies at every nesting
//! depth.

use std::fmt::{self, Write};

use crate::ast::*;
use crate::errors::PrintError;
use crate::sexpr::{write_string_literal, write_symbol};

type Result<T = ()> = std::result::Result<T, PrintError>;

// Writing into a String cannot fail.
fn push_symbol(out: &mut String, name: &str) {
    let _ = write_symbol(out, name);
}

pub trait Printer {
    fn write_expr(&self, out: &mut String, expr: &Expr) -> Result {
        match expr {
            Expr::Numeral(n) | Expr::Decimal(n) => out.push_str(n),
            Expr::Binary(b) => {
                out.push_str("#b");
                out.push_str(b);
            }
            Expr::Hex(h) => {
                out.push_str("#x");
                out.push_str(h);
            }
            Expr::String(s) => {
                let _ = write_string_literal(out, s);
            }
            Expr::Ident(q) => self.write_qual_ident(out, q),
            Expr::App { head, args } => self.write_app(out, head, args)?,
            Expr::Let { bindings, body } => {
                out.push_str("(let (");
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push('(');
                    push_symbol(out, name);
                    out.push(' ');
                    self.write_expr(out, value)?;
                    out.push(')');
                }
                out.push_str(") ");
                self.write_expr(out, body)?;
                out.push(')');
            }
            Expr::Forall { vars, body } => self.write_quantifier(out, "forall", vars, body)?,
            Expr::Exists { vars, body } => self.write_quantifier(out, "exists", vars, body)?,
            Expr::Annotated { expr, attributes } => {
                out.push_str("(! ");
                self.write_expr(out, expr)?;
                for attr in attributes {
                    let _ = write!(out, " :{}", attr.keyword);
                    if let Some(value) = &attr.value {
                        let _ = write!(out, " {value}");
                    }
                }
                out.push(')');
            }
        }
        Ok(())
    }

    /// Function application hook; dialects rewrite operator forms here.
    fn write_app(&self, out: &mut String, head: &QualIdent, args: &[Expr]) -> Result {
        if args.is_empty() {
            return Err(PrintError::EmptyApplication(head.id.symbol.clone()));
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

    fn write_quantifier(
        &self,
        out: &mut String,
        quantifier: &str,
        vars: &[(String, Sort)],
        body: &Expr,
    ) -> Result {
        out.push('(');
        out.push_str(quantifier);
        out.push_str(" (");
        self.write_sorted_vars(out, vars);
        out.push_str(") ");
        self.write_expr(out, body)?;
        out.push(')');
        Ok(())
    }

    fn write_sorted_vars(&self, out: &mut String, vars: &[(String, Sort)]) {
        for (i, (name, sort)) in vars.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push('(');
            push_symbol(out, name);
            out.push(' ');
            self.write_sort(out, sort);
            out.push(')');
        }
    }

    fn write_identifier(&self, out: &mut String, id: &Identifier) {
        if id.indices.is_empty() {
            push_symbol(out, &id.symbol);
            return;
        }
        out.push_str("(_ ");
        push_symbol(out, &id.symbol);
        for index in &id.indices {
            out.push(' ');
            match index {
                Index::Numeral(n) => out.push_str(n),
                Index::Symbol(s) => push_symbol(out, s),
            }
        }
        out.push(')');
    }

    fn write_qual_ident(&self, out: &mut String, q: &QualIdent) {
        match &q.sort {
            None => self.write_identifier(out, &q.id),
            Some(sort) => {
                out.push_str("(as ");
                self.write_identifier(out, &q.id);
                out.push(' ');
                self.write_sort(out, sort);
                out.push(')');
            }
        }
    }

    fn write_sort(&self, out: &mut String, sort: &Sort) {
        if sort.params.is_empty() {
            self.write_identifier(out, &sort.id);
            return;
        }
        out.push('(');
        self.write_identifier(out, &sort.id);
        for p in &sort.params {
            out.push(' ');
            self.write_sort(out, p);
        }
        out.push(')');
    }

    fn write_command(&self, out: &mut String, cmd: &Command) -> Result {
        let name = cmd.name();
        out.push('(');
        out.push_str(name);
        match cmd {
            Command::SetLogic(logic) => {
                out.push(' ');
                push_symbol(out, logic);
            }
            Command::SetOption { keyword, value } | Command::SetInfo { keyword, value } => {
                let _ = write!(out, " :{keyword} {value}");
            }
            Command::GetOption(keyword) | Command::GetInfo(keyword) => {
                let _ = write!(out, " :{keyword}");
            }
            Command::DeclareFun {
                name,
                params,
                result,
            } => {
                out.push(' ');
                push_symbol(out, name);
                out.push_str(" (");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write_sort(out, p);
                }
                out.push_str(") ");
                self.write_sort(out, result);
            }
            Command::DeclareConst { name, sort } => {
                out.push(' ');
                push_symbol(out, name);
                out.push(' ');
                self.write_sort(out, sort);
            }
            Command::DefineFun {
                name,
                params,
                result,
                body,
            } => {
                out.push(' ');
                push_symbol(out, name);
                out.push_str(" (");
                self.write_sorted_vars(out, params);
                out.push_str(") ");
                self.write_sort(out, result);
                out.push(' ');
                self.write_expr(out, body)?;
            }
            Command::DeclareSort { name, arity } => {
                out.push(' ');
                push_symbol(out, name);
                let _ = write!(out, " {arity}");
            }
            Command::DefineSort { name, params, body } => {
                out.push(' ');
                push_symbol(out, name);
                out.push_str(" (");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    push_symbol(out, p);
                }
                out.push_str(") ");
                self.write_sort(out, body);
            }
            Command::Assert(expr) | Command::Eval(expr) => {
                out.push(' ');
                self.write_expr(out, expr)?;
            }
            Command::Push(n) | Command::Pop(n) => {
                let _ = write!(out, " {n}");
            }
            Command::GetValue(terms) => {
                out.push_str(" (");
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write_expr(out, t)?;
                }
                out.push(')');
            }
            Command::Echo(text) => {
                out.push(' ');
                let _ = write_string_literal(out, text);
            }
            Command::CheckSat
            | Command::GetAssertions
            | Command::GetModel
            | Command::GetProof
            | Command::GetUnsatCore
            | Command::GetAssignment
            | Command::Reset
            | Command::Exit => {}
        }
        out.push(')');
        Ok(())
    }

    fn expr_to_string(&self, expr: &Expr) -> Result<String> {
        let mut out = String::new();
        self.write_expr(&mut out, expr)?;
        Ok(out)
    }

    fn command_to_string(&self, cmd: &Command) -> Result<String> {
        let mut out = String::new();
        self.write_command(&mut out, cmd)?;
        Ok(out)
    }
}

/// The unmodified SMT-LIB2 printer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPrinter;

impl Printer for StandardPrinter {}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match StandardPrinter.expr_to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match StandardPrinter.command_to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        StandardPrinter.write_sort(&mut out, self);
        f.write_str(&out)
    }
}
