//! Lowering of generic S-expressions into commands, terms and sorts.

use crate::ast::*;
use crate::errors::ShapeError;
use crate::sexpr::SExpr;

type Result<T> = std::result::Result<T, ShapeError>;

fn shape(command: &str, message: impl Into<String>) -> ShapeError {
    ShapeError::new(command, message)
}

fn expect_symbol(ctx: &str, s: &SExpr, what: &str) -> Result<String> {
    s.as_symbol()
        .map(str::to_string)
        .ok_or_else(|| shape(ctx, format!("expected {what}, found `{s}`")))
}

fn expect_list<'a>(ctx: &str, s: &'a SExpr, what: &str) -> Result<&'a [SExpr]> {
    s.as_list()
        .ok_or_else(|| shape(ctx, format!("expected {what}, found `{s}`")))
}

fn expect_numeral(ctx: &str, s: &SExpr) -> Result<usize> {
    match s {
        SExpr::Numeral(digits) => digits
            .parse()
            .map_err(|_| shape(ctx, format!("numeral `{digits}` is out of range"))),
        other => Err(shape(ctx, format!("expected a numeral, found `{other}`"))),
    }
}

fn expect_arity(ctx: &str, args: &[SExpr], n: usize) -> Result<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(shape(
            ctx,
            format!("expected {n} argument(s), found {}", args.len()),
        ))
    }
}

impl Identifier {
    pub fn from_sexpr(s: &SExpr) -> Result<Identifier> {
        match s {
            SExpr::Symbol(name) => Ok(Identifier::simple(name.clone())),
            SExpr::List(items) if items.first().and_then(SExpr::as_symbol) == Some("_") => {
                if items.len() < 3 {
                    return Err(shape("identifier", "indexed identifier needs at least one index"));
                }
                let symbol = expect_symbol("identifier", &items[1], "a symbol")?;
                let indices = items[2..]
                    .iter()
                    .map(|i| match i {
                        SExpr::Numeral(n) => Ok(Index::Numeral(n.clone())),
                        SExpr::Symbol(s) => Ok(Index::Symbol(s.clone())),
                        other => Err(shape("identifier", format!("invalid index `{other}`"))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Identifier::indexed(symbol, indices))
            }
            other => Err(shape("identifier", format!("expected an identifier, found `{other}`"))),
        }
    }
}

impl Sort {
    pub fn from_sexpr(s: &SExpr) -> Result<Sort> {
        match s {
            SExpr::Symbol(_) => Ok(Sort {
                id: Identifier::from_sexpr(s)?,
                params: Vec::new(),
            }),
            SExpr::List(items) if items.first().and_then(SExpr::as_symbol) == Some("_") => Ok(Sort {
                id: Identifier::from_sexpr(s)?,
                params: Vec::new(),
            }),
            SExpr::List(items) if items.len() >= 2 => Ok(Sort {
                id: Identifier::from_sexpr(&items[0])?,
                params: items[1..]
                    .iter()
                    .map(Sort::from_sexpr)
                    .collect::<Result<Vec<_>>>()?,
            }),
            other => Err(shape("sort", format!("expected a sort, found `{other}`"))),
        }
    }
}

impl QualIdent {
    pub fn from_sexpr(s: &SExpr) -> Result<QualIdent> {
        if let SExpr::List(items) = s {
            if items.first().and_then(SExpr::as_symbol) == Some("as") {
                expect_arity("qualified identifier", &items[1..], 2)?;
                return Ok(QualIdent {
                    id: Identifier::from_sexpr(&items[1])?,
                    sort: Some(Sort::from_sexpr(&items[2])?),
                });
            }
        }
        Ok(QualIdent {
            id: Identifier::from_sexpr(s)?,
            sort: None,
        })
    }
}

fn sorted_vars(ctx: &str, s: &SExpr) -> Result<Vec<(String, Sort)>> {
    expect_list(ctx, s, "a list of sorted variables")?
        .iter()
        .map(|pair| {
            let items = expect_list(ctx, pair, "a `(name sort)` pair")?;
            expect_arity(ctx, items, 2)?;
            Ok((
                expect_symbol(ctx, &items[0], "a variable name")?,
                Sort::from_sexpr(&items[1])?,
            ))
        })
        .collect()
}

fn attributes(ctx: &str, items: &[SExpr]) -> Result<Vec<Attribute>> {
    let mut out = Vec::new();
    let mut iter = items.iter().peekable();
    while let Some(item) = iter.next() {
        let SExpr::Keyword(keyword) = item else {
            return Err(shape(ctx, format!("expected a keyword, found `{item}`")));
        };
        let value = match iter.peek() {
            Some(SExpr::Keyword(_)) | None => None,
            Some(_) => iter.next().cloned(),
        };
        out.push(Attribute {
            keyword: keyword.clone(),
            value,
        });
    }
    Ok(out)
}

impl Expr {
    pub fn from_sexpr(s: &SExpr) -> Result<Expr> {
        match s {
            SExpr::Numeral(n) => Ok(Expr::Numeral(n.clone())),
            SExpr::Decimal(d) => Ok(Expr::Decimal(d.clone())),
            SExpr::Binary(b) => Ok(Expr::Binary(b.clone())),
            SExpr::Hex(h) => Ok(Expr::Hex(h.clone())),
            SExpr::String(v) => Ok(Expr::String(v.clone())),
            SExpr::Symbol(_) => Ok(Expr::Ident(QualIdent::from_sexpr(s)?)),
            SExpr::Keyword(k) => Err(shape("term", format!("unexpected keyword `:{k}`"))),
            SExpr::List(items) => Self::from_list(s, items),
        }
    }

    fn from_list(whole: &SExpr, items: &[SExpr]) -> Result<Expr> {
        let Some(head) = items.first() else {
            return Err(shape("term", "empty term `()`"));
        };
        match head.as_symbol() {
            Some("_") | Some("as") => Ok(Expr::Ident(QualIdent::from_sexpr(whole)?)),
            Some("let") => {
                expect_arity("let", &items[1..], 2)?;
                let bindings = expect_list("let", &items[1], "a list of bindings")?
                    .iter()
                    .map(|b| {
                        let pair = expect_list("let", b, "a `(name term)` binding")?;
                        expect_arity("let", pair, 2)?;
                        Ok((
                            expect_symbol("let", &pair[0], "a variable name")?,
                            Expr::from_sexpr(&pair[1])?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Let {
                    bindings,
                    body: Box::new(Expr::from_sexpr(&items[2])?),
                })
            }
            Some(q @ ("forall" | "exists")) => {
                expect_arity(q, &items[1..], 2)?;
                let vars = sorted_vars(q, &items[1])?;
                if vars.is_empty() {
                    return Err(shape(q, "quantifier binds no variables"));
                }
                let body = Box::new(Expr::from_sexpr(&items[2])?);
                Ok(if q == "forall" {
                    Expr::Forall { vars, body }
                } else {
                    Expr::Exists { vars, body }
                })
            }
            Some("!") => {
                if items.len() < 3 {
                    return Err(shape("!", "annotation needs a term and at least one attribute"));
                }
                Ok(Expr::Annotated {
                    expr: Box::new(Expr::from_sexpr(&items[1])?),
                    attributes: attributes("!", &items[2..])?,
                })
            }
            _ => {
                if items.len() < 2 {
                    return Err(shape("term", format!("application `{whole}` has no arguments")));
                }
                Ok(Expr::App {
                    head: QualIdent::from_sexpr(head)?,
                    args: items[1..]
                        .iter()
                        .map(Expr::from_sexpr)
                        .collect::<Result<Vec<_>>>()?,
                })
            }
        }
    }
}

impl Command {
    pub fn from_sexpr(s: &SExpr) -> Result<Command> {
        let items = expect_list("command", s, "a parenthesized command")?;
        let Some(head) = items.first() else {
            return Err(shape("command", "empty command `()`"));
        };
        let name = expect_symbol("command", head, "a command name")?;
        let args = &items[1..];
        let ctx = name.as_str();
        let no_args = |cmd: Command| -> Result<Command> {
            expect_arity(ctx, args, 0)?;
            Ok(cmd)
        };
        match ctx {
            "set-logic" => {
                expect_arity(ctx, args, 1)?;
                Ok(Command::SetLogic(expect_symbol(ctx, &args[0], "a logic name")?))
            }
            "set-option" | "set-info" => {
                let keyword = match args.first() {
                    Some(SExpr::Keyword(k)) => k.clone(),
                    _ => return Err(shape(ctx, "expected a keyword")),
                };
                let value = match args.len() {
                    1 if ctx == "set-info" => SExpr::bool(true),
                    2 => args[1].clone(),
                    n => return Err(shape(ctx, format!("expected a keyword and a value, found {n} argument(s)"))),
                };
                Ok(if ctx == "set-option" {
                    Command::SetOption { keyword, value }
                } else {
                    Command::SetInfo { keyword, value }
                })
            }
            "get-option" | "get-info" => {
                expect_arity(ctx, args, 1)?;
                let SExpr::Keyword(k) = &args[0] else {
                    return Err(shape(ctx, "expected a keyword"));
                };
                Ok(if ctx == "get-option" {
                    Command::GetOption(k.clone())
                } else {
                    Command::GetInfo(k.clone())
                })
            }
            "declare-fun" => {
                expect_arity(ctx, args, 3)?;
                Ok(Command::DeclareFun {
                    name: expect_symbol(ctx, &args[0], "a function name")?,
                    params: expect_list(ctx, &args[1], "a list of parameter sorts")?
                        .iter()
                        .map(Sort::from_sexpr)
                        .collect::<Result<Vec<_>>>()?,
                    result: Sort::from_sexpr(&args[2])?,
                })
            }
            "declare-const" => {
                expect_arity(ctx, args, 2)?;
                Ok(Command::DeclareConst {
                    name: expect_symbol(ctx, &args[0], "a constant name")?,
                    sort: Sort::from_sexpr(&args[1])?,
                })
            }
            "define-fun" => {
                expect_arity(ctx, args, 4)?;
                Ok(Command::DefineFun {
                    name: expect_symbol(ctx, &args[0], "a function name")?,
                    params: sorted_vars(ctx, &args[1])?,
                    result: Sort::from_sexpr(&args[2])?,
                    body: Expr::from_sexpr(&args[3])?,
                })
            }
            "declare-sort" => {
                let arity = match args.len() {
                    1 => 0,
                    2 => expect_numeral(ctx, &args[1])?,
                    n => return Err(shape(ctx, format!("expected 1 or 2 arguments, found {n}"))),
                };
                Ok(Command::DeclareSort {
                    name: expect_symbol(ctx, &args[0], "a sort name")?,
                    arity,
                })
            }
            "define-sort" => {
                expect_arity(ctx, args, 3)?;
                Ok(Command::DefineSort {
                    name: expect_symbol(ctx, &args[0], "a sort name")?,
                    params: expect_list(ctx, &args[1], "a list of sort parameters")?
                        .iter()
                        .map(|p| expect_symbol(ctx, p, "a sort parameter"))
                        .collect::<Result<Vec<_>>>()?,
                    body: Sort::from_sexpr(&args[2])?,
                })
            }
            "assert" | "eval" => {
                expect_arity(ctx, args, 1)?;
                let term = Expr::from_sexpr(&args[0])?;
                Ok(if ctx == "assert" {
                    Command::Assert(term)
                } else {
                    Command::Eval(term)
                })
            }
            "push" | "pop" => {
                let n = match args.len() {
                    0 => 1,
                    1 => expect_numeral(ctx, &args[0])?,
                    n => return Err(shape(ctx, format!("expected at most 1 argument, found {n}"))),
                };
                Ok(if ctx == "push" {
                    Command::Push(n)
                } else {
                    Command::Pop(n)
                })
            }
            "get-value" => {
                expect_arity(ctx, args, 1)?;
                let terms = expect_list(ctx, &args[0], "a list of terms")?
                    .iter()
                    .map(Expr::from_sexpr)
                    .collect::<Result<Vec<_>>>()?;
                if terms.is_empty() {
                    return Err(shape(ctx, "expected at least one term"));
                }
                Ok(Command::GetValue(terms))
            }
            "echo" => {
                expect_arity(ctx, args, 1)?;
                match &args[0] {
                    SExpr::String(text) => Ok(Command::Echo(text.clone())),
                    other => Err(shape(ctx, format!("expected a string literal, found `{other}`"))),
                }
            }
            "check-sat" => no_args(Command::CheckSat),
            "get-assertions" => no_args(Command::GetAssertions),
            "get-model" => no_args(Command::GetModel),
            "get-proof" => no_args(Command::GetProof),
            "get-unsat-core" => no_args(Command::GetUnsatCore),
            "get-assignment" => no_args(Command::GetAssignment),
            "reset" => no_args(Command::Reset),
            "exit" => no_args(Command::Exit),
            other => Err(shape(other, "unknown command")),
        }
    }
}
