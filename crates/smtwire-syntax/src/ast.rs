use crate::sexpr::SExpr;

/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Index of an indexed identifier: `(_ extract 7 0)`, `(_ bv10 32)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Index {
    Numeral(String),
    Symbol(String),
}

/// A plain or indexed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Identifier {
    pub symbol: String,
    pub indices: Vec<Index>,
}

impl Identifier {
    pub fn simple(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            indices: Vec::new(),
        }
    }

    pub fn indexed(symbol: impl Into<String>, indices: Vec<Index>) -> Self {
        Self {
            symbol: symbol.into(),
            indices,
        }
    }

    pub fn is_simple(&self, name: &str) -> bool {
        self.indices.is_empty() && self.symbol == name
    }
}

/// A sort such as `Int`, `(Array Int Bool)` or `(_ BitVec 8)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Sort {
    pub id: Identifier,
    pub params: Vec<Sort>,
}

impl Sort {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            id: Identifier::simple(name),
            params: Vec::new(),
        }
    }

    pub fn bool() -> Self {
        Self::simple("Bool")
    }

    pub fn int() -> Self {
        Self::simple("Int")
    }

    pub fn bitvec(width: u32) -> Self {
        Self {
            id: Identifier::indexed("BitVec", vec![Index::Numeral(width.to_string())]),
            params: Vec::new(),
        }
    }

    pub fn parametric(name: impl Into<String>, params: Vec<Sort>) -> Self {
        Self {
            id: Identifier::simple(name),
            params,
        }
    }
}

/// An identifier optionally qualified with `(as id sort)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct QualIdent {
    pub id: Identifier,
    pub sort: Option<Sort>,
}

impl QualIdent {
    pub fn simple(symbol: impl Into<String>) -> Self {
        Self {
            id: Identifier::simple(symbol),
            sort: None,
        }
    }

    /// The bare operator name when this is an unqualified, unindexed symbol.
    pub fn plain_symbol(&self) -> Option<&str> {
        if self.sort.is_none() && self.id.indices.is_empty() {
            Some(&self.id.symbol)
        } else {
            None
        }
    }
}

/// `:keyword value` pair used by `!` annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Attribute {
    pub keyword: String,
    pub value: Option<SExpr>,
}

/// SMT-LIB term.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Expr {
    Numeral(String),
    Decimal(String),
    Binary(String),
    Hex(String),
    String(String),
    Ident(QualIdent),
    App {
        head: QualIdent,
        args: Vec<Expr>,
    },
    Let {
        bindings: Vec<(String, Expr)>,
        body: Box<Expr>,
    },
    Forall {
        vars: Vec<(String, Sort)>,
        body: Box<Expr>,
    },
    Exists {
        vars: Vec<(String, Sort)>,
        body: Box<Expr>,
    },
    Annotated {
        expr: Box<Expr>,
        attributes: Vec<Attribute>,
    },
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Ident(QualIdent::simple(name))
    }

    pub fn numeral(n: u64) -> Self {
        Expr::Numeral(n.to_string())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::String(value.into())
    }

    pub fn app(op: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::App {
            head: QualIdent::simple(op),
            args,
        }
    }

    pub fn not(self) -> Self {
        Expr::app("not", vec![self])
    }

    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::app("and", terms)
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Expr::Annotated {
            expr: Box::new(self),
            attributes: vec![Attribute {
                keyword: "named".into(),
                value: Some(SExpr::Symbol(name.into())),
            }],
        }
    }
}

/// One script command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Command {
    SetLogic(String),
    SetOption {
        keyword: String,
        value: SExpr,
    },
    GetOption(String),
    SetInfo {
        keyword: String,
        value: SExpr,
    },
    GetInfo(String),
    DeclareFun {
        name: String,
        params: Vec<Sort>,
        result: Sort,
    },
    DeclareConst {
        name: String,
        sort: Sort,
    },
    DefineFun {
        name: String,
        params: Vec<(String, Sort)>,
        result: Sort,
        body: Expr,
    },
    DeclareSort {
        name: String,
        arity: usize,
    },
    DefineSort {
        name: String,
        params: Vec<String>,
        body: Sort,
    },
    Assert(Expr),
    CheckSat,
    Push(usize),
    Pop(usize),
    GetAssertions,
    GetModel,
    GetProof,
    GetUnsatCore,
    GetAssignment,
    GetValue(Vec<Expr>),
    Eval(Expr),
    Echo(String),
    Reset,
    Exit,
}

impl Command {
    /// The SMT-LIB command name, e.g. `declare-fun`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetLogic(_) => "set-logic",
            Command::SetOption { .. } => "set-option",
            Command::GetOption(_) => "get-option",
            Command::SetInfo { .. } => "set-info",
            Command::GetInfo(_) => "get-info",
            Command::DeclareFun { .. } => "declare-fun",
            Command::DeclareConst { .. } => "declare-const",
            Command::DefineFun { .. } => "define-fun",
            Command::DeclareSort { .. } => "declare-sort",
            Command::DefineSort { .. } => "define-sort",
            Command::Assert(_) => "assert",
            Command::CheckSat => "check-sat",
            Command::Push(_) => "push",
            Command::Pop(_) => "pop",
            Command::GetAssertions => "get-assertions",
            Command::GetModel => "get-model",
            Command::GetProof => "get-proof",
            Command::GetUnsatCore => "get-unsat-core",
            Command::GetAssignment => "get-assignment",
            Command::GetValue(_) => "get-value",
            Command::Eval(_) => "eval",
            Command::Echo(_) => "echo",
            Command::Reset => "reset",
            Command::Exit => "exit",
        }
    }
}
