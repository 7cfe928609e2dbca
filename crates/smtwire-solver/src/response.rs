use std::fmt;

use serde::Serialize;
use smtwire_syntax::sexpr::write_string_literal;
use smtwire_syntax::{SExpr, Span};

/// Outcome of one session command, whether answered locally or by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Response {
    Success,
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<Span>,
    },
    Sat,
    Unsat,
    Unknown,
    Values {
        items: Vec<SExpr>,
    },
    StringLiteral {
        value: String,
    },
    Info {
        keyword: String,
        value: SExpr,
    },
    Unsupported,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
            position: None,
        }
    }

    pub fn error_at(message: impl Into<String>, position: Span) -> Self {
        Response::Error {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Response::StringLiteral {
            value: value.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Response::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Classify the top-level S-expressions of a solver reply.
    pub fn from_sexprs(mut items: Vec<SExpr>) -> Self {
        if items.len() != 1 {
            if items.is_empty() {
                return Response::error("The solver sent an empty response");
            }
            return Response::Values { items };
        }
        let item = items.remove(0);
        match item {
            SExpr::Symbol(s) => match s.as_str() {
                "success" => Response::Success,
                "sat" => Response::Sat,
                "unsat" => Response::Unsat,
                "unknown" => Response::Unknown,
                "unsupported" => Response::Unsupported,
                _ => Response::Values {
                    items: vec![SExpr::Symbol(s)],
                },
            },
            SExpr::String(value) => Response::StringLiteral { value },
            SExpr::List(list) => Self::from_list(list),
            atom => Response::Values { items: vec![atom] },
        }
    }

    fn from_list(list: Vec<SExpr>) -> Self {
        match list.as_slice() {
            [SExpr::Symbol(head), SExpr::String(message)] if head == "error" => {
                Response::error(message.clone())
            }
            [SExpr::Keyword(keyword), value] => Response::Info {
                keyword: keyword.clone(),
                value: value.clone(),
            },
            _ => Response::Values { items: list },
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success => f.write_str("success"),
            Response::Error { message, .. } => {
                f.write_str("(error ")?;
                write_string_literal(f, message)?;
                f.write_str(")")
            }
            Response::Sat => f.write_str("sat"),
            Response::Unsat => f.write_str("unsat"),
            Response::Unknown => f.write_str("unknown"),
            Response::Values { items } => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Response::StringLiteral { value } => f.write_str(value),
            Response::Info { keyword, value } => write!(f, "(:{keyword} {value})"),
            Response::Unsupported => f.write_str("unsupported"),
        }
    }
}
