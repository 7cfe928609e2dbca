#![allow(clippy::result_large_err)]

use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Command, Span, Spanned};
use crate::errors::ParseError;
use crate::sexpr::SExpr;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct SmtLibParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse every top-level S-expression in `source`, keeping their spans.
pub fn parse_spanned(source: &str, filename: &str) -> Result<Vec<Spanned<SExpr>>, ParseError> {
    let pairs = SmtLibParser::parse(Rule::sexprs, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(
            format!("{}", e.variant.message()),
            Span::new(start, end.min(source.len().max(start))),
            source,
            filename,
        )
    })?;

    let root = pairs.into_iter().next().unwrap();
    Ok(root
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| {
            let span = span_from(&p);
            Spanned::new(build_sexpr(p), span)
        })
        .collect())
}

/// Parse solver output (or any text) into its top-level S-expressions.
pub fn parse_sexprs(text: &str) -> Result<Vec<SExpr>, ParseError> {
    Ok(parse_spanned(text, "<response>")?
        .into_iter()
        .map(|s| s.node)
        .collect())
}

fn build_sexpr(pair: Pair<'_>) -> SExpr {
    match pair.as_rule() {
        Rule::list => SExpr::List(pair.into_inner().map(build_sexpr).collect()),
        Rule::string => {
            let inner = pair.into_inner().next().unwrap().as_str();
            SExpr::String(unescape_string(inner))
        }
        Rule::quoted_symbol => {
            let inner = pair.into_inner().next().unwrap().as_str();
            SExpr::Symbol(inner.to_string())
        }
        Rule::binary => SExpr::Binary(pair.as_str()[2..].to_string()),
        Rule::hexadecimal => SExpr::Hex(pair.as_str()[2..].to_string()),
        Rule::decimal => SExpr::Decimal(pair.as_str().to_string()),
        Rule::numeral => SExpr::Numeral(pair.as_str().to_string()),
        Rule::keyword => SExpr::Keyword(pair.as_str()[1..].to_string()),
        Rule::symbol => SExpr::Symbol(pair.as_str().to_string()),
        other => unreachable!("unexpected rule {other:?} in s-expression position"),
    }
}

/// Both the SMT-LIB 2.5 `""` escape and the older `\"` escape denote a quote.
fn unescape_string(raw: &str) -> String {
    raw.replace("\"\"", "\"").replace("\\\"", "\"")
}

/// Reads a script one command at a time.
///
/// The whole source is tokenized up front, so a lexical error (for example an
/// unbalanced parenthesis) is reported by [`ScriptReader::new`]. Malformed
/// commands are reported per item and do not stop the reader; whether to skip
/// them or abort is up to the caller.
pub struct ScriptReader {
    source: String,
    filename: String,
    items: std::vec::IntoIter<Spanned<SExpr>>,
}

impl ScriptReader {
    pub fn new(source: &str, filename: &str) -> Result<Self, ParseError> {
        let items = parse_spanned(source, filename)?;
        Ok(Self {
            source: source.to_string(),
            filename: filename.to_string(),
            items: items.into_iter(),
        })
    }

    /// True once every command has been handed out.
    pub fn is_end(&self) -> bool {
        self.items.len() == 0
    }

    pub fn next_command(&mut self) -> Option<Result<Spanned<Command>, ParseError>> {
        let item = self.items.next()?;
        Some(
            Command::from_sexpr(&item.node)
                .map(|cmd| Spanned::new(cmd, item.span))
                .map_err(|shape| ParseError::malformed(shape, item.span, &self.source, &self.filename)),
        )
    }
}

impl Iterator for ScriptReader {
    type Item = Result<Spanned<Command>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_command()
    }
}

/// Parse a whole script, failing on the first malformed command.
pub fn parse_script(source: &str, filename: &str) -> Result<Vec<Command>, ParseError> {
    ScriptReader::new(source, filename)?
        .map(|item| item.map(|c| c.node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Sort};

    #[test]
    fn parse_atoms() {
        let items = parse_sexprs("sat 42 3.14 #b1010 #xFF :named |a b| \"hi\"").unwrap();
        assert_eq!(
            items,
            vec![
                SExpr::symbol("sat"),
                SExpr::Numeral("42".into()),
                SExpr::Decimal("3.14".into()),
                SExpr::Binary("1010".into()),
                SExpr::Hex("FF".into()),
                SExpr::keyword("named"),
                SExpr::symbol("a b"),
                SExpr::string("hi"),
            ]
        );
    }

    #[test]
    fn parse_nested_lists_and_comments() {
        let items = parse_sexprs("; model follows\n((x 1) (y (- 2)))\n").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].to_string(), "((x 1) (y (- 2)))");
    }

    #[test]
    fn parse_string_escapes() {
        let items = parse_sexprs(r#"(error "say ""hi"" and \"bye\"") """#).unwrap();
        assert_eq!(
            items[0],
            SExpr::list(vec![
                SExpr::symbol("error"),
                SExpr::string("say \"hi\" and \"bye\""),
            ])
        );
        assert_eq!(items[1], SExpr::string(""));
    }

    #[test]
    fn parse_reports_unbalanced_input() {
        let err = parse_sexprs("(assert (> a 1)").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn empty_input_has_no_items() {
        assert!(parse_sexprs("  \n ; nothing\n").unwrap().is_empty());
    }

    #[test]
    fn script_reader_yields_commands_in_order() {
        let src = "(set-logic QF_UF)(declare-fun p () Bool)\n(assert (and p (not p)))(check-sat)";
        let mut reader = ScriptReader::new(src, "t.smt2").unwrap();
        assert!(!reader.is_end());
        assert_eq!(
            reader.next_command().unwrap().unwrap().node,
            Command::SetLogic("QF_UF".into())
        );
        assert_eq!(
            reader.next_command().unwrap().unwrap().node,
            Command::DeclareFun {
                name: "p".into(),
                params: vec![],
                result: Sort::bool(),
            }
        );
        let assert = reader.next_command().unwrap().unwrap();
        assert_eq!(
            assert.node,
            Command::Assert(Expr::and(vec![Expr::symbol("p"), Expr::symbol("p").not()]))
        );
        assert_eq!(assert.span.start, 41);
        assert_eq!(reader.next_command().unwrap().unwrap().node, Command::CheckSat);
        assert!(reader.is_end());
        assert!(reader.next_command().is_none());
    }

    #[test]
    fn script_reader_reports_malformed_command_and_continues() {
        let mut reader = ScriptReader::new("(assert)(check-sat)", "t.smt2").unwrap();
        let err = reader.next_command().unwrap().unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        assert_eq!(reader.next_command().unwrap().unwrap().node, Command::CheckSat);
    }

    #[test]
    fn parse_script_stops_at_first_error() {
        assert!(parse_script("(check-sat)(push x)", "t.smt2").is_err());
        assert_eq!(parse_script("(push 2)", "t.smt2").unwrap(), vec![Command::Push(2)]);
    }
}
