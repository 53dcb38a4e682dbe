//! Module for parsing tokens into forms

use std::{collections::VecDeque, sync::OnceLock};

use logos::Span;
use regex::Regex;

use crate::types::{
    error::{SyntaxError, SyntaxErrorKind},
    MalError, MalMap, MalResult, MalType,
};

use super::lexer::{tokenize, Token};

/// Optional sign, digits with an optional fraction, optional exponent
fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("number pattern is valid")
    })
}

/// Read the first form of a string
///
/// Anything after the first complete form is ignored.
pub fn read_str(input: &str) -> MalResult {
    Reader::new(input)?.read_form()
}

/// Read every form in a string, in order
pub fn read_all(input: &str) -> Result<Vec<MalType>, MalError> {
    let mut reader = Reader::new(input)?;
    let mut forms = Vec::new();
    while !reader.tokens.is_empty() {
        forms.push(reader.read_form()?);
    }
    Ok(forms)
}

struct Reader<'t> {
    src: &'t str,
    tokens: VecDeque<(Token<'t>, Span)>,
}

impl<'t> Reader<'t> {
    fn new(src: &'t str) -> Result<Self, MalError> {
        Ok(Reader {
            src,
            tokens: tokenize(src)?,
        })
    }

    fn error<T>(&self, kind: SyntaxErrorKind, span: Span) -> Result<T, MalError> {
        Err(SyntaxError::new(kind, self.src, span).into())
    }

    fn end_of_input(&self) -> Span {
        self.src.len()..self.src.len()
    }

    /// Take a sequence of token and read its form
    fn read_form(&mut self) -> MalResult {
        let Some((token, span)) = self.tokens.pop_front() else {
            return self.error(SyntaxErrorKind::Eof, self.end_of_input());
        };
        match token {
            Token::OpenParen => Ok(MalType::list(self.read_seq(Token::CloseParen, span)?)),
            Token::OpenBracket => Ok(MalType::vector(self.read_seq(Token::CloseBracket, span)?)),
            Token::OpenBrace => self.read_hashmap(span),
            Token::Quote => self.read_wrapped("quote"),
            Token::Quasiquote => self.read_wrapped("quasiquote"),
            Token::Unquote => self.read_wrapped("unquote"),
            Token::SpliceUnquote => self.read_wrapped("splice-unquote"),
            Token::Deref => self.read_wrapped("deref"),
            Token::Meta => {
                let meta = self.read_form()?;
                let form = self.read_form()?;
                Ok(MalType::list(vec![MalType::symbol("with-meta"), form, meta]))
            }
            Token::StringTok(string) => self.read_string(string, span),
            Token::Atom(atom) => Ok(read_atom(atom)),
            Token::CloseParen | Token::CloseBracket | Token::CloseBrace => {
                self.error(SyntaxErrorKind::Unbalanced, span)
            }
            Token::Comment(_) => self.read_form(),
        }
    }

    /// `'x` and friends become `(name x)`
    fn read_wrapped(&mut self, name: &str) -> MalResult {
        let form = self.read_form()?;
        Ok(MalType::list(vec![MalType::symbol(name), form]))
    }

    /// Read forms until `closer`; a different closer or running out of input is an error
    fn read_seq(&mut self, closer: Token<'t>, open: Span) -> Result<Vec<MalType>, MalError> {
        let mut items = Vec::new();
        loop {
            match self.tokens.front().cloned() {
                None => return self.error(SyntaxErrorKind::Eof, open.start..self.src.len()),
                Some((token, _)) if token == closer => {
                    self.tokens.pop_front();
                    return Ok(items);
                }
                Some((token, span)) if token.is_closer() => {
                    return self.error(SyntaxErrorKind::Unbalanced, span)
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }

    /// Read a hashmap from lexed list
    ///
    /// Example:
    /// * {"a" 1} -> **OK**: MalType::Map({"a":1})
    /// * {"a"} -> **ERR**: odd number of forms
    fn read_hashmap(&mut self, open: Span) -> MalResult {
        let items = self.read_seq(Token::CloseBrace, open.clone())?;
        if items.len() % 2 != 0 {
            return self.error(SyntaxErrorKind::OddMapEntries, open.start..open.end);
        }
        Ok(MalType::Map(
            items
                .chunks_exact(2)
                .map(|kv| (kv[0].clone(), kv[1].clone()))
                .collect::<MalMap>(),
        ))
    }

    /// Strip the quotes and resolve `\\`, `\"` and `\n`
    fn read_string(&self, token: &str, span: Span) -> MalResult {
        let mut out = String::with_capacity(token.len());
        let mut chars = token.chars().skip(1);
        loop {
            match chars.next() {
                None => return self.error(SyntaxErrorKind::UnterminatedString, span),
                Some('"') => break,
                Some('\\') => match chars.next() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some(_) => return self.error(SyntaxErrorKind::UnknownEscape, span),
                    None => return self.error(SyntaxErrorKind::TrailingEscape, span),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(MalType::String(out))
    }
}

/// Classify a bare token: literal constant, number, keyword, or symbol
fn read_atom(atom: &str) -> MalType {
    match atom {
        "nil" => MalType::Nil,
        "true" => MalType::Bool(true),
        "false" => MalType::Bool(false),
        num if number_pattern().is_match(num) => match num.parse::<f64>() {
            Ok(n) => MalType::Number(n),
            Err(_) => MalType::symbol(num),
        },
        kw if kw.starts_with(':') => MalType::Keyword(kw.to_string()),
        sym => MalType::symbol(sym),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::pr_str;
    use test_case::test_case;

    fn read_print(input: &str) -> String {
        pr_str(&read_str(input).expect("valid input"), true)
    }

    fn syntax_kind(input: &str) -> Option<SyntaxErrorKind> {
        match read_str(input) {
            Err(MalError::Syntax(err)) => Some(err.kind),
            _ => None,
        }
    }

    #[test_case("1", "1" ; "Read number")]
    #[test_case("-123", "-123" ; "Read negative number")]
    #[test_case("1.5e2", "150" ; "Read exponent")]
    #[test_case("-", "-" ; "Lone minus is a symbol")]
    #[test_case("-abc", "-abc" ; "Minus prefixed symbol")]
    #[test_case("inf", "inf" ; "inf is a symbol")]
    #[test_case("abc", "abc" ; "Read symbol")]
    #[test_case(":kw", ":kw" ; "Read keyword")]
    #[test_case("nil", "nil" ; "Read nil")]
    #[test_case("true", "true" ; "Read true")]
    #[test_case("( + 2 (* 3 4) ) ", "(+ 2 (* 3 4))" ; "Read nested list")]
    #[test_case("[+ 1 [+ 2 3]]", "[+ 1 [+ 2 3]]" ; "Read nested vector")]
    #[test_case("()", "()" ; "Read empty list")]
    #[test_case("{\"a\" 1}", "{\"a\" 1}" ; "Read hash map")]
    #[test_case("1 ; comment after expression", "1" ; "Comment after form")]
    #[test_case("'1", "(quote 1)" ; "Quote")]
    #[test_case("`(1 ~a ~@b)", "(quasiquote (1 (unquote a) (splice-unquote b)))" ; "Quasiquote family")]
    #[test_case("@a", "(deref a)" ; "Deref")]
    #[test_case("^{\"a\" 1} [1 2 3]", "(with-meta [1 2 3] {\"a\" 1})" ; "Meta puts value first")]
    #[test_case(r#""abc\"def""#, r#""abc\"def""# ; "Escaped quote")]
    #[test_case(r#""abc\ndef""#, r#""abc\ndef""# ; "Escaped newline")]
    #[test_case(r#""\\""#, r#""\\""# ; "Escaped backslash")]
    #[test_case("1 2 3", "1" ; "Only first form is read")]
    fn reading(input: &str, output: &str) {
        assert_eq!(read_print(input), output)
    }

    #[test_case("(1 2", SyntaxErrorKind::Eof ; "missing close paren")]
    #[test_case("[1 2", SyntaxErrorKind::Eof ; "missing close bracket")]
    #[test_case("(1 2]", SyntaxErrorKind::Unbalanced ; "mismatched closer")]
    #[test_case(")", SyntaxErrorKind::Unbalanced ; "stray closer")]
    #[test_case("\"abc", SyntaxErrorKind::UnterminatedString ; "unterminated string")]
    #[test_case("\"abc\\\"", SyntaxErrorKind::UnterminatedString ; "escaped final quote")]
    #[test_case(r#""\x""#, SyntaxErrorKind::UnknownEscape ; "unknown escape")]
    #[test_case("{1}", SyntaxErrorKind::OddMapEntries ; "odd map")]
    #[test_case("", SyntaxErrorKind::Eof ; "empty input")]
    #[test_case(";; only a comment", SyntaxErrorKind::Eof ; "comment only")]
    fn syntax_errors(input: &str, kind: SyntaxErrorKind) {
        assert_eq!(syntax_kind(input), Some(kind))
    }

    #[test]
    fn list_and_vector_keep_their_tags() {
        assert!(matches!(read_str("(1)"), Ok(MalType::List(_))));
        assert!(matches!(read_str("[1]"), Ok(MalType::Vector(_))));
    }

    #[test]
    fn read_all_reads_every_form() {
        let forms = read_all("(def! a 1) a ; done").expect("valid input");
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[1], MalType::symbol("a"));
    }

    #[test]
    fn error_span_points_at_closer() {
        let Err(MalError::Syntax(err)) = read_str("(1 2]") else {
            panic!("expected a syntax error")
        };
        assert_eq!(err.span.offset(), 4);
    }
}
