//! This file contains all items related to the lexical phase of the program.
//! It takes a string representing the line being lexed and converts it into a linear structure of Tokens.

use std::collections::VecDeque;

use logos::{Logos, Span};

use crate::types::error::{SyntaxError, SyntaxErrorKind};

#[derive(Logos, Clone, Copy, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f,]+")]
/// Token produced from the lexing step
pub enum Token<'t> {
    #[token("(")]
    /// Open Parenthesis (
    OpenParen,
    #[token(")")]
    /// Close Parenthesis )
    CloseParen,
    #[token("[")]
    /// Open Bracket [
    OpenBracket,
    #[token("]")]
    /// Close Bracket ]
    CloseBracket,
    #[token("{")]
    /// Open Brace {
    OpenBrace,
    #[token("}")]
    /// Close Brace }
    CloseBrace,
    #[token("'")]
    /// Apostrophe '
    Quote,
    #[token("`")]
    /// Backtick `
    Quasiquote,
    #[token("~")]
    /// Tilde ~
    Unquote,
    #[token("~@")]
    /// Tilde + At ~@
    SpliceUnquote,
    #[token("@")]
    /// At-symbol @
    Deref,
    #[token("^")]
    /// Caret ^
    Meta,

    #[regex(r#""(?:\\.|[^\\"])*"?"#, |lex| lex.slice())]
    /// String: Open Quote ... Stuff in between ... Close Quote (which may be missing)
    StringTok(&'t str),

    #[regex(r";[^\n]*", |lex| lex.slice())]
    /// Comment: Semicolon ... Stuff in between ... until \n
    Comment(&'t str),

    #[regex(r#"[^\s\[\]{}()'"`,;~@^][^\s\[\]{}()'"`,;]*"#, |lex| lex.slice())]
    /// Atom: a run of bare characters; cannot start with a reader macro character
    Atom(&'t str),
}

impl<'t> Token<'t> {
    /// Check if a given token is a comment
    fn is_comment(&self) -> bool {
        matches!(self, Token::Comment(_))
    }

    pub fn is_closer(&self) -> bool {
        matches!(
            self,
            Token::CloseParen | Token::CloseBracket | Token::CloseBrace
        )
    }
}

/// Take a string and produce a list of token with span, comments removed
pub fn tokenize(input: &str) -> Result<VecDeque<(Token<'_>, Span)>, SyntaxError> {
    Token::lexer(input)
        .spanned()
        .filter(|(res, _)| !matches!(res, Ok(tok) if tok.is_comment()))
        .map(|(res, span)| match res {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(SyntaxError::new(
                SyntaxErrorKind::UnexpectedCharacter,
                input,
                span,
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .expect("lexes")
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    #[test_case("~@", vec![Token::SpliceUnquote] ; "splice unquote is one token")]
    #[test_case("~ @", vec![Token::Unquote, Token::Deref] ; "separated tilde and at")]
    #[test_case("(1, 2)", vec![Token::OpenParen, Token::Atom("1"), Token::Atom("2"), Token::CloseParen] ; "commas are whitespace")]
    #[test_case("abc ; comment\ndef", vec![Token::Atom("abc"), Token::Atom("def")] ; "comments dropped")]
    #[test_case(r#""a \" b""#, vec![Token::StringTok(r#""a \" b""#)] ; "escaped quote stays in string")]
    #[test_case(r#""abc"#, vec![Token::StringTok(r#""abc"#)] ; "unterminated string still lexed")]
    #[test_case("'a`b", vec![Token::Quote, Token::Atom("a"), Token::Quasiquote, Token::Atom("b")] ; "reader macros split atoms")]
    #[test_case("^{} x", vec![Token::Meta, Token::OpenBrace, Token::CloseBrace, Token::Atom("x")] ; "meta")]
    #[test_case("a@b", vec![Token::Atom("a@b")] ; "at inside atom")]
    #[test_case("[:kw]", vec![Token::OpenBracket, Token::Atom(":kw"), Token::CloseBracket] ; "keyword in vector")]
    fn lexing(input: &str, expected: Vec<Token>) {
        assert_eq!(tokens(input), expected)
    }

    #[test]
    fn spans_point_at_source() {
        let toks = tokenize("  (abc)").expect("lexes");
        assert_eq!(toks[1].1, 3..6);
    }
}
