//! These are types that are used to represent errors at different stages of the program

use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};

use super::MalType;

/// Either results in a MAL type or gives back an error
pub type MalResult = Result<MalType, MalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What went wrong while reading
pub enum SyntaxErrorKind {
    /// Input ran out before a form was complete (or there was no form at all)
    Eof,
    /// A closing delimiter that does not match the open one
    Unbalanced,
    /// String without its closing quote
    UnterminatedString,
    /// Backslash followed by something other than `\`, `"` or `n`
    UnknownEscape,
    /// String whose last character is an unescaped backslash
    TrailingEscape,
    /// Map literal with a key but no value
    OddMapEntries,
    /// Character the lexer cannot make sense of
    UnexpectedCharacter,
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxErrorKind::Eof => f.write_str("unexpected end of input"),
            SyntaxErrorKind::Unbalanced => f.write_str("unbalanced delimiter"),
            SyntaxErrorKind::UnterminatedString => f.write_str("unbalanced string"),
            SyntaxErrorKind::UnknownEscape => f.write_str("unknown escape sequence"),
            SyntaxErrorKind::TrailingEscape => f.write_str("trailing escape"),
            SyntaxErrorKind::OddMapEntries => f.write_str("map literal needs an even number of forms"),
            SyntaxErrorKind::UnexpectedCharacter => f.write_str("unexpected character"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Diagnostic)]
#[diagnostic(code(mal::syntax))]
/// Error produced during the reading stage, with the span of the token that caused it
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    #[source_code]
    pub src: String,
    #[label("here")]
    pub span: SourceSpan,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, src: &str, span: std::ops::Range<usize>) -> Self {
        SyntaxError {
            kind,
            src: src.to_string(),
            span: span.into(),
        }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, derive_more::From)]
/// Union of all the errors that can stop an evaluation
pub enum MalError {
    /// Malformed text given to the reader
    Syntax(SyntaxError),
    /// Parameters and arguments that do not line up
    #[from(ignore)]
    Binding(String),
    /// Symbol with no binding in the environment chain
    #[from(ignore)]
    Name(String),
    /// Special form used with the wrong shape
    #[from(ignore)]
    Form(String),
    /// Call target is not callable, or a primitive rejected its arguments
    #[from(ignore)]
    Application(String),
    /// Value raised by `throw`
    #[from(ignore)]
    Thrown(MalType),
}

impl MalError {
    /// The value bound by `catch*` for this error
    ///
    /// Thrown values pass through unchanged, everything else becomes an error wrapping its message.
    pub fn into_payload(self) -> MalType {
        match self {
            MalError::Thrown(value) => value,
            other => MalType::Error(Box::new(MalType::String(other.to_string()))),
        }
    }

    fn code_str(&self) -> &'static str {
        match self {
            MalError::Syntax(_) => "mal::syntax",
            MalError::Binding(_) => "mal::binding",
            MalError::Name(_) => "mal::name",
            MalError::Form(_) => "mal::form",
            MalError::Application(_) => "mal::application",
            MalError::Thrown(_) => "mal::thrown",
        }
    }
}

impl PartialEq for MalError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MalError::Syntax(l), MalError::Syntax(r)) => l.kind == r.kind,
            (MalError::Binding(l), MalError::Binding(r))
            | (MalError::Name(l), MalError::Name(r))
            | (MalError::Form(l), MalError::Form(r))
            | (MalError::Application(l), MalError::Application(r)) => l == r,
            (MalError::Thrown(l), MalError::Thrown(r)) => l == r,
            _ => false,
        }
    }
}

impl Display for MalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalError::Syntax(err) => write!(f, "{err}"),
            MalError::Binding(msg) | MalError::Form(msg) | MalError::Application(msg) => {
                f.write_str(msg)
            }
            MalError::Name(name) => write!(f, "{name} not found"),
            MalError::Thrown(value) => write!(f, "{}", crate::printer::pr_str(value, true)),
        }
    }
}

impl std::error::Error for MalError {}

impl Diagnostic for MalError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.code_str()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            MalError::Name(_) => Some(Box::new("define it first with def!")),
            MalError::Thrown(_) => Some(Box::new("wrap the form in try*/catch* to handle it")),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            MalError::Syntax(err) => err.source_code(),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            MalError::Syntax(err) => err.labels(),
            _ => None,
        }
    }
}

pub fn binding_error<T>(msg: impl Into<String>) -> Result<T, MalError> {
    Err(MalError::Binding(msg.into()))
}

pub fn form_error<T>(msg: impl Into<String>) -> Result<T, MalError> {
    Err(MalError::Form(msg.into()))
}

pub fn application_error<T>(msg: impl Into<String>) -> Result<T, MalError> {
    Err(MalError::Application(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(MalError::Name("abc".to_string()), "abc not found" ; "name error mentions the symbol")]
    #[test_case(MalError::Form("bad let*".to_string()), "bad let*" ; "form error is its message")]
    #[test_case(MalError::Thrown(MalType::string("boom")), "\"boom\"" ; "thrown value prints readably")]
    fn error_message(err: MalError, msg: &str) {
        assert_eq!(err.to_string(), msg)
    }

    #[test]
    fn thrown_payload_passes_through() {
        let payload = MalError::Thrown(MalType::Number(7.0)).into_payload();
        assert_eq!(payload, MalType::Number(7.0));
    }

    #[test]
    fn host_payload_is_wrapped_message() {
        let payload = MalError::Application("index out of range".to_string()).into_payload();
        assert_eq!(
            payload,
            MalType::Error(Box::new(MalType::string("index out of range")))
        );
    }

    #[test]
    fn syntax_error_has_label() {
        let err = MalError::from(SyntaxError::new(SyntaxErrorKind::Eof, "(1 2", 4..4));
        assert_eq!(err.labels().map(|l| l.count()), Some(1));
        assert!(err.source_code().is_some());
    }
}
