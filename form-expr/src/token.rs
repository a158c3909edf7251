//! Expression token definitions.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset.
    pub end: usize,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based).
    pub column: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Merge two spans.
    pub fn merge(self, other: Span) -> Self {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// Source of one `${...}` substitution inside a template literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSubstitution {
    /// Raw expression text between `${` and `}`.
    pub source: String,
    /// Location of the expression text.
    pub span: Span,
}

/// Expression token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Number literal (42, 3.14, 0xFF, 1_000, etc.)
    Number(f64),
    /// String literal ("hello", 'world')
    String(String),
    /// Template literal (`hello ${name}`)
    Template {
        /// Cooked string segments; always one more than `substitutions`.
        quasis: Vec<String>,
        /// Substitution sources in order.
        substitutions: Vec<TemplateSubstitution>,
    },
    /// BigInt literal (42n)
    BigInt(String),
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// Null literal
    Null,

    // Identifiers
    /// Identifier (including contextual words such as `async` or `of`)
    Identifier(String),
    /// Private identifier (#name)
    PrivateIdentifier(String),

    // Reserved words
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,

    // Brackets and separators
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Ellipsis,
    Semicolon,
    Comma,
    Colon,
    Question,
    QuestionDot,
    Arrow,

    // Operators
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    PlusPlus,
    MinusMinus,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Ampersand,
    Pipe,
    Caret,
    Bang,
    Tilde,
    AmpersandAmpersand,
    PipePipe,
    QuestionQuestion,

    // Assignment operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    StarStarAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    AmpersandAssign,
    PipeAssign,
    CaretAssign,
    AmpersandAmpersandAssign,
    PipePipeAssign,
    QuestionQuestionAssign,

    /// End of input
    Eof,
}

/// Reserved words, including the literal words `true`, `false` and `null`.
/// Contextual words (`async`, `of`, `get`, `set`, `let`, `static`) are
/// plain identifiers.
const RESERVED_WORDS: &[(&str, TokenKind)] = &[
    ("await", TokenKind::Await),
    ("break", TokenKind::Break),
    ("case", TokenKind::Case),
    ("catch", TokenKind::Catch),
    ("class", TokenKind::Class),
    ("const", TokenKind::Const),
    ("continue", TokenKind::Continue),
    ("debugger", TokenKind::Debugger),
    ("default", TokenKind::Default),
    ("delete", TokenKind::Delete),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("enum", TokenKind::Enum),
    ("export", TokenKind::Export),
    ("extends", TokenKind::Extends),
    ("false", TokenKind::False),
    ("finally", TokenKind::Finally),
    ("for", TokenKind::For),
    ("function", TokenKind::Function),
    ("if", TokenKind::If),
    ("import", TokenKind::Import),
    ("in", TokenKind::In),
    ("instanceof", TokenKind::Instanceof),
    ("new", TokenKind::New),
    ("null", TokenKind::Null),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("switch", TokenKind::Switch),
    ("this", TokenKind::This),
    ("throw", TokenKind::Throw),
    ("true", TokenKind::True),
    ("try", TokenKind::Try),
    ("typeof", TokenKind::Typeof),
    ("var", TokenKind::Var),
    ("void", TokenKind::Void),
    ("while", TokenKind::While),
    ("with", TokenKind::With),
    ("yield", TokenKind::Yield),
];

/// Reserved words that can only begin a statement.
const STATEMENT_WORDS: &[&str] = &[
    "break", "case", "catch", "const", "continue", "debugger", "default", "do", "else", "enum",
    "export", "finally", "for", "if", "return", "switch", "throw", "try", "var", "while", "with",
];

/// Punctuator spellings.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
    (".", TokenKind::Dot),
    ("...", TokenKind::Ellipsis),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    ("?", TokenKind::Question),
    ("?.", TokenKind::QuestionDot),
    ("=>", TokenKind::Arrow),
    ("<", TokenKind::LessThan),
    (">", TokenKind::GreaterThan),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("==", TokenKind::Equal),
    ("!=", TokenKind::NotEqual),
    ("===", TokenKind::StrictEqual),
    ("!==", TokenKind::StrictNotEqual),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("**", TokenKind::StarStar),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("<<", TokenKind::LeftShift),
    (">>", TokenKind::RightShift),
    (">>>", TokenKind::UnsignedRightShift),
    ("&", TokenKind::Ampersand),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("!", TokenKind::Bang),
    ("~", TokenKind::Tilde),
    ("&&", TokenKind::AmpersandAmpersand),
    ("||", TokenKind::PipePipe),
    ("??", TokenKind::QuestionQuestion),
    ("=", TokenKind::Assign),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("**=", TokenKind::StarStarAssign),
    ("<<=", TokenKind::LeftShiftAssign),
    (">>=", TokenKind::RightShiftAssign),
    (">>>=", TokenKind::UnsignedRightShiftAssign),
    ("&=", TokenKind::AmpersandAssign),
    ("|=", TokenKind::PipeAssign),
    ("^=", TokenKind::CaretAssign),
    ("&&=", TokenKind::AmpersandAmpersandAssign),
    ("||=", TokenKind::PipePipeAssign),
    ("??=", TokenKind::QuestionQuestionAssign),
];

fn spelling(table: &'static [(&'static str, TokenKind)], kind: &TokenKind) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, candidate)| candidate == kind)
        .map(|(text, _)| *text)
}

impl TokenKind {
    /// Source text of a reserved word token.
    pub fn reserved_word(&self) -> Option<&'static str> {
        spelling(RESERVED_WORDS, self)
    }

    /// Source text of a punctuator token.
    pub fn punctuator(&self) -> Option<&'static str> {
        spelling(PUNCTUATORS, self)
    }

    /// Longest punctuator at the start of `text`.
    pub fn longest_punctuator(text: &str) -> Option<(&'static str, TokenKind)> {
        PUNCTUATORS
            .iter()
            .filter(|(spelling, _)| text.starts_with(spelling))
            .max_by_key(|(spelling, _)| spelling.len())
            .map(|(spelling, kind)| (*spelling, kind.clone()))
    }

    /// Check if this token is a reserved word (usable as a property name).
    pub fn is_keyword(&self) -> bool {
        self.reserved_word().is_some()
    }

    /// Check if this token can only start a statement, never an expression.
    pub fn starts_statement(&self) -> bool {
        self.reserved_word()
            .is_some_and(|word| STATEMENT_WORDS.contains(&word))
    }

    /// Check if this is an assignment operator.
    pub fn is_assignment(&self) -> bool {
        self.punctuator().is_some_and(|text| {
            text.ends_with('=') && !matches!(text, "==" | "===" | "!=" | "!==" | "<=" | ">=")
        })
    }

    /// Look up a reserved word.
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        RESERVED_WORDS
            .iter()
            .find(|(word, _)| *word == s)
            .map(|(_, kind)| kind.clone())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::Template { .. } => f.write_str("template literal"),
            TokenKind::BigInt(digits) => write!(f, "{}n", digits),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::PrivateIdentifier(name) => write!(f, "#{}", name),
            TokenKind::Eof => f.write_str("end of input"),
            other => {
                let text = other
                    .reserved_word()
                    .or_else(|| other.punctuator())
                    .unwrap_or("?");
                write!(f, "'{}'", text)
            }
        }
    }
}

/// A token with source location.
#[derive(Debug, Clone)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    /// Check if this is EOF.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert_eq!(TokenKind::keyword_from_str("typeof"), Some(TokenKind::Typeof));
        assert_eq!(TokenKind::keyword_from_str("async"), None);
        assert_eq!(TokenKind::keyword_from_str("let"), None);
        assert!(TokenKind::Null.is_keyword());
        assert!(TokenKind::If.starts_statement());
        assert!(!TokenKind::Typeof.starts_statement());
    }

    #[test]
    fn test_assignment_operators() {
        assert!(TokenKind::Assign.is_assignment());
        assert!(TokenKind::QuestionQuestionAssign.is_assignment());
        assert!(!TokenKind::StrictEqual.is_assignment());
        assert!(!TokenKind::LessEqual.is_assignment());
        assert!(!TokenKind::Arrow.is_assignment());
    }

    #[test]
    fn test_display() {
        assert_eq!(alloc::format!("{}", TokenKind::RightParen), "')'");
        assert_eq!(alloc::format!("{}", TokenKind::Instanceof), "'instanceof'");
        assert_eq!(alloc::format!("{}", TokenKind::Eof), "end of input");
    }
}
