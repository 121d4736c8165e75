//! Tokens produced by the formula lexer.

use std::fmt;

/// Reserved words of the calculation language.
///
/// Keywords are matched case-insensitively and only as whole words, so
/// `[End Date]` or `ENDSWITH(` never produce [`Keyword::End`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Then,
    ElseIf,
    Else,
    End,
    Case,
    When,
    And,
    Or,
    Not,
    True,
    False,
    Null,
}

impl Keyword {
    /// All keywords, longest spelling first where prefixes overlap.
    pub const ALL: [Keyword; 13] = [
        Keyword::ElseIf,
        Keyword::If,
        Keyword::Then,
        Keyword::Else,
        Keyword::End,
        Keyword::Case,
        Keyword::When,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::True,
        Keyword::False,
        Keyword::Null,
    ];

    /// Canonical (upper-case) spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "IF",
            Keyword::Then => "THEN",
            Keyword::ElseIf => "ELSEIF",
            Keyword::Else => "ELSE",
            Keyword::End => "END",
            Keyword::Case => "CASE",
            Keyword::When => "WHEN",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Null => "NULL",
        }
    }

    /// Look up a keyword from source text, ignoring case.
    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL
            .into_iter()
            .find(|kw| kw.as_str().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator symbols recognised by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorSymbol {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    /// `<>` or `!=`
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl OperatorSymbol {
    /// Map operator source text to a symbol.
    pub fn from_text(text: &str) -> Option<OperatorSymbol> {
        Some(match text {
            "+" => OperatorSymbol::Plus,
            "-" => OperatorSymbol::Minus,
            "*" => OperatorSymbol::Star,
            "/" => OperatorSymbol::Slash,
            "%" => OperatorSymbol::Percent,
            "=" => OperatorSymbol::Eq,
            "<>" | "!=" => OperatorSymbol::NotEq,
            "<" => OperatorSymbol::Lt,
            ">" => OperatorSymbol::Gt,
            "<=" => OperatorSymbol::LtEq,
            ">=" => OperatorSymbol::GtEq,
            _ => return None,
        })
    }
}

/// The category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `[Field Name]`
    FieldRef,
    /// `"text"` or `'text'`
    String,
    /// `123` or `4.56`
    Number,
    /// Identifier immediately followed by `(`
    FunctionName,
    Keyword(Keyword),
    Operator(OperatorSymbol),
    LParen,
    RParen,
    Comma,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::FieldRef => write!(f, "field reference"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::FunctionName => write!(f, "function name"),
            TokenKind::Keyword(kw) => write!(f, "{}", kw),
            TokenKind::Operator(_) => write!(f, "operator"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of formula"),
        }
    }
}

/// A single lexical token.
///
/// `text` holds the token payload: the normalized field name for
/// [`TokenKind::FieldRef`], the unquoted contents for [`TokenKind::String`],
/// and the matched source text for everything else. `position` is the byte
/// offset of the token's first character in the formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// True if this token is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of formula".to_string(),
            TokenKind::FieldRef => format!("[{}]", self.text),
            TokenKind::String => format!("\"{}\"", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}
