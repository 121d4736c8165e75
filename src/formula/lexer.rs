//! Lexer for Tableau calculation formulas.
//!
//! Tokenization is pattern based and order dependent: at each scan position
//! the patterns in [`PATTERNS`] are tried in order and the first match wins.
//! The order matters:
//!
//! - field references come before numbers so `[budget123]` stays one token
//! - keywords come before function names so `IF(` is never a function
//! - two-character operators come before single-character ones so `<=` is
//!   not split into `<` and `=`

use std::sync::LazyLock;

use regex::Regex;

use super::error::{FormulaError, FormulaResult};
use super::token::{Keyword, OperatorSymbol, Token, TokenKind};

/// What a pattern produces when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Whitespace,
    FieldRef,
    String,
    Keyword,
    FunctionName,
    Number,
    Operator,
    Punctuation,
}

static PATTERNS: LazyLock<Vec<(PatternKind, Regex)>> = LazyLock::new(|| {
    [
        (PatternKind::Whitespace, r"^\s+"),
        (PatternKind::FieldRef, r"^\[([^\]]+)\]"),
        (PatternKind::String, r#"^"([^"]*)""#),
        (PatternKind::String, r"^'([^']*)'"),
        (
            PatternKind::Keyword,
            r"^(?i:ELSEIF|IF|THEN|ELSE|END|CASE|WHEN|AND|OR|NOT|TRUE|FALSE|NULL)\b",
        ),
        (PatternKind::FunctionName, r"^([A-Za-z][A-Za-z0-9_]*)\("),
        (PatternKind::Number, r"^\d+(\.\d+)?"),
        (PatternKind::Operator, r"^(<=|>=|<>|!=)"),
        (PatternKind::Operator, r"^[-+*/%=<>]"),
        (PatternKind::Punctuation, r"^[(),]"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]+").unwrap());
static REPEATED_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Normalize a bracketed field name into a LookML column name.
///
/// `Order Date` becomes `order_date`; punctuation runs collapse into a single
/// underscore and leading/trailing underscores are trimmed.
pub fn normalize_field_name(raw: &str) -> String {
    let replaced = NON_WORD.replace_all(raw.trim(), "_");
    let collapsed = REPEATED_UNDERSCORE.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_lowercase()
}

/// Convert a formula into tokens, terminated by a single [`TokenKind::Eof`].
pub fn tokenize(formula: &str) -> FormulaResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut position = 0;

    'scan: while position < formula.len() {
        let rest = &formula[position..];

        for (kind, regex) in PATTERNS.iter() {
            let Some(captures) = regex.captures(rest) else {
                continue;
            };
            let matched = captures.get(0).map_or("", |m| m.as_str());
            let group = captures.get(1).map_or("", |m| m.as_str());

            match kind {
                PatternKind::Whitespace => {}
                PatternKind::FieldRef => {
                    let name = normalize_field_name(group);
                    if name.is_empty() {
                        return Err(FormulaError::EmptyFieldName { position });
                    }
                    tokens.push(Token::new(TokenKind::FieldRef, name, position));
                }
                PatternKind::String => {
                    tokens.push(Token::new(TokenKind::String, group, position));
                }
                PatternKind::Keyword => match Keyword::from_word(matched) {
                    Some(keyword) => {
                        tokens.push(Token::new(TokenKind::Keyword(keyword), matched, position))
                    }
                    None => continue,
                },
                PatternKind::FunctionName => {
                    tokens.push(Token::new(TokenKind::FunctionName, group, position));
                    tokens.push(Token::new(TokenKind::LParen, "(", position + group.len()));
                }
                PatternKind::Number => {
                    tokens.push(Token::new(TokenKind::Number, matched, position));
                }
                PatternKind::Operator => match OperatorSymbol::from_text(matched) {
                    Some(symbol) => {
                        tokens.push(Token::new(TokenKind::Operator(symbol), matched, position))
                    }
                    None => continue,
                },
                PatternKind::Punctuation => {
                    let kind = match matched {
                        "(" => TokenKind::LParen,
                        ")" => TokenKind::RParen,
                        _ => TokenKind::Comma,
                    };
                    tokens.push(Token::new(kind, matched, position));
                }
            }

            position += matched.len();
            continue 'scan;
        }

        let character = rest.chars().next().unwrap_or_default();
        return Err(FormulaError::Tokenize {
            character,
            position,
        });
    }

    tokens.push(Token::new(TokenKind::Eof, "", formula.len()));
    Ok(tokens)
}
