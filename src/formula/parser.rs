//! Recursive-descent parser with precedence climbing for binary operators.
//!
//! Binding power, loosest first:
//!
//! | bp | operators               |
//! |----|-------------------------|
//! | 1  | `OR`                    |
//! | 2  | `AND`                   |
//! | 3  | `= <> < > <= >=`        |
//! | 4  | `+ -`                   |
//! | 5  | `* / %`                 |
//!
//! Prefix `-` and `NOT` bind tighter than every binary operator. `IF`,
//! `CASE`, function calls, parenthesized groups, field references and
//! literals are primaries.
//!
//! Nesting is bounded by a depth guard so deeply nested input fails with
//! [`FormulaError::DepthLimitExceeded`] instead of overflowing the stack.

use super::ast::{ArithmeticOp, ComparisonOp, Literal, LogicalOp, Node, UnaryOp, WhenClause};
use super::error::{FormulaError, FormulaResult};
use super::token::{Keyword, OperatorSymbol, Token, TokenKind};

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Binding power used to parse a complete expression.
const LOWEST: u8 = 1;

/// A binary operator together with the node family it folds into.
#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Comparison(ComparisonOp),
    Logical(LogicalOp),
}

impl BinaryOp {
    fn binding_power(self) -> u8 {
        match self {
            BinaryOp::Logical(LogicalOp::Or) => 1,
            BinaryOp::Logical(LogicalOp::And) => 2,
            BinaryOp::Comparison(_) => 3,
            BinaryOp::Arithmetic(ArithmeticOp::Add | ArithmeticOp::Subtract) => 4,
            BinaryOp::Arithmetic(_) => 5,
        }
    }

    fn fold(self, left: Node, right: Node) -> Node {
        match self {
            BinaryOp::Arithmetic(op) => Node::arithmetic(left, op, right),
            BinaryOp::Comparison(op) => Node::comparison(left, op, right),
            BinaryOp::Logical(op) => Node::logical(left, op, right),
        }
    }

    fn from_token(token: &Token) -> Option<BinaryOp> {
        let op = match token.kind {
            TokenKind::Operator(symbol) => match symbol {
                OperatorSymbol::Plus => BinaryOp::Arithmetic(ArithmeticOp::Add),
                OperatorSymbol::Minus => BinaryOp::Arithmetic(ArithmeticOp::Subtract),
                OperatorSymbol::Star => BinaryOp::Arithmetic(ArithmeticOp::Multiply),
                OperatorSymbol::Slash => BinaryOp::Arithmetic(ArithmeticOp::Divide),
                OperatorSymbol::Percent => BinaryOp::Arithmetic(ArithmeticOp::Modulo),
                OperatorSymbol::Eq => BinaryOp::Comparison(ComparisonOp::Eq),
                OperatorSymbol::NotEq => BinaryOp::Comparison(ComparisonOp::NotEq),
                OperatorSymbol::Lt => BinaryOp::Comparison(ComparisonOp::Lt),
                OperatorSymbol::Gt => BinaryOp::Comparison(ComparisonOp::Gt),
                OperatorSymbol::LtEq => BinaryOp::Comparison(ComparisonOp::LtEq),
                OperatorSymbol::GtEq => BinaryOp::Comparison(ComparisonOp::GtEq),
            },
            TokenKind::Keyword(Keyword::And) => BinaryOp::Logical(LogicalOp::And),
            TokenKind::Keyword(Keyword::Or) => BinaryOp::Logical(LogicalOp::Or),
            _ => return None,
        };
        Some(op)
    }
}

/// Parse a token stream into a syntax tree using the default depth limit.
pub fn parse(tokens: Vec<Token>) -> FormulaResult<Node> {
    Parser::new(tokens).parse()
}

/// Formula parser.
///
/// Consumes the token vector produced by [`super::lexer::tokenize`]. A
/// parser is single-use: [`Parser::parse`] takes `self`.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.position + t.text.len());
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse the whole token stream as a single expression.
    pub fn parse(mut self) -> FormulaResult<Node> {
        if self.peek().kind == TokenKind::Eof {
            return Err(FormulaError::EmptyFormula);
        }

        let node = self.parse_expr(LOWEST)?;

        let trailing = self.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(FormulaError::UnexpectedToken {
                expected: "end of formula".to_string(),
                found: trailing.describe(),
                position: trailing.position,
            });
        }
        Ok(node)
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    fn peek(&self) -> &Token {
        // `new` guarantees a trailing EOF, which is never consumed.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> FormulaResult<()> {
        let token = self.peek().clone();
        if token.is_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(FormulaError::MissingKeyword {
                keyword: keyword.as_str(),
                found: token.describe(),
                position: token.position,
            })
        }
    }

    /// Run `f` one nesting level deeper, failing once the limit is passed.
    fn nested<F>(&mut self, f: F) -> FormulaResult<Node>
    where
        F: FnOnce(&mut Self) -> FormulaResult<Node>,
    {
        self.depth += 1;
        let result = if self.depth > self.max_depth {
            Err(FormulaError::DepthLimitExceeded {
                limit: self.max_depth,
                position: self.peek().position,
            })
        } else {
            f(self)
        };
        self.depth -= 1;
        result
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self, min_bp: u8) -> FormulaResult<Node> {
        let mut left = self.parse_unary()?;
        let mut left_depth = None;

        while let Some(op) = BinaryOp::from_token(self.peek()) {
            let bp = op.binding_power();
            if bp < min_bp {
                break;
            }
            let position = self.advance().position;
            let right = self.parse_expr(bp + 1)?;

            // Folding grows the tree without recursing, so the guard in
            // `nested` never sees a flat chain like `a + b + c + ...`.
            let depth = left_depth.unwrap_or_else(|| left.depth()).max(right.depth()) + 1;
            if self.depth + depth > self.max_depth {
                return Err(FormulaError::DepthLimitExceeded {
                    limit: self.max_depth,
                    position,
                });
            }
            left_depth = Some(depth);
            left = op.fold(left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Node> {
        self.nested(|p| {
            let operator = match p.peek().kind {
                TokenKind::Operator(OperatorSymbol::Minus) => UnaryOp::Negate,
                TokenKind::Keyword(Keyword::Not) => UnaryOp::Not,
                _ => return p.parse_primary(),
            };
            p.advance();
            let operand = p.parse_unary()?;
            Ok(Node::unary(operator, operand))
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<Node> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::FieldRef => {
                self.advance();
                Ok(Node::field(token.text))
            }
            TokenKind::String => {
                self.advance();
                Ok(Node::string(token.text))
            }
            TokenKind::Number => {
                self.advance();
                parse_number(&token).map(Node::literal)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Node::boolean(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Node::boolean(false))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Node::null())
            }
            TokenKind::Keyword(Keyword::If) => self.parse_conditional(),
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::FunctionName => self.parse_function_call(),
            TokenKind::LParen => self.parse_group(),
            _ => Err(FormulaError::UnexpectedToken {
                expected: "expression".to_string(),
                found: token.describe(),
                position: token.position,
            }),
        }
    }

    fn parse_group(&mut self) -> FormulaResult<Node> {
        let open = self.advance();
        let inner = self.parse_expr(LOWEST)?;
        self.expect_close(open.position)?;
        Ok(inner)
    }

    /// Consume the `)` matching the `(` at `open_position`.
    fn expect_close(&mut self, open_position: usize) -> FormulaResult<()> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::RParen => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Err(FormulaError::UnbalancedParens {
                position: open_position,
            }),
            _ => Err(FormulaError::UnexpectedToken {
                expected: "')'".to_string(),
                found: token.describe(),
                position: token.position,
            }),
        }
    }

    // =========================================================================
    // IF / ELSEIF
    // =========================================================================

    fn parse_conditional(&mut self) -> FormulaResult<Node> {
        self.advance(); // IF
        let node = self.parse_conditional_arms()?;
        self.expect_keyword(Keyword::End)?;
        Ok(node)
    }

    /// `cond THEN expr (ELSEIF ... | ELSE expr)`, without the closing END.
    ///
    /// Each `ELSEIF` becomes a nested conditional in the else branch.
    fn parse_conditional_arms(&mut self) -> FormulaResult<Node> {
        let condition = self.parse_expr(LOWEST)?;
        self.expect_keyword(Keyword::Then)?;
        let then_branch = self.parse_expr(LOWEST)?;

        let else_branch = if self.peek().is_keyword(Keyword::ElseIf) {
            self.advance();
            self.nested(|p| p.parse_conditional_arms())?
        } else {
            self.expect_keyword(Keyword::Else)?;
            self.parse_expr(LOWEST)?
        };

        Ok(Node::conditional(condition, then_branch, else_branch))
    }

    // =========================================================================
    // CASE
    // =========================================================================

    fn parse_case(&mut self) -> FormulaResult<Node> {
        self.advance(); // CASE

        let case_expression = if self.peek().is_keyword(Keyword::When) {
            None
        } else {
            Some(self.parse_expr(LOWEST)?)
        };

        let mut when_clauses = Vec::new();
        while self.peek().is_keyword(Keyword::When) {
            self.advance();
            let condition = self.parse_expr(LOWEST)?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr(LOWEST)?;
            when_clauses.push(WhenClause::new(condition, result));
        }

        if when_clauses.is_empty() {
            let token = self.peek();
            return Err(FormulaError::MissingKeyword {
                keyword: Keyword::When.as_str(),
                found: token.describe(),
                position: token.position,
            });
        }

        let else_branch = if self.peek().is_keyword(Keyword::Else) {
            self.advance();
            Some(self.parse_expr(LOWEST)?)
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(match case_expression {
            Some(expr) => Node::simple_case(expr, when_clauses, else_branch),
            None => Node::searched_case(when_clauses, else_branch),
        })
    }

    // =========================================================================
    // Function calls
    // =========================================================================

    fn parse_function_call(&mut self) -> FormulaResult<Node> {
        let name = self.advance().text.to_uppercase();
        let open = self.advance(); // LPAREN emitted by the lexer

        let mut arguments = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(Node::function(name, arguments));
        }

        loop {
            let token = self.peek();
            if matches!(token.kind, TokenKind::Comma | TokenKind::RParen) {
                return Err(FormulaError::EmptyArgument {
                    function: name,
                    position: token.position,
                });
            }

            arguments.push(self.parse_expr(LOWEST)?);

            if self.peek().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            self.expect_close(open.position)?;
            break;
        }

        Ok(Node::function(name, arguments))
    }
}

fn parse_number(token: &Token) -> FormulaResult<Literal> {
    let text = token.text.as_str();
    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            if n.to_string() == text {
                return Ok(Literal::Integer(n));
            }
        }
    } else if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() && ryu::Buffer::new().format_finite(f) == text {
            return Ok(Literal::Real(f));
        }
    }

    // Leading zeros, trailing zeros, more digits than i64/f64 hold.
    if text.chars().all(|c| c.is_ascii_digit() || c == '.') && !text.is_empty() {
        Ok(Literal::Decimal(text.to_string()))
    } else {
        Err(FormulaError::UnexpectedToken {
            expected: "number".to_string(),
            found: token.describe(),
            position: token.position,
        })
    }
}
