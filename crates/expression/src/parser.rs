//! Recursive-descent parser for conditions.
//!
//! Precedence, loosest first: `||`, `&&`, equality (`=== !== == !=`),
//! relational (`< <= > >=`), unary `!`, then literals, placeholders and
//! parenthesised groups. Binary operators are left-associative.
//!
//! Nesting is capped at [`MAX_DEPTH`] twice over: open parentheses and `!`
//! bound the parser's own recursion, and the height of the built tree bounds
//! what evaluation and drop walk recursively.

use crate::{
    ast::{BinaryOp, Expr},
    lexer::Token,
    value::Value,
    ExprError,
};

pub const MAX_DEPTH: usize = 128;

/// A parsed subtree with its height, so no tree deeper than [`MAX_DEPTH`]
/// is ever built.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn checked(expr: Expr, height: usize) -> Result<Self, ExprError> {
        if height > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(Self { expr, height })
    }

    fn wrap(self, build: impl FnOnce(Expr) -> Expr) -> Result<Self, ExprError> {
        Self::checked(build(self.expr), self.height + 1)
    }

    fn join(
        lhs: Node,
        rhs: Node,
        build: impl FnOnce(Box<Expr>, Box<Expr>) -> Expr,
    ) -> Result<Self, ExprError> {
        let height = lhs.height.max(rhs.height) + 1;
        Self::checked(build(Box::new(lhs.expr), Box::new(rhs.expr)), height)
    }

    fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Result<Self, ExprError> {
        Self::join(lhs, rhs, |lhs, rhs| Expr::Binary { op, lhs, rhs })
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::UnexpectedEnd);
        }
        let node = self.parse_or()?;
        match self.tokens.get(self.pos) {
            None => Ok(node.expr),
            Some(token) => Err(ExprError::UnexpectedToken(format!("{token:?}"))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        while self.match_token(&Token::OrOr) {
            let rhs = self.parse_and()?;
            node = Node::join(node, rhs, Expr::Or)?;
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_equality()?;
        while self.match_token(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            node = Node::join(node, rhs, Expr::And)?;
        }
        Ok(node)
    }

    fn parse_equality(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::StrictEq) => BinaryOp::StrictEq,
                Some(Token::StrictNe) => BinaryOp::StrictNe,
                Some(Token::LooseEq) => BinaryOp::LooseEq,
                Some(Token::LooseNe) => BinaryOp::LooseNe,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.parse_relational()?;
            node = Node::binary(op, node, rhs)?;
        }
    }

    fn parse_relational(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            node = Node::binary(op, node, rhs)?;
        }
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        if self.match_token(&Token::Bang) {
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return inner.wrap(|expr| Expr::Not(Box::new(expr)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token {
            Token::LParen => {
                self.descend()?;
                let node = self.parse_or()?;
                if !self.match_token(&Token::RParen) {
                    return Err(ExprError::UnclosedParen);
                }
                self.depth -= 1;
                Ok(node)
            }
            Token::Placeholder(path) => Ok(Node::leaf(Expr::Path(path))),
            Token::Str(s) => Ok(Node::leaf(Expr::Literal(Value::Str(s)))),
            Token::Number(n) => Ok(Node::leaf(Expr::Literal(Value::Number(n)))),
            Token::True => Ok(Node::leaf(Expr::Literal(Value::Bool(true)))),
            Token::False => Ok(Node::leaf(Expr::Literal(Value::Bool(false)))),
            Token::Null => Ok(Node::leaf(Expr::Literal(Value::Null))),
            Token::Undefined => Ok(Node::leaf(Expr::Literal(Value::Undefined))),
            Token::Ident(name) => Err(ExprError::UnknownIdentifier(name)),
            other => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}
