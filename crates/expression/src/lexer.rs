//! Tokenizer for condition strings.
//!
//! `{{path}}` placeholders are lexed as a single [`Token::Placeholder`] so the
//! data they resolve to is never re-read as source text.

use crate::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Placeholder(String),
    Str(String),
    Number(f64),
    True,
    False,
    Null,
    Undefined,
    /// Bare names other than the literal keywords; rejected by the parser.
    Ident(String),

    StrictEq, // ===
    StrictNe, // !==
    LooseEq,  // ==
    LooseNe,  // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    AndAnd,   // &&
    OrOr,     // ||
    Bang,     // !
    LParen,
    RParen,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ExprError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        // Longest operators first.
        let fixed = [
            ("{{", None),
            ("===", Some(Token::StrictEq)),
            ("!==", Some(Token::StrictNe)),
            ("==", Some(Token::LooseEq)),
            ("!=", Some(Token::LooseNe)),
            ("<=", Some(Token::Le)),
            (">=", Some(Token::Ge)),
            ("&&", Some(Token::AndAnd)),
            ("||", Some(Token::OrOr)),
            ("<", Some(Token::Lt)),
            (">", Some(Token::Gt)),
            ("!", Some(Token::Bang)),
            ("(", Some(Token::LParen)),
            (")", Some(Token::RParen)),
        ];
        for (text, token) in fixed {
            if self.eat(text) {
                return match token {
                    Some(token) => Ok(Some(token)),
                    None => self.placeholder(start).map(Some),
                };
            }
        }

        match c {
            '\'' | '"' => self.string(c, start).map(Some),
            '0'..='9' | '.' => self.number(start).map(Some),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(Some(self.word())),
            c => Err(ExprError::UnexpectedCharacter(c, start)),
        }
    }

    fn placeholder(&mut self, start: usize) -> Result<Token, ExprError> {
        let Some(end) = self.rest().find("}}") else {
            return Err(ExprError::UnterminatedPlaceholder(start));
        };
        let path = self.rest()[..end].trim().to_string();
        self.pos += end + 2;
        if path.is_empty() {
            return Err(ExprError::EmptyPlaceholder(start));
        }
        Ok(Token::Placeholder(path))
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Token, ExprError> {
        self.bump();
        let Some(len) = self.rest().find(quote) else {
            return Err(ExprError::UnterminatedString(start));
        };
        let value = self.rest()[..len].to_string();
        self.pos += len + quote.len_utf8();
        Ok(Token::Str(value))
    }

    fn number(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            self.bump();
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::InvalidNumber(text.to_string()))
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "undefined" => Token::Undefined,
            other => Token::Ident(other.to_string()),
        }
    }
}
