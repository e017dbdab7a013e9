//! Boolean `if` expressions evaluated against an [`Environment`].
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr     := and ( ("||" | "or") and )*
//! and      := unary ( ("&&" | "and") unary )*
//! unary    := ("!" | "not") unary | compare
//! compare  := operand ( ("==" | "!=" | "in" | "not" "in") operand )?
//! operand  := STRING | IDENT | "true" | "false" | "[" list "]" | "(" expr ")"
//! ```
//!
//! Identifiers must name variables of the environment the expression is
//! compiled against. Evaluation has no side effects.

use crate::{Environment, Error, Result};
use std::iter::Peekable;
use std::str::CharIndices;

/// Evaluates `expression` against `env`.
///
/// An empty expression is true without being compiled.
pub fn evaluate(expression: &str, env: &Environment) -> Result<bool> {
    if expression.trim().is_empty() {
        return Ok(true);
    }
    Condition::compile(expression, env)?.evaluate(env)
}

/// A compiled condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parses `expression`, allowing only identifiers defined in `env`.
    pub fn compile(expression: &str, env: &Environment) -> Result<Self> {
        let fail = |reason: String| Error::Eval {
            expression: expression.to_string(),
            reason,
        };

        let tokens = Lexer::new(expression).tokenize().map_err(fail)?;
        let expr = Parser::new(tokens).parse().map_err(fail)?;

        if let Some(name) = expr.first_unknown(env) {
            return Err(fail(format!("unknown variable '{name}'")));
        }

        Ok(Self {
            source: expression.to_string(),
            expr,
        })
    }

    /// Evaluates the condition. Any non-boolean result is an error.
    pub fn evaluate(&self, env: &Environment) -> Result<bool> {
        let fail = |reason: String| Error::Eval {
            expression: self.source.clone(),
            reason,
        };

        match self.expr.eval(env).map_err(fail)? {
            Value::Bool(b) => Ok(b),
            other => Err(fail(format!(
                "expression yields {}, expected a boolean",
                other.type_name()
            ))),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// ============================================================================
// Values and AST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "a string",
            Self::Bool(_) => "a boolean",
            Self::List(_) => "a list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    fn first_unknown<'a>(&'a self, env: &Environment) -> Option<&'a str> {
        match self {
            Self::Literal(_) => None,
            Self::Var(name) => (!env.contains(name)).then_some(name.as_str()),
            Self::List(items) => items.iter().find_map(|e| e.first_unknown(env)),
            Self::Not(inner) => inner.first_unknown(env),
            Self::And(l, r) | Self::Or(l, r) | Self::Compare { left: l, right: r, .. } => {
                l.first_unknown(env).or_else(|| r.first_unknown(env))
            }
        }
    }

    fn eval(&self, env: &Environment) -> std::result::Result<Value, String> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Var(name) => env
                .get(name)
                .map(|v| Value::Str(v.to_string()))
                .ok_or_else(|| format!("unknown variable '{name}'")),
            Self::List(items) => items
                .iter()
                .map(|e| e.eval(env))
                .collect::<std::result::Result<_, _>>()
                .map(Value::List),
            Self::Not(inner) => Ok(Value::Bool(!inner.eval_bool(env, "not")?)),
            Self::And(l, r) => Ok(Value::Bool(
                l.eval_bool(env, "and")? && r.eval_bool(env, "and")?,
            )),
            Self::Or(l, r) => Ok(Value::Bool(
                l.eval_bool(env, "or")? || r.eval_bool(env, "or")?,
            )),
            Self::Compare { op, left, right } => {
                let l = left.eval(env)?;
                let r = right.eval(env)?;
                compare(*op, &l, &r).map(Value::Bool)
            }
        }
    }

    fn eval_bool(&self, env: &Environment, op: &str) -> std::result::Result<bool, String> {
        match self.eval(env)? {
            Value::Bool(b) => Ok(b),
            other => Err(format!(
                "operand of '{op}' is {}, expected a boolean",
                other.type_name()
            )),
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> std::result::Result<bool, String> {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            if std::mem::discriminant(left) != std::mem::discriminant(right) {
                return Err(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ));
            }
            let equal = left == right;
            Ok(if op == CompareOp::Eq { equal } else { !equal })
        }
        CompareOp::In | CompareOp::NotIn => {
            let found = match (left, right) {
                (_, Value::List(items)) => items.contains(left),
                (Value::Str(needle), Value::Str(haystack)) => haystack.contains(needle.as_str()),
                _ => {
                    return Err(format!(
                        "cannot test {} for membership in {}",
                        left.type_name(),
                        right.type_name()
                    ));
                }
            };
            Ok(if op == CompareOp::In { found } else { !found })
        }
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Eq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
        }
    }

    fn tokenize(mut self) -> std::result::Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token == Token::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> std::result::Result<Token, String> {
        while self.chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }

        let Some((pos, ch)) = self.chars.next() else {
            return Ok(Token::Eof);
        };

        match ch {
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.scan_word(ch)),
            '"' | '\'' => self.scan_string(ch, pos),
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '[' => Ok(Token::LBracket),
            ']' => Ok(Token::RBracket),
            ',' => Ok(Token::Comma),
            '=' if self.match_char('=') => Ok(Token::Eq),
            '!' if self.match_char('=') => Ok(Token::Ne),
            '!' => Ok(Token::Not),
            '&' if self.match_char('&') => Ok(Token::And),
            '|' if self.match_char('|') => Ok(Token::Or),
            _ => Err(format!("unexpected character '{ch}' at {}", pos + 1)),
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }

    fn scan_word(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        {
            word.push(c);
        }

        match word.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            _ => Token::Ident(word),
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> std::result::Result<Token, String> {
        let mut text = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(Token::Str(text)),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                c => text.push(c),
            }
        }
        Err(format!("unterminated string starting at {}", start + 1))
    }
}

// ============================================================================
// Parser
// ============================================================================

static EOF: Token = Token::Eof;

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse(mut self) -> std::result::Result<Expr, String> {
        let expr = self.parse_or()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            other => Err(format!("unexpected {other:?} after expression")),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&EOF)
    }

    fn peek_next(&self) -> &Token {
        self.tokens.get(self.position + 1).unwrap_or(&EOF)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::Eof {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> std::result::Result<(), String> {
        let found = self.advance();
        if &found == expected {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {found:?}"))
        }
    }

    fn parse_or(&mut self) -> std::result::Result<Expr, String> {
        let mut left = self.parse_and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> std::result::Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while *self.peek() == Token::And {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> std::result::Result<Expr, String> {
        if *self.peek() == Token::Not {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> std::result::Result<Expr, String> {
        let left = self.parse_operand()?;

        let op = match (self.peek(), self.peek_next()) {
            (Token::Eq, _) => CompareOp::Eq,
            (Token::Ne, _) => CompareOp::Ne,
            (Token::In, _) => CompareOp::In,
            (Token::Not, Token::In) => {
                self.advance();
                CompareOp::NotIn
            }
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> std::result::Result<Expr, String> {
        match self.advance() {
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if *self.peek() != Token::RBracket {
                    loop {
                        items.push(self.parse_operand()?);
                        if *self.peek() == Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::List(items))
            }
            Token::Eof => Err("unexpected end of expression".to_string()),
            other => Err(format!("unexpected {other:?}")),
        }
    }
}
