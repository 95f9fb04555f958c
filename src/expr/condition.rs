//! Conditional expressions.
//!
//! Conditions select among alternative blocks of a description unit, e.g.
//! `OS == "win" and target_arch in ["x64", "arm64"]`. The grammar is a
//! small Python-like subset:
//!
//! ```text
//! expr    := or
//! or      := and (("or" | "||") and)*
//! and     := not (("and" | "&&") not)*
//! not     := ("not" | "!") not | cmp
//! cmp     := primary (("==" | "!=" | "in" | "not" "in") primary)?
//! primary := STRING | NUMBER | "true" | "false" | IDENT | "$(" ... ")"
//!          | "[" (primary ("," primary)*)? "]" | "(" expr ")"
//! ```
//!
//! Bare identifiers are variable lookups. Quoted strings containing `$(`
//! are templates and expand against the scope like any unit string.

use crate::core::scope::Lookup;
use crate::core::value::Value;
use crate::expr::expand::expand_str;
use crate::expr::ExprError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(String),
    Ident(String),
    Template(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    EqEq,
    NotEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::EqEq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '"' | '\'' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ExprError::syntax(src, "unterminated string")),
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                s.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '$' if chars.get(i + 1) == Some(&'(') => {
                let start = i;
                let mut depth = 0usize;
                loop {
                    match chars.get(i) {
                        None => return Err(ExprError::syntax(src, "unterminated `$(`")),
                        Some('(') => depth += 1,
                        Some(')') => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                tokens.push(Token::Template(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while chars.get(i).is_some_and(|d| d.is_ascii_alphanumeric() || *d == '.') {
                    i += 1;
                }
                tokens.push(Token::Num(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|d| d.is_alphanumeric() || *d == '_')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(ExprError::syntax(
                    src,
                    format!("unexpected character `{}`", other),
                ))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum CmpOp {
    Eq,
    NotEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Template(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token, what: &str) -> Result<(), ExprError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(ExprError::syntax(self.src, format!("expected {}", what)))
        }
    }

    fn parse(mut self) -> Result<Expr, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::syntax(self.src, "empty condition"));
        }
        let expr = self.or()?;
        if self.pos < self.tokens.len() {
            return Err(ExprError::syntax(self.src, "trailing tokens"));
        }
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Or) {
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.not()?;
        while self.eat(&Token::And) {
            let rhs = self.not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.cmp()
    }

    fn cmp(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.primary()?;
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::EqEq), _) => Some((CmpOp::Eq, 1)),
            (Some(Token::NotEq), _) => Some((CmpOp::NotEq, 1)),
            (Some(Token::In), _) => Some((CmpOp::In, 1)),
            (Some(Token::Not), Some(Token::In)) => Some((CmpOp::NotIn, 2)),
            _ => None,
        };
        match op {
            Some((op, width)) => {
                self.pos += width;
                let rhs = self.primary()?;
                Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Str(s)) if s.contains("$(") => Ok(Expr::Template(s)),
            Some(Token::Str(s)) | Some(Token::Num(s)) => Ok(Expr::Literal(Value::Scalar(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::Template(raw)) => Ok(Expr::Template(raw)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.primary()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(&Token::Comma, "`,` or `]`")?;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(tok) => Err(ExprError::syntax(
                self.src,
                format!("unexpected token {:?}", tok),
            )),
            None => Err(ExprError::syntax(self.src, "unexpected end of condition")),
        }
    }
}

/// A parsed condition, ready to evaluate against any scope.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse a condition expression.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(src)?;
        let expr = Parser {
            src,
            tokens,
            pos: 0,
        }
        .parse()?;
        Ok(Condition {
            source: src.to_string(),
            expr,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a scope.
    pub fn evaluate(&self, scope: &impl Lookup) -> Result<bool, ExprError> {
        Ok(eval(&self.expr, scope)?.is_truthy())
    }
}

/// Parse and evaluate a condition in one step.
pub fn evaluate(src: &str, scope: &impl Lookup) -> Result<bool, ExprError> {
    Condition::parse(src)?.evaluate(scope)
}

fn eval(expr: &Expr, scope: &impl Lookup) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| ExprError::UnresolvedVariable { name: name.clone() }),
        Expr::Template(raw) => expand_str(raw, scope),
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|e| eval(e, scope))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, scope)?.is_truthy())),
        Expr::And(lhs, rhs) => {
            if !eval(lhs, scope)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, scope)?.is_truthy()))
        }
        Expr::Or(lhs, rhs) => {
            if eval(lhs, scope)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, scope)?.is_truthy()))
        }
        Expr::Cmp(op, lhs, rhs) => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            let result = match op {
                CmpOp::Eq => values_equal(&lhs, &rhs),
                CmpOp::NotEq => !values_equal(&lhs, &rhs),
                CmpOp::In => contains(&rhs, &lhs),
                CmpOp::NotIn => !contains(&rhs, &lhs),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn bool_spelling(s: &str) -> Option<bool> {
    match s {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" | "" => Some(false),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), Value::Scalar(s)) | (Value::Scalar(s), Value::Bool(x)) => {
            bool_spelling(s) == Some(*x)
        }
        (Value::List(_), Value::List(_)) => a.flatten() == b.flatten(),
        _ => a.to_scalar_string() == b.to_scalar_string(),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::List(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::Scalar(s) => s.contains(&needle.to_scalar_string()),
        Value::Bool(_) => false,
    }
}
