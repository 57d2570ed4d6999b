//! Condition expressions in the ORM query syntax.
//!
//! Fields are referenced as `{name}`, positional parameters as `%1%`, `%2%`
//! and named parameters as `%name%`. Supported operators are `=`, `!=`,
//! `<>`, `<`, `<=`, `>`, `>=`, `LIKE`, `NOT LIKE`, `IS NULL` and
//! `IS NOT NULL`, combined with `AND`, `OR` and parentheses.
//!
//! ```text
//! {title} LIKE %1% OR {teaser} LIKE %1%
//! ({published} = 1 AND {vocabulary} = %vocabulary%) OR {id} = 3
//! ```

use crate::core::{OrmError, Result, Value};
use crate::expression::pattern::eval_like;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Something conditions can read field values from.
pub trait ValueSource {
    /// Scalar value of a field, `None` when the field is unknown.
    fn value_of(&self, field: &str) -> Option<Value>;
}

impl ValueSource for BTreeMap<String, Value> {
    fn value_of(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Parameter(usize),
    Named(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        left: Operand,
        operator: Operator,
        right: Operand,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

/// Values for the placeholders of a condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            named: BTreeMap::new(),
        }
    }

    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    fn get_positional(&self, index: usize) -> Result<&Value> {
        index
            .checked_sub(1)
            .and_then(|i| self.positional.get(i))
            .ok_or_else(|| OrmError::ExecutionError(format!("Parameter %{}% is not bound", index)))
    }

    fn get_named(&self, name: &str) -> Result<&Value> {
        self.named
            .get(name)
            .ok_or_else(|| OrmError::ExecutionError(format!("Parameter %{}% is not bound", name)))
    }
}

impl Condition {
    pub fn parse(expression: &str) -> Result<Self> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser { tokens, position: 0 };
        let condition = parser.parse_or()?;

        if let Some(token) = parser.peek() {
            return Err(OrmError::ParseError(format!(
                "Unexpected {:?} in condition '{}'",
                token, expression
            )));
        }

        Ok(condition)
    }

    /// Builds `{a} LIKE %1% OR {b} LIKE %1% ...` over the provided fields.
    pub fn like_any<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        let mut conditions: Vec<Condition> = fields
            .iter()
            .map(|field| Condition::Compare {
                left: Operand::Field(field.as_ref().to_string()),
                operator: Operator::Like,
                right: Operand::Parameter(1),
            })
            .collect();

        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::Or(conditions)),
        }
    }

    /// Names of all the fields referenced by this condition.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        let mut push = |operand: &'a Operand| {
            if let Operand::Field(name) = operand
                && !fields.contains(&name.as_str())
            {
                fields.push(name.as_str());
            }
        };

        match self {
            Self::Compare { left, right, .. } => {
                push(left);
                push(right);
            }
            Self::IsNull { operand, .. } => push(operand),
            Self::And(conditions) | Self::Or(conditions) => {
                for condition in conditions {
                    condition.collect_fields(fields);
                }
            }
        }
    }

    pub fn evaluate(&self, source: &dyn ValueSource, parameters: &Parameters) -> Result<bool> {
        match self {
            Self::Compare {
                left,
                operator,
                right,
            } => {
                let left = resolve(left, source, parameters)?;
                let right = resolve(right, source, parameters)?;

                compare(&left, *operator, &right)
            }
            Self::IsNull { operand, negated } => {
                let value = resolve(operand, source, parameters)?;

                Ok(value.is_null() != *negated)
            }
            Self::And(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(source, parameters)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            Self::Or(conditions) => {
                for condition in conditions {
                    if condition.evaluate(source, parameters)? {
                        return Ok(true);
                    }
                }

                Ok(false)
            }
        }
    }
}

fn resolve(operand: &Operand, source: &dyn ValueSource, parameters: &Parameters) -> Result<Value> {
    match operand {
        Operand::Field(name) => Ok(source.value_of(name).unwrap_or(Value::Null)),
        Operand::Parameter(index) => parameters.get_positional(*index).cloned(),
        Operand::Named(name) => parameters.get_named(name).cloned(),
        Operand::Literal(value) => Ok(value.clone()),
    }
}

fn compare(left: &Value, operator: Operator, right: &Value) -> Result<bool> {
    // comparisons against NULL never match
    if left.is_null() || right.is_null() {
        return Ok(false);
    }

    match operator {
        Operator::Like => eval_like(&left.to_string(), &right.to_string(), false),
        Operator::NotLike => Ok(!eval_like(&left.to_string(), &right.to_string(), false)?),
        _ => {
            let Some(ordering) = coerced_ordering(left, right) else {
                return Ok(operator == Operator::NotEq);
            };

            Ok(match operator {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::NotEq => ordering != Ordering::Equal,
                Operator::Lt => ordering == Ordering::Less,
                Operator::LtEq => ordering != Ordering::Greater,
                Operator::Gt => ordering == Ordering::Greater,
                Operator::GtEq => ordering != Ordering::Less,
                Operator::Like | Operator::NotLike => unreachable!("handled above"),
            })
        }
    }
}

/// Orders two values, coercing text and booleans to numbers when the other
/// side is numeric.
fn coerced_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    if let Ok(ordering) = left.compare(right) {
        return Some(ordering);
    }

    let numeric = |value: &Value| match value {
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    };

    let (a, b) = (numeric(left)?, numeric(right)?);

    Value::Float(a).compare(&Value::Float(b)).ok()
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{{{}}}", name),
            Self::Parameter(index) => write!(f, "%{}%", index),
            Self::Named(name) => write!(f, "%{}%", name),
            Self::Literal(Value::Null) => write!(f, "NULL"),
            Self::Literal(Value::Text(text)) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Literal(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator.as_str(), right),
            Self::IsNull { operand, negated } => {
                write!(f, "{} IS {}NULL", operand, if *negated { "NOT " } else { "" })
            }
            Self::And(conditions) => write_joined(f, conditions, " AND "),
            Self::Or(conditions) => write_joined(f, conditions, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, conditions: &[Condition], separator: &str) -> fmt::Result {
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }

        match condition {
            Condition::And(_) | Condition::Or(_) => write!(f, "({})", condition)?,
            _ => write!(f, "{}", condition)?,
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Parameter(usize),
    Named(String),
    Text(String),
    Number(Value),
    Word(String),
    Operator(&'static str),
    OpenParen,
    CloseParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let unterminated = |what: &str| {
        OrmError::ParseError(format!("Unterminated {} in condition '{}'", what, expression))
    };

    while i < chars.len() {
        let c = chars[i];

        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::OpenParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen);
                i += 1;
            }
            '{' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|c| *c == '}')
                    .ok_or_else(|| unterminated("field reference"))?;
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                tokens.push(Token::Field(name.trim().to_string()));
                i += end + 2;
            }
            '%' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|c| *c == '%')
                    .ok_or_else(|| unterminated("parameter"))?;
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                match name.parse::<usize>() {
                    Ok(index) => tokens.push(Token::Parameter(index)),
                    Err(_) => tokens.push(Token::Named(name)),
                }
                i += end + 2;
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;

                loop {
                    match chars.get(i) {
                        None => return Err(unterminated("string")),
                        Some(ch) if *ch == quote => {
                            if chars.get(i + 1) == Some(&quote) {
                                text.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }

                tokens.push(Token::Text(text));
            }
            '=' => {
                tokens.push(Token::Operator("="));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Operator("<>"));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Operator("<="));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Operator("<>"));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Operator("<"));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Operator(">="));
                    i += 2;
                } else {
                    tokens.push(Token::Operator(">"));
                    i += 1;
                }
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }

                let literal: String = chars[start..i].iter().collect();
                let value = if literal.contains('.') {
                    literal.parse::<f64>().map(Value::Float)
                        .map_err(|e| OrmError::ParseError(format!("Invalid number '{}': {}", literal, e)))?
                } else {
                    literal.parse::<i64>().map(Value::Integer)
                        .map_err(|e| OrmError::ParseError(format!("Invalid number '{}': {}", literal, e)))?
                };

                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }

                let word: String = chars[start..i].iter().collect();
                tokens.push(Token::Word(word.to_ascii_uppercase()));
            }
            other => {
                return Err(OrmError::ParseError(format!(
                    "Unexpected character '{}' in condition '{}'",
                    other, expression
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        match self.next() {
            Some(Token::Word(w)) if w == word => Ok(()),
            other => Err(OrmError::ParseError(format!("Expected {}, got {:?}", word, other))),
        }
    }

    fn parse_or(&mut self) -> Result<Condition> {
        let mut conditions = vec![self.parse_and()?];

        while self.is_word("OR") {
            self.position += 1;
            conditions.push(self.parse_and()?);
        }

        Ok(if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Condition::Or(conditions)
        })
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let mut conditions = vec![self.parse_primary()?];

        while self.is_word("AND") {
            self.position += 1;
            conditions.push(self.parse_primary()?);
        }

        Ok(if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Condition::And(conditions)
        })
    }

    fn parse_primary(&mut self) -> Result<Condition> {
        if self.peek() == Some(&Token::OpenParen) {
            self.position += 1;
            let condition = self.parse_or()?;

            return match self.next() {
                Some(Token::CloseParen) => Ok(condition),
                other => Err(OrmError::ParseError(format!("Expected ')', got {:?}", other))),
            };
        }

        let left = self.parse_operand()?;

        if self.is_word("IS") {
            self.position += 1;
            let negated = self.is_word("NOT");
            if negated {
                self.position += 1;
            }
            self.expect_word("NULL")?;

            return Ok(Condition::IsNull {
                operand: left,
                negated,
            });
        }

        let operator = match self.next() {
            Some(Token::Operator(op)) => match op {
                "=" => Operator::Eq,
                "<>" => Operator::NotEq,
                "<" => Operator::Lt,
                "<=" => Operator::LtEq,
                ">" => Operator::Gt,
                _ => Operator::GtEq,
            },
            Some(Token::Word(w)) if w == "LIKE" => Operator::Like,
            Some(Token::Word(w)) if w == "NOT" => {
                self.expect_word("LIKE")?;
                Operator::NotLike
            }
            other => {
                return Err(OrmError::ParseError(format!(
                    "Expected comparison operator, got {:?}",
                    other
                )));
            }
        };

        let right = self.parse_operand()?;

        Ok(Condition::Compare {
            left,
            operator,
            right,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Field(name)) => Ok(Operand::Field(name)),
            Some(Token::Parameter(index)) => Ok(Operand::Parameter(index)),
            Some(Token::Named(name)) => Ok(Operand::Named(name)),
            Some(Token::Text(text)) => Ok(Operand::Literal(Value::Text(text))),
            Some(Token::Number(value)) => Ok(Operand::Literal(value)),
            Some(Token::Word(w)) if w == "NULL" => Ok(Operand::Literal(Value::Null)),
            Some(Token::Word(w)) if w == "TRUE" => Ok(Operand::Literal(Value::Boolean(true))),
            Some(Token::Word(w)) if w == "FALSE" => Ok(Operand::Literal(Value::Boolean(false))),
            other => Err(OrmError::ParseError(format!("Expected operand, got {:?}", other))),
        }
    }
}
