//! Restricted predicate language for rule conditions.
//!
//! Conditions are parsed once, when the rule set loads, into an [`Expr`] tree over the closed
//! [`Field`] vocabulary. Evaluation is a pure interpreter over a read-only [`FieldView`]: there is
//! no name lookup outside the vocabulary and nothing a condition can call. A condition that does
//! not parse is kept with its error and fails each evaluation, so one bad rule never takes the
//! rest of a rule file down with it.
//!
//! Supported syntax: numbers (`1_000`, `2.5e3`), quoted strings, `True`/`False`, field names,
//! `+ - * / // % **`, unary minus, chained comparisons (`0.3 < debt_to_income <= 0.5`), `in` /
//! `not in` against a list or tuple literal (or substring tests on text), `and`, `or`, `not`, and
//! parentheses. `+` joins text and `*` repeats it by a whole number.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decisioning::domain::{ApplicationRecord, Field, FieldKind, FieldValue};

/// Rule condition that keeps its source text for display and heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Condition {
    source: String,
    compiled: Compiled,
}

#[derive(Debug, Clone, PartialEq)]
enum Compiled {
    Parsed(Expr),
    Unparseable(ConditionError),
}

impl Condition {
    /// Strict parse for conditions written in code, where a typo should fail loudly.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let expr = compile(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            compiled: Compiled::Parsed(expr),
        })
    }

    /// Parse conditions read from rule files. A parse failure is stored and reported by
    /// [`Condition::evaluate`] instead of being returned here.
    pub fn load(source: &str) -> Self {
        let compiled = match compile(source) {
            Ok(expr) => Compiled::Parsed(expr),
            Err(err) => Compiled::Unparseable(err),
        };
        Self {
            source: source.trim().to_string(),
            compiled,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Option<&Expr> {
        match &self.compiled {
            Compiled::Parsed(expr) => Some(expr),
            Compiled::Unparseable(_) => None,
        }
    }

    pub fn parse_error(&self) -> Option<&ConditionError> {
        match &self.compiled {
            Compiled::Parsed(_) => None,
            Compiled::Unparseable(err) => Some(err),
        }
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.source.contains(needle)
    }

    pub fn evaluate(&self, record: &ApplicationRecord) -> Result<bool, EvalError> {
        match &self.compiled {
            Compiled::Parsed(expr) => Ok(expr.eval(&FieldView::new(record))?.truthy()),
            Compiled::Unparseable(err) => Err(EvalError::Unparseable(err.clone())),
        }
    }
}

fn compile(source: &str) -> Result<Expr, ConditionError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ConditionError::Empty);
    }

    let mut parser = Parser { tokens, cursor: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        Some(token) => Err(ConditionError::UnexpectedToken {
            found: token.to_string(),
        }),
        None => Ok(expr),
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Condition::load(&value)
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.source
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Read-only projection of an application onto the rule-visible vocabulary.
///
/// Absent fields resolve to `0` or `""` depending on the field kind.
pub struct FieldView<'a> {
    record: &'a ApplicationRecord,
}

impl<'a> FieldView<'a> {
    pub fn new(record: &'a ApplicationRecord) -> Self {
        Self { record }
    }

    pub fn value(&self, field: Field) -> Value {
        match self.record.get(field) {
            Some(FieldValue::Number(number)) => Value::Number(*number),
            Some(FieldValue::Text(text)) => Value::Text(text.clone()),
            None => match field.kind() {
                FieldKind::Numeric => Value::Number(0.0),
                FieldKind::Categorical => Value::Text(String::new()),
            },
        }
    }
}

/// Runtime value produced while interpreting a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(number) => *number != 0.0,
            Value::Text(text) => !text.is_empty(),
            Value::Bool(flag) => *flag,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Bool(true) => Some(1.0),
            Value::Bool(false) => Some(0.0),
            Value::Text(_) => None,
        }
    }

    /// Equality never fails: values of different kinds are simply unequal.
    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(left), Value::Text(right)) => left == right,
            _ => match (self.numeric(), other.numeric()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
        }
    }

    fn ordering(&self, other: &Value, op: CmpOp) -> Result<Ordering, EvalError> {
        let ordering = match (self, other) {
            (Value::Text(left), Value::Text(right)) => Some(left.cmp(right)),
            _ => match (self.numeric(), other.numeric()) {
                (Some(left), Some(right)) => left.partial_cmp(&right),
                _ => None,
            },
        };

        ordering.ok_or_else(|| EvalError::TypeMismatch {
            operation: op.symbol(),
            left: self.kind(),
            right: other.kind(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::FloorDiv => "//",
            ArithOp::Mod => "%",
            ArithOp::Pow => "**",
        }
    }

    fn apply(self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match (self, left, right) {
            (ArithOp::Add, Value::Text(a), Value::Text(b)) => {
                return Ok(Value::Text(format!("{a}{b}")));
            }
            (ArithOp::Mul, Value::Text(text), count) | (ArithOp::Mul, count, Value::Text(text)) => {
                if let Some(times) = repeat_count(count) {
                    return Ok(Value::Text(text.repeat(times)));
                }
            }
            _ => {}
        }

        let (Some(a), Some(b)) = (left.numeric(), right.numeric()) else {
            return Err(EvalError::TypeMismatch {
                operation: self.symbol(),
                left: left.kind(),
                right: right.kind(),
            });
        };

        let divides = matches!(self, ArithOp::Div | ArithOp::FloorDiv | ArithOp::Mod);
        if (divides && b == 0.0) || (self == ArithOp::Pow && a == 0.0 && b < 0.0) {
            return Err(EvalError::DivisionByZero);
        }

        let result = match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::FloorDiv => (a / b).floor(),
            // remainder takes the sign of the divisor
            ArithOp::Mod => {
                let rem = a % b;
                if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                    rem + b
                } else {
                    rem
                }
            }
            ArithOp::Pow => {
                let power = a.powf(b);
                if !power.is_finite() {
                    return Err(EvalError::NotFinite {
                        operation: self.symbol(),
                    });
                }
                power
            }
        };
        Ok(Value::Number(result))
    }
}

/// Whole, non-text repeat counts; negative counts repeat zero times.
fn repeat_count(value: &Value) -> Option<usize> {
    match value {
        Value::Bool(flag) => Some(usize::from(*flag)),
        Value::Number(number) if number.fract() == 0.0 && number.is_finite() => {
            Some(number.max(0.0) as usize)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            _ => None,
        }
    }

    fn apply(self, left: &Value, right: &Value) -> Result<bool, EvalError> {
        match self {
            CmpOp::Eq => Ok(left.loose_eq(right)),
            CmpOp::Ne => Ok(!left.loose_eq(right)),
            CmpOp::Lt => Ok(left.ordering(right, self)? == Ordering::Less),
            CmpOp::Le => Ok(left.ordering(right, self)? != Ordering::Greater),
            CmpOp::Gt => Ok(left.ordering(right, self)? == Ordering::Greater),
            CmpOp::Ge => Ok(left.ordering(right, self)? != Ordering::Less),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Tagged expression tree. There is no variant that can reach outside the field view.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(Field),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `first op1 a op2 b ...`, true only when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Membership {
        needle: Box<Expr>,
        haystack: Haystack,
        negated: bool,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Right-hand side of `in`: a literal list or tuple, or an expression searched as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Haystack {
    Items(Vec<Expr>),
    Text(Box<Expr>),
}

impl Expr {
    pub fn eval(&self, view: &FieldView<'_>) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(field) => Ok(view.value(*field)),
            Expr::Negate(inner) => {
                let value = inner.eval(view)?;
                value
                    .numeric()
                    .map(|number| Value::Number(-number))
                    .ok_or(EvalError::TypeMismatch {
                        operation: "unary -",
                        left: value.kind(),
                        right: "none",
                    })
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(view)?.truthy())),
            Expr::Arith { op, lhs, rhs } => op.apply(&lhs.eval(view)?, &rhs.eval(view)?),
            Expr::Compare { first, rest } => {
                let mut left = first.eval(view)?;
                for (op, operand) in rest {
                    let right = operand.eval(view)?;
                    if !op.apply(&left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Membership {
                needle,
                haystack,
                negated,
            } => {
                let needle = needle.eval(view)?;
                let found = match haystack {
                    Haystack::Items(items) => {
                        let mut found = false;
                        for item in items {
                            if item.eval(view)?.loose_eq(&needle) {
                                found = true;
                                break;
                            }
                        }
                        found
                    }
                    Haystack::Text(expr) => match (&needle, expr.eval(view)?) {
                        (Value::Text(part), Value::Text(whole)) => whole.contains(part.as_str()),
                        (_, other) => {
                            return Err(EvalError::TypeMismatch {
                                operation: "in",
                                left: needle.kind(),
                                right: other.kind(),
                            })
                        }
                    },
                };
                Ok(Value::Bool(found != *negated))
            }
            Expr::Logic { op, lhs, rhs } => {
                let left = lhs.eval(view)?.truthy();
                let result = match op {
                    LogicOp::And => left && rhs.eval(view)?.truthy(),
                    LogicOp::Or => left || rhs.eval(view)?.truthy(),
                };
                Ok(Value::Bool(result))
            }
        }
    }
}

/// Problems found while parsing condition text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("invalid number literal '{literal}'")]
    InvalidNumber { literal: String },
    #[error("unexpected token '{found}'")]
    UnexpectedToken { found: String },
    #[error("condition ended unexpectedly")]
    UnexpectedEnd,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is not available to rule conditions")]
    RestrictedField(Field),
}

/// Failure while interpreting a parsed condition against a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unsupported operand types for '{operation}': {left} and {right}")]
    TypeMismatch {
        operation: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("result of '{operation}' is not a finite real number")]
    NotFinite { operation: &'static str },
    #[error("condition could not be parsed: {0}")]
    Unparseable(ConditionError),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Symbol(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(number) => write!(f, "{number}"),
            Token::Str(text) => write!(f, "'{text}'"),
            Token::Ident(name) => f.write_str(name),
            Token::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

// Longer symbols first so `**` is not read as two `*`.
const SYMBOLS: [&str; 18] = [
    "**", "//", "<=", ">=", "==", "!=", "<", ">", "+", "-", "*", "/", "%", "(", ")", "[", "]",
    ",",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let (offset, ch) = chars[index];

        if ch.is_whitespace() {
            index += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && next_is_digit(&chars, index)) {
            let start = index;
            while index < chars.len() && matches!(chars[index].1, '0'..='9' | '.' | '_') {
                index += 1;
            }
            if index < chars.len() && matches!(chars[index].1, 'e' | 'E') {
                let mut cursor = index + 1;
                if cursor < chars.len() && matches!(chars[cursor].1, '+' | '-') {
                    cursor += 1;
                }
                if cursor < chars.len() && chars[cursor].1.is_ascii_digit() {
                    index = cursor;
                    while index < chars.len() && matches!(chars[index].1, '0'..='9' | '_') {
                        index += 1;
                    }
                }
            }
            let literal: String = chars[start..index].iter().map(|(_, c)| c).collect();
            tokens.push(Token::Number(number_literal(&literal)?));
            continue;
        }

        if ch == '\'' || ch == '"' {
            let quote = ch;
            let start = index + 1;
            let mut end = start;
            while end < chars.len() && chars[end].1 != quote {
                end += 1;
            }
            if end >= chars.len() {
                return Err(ConditionError::UnterminatedString { offset });
            }
            let text: String = chars[start..end].iter().map(|(_, c)| c).collect();
            tokens.push(Token::Str(text));
            index = end + 1;
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = index;
            while index < chars.len()
                && (chars[index].1.is_ascii_alphanumeric() || chars[index].1 == '_')
            {
                index += 1;
            }
            let name: String = chars[start..index].iter().map(|(_, c)| c).collect();
            tokens.push(Token::Ident(name));
            continue;
        }

        let rest = &source[offset..];
        match SYMBOLS.iter().find(|symbol| rest.starts_with(*symbol)) {
            Some(symbol) => {
                tokens.push(Token::Symbol(*symbol));
                index += symbol.len();
            }
            None => return Err(ConditionError::UnexpectedChar { ch, offset }),
        }
    }

    Ok(tokens)
}

/// Underscores are accepted only between two digits, as in `1_000`.
fn number_literal(literal: &str) -> Result<f64, ConditionError> {
    let bytes = literal.as_bytes();
    let underscores_ok = bytes.iter().enumerate().all(|(index, byte)| {
        *byte != b'_'
            || (index > 0
                && bytes[index - 1].is_ascii_digit()
                && bytes.get(index + 1).map_or(false, |next| next.is_ascii_digit()))
    });

    let number = literal.replace('_', "").parse::<f64>().ok();
    match number {
        Some(number) if underscores_ok => Ok(number),
        _ => Err(ConditionError::InvalidNumber {
            literal: literal.to_string(),
        }),
    }
}

fn next_is_digit(chars: &[(usize, char)], index: usize) -> bool {
    chars
        .get(index + 1)
        .map(|(_, c)| c.is_ascii_digit())
        .unwrap_or(false)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == keyword)
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(found)) if *found == symbol)
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), ConditionError> {
        match self.advance() {
            Some(Token::Symbol(found)) if found == symbol => Ok(()),
            Some(other) => Err(ConditionError::UnexpectedToken {
                found: other.to_string(),
            }),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut expr = self.and_expr()?;
        while self.at_keyword("or") {
            self.advance();
            let rhs = self.and_expr()?;
            expr = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut expr = self.not_expr()?;
        while self.at_keyword("and") {
            self.advance();
            let rhs = self.not_expr()?;
            expr = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn not_expr(&mut self) -> Result<Expr, ConditionError> {
        if self.at_keyword("not") {
            self.advance();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ConditionError> {
        let first = self.arith()?;

        let negated_membership = self.at_keyword("not")
            && matches!(self.peek_at(1), Some(Token::Ident(name)) if name == "in");
        if self.at_keyword("in") || negated_membership {
            if negated_membership {
                self.advance();
            }
            self.advance();
            let haystack = self.haystack()?;
            return Ok(Expr::Membership {
                needle: Box::new(first),
                haystack,
                negated: negated_membership,
            });
        }

        let mut rest = Vec::new();
        while let Some(op) = self.peek_comparison() {
            self.advance();
            rest.push((op, self.arith()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn peek_comparison(&self) -> Option<CmpOp> {
        match self.peek() {
            Some(Token::Symbol(symbol)) => CmpOp::from_symbol(symbol),
            _ => None,
        }
    }

    /// `[a, b]` and `(a, b)` are item lists; `(a)` without a comma is just a grouped expression.
    fn haystack(&mut self) -> Result<Haystack, ConditionError> {
        if self.at_symbol("[") {
            self.advance();
            let (items, _) = self.items_until("]")?;
            return Ok(Haystack::Items(items));
        }

        if self.at_symbol("(") {
            self.advance();
            let (mut items, trailing_comma) = self.items_until(")")?;
            if items.len() == 1 && !trailing_comma {
                return Ok(Haystack::Text(Box::new(items.remove(0))));
            }
            return Ok(Haystack::Items(items));
        }

        Ok(Haystack::Text(Box::new(self.arith()?)))
    }

    fn items_until(&mut self, close: &str) -> Result<(Vec<Expr>, bool), ConditionError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        while !self.at_symbol(close) {
            items.push(self.or_expr()?);
            trailing_comma = self.at_symbol(",");
            if !trailing_comma {
                break;
            }
            self.advance();
        }
        self.expect_symbol(close)?;
        Ok((items, trailing_comma))
    }

    fn arith(&mut self) -> Result<Expr, ConditionError> {
        let mut expr = self.term()?;
        loop {
            let op = if self.at_symbol("+") {
                ArithOp::Add
            } else if self.at_symbol("-") {
                ArithOp::Sub
            } else {
                return Ok(expr);
            };
            self.advance();
            let rhs = self.term()?;
            expr = Expr::Arith {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ConditionError> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Symbol("*")) => ArithOp::Mul,
                Some(Token::Symbol("/")) => ArithOp::Div,
                Some(Token::Symbol("//")) => ArithOp::FloorDiv,
                Some(Token::Symbol("%")) => ArithOp::Mod,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.unary()?;
            expr = Expr::Arith {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ConditionError> {
        if self.at_symbol("-") {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.power()
    }

    /// `**` binds tighter than a unary minus on its left and is right-associative.
    fn power(&mut self) -> Result<Expr, ConditionError> {
        let base = self.primary()?;
        if !self.at_symbol("**") {
            return Ok(base);
        }
        self.advance();
        let exponent = self.unary()?;
        Ok(Expr::Arith {
            op: ArithOp::Pow,
            lhs: Box::new(base),
            rhs: Box::new(exponent),
        })
    }

    fn primary(&mut self) -> Result<Expr, ConditionError> {
        match self.advance() {
            Some(Token::Number(number)) => Ok(Expr::Literal(Value::Number(number))),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::Text(text))),
            Some(Token::Symbol("(")) => {
                let inner = self.or_expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(Value::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(Value::Bool(false))),
                "and" | "or" | "not" | "in" => Err(ConditionError::UnexpectedToken {
                    found: name.clone(),
                }),
                _ => {
                    let field = Field::parse(&name)
                        .ok_or_else(|| ConditionError::UnknownField(name.clone()))?;
                    if !field.is_rule_visible() {
                        return Err(ConditionError::RestrictedField(field));
                    }
                    Ok(Expr::Field(field))
                }
            },
            Some(other) => Err(ConditionError::UnexpectedToken {
                found: other.to_string(),
            }),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}
