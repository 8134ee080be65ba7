//! Safe arithmetic evaluation.

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::call::Arguments;
use crate::contract::Tool;
use crate::error::{ToolError, ToolResult, ValidationError};
use crate::schema::{ParameterSchema, ParameterType, ToolSchema};

const DEFAULT_PRECISION: i64 = 4;
// Beyond this many decimals the scaling factor loses more than it rounds.
const MAX_SCALED_PRECISION: i64 = 15;

/// Evaluates arithmetic expressions without executing arbitrary code.
#[derive(Debug, Clone)]
pub struct CalculatorTool {
    schema: ToolSchema,
}

impl CalculatorTool {
    /// Creates the `calculate` tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] if the static schema is rejected.
    pub fn new() -> ToolResult<Self> {
        let schema = ToolSchema::new("calculate", "Perform mathematical calculations safely")?
            .with_parameter(
                ParameterSchema::required("expression", ParameterType::String)
                    .with_description("Mathematical expression to evaluate"),
            )?
            .with_parameter(
                ParameterSchema::optional("precision", ParameterType::Integer)
                    .with_description("Number of decimal places for result")
                    .with_default(DEFAULT_PRECISION),
            )?;
        Ok(Self { schema })
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn validate_parameters(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        self.schema.validate(arguments)?;
        match arguments.get("precision").and_then(Value::as_i64) {
            Some(precision) if precision < 0 => Err(ValidationError::constraint(
                "precision",
                "must not be negative",
            )),
            _ => Ok(()),
        }
    }

    async fn run(&self, arguments: Arguments) -> ToolResult<Value> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments("`expression` must be a string"))?;
        let precision = arguments
            .get("precision")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_PRECISION);

        let value = evaluate(expression)
            .map_err(|err| ToolError::execution(format!("Invalid expression: {err}")))?;
        debug!(expression, value = ?value, "evaluated expression");

        Ok(json!({
            "expression": expression,
            "result": value.rounded(precision).to_json(),
            "precision": precision,
        }))
    }
}

/// Failures raised while evaluating an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    /// The input could not be tokenized or parsed.
    #[error("{0}")]
    Syntax(String),
    /// Identifier that is neither a constant nor a function.
    #[error("Unsupported name: {0}")]
    UnsupportedName(String),
    /// Call to a function outside the allow-list.
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),
    /// Function called with the wrong number of arguments.
    #[error("{name}() takes {expected} argument(s), got {found}")]
    Arity {
        /// Function name.
        name: String,
        /// Accepted argument counts.
        expected: &'static str,
        /// Supplied argument count.
        found: usize,
    },
    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Result is infinite or not a number.
    #[error("math domain error")]
    Domain,
}

/// Numeric value preserving Python-style integer/float distinction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Exact integer.
    Int(i64),
    /// Floating point value.
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    fn checked(self) -> Result<Self, CalcError> {
        match self {
            Self::Float(value) if !value.is_finite() => Err(CalcError::Domain),
            other => Ok(other),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn rounded(self, precision: i64) -> Self {
        match self {
            Self::Float(value) if precision <= MAX_SCALED_PRECISION => {
                let factor = 10_f64.powi(precision as i32);
                Self::Float((value * factor).round() / factor)
            }
            other => other,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Self::Int(value) => Value::from(value),
            Self::Float(value) => {
                serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
            }
        }
    }
}

/// Evaluates an arithmetic expression.
///
/// # Errors
///
/// Returns a [`CalcError`] for syntax errors, unknown identifiers, division by
/// zero, or non-finite results.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(CalcError::Syntax(format!("unexpected token {token:?}")));
    }
    value.checked()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    is_float |= chars[i] == '.';
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        is_float = true;
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal, is_float)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            _ => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    other => {
                        return Err(CalcError::Syntax(format!("unexpected character '{other}'")));
                    }
                });
                i += 1;
            }
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str, is_float: bool) -> Result<Number, CalcError> {
    let invalid = || CalcError::Syntax(format!("invalid number literal '{literal}'"));
    if !is_float {
        if let Ok(value) = literal.parse::<i64>() {
            return Ok(Number::Int(value));
        }
    }
    literal.parse::<f64>().map(Number::Float).map_err(|_| invalid())
}

// Bounds recursion through parentheses, call arguments and exponents.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), CalcError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(CalcError::Syntax(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expression(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value = add(value, self.term()?);
            } else if self.eat(&Token::Minus) {
                value = sub(value, self.term()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value = mul(value, self.unary()?);
            } else if self.eat(&Token::Slash) {
                value = div(value, self.unary()?)?;
            } else if self.eat(&Token::Percent) {
                value = modulo(value, self.unary()?)?;
            } else {
                return Ok(value);
            }
        }
    }

    // Sign runs are folded in a loop so `----1` costs no stack.
    fn unary(&mut self) -> Result<Number, CalcError> {
        let mut negate = false;
        loop {
            if self.eat(&Token::Minus) {
                negate = !negate;
            } else if !self.eat(&Token::Plus) {
                break;
            }
        }

        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::Syntax("expression nested too deeply".into()));
        }
        let value = self.power();
        self.depth -= 1;

        let value = value?;
        Ok(if negate { neg(value) } else { value })
    }

    // `**` binds tighter than a unary minus on its left and is right
    // associative: -2 ** 2 == -4, 2 ** -1 == 0.5.
    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.primary()?;
        if self.eat(&Token::Pow) {
            let exponent = self.unary()?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    call_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(CalcError::Syntax(format!("unexpected token {token:?}"))),
            None => Err(CalcError::Syntax("unexpected end of expression".into())),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Number>, CalcError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }
}

fn constant(name: &str) -> Result<Number, CalcError> {
    match name {
        "pi" => Ok(Number::Float(std::f64::consts::PI)),
        "e" => Ok(Number::Float(std::f64::consts::E)),
        other => Err(CalcError::UnsupportedName(other.to_owned())),
    }
}

fn arity(name: &str, args: &[Number], expected: &'static str, ok: bool) -> Result<(), CalcError> {
    if ok {
        Ok(())
    } else {
        Err(CalcError::Arity {
            name: name.to_owned(),
            expected,
            found: args.len(),
        })
    }
}

fn unary_float(name: &str, args: &[Number], f: fn(f64) -> f64) -> Result<Number, CalcError> {
    arity(name, args, "1", args.len() == 1)?;
    Number::Float(f(args[0].as_f64())).checked()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn call_function(name: &str, args: &[Number]) -> Result<Number, CalcError> {
    match name {
        "abs" => {
            arity(name, args, "1", args.len() == 1)?;
            Ok(match args[0] {
                Number::Int(value) => value
                    .checked_abs()
                    .map_or(Number::Float(value.unsigned_abs() as f64), Number::Int),
                Number::Float(value) => Number::Float(value.abs()),
            })
        }
        "round" => {
            arity(name, args, "1 or 2", matches!(args.len(), 1 | 2))?;
            match (args[0], args.get(1)) {
                (Number::Int(value), _) => Ok(Number::Int(value)),
                (Number::Float(value), None) => {
                    let rounded = value.round_ties_even();
                    if rounded.abs() < 9.0e18 {
                        Ok(Number::Int(rounded as i64))
                    } else {
                        Number::Float(rounded).checked()
                    }
                }
                (Number::Float(value), Some(Number::Int(digits))) => {
                    let factor = 10_f64.powi((*digits).clamp(-308, 308) as i32);
                    Number::Float((value * factor).round_ties_even() / factor).checked()
                }
                (Number::Float(_), Some(Number::Float(_))) => Err(CalcError::Syntax(
                    "round() digits must be an integer".into(),
                )),
            }
        }
        "min" | "max" => {
            arity(name, args, "at least 1", !args.is_empty())?;
            let pick_max = name == "max";
            let mut best = args[0];
            for &candidate in &args[1..] {
                let better = if pick_max {
                    candidate.as_f64() > best.as_f64()
                } else {
                    candidate.as_f64() < best.as_f64()
                };
                if better {
                    best = candidate;
                }
            }
            Ok(best)
        }
        "sqrt" => unary_float(name, args, f64::sqrt),
        "sin" => unary_float(name, args, f64::sin),
        "cos" => unary_float(name, args, f64::cos),
        "tan" => unary_float(name, args, f64::tan),
        "log10" => unary_float(name, args, f64::log10),
        "exp" => unary_float(name, args, f64::exp),
        "log" => {
            arity(name, args, "1 or 2", matches!(args.len(), 1 | 2))?;
            let value = args[0].as_f64();
            let result = match args.get(1) {
                Some(base) => value.ln() / base.as_f64().ln(),
                None => value.ln(),
            };
            Number::Float(result).checked()
        }
        "pi" | "e" => Err(CalcError::Syntax(format!("'{name}' is not callable"))),
        other => Err(CalcError::UnsupportedFunction(other.to_owned())),
    }
}

fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_add(y).map_or_else(
            || Number::Float(a.as_f64() + b.as_f64()),
            Number::Int,
        ),
        _ => Number::Float(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_sub(y).map_or_else(
            || Number::Float(a.as_f64() - b.as_f64()),
            Number::Int,
        ),
        _ => Number::Float(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_mul(y).map_or_else(
            || Number::Float(a.as_f64() * b.as_f64()),
            Number::Int,
        ),
        _ => Number::Float(a.as_f64() * b.as_f64()),
    }
}

fn neg(a: Number) -> Number {
    match a {
        Number::Int(x) => x.checked_neg().map_or_else(|| Number::Float(-a.as_f64()), Number::Int),
        Number::Float(x) => Number::Float(-x),
    }
}

fn div(a: Number, b: Number) -> Result<Number, CalcError> {
    if b.as_f64() == 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

// Result takes the sign of the divisor.
fn modulo(a: Number, b: Number) -> Result<Number, CalcError> {
    if b.as_f64() == 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let r = x.checked_rem(y).unwrap_or(0);
            Ok(Number::Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let r = x % y;
            Ok(Number::Float(if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }))
        }
    }
}

fn pow(base: Number, exponent: Number) -> Result<Number, CalcError> {
    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if b == 0 && e < 0 {
            return Err(CalcError::DivisionByZero);
        }
        if let Ok(e) = u32::try_from(e) {
            if let Some(value) = b.checked_pow(e) {
                return Ok(Number::Int(value));
            }
        }
    }
    Number::Float(base.as_f64().powf(exponent.as_f64())).checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str) -> Number {
        evaluate(expression).unwrap_or_else(|err| panic!("{expression}: {err}"))
    }

    fn approx(expression: &str, expected: f64) {
        let value = eval(expression).as_f64();
        assert!((value - expected).abs() < 1e-9, "{expression} = {value}, expected {expected}");
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval("2 + 3 * 4"), Number::Int(14));
        assert_eq!(eval("(2 + 3) * 4"), Number::Int(20));
        assert_eq!(eval("2 ** 10"), Number::Int(1024));
        assert_eq!(eval("7 % 3"), Number::Int(1));
        assert_eq!(eval("-7 % 3"), Number::Int(2));
    }

    #[test]
    fn division_and_powers_follow_python_rules() {
        assert_eq!(eval("4 / 2"), Number::Float(2.0));
        assert_eq!(eval("-2 ** 2"), Number::Int(-4));
        assert_eq!(eval("2 ** 3 ** 2"), Number::Int(512));
        approx("2 ** -1", 0.5);
        approx("1.5e2 + .5", 150.5);
    }

    #[test]
    fn functions_and_constants() {
        approx("sqrt(16)", 4.0);
        approx("log(8, 2)", 3.0);
        approx("log10(1000)", 3.0);
        approx("sin(0) + cos(0)", 1.0);
        approx("pi", std::f64::consts::PI);
        assert_eq!(eval("max(1, 7, 3)"), Number::Int(7));
        assert_eq!(eval("min(2.5, 4)"), Number::Float(2.5));
        assert_eq!(eval("abs(-5)"), Number::Int(5));
        assert_eq!(eval("round(2.5)"), Number::Int(2));
        approx("round(3.14159, 2)", 3.14);
    }

    #[test]
    fn rejects_unsafe_or_invalid_input() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::DivisionByZero));
        assert_eq!(
            evaluate("__import__('os')"),
            Err(CalcError::Syntax("unexpected character '''".into()))
        );
        assert_eq!(
            evaluate("system(1)"),
            Err(CalcError::UnsupportedFunction("system".into()))
        );
        assert_eq!(evaluate("x + 1"), Err(CalcError::UnsupportedName("x".into())));
        assert_eq!(evaluate("sqrt(-1)"), Err(CalcError::Domain));
        assert!(matches!(evaluate("2 +"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("(1 + 2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("sqrt(1, 2)"), Err(CalcError::Arity { .. })));
    }

    #[test]
    fn long_sign_runs_fold_without_recursion() {
        let even = format!("{}1", "-".repeat(20_000));
        let odd = format!("{}1", "-".repeat(20_001));
        assert_eq!(eval(&even), Number::Int(1));
        assert_eq!(eval(&odd), Number::Int(-1));
        assert_eq!(eval("-+-+2 ** 2"), Number::Int(4));
        assert_eq!(eval("--2 ** 2"), Number::Int(4));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(
            evaluate(&nested),
            Err(CalcError::Syntax("expression nested too deeply".into()))
        );

        let tower = format!("{}2", "2 ** ".repeat(10_000));
        assert_eq!(
            evaluate(&tower),
            Err(CalcError::Syntax("expression nested too deeply".into()))
        );

        let calls = format!("{}1{}", "abs(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(evaluate(&calls), Err(CalcError::Syntax(_))));

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(eval(&shallow), Number::Int(1));
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        assert!(matches!(eval("9223372036854775807 + 1"), Number::Float(_)));
    }

    #[test]
    fn validates_precision() {
        let tool = CalculatorTool::new().unwrap();
        assert!(tool.validate_parameters(&args(json!({ "expression": "2 + 2" }))).is_ok());
        assert!(
            tool.validate_parameters(&args(json!({ "expression": "2 + 2", "precision": 2 })))
                .is_ok()
        );
        assert!(tool.validate_parameters(&Arguments::new()).is_err());
        assert!(tool.validate_parameters(&args(json!({ "expression": 123 }))).is_err());
        assert!(
            tool.validate_parameters(&args(json!({ "expression": "1", "precision": "high" })))
                .is_err()
        );
        assert!(
            tool.validate_parameters(&args(json!({ "expression": "1", "precision": -1 })))
                .is_err()
        );
    }

    #[tokio::test]
    async fn run_reports_rounded_result() {
        let tool = CalculatorTool::new().unwrap();
        assert_eq!(tool.name(), "calculate");
        assert!(tool.description().to_lowercase().contains("mathematical calculations"));

        let outcome = tool
            .execute(args(json!({ "expression": "10 / 3", "precision": 2 })))
            .await;
        assert!(outcome.is_success());
        assert_eq!(
            outcome.result(),
            Some(&json!({ "expression": "10 / 3", "result": 3.33, "precision": 2 }))
        );

        let outcome = tool.execute(args(json!({ "expression": "2 + 2" }))).await;
        assert_eq!(outcome.result().unwrap()["result"], json!(4));
        assert_eq!(outcome.result().unwrap()["precision"], json!(4));
    }

    #[tokio::test]
    async fn run_reports_invalid_expressions() {
        let tool = CalculatorTool::new().unwrap();
        let outcome = tool.execute(args(json!({ "expression": "1 / 0" }))).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("Invalid expression: division by zero"));
    }

    #[tokio::test]
    async fn run_fails_cleanly_on_deeply_nested_input() {
        let tool = CalculatorTool::new().unwrap();
        let expression = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let outcome = tool.execute(args(json!({ "expression": expression }))).await;
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.error(),
            Some("Invalid expression: expression nested too deeply")
        );
    }
}
