//! Choice rules: pure predicates over a state's input.
//!
//! Rules are evaluated in order by a Choice state; the first rule that
//! holds selects the next state. Evaluation has no side effects and an
//! unresolved variable never raises, it simply makes the comparison false
//! (except for `IsPresent(false)`).

use crate::core::error::ValidationError;
use crate::core::reference_path::ReferencePath;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// A single comparison applied to a rule's variable.
#[derive(Clone, Debug, PartialEq)]
pub enum Comparison {
    StringEquals(String),
    StringLessThan(String),
    StringGreaterThan(String),
    StringLessThanEquals(String),
    StringGreaterThanEquals(String),
    /// Glob match where `*` matches any run of characters and `\*` is a literal star.
    StringMatches(String),
    NumericEquals(f64),
    NumericLessThan(f64),
    NumericGreaterThan(f64),
    NumericLessThanEquals(f64),
    NumericGreaterThanEquals(f64),
    BooleanEquals(bool),
    TimestampEquals(DateTime<Utc>),
    TimestampLessThan(DateTime<Utc>),
    TimestampGreaterThan(DateTime<Utc>),
    TimestampLessThanEquals(DateTime<Utc>),
    TimestampGreaterThanEquals(DateTime<Utc>),
    IsNull(bool),
    IsPresent(bool),
    IsNumeric(bool),
    IsString(bool),
    IsBoolean(bool),
    IsTimestamp(bool),
}

impl Comparison {
    /// The ASL operator name.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::StringEquals(_) => "StringEquals",
            Self::StringLessThan(_) => "StringLessThan",
            Self::StringGreaterThan(_) => "StringGreaterThan",
            Self::StringLessThanEquals(_) => "StringLessThanEquals",
            Self::StringGreaterThanEquals(_) => "StringGreaterThanEquals",
            Self::StringMatches(_) => "StringMatches",
            Self::NumericEquals(_) => "NumericEquals",
            Self::NumericLessThan(_) => "NumericLessThan",
            Self::NumericGreaterThan(_) => "NumericGreaterThan",
            Self::NumericLessThanEquals(_) => "NumericLessThanEquals",
            Self::NumericGreaterThanEquals(_) => "NumericGreaterThanEquals",
            Self::BooleanEquals(_) => "BooleanEquals",
            Self::TimestampEquals(_) => "TimestampEquals",
            Self::TimestampLessThan(_) => "TimestampLessThan",
            Self::TimestampGreaterThan(_) => "TimestampGreaterThan",
            Self::TimestampLessThanEquals(_) => "TimestampLessThanEquals",
            Self::TimestampGreaterThanEquals(_) => "TimestampGreaterThanEquals",
            Self::IsNull(_) => "IsNull",
            Self::IsPresent(_) => "IsPresent",
            Self::IsNumeric(_) => "IsNumeric",
            Self::IsString(_) => "IsString",
            Self::IsBoolean(_) => "IsBoolean",
            Self::IsTimestamp(_) => "IsTimestamp",
        }
    }

    fn operand(&self) -> Value {
        match self {
            Self::StringEquals(s)
            | Self::StringLessThan(s)
            | Self::StringGreaterThan(s)
            | Self::StringLessThanEquals(s)
            | Self::StringGreaterThanEquals(s)
            | Self::StringMatches(s) => json!(s),
            Self::NumericEquals(n)
            | Self::NumericLessThan(n)
            | Self::NumericGreaterThan(n)
            | Self::NumericLessThanEquals(n)
            | Self::NumericGreaterThanEquals(n) => json!(n),
            Self::TimestampEquals(t)
            | Self::TimestampLessThan(t)
            | Self::TimestampGreaterThan(t)
            | Self::TimestampLessThanEquals(t)
            | Self::TimestampGreaterThanEquals(t) => {
                json!(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::BooleanEquals(b)
            | Self::IsNull(b)
            | Self::IsPresent(b)
            | Self::IsNumeric(b)
            | Self::IsString(b)
            | Self::IsBoolean(b)
            | Self::IsTimestamp(b) => json!(b),
        }
    }

    /// Evaluate against a resolved variable (`None` when the path did not resolve).
    pub fn check(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return matches!(self, Self::IsPresent(false));
        };

        match self {
            Self::StringEquals(s) => compare_str(value, s).is_some_and(Ordering::is_eq),
            Self::StringLessThan(s) => compare_str(value, s).is_some_and(Ordering::is_lt),
            Self::StringGreaterThan(s) => compare_str(value, s).is_some_and(Ordering::is_gt),
            Self::StringLessThanEquals(s) => compare_str(value, s).is_some_and(Ordering::is_le),
            Self::StringGreaterThanEquals(s) => {
                compare_str(value, s).is_some_and(Ordering::is_ge)
            }
            Self::StringMatches(pattern) => value
                .as_str()
                .is_some_and(|text| glob_matches(pattern, text)),
            Self::NumericEquals(n) => compare_num(value, *n).is_some_and(Ordering::is_eq),
            Self::NumericLessThan(n) => compare_num(value, *n).is_some_and(Ordering::is_lt),
            Self::NumericGreaterThan(n) => compare_num(value, *n).is_some_and(Ordering::is_gt),
            Self::NumericLessThanEquals(n) => compare_num(value, *n).is_some_and(Ordering::is_le),
            Self::NumericGreaterThanEquals(n) => {
                compare_num(value, *n).is_some_and(Ordering::is_ge)
            }
            Self::BooleanEquals(b) => value.as_bool() == Some(*b),
            Self::TimestampEquals(t) => compare_time(value, t).is_some_and(Ordering::is_eq),
            Self::TimestampLessThan(t) => compare_time(value, t).is_some_and(Ordering::is_lt),
            Self::TimestampGreaterThan(t) => compare_time(value, t).is_some_and(Ordering::is_gt),
            Self::TimestampLessThanEquals(t) => {
                compare_time(value, t).is_some_and(Ordering::is_le)
            }
            Self::TimestampGreaterThanEquals(t) => {
                compare_time(value, t).is_some_and(Ordering::is_ge)
            }
            Self::IsNull(expected) => value.is_null() == *expected,
            Self::IsNumeric(expected) => value.is_number() == *expected,
            Self::IsString(expected) => value.is_string() == *expected,
            Self::IsBoolean(expected) => value.is_boolean() == *expected,
            Self::IsTimestamp(expected) => parse_timestamp(value).is_some() == *expected,
            Self::IsPresent(expected) => *expected,
        }
    }
}

fn compare_str(value: &Value, expected: &str) -> Option<Ordering> {
    value.as_str().map(|actual| actual.cmp(expected))
}

fn compare_num(value: &Value, expected: f64) -> Option<Ordering> {
    value.as_f64().and_then(|actual| actual.partial_cmp(&expected))
}

fn compare_time(value: &Value, expected: &DateTime<Utc>) -> Option<Ordering> {
    parse_timestamp(value).map(|actual| actual.cmp(expected))
}

/// Parse an RFC 3339 timestamp string.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

enum Token {
    Literal(char),
    Star,
}

fn glob_matches(pattern: &str, text: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => tokens.push(Token::Literal(escaped)),
                None => tokens.push(Token::Literal('\\')),
            },
            '*' => tokens.push(Token::Star),
            other => tokens.push(Token::Literal(other)),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            Some(Token::Star) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| matches!(token, Token::Star))
}

/// A Choice rule: a comparison on a variable, or a boolean combination.
///
/// # Example
///
/// ```rust
/// use stepsim::core::{ChoiceRule, Comparison};
/// use serde_json::json;
///
/// let rule = ChoiceRule::and(vec![
///     ChoiceRule::variable("$.count", Comparison::NumericGreaterThan(10.0)).unwrap(),
///     ChoiceRule::not(ChoiceRule::variable("$.done", Comparison::BooleanEquals(true)).unwrap()),
/// ])
/// .unwrap();
///
/// assert!(rule.evaluate(&json!({"count": 11, "done": false})));
/// assert!(!rule.evaluate(&json!({"count": 11, "done": true})));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ChoiceRule {
    Variable {
        variable: ReferencePath,
        comparison: Comparison,
    },
    And(Vec<ChoiceRule>),
    Or(Vec<ChoiceRule>),
    Not(Box<ChoiceRule>),
}

impl ChoiceRule {
    pub fn variable(path: &str, comparison: Comparison) -> Result<Self, ValidationError> {
        Ok(Self::Variable {
            variable: ReferencePath::parse(path)?,
            comparison,
        })
    }

    pub fn and(rules: Vec<ChoiceRule>) -> Result<Self, ValidationError> {
        if rules.is_empty() {
            return Err(ValidationError::EmptyRuleList("And"));
        }
        Ok(Self::And(rules))
    }

    pub fn or(rules: Vec<ChoiceRule>) -> Result<Self, ValidationError> {
        if rules.is_empty() {
            return Err(ValidationError::EmptyRuleList("Or"));
        }
        Ok(Self::Or(rules))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(rule: ChoiceRule) -> Self {
        Self::Not(Box::new(rule))
    }

    pub fn evaluate(&self, input: &Value) -> bool {
        match self {
            Self::Variable {
                variable,
                comparison,
            } => comparison.check(variable.apply(input)),
            Self::And(rules) => rules.iter().all(|rule| rule.evaluate(input)),
            Self::Or(rules) => rules.iter().any(|rule| rule.evaluate(input)),
            Self::Not(rule) => !rule.evaluate(input),
        }
    }

    pub fn compile(&self) -> Value {
        match self {
            Self::Variable {
                variable,
                comparison,
            } => {
                let mut compiled = Map::new();
                compiled.insert("Variable".to_string(), json!(variable.to_string()));
                compiled.insert(comparison.operator().to_string(), comparison.operand());
                Value::Object(compiled)
            }
            Self::And(rules) => json!({"And": rules.iter().map(Self::compile).collect::<Vec<_>>()}),
            Self::Or(rules) => json!({"Or": rules.iter().map(Self::compile).collect::<Vec<_>>()}),
            Self::Not(rule) => json!({"Not": rule.compile()}),
        }
    }
}
