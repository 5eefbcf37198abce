//! Condition Parser
//!
//! Parses condition strings into a list of [`Condition`]s.
//!
//! # Supported Syntax
//!
//! ```text
//! field OP literal [AND field OP literal ...]
//!
//! OP      := == | = | != | <> | < | <= | > | >=
//! literal := null | true | false | number | 'string' | "string"
//! field   := identifier[.identifier ...]
//! ```
//!
//! `OR` is recognized only to be rejected: one index lookup cannot answer a
//! disjunction.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::query::ast::{Condition, Operator};
use crate::query::error::{QueryError, QueryResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

/// Parse a condition string
pub fn parse_conditions(input: &str) -> QueryResult<Vec<Condition>> {
    let input = input.trim();

    let (remaining, (first, rest)) = parse_filter(input).map_err(|e| {
        let at = match &e {
            nom::Err::Error(inner) | nom::Err::Failure(inner) => inner.input,
            nom::Err::Incomplete(_) => "",
        };
        QueryError::Parse(format!("invalid condition at '{}'", at))
    })?;

    if !remaining.trim().is_empty() {
        return Err(QueryError::Parse(format!(
            "Unexpected input after condition: '{}'",
            remaining.trim()
        )));
    }

    if rest.iter().any(|(connective, _)| *connective == Connective::Or) {
        return Err(QueryError::Unsupported(
            "OR cannot be answered by one index; query each branch and union the results"
                .to_string(),
        ));
    }

    let mut conditions = Vec::with_capacity(rest.len() + 1);
    conditions.push(first);
    conditions.extend(rest.into_iter().map(|(_, condition)| condition));

    Ok(conditions)
}

/// Parse the first condition and every connective-condition pair after it
fn parse_filter(input: &str) -> IResult<&str, (Condition, Vec<(Connective, Condition)>)> {
    pair(parse_condition, many0(pair(parse_connective, parse_condition)))(input)
}

/// Parse AND / OR surrounded by whitespace
fn parse_connective(input: &str) -> IResult<&str, Connective> {
    delimited(
        multispace1,
        alt((
            value(Connective::And, alt((tag_no_case("AND"), tag("&&")))),
            value(Connective::Or, alt((tag_no_case("OR"), tag("||")))),
        )),
        multispace1,
    )(input)
}

/// Parse a single condition like "age >= 5"
fn parse_condition(input: &str) -> IResult<&str, Condition> {
    let (input, field) = parse_field(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = parse_operator(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_literal(input)?;

    Ok((
        input,
        Condition {
            field: field.to_string(),
            op,
            value,
        },
    ))
}

/// Parse comparison operator
fn parse_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Ne, alt((tag("!="), tag("<>")))),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
        value(Operator::Eq, alt((tag("=="), tag("=")))),
    ))(input)
}

/// Parse dotted attribute path like "address.city"
fn parse_field(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        parse_identifier,
        many0(pair(char('.'), parse_identifier)),
    ))(input)
}

/// Parse identifier
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse literal value
fn parse_literal(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Null, tag_no_case("null")),
        value(Value::Bool(true), tag_no_case("true")),
        value(Value::Bool(false), tag_no_case("false")),
        map(parse_number, Value::Number),
        map(parse_quoted_string, Value::String),
    ))(input)
}

/// Parse single- or double-quoted string
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Parse floating point number
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((
                alt((char('e'), char('E'))),
                opt(alt((char('+'), char('-')))),
                digit1,
            ))),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}
