//! `nom` grammar for XPath 1.0 expressions.
//!
//! Binary operators are parsed by precedence climbing over [`LEVELS`]. Below
//! them sit unary minus, union, and path expressions; a path may begin with a
//! filter expression (`$v/a`, `(a|b)[1]/c`) or a plain location path.

use crate::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};

type ParseResult<'a, T> = IResult<&'a str, T>;

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(XPathError::XPathParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rest),
        )),
        Err(e) => Err(XPathError::XPathParse(input.to_string(), e.to_string())),
    }
}

/// Binary operators from loosest to tightest. Longer tokens come first
/// within a level; `&lt;`/`&gt;` spellings survive from undecoded attributes.
const LEVELS: &[&[(&str, BinaryOperator)]] = &[
    &[("or", BinaryOperator::Or)],
    &[("and", BinaryOperator::And)],
    &[("!=", BinaryOperator::NotEquals), ("=", BinaryOperator::Equals)],
    &[
        ("<=", BinaryOperator::LessThanOrEqual),
        ("&lt;=", BinaryOperator::LessThanOrEqual),
        (">=", BinaryOperator::GreaterThanOrEqual),
        ("&gt;=", BinaryOperator::GreaterThanOrEqual),
        ("<", BinaryOperator::LessThan),
        ("&lt;", BinaryOperator::LessThan),
        (">", BinaryOperator::GreaterThan),
        ("&gt;", BinaryOperator::GreaterThan),
    ],
    &[("+", BinaryOperator::Plus), ("-", BinaryOperator::Minus)],
    &[
        ("*", BinaryOperator::Multiply),
        ("div", BinaryOperator::Divide),
        ("mod", BinaryOperator::Modulo),
    ],
];

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn expression(input: &str) -> ParseResult<'_, Expression> {
    binary(0, input)
}

/// Left-associative chain of operators at `level`, with operands from the
/// next tighter level.
fn binary<'a>(level: usize, input: &'a str) -> ParseResult<'a, Expression> {
    let Some(ops) = LEVELS.get(level) else {
        return unary_expr(input);
    };
    let (mut input, mut left) = binary(level + 1, input)?;
    loop {
        let next = pair(ws(|i: &'a str| operator(ops, i)), |i: &'a str| binary(level + 1, i)).parse(input);
        match next {
            Ok((rest, (op, right))) => {
                left = Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        }
    }
}

fn operator<'a>(ops: &[(&'static str, BinaryOperator)], input: &'a str) -> ParseResult<'a, BinaryOperator> {
    for &(token, op) in ops {
        let matched: ParseResult<'a, &'a str> = if token.starts_with(|c: char| c.is_ascii_alphabetic()) {
            keyword(token).parse(input)
        } else {
            tag(token).parse(input)
        };
        if let Ok((rest, _)) = matched {
            return Ok((rest, op));
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
}

/// An operator name such as `div`, only when it does not start a longer name.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(tag(word), not(peek(take_while1(is_name_char))))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn unary_expr(input: &str) -> ParseResult<'_, Expression> {
    let (input, negations) = many0(ws(char('-'))).parse(input)?;
    let (input, mut expr) = union_expr(input)?;
    for _ in negations {
        expr = Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr: Box::new(expr),
        };
    }
    Ok((input, expr))
}

fn union_expr(input: &str) -> ParseResult<'_, Expression> {
    let (input, paths) = separated_list1(char('|'), ws(path_expr)).parse(input)?;
    let mut paths = paths.into_iter();
    let mut expr = match paths.next() {
        Some(first) => first,
        None => return Err(nom::Err::Error(Error::new(input, ErrorKind::SeparatedList))),
    };
    for right in paths {
        expr = Expression::BinaryOp {
            left: Box::new(expr),
            op: BinaryOperator::Union,
            right: Box::new(right),
        };
    }
    Ok((input, expr))
}

/// Filter expressions are tried before location paths so that `position()`
/// is read as a call rather than a step named `position`.
fn path_expr(input: &str) -> ParseResult<'_, Expression> {
    let (input, start) = alt((filter_expr, map(location_path, Expression::LocationPath))).parse(input)?;
    let (input, more) = continuation(input)?;
    if more.is_empty() {
        return Ok((input, start));
    }

    let path = match start {
        Expression::LocationPath(mut path) => {
            path.steps.extend(more);
            path
        }
        other => LocationPath {
            start_point: Some(Box::new(other)),
            is_absolute: false,
            steps: more,
        },
    };
    Ok((input, Expression::LocationPath(path)))
}

/// Any number of `/step` or `//step` continuations, with `//` expanded.
fn continuation(input: &str) -> ParseResult<'_, Vec<Step>> {
    let (input, parts) = many0(pair(alt((tag("//"), tag("/"))), step)).parse(input)?;
    let mut steps = Vec::with_capacity(parts.len());
    for (separator, next) in parts {
        if separator == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next);
    }
    Ok((input, steps))
}

/// The head of a location path: `/`, `/step`, `//step` or `step`.
fn location_path(input: &str) -> ParseResult<'_, LocationPath> {
    let (input, root) = opt(alt((tag("//"), tag("/")))).parse(input)?;
    let (input, steps) = match root {
        Some("//") => {
            let (input, first) = step(input)?;
            (input, vec![Step::descendant_or_self(), first])
        }
        Some(_) => match step(input) {
            Ok((input, first)) => (input, vec![first]),
            // A lone `/` selects the root.
            Err(nom::Err::Error(_)) => (input, Vec::new()),
            Err(e) => return Err(e),
        },
        None => {
            let (input, first) = step(input)?;
            (input, vec![first])
        }
    };
    Ok((
        input,
        LocationPath {
            start_point: None,
            is_absolute: root.is_some(),
            steps,
        },
    ))
}

fn step(input: &str) -> ParseResult<'_, Step> {
    let any_node = NodeTest::NodeType(NodeTypeTest::Node);
    let (input, (axis, node_test)) = alt((
        value((Axis::Parent, any_node.clone()), tag("..")),
        value((Axis::SelfAxis, any_node), char('.')),
        map(preceded(char('@'), node_test), |test| (Axis::Attribute, test)),
        pair(map(opt(axis_specifier), |a| a.unwrap_or(Axis::Child)), node_test),
    ))
    .parse(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    Ok((
        input,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

fn axis_specifier(input: &str) -> ParseResult<'_, Axis> {
    let (rest, name) =
        terminated(take_while1(|c: char| c.is_ascii_lowercase() || c == '-'), tag("::")).parse(input)?;
    match Axis::from_name(name) {
        Some(axis) => Ok((rest, axis)),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
    }
}

fn node_test(input: &str) -> ParseResult<'_, NodeTest> {
    alt((
        value(NodeTest::Wildcard, char('*')),
        node_type_test,
        map(q_name, NodeTest::Name),
    ))
    .parse(input)
}

fn node_type_test(input: &str) -> ParseResult<'_, NodeTest> {
    let (rest, name) = terminated(nc_name, pair(ws(char('(')), char(')'))).parse(input)?;
    match NodeTypeTest::from_name(name) {
        Some(test) => Ok((rest, NodeTest::NodeType(test))),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    }
}

fn predicate(input: &str) -> ParseResult<'_, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

/// A primary expression optionally followed by predicates, e.g. `$rows[2]`.
fn filter_expr(input: &str) -> ParseResult<'_, Expression> {
    let (input, expr) = primary_expr(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    if predicates.is_empty() {
        return Ok((input, expr));
    }
    Ok((
        input,
        Expression::Filter {
            expr: Box::new(expr),
            predicates,
        },
    ))
}

fn primary_expr(input: &str) -> ParseResult<'_, Expression> {
    ws(alt((
        map(preceded(char('$'), q_name), Expression::Variable),
        map(number_literal, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

/// `12`, `12.`, `12.5` or `.5`. No sign, exponent or named values.
fn number_literal(input: &str) -> ParseResult<'_, f64> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |digits: &str| digits.parse::<f64>(),
    )
    .parse(input)
}

fn string_literal(input: &str) -> ParseResult<'_, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        str::to_string,
    )
    .parse(input)
}

fn nc_name(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_name_char),
    ))
    .parse(input)
}

fn q_name(input: &str) -> ParseResult<'_, String> {
    map(recognize(pair(nc_name, opt(pair(char(':'), nc_name)))), str::to_string).parse(input)
}

/// A QName directly followed by `(`. Node-type names are left to the step
/// parser.
fn function_call(input: &str) -> ParseResult<'_, Expression> {
    let (rest, name) = terminated(q_name, peek(ws(char('(')))).parse(input)?;
    if NodeTypeTest::from_name(&name).is_some() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    }
    let (rest, args) = preceded(
        ws(char('(')),
        terminated(separated_list0(ws(char(',')), expression), ws(char(')'))),
    )
    .parse(rest)?;
    Ok((rest, Expression::FunctionCall { name, args }))
}
