//! Contains pure functions for evaluating XPath binary operators.

use super::ast::BinaryOperator;
use super::engine::{XPathValue, format_number, string_to_number};
use crate::datasource::DataSourceNode;
use crate::error::XPathError;

pub fn evaluate<'a, N: DataSourceNode<'a> + 'a>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    use BinaryOperator::*;
    match op {
        Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        Equals | NotEquals | LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            Ok(XPathValue::Boolean(compare(op, &left, &right)))
        }
        Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        Union => evaluate_union(left, right),
    }
}

/// A single comparable value. Node-sets are compared member by member.
#[derive(Debug, Clone)]
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Atom {
    fn as_number(&self) -> f64 {
        match self {
            Atom::Str(s) => string_to_number(s),
            Atom::Num(n) => *n,
            Atom::Bool(b) => f64::from(u8::from(*b)),
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            Atom::Str(s) => !s.is_empty(),
            Atom::Num(n) => *n != 0.0 && !n.is_nan(),
            Atom::Bool(b) => *b,
        }
    }

    fn as_string(&self) -> String {
        match self {
            Atom::Str(s) => s.clone(),
            Atom::Num(n) => format_number(*n),
            Atom::Bool(b) => b.to_string(),
        }
    }
}

fn atoms<'a, N: DataSourceNode<'a>>(value: &XPathValue<N>, other: &XPathValue<N>) -> Vec<Atom> {
    match value {
        // Against a boolean, a node-set counts as a whole.
        XPathValue::NodeSet(nodes) if matches!(other, XPathValue::Boolean(_)) => {
            vec![Atom::Bool(!nodes.is_empty())]
        }
        XPathValue::NodeSet(nodes) => nodes.iter().map(|n| Atom::Str(n.string_value())).collect(),
        XPathValue::String(s) => vec![Atom::Str(s.clone())],
        XPathValue::Number(n) => vec![Atom::Num(*n)],
        XPathValue::Boolean(b) => vec![Atom::Bool(*b)],
    }
}

/// XPath 1.0 comparison: true if any pair drawn from the two operands satisfies `op`.
fn compare<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    let left_atoms = atoms(left, right);
    let right_atoms = atoms(right, left);
    left_atoms
        .iter()
        .any(|l| right_atoms.iter().any(|r| compare_atoms(op, l, r)))
}

fn compare_atoms(op: BinaryOperator, l: &Atom, r: &Atom) -> bool {
    use BinaryOperator::*;
    match op {
        Equals | NotEquals => {
            let eq = match (l, r) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => l.as_bool() == r.as_bool(),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => l.as_number() == r.as_number(),
                _ => l.as_string() == r.as_string(),
            };
            if op == Equals { eq } else { !eq }
        }
        LessThan => l.as_number() < r.as_number(),
        LessThanOrEqual => l.as_number() <= r.as_number(),
        GreaterThan => l.as_number() > r.as_number(),
        GreaterThanOrEqual => l.as_number() >= r.as_number(),
        _ => false,
    }
}

fn evaluate_union<'a, N: DataSourceNode<'a> + 'a>(
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    let XPathValue::NodeSet(l_nodes) = left else {
        return Err(XPathError::TypeError(
            "Left-hand side of '|' must be a node-set.".to_string(),
        ));
    };
    let XPathValue::NodeSet(r_nodes) = right else {
        return Err(XPathError::TypeError(
            "Right-hand side of '|' must be a node-set.".to_string(),
        ));
    };

    let mut merged = l_nodes;
    merged.extend(r_nodes);
    merged.sort();
    merged.dedup();
    Ok(XPathValue::NodeSet(merged))
}
