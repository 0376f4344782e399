//! The evaluation engine for executing a parsed XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::functions::{self, FunctionRegistry};
use super::{axes, operators};
use crate::datasource::{DataSourceNode, NodeType};
use crate::error::XPathError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

/// The result type a caller asks for when evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    /// Whatever the expression naturally produces.
    #[default]
    Any,
    String,
    Number,
    Boolean,
    NodeSet,
}

impl<N> XPathValue<N> {
    /// A short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| string_to_number(&n.string_value()))
                .unwrap_or(f64::NAN),
        }
    }

    /// Converts the value into the requested result type. Only a node-set can
    /// satisfy a node-set request.
    pub fn coerce(self, result_type: ResultType) -> Result<Self, XPathError> {
        match result_type {
            ResultType::Any => Ok(self),
            ResultType::String => Ok(XPathValue::String(self.to_string())),
            ResultType::Number => Ok(XPathValue::Number(self.to_number())),
            ResultType::Boolean => Ok(XPathValue::Boolean(self.to_bool())),
            ResultType::NodeSet => match self {
                XPathValue::NodeSet(_) => Ok(self),
                other => Err(XPathError::TypeError(format!(
                    "expected a node-set, got a {}",
                    other.type_name()
                ))),
            },
        }
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.first().map(|n| n.string_value()).unwrap_or_default()
            ),
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Formats a number the way XPath's `string()` does: no trailing `.0`, no
/// exponent, and the special values spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Parses a string with the XPath `Number` production: optional whitespace, an
/// optional minus sign, and digits with at most one decimal point.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Supplies the values of `$name` references during evaluation.
pub trait VariableResolver<N> {
    fn resolve(&self, name: &str) -> Option<XPathValue<N>>;
}

impl<N: Clone> VariableResolver<N> for HashMap<String, XPathValue<N>> {
    fn resolve(&self, name: &str) -> Option<XPathValue<N>> {
        self.get(name).cloned()
    }
}

/// A container for all state needed during expression evaluation.
/// `'a` is the lifetime of the underlying data source.
/// `'d` is the lifetime of the borrowed registry and variable resolver.
pub struct EvaluationContext<'a, 'd, N: DataSourceNode<'a>> {
    pub context_node: N,
    /// Anchor for absolute paths. Usually the document root, but callers may
    /// substitute any node to evaluate against a virtual root.
    pub root_node: N,
    pub functions: &'d FunctionRegistry,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    pub variables: &'d dyn VariableResolver<N>,
    /// If true, references to unbound variables are errors.
    pub strict: bool,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DataSourceNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        functions: &'d FunctionRegistry,
        context_position: usize,
        context_size: usize,
        variables: &'d dyn VariableResolver<N>,
        strict: bool,
    ) -> Self {
        Self {
            context_node,
            root_node,
            functions,
            context_position,
            context_size,
            variables,
            strict,
            _marker: PhantomData,
        }
    }

    /// The same environment focused on another node, as used for predicates.
    fn with_focus(&self, context_node: N, context_position: usize, context_size: usize) -> Self {
        Self::new(
            context_node,
            self.root_node,
            self.functions,
            context_position,
            context_size,
            self.variables,
            self.strict,
        )
    }
}

/// Evaluates a compiled expression and returns a concrete `XPathValue`.
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, e_ctx)?;
            Ok(XPathValue::NodeSet(nodes))
        }
        Expression::Variable(name) => match e_ctx.variables.resolve(name) {
            Some(value) => Ok(value),
            None if e_ctx.strict => Err(XPathError::UnknownVariable(name.clone())),
            None => Ok(XPathValue::NodeSet(vec![])),
        },
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            // `and`/`or` only look at the right operand when they must.
            match op {
                BinaryOperator::And if !left_val.to_bool() => {
                    return Ok(XPathValue::Boolean(false));
                }
                BinaryOperator::Or if left_val.to_bool() => {
                    return Ok(XPathValue::Boolean(true));
                }
                _ => {}
            }
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
        Expression::Filter { expr, predicates } => match evaluate(expr, e_ctx)? {
            XPathValue::NodeSet(nodes) => Ok(XPathValue::NodeSet(apply_predicates(
                nodes, predicates, e_ctx,
            )?)),
            other => Err(XPathError::TypeError(format!(
                "predicates can only filter a node-set, got a {}",
                other.type_name()
            ))),
        },
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let initial_context = if let Some(start_expr) = &path.start_point {
        // The path starts from the result of another expression.
        match evaluate(start_expr, e_ctx)? {
            XPathValue::NodeSet(nodes) => nodes,
            // If the start expression doesn't evaluate to a node-set, the path is empty.
            _ => return Ok(vec![]),
        }
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    let mut current_nodes = initial_context;
    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates a single step for every context node: axis collection, node test and
/// predicates run per context node, then the results are merged in document order.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    for &node in context_nodes {
        let axis_nodes = axes::collect(step.axis, node);
        let tested_nodes = filter_by_node_test(&axis_nodes, &step.node_test, step.axis);
        for kept in apply_predicates(tested_nodes, &step.predicates, e_ctx)? {
            if seen.insert(kept) {
                results.push(kept);
            }
        }
    }
    if !results.is_sorted() {
        results.sort();
    }
    Ok(results)
}

/// Keeps the nodes that pass `test`.
fn filter_by_node_test<'a, N>(nodes: &[N], test: &NodeTest, axis: Axis) -> Vec<N>
where
    N: DataSourceNode<'a> + 'a,
{
    // The principal node type: attributes on the attribute axis, elements elsewhere.
    let principal = match axis {
        Axis::Attribute => NodeType::Attribute,
        _ => NodeType::Element,
    };
    nodes
        .iter()
        .filter(|&node| match test {
            NodeTest::Wildcard => node.node_type() == principal,
            NodeTest::Name(name_to_test) => {
                node.node_type() == principal
                    && node.name().is_some_and(|q_name| q_name.matches(name_to_test))
            }
            NodeTest::NodeType(ntt) => match ntt {
                NodeTypeTest::Text => node.node_type() == NodeType::Text,
                NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
                NodeTypeTest::ProcessingInstruction => {
                    node.node_type() == NodeType::ProcessingInstruction
                }
                NodeTypeTest::Node => true,
            },
        })
        .copied()
        .collect()
}

/// Applies predicates in turn; positions come from the order of `nodes`.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut final_nodes = nodes;
    for predicate in predicates {
        let mut predicate_results = Vec::new();
        let context_size = final_nodes.len();
        for (i, node) in final_nodes.iter().enumerate() {
            let predicate_e_ctx = e_ctx.with_focus(*node, i + 1, context_size);
            let result = evaluate(predicate, &predicate_e_ctx)?;
            let keep = match result {
                XPathValue::Number(n) => n == (i + 1) as f64,
                _ => result.to_bool(),
            };
            if keep {
                predicate_results.push(*node);
            }
        }
        final_nodes = predicate_results;
    }
    Ok(final_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, MockTree, create_test_tree};
    use crate::parser::parse_expression;
    use std::collections::HashMap;

    type Vars<'a> = HashMap<String, XPathValue<MockNode<'a>>>;

    fn eval<'a>(tree: &'a MockTree, vars: &Vars<'a>, context_id: usize, expr: &str) -> XPathValue<MockNode<'a>> {
        let funcs = FunctionRegistry::default();
        let root = MockNode { id: 0, tree };
        let node = MockNode { id: context_id, tree };
        let e_ctx = EvaluationContext::new(node, root, &funcs, 1, 1, vars, false);
        evaluate(&parse_expression(expr).unwrap(), &e_ctx).unwrap()
    }

    fn ids(value: XPathValue<MockNode<'_>>) -> Vec<usize> {
        match value {
            XPathValue::NodeSet(nodes) => nodes.iter().map(|n| n.id).collect(),
            other => panic!("Expected a NodeSet, got {:?}", other),
        }
    }

    #[test]
    fn test_node_tests_use_the_principal_node_type() {
        let tree = create_test_tree();
        let node = |id| MockNode { id, tree: &tree };

        let all_nodes = vec![node(0), node(1), node(2), node(4)];
        let elements = filter_by_node_test(&all_nodes, &NodeTest::Wildcard, Axis::Child);
        assert_eq!(elements, vec![node(1)]);
        let para_nodes =
            filter_by_node_test(&all_nodes, &NodeTest::Name("para".to_string()), Axis::Child);
        assert_eq!(para_nodes, vec![node(1)]);
        let text_nodes = filter_by_node_test(
            &all_nodes,
            &NodeTest::NodeType(NodeTypeTest::Text),
            Axis::Child,
        );
        assert_eq!(text_nodes, vec![node(4)]);

        let attributes = filter_by_node_test(&all_nodes, &NodeTest::Wildcard, Axis::Attribute);
        assert_eq!(attributes, vec![node(2)]);
    }

    #[test]
    fn test_ancestor_or_self() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 4, "ancestor-or-self::node()")), vec![0, 1, 4]);
        assert_eq!(ids(eval(&tree, &vars, 4, "ancestor-or-self::*[1]")), vec![1]);
    }

    #[test]
    fn test_predicate_by_attribute() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 0, "child::para[@id='p1']")), vec![1]);
    }

    #[test]
    fn test_predicate_by_position() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 0, "child::para[1]")), vec![1]);
        assert_eq!(ids(eval(&tree, &vars, 0, "para[position()=2]")), vec![8]);
        assert_eq!(ids(eval(&tree, &vars, 0, "para[last()]")), vec![8]);
    }

    #[test]
    fn test_predicates_apply_per_context_node() {
        let tree = create_test_tree();
        let vars = Vars::new();
        // Each para has exactly one text child, so [1] keeps both.
        assert_eq!(ids(eval(&tree, &vars, 0, "para/text()[1]")), vec![4, 9]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 8, "preceding-sibling::*[1]")), vec![6]);
        assert_eq!(ids(eval(&tree, &vars, 9, "ancestor::node()[1]")), vec![8]);
    }

    #[test]
    fn test_descendant_results_in_document_order() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 0, "//text()")), vec![4, 9]);
        assert_eq!(ids(eval(&tree, &vars, 4, "//para")), vec![1, 8]);
    }

    #[test]
    fn test_parent_and_self_abbreviations() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 4, "..")), vec![1]);
        assert_eq!(ids(eval(&tree, &vars, 4, ".")), vec![4]);
        assert_eq!(ids(eval(&tree, &vars, 2, "../@*")), vec![2, 3]);
    }

    #[test]
    fn test_prefixed_name_test() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 1, "@xml:lang")), vec![3]);
        assert_eq!(ids(eval(&tree, &vars, 1, "@lang")), vec![3]);
        assert!(ids(eval(&tree, &vars, 1, "@foo:lang")).is_empty());
    }

    #[test]
    fn test_variable_evaluation() {
        let tree = create_test_tree();
        let mut vars = Vars::new();
        vars.insert(
            "myVar".to_string(),
            XPathValue::String("test-value".to_string()),
        );
        assert_eq!(eval(&tree, &vars, 0, "$myVar").to_string(), "test-value");
    }

    #[test]
    fn test_unbound_variable_is_empty_node_set() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert!(ids(eval(&tree, &vars, 0, "$missing")).is_empty());
    }

    #[test]
    fn test_unbound_variable_in_strict_mode() {
        let tree = create_test_tree();
        let funcs = FunctionRegistry::default();
        let vars = Vars::new();
        let root = MockNode { id: 0, tree: &tree };
        let e_ctx = EvaluationContext::new(root, root, &funcs, 1, 1, &vars, true);
        let err = evaluate(&parse_expression("$missing").unwrap(), &e_ctx).unwrap_err();
        assert_eq!(err, XPathError::UnknownVariable("missing".to_string()));
    }

    #[test]
    fn test_path_from_variable_node_set() {
        let tree = create_test_tree();
        let mut vars = Vars::new();
        let para_node = MockNode { id: 1, tree: &tree };
        vars.insert(
            "para_node".to_string(),
            XPathValue::NodeSet(vec![para_node]),
        );

        let result = eval(&tree, &vars, 0, "$para_node/text()");
        if let XPathValue::NodeSet(nodes) = result {
            assert_eq!(nodes.len(), 1);
            assert_eq!(nodes[0].id, 4);
            assert_eq!(nodes[0].string_value(), "Hello");
        } else {
            panic!("Expected a NodeSet");
        }
    }

    #[test]
    fn test_filter_expression() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert_eq!(ids(eval(&tree, &vars, 0, "(para|div)[2]")), vec![6]);
    }

    #[test]
    fn test_root_override_anchors_absolute_paths() {
        let tree = create_test_tree();
        let funcs = FunctionRegistry::default();
        let vars = Vars::new();
        let para = MockNode { id: 8, tree: &tree };
        let e_ctx = EvaluationContext::new(para, para, &funcs, 1, 1, &vars, false);
        let result = evaluate(&parse_expression("/text()").unwrap(), &e_ctx).unwrap();
        assert_eq!(ids(result), vec![9]);
    }

    #[test]
    fn test_short_circuit_skips_failing_operand() {
        let tree = create_test_tree();
        let vars = Vars::new();
        assert!(eval(&tree, &vars, 0, "true() or no-such-function()").to_bool());
        assert!(!eval(&tree, &vars, 0, "false() and no-such-function()").to_bool());
    }

    #[test]
    fn test_number_formatting_and_parsing() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(string_to_number(" 42 "), 42.0);
        assert_eq!(string_to_number("-.5"), -0.5);
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("").is_nan());
    }

    #[test]
    fn test_coerce_to_requested_type() {
        let tree = create_test_tree();
        let vars = Vars::new();
        let value = eval(&tree, &vars, 0, "count(para)");
        assert_eq!(
            value.clone().coerce(ResultType::String).unwrap(),
            XPathValue::String("2".to_string())
        );
        assert!(value.coerce(ResultType::NodeSet).is_err());
    }
}
