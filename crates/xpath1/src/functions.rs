//! The XPath 1.0 core function library.
//!
//! Every built-in is a [`Function`] variant with a declared arity. Arity is
//! checked once in [`evaluate_function`]; the implementations then read their
//! already-evaluated arguments through a small cursor.

use crate::datasource::{DataSourceNode, NodeType};
use crate::engine::{EvaluationContext, XPathValue, string_to_number};
use crate::error::XPathError;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};

/// A function of the XPath 1.0 core library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Node-set
    Last,
    Position,
    Count,
    Id,
    LocalName,
    Name,
    GenerateId,
    // String
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    // Boolean
    Boolean,
    Not,
    True,
    False,
    Lang,
    // Number
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

const BUILTINS: &[(&str, Function)] = &[
    ("last", Function::Last),
    ("position", Function::Position),
    ("count", Function::Count),
    ("id", Function::Id),
    ("local-name", Function::LocalName),
    ("name", Function::Name),
    ("generate-id", Function::GenerateId),
    ("string", Function::String),
    ("concat", Function::Concat),
    ("starts-with", Function::StartsWith),
    ("contains", Function::Contains),
    ("substring-before", Function::SubstringBefore),
    ("substring-after", Function::SubstringAfter),
    ("substring", Function::Substring),
    ("string-length", Function::StringLength),
    ("normalize-space", Function::NormalizeSpace),
    ("translate", Function::Translate),
    ("boolean", Function::Boolean),
    ("not", Function::Not),
    ("true", Function::True),
    ("false", Function::False),
    ("lang", Function::Lang),
    ("number", Function::Number),
    ("sum", Function::Sum),
    ("floor", Function::Floor),
    ("ceiling", Function::Ceiling),
    ("round", Function::Round),
];

/// Node-type tests look like calls; they are only valid as location steps.
const NODE_TESTS: &[&str] = &["node", "text", "comment", "processing-instruction"];

impl Function {
    pub fn name(self) -> &'static str {
        BUILTINS
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Minimum and maximum argument counts; `None` is unbounded.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => (0, Some(0)),
            Self::LocalName
            | Self::Name
            | Self::GenerateId
            | Self::String
            | Self::StringLength
            | Self::NormalizeSpace
            | Self::Number => (0, Some(1)),
            Self::Count
            | Self::Id
            | Self::Boolean
            | Self::Not
            | Self::Lang
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => (1, Some(1)),
            Self::StartsWith | Self::Contains | Self::SubstringBefore | Self::SubstringAfter => {
                (2, Some(2))
            }
            Self::Substring => (2, Some(3)),
            Self::Translate => (3, Some(3)),
            Self::Concat => (2, None),
        }
    }

    fn check_arity(self, given: usize) -> Result<(), XPathError> {
        let (min, max) = self.arity();
        if given >= min && max.is_none_or(|max| given <= max) {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min && min == 1 => "Expected 1 argument".to_string(),
            Some(max) if max == min => format!("Expected {} arguments", min),
            Some(max) => format!("Expected {} or {} arguments", min, max),
            None => format!("Expected at least {} arguments", min),
        };
        Err(XPathError::FunctionError {
            function: format!("{}()", self.name()),
            message: expected,
        })
    }

    fn call<'a, 'd, N: DataSourceNode<'a>>(
        self,
        args: Vec<XPathValue<N>>,
        e_ctx: &EvaluationContext<'a, 'd, N>,
    ) -> Result<XPathValue<N>, XPathError> {
        let context = e_ctx.context_node;
        let mut args = Args {
            function: self,
            values: args.into_iter(),
        };
        let value = match self {
            Self::Last => XPathValue::Number(e_ctx.context_size as f64),
            Self::Position => XPathValue::Number(e_ctx.context_position as f64),
            Self::Count => XPathValue::Number(args.node_set()?.len() as f64),
            Self::Id => XPathValue::NodeSet(elements_by_id(&args.string(), e_ctx.root_node)),
            Self::LocalName => XPathValue::String(
                args.node_or(context)?
                    .and_then(|n| n.name())
                    .map(|q| q.local_part)
                    .unwrap_or_default(),
            ),
            Self::Name => XPathValue::String(
                args.node_or(context)?
                    .and_then(|n| n.name())
                    .map(|q| q.to_string())
                    .unwrap_or_default(),
            ),
            Self::GenerateId => {
                XPathValue::String(args.node_or(context)?.map(generate_id).unwrap_or_default())
            }

            Self::String => XPathValue::String(args.string_or(context)),
            Self::Concat => XPathValue::String(args.values.map(|v| v.to_string()).collect()),
            Self::StartsWith => {
                let (s, prefix) = (args.string(), args.string());
                XPathValue::Boolean(s.starts_with(&prefix))
            }
            Self::Contains => {
                let (s, needle) = (args.string(), args.string());
                XPathValue::Boolean(s.contains(&needle))
            }
            Self::SubstringBefore => {
                let (s, sep) = (args.string(), args.string());
                XPathValue::String(s.find(&sep).map(|i| s[..i].to_string()).unwrap_or_default())
            }
            Self::SubstringAfter => {
                let (s, sep) = (args.string(), args.string());
                XPathValue::String(
                    s.find(&sep)
                        .map(|i| s[i + sep.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Self::Substring => {
                let s = args.string();
                let start = args.number();
                let length = args.values.next().map(|v| v.to_number());
                XPathValue::String(substring(&s, start, length))
            }
            Self::StringLength => {
                XPathValue::Number(args.string_or(context).chars().count() as f64)
            }
            Self::NormalizeSpace => XPathValue::String(
                args.string_or(context)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Self::Translate => {
                let (s, from, to) = (args.string(), args.string(), args.string());
                XPathValue::String(translate(&s, &from, &to))
            }

            Self::Boolean => XPathValue::Boolean(args.value().to_bool()),
            Self::Not => XPathValue::Boolean(!args.value().to_bool()),
            Self::True => XPathValue::Boolean(true),
            Self::False => XPathValue::Boolean(false),
            Self::Lang => XPathValue::Boolean(in_language(context, &args.string())),

            Self::Number => XPathValue::Number(match args.values.next() {
                Some(v) => v.to_number(),
                None => string_to_number(&context.string_value()),
            }),
            Self::Sum => XPathValue::Number(
                args.node_set()?
                    .iter()
                    .map(|n| string_to_number(&n.string_value()))
                    .sum(),
            ),
            Self::Floor => XPathValue::Number(args.number().floor()),
            Self::Ceiling => XPathValue::Number(args.number().ceil()),
            Self::Round => XPathValue::Number(round(args.number())),
        };
        Ok(value)
    }
}

/// The functions an expression may call. Calls to anything else fail before
/// their arguments are inspected.
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Function>,
}

impl FunctionRegistry {
    /// An empty registry; every call fails.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, function: Function) {
        self.functions.insert(function.name(), function);
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for FunctionRegistry {
    /// The full XPath 1.0 core library.
    fn default() -> Self {
        let mut registry = Self::new();
        for (_, function) in BUILTINS {
            registry.register(*function);
        }
        registry
    }
}

/// Calls `name` with already-evaluated arguments.
pub fn evaluate_function<'a, 'd, N: DataSourceNode<'a>>(
    name: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<XPathValue<N>, XPathError> {
    if NODE_TESTS.contains(&name) {
        return Err(XPathError::FunctionError {
            function: name.to_string(),
            message: "This is a node-test, not a function.".to_string(),
        });
    }
    let function = e_ctx
        .functions
        .get(name)
        .ok_or_else(|| XPathError::FunctionError {
            function: name.to_string(),
            message: "Unknown XPath function".to_string(),
        })?;
    function.check_arity(args.len())?;
    function.call(args, e_ctx)
}

/// Reads arguments front to back. Arity is checked before a cursor exists, so
/// a missing required argument cannot occur; it reads as an empty node-set.
struct Args<N> {
    function: Function,
    values: std::vec::IntoIter<XPathValue<N>>,
}

impl<'a, N: DataSourceNode<'a>> Args<N> {
    fn value(&mut self) -> XPathValue<N> {
        self.values.next().unwrap_or(XPathValue::NodeSet(Vec::new()))
    }

    fn string(&mut self) -> String {
        self.value().to_string()
    }

    fn number(&mut self) -> f64 {
        self.value().to_number()
    }

    /// The next argument as a string, or the string value of `node`.
    fn string_or(&mut self, node: N) -> String {
        match self.values.next() {
            Some(v) => v.to_string(),
            None => node.string_value(),
        }
    }

    fn node_set(&mut self) -> Result<Vec<N>, XPathError> {
        match self.value() {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "{}() argument must be a node-set, got a {}",
                self.function.name(),
                other.type_name()
            ))),
        }
    }

    /// The first node in document order of the next argument, or `node`
    /// when the argument was omitted.
    fn node_or(&mut self, node: N) -> Result<Option<N>, XPathError> {
        if self.values.len() == 0 {
            return Ok(Some(node));
        }
        Ok(self.node_set()?.into_iter().min())
    }
}

fn elements_by_id<'a, N: DataSourceNode<'a>>(ids: &str, root: N) -> Vec<N> {
    let wanted: HashSet<&str> = ids.split_whitespace().collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut stack: Vec<N> = root.children().collect();
    while let Some(node) = stack.pop() {
        if node.node_type() == NodeType::Element
            && node
                .attributes()
                .any(|attr| is_id_attribute(attr) && wanted.contains(attr.string_value().as_str()))
        {
            found.push(node);
        }
        stack.extend(node.children());
    }
    found.sort();
    found
}

fn is_id_attribute<'a, N: DataSourceNode<'a>>(attr: N) -> bool {
    attr.name()
        .is_some_and(|q| matches!(q.prefix.as_deref(), None | Some("xml")) && q.local_part == "id")
}

/// Stable for the lifetime of the node; prefixed so it is a valid NCName.
fn generate_id<N: Hash>(node: N) -> String {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    format!("id{}", hasher.finish())
}

/// Whether the nearest `xml:lang` in scope equals `lang` or is a sublanguage of it.
fn in_language<'a, N: DataSourceNode<'a>>(node: N, lang: &str) -> bool {
    let lang = lang.to_lowercase();
    let mut current = if node.node_type() == NodeType::Element {
        Some(node)
    } else {
        node.parent()
    };
    while let Some(element) = current {
        let declared = element.attributes().find(|attr| {
            attr.name()
                .is_some_and(|q| q.prefix.as_deref() == Some("xml") && q.local_part == "lang")
        });
        if let Some(attr) = declared {
            let declared = attr.string_value().to_lowercase();
            return declared == lang
                || declared
                    .strip_prefix(&lang)
                    .is_some_and(|rest| rest.starts_with('-'));
        }
        current = element.parent();
    }
    false
}

/// Characters at 1-based positions in `[round(start), round(start) + round(length))`.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |l| first + round(l));
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= first && pos < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.chars().position(|f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

/// Halves round towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        n
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, MockTree, create_test_tree};
    use std::collections::HashMap;

    struct Fixture<'a> {
        tree: &'a MockTree,
        funcs: FunctionRegistry,
        vars: HashMap<String, XPathValue<MockNode<'a>>>,
    }

    impl<'a> Fixture<'a> {
        fn new(tree: &'a MockTree) -> Self {
            Fixture {
                tree,
                funcs: FunctionRegistry::default(),
                vars: HashMap::new(),
            }
        }

        fn node(&self, id: usize) -> MockNode<'a> {
            MockNode {
                id,
                tree: self.tree,
            }
        }

        fn at<'s>(&'s self, id: usize, pos: usize, size: usize) -> EvaluationContext<'a, 's, MockNode<'a>> {
            EvaluationContext::new(
                self.node(id),
                self.node(0),
                &self.funcs,
                pos,
                size,
                &self.vars,
                false,
            )
        }

        fn call(&self, name: &str, args: Vec<XPathValue<MockNode<'a>>>) -> XPathValue<MockNode<'a>> {
            evaluate_function(name, args, &self.at(0, 1, 1)).unwrap()
        }
    }

    fn s<'a>(value: &str) -> XPathValue<MockNode<'a>> {
        XPathValue::String(value.to_string())
    }

    fn n<'a>(value: f64) -> XPathValue<MockNode<'a>> {
        XPathValue::Number(value)
    }

    #[test]
    fn test_every_builtin_is_registered_under_its_name() {
        let registry = FunctionRegistry::default();
        for (name, function) in BUILTINS {
            assert_eq!(registry.get(name), Some(*function));
            assert_eq!(function.name(), *name);
        }
        assert!(!FunctionRegistry::new().contains("count"));
    }

    #[test]
    fn test_arity_errors() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let ctx = fx.at(0, 1, 1);
        let message = |name: &str, args| match evaluate_function(name, args, &ctx) {
            Err(XPathError::FunctionError { function, message }) => format!("{function}: {message}"),
            other => panic!("expected an arity error, got {other:?}"),
        };
        assert_eq!(message("concat", vec![s("lonely")]), "concat(): Expected at least 2 arguments");
        assert_eq!(message("count", vec![]), "count(): Expected 1 argument");
        assert_eq!(message("substring", vec![s("x")]), "substring(): Expected 2 or 3 arguments");
        assert_eq!(message("true", vec![s("x")]), "true(): Expected 0 arguments");
        assert_eq!(message("translate", vec![s("a"), s("b")]), "translate(): Expected 3 arguments");
    }

    #[test]
    fn test_unknown_function_and_node_tests() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let ctx = fx.at(0, 1, 1);
        assert_eq!(
            evaluate_function("format-number", vec![], &ctx).unwrap_err(),
            XPathError::FunctionError {
                function: "format-number".to_string(),
                message: "Unknown XPath function".to_string(),
            }
        );
        assert!(matches!(
            evaluate_function("text", vec![], &ctx),
            Err(XPathError::FunctionError { message, .. }) if message.contains("node-test")
        ));
    }

    #[test]
    fn test_string_functions() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        assert_eq!(
            fx.call("concat", vec![s("Hello"), s(" "), s("World"), n(42.0)]).to_string(),
            "Hello World42"
        );
        assert!(fx.call("starts-with", vec![s("abcdef"), s("abc")]).to_bool());
        assert!(!fx.call("starts-with", vec![s("abcdef"), s("def")]).to_bool());
        assert!(fx.call("contains", vec![s("abcdef"), s("cd")]).to_bool());
        assert_eq!(
            fx.call("substring-before", vec![s("1999/04/01"), s("/")]).to_string(),
            "1999"
        );
        assert_eq!(
            fx.call("substring-after", vec![s("1999/04/01"), s("/")]).to_string(),
            "04/01"
        );
        assert_eq!(fx.call("substring-after", vec![s("abc"), s("x")]).to_string(), "");
        assert_eq!(
            fx.call("normalize-space", vec![s("  leading \n and   \t trailing  ")]).to_string(),
            "leading and trailing"
        );
    }

    #[test]
    fn test_substring_rounding() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let sub = |args| fx.call("substring", args).to_string();
        assert_eq!(sub(vec![s("12345"), n(2.0), n(3.0)]), "234");
        assert_eq!(sub(vec![s("12345"), n(2.0)]), "2345");
        assert_eq!(sub(vec![s("12345"), n(1.5), n(2.6)]), "234");
        assert_eq!(sub(vec![s("12345"), n(0.0), n(3.0)]), "12");
        assert_eq!(sub(vec![s("12345"), n(f64::NAN), n(3.0)]), "");
        assert_eq!(sub(vec![s("12345"), n(-42.0), n(f64::INFINITY)]), "12345");
    }

    #[test]
    fn test_translate() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let tr = |a: &str, b: &str, c: &str| fx.call("translate", vec![s(a), s(b), s(c)]).to_string();
        assert_eq!(tr("BAR", "ABC", "abc"), "baR");
        assert_eq!(tr("12:30", "0123456789", "abcdefghij"), "bc:da");
        assert_eq!(tr("--aaa--", "abc-", "ABC"), "AAA");
    }

    #[test]
    fn test_context_defaults() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let para = fx.at(1, 1, 1);
        assert_eq!(evaluate_function("string-length", vec![], &para).unwrap().to_number(), 5.0);
        assert_eq!(evaluate_function("string", vec![], &para).unwrap().to_string(), "Hello");
        assert_eq!(evaluate_function("local-name", vec![], &para).unwrap().to_string(), "para");
        assert!(evaluate_function("number", vec![], &para).unwrap().to_number().is_nan());

        let text = fx.at(4, 1, 1);
        assert_eq!(evaluate_function("local-name", vec![], &text).unwrap().to_string(), "");
    }

    #[test]
    fn test_names_of_argument_nodes() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let lang = vec![XPathValue::NodeSet(vec![fx.node(3)])];
        assert_eq!(fx.call("name", lang.clone()).to_string(), "xml:lang");
        assert_eq!(fx.call("local-name", lang).to_string(), "lang");
        assert_eq!(fx.call("name", vec![XPathValue::NodeSet(vec![])]).to_string(), "");
        assert!(matches!(
            evaluate_function("name", vec![s("para")], &fx.at(0, 1, 1)),
            Err(XPathError::TypeError(_))
        ));
    }

    #[test]
    fn test_boolean_functions() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        assert!(!fx.call("not", vec![XPathValue::Boolean(true)]).to_bool());
        assert!(fx.call("not", vec![n(0.0)]).to_bool());
        assert!(fx.call("not", vec![s("")]).to_bool());
        assert_eq!(
            fx.call("boolean", vec![XPathValue::NodeSet(vec![])]),
            XPathValue::Boolean(false)
        );
    }

    #[test]
    fn test_lang_uses_nearest_declaration() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        // Text node 4 sits in a para declaring xml:lang="en"; div 6 declares nothing.
        let text = fx.at(4, 1, 1);
        let div = fx.at(6, 1, 1);
        assert!(evaluate_function("lang", vec![s("en")], &text).unwrap().to_bool());
        assert!(evaluate_function("lang", vec![s("EN")], &text).unwrap().to_bool());
        assert!(!evaluate_function("lang", vec![s("en-GB")], &text).unwrap().to_bool());
        assert!(!evaluate_function("lang", vec![s("en")], &div).unwrap().to_bool());
    }

    #[test]
    fn test_number_functions() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let num = |name: &str, v: f64| fx.call(name, vec![n(v)]).to_number();
        assert_eq!(fx.call("number", vec![s(" 7 ")]).to_number(), 7.0);
        assert_eq!(fx.call("number", vec![XPathValue::Boolean(true)]).to_number(), 1.0);
        assert_eq!(num("floor", 2.7), 2.0);
        assert_eq!(num("ceiling", 2.1), 3.0);
        assert_eq!(num("round", 2.5), 3.0);
        assert_eq!(num("round", 2.4), 2.0);
        assert_eq!(num("round", -2.5), -2.0);
        assert_eq!(num("round", -2.6), -3.0);
    }

    #[test]
    fn test_sum_and_count() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        // "Hello" and "p1" are not numbers.
        let words = vec![XPathValue::NodeSet(vec![fx.node(1), fx.node(2)])];
        assert!(fx.call("sum", words.clone()).to_number().is_nan());
        assert_eq!(fx.call("count", words).to_number(), 2.0);
        assert_eq!(fx.call("sum", vec![XPathValue::NodeSet(vec![])]).to_number(), 0.0);
        assert!(matches!(
            evaluate_function("sum", vec![n(1.0)], &fx.at(0, 1, 1)),
            Err(XPathError::TypeError(_))
        ));
    }

    #[test]
    fn test_position_and_last() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        let ctx = fx.at(1, 2, 5);
        assert_eq!(evaluate_function("last", vec![], &ctx).unwrap().to_number(), 5.0);
        assert_eq!(evaluate_function("position", vec![], &ctx).unwrap().to_number(), 2.0);
    }

    #[test]
    fn test_id_and_generate_id() {
        let tree = create_test_tree();
        let fx = Fixture::new(&tree);
        assert_eq!(
            fx.call("id", vec![s("nope p1")]),
            XPathValue::NodeSet(vec![fx.node(1)])
        );
        assert_eq!(fx.call("id", vec![s("  ")]), XPathValue::NodeSet(vec![]));

        let own = evaluate_function("generate-id", vec![], &fx.at(1, 1, 1)).unwrap().to_string();
        let same = fx.call("generate-id", vec![XPathValue::NodeSet(vec![fx.node(1)])]).to_string();
        let other = fx.call("generate-id", vec![XPathValue::NodeSet(vec![fx.node(8)])]).to_string();
        assert_eq!(own, same);
        assert_ne!(own, other);
        assert!(own.starts_with("id"));
        assert_eq!(fx.call("generate-id", vec![XPathValue::NodeSet(vec![])]).to_string(), "");
    }
}
