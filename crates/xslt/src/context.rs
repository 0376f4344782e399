//! Evaluation scopes for the interpreter.
//!
//! A [`Context`] is one frame in a chain of scopes. Frames borrow their parent,
//! so a child never outlives the frame it was cloned from, and variable lookup
//! walks the chain outwards.

use std::collections::HashMap;
use std::rc::Rc;
use weft_dom::XmlNode;
use weft_xpath1::{
    EvaluationContext, FunctionRegistry, ResultType, VariableResolver, XPathError, XPathValue,
    evaluate, parse_expression,
};

/// A typed expression result over document nodes.
pub type Value<'d> = XPathValue<XmlNode<'d>>;

pub struct Context<'p, 'd> {
    parent: Option<&'p Context<'p, 'd>>,
    /// The current node.
    pub node: XmlNode<'d>,
    /// Anchor for absolute paths.
    pub root_node: XmlNode<'d>,
    node_list: Rc<[XmlNode<'d>]>,
    /// 0-based index of `node` within the node list.
    pub position: usize,
    variables: HashMap<String, Value<'d>>,
    return_on_first_match: bool,
    case_insensitive: bool,
    functions: &'p FunctionRegistry,
    strict: bool,
}

impl<'p, 'd> Context<'p, 'd> {
    /// A root scope positioned on `node`, which also serves as the absolute root.
    pub fn new(node: XmlNode<'d>, functions: &'p FunctionRegistry) -> Self {
        Context {
            parent: None,
            node,
            root_node: node,
            node_list: Rc::from([node]),
            position: 0,
            variables: HashMap::new(),
            return_on_first_match: false,
            case_insensitive: false,
            functions,
            strict: false,
        }
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value<'d>>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// A child scope over the same focus.
    pub fn child(&self) -> Context<'_, 'd> {
        self.clone_with(None, None, None, None)
    }

    /// A child scope with any of node, root, position and node list replaced.
    /// Flags are inherited; variables start empty and fall back to this scope.
    pub fn clone_with(
        &self,
        node: Option<XmlNode<'d>>,
        root_node: Option<XmlNode<'d>>,
        position: Option<usize>,
        node_list: Option<Rc<[XmlNode<'d>]>>,
    ) -> Context<'_, 'd> {
        Context {
            parent: Some(self),
            node: node.unwrap_or(self.node),
            root_node: root_node.unwrap_or(self.root_node),
            node_list: node_list.unwrap_or_else(|| Rc::clone(&self.node_list)),
            position: position.unwrap_or(self.position),
            variables: HashMap::new(),
            return_on_first_match: self.return_on_first_match,
            case_insensitive: self.case_insensitive,
            functions: self.functions,
            strict: self.strict,
        }
    }

    pub fn node_list(&self) -> Rc<[XmlNode<'d>]> {
        Rc::clone(&self.node_list)
    }

    pub fn context_size(&self) -> usize {
        self.node_list.len()
    }

    /// Replaces the node list. The focus is left alone; follow with
    /// [`Context::set_node`] to reposition.
    pub fn set_node_list(&mut self, node_list: Rc<[XmlNode<'d>]>) {
        self.node_list = node_list;
    }

    /// Moves the focus to `position` in the node list. Out-of-range positions
    /// leave the context unchanged.
    pub fn set_node(&mut self, position: usize) {
        if let Some(&node) = self.node_list.get(position) {
            self.node = node;
            self.position = position;
        }
    }

    /// The nearest binding of `name`, searching outwards from this scope.
    pub fn get_variable(&self, name: &str) -> Option<&Value<'d>> {
        let mut scope = Some(self);
        while let Some(ctx) = scope {
            if let Some(value) = ctx.variables.get(name) {
                return Some(value);
            }
            scope = ctx.parent;
        }
        None
    }

    /// Binds `name` in this scope only.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value<'d>) {
        self.variables.insert(name.into(), value);
    }

    pub fn return_on_first_match(&self) -> bool {
        self.return_on_first_match
    }

    pub fn set_return_on_first_match(&mut self, value: bool) {
        self.return_on_first_match = value;
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn set_case_insensitive(&mut self, value: bool) {
        self.case_insensitive = value;
    }

    /// Parses and evaluates `expr` at the current node.
    pub fn eval(&self, expr: &str, result_type: ResultType) -> Result<Value<'d>, XPathError> {
        let parsed = parse_expression(expr)?;
        let e_ctx = EvaluationContext::new(
            self.node,
            self.root_node,
            self.functions,
            self.position + 1,
            self.context_size(),
            self,
            self.strict,
        );
        evaluate(&parsed, &e_ctx)?.coerce(result_type)
    }
}

impl<'d> VariableResolver<XmlNode<'d>> for Context<'_, 'd> {
    fn resolve(&self, name: &str) -> Option<Value<'d>> {
        self.get_variable(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::Document;

    fn sample() -> Document {
        Document::parse(r#"<all><item pos="2">A</item><item pos="3">B</item><item pos="1">C</item></all>"#)
            .unwrap()
    }

    fn s(value: &str) -> Value<'static> {
        XPathValue::String(value.to_string())
    }

    #[test]
    fn test_lookup_walks_to_outermost_scope() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let mut root = Context::new(doc.root(), &funcs);
        root.set_variable("x", s("outer"));

        let mut middle = root.child();
        middle.set_variable("y", s("middle"));
        let mut inner = middle.child();
        inner.set_variable("x", s("shadow"));

        assert_eq!(inner.get_variable("x"), Some(&s("shadow")));
        assert_eq!(inner.get_variable("y"), Some(&s("middle")));
        assert_eq!(middle.get_variable("x"), Some(&s("outer")));
        assert_eq!(inner.get_variable("missing"), None);
    }

    #[test]
    fn test_set_variable_never_reaches_parent() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let root = Context::new(doc.root(), &funcs);
        {
            let mut child = root.child();
            child.set_variable("x", s("local"));
            assert!(child.get_variable("x").is_some());
        }
        assert_eq!(root.get_variable("x"), None);
    }

    #[test]
    fn test_clone_with_overrides_and_inherits() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let mut root = Context::new(doc.root(), &funcs);
        root.set_case_insensitive(true);

        let all = doc.document_element().unwrap();
        let items: Rc<[XmlNode<'_>]> = all.children().into();
        let mut list_ctx = root.clone_with(Some(items[0]), None, Some(0), Some(items.clone()));
        assert!(list_ctx.case_insensitive());
        assert!(!list_ctx.return_on_first_match());
        assert_eq!(list_ctx.root_node, doc.root());
        assert_eq!(list_ctx.context_size(), 3);

        list_ctx.set_node(2);
        assert_eq!(list_ctx.node, items[2]);
        assert_eq!(list_ctx.position, 2);
        list_ctx.set_node(7);
        assert_eq!(list_ctx.position, 2);
    }

    #[test]
    fn test_eval_sees_focus_and_variables() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let mut root = Context::new(doc.root(), &funcs);
        root.set_variable("wanted", s("3"));

        let items: Rc<[XmlNode<'_>]> = doc.document_element().unwrap().children().into();
        let ctx = root.clone_with(Some(items[1]), None, Some(1), Some(items.clone()));

        assert_eq!(ctx.eval(".", ResultType::String).unwrap(), s("B"));
        assert_eq!(
            ctx.eval("position() = 2 and last() = 3", ResultType::Boolean).unwrap(),
            XPathValue::Boolean(true)
        );
        assert_eq!(
            ctx.eval("string(//item[@pos = $wanted])", ResultType::Any).unwrap(),
            s("B")
        );
        assert_eq!(
            ctx.eval("count(/all/item)", ResultType::Number).unwrap(),
            XPathValue::Number(3.0)
        );
    }

    #[test]
    fn test_root_override_anchors_absolute_paths() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let all = doc.document_element().unwrap();
        let ctx = Context::new(all, &funcs);

        assert_eq!(ctx.eval("count(/item)", ResultType::Number).unwrap(), XPathValue::Number(3.0));
    }

    #[test]
    fn test_strict_unbound_variable() {
        let doc = sample();
        let funcs = FunctionRegistry::default();
        let lenient = Context::new(doc.root(), &funcs);
        assert_eq!(
            lenient.eval("$nothing", ResultType::Any).unwrap(),
            XPathValue::NodeSet(vec![])
        );

        let strict = Context::new(doc.root(), &funcs).with_strict(true);
        assert!(matches!(
            strict.eval("$nothing", ResultType::Any),
            Err(XPathError::UnknownVariable(_))
        ));
    }
}
