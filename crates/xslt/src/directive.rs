//! Classification of stylesheet nodes into directives.

use std::fmt;
use weft_dom::XmlNode;

/// The prefix that marks an element as a transformation directive.
pub const XSL_PREFIX: &str = "xsl";

/// What a stylesheet node asks the interpreter to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Anything outside the `xsl` prefix: copied through as output.
    Literal,
    ApplyTemplates,
    Attribute,
    CallTemplate,
    Choose,
    Comment,
    Copy,
    CopyOf,
    Element,
    ForEach,
    If,
    Otherwise,
    Output,
    Param,
    Sort,
    /// `xsl:stylesheet` or its synonym `xsl:transform`.
    Stylesheet,
    Template,
    Text,
    ValueOf,
    Variable,
    When,
    WithParam,
    /// A directive this interpreter does not implement, by local name.
    Unsupported(String),
}

impl Directive {
    pub fn of(node: XmlNode<'_>) -> Self {
        if !node.is_element() {
            return Directive::Literal;
        }
        match node.qname() {
            Some(name) if name.prefix.as_deref() == Some(XSL_PREFIX) => {
                Self::from_local_name(&name.local_part)
            }
            _ => Directive::Literal,
        }
    }

    pub fn from_local_name(name: &str) -> Self {
        match name {
            "apply-templates" => Directive::ApplyTemplates,
            "attribute" => Directive::Attribute,
            "call-template" => Directive::CallTemplate,
            "choose" => Directive::Choose,
            "comment" => Directive::Comment,
            "copy" => Directive::Copy,
            "copy-of" => Directive::CopyOf,
            "element" => Directive::Element,
            "for-each" => Directive::ForEach,
            "if" => Directive::If,
            "otherwise" => Directive::Otherwise,
            "output" => Directive::Output,
            "param" => Directive::Param,
            "sort" => Directive::Sort,
            "stylesheet" | "transform" => Directive::Stylesheet,
            "template" => Directive::Template,
            "text" => Directive::Text,
            "value-of" => Directive::ValueOf,
            "variable" => Directive::Variable,
            "when" => Directive::When,
            "with-param" => Directive::WithParam,
            other => Directive::Unsupported(other.to_string()),
        }
    }

    pub fn local_name(&self) -> &str {
        match self {
            Directive::Literal => "",
            Directive::ApplyTemplates => "apply-templates",
            Directive::Attribute => "attribute",
            Directive::CallTemplate => "call-template",
            Directive::Choose => "choose",
            Directive::Comment => "comment",
            Directive::Copy => "copy",
            Directive::CopyOf => "copy-of",
            Directive::Element => "element",
            Directive::ForEach => "for-each",
            Directive::If => "if",
            Directive::Otherwise => "otherwise",
            Directive::Output => "output",
            Directive::Param => "param",
            Directive::Sort => "sort",
            Directive::Stylesheet => "stylesheet",
            Directive::Template => "template",
            Directive::Text => "text",
            Directive::ValueOf => "value-of",
            Directive::Variable => "variable",
            Directive::When => "when",
            Directive::WithParam => "with-param",
            Directive::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Literal => f.write_str("literal"),
            other => write!(f, "{}:{}", XSL_PREFIX, other.local_name()),
        }
    }
}
