//! The template interpreter: walks stylesheet nodes and writes output nodes.

use crate::avt;
use crate::context::{Context, Value};
use crate::copy::{copy_node, copy_of};
use crate::directive::Directive;
use crate::error::XsltError;
use crate::matcher;
use crate::sort::{self, SortOrder, SortSpec, SortType};
use std::rc::Rc;
use weft_dom::{NodeKind, XmlNode, xml_value};
use weft_xpath1::{ResultType, XPathValue};

/// Processes one stylesheet node against `ctx`, appending results to `output`.
pub(crate) fn process<'d>(
    ctx: &mut Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let directive = Directive::of(template);
    log::trace!("{} at {:?}", directive, ctx.node);

    match &directive {
        Directive::Literal => pass_through(ctx, template, output),
        Directive::Stylesheet => process_children(ctx, template, output),
        Directive::Template => {
            if let Some(pattern) = attribute(template, "match").filter(|p| !p.is_empty())
                && matcher::matches(&pattern, ctx)?
            {
                process_children(ctx, template, output)?;
            }
            Ok(())
        }
        Directive::ApplyTemplates => apply_templates(ctx, template, output),
        Directive::CallTemplate => call_template(ctx, template, output),
        Directive::ForEach => for_each(ctx, template, output),
        Directive::If => {
            let test = attribute(template, "test").unwrap_or_default();
            if ctx.eval(&test, ResultType::Boolean)?.to_bool() {
                process_children(ctx, template, output)?;
            }
            Ok(())
        }
        Directive::Choose => choose(ctx, template, output),
        Directive::Variable => {
            let (name, value) = binding(ctx, template, output)?;
            ctx.set_variable(name, value);
            Ok(())
        }
        Directive::Param => {
            let (name, value) = binding(ctx, template, output)?;
            if is_unset(ctx.get_variable(&name)) {
                ctx.set_variable(name, value);
            }
            Ok(())
        }
        Directive::ValueOf => {
            let select = attribute(template, "select").unwrap_or_default();
            let text = ctx.eval(&select, ResultType::String)?.to_string();
            output.append_child(output.document().create_text(&text))?;
            Ok(())
        }
        Directive::Text => {
            let text = xml_value(template);
            output.append_child(output.document().create_text(&text))?;
            Ok(())
        }
        Directive::Copy => {
            if let Some(element) = copy_node(output, ctx.node)? {
                process_children(ctx, template, element)?;
            }
            Ok(())
        }
        Directive::CopyOf => {
            let select = attribute(template, "select").unwrap_or_default();
            match ctx.eval(&select, ResultType::Any)? {
                XPathValue::NodeSet(nodes) => {
                    for node in nodes {
                        copy_of(output, node)?;
                    }
                }
                scalar => {
                    let text = scalar.to_string();
                    output.append_child(output.document().create_text(&text))?;
                }
            }
            Ok(())
        }
        Directive::Element => {
            let name = avt::expand(&attribute(template, "name").unwrap_or_default(), ctx)?;
            let element = output.document().create_element(&name);
            output.append_child(element)?;
            process_children(ctx, template, element)
        }
        Directive::Attribute => {
            let name = avt::expand(&attribute(template, "name").unwrap_or_default(), ctx)?;
            let value = build_text(ctx, template, output)?;
            if !output.is_element() {
                return Err(XsltError::NotAnElement {
                    name,
                    kind: output.kind().to_string(),
                });
            }
            output.set_attribute(&name, &value)?;
            Ok(())
        }
        Directive::Comment => {
            let text = build_text(ctx, template, output)?;
            output.append_child(output.document().create_comment(&text))?;
            Ok(())
        }
        // Sort keys are read by the owning for-each/apply-templates; output
        // settings belong to the serializer.
        Directive::Sort | Directive::Output => Ok(()),
        Directive::When | Directive::Otherwise | Directive::WithParam => {
            Err(XsltError::Misplaced(directive.local_name().to_string()))
        }
        Directive::Unsupported(name) => Err(XsltError::NotImplemented(name.clone())),
    }
}

/// Processes the children of `template` in a fresh child scope, so variables
/// they declare are visible to later siblings only.
fn process_children<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let mut scope = ctx.child();
    for child in template.children() {
        if is_xml_declaration(child) {
            continue;
        }
        process(&mut scope, child, output)?;
    }
    Ok(())
}

fn pass_through<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let doc = output.document();
    match template.kind() {
        NodeKind::Text | NodeKind::CData => {
            if retains_text(template) {
                output.append_child(doc.create_text(&template.value()))?;
            }
            Ok(())
        }
        NodeKind::Element => {
            let element = doc.create_element(&template.qualified_name());
            for attr in template.attributes() {
                let value = avt::expand(&attr.value(), ctx)?;
                element.set_attribute(&attr.qualified_name(), &value)?;
            }
            output.append_child(element)?;
            process_children(ctx, template, element)
        }
        // Includes the stylesheet document node itself.
        _ => process_children(ctx, template, output),
    }
}

fn apply_templates<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let nodes = match attribute(template, "select").filter(|s| !s.is_empty()) {
        Some(select) => node_set(ctx.eval(&select, ResultType::NodeSet)?),
        None => ctx.node.children(),
    };
    let params = with_params(ctx, template, output)?;
    let Some(&first) = nodes.first() else {
        return Ok(());
    };
    let mut sort_ctx = ctx.clone_with(Some(first), None, Some(0), Some(Rc::from(nodes)));
    for (name, value) in params {
        sort_ctx.set_variable(name, value);
    }
    sort::sort(&mut sort_ctx, &sort_specs(template)?)?;

    let mode = attribute(template, "mode").filter(|m| !m.is_empty());
    let templates: Vec<XmlNode<'_>> = top_level_templates(template)
        .into_iter()
        .filter(|t| attribute(*t, "mode").filter(|m| !m.is_empty()) == mode)
        .collect();
    log::debug!(
        "apply-templates over {} nodes with {} candidate templates (mode {:?})",
        sort_ctx.context_size(),
        templates.len(),
        mode
    );

    let node_list = sort_ctx.node_list();
    for (position, &node) in node_list.iter().enumerate() {
        for &candidate in &templates {
            let mut node_ctx = sort_ctx.clone_with(Some(node), None, Some(position), None);
            process(&mut node_ctx, candidate, output)?;
        }
    }
    Ok(())
}

fn call_template<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let name = attribute(template, "name").unwrap_or_default();
    let target = top_level_templates(template)
        .into_iter()
        .find(|t| attribute(*t, "name").as_deref() == Some(name.as_str()))
        .ok_or_else(|| XsltError::UnknownTemplate(name.clone()))?;

    let params = with_params(ctx, template, output)?;
    let mut param_ctx = ctx.child();
    for (param, value) in params {
        param_ctx.set_variable(param, value);
    }
    log::debug!("call-template '{}'", name);
    process_children(&param_ctx, target, output)
}

fn for_each<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    let select = attribute(template, "select").unwrap_or_default();
    let nodes = node_set(ctx.eval(&select, ResultType::NodeSet)?);
    let Some(&first) = nodes.first() else {
        return Ok(());
    };

    let mut sort_ctx = ctx.clone_with(Some(first), None, Some(0), Some(Rc::from(nodes)));
    sort::sort(&mut sort_ctx, &sort_specs(template)?)?;

    let node_list = sort_ctx.node_list();
    for (position, &node) in node_list.iter().enumerate() {
        let iteration = sort_ctx.clone_with(Some(node), None, Some(position), None);
        process_children(&iteration, template, output)?;
    }
    Ok(())
}

fn choose<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(), XsltError> {
    for branch in template.children() {
        match Directive::of(branch) {
            Directive::When => {
                let test = attribute(branch, "test").unwrap_or_default();
                if ctx.eval(&test, ResultType::Boolean)?.to_bool() {
                    return process_children(ctx, branch, output);
                }
            }
            Directive::Otherwise => return process_children(ctx, branch, output),
            _ => {}
        }
    }
    Ok(())
}

/// The name and value declared by a variable, param or with-param element.
/// Content wins over `select`; content is built into a fragment of the
/// output document and bound as a one-node node-set.
fn binding<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<(String, Value<'d>), XsltError> {
    let name = attribute(template, "name").unwrap_or_default();
    let value = if !template.children().is_empty() {
        let fragment = output.document().create_fragment();
        process_children(ctx, template, fragment)?;
        XPathValue::NodeSet(vec![fragment])
    } else if let Some(select) = attribute(template, "select").filter(|s| !s.is_empty()) {
        ctx.eval(&select, ResultType::Any)?
    } else {
        XPathValue::String(String::new())
    };
    Ok((name, value))
}

/// Values of the `xsl:with-param` children of `template`, evaluated in `ctx`.
fn with_params<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<Vec<(String, Value<'d>)>, XsltError> {
    let mut params = Vec::new();
    for child in template.children() {
        if Directive::of(child) == Directive::WithParam {
            params.push(binding(ctx, child, output)?);
        }
    }
    Ok(params)
}

fn sort_specs(template: XmlNode<'_>) -> Result<Vec<SortSpec>, XsltError> {
    let mut specs = Vec::new();
    for child in template.children() {
        if Directive::of(child) == Directive::Sort {
            let data_type = attribute(child, "data-type").filter(|t| !t.is_empty());
            let order = attribute(child, "order").unwrap_or_default();
            specs.push(SortSpec {
                expr: attribute(child, "select").unwrap_or_default(),
                data_type: SortType::parse(data_type.as_deref().unwrap_or("text"))?,
                order: SortOrder::parse(&order),
            });
        }
    }
    Ok(specs)
}

/// A param keeps an existing binding unless it is absent or the empty string.
fn is_unset(value: Option<&Value<'_>>) -> bool {
    match value {
        None => true,
        Some(XPathValue::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Builds the children of `template` into a scratch fragment and returns its text.
fn build_text<'d>(
    ctx: &Context<'_, 'd>,
    template: XmlNode<'_>,
    output: XmlNode<'d>,
) -> Result<String, XsltError> {
    let fragment = output.document().create_fragment();
    process_children(ctx, template, fragment)?;
    Ok(xml_value(fragment))
}

/// The `xsl:template` elements directly under the stylesheet element.
fn top_level_templates<'t>(node: XmlNode<'t>) -> Vec<XmlNode<'t>> {
    let root = node.root();
    let top = if root.kind() == NodeKind::Document {
        root.document().document_element()
    } else {
        Some(root)
    };
    top.map(|top| {
        top.children()
            .into_iter()
            .filter(|c| Directive::of(*c) == Directive::Template)
            .collect()
    })
    .unwrap_or_default()
}

fn node_set<'d>(value: Value<'d>) -> Vec<XmlNode<'d>> {
    match value {
        XPathValue::NodeSet(nodes) => nodes,
        _ => Vec::new(),
    }
}

/// Reads a stylesheet attribute, decoding any entity references the parser
/// left in place.
fn attribute(node: XmlNode<'_>, name: &str) -> Option<String> {
    node.attribute(name).map(|raw| decode_entities(&raw))
}

fn decode_entities(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            log::warn!("Keeping attribute value {:?} undecoded: {}", raw, err);
            raw.to_string()
        }
    }
}

/// Whether a whitespace-only stylesheet text node is kept.
fn retains_text(node: XmlNode<'_>) -> bool {
    if node.value().chars().any(|c| !c.is_whitespace()) {
        return true;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    if Directive::of(parent) == Directive::Text {
        return true;
    }
    let mut current = Some(parent);
    while let Some(element) = current.filter(|n| n.is_element()) {
        match element.attribute("xml:space").as_deref() {
            Some("default") => return false,
            Some("preserve") => return true,
            _ => {}
        }
        current = element.parent();
    }
    false
}

/// Processing instructions whose target starts with `xml`.
fn is_xml_declaration(node: XmlNode<'_>) -> bool {
    node.kind() == NodeKind::ProcessingInstruction
        && node.qualified_name().starts_with("xml")
}
