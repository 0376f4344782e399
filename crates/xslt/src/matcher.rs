//! Template `match` pattern testing.

use crate::context::Context;
use crate::error::XsltError;
use std::rc::Rc;
use weft_xpath1::{ResultType, XPathValue};

/// Tests whether the context node matches `pattern`.
///
/// The pattern is evaluated as a selection from the context node and then from
/// each of its ancestors in turn; the node matches as soon as one of those
/// selections contains it. Patterns such as `item` or `a//b` are relative to
/// some ancestor, not necessarily the parent.
pub fn matches(pattern: &str, ctx: &Context<'_, '_>) -> Result<bool, XsltError> {
    let mut candidate = Some(ctx.node);
    while let Some(node) = candidate {
        let probe = ctx.clone_with(Some(node), None, Some(0), Some(Rc::from([node])));
        if let XPathValue::NodeSet(selected) = probe.eval(pattern, ResultType::Any)?
            && selected.contains(&ctx.node)
        {
            return Ok(true);
        }
        candidate = node.parent();
    }
    Ok(false)
}
