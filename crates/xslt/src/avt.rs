//! Attribute value templates: `{expr}` placeholders inside attribute text.

use crate::context::Context;
use crate::error::XsltError;
use weft_xpath1::ResultType;

/// Expands every `{expr}` in `raw`, left to right. A `{` with no closing `}`
/// is kept as literal text.
pub fn expand(raw: &str, ctx: &Context<'_, '_>) -> Result<String, XsltError> {
    let mut parts = raw.split('{');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        match part.split_once('}') {
            Some((expr, rest)) => {
                out.push_str(&ctx.eval(expr, ResultType::String)?.to_string());
                out.push_str(rest);
            }
            None => {
                log::warn!("Unterminated '{{' in attribute value template: {:?}", raw);
                out.push('{');
                out.push_str(part);
            }
        }
    }
    Ok(out)
}
