//! Ordering of node lists by `xsl:sort` keys.

use crate::context::Context;
use crate::error::XsltError;
use std::cmp::Ordering;
use std::rc::Rc;
use weft_dom::XmlNode;
use weft_xpath1::ResultType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortType {
    Text,
    Number,
}

impl SortType {
    pub fn parse(data_type: &str) -> Result<Self, XsltError> {
        match data_type {
            "text" => Ok(SortType::Text),
            "number" => Ok(SortType::Number),
            other => Err(XsltError::UnsupportedSortType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Anything other than `descending` sorts ascending.
    pub fn parse(order: &str) -> Self {
        if order == "descending" {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

/// One `xsl:sort` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub expr: String,
    pub data_type: SortType,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Text(String),
    Number(f64),
}

impl SortKey {
    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // NaN sorts before every number.
            (SortKey::Number(a), SortKey::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            _ => Ordering::Equal,
        }
    }
}

struct Keyed<'d> {
    node: XmlNode<'d>,
    keys: Vec<SortKey>,
    position: usize,
}

/// Reorders the context's node list by `specs` and focuses the first node.
/// Without specs the list keeps its document order. Ties fall back to the
/// original position, so the result is stable.
pub fn sort(ctx: &mut Context<'_, '_>, specs: &[SortSpec]) -> Result<(), XsltError> {
    if specs.is_empty() {
        return Ok(());
    }

    let node_list = ctx.node_list();
    let mut keyed = Vec::with_capacity(node_list.len());
    for (position, &node) in node_list.iter().enumerate() {
        let probe = ctx.clone_with(Some(node), None, Some(0), Some(Rc::from([node])));
        let mut keys = Vec::with_capacity(specs.len());
        for spec in specs {
            let key = match spec.data_type {
                SortType::Text => {
                    SortKey::Text(probe.eval(&spec.expr, ResultType::String)?.to_string())
                }
                SortType::Number => {
                    SortKey::Number(probe.eval(&spec.expr, ResultType::Number)?.to_number())
                }
            };
            keys.push(key);
        }
        keyed.push(Keyed {
            node,
            keys,
            position,
        });
    }

    keyed.sort_by(|a, b| {
        for (spec, (ka, kb)) in specs.iter().zip(a.keys.iter().zip(&b.keys)) {
            let ord = ka.compare(kb);
            let ord = match spec.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.position.cmp(&b.position)
    });

    log::trace!("Sorted {} nodes by {} key(s)", keyed.len(), specs.len());
    let sorted: Rc<[XmlNode<'_>]> = keyed.into_iter().map(|k| k.node).collect();
    ctx.set_node_list(sorted);
    ctx.set_node(0);
    Ok(())
}
