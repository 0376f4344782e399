//! Node collection along each XPath axis.
//!
//! [`collect`] returns nodes in proximity order: document order on forward
//! axes, nearest-first on reverse ones. Predicate positions are read straight
//! off that order.

use crate::ast::Axis;
use crate::datasource::{DataSourceNode, NodeType};
use std::iter;

pub fn collect<'a, N: DataSourceNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::Child => node.children().collect(),
        Axis::Attribute => node.attributes().collect(),
        Axis::SelfAxis => vec![node],
        Axis::Descendant => descendants(node),
        Axis::DescendantOrSelf => iter::once(node).chain(descendants(node)).collect(),
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node).collect(),
        Axis::AncestorOrSelf => iter::once(node).chain(ancestors(node)).collect(),
        Axis::FollowingSibling => siblings(node).map(|(_, after)| after).unwrap_or_default(),
        Axis::PrecedingSibling => siblings(node)
            .map(|(before, _)| before.into_iter().rev().collect())
            .unwrap_or_default(),
        Axis::Following => following(node),
        Axis::Preceding => preceding(node),
    }
}

fn ancestors<'a, N: DataSourceNode<'a>>(node: N) -> impl Iterator<Item = N> {
    iter::successors(node.parent(), |n| n.parent())
}

/// Pre-order walk below `node`, which is document order.
fn descendants<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        result.push(current);
        let len = stack.len();
        stack.extend(current.children());
        stack[len..].reverse();
    }
    result
}

/// The siblings before and after `node`, both in document order. Attributes
/// and parentless nodes have none.
fn siblings<'a, N: DataSourceNode<'a>>(node: N) -> Option<(Vec<N>, Vec<N>)> {
    if node.node_type() == NodeType::Attribute {
        return None;
    }
    let mut before: Vec<N> = node.parent()?.children().collect();
    let index = before.iter().position(|&c| c == node)?;
    let after = before.split_off(index + 1);
    before.truncate(index);
    Some((before, after))
}

/// An attribute stands in for its owner element, except that the owner's
/// content follows the attribute.
fn following<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    let start = if node.node_type() == NodeType::Attribute {
        let Some(owner) = node.parent() else {
            return result;
        };
        result.extend(descendants(owner));
        owner
    } else {
        node
    };

    for current in iter::once(start).chain(ancestors(start)) {
        if let Some((_, after)) = siblings(current) {
            for sibling in after {
                result.push(sibling);
                result.extend(descendants(sibling));
            }
        }
    }
    result
}

fn preceding<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut result = Vec::new();
    let start = if node.node_type() == NodeType::Attribute {
        let Some(owner) = node.parent() else {
            return result;
        };
        owner
    } else {
        node
    };

    for current in iter::once(start).chain(ancestors(start)) {
        if let Some((before, _)) = siblings(current) {
            for sibling in before.into_iter().rev() {
                result.extend(descendants(sibling).into_iter().rev());
                result.push(sibling);
            }
        }
    }
    result
}
