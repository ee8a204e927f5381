//! Small helpers over the scraper/ego-tree document
//!
//! Mutation always follows the same shape: walk the tree and collect
//! `NodeId`s, then detach them in a second pass. Detached subtrees stay in
//! the arena but are unreachable from the root, so they never serialize.

use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};

/// Parses a selector that is known to be valid
///
/// Used for the handful of fixed tag selectors in this module tree. Config
/// selectors are validated at load time and go through [`try_selector`].
pub(crate) fn selector(css: &str) -> Selector {
    match Selector::parse(css) {
        Ok(sel) => sel,
        Err(e) => panic!("BUG: hardcoded CSS selector '{css}' is invalid: {e}"),
    }
}

/// Parses a user-supplied selector
pub(crate) fn try_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Detaches every node in `ids` from the tree
///
/// Ids already detached (or nested inside an earlier one) are harmless.
pub(crate) fn detach_all(html: &mut Html, ids: &[NodeId]) -> usize {
    let mut count = 0;
    for id in ids {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
            count += 1;
        }
    }
    count
}

/// Replaces a node (and its subtree) with a single text node
pub(crate) fn replace_with_text(html: &mut Html, id: NodeId, text: &str) {
    if let Some(mut node) = html.tree.get_mut(id) {
        node.insert_before(Node::Text(Text { text: text.into() }));
        node.detach();
    }
}

/// Returns the element's visible text, concatenated without separators
pub(crate) fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

/// Returns the element's visible text with whitespace runs collapsed
pub(crate) fn normalized_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the element's visible text, trimmed
pub(crate) fn trimmed_text(el: &ElementRef) -> String {
    text_of(el).trim().to_string()
}

/// Returns the raw `class` attribute, or an empty string
pub(crate) fn class_attr<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("class").unwrap_or("")
}

/// Returns true if the `class` attribute contains any of `markers` as a substring
pub(crate) fn class_contains_any(el: &ElementRef, markers: &[String]) -> bool {
    let class = class_attr(el).to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && class.contains(&m.to_lowercase()))
}

/// Returns true if `ancestor` is `node` or one of its ancestors
pub(crate) fn is_within(html: &Html, node: NodeId, ancestor: NodeId) -> bool {
    if node == ancestor {
        return true;
    }
    html.tree
        .get(node)
        .map(|n| n.ancestors().any(|a| a.id() == ancestor))
        .unwrap_or(false)
}
