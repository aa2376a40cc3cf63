//! Resolution of the font families actually in use by a document.

use crate::dom::dom_tree::{Document, ElementNode, Node};
use std::collections::HashSet;

/// Computed-style capability. The core never sniffs its environment for a
/// style engine; whoever owns one injects it on the document, and a
/// document without one is treated as unrendered.
pub trait StyleQuery {
    /// The computed `font-family` value for the element, e.g.
    /// `"Open Sans", sans-serif`. `None` or an empty string both mean the
    /// engine has nothing for this element.
    fn font_family(&self, elem: &ElementNode) -> Option<String>;
}

/// A document is rendered iff a computed-style query on its root element
/// yields a non-empty `font-family`. This is a proxy signal separating a
/// mounted document from one merely parsed from text.
pub fn is_rendered(document: &Document) -> bool {
    let query = document.style_query.borrow();
    let Some(query) = query.as_ref() else {
        return false;
    };
    let Some(root) = document.root_element() else {
        return false;
    };
    let family = match &*root.borrow() {
        Node::Element(elem) => query.font_family(elem),
        _ => None,
    };
    family.is_some_and(|f| !f.is_empty())
}

/// The set of font families rendered somewhere in the document: every
/// element's computed `font-family`, split on commas and normalized.
/// Empty for an unrendered document, where usage cannot be determined.
pub fn resolve_families(document: &Document) -> HashSet<String> {
    let mut families = HashSet::new();
    if !is_rendered(document) {
        return families;
    }
    let query = document.style_query.borrow();
    let Some(query) = query.as_ref() else {
        return families;
    };
    document.for_each_element(&mut |_, elem| {
        let Some(family) = query.font_family(elem) else {
            return;
        };
        if family.is_empty() {
            return;
        }
        for entry in family.split(',') {
            let name = sanitize_family(entry);
            if !name.is_empty() {
                families.insert(name);
            }
        }
    });
    families
}

/// Trims a family name and strips one layer of surrounding double quotes.
pub fn sanitize_family(family: &str) -> String {
    let trimmed = family.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.to_string(),
        None => trimmed.to_string(),
    }
}
