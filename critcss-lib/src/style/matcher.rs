//! Selector parsing and element matching.
//!
//! This is deliberately not a full CSS selector engine. It understands
//! selector lists, compound selectors (tag, `#id`, `.class`, attribute
//! conditions) and the descendant/child combinators, which is enough to
//! answer the one question the selection engine asks: does at least one
//! element in the document structurally match this selector? Sibling
//! combinators degrade toward inclusion; a selector with nothing
//! queryable at all (a bare `::before`) matches nothing, as a host
//! selector engine would report.

use crate::dom::dom_tree::{Document, ElementNode, Handle, Node};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Pseudo-class/pseudo-element tokens, arguments included. Anchored on a
/// preceding word character so the token can be dropped while the
/// queryable part of the selector survives (`a:hover` -> `a`).
static PSEUDO_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w):+[a-z0-9_-]+(\([^)]*\))?").expect("valid pattern")
});

/// Removes pseudo-selector tokens from a selector so it can be used for
/// plain element lookup.
///
/// Contract: purely textual; the result may match more elements than the
/// input would (a `:hover` rule matches every candidate element), never
/// fewer. Pseudo tokens with no preceding word character (`::before` on
/// its own) are left in place and will simply match nothing.
pub fn strip_pseudo_selectors(selector: &str) -> String {
    PSEUDO_TOKEN.replace_all(selector, "$1").into_owned()
}

/// Supported attribute selector operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

/// One attribute condition. `operator == None` means existence only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: Option<AttributeOperator>,
    pub value: Option<String>,
}

/// A compound selector: optional tag, id, classes, attribute conditions.
/// `universal` records an explicit `*`; a compound with no constraints at
/// all and no `*` came from an unrecognized token and matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: HashSet<String>,
    pub attributes: Vec<AttributeSelector>,
    pub universal: bool,
}

/// Supported combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Adjacent sibling combinator (`+`).
    AdjacentSibling,
    /// General sibling combinator (`~`).
    GeneralSibling,
}

/// A complex selector: the key compound selector plus ancestor parts in
/// right-to-left order (nearest constraint first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub key: CompoundSelector,
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

/// Parses one complex selector; on a degenerate input the whole string is
/// treated as a single compound selector.
pub fn parse_selector(selector: &str) -> ComplexSelector {
    parse_complex_selector(selector).unwrap_or_else(|| ComplexSelector {
        key: parse_compound_selector(selector),
        ancestors: Vec::new(),
    })
}

/// Parses a compound selector string, e.g. `div.red#header[data-kind~="x"]`.
pub fn parse_compound_selector(selector: &str) -> CompoundSelector {
    let mut tag = None;
    let mut id = None;
    let mut classes = HashSet::new();
    let mut attributes = Vec::new();
    let mut universal = false;
    let mut chars = selector.chars().peekable();
    let mut buffer = String::new();

    if let Some(&ch) = chars.peek() {
        if ch.is_alphabetic() || ch == '*' {
            while let Some(&ch) = chars.peek() {
                if ch == '#' || ch == '.' || ch == '[' {
                    break;
                }
                buffer.push(ch);
                chars.next();
            }
            if buffer == "*" {
                universal = true;
            } else if !buffer.is_empty() {
                tag = Some(buffer.clone());
            }
            buffer.clear();
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' | '.' => {
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '#' || next == '[' {
                        break;
                    }
                    buffer.push(next);
                    chars.next();
                }
                if !buffer.is_empty() {
                    if ch == '#' {
                        id = Some(buffer.clone());
                    } else {
                        classes.insert(buffer.clone());
                    }
                }
                buffer.clear();
            }
            '[' => {
                if let Some(attr) = parse_attribute_selector(&mut chars) {
                    attributes.push(attr);
                }
            }
            _ => {}
        }
    }

    CompoundSelector {
        tag,
        id,
        classes,
        attributes,
        universal,
    }
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
        chars.next();
    }
}

/// Parses the interior of `[...]`; the opening bracket is already consumed.
fn parse_attribute_selector(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<AttributeSelector> {
    let mut name = String::new();
    let mut operator = None;
    let mut value = None;

    skip_whitespace(chars);
    while let Some(&ch) = chars.peek() {
        if ch == '=' || ch == ']' || ch == '~' || ch == '^' || ch == '$' || ch == '*' || ch.is_whitespace() {
            break;
        }
        name.push(ch);
        chars.next();
    }
    skip_whitespace(chars);

    if let Some(&ch) = chars.peek() {
        if ch == '=' || ch == '~' || ch == '^' || ch == '$' || ch == '*' {
            let mut op = String::from(ch);
            chars.next();
            if chars.peek() == Some(&'=') {
                op.push('=');
                chars.next();
            }
            operator = match op.as_str() {
                "=" => Some(AttributeOperator::Exact),
                "~=" => Some(AttributeOperator::Includes),
                "^=" => Some(AttributeOperator::Prefix),
                "$=" => Some(AttributeOperator::Suffix),
                "*=" => Some(AttributeOperator::Substring),
                _ => None,
            };
            skip_whitespace(chars);

            let quote = chars.peek().copied().filter(|&ch| ch == '"' || ch == '\'');
            let mut buf = String::new();
            if let Some(q) = quote {
                chars.next();
                for ch in chars.by_ref() {
                    if ch == q {
                        break;
                    }
                    buf.push(ch);
                }
            } else {
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == ']' {
                        break;
                    }
                    buf.push(ch);
                    chars.next();
                }
            }
            value = Some(buf);
        }
    }

    // Consume up to the closing bracket.
    for ch in chars.by_ref() {
        if ch == ']' {
            break;
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(AttributeSelector {
            name,
            operator,
            value,
        })
    }
}

/// Parses a complex selector like `div.red > p#header span`. Tokens must
/// be whitespace-separated; combinator characters glued to a compound are
/// not recognized, which at worst costs a match, never invents one.
pub fn parse_complex_selector(selector: &str) -> Option<ComplexSelector> {
    let tokens: Vec<&str> = selector.split_whitespace().collect();
    let mut iter = tokens.into_iter();
    let mut key = parse_compound_selector(iter.next()?);
    let mut ancestors = Vec::new();

    while let Some(token) = iter.next() {
        let combinator = match token {
            ">" => Combinator::Child,
            "+" => Combinator::AdjacentSibling,
            "~" => Combinator::GeneralSibling,
            _ => Combinator::Descendant,
        };
        let compound_token = if matches!(token, ">" | "+" | "~") {
            iter.next().unwrap_or(token)
        } else {
            token
        };
        ancestors.push((combinator, key));
        key = parse_compound_selector(compound_token);
    }
    ancestors.reverse();
    Some(ComplexSelector { key, ancestors })
}

/// True if the element satisfies every condition of the compound selector.
/// A compound with no conditions and no explicit `*` was parsed from a
/// token with nothing queryable in it (a bare `::before`, say) and
/// matches nothing.
pub fn matches_compound(elem: &ElementNode, compound: &CompoundSelector) -> bool {
    if !compound.universal
        && compound.tag.is_none()
        && compound.id.is_none()
        && compound.classes.is_empty()
        && compound.attributes.is_empty()
    {
        return false;
    }
    if let Some(ref tag) = compound.tag {
        if !elem.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(ref id) = compound.id {
        if elem.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        match elem.attr("class") {
            Some(class_attr) => {
                let elem_classes: HashSet<&str> = class_attr.split_whitespace().collect();
                if !compound
                    .classes
                    .iter()
                    .all(|c| elem_classes.contains(c.as_str()))
                {
                    return false;
                }
            }
            None => return false,
        }
    }
    for attr_sel in &compound.attributes {
        let Some(actual) = elem.attr(&attr_sel.name) else {
            return false;
        };
        if let Some(expected) = &attr_sel.value {
            let ok = match attr_sel.operator {
                Some(AttributeOperator::Exact) => actual == expected,
                Some(AttributeOperator::Includes) => {
                    actual.split_whitespace().any(|word| word == expected)
                }
                Some(AttributeOperator::Prefix) => actual.starts_with(expected.as_str()),
                Some(AttributeOperator::Suffix) => actual.ends_with(expected.as_str()),
                Some(AttributeOperator::Substring) => actual.contains(expected.as_str()),
                None => true,
            };
            if !ok {
                return false;
            }
        }
    }
    true
}

/// Matches a complex selector against an element given its ancestor chain
/// (root first). Sibling combinators cannot be resolved against an
/// ancestor chain and are treated as always satisfied, keeping the result
/// an over-approximation.
fn matches_complex(
    elem: &ElementNode,
    ancestors: &[Handle],
    complex: &ComplexSelector,
) -> bool {
    if !matches_compound(elem, &complex.key) {
        return false;
    }
    matches_ancestors(ancestors, ancestors.len(), &complex.ancestors)
}

/// Resolves ancestor constraints below index `upper`, nearest first. A
/// descendant step may bind any candidate ancestor, so every binding is
/// tried before the step fails; otherwise `section > div p` would miss a
/// `p` whose nearest `div` is not the child of a `section` while a
/// farther one is.
fn matches_ancestors(
    ancestors: &[Handle],
    upper: usize,
    parts: &[(Combinator, CompoundSelector)],
) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => {
            upper > 0
                && handle_matches(&ancestors[upper - 1], compound)
                && matches_ancestors(ancestors, upper - 1, rest)
        }
        Combinator::Descendant => (0..upper).rev().any(|i| {
            handle_matches(&ancestors[i], compound) && matches_ancestors(ancestors, i, rest)
        }),
        Combinator::AdjacentSibling | Combinator::GeneralSibling => {
            matches_ancestors(ancestors, upper, rest)
        }
    }
}

fn handle_matches(handle: &Handle, compound: &CompoundSelector) -> bool {
    match &*handle.borrow() {
        Node::Element(elem) => matches_compound(elem, compound),
        _ => false,
    }
}

/// True if at least one element in the document matches the selector
/// (which may be a comma-separated list).
pub fn query_matches(document: &Document, selector: &str) -> bool {
    let selectors: Vec<ComplexSelector> = selector
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_selector)
        .collect();
    if selectors.is_empty() {
        return false;
    }
    let mut stack = Vec::new();
    walk_matching(&document.root, &mut stack, &selectors)
}

fn walk_matching(handle: &Handle, stack: &mut Vec<Handle>, selectors: &[ComplexSelector]) -> bool {
    let (is_element, children) = {
        match &*handle.borrow() {
            Node::DocumentRoot(root) => (false, root.children.clone()),
            Node::Element(elem) => {
                if selectors.iter().any(|s| matches_complex(elem, stack, s)) {
                    return true;
                }
                (true, elem.children.clone())
            }
            Node::Text(_) => return false,
        }
    };
    if is_element {
        stack.push(handle.clone());
    }
    for child in &children {
        if walk_matching(child, stack, selectors) {
            return true;
        }
    }
    if is_element {
        stack.pop();
    }
    false
}
