//! Stylesheet acquisition.
//!
//! Gathers the document's effective stylesheets regardless of source:
//! natively attached sheets on a rendered document, inline `<style>`
//! text, or `<link rel="stylesheet">` text fetched over the network.
//! Fetches are awaited one at a time in document order, so the result
//! order matches the source node order with no reassembly step.

use crate::dom::dom_tree::{inline_text, Document, Handle, Node};
use crate::extract::ExtractError;
use crate::style::fonts;
use crate::style::stylesheet::Stylesheet;
use reqwest::{Client, Url};
use std::cell::RefCell;
use std::rc::Rc;

/// Media query that matches no real viewport. Synthesized stylesheets are
/// parsed under it so their rules can never visually affect the document
/// while the sandbox element is attached.
pub const SANDBOX_MEDIA: &str = "not screen and (min-width: 1px)";

/// Candidate stylesheet-bearing nodes: `<style>` and
/// `<link rel="stylesheet">` in document order, excluding anything inside
/// an `<svg>` subtree. The orchestrator removes this same node set after
/// selection.
pub fn stylesheet_nodes(document: &Document) -> Vec<Handle> {
    let mut nodes = Vec::new();
    collect_nodes(&document.root, false, &mut nodes);
    nodes
}

fn collect_nodes(handle: &Handle, in_svg: bool, nodes: &mut Vec<Handle>) {
    let (children, in_svg) = match &*handle.borrow() {
        Node::DocumentRoot(root) => (root.children.clone(), in_svg),
        Node::Element(elem) => {
            if !in_svg && is_stylesheet_node(elem.tag.as_str(), elem.attr("rel")) {
                nodes.push(handle.clone());
            }
            (elem.children.clone(), in_svg || elem.tag == "svg")
        }
        Node::Text(_) => return,
    };
    for child in &children {
        collect_nodes(child, in_svg, nodes);
    }
}

fn is_stylesheet_node(tag: &str, rel: Option<&str>) -> bool {
    match tag {
        "style" => true,
        "link" => rel.is_some_and(|rel| rel.trim().eq_ignore_ascii_case("stylesheet")),
        _ => false,
    }
}

/// Acquires the document's stylesheets in document order.
///
/// A rendered document that already carries native stylesheet objects
/// returns them directly. Otherwise each candidate node's CSS text is
/// obtained (inline, or fetched from `href`) and synthesized through the
/// sandbox; null or disabled sheets are skipped. A failed fetch aborts
/// the whole acquisition.
pub async fn acquire(
    document: &Document,
    client: &Client,
    base: Option<&Url>,
) -> Result<Vec<Stylesheet>, ExtractError> {
    if fonts::is_rendered(document) {
        let native = document.styles.borrow();
        if !native.is_empty() {
            log::debug!("using {} native stylesheets", native.len());
            return Ok(native.clone());
        }
    }

    let mut stylesheets = Vec::new();
    for node in stylesheet_nodes(document) {
        let (href, disabled) = {
            match &*node.borrow() {
                Node::Element(elem) => (
                    elem.attr("href").map(str::to_string),
                    elem.attr("disabled").is_some(),
                ),
                _ => continue,
            }
        };
        let css = match href {
            Some(href) => fetch_css(client, base, &href).await?,
            None => inline_text(&node),
        };
        let Some(mut sheet) = synthesize(document, &css) else {
            continue;
        };
        sheet.disabled = disabled;
        if sheet.disabled {
            log::debug!("skipping disabled stylesheet node");
            continue;
        }
        stylesheets.push(sheet);
    }
    Ok(stylesheets)
}

/// Synthesizes a stylesheet from CSS text the way a host engine would:
/// a detached style element under the sandbox media query is attached to
/// `<head>`, its text parsed, and the element removed again immediately.
fn synthesize(document: &Document, css: &str) -> Option<Stylesheet> {
    let sandbox = document.create_element("style");
    if let Node::Element(ref mut elem) = *sandbox.borrow_mut() {
        elem.set_attr("media", SANDBOX_MEDIA);
        elem.children
            .push(Rc::new(RefCell::new(Node::Text(css.to_string()))));
    }
    document.append_to_head(sandbox.clone());
    let sheet = Stylesheet::parse(css);
    document.remove_nodes(&[sandbox]);
    sheet
}

async fn fetch_css(client: &Client, base: Option<&Url>, href: &str) -> Result<String, ExtractError> {
    let url = resolve_href(base, href)?;
    log::debug!("fetching stylesheet {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| ExtractError::Fetch {
            url: url.to_string(),
            source,
        })?;
    response.text().await.map_err(|source| ExtractError::Fetch {
        url: url.to_string(),
        source,
    })
}

fn resolve_href(base: Option<&Url>, href: &str) -> Result<Url, ExtractError> {
    if let Ok(url) = Url::parse(href) {
        return Ok(url);
    }
    match base {
        Some(base) => base.join(href).map_err(|_| ExtractError::UnresolvedHref {
            href: href.to_string(),
        }),
        None => Err(ExtractError::UnresolvedHref {
            href: href.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::parse_document;
    use crate::style::stylesheet::Rule;
    use pretty_assertions::assert_eq;

    fn selector_of(rule: &Rule) -> &str {
        match rule {
            Rule::Style { selector, .. } => selector,
            other => panic!("expected selector rule, got {:?}", other),
        }
    }

    #[test]
    fn candidates_follow_document_order_and_skip_svg() {
        let document = parse_document(
            r#"<html><head>
                <style>a{}</style>
                <link rel="stylesheet" href="x.css">
                <link rel="icon" href="favicon.ico">
            </head><body>
                <svg><style>circle{}</style></svg>
                <style>b{}</style>
            </body></html>"#,
        );
        let nodes = stylesheet_nodes(&document);
        assert_eq!(nodes.len(), 3);
        let tags: Vec<String> = nodes
            .iter()
            .map(|n| match &*n.borrow() {
                Node::Element(elem) => elem.tag.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(tags, vec!["style", "link", "style"]);
    }

    #[tokio::test]
    async fn acquires_inline_styles_in_order() {
        let document = parse_document(
            "<html><head><style>p { color: red; }</style></head>\
             <body><style>a { color: blue; }</style></body></html>",
        );
        let client = Client::new();
        let sheets = acquire(&document, &client, None).await.expect("acquires");
        assert_eq!(sheets.len(), 2);
        assert_eq!(selector_of(&sheets[0].rules[0]), "p");
        assert_eq!(selector_of(&sheets[1].rules[0]), "a");
    }

    #[tokio::test]
    async fn skips_disabled_nodes() {
        let document = parse_document(
            "<html><head><style disabled>p { color: red; }</style>\
             <style>a { color: blue; }</style></head></html>",
        );
        let client = Client::new();
        let sheets = acquire(&document, &client, None).await.expect("acquires");
        assert_eq!(sheets.len(), 1);
        assert_eq!(selector_of(&sheets[0].rules[0]), "a");
    }

    #[tokio::test]
    async fn rendered_document_returns_native_sheets() {
        use crate::style::fonts::StyleQuery;
        use crate::dom::dom_tree::ElementNode;

        struct AlwaysSerif;
        impl StyleQuery for AlwaysSerif {
            fn font_family(&self, _elem: &ElementNode) -> Option<String> {
                Some("serif".to_string())
            }
        }

        let document = parse_document(
            "<html><head><style>ignored { color: red; }</style></head><body></body></html>",
        );
        document.set_style_query(Rc::new(AlwaysSerif));
        document.attach_stylesheet(
            Stylesheet::parse("div { margin: 0; }").expect("parses"),
        );
        let client = Client::new();
        let sheets = acquire(&document, &client, None).await.expect("acquires");
        assert_eq!(sheets.len(), 1);
        assert_eq!(selector_of(&sheets[0].rules[0]), "div");
    }

    #[tokio::test]
    async fn unresolvable_href_aborts() {
        let document = parse_document(
            r#"<html><head><link rel="stylesheet" href="styles/site.css"></head></html>"#,
        );
        let client = Client::new();
        let err = acquire(&document, &client, None).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnresolvedHref { .. }));
    }

    #[test]
    fn sandbox_element_does_not_linger() {
        let document = parse_document("<html><head></head></html>");
        let sheet = synthesize(&document, "p { color: red; }").expect("parses");
        assert_eq!(sheet.rules.len(), 1);
        assert!(document.find_element("style").is_none());
    }

    #[test]
    fn relative_href_resolves_against_base() {
        let base = Url::parse("https://example.com/a/page.html").expect("valid");
        let url = resolve_href(Some(&base), "styles/site.css").expect("resolves");
        assert_eq!(url.as_str(), "https://example.com/a/styles/site.css");
    }
}
