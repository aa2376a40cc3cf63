//! The extraction orchestrator.
//!
//! Sequences acquisition, font resolution, critical selection and
//! minification against a working document, injects the result as a
//! marker style element, and serializes the outcome.

use crate::acquire;
use crate::dom::dom_tree::{Document, Node};
use crate::minify;
use crate::parser::html::parse_document;
use crate::serialize;
use crate::style::{critical, fonts};
use reqwest::Client;
pub use reqwest::Url;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Attribute carried by the injected critical-style element so downstream
/// tooling can locate it.
pub const CRITICAL_ATTR: &str = "data-critical";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("either a document or some HTML must be provided")]
    MissingInput,
    #[error("cannot resolve stylesheet href {href:?} without a base URL")]
    UnresolvedHref { href: String },
    /// One unreachable stylesheet fails the whole extraction rather than
    /// being skipped; see the crate docs for the trade-off.
    #[error("failed to fetch stylesheet {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// Extraction configuration. Exactly one of `document` and `html` must be
/// set; when both are, `html` wins and is parsed into a fresh document.
pub struct ExtractOptions {
    /// Live document to process. It is cloned first; the caller's copy is
    /// never mutated.
    pub document: Option<Document>,
    /// Raw HTML to parse into a fresh (unrendered) document.
    pub html: Option<String>,
    /// Enables CSS and HTML minification. On by default.
    pub minify: bool,
    /// Base URL for resolving relative stylesheet hrefs.
    pub base_url: Option<Url>,
    /// Caller hook run on the working document before extraction.
    pub transform: Option<Box<dyn FnOnce(&mut Document)>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            document: None,
            html: None,
            minify: true,
            base_url: None,
            transform: None,
        }
    }
}

/// The extraction artifact.
#[derive(Debug)]
pub struct Extraction {
    /// The critical CSS, possibly empty.
    pub css: String,
    /// The final HTML, DOCTYPE-prefixed and minified per option.
    pub html: String,
    /// The mutated working document.
    pub document: Document,
}

/// Runs one extraction.
///
/// The only suspension points are the stylesheet fetches; everything else
/// is synchronous. Do not run two extractions against the same document
/// concurrently: both read and mutate it in place.
pub async fn extract(options: ExtractOptions) -> Result<Extraction, ExtractError> {
    let ExtractOptions {
        document,
        html,
        minify,
        base_url,
        transform,
    } = options;

    let mut doc = match (html, document) {
        (Some(html), _) => parse_document(&html),
        (None, Some(document)) => document.clone_document(),
        (None, None) => return Err(ExtractError::MissingInput),
    };

    if let Some(transform) = transform {
        transform(&mut doc);
    }

    let client = Client::builder().build()?;
    let stylesheets = acquire::acquire(&doc, &client, base_url.as_ref()).await?;
    let families = fonts::resolve_families(&doc);
    log::debug!(
        "selecting from {} stylesheets against {} in-use families",
        stylesheets.len(),
        families.len()
    );
    let css = critical::select_critical(&doc, &stylesheets, &families, minify);

    doc.remove_nodes(&acquire::stylesheet_nodes(&doc));
    if !css.is_empty() {
        inject_critical_style(&doc, &css);
    }

    let mut html = serialize::document_to_html(&doc, true);
    if minify {
        html = minify::minify_html(&html);
    }

    Ok(Extraction {
        css,
        html,
        document: doc,
    })
}

fn inject_critical_style(document: &Document, css: &str) {
    let style = document.create_element("style");
    if let Node::Element(ref mut elem) = *style.borrow_mut() {
        elem.set_attr(CRITICAL_ATTR, "true");
        elem.children
            .push(Rc::new(RefCell::new(Node::Text(css.to_string()))));
    }
    document.append_to_head(style);
}
