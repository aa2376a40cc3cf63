//! Serialization of the DOM tree back to HTML text.

use crate::dom::dom_tree::{Document, Handle, Node};

/// Void (self-closing) elements in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "meta", "img", "br", "hr", "input", "link", "area", "base", "col", "embed", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted raw, without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

/// Serializes the document to HTML text, optionally prefixed with its
/// DOCTYPE. A document without a stored doctype still gets the standard
/// `<!DOCTYPE html>` prefix so the output stands alone.
pub fn document_to_html(document: &Document, include_doctype: bool) -> String {
    let mut out = String::new();
    if include_doctype {
        out.push_str(&doctype_string(document));
    }
    serialize_node(&document.root, false, &mut out);
    out
}

pub fn doctype_string(document: &Document) -> String {
    match &*document.doctype.borrow() {
        None => "<!DOCTYPE html>".to_string(),
        Some(doctype) => {
            let mut out = format!("<!DOCTYPE {}", doctype.name);
            if !doctype.public_id.is_empty() {
                out.push_str(&format!(" PUBLIC \"{}\"", doctype.public_id));
                if !doctype.system_id.is_empty() {
                    out.push_str(&format!(" \"{}\"", doctype.system_id));
                }
            } else if !doctype.system_id.is_empty() {
                out.push_str(&format!(" SYSTEM \"{}\"", doctype.system_id));
            }
            out.push('>');
            out
        }
    }
}

fn serialize_node(handle: &Handle, raw_text: bool, out: &mut String) {
    match &*handle.borrow() {
        Node::DocumentRoot(root) => {
            for child in &root.children {
                serialize_node(child, raw_text, out);
            }
        }
        Node::Element(elem) => {
            out.push('<');
            out.push_str(&elem.tag);
            for (name, value) in &elem.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                return;
            }
            let child_raw = RAW_TEXT_ELEMENTS.contains(&elem.tag.as_str());
            for child in &elem.children {
                serialize_node(child, child_raw, out);
            }
            out.push_str("</");
            out.push_str(&elem.tag);
            out.push('>');
        }
        Node::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::parse_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_minimal_document() {
        let input =
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>Hi</p></body></html>";
        let document = parse_document(input);
        assert_eq!(document_to_html(&document, true), input);
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        let document =
            parse_document(r#"<html><body><img src="a.png" alt="a"><br></body></html>"#);
        let html = document_to_html(&document, false);
        assert!(html.contains(r#"<img src="a.png" alt="a"><br>"#));
        assert!(!html.contains("</img>"));
        assert!(!html.contains("</br>"));
    }

    #[test]
    fn adds_doctype_when_the_source_had_none() {
        let document = parse_document("<html><head></head><body></body></html>");
        assert!(document_to_html(&document, true).starts_with("<!DOCTYPE html><html>"));
    }

    #[test]
    fn escapes_text_but_not_style_content() {
        let input = "<html><head><style>a > b { color: red; }</style></head>\
                     <body><p>1 &lt; 2 &amp; 3</p></body></html>";
        let document = parse_document(input);
        let html = document_to_html(&document, false);
        assert!(html.contains("a > b { color: red; }"));
        assert!(html.contains("1 &lt; 2 &amp; 3"));
    }

    #[test]
    fn serialization_is_stable_under_reparse() {
        let input = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>x</title></head><body><div class="a b"><span>text</span></div></body></html>"#;
        let once = document_to_html(&parse_document(input), true);
        let twice = document_to_html(&parse_document(&once), true);
        assert_eq!(once, twice);
    }
}
