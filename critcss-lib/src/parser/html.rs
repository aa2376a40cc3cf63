//! HTML parsing into the crate's DOM tree.
//!
//! Uses html5ever as the parser and builds the tree defined in
//! `crate::dom::dom_tree` through a custom `TreeSink`.

use crate::dom::dom_tree;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, NodeOrText, QuirksMode, TreeSink},
    LocalName, Namespace, QualName,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Parses HTML text into a fresh `Document`.
///
/// html5ever normalizes the tree the way a browser would: `<html>`,
/// `<head>` and `<body>` exist afterwards even when the input omits them.
pub fn parse_document(html_content: &str) -> dom_tree::Document {
    let sink = CriticalTreeSink::new();
    html5ever::parse_document(sink, Default::default()).one(html_content.to_string())
}

/// A `TreeSink` that builds the extraction DOM.
///
/// Holds the document being built and the current quirks mode. Node
/// relocation hooks (reparenting, sibling insertion) are left empty: the
/// extraction pipeline only needs the containment structure.
pub struct CriticalTreeSink {
    document: dom_tree::Document,
    quirks_mode: RefCell<QuirksMode>,
}

impl CriticalTreeSink {
    pub fn new() -> Self {
        Self {
            document: dom_tree::new_document(),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
        }
    }
}

impl Default for CriticalTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct SinkElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for SinkElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

impl TreeSink for CriticalTreeSink {
    type Handle = Rc<RefCell<dom_tree::Node>>;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = SinkElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&self, msg: std::borrow::Cow<'static, str>) {
        log::trace!("html parse error: {}", msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.document.root.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        if let dom_tree::Node::Element(ref elem) = *target.borrow() {
            SinkElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            }
        } else {
            panic!("elem_name called on non-element node")
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: html5ever::interface::ElementFlags,
    ) -> Self::Handle {
        let tag = name.local.to_string();
        let mut element = dom_tree::ElementNode::new(tag, name);
        element.attributes = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        Rc::new(RefCell::new(dom_tree::Node::Element(element)))
    }

    /// Comments carry nothing the extraction needs; an empty text node
    /// keeps the handle valid without affecting serialization.
    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(dom_tree::Node::Text(String::new())))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        let combined = format!("{} {}", target, data);
        Rc::new(RefCell::new(dom_tree::Node::Text(combined)))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let child_node = match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => {
                Rc::new(RefCell::new(dom_tree::Node::Text(text.to_string())))
            }
        };
        match &mut *parent.borrow_mut() {
            dom_tree::Node::DocumentRoot(root) => root.children.push(child_node),
            dom_tree::Node::Element(element) => element.children.push(child_node),
            dom_tree::Node::Text(_) => {}
        }
    }

    fn append_based_on_parent_node(
        &self,
        _element: &Self::Handle,
        _prev_element: &Self::Handle,
        _child: NodeOrText<Self::Handle>,
    ) {
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {}

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, _sibling: &Self::Handle, _child: NodeOrText<Self::Handle>) {}

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        if let dom_tree::Node::Element(ref mut elem) = *target.borrow_mut() {
            for attr in attrs {
                let key = attr.name.local.to_string();
                if !elem.attributes.iter().any(|(k, _)| k == &key) {
                    elem.attributes.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, _target: &Self::Handle) {}

    fn reparent_children(&self, _node: &Self::Handle, _new_parent: &Self::Handle) {}
}
