use html5ever::namespace_url;
use html5ever::ns;
use html5ever::{LocalName, QualName};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub mod dom_tree {
    use super::*;
    use crate::style::fonts::StyleQuery;
    use crate::style::stylesheet::Stylesheet;

    pub type Handle = Rc<RefCell<Node>>;

    #[derive(Debug, Clone)]
    pub enum Node {
        DocumentRoot(DocumentRootNode),
        Element(ElementNode),
        Text(String),
    }

    #[derive(Debug, Clone)]
    pub struct DocumentRootNode {
        pub children: Vec<Handle>,
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        pub tag: String,
        pub qual_name: QualName,
        pub attributes: Vec<(String, String)>,
        pub children: Vec<Handle>,
    }

    /// An HTML document: a node tree plus the document-level state the
    /// extraction pipeline reads from it. The tree is owned here; callers
    /// mutate it in place through the methods below.
    pub struct Document {
        pub root: Handle,
        pub doctype: RefCell<Option<Doctype>>,
        /// Stylesheets natively attached to the document, in order. Only
        /// populated by callers that already have parsed sheets; a document
        /// built from HTML text starts with none.
        pub styles: RefCell<Vec<Stylesheet>>,
        /// Injected computed-style capability. A document without one is
        /// considered unrendered.
        pub style_query: RefCell<Option<Rc<dyn StyleQuery>>>,
    }

    #[derive(Debug, Clone)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl DocumentRootNode {
        pub fn new() -> Self {
            DocumentRootNode {
                children: Vec::new(),
            }
        }
    }

    impl Default for DocumentRootNode {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ElementNode {
        pub fn new(tag: String, qual_name: QualName) -> Self {
            ElementNode {
                tag,
                qual_name,
                attributes: Vec::new(),
                children: Vec::new(),
            }
        }

        /// First attribute with the given name, in source order.
        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        pub fn set_attr(&mut self, name: &str, value: &str) {
            if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| k == name) {
                entry.1 = value.to_string();
            } else {
                self.attributes.push((name.to_string(), value.to_string()));
            }
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Rc::new(RefCell::new(Node::DocumentRoot(DocumentRootNode::new()))),
            doctype: RefCell::new(None),
            styles: RefCell::new(Vec::new()),
            style_query: RefCell::new(None),
        }
    }

    impl Document {
        /// The `<html>` element: the first element child of the root.
        pub fn root_element(&self) -> Option<Handle> {
            if let Node::DocumentRoot(root) = &*self.root.borrow() {
                root.children
                    .iter()
                    .find(|child| matches!(*child.borrow(), Node::Element(_)))
                    .cloned()
            } else {
                None
            }
        }

        /// First element with the given tag, in document order.
        pub fn find_element(&self, tag: &str) -> Option<Handle> {
            find_by_tag(&self.root, tag)
        }

        pub fn head(&self) -> Option<Handle> {
            self.find_element("head")
        }

        /// Builds a detached element in the HTML namespace.
        pub fn create_element(&self, tag: &str) -> Handle {
            let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
            Rc::new(RefCell::new(Node::Element(ElementNode::new(
                tag.to_string(),
                qual_name,
            ))))
        }

        /// Appends `node` to `<head>`. No-op on a document without one.
        pub fn append_to_head(&self, node: Handle) {
            if let Some(head) = self.head() {
                if let Node::Element(ref mut head_elem) = *head.borrow_mut() {
                    head_elem.children.push(node);
                }
            }
        }

        /// Detaches every node in `targets` from its parent, wherever it
        /// sits in the tree. Nodes not found are ignored.
        pub fn remove_nodes(&self, targets: &[Handle]) {
            if targets.is_empty() {
                return;
            }
            prune(&self.root, targets);
        }

        /// Visits every element in document order.
        pub fn for_each_element(&self, f: &mut dyn FnMut(&Handle, &ElementNode)) {
            walk_elements(&self.root, f);
        }

        pub fn attach_stylesheet(&self, sheet: Stylesheet) {
            self.styles.borrow_mut().push(sheet);
        }

        pub fn set_style_query(&self, query: Rc<dyn StyleQuery>) {
            *self.style_query.borrow_mut() = Some(query);
        }

        /// Clones the document by serializing it and reparsing the result,
        /// so the original is never mutated by an extraction. The style
        /// query and natively attached stylesheets carry over.
        pub fn clone_document(&self) -> Document {
            let html = crate::serialize::document_to_html(self, true);
            let clone = crate::parser::html::parse_document(&html);
            *clone.styles.borrow_mut() = self.styles.borrow().clone();
            clone
                .style_query
                .borrow_mut()
                .clone_from(&self.style_query.borrow());
            clone
        }
    }

    impl fmt::Debug for Document {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Document")
                .field("root", &self.root)
                .field("doctype", &self.doctype)
                .finish_non_exhaustive()
        }
    }

    /// Concatenated text of the node's direct text children. This is the
    /// inline CSS of a `<style>` element.
    pub fn inline_text(node: &Handle) -> String {
        let mut text = String::new();
        if let Node::Element(ref elem) = *node.borrow() {
            for child in &elem.children {
                if let Node::Text(ref chunk) = *child.borrow() {
                    text.push_str(chunk);
                }
            }
        }
        text
    }

    fn find_by_tag(handle: &Handle, tag: &str) -> Option<Handle> {
        let children = match &*handle.borrow() {
            Node::DocumentRoot(root) => root.children.clone(),
            Node::Element(elem) => {
                if elem.tag == tag {
                    return Some(handle.clone());
                }
                elem.children.clone()
            }
            Node::Text(_) => return None,
        };
        children.iter().find_map(|child| find_by_tag(child, tag))
    }

    fn prune(handle: &Handle, targets: &[Handle]) {
        let children = {
            let mut node = handle.borrow_mut();
            let children = match &mut *node {
                Node::DocumentRoot(root) => &mut root.children,
                Node::Element(elem) => &mut elem.children,
                Node::Text(_) => return,
            };
            children.retain(|child| !targets.iter().any(|t| Rc::ptr_eq(t, child)));
            children.clone()
        };
        for child in &children {
            prune(child, targets);
        }
    }

    fn walk_elements(handle: &Handle, f: &mut dyn FnMut(&Handle, &ElementNode)) {
        let children = match &*handle.borrow() {
            Node::DocumentRoot(root) => root.children.clone(),
            Node::Element(elem) => {
                f(handle, elem);
                elem.children.clone()
            }
            Node::Text(_) => return,
        };
        for child in &children {
            walk_elements(child, f);
        }
    }
}
