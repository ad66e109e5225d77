//! Rendered tree helpers
//!
//! The rendered tree is a `markup5ever_rcdom` DOM. Rendered HTML is parsed with `html5ever`
//! (the browser-grade parser from Servo), mutated in place by the locator and applier, and
//! serialized back with html5ever's serializer.
//!
//! Nodes are reference counted [`Handle`]s. Helpers here never rely on parent pointers:
//! removal walks down from a known root and compares handles with [`Rc::ptr_eq`].

use crate::error::RenderError;
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope,
    Attribute, LocalName, ParseOpts, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::default::Default;
use std::rc::Rc;

/// Create an HTML element with attributes
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| attribute(name, value))
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: value.to_string().into(),
    }
}

/// Parse an HTML fragment and return the nodes html5ever placed in `<body>`.
///
/// The returned nodes are detached: their parent pointers are cleared.
pub fn parse_fragment(html: &str) -> Vec<Handle> {
    let dom: RcDom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let Some(body) = find_first(&dom.document, "body") else {
        return Vec::new();
    };

    let nodes = std::mem::take(&mut *body.children.borrow_mut());
    for node in &nodes {
        node.parent.set(None);
    }
    nodes
}

/// Depth-first search for the first element with the given tag.
pub fn find_first(node: &Handle, tag: &str) -> Option<Handle> {
    if is_tag(node, tag) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_first(child, tag))
}

/// Tag name of an element, `None` for text, comments and the document node.
pub fn tag_name(node: &Handle) -> Option<LocalName> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.clone()),
        _ => None,
    }
}

pub fn is_tag(node: &Handle, tag: &str) -> bool {
    tag_name(node).is_some_and(|name| &*name == tag)
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// Read an attribute value.
pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Set an attribute, replacing any existing value. No-op on non-elements.
pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
            Some(existing) => existing.value = value.to_string().into(),
            None => attrs.push(attribute(name, value)),
        }
    }
}

/// Remove an attribute if present.
pub fn remove_attr(node: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|attr| &*attr.name.local != name);
    }
}

/// Class names currently on an element.
pub fn classes(node: &Handle) -> Vec<String> {
    get_attr(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Add class names, keeping existing ones and skipping duplicates.
pub fn add_classes<'a>(node: &Handle, names: impl IntoIterator<Item = &'a str>) {
    let mut current = classes(node);
    let before = current.len();
    for name in names {
        if !current.iter().any(|existing| existing == name) {
            current.push(name.to_string());
        }
    }
    if current.len() != before {
        set_attr(node, "class", &current.join(" "));
    }
}

/// Concatenated text of a node and all its descendants.
pub fn text_content(node: &Handle) -> String {
    let mut output = String::new();
    collect_text(node, &mut output);
    output
}

fn collect_text(node: &Handle, output: &mut String) {
    match &node.data {
        NodeData::Text { contents } => output.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, output);
            }
        }
    }
}

/// Text of a text node, `None` for anything else.
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// Replace the text of a text node. No-op on anything else.
pub fn set_text(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        *contents.borrow_mut() = text.to_string().into();
    }
}

pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

pub fn has_element_children(node: &Handle) -> bool {
    node.children.borrow().iter().any(is_element)
}

pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

pub fn prepend_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}

/// Remove a direct child. Returns whether it was found.
pub fn remove_child(parent: &Handle, child: &Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, child)) {
        Some(index) => {
            let removed = children.remove(index);
            removed.parent.set(None);
            true
        }
        None => false,
    }
}

/// Remove `target` from anywhere below `root`. Returns whether it was found.
pub fn remove_descendant(root: &Handle, target: &Handle) -> bool {
    if remove_child(root, target) {
        return true;
    }
    let children: Vec<Handle> = root.children.borrow().clone();
    children
        .iter()
        .any(|child| remove_descendant(child, target))
}

/// The element right before `node` among `parent`'s children, skipping text.
pub fn previous_element_sibling(parent: &Handle, node: &Handle) -> Option<Handle> {
    let children = parent.children.borrow();
    let index = children.iter().position(|c| Rc::ptr_eq(c, node))?;
    children[..index]
        .iter()
        .rev()
        .find(|child| is_element(child))
        .cloned()
}

/// Replace a direct child with another node. Returns whether `old` was found.
pub fn replace_child(parent: &Handle, old: &Handle, new: Handle) -> bool {
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, old)) {
        Some(index) => {
            new.parent.set(Some(Rc::downgrade(parent)));
            let removed = std::mem::replace(&mut children[index], new);
            removed.parent.set(None);
            true
        }
        None => false,
    }
}

/// Visit every element below (and including) `node`, parents before children.
pub fn for_each_element(node: &Handle, visit: &mut impl FnMut(&Handle)) {
    if is_element(node) {
        visit(node);
    }
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in &children {
        for_each_element(child, visit);
    }
}

/// Serialize the children of `container` to an HTML string (the container itself is left out)
pub fn serialize_children(container: &Handle) -> Result<String, RenderError> {
    let mut output = Vec::new();

    // Each child is serialized including itself
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    for child in container.children.borrow().iter() {
        let serializable = SerializableHandle::from(child.clone());
        serialize(&mut output, &serializable, opts.clone())
            .map_err(|e| RenderError::Serialization(format!("HTML serialization failed: {e}")))?;
    }

    String::from_utf8(output)
        .map_err(|e| RenderError::Serialization(format!("UTF-8 conversion failed: {e}")))
}

/// Serialize a single node, including itself.
pub fn serialize_node(node: &Handle) -> Result<String, RenderError> {
    let wrapper = create_element("div", vec![]);
    wrapper.children.borrow_mut().push(node.clone());
    let html = serialize_children(&wrapper);
    wrapper.children.borrow_mut().clear();
    html
}
