/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A minimal in-memory content tree implementing [`ContentNode`], plus
//! style shorthands, for exercising construction and updates without a
//! real document implementation.

#![allow(dead_code)]

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use atomic_refcell::{AtomicRefCell, AtomicRefMut};
use html5ever::{LocalName, QualName, namespace_url, ns};
use servo_arc::Arc as ServoArc;

use boxtree::dom::{ContentNode, LayoutDataForNode, OpaqueNode, StateBlob};
use boxtree::style::{
    ComputedStyle, Display, DisplayLayoutInternal, Float, Overflow, Position, PseudoElement,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Style shorthands. Each returns an owned style the test can refine with
// the `with_*` builders before attaching it to a node.

pub fn block() -> ComputedStyle {
    ComputedStyle::new(Display::block())
}

pub fn inline() -> ComputedStyle {
    ComputedStyle::new(Display::inline())
}

pub fn inline_block() -> ComputedStyle {
    ComputedStyle::new(Display::inline_block())
}

pub fn table() -> ComputedStyle {
    ComputedStyle::new(Display::table())
}

pub fn internal(internal: DisplayLayoutInternal) -> ComputedStyle {
    ComputedStyle::new(Display::internal(internal))
}

pub fn row() -> ComputedStyle {
    internal(DisplayLayoutInternal::TableRow)
}

pub fn cell() -> ComputedStyle {
    internal(DisplayLayoutInternal::TableCell)
}

pub fn none() -> ComputedStyle {
    ComputedStyle::new(Display::None)
}

pub fn contents() -> ComputedStyle {
    ComputedStyle::new(Display::Contents)
}

pub fn floated(style: ComputedStyle) -> ComputedStyle {
    style.with_float(Float::Left)
}

pub fn absolute(style: ComputedStyle) -> ComputedStyle {
    style.with_position(Position::Absolute)
}

pub fn fixed(style: ComputedStyle) -> ComputedStyle {
    style.with_position(Position::Fixed)
}

pub fn relative(style: ComputedStyle) -> ComputedStyle {
    style.with_position(Position::Relative)
}

pub fn scrollable(style: ComputedStyle) -> ComputedStyle {
    style.with_overflow(Overflow::Scroll)
}

enum NodeKind {
    Element {
        name: QualName,
        attributes: Vec<(LocalName, String)>,
    },
    Text(String),
}

struct NodeData {
    parent: Option<usize>,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
    previous_sibling: Option<usize>,
    kind: NodeKind,
    style: ServoArc<ComputedStyle>,
    pseudo_styles: Vec<(PseudoElement, ServoArc<ComputedStyle>)>,
    indirection: bool,
    ui_state: AtomicRefCell<Option<Vec<u8>>>,
    restored: AtomicRefCell<Vec<Vec<u8>>>,
    layout_data: AtomicRefCell<LayoutDataForNode>,
}

impl NodeData {
    fn new(kind: NodeKind, style: ComputedStyle) -> Self {
        Self {
            parent: None,
            first_child: None,
            next_sibling: None,
            previous_sibling: None,
            kind,
            style: ServoArc::new(style),
            pseudo_styles: Vec::new(),
            indirection: false,
            ui_state: AtomicRefCell::new(None),
            restored: AtomicRefCell::new(Vec::new()),
            layout_data: AtomicRefCell::new(LayoutDataForNode::default()),
        }
    }
}

/// The test document. Node 0, created by [`Document::new`], is the root.
/// Structural mutation happens through `&mut self` methods; the crate
/// under test only ever sees immutable [`Handle`]s.
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn new(root_style: ComputedStyle) -> Self {
        let root = NodeData::new(
            NodeKind::Element {
                name: QualName::new(None, ns!(html), LocalName::from("html")),
                attributes: Vec::new(),
            },
            root_style,
        );
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> Handle<'_> {
        self.handle(0)
    }

    pub fn handle(&self, index: usize) -> Handle<'_> {
        assert!(index < self.nodes.len());
        Handle {
            document: self,
            index,
        }
    }

    /// A detached element; attach it with [`Self::append`] or
    /// [`Self::insert_before`].
    pub fn new_element(&mut self, name: &str, style: ComputedStyle) -> usize {
        self.push(NodeData::new(
            NodeKind::Element {
                name: QualName::new(None, ns!(html), LocalName::from(name)),
                attributes: Vec::new(),
            },
            style,
        ))
    }

    /// A detached text node. Text nodes inherit box-relevant style from
    /// their parent, so the style is passed explicitly here.
    pub fn new_text(&mut self, text: &str, style: ComputedStyle) -> usize {
        self.push(NodeData::new(NodeKind::Text(text.to_owned()), style))
    }

    fn push(&mut self, node: NodeData) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn append(&mut self, parent: usize, node: usize) {
        self.insert_before(parent, node, None);
    }

    /// Convenience: create an element and append it in one step.
    pub fn append_element(&mut self, parent: usize, name: &str, style: ComputedStyle) -> usize {
        let node = self.new_element(name, style);
        self.append(parent, node);
        node
    }

    pub fn append_text(&mut self, parent: usize, text: &str, style: ComputedStyle) -> usize {
        let node = self.new_text(text, style);
        self.append(parent, node);
        node
    }

    pub fn insert_before(&mut self, parent: usize, node: usize, before: Option<usize>) {
        assert!(self.nodes[node].parent.is_none(), "node already attached");
        let previous = match before {
            Some(before) => {
                assert_eq!(self.nodes[before].parent, Some(parent));
                self.nodes[before].previous_sibling
            },
            None => {
                let mut last = self.nodes[parent].first_child;
                while let Some(current) = last {
                    match self.nodes[current].next_sibling {
                        Some(next) => last = Some(next),
                        None => break,
                    }
                }
                last
            },
        };
        self.nodes[node].parent = Some(parent);
        self.nodes[node].previous_sibling = previous;
        self.nodes[node].next_sibling = before;
        match previous {
            Some(previous) => self.nodes[previous].next_sibling = Some(node),
            None => self.nodes[parent].first_child = Some(node),
        }
        if let Some(before) = before {
            self.nodes[before].previous_sibling = Some(node);
        }
    }

    /// Detaches `node` from its parent. The node stays alive so the
    /// removal notification can still be delivered with its handle.
    pub fn detach(&mut self, node: usize) {
        let parent = self.nodes[node].parent.expect("detaching a detached node");
        let previous = self.nodes[node].previous_sibling;
        let next = self.nodes[node].next_sibling;
        match previous {
            Some(previous) => self.nodes[previous].next_sibling = next,
            None => self.nodes[parent].first_child = next,
        }
        if let Some(next) = next {
            self.nodes[next].previous_sibling = previous;
        }
        self.nodes[node].parent = None;
        self.nodes[node].previous_sibling = None;
        self.nodes[node].next_sibling = None;
    }

    pub fn set_attribute(&mut self, node: usize, name: &str, value: &str) {
        match &mut self.nodes[node].kind {
            NodeKind::Element { attributes, .. } => {
                attributes.push((LocalName::from(name), value.to_owned()));
            },
            NodeKind::Text(_) => panic!("attributes on a text node"),
        }
    }

    pub fn set_pseudo_style(&mut self, node: usize, which: PseudoElement, style: ComputedStyle) {
        self.nodes[node]
            .pseudo_styles
            .push((which, ServoArc::new(style)));
    }

    pub fn set_indirection(&mut self, node: usize) {
        self.nodes[node].indirection = true;
    }

    pub fn set_ui_state(&mut self, node: usize, bytes: &[u8]) {
        *self.nodes[node].ui_state.borrow_mut() = Some(bytes.to_vec());
    }

    /// Blobs handed back to `node` through `restore_state`, oldest first.
    pub fn restored_states(&self, node: usize) -> Vec<Vec<u8>> {
        self.nodes[node].restored.borrow().clone()
    }
}

#[derive(Clone, Copy)]
pub struct Handle<'dom> {
    document: &'dom Document,
    index: usize,
}

impl Handle<'_> {
    pub fn index(self) -> usize {
        self.index
    }
}

impl PartialEq for Handle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document) && self.index == other.index
    }
}

impl Eq for Handle<'_> {}

impl Hash for Handle<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.document as *const Document).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Handle<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match &self.document.nodes[self.index].kind {
            NodeKind::Element { name, .. } => {
                write!(formatter, "<{}> #{}", name.local, self.index)
            },
            NodeKind::Text(text) => write!(formatter, "{:?} #{}", text, self.index),
        }
    }
}

impl<'dom> ContentNode<'dom> for Handle<'dom> {
    fn opaque(self) -> OpaqueNode {
        OpaqueNode(self.index)
    }

    fn parent_node(self) -> Option<Self> {
        let parent = self.document.nodes[self.index].parent?;
        Some(self.document.handle(parent))
    }

    fn first_child(self) -> Option<Self> {
        let child = self.document.nodes[self.index].first_child?;
        Some(self.document.handle(child))
    }

    fn next_sibling(self) -> Option<Self> {
        let sibling = self.document.nodes[self.index].next_sibling?;
        Some(self.document.handle(sibling))
    }

    fn previous_sibling(self) -> Option<Self> {
        let sibling = self.document.nodes[self.index].previous_sibling?;
        Some(self.document.handle(sibling))
    }

    fn is_element(self) -> bool {
        matches!(
            self.document.nodes[self.index].kind,
            NodeKind::Element { .. }
        )
    }

    fn as_text(self) -> Option<Cow<'dom, str>> {
        match &self.document.nodes[self.index].kind {
            NodeKind::Text(text) => Some(Cow::Borrowed(text.as_str())),
            NodeKind::Element { .. } => None,
        }
    }

    fn node_name(self) -> Option<&'dom QualName> {
        match &self.document.nodes[self.index].kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    fn attribute(self, name: &LocalName) -> Option<String> {
        match &self.document.nodes[self.index].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(attribute, _)| attribute == name)
                .map(|(_, value)| value.clone()),
            NodeKind::Text(_) => None,
        }
    }

    fn children_have_indirection(self) -> bool {
        self.document.nodes[self.index].indirection
    }

    fn style(self) -> ServoArc<ComputedStyle> {
        self.document.nodes[self.index].style.clone()
    }

    fn pseudo_style(self, which: PseudoElement) -> Option<ServoArc<ComputedStyle>> {
        self.document.nodes[self.index]
            .pseudo_styles
            .iter()
            .find(|(pseudo, _)| *pseudo == which)
            .map(|(_, style)| style.clone())
    }

    fn layout_data_mut(self) -> AtomicRefMut<'dom, LayoutDataForNode> {
        self.document.nodes[self.index].layout_data.borrow_mut()
    }

    fn capture_state(self) -> Option<StateBlob> {
        self.document.nodes[self.index]
            .ui_state
            .borrow()
            .clone()
            .map(StateBlob)
    }

    fn restore_state(self, blob: &StateBlob) {
        let node = &self.document.nodes[self.index];
        *node.ui_state.borrow_mut() = Some(blob.0.clone());
        node.restored.borrow_mut().push(blob.0.clone());
    }
}
