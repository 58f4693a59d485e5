/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The boundary to the content (document) tree.
//!
//! The document implementation lives with the embedder; construction sees
//! it through [`ContentNode`], a copyable handle with navigation, style
//! accessors, and per-node layout data. The content↔box mapping is stored
//! in that layout data and written through [`BoxSlot`] guards so that a
//! traversal cannot forget to fill a slot.

use std::borrow::Cow;
use std::fmt;
use std::hash::Hash;

use atomic_refcell::AtomicRefMut;
use html5ever::QualName;

use crate::cell::ArcRefCell;
use crate::style::{ComputedStyle, PseudoElement};
use crate::tree::BoxId;
use servo_arc::Arc as ServoArc;

/// A stable, copyable identity for a content node, usable after the
/// borrowed handle is gone. Boxes keep these as back-pointers.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Serialize)]
pub struct OpaqueNode(pub usize);

/// Embedder-defined UI state (scroll offsets, form values) carried across
/// reconstruction. The constructor never looks inside.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateBlob(pub Vec<u8>);

/// What the content↔box mapping records for a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayoutBox {
    /// The node generates no box (`display: none`, or suppressed by
    /// structural rules). Recorded so updates can tell "never built"
    /// from "deliberately boxless".
    Undisplayed,
    /// `display: contents`: no box of its own, children hoist upward.
    DisplayContents,
    /// The node's primary box.
    Principal(BoxId),
}

/// Per-node data owned by the embedder's node storage.
#[derive(Default)]
pub struct LayoutDataForNode {
    pub(crate) self_box: ArcRefCell<Option<LayoutBox>>,
    pub(crate) pseudo_boxes: Option<Box<PseudoBoxes>>,
}

#[derive(Default)]
pub(crate) struct PseudoBoxes {
    pub(crate) before: ArcRefCell<Option<LayoutBox>>,
    pub(crate) after: ArcRefCell<Option<LayoutBox>>,
}

/// A mutable reference to the box slot of a node (or one of its eager
/// pseudo-elements). Dropping a slot without setting it is a traversal
/// bug, caught by the drop assertion.
pub struct BoxSlot<'dom> {
    pub(crate) slot: ArcRefCell<Option<LayoutBox>>,
    pub(crate) marker: std::marker::PhantomData<&'dom ()>,
}

impl BoxSlot<'_> {
    pub(crate) fn new(slot: ArcRefCell<Option<LayoutBox>>) -> Self {
        *slot.borrow_mut() = None;
        Self {
            slot,
            marker: std::marker::PhantomData,
        }
    }

    pub(crate) fn set(self, layout_box: LayoutBox) {
        *self.slot.borrow_mut() = Some(layout_box);
    }
}

impl Drop for BoxSlot<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(self.slot.borrow().is_some(), "failed to set a layout box");
        }
    }
}

/// A node in the embedder's content tree.
///
/// Handles are `Copy` and valid for the `'dom` borrow of a construction
/// or update pass. Styles arrive already resolved; `style()` and
/// `pseudo_style()` are this crate's only windows into the style system.
pub trait ContentNode<'dom>: 'dom + Copy + Eq + Hash + fmt::Debug {
    fn opaque(self) -> OpaqueNode;

    fn parent_node(self) -> Option<Self>;
    fn first_child(self) -> Option<Self>;
    fn next_sibling(self) -> Option<Self>;
    fn previous_sibling(self) -> Option<Self>;

    fn is_element(self) -> bool;
    /// Text content for text nodes, `None` for elements.
    fn as_text(self) -> Option<Cow<'dom, str>>;
    /// Tag identity for elements, `None` for text.
    fn node_name(self) -> Option<&'dom QualName>;
    fn attribute(self, name: &html5ever::LocalName) -> Option<String>;

    /// True when a binding mechanism may reorder or filter this node's
    /// children. Whitespace-suppression shortcuts are unsound then.
    fn children_have_indirection(self) -> bool;

    fn style(self) -> ServoArc<ComputedStyle>;
    fn pseudo_style(self, which: PseudoElement) -> Option<ServoArc<ComputedStyle>>;

    fn layout_data_mut(self) -> AtomicRefMut<'dom, LayoutDataForNode>;

    /// Read out UI state worth preserving across reconstruction.
    fn capture_state(self) -> Option<StateBlob>;
    fn restore_state(self, blob: &StateBlob);

    fn box_slot(&self) -> BoxSlot<'dom> {
        BoxSlot::new(self.layout_data_mut().self_box.clone())
    }

    fn pseudo_box_slot(&self, which: PseudoElement) -> BoxSlot<'dom> {
        let mut data = self.layout_data_mut();
        let pseudos = data.pseudo_boxes.get_or_insert_with(Default::default);
        let cell = match which {
            PseudoElement::Before => pseudos.before.clone(),
            PseudoElement::After => pseudos.after.clone(),
            _ => panic!("only ::before and ::after own box slots"),
        };
        BoxSlot::new(cell)
    }

    fn primary_box(self) -> Option<LayoutBox> {
        *self.layout_data_mut().self_box.borrow()
    }

    fn pseudo_box(self, which: PseudoElement) -> Option<LayoutBox> {
        let data = self.layout_data_mut();
        let pseudos = data.pseudo_boxes.as_ref()?;
        let cell = match which {
            PseudoElement::Before => &pseudos.before,
            PseudoElement::After => &pseudos.after,
            _ => return None,
        };
        *cell.borrow()
    }

    fn set_primary_box(self, layout_box: LayoutBox) {
        *self.layout_data_mut().self_box.borrow_mut() = Some(layout_box);
    }

    fn unset_all_boxes(self) {
        let mut data = self.layout_data_mut();
        *data.self_box.borrow_mut() = None;
        if let Some(pseudos) = &data.pseudo_boxes {
            *pseudos.before.borrow_mut() = None;
            *pseudos.after.borrow_mut() = None;
        }
    }

    /// Clears the content↔box mapping for a whole content subtree, ahead
    /// of that subtree's boxes being destroyed or rebuilt.
    fn unset_boxes_in_subtree(self) {
        self.unset_all_boxes();
        let mut child = self.first_child();
        while let Some(node) = child {
            node.unset_boxes_in_subtree();
            child = node.next_sibling();
        }
    }
}
