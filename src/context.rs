/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-document construction state.
//!
//! One [`DocumentContext`] lives as long as the document it serves. It
//! carries the tunables, the captured-state history that survives
//! reconstruction, and the re-entrancy guard layout passes hold.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::dom::{OpaqueNode, StateBlob};

#[derive(Clone, Debug)]
pub struct TreeOptions {
    /// Hard cap on box nesting depth. Content deeper than this fails the
    /// current subtree build rather than recursing without bound.
    pub max_depth: usize,
    /// Optional cap on boxes created by a single construction pass.
    pub max_boxes_per_pass: Option<usize>,
    /// Drop whitespace-only items at run boundaries when normalizing
    /// table-structural slots. Off turns every such item into wrapped
    /// content, which is always sound and occasionally enormous.
    pub drop_table_whitespace: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: 200,
            max_boxes_per_pass: None,
            drop_table_whitespace: true,
        }
    }
}

pub struct DocumentContext {
    pub options: TreeOptions,
    in_layout: Rc<Cell<bool>>,
    state_history: FxHashMap<OpaqueNode, StateBlob>,
    pub(crate) quotes_dirty: Cell<bool>,
}

impl Default for DocumentContext {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl DocumentContext {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            in_layout: Rc::new(Cell::new(false)),
            state_history: FxHashMap::default(),
            quotes_dirty: Cell::new(false),
        }
    }

    /// Marks a layout pass as in progress for the lifetime of the guard.
    /// Mutation notifications arriving while one is held are rejected:
    /// box identities are not stable under layout.
    pub fn layout_guard(&self) -> LayoutGuard {
        debug_assert!(!self.in_layout.get(), "layout passes do not nest");
        self.in_layout.set(true);
        LayoutGuard {
            flag: Rc::clone(&self.in_layout),
        }
    }

    pub fn in_layout(&self) -> bool {
        self.in_layout.get()
    }

    pub(crate) fn store_state(&mut self, node: OpaqueNode, blob: StateBlob) {
        self.state_history.insert(node, blob);
    }

    pub(crate) fn take_state(&mut self, node: OpaqueNode) -> Option<StateBlob> {
        self.state_history.remove(&node)
    }
}

pub struct LayoutGuard {
    flag: Rc<Cell<bool>>,
}

impl Drop for LayoutGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
