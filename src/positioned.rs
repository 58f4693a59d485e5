/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Containing-block scopes and out-of-flow collection.
//!
//! While building descendants, out-of-flow boxes are queued against the
//! containing block that will own them and attached only when that
//! containing block's scope pops. A scope frame that does not itself
//! establish some containing block transfers that list upward on pop, so
//! a box always flushes exactly once, at the frame that owns its list.
//!
//! Flush order within one pop is floats, absolutes, fixed, popups.
//! Placeholder-order comparisons during incremental splicing rely on
//! floats being attached before the positioned lists are resolved.

use smallvec::SmallVec;

use crate::style::OutOfFlowKind;
use crate::tree::{BoxId, BoxTree, ChildListId};

#[derive(Debug)]
struct CollectedList {
    containing_block: BoxId,
    owned: bool,
    boxes: Vec<BoxId>,
}

impl CollectedList {
    fn inherited(containing_block: BoxId) -> Self {
        Self {
            containing_block,
            owned: false,
            boxes: Vec::new(),
        }
    }

    fn owned(containing_block: BoxId) -> Self {
        Self {
            containing_block,
            owned: true,
            boxes: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct StateFrame {
    floats: CollectedList,
    absolutes: CollectedList,
    fixeds: CollectedList,
    /// Only the base frame owns popups; everything below queues upward.
    popups: Option<CollectedList>,
}

/// One entry of a pop: attach `boxes` to `containing_block`'s `list`.
pub(crate) type FlushList = SmallVec<[(BoxId, ChildListId, Vec<BoxId>); 4]>;

pub(crate) struct ContainingBlockState {
    frames: Vec<StateFrame>,
}

impl ContainingBlockState {
    /// The base scope: `root` is every kind of containing block,
    /// including the popup destination.
    pub(crate) fn new(root: BoxId) -> Self {
        Self::rooted(root, root, root, root)
    }

    /// A base scope whose containing blocks already exist in the tree.
    /// Incremental passes seed one of these from the mutation point's
    /// ancestors.
    pub(crate) fn rooted(floats: BoxId, absolutes: BoxId, fixeds: BoxId, popups: BoxId) -> Self {
        Self {
            frames: vec![StateFrame {
                floats: CollectedList::owned(floats),
                absolutes: CollectedList::owned(absolutes),
                fixeds: CollectedList::owned(fixeds),
                popups: Some(CollectedList::owned(popups)),
            }],
        }
    }

    fn top(&mut self) -> &mut StateFrame {
        self.frames.last_mut().expect("state stack cannot be empty")
    }

    pub(crate) fn push(
        &mut self,
        containing_block: BoxId,
        for_floats: bool,
        for_absolutes: bool,
        for_fixed: bool,
    ) {
        let inherited_floats = self.top().floats.containing_block;
        let inherited_absolutes = self.top().absolutes.containing_block;
        let inherited_fixeds = self.top().fixeds.containing_block;
        self.frames.push(StateFrame {
            floats: if for_floats {
                CollectedList::owned(containing_block)
            } else {
                CollectedList::inherited(inherited_floats)
            },
            absolutes: if for_absolutes {
                CollectedList::owned(containing_block)
            } else {
                CollectedList::inherited(inherited_absolutes)
            },
            fixeds: if for_fixed {
                CollectedList::owned(containing_block)
            } else {
                CollectedList::inherited(inherited_fixeds)
            },
            popups: None,
        });
    }

    pub(crate) fn queue_out_of_flow(&mut self, kind: OutOfFlowKind, box_id: BoxId) {
        match kind {
            OutOfFlowKind::Float => self.top().floats.boxes.push(box_id),
            OutOfFlowKind::Absolute => self.top().absolutes.boxes.push(box_id),
            OutOfFlowKind::Fixed => self.top().fixeds.boxes.push(box_id),
            OutOfFlowKind::Popup => {
                let base = self
                    .frames
                    .first_mut()
                    .expect("state stack cannot be empty");
                base.popups
                    .as_mut()
                    .expect("base frame owns the popup list")
                    .boxes
                    .push(box_id);
            },
        }
    }

    /// Pops the top scope. Owned lists come back for flushing (or
    /// discarding, on failure paths); inherited lists migrate to the new
    /// top frame.
    pub(crate) fn pop(&mut self) -> FlushList {
        debug_assert!(self.frames.len() > 1, "the base frame pops via finish()");
        let frame = self.frames.pop().expect("state stack cannot be empty");
        debug_assert!(frame.popups.is_none());
        let mut flush = FlushList::new();
        let parent = self.top();
        for (list, id, parent_list) in [
            (frame.floats, ChildListId::Floats, &mut parent.floats),
            (frame.absolutes, ChildListId::Absolutes, &mut parent.absolutes),
            (frame.fixeds, ChildListId::Fixeds, &mut parent.fixeds),
        ] {
            if list.owned {
                flush.push((list.containing_block, id, list.boxes));
            } else {
                debug_assert_eq!(list.containing_block, parent_list.containing_block);
                parent_list.boxes.extend(list.boxes);
            }
        }
        flush
    }

    /// Pops the base scope at the end of a pass.
    pub(crate) fn finish(mut self) -> FlushList {
        debug_assert_eq!(self.frames.len(), 1, "unbalanced containing-block scopes");
        let frame = self.frames.pop().expect("state stack cannot be empty");
        let mut flush = FlushList::new();
        flush.push((
            frame.floats.containing_block,
            ChildListId::Floats,
            frame.floats.boxes,
        ));
        flush.push((
            frame.absolutes.containing_block,
            ChildListId::Absolutes,
            frame.absolutes.boxes,
        ));
        flush.push((
            frame.fixeds.containing_block,
            ChildListId::Fixeds,
            frame.fixeds.boxes,
        ));
        if let Some(popups) = frame.popups {
            flush.push((popups.containing_block, ChildListId::Popups, popups.boxes));
        }
        flush
    }
}

/// Attaches a popped scope's boxes. Boxes that died with a failed sibling
/// subtree are skipped; their ids no longer resolve.
pub(crate) fn attach_flushed(tree: &mut BoxTree, flush: FlushList) {
    for (containing_block, list, boxes) in flush {
        for box_id in boxes {
            if tree.contains(box_id) {
                tree.append_to_list(containing_block, list, box_id);
            }
        }
    }
}

/// Destroys a failed scope's collected boxes instead of attaching them.
pub(crate) fn discard_flushed(tree: &mut BoxTree, flush: FlushList) {
    for (_, _, boxes) in flush {
        for box_id in boxes {
            tree.destroy_subtree(box_id);
        }
    }
}
