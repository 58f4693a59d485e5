/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Table-grammar normalization. `normalize` rewrites an item list so
//! every item's desired slot equals the slot the parent provides,
//! synthesizing anonymous wrapper items around mismatched runs.
//!
//! Wrappers carry look-ahead children rather than built boxes: the
//! builder recurses into a wrapper like any other container, which
//! re-normalizes the run against the wrapper's own slot. One call
//! therefore only has to fix the outermost level.

use log::debug;

use crate::construct::items::{ConstructionItem, ItemFlags, synthetic_wrapper};
use crate::context::TreeOptions;
use crate::dom::ContentNode;
use crate::dom_traversal::NodeAndStyleInfo;
use crate::style::PseudoElement;
use crate::tree::SlotType;

/// Whitespace that the table grammar may discard. Preserved whitespace
/// never gets the flag; indirect containers opt out wholesale.
fn droppable(flags: ItemFlags, options: &TreeOptions) -> bool {
    options.drop_table_whitespace &&
        flags.contains(ItemFlags::WHITESPACE_ONLY) &&
        !flags.contains(ItemFlags::FROM_INDIRECT_CONTAINER)
}

/// The anonymous box whose own slot type is `slot`.
fn provider_wrapper(slot: SlotType) -> PseudoElement {
    match slot {
        SlotType::Table => PseudoElement::AnonymousTable,
        SlotType::RowGroup => PseudoElement::AnonymousTableRowGroup,
        SlotType::Row => PseudoElement::AnonymousTableRow,
        SlotType::ColGroup => PseudoElement::AnonymousTableColGroup,
        SlotType::Cell | SlotType::Block => PseudoElement::AnonymousTableCell,
    }
}

/// Fallback wrapper for runs with no single non-Block desire, keyed by
/// the parent's slot.
fn canonical_wrapper(parent_slot: SlotType, column_run: bool) -> PseudoElement {
    match parent_slot {
        SlotType::Block => PseudoElement::AnonymousTable,
        SlotType::Row => PseudoElement::AnonymousTableCell,
        SlotType::RowGroup => PseudoElement::AnonymousTableRow,
        SlotType::Table if column_run => PseudoElement::AnonymousTableColGroup,
        SlotType::Table => PseudoElement::AnonymousTableRowGroup,
        SlotType::Cell | SlotType::ColGroup => {
            debug_assert!(false, "no canonical wrapper under {:?}", parent_slot);
            PseudoElement::AnonymousTable
        },
    }
}

fn is_table_structural(slot: SlotType) -> bool {
    matches!(
        slot,
        SlotType::Table | SlotType::RowGroup | SlotType::Row | SlotType::ColGroup
    )
}

/// Rewrites `items` so every returned item's desired slot equals
/// `parent_slot`. Mismatched runs become synthetic wrapper items whose
/// look-ahead children are the run; droppable whitespace at run
/// boundaries is suppressed instead of wrapped.
pub(crate) fn normalize<'dom, Node>(
    items: Vec<ConstructionItem<'dom, Node>>,
    parent_slot: SlotType,
    parent_info: &NodeAndStyleInfo<Node>,
    options: &TreeOptions,
) -> Vec<ConstructionItem<'dom, Node>>
where
    Node: ContentNode<'dom>,
{
    if items.is_empty() {
        return items;
    }
    if parent_slot == SlotType::ColGroup {
        return retain_columns(items);
    }
    if is_table_structural(parent_slot) &&
        items.iter().all(|item| droppable(item.flags, options))
    {
        // An all-whitespace list inside table structure leaves nothing.
        for item in items {
            item.suppress();
        }
        return Vec::new();
    }

    let mut normalizer = Normalizer {
        parent_slot,
        parent_info,
        options,
        out: Vec::new(),
        run: Vec::new(),
        run_family: None,
        held_whitespace: Vec::new(),
    };
    for item in items {
        normalizer.push(item);
    }
    normalizer.finish()
}

/// Only `<col>`-type content survives in a column group. Everything
/// else, whitespace included, is undisplayed.
fn retain_columns<'dom, Node>(
    items: Vec<ConstructionItem<'dom, Node>>,
) -> Vec<ConstructionItem<'dom, Node>>
where
    Node: ContentNode<'dom>,
{
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.desired_slot == SlotType::ColGroup {
            out.push(item);
        } else {
            if !item.is_whitespace_only() {
                debug!("dropping non-column content in a column group");
            }
            item.suppress();
        }
    }
    out
}

struct Normalizer<'a, 'dom, Node>
where
    Node: ContentNode<'dom>,
{
    parent_slot: SlotType,
    parent_info: &'a NodeAndStyleInfo<Node>,
    options: &'a TreeOptions,
    out: Vec<ConstructionItem<'dom, Node>>,
    /// The current maximal mismatched run.
    run: Vec<ConstructionItem<'dom, Node>>,
    /// `Some(true)` once the run contains column-family content,
    /// `Some(false)` for row-family. Whitespace is neutral.
    run_family: Option<bool>,
    /// Matching whitespace seen right after a run. Dropped if the run
    /// continues past it, emitted as ordinary content otherwise.
    held_whitespace: Vec<ConstructionItem<'dom, Node>>,
}

impl<'dom, Node> Normalizer<'_, 'dom, Node>
where
    Node: ContentNode<'dom>,
{
    fn push(&mut self, item: ConstructionItem<'dom, Node>) {
        if item.desired_slot == self.parent_slot {
            if !self.run.is_empty() && droppable(item.flags, self.options) {
                // Possibly interior to the run; decided by what follows.
                self.held_whitespace.push(item);
                return;
            }
            self.close_run();
            self.release_held_whitespace();
            self.out.push(item);
            return;
        }

        let family = item_family(&item);
        if !self.held_whitespace.is_empty() {
            // Mismatched content on both sides of the whitespace: the
            // run absorbs it, i.e. the whitespace drops out.
            for whitespace in self.held_whitespace.drain(..) {
                whitespace.suppress();
            }
        }
        if let (Some(run_family), Some(family)) = (self.run_family, family) {
            // Columns and rows are separate grammar families inside a
            // table; never let them share a wrapper.
            if self.parent_slot == SlotType::Table && run_family != family {
                self.close_run();
            }
        }
        if let Some(family) = family {
            self.run_family = Some(family);
        }
        self.run.push(item);
    }

    fn finish(mut self) -> Vec<ConstructionItem<'dom, Node>> {
        self.close_run();
        self.release_held_whitespace();
        self.out
    }

    fn release_held_whitespace(&mut self) {
        self.out.append(&mut self.held_whitespace);
    }

    fn close_run(&mut self) {
        self.run_family = None;
        if self.run.is_empty() {
            return;
        }
        let mut run = std::mem::take(&mut self.run);

        // Boundary whitespace is dropped, never wrapped.
        while run
            .first()
            .is_some_and(|item| droppable(item.flags, self.options))
        {
            run.remove(0).suppress();
        }
        while run
            .last()
            .is_some_and(|item| droppable(item.flags, self.options))
        {
            if let Some(item) = run.pop() {
                item.suppress();
            }
        }
        if run.is_empty() {
            return;
        }

        let column_run = run.iter().any(|item| item_family(item) == Some(true));
        let shared_desire = shared_non_block_desire(&run);
        let pseudo = match shared_desire {
            Some(slot) => provider_wrapper(slot),
            None => canonical_wrapper(self.parent_slot, column_run),
        };
        let mut wrapper = synthetic_wrapper(self.parent_info, pseudo, run);

        // The wrapper itself may still not fit the parent; keep adding
        // levels until it does. Each step either climbs the desire chain
        // or resolves through the canonical map, so this terminates.
        while wrapper.desired_slot != self.parent_slot {
            let pseudo = if wrapper.desired_slot == SlotType::Block {
                canonical_wrapper(self.parent_slot, false)
            } else {
                provider_wrapper(wrapper.desired_slot)
            };
            wrapper = synthetic_wrapper(self.parent_info, pseudo, vec![wrapper]);
        }
        self.out.push(wrapper);
    }
}

/// `Some(true)` for column-family content, `Some(false)` for the row
/// family, `None` for text, which belongs to whichever run it touches.
fn item_family<'dom, Node>(item: &ConstructionItem<'dom, Node>) -> Option<bool>
where
    Node: ContentNode<'dom>,
{
    if item.flags.contains(ItemFlags::IS_TEXT) {
        None
    } else {
        Some(item.flags.contains(ItemFlags::COLUMN_FAMILY))
    }
}

fn shared_non_block_desire<'dom, Node>(run: &[ConstructionItem<'dom, Node>]) -> Option<SlotType>
where
    Node: ContentNode<'dom>,
{
    let first = run.first()?.desired_slot;
    if first == SlotType::Block || first == SlotType::Cell {
        return None;
    }
    run.iter()
        .all(|item| item.desired_slot == first)
        .then_some(first)
}
