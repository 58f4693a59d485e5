/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The box tree.
//!
//! All boxes live in one arena owned by [`BoxTree`]; everything else
//! refers to them by [`BoxId`]. Parents own their children through named
//! child lists. Cross-cutting relationships that are not ownership, the
//! placeholder↔out-of-flow pairing and the {ib}-split sibling chain, are
//! kept in side tables keyed by id so that destroying a box can never
//! leave a dangling alias, only a missed lookup.

use std::cmp::Ordering;

use bitflags::bitflags;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use servo_arc::Arc as ServoArc;
use strum::IntoStaticStr;

use crate::dom::OpaqueNode;
use crate::style::{ComputedStyle, DisplayOutside};

/// Generational handle into the box arena. Stale handles (outliving their
/// box) fail validity checks instead of aliasing a recycled slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BoxId {
    index: u32,
    generation: u32,
}

impl BoxId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// The structural role a parent box requires of its principal children.
#[derive(Clone, Copy, Debug, Eq, Hash, IntoStaticStr, PartialEq)]
pub enum SlotType {
    Block,
    Table,
    RowGroup,
    Row,
    ColGroup,
    Cell,
}

/// The closed set of box kinds.
#[derive(Clone, Debug, Eq, IntoStaticStr, PartialEq)]
pub enum BoxKind {
    Block,
    Inline,
    Text { text: String },
    Table,
    RowGroup,
    Row,
    Cell,
    ColumnGroup,
    Column,
    /// Scroll container wrapper; its single principal child is the
    /// scrolled-content block.
    Scroll,
    /// Fieldset: principal children are the rendered legend (optional)
    /// followed by the anonymous content block.
    FieldSet,
    /// In-flow stand-in for an out-of-flow box.
    Placeholder { out_of_flow: BoxId },
    /// `::first-letter` wrapper.
    Letter,
    /// `::first-line` wrapper.
    Line,
}

impl BoxKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The slot this box offers to its principal children.
    pub fn provided_slot(&self) -> SlotType {
        match self {
            BoxKind::Table => SlotType::Table,
            BoxKind::RowGroup => SlotType::RowGroup,
            BoxKind::Row => SlotType::Row,
            BoxKind::ColumnGroup => SlotType::ColGroup,
            _ => SlotType::Block,
        }
    }

    /// The slot this box demands of its parent.
    pub fn desired_slot(&self) -> SlotType {
        match self {
            BoxKind::RowGroup | BoxKind::ColumnGroup => SlotType::Table,
            BoxKind::Row => SlotType::RowGroup,
            BoxKind::Cell => SlotType::Row,
            BoxKind::Column => SlotType::ColGroup,
            _ => SlotType::Block,
        }
    }

    pub fn is_table_internal(&self) -> bool {
        matches!(
            self,
            BoxKind::RowGroup |
                BoxKind::Row |
                BoxKind::Cell |
                BoxKind::ColumnGroup |
                BoxKind::Column
        )
    }

    /// Inline-level for chain-alternation purposes.
    pub fn is_inline_level(&self, style: &ComputedStyle) -> bool {
        match self {
            BoxKind::Text { .. } | BoxKind::Letter | BoxKind::Line => true,
            BoxKind::Placeholder { .. } => true,
            _ => matches!(style.display.outside(), Some(DisplayOutside::Inline)),
        }
    }

    pub fn has_children(&self) -> bool {
        !matches!(self, BoxKind::Text { .. } | BoxKind::Placeholder { .. })
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct BoxFlags: u16 {
        /// Lives in a float/absolute/fixed/popup list, paired with a
        /// placeholder in the flow.
        const OUT_OF_FLOW = 1 << 0;
        /// Produced by `content` on `::before`/`::after`.
        const GENERATED_CONTENT = 1 << 1;
        /// Text box whose content is an open-quote mark, rewritten when
        /// quote depths are renumbered.
        const OPEN_QUOTE = 1 << 2;
        /// As above, for close-quote.
        const CLOSE_QUOTE = 1 << 3;
        /// `no-open-quote`/`no-close-quote`: adjusts depth, renders
        /// nothing.
        const SILENT_QUOTE = 1 << 7;
        const ESTABLISHES_FLOAT_CB = 1 << 4;
        const ESTABLISHES_ABS_CB = 1 << 5;
        const ESTABLISHES_FIXED_CB = 1 << 6;
    }
}

/// Names for the child lists a box may own.
#[derive(Clone, Copy, Debug, Eq, Hash, IntoStaticStr, PartialEq)]
pub enum ChildListId {
    Principal,
    Floats,
    Absolutes,
    Fixeds,
    Captions,
    Popups,
}

impl ChildListId {
    /// All lists, in flush/traversal order.
    pub const ALL: [ChildListId; 6] = [
        ChildListId::Principal,
        ChildListId::Floats,
        ChildListId::Absolutes,
        ChildListId::Fixeds,
        ChildListId::Captions,
        ChildListId::Popups,
    ];

    fn rank(self) -> u8 {
        match self {
            ChildListId::Principal => 0,
            ChildListId::Captions => 1,
            ChildListId::Floats => 2,
            ChildListId::Absolutes => 3,
            ChildListId::Fixeds => 4,
            ChildListId::Popups => 5,
        }
    }
}

#[derive(Debug, Default)]
struct ExtraChildLists {
    floats: Vec<BoxId>,
    absolutes: Vec<BoxId>,
    fixeds: Vec<BoxId>,
    captions: Vec<BoxId>,
    popups: Vec<BoxId>,
}

impl ExtraChildLists {
    fn list(&self, id: ChildListId) -> &Vec<BoxId> {
        match id {
            ChildListId::Floats => &self.floats,
            ChildListId::Absolutes => &self.absolutes,
            ChildListId::Fixeds => &self.fixeds,
            ChildListId::Captions => &self.captions,
            ChildListId::Popups => &self.popups,
            ChildListId::Principal => unreachable!("principal list is stored inline"),
        }
    }

    fn list_mut(&mut self, id: ChildListId) -> &mut Vec<BoxId> {
        match id {
            ChildListId::Floats => &mut self.floats,
            ChildListId::Absolutes => &mut self.absolutes,
            ChildListId::Fixeds => &mut self.fixeds,
            ChildListId::Captions => &mut self.captions,
            ChildListId::Popups => &mut self.popups,
            ChildListId::Principal => unreachable!("principal list is stored inline"),
        }
    }
}

/// One box. Child lists hold owning ids; `parent`/`parent_list` say where
/// this box itself is attached.
#[derive(Debug)]
pub struct BoxData {
    pub kind: BoxKind,
    style: ServoArc<ComputedStyle>,
    pub node: Option<OpaqueNode>,
    pub flags: BoxFlags,
    parent: Option<BoxId>,
    parent_list: ChildListId,
    children: Vec<BoxId>,
    extra_lists: Option<Box<ExtraChildLists>>,
}

impl BoxData {
    pub fn style(&self) -> &ServoArc<ComputedStyle> {
        &self.style
    }

    pub fn parent(&self) -> Option<BoxId> {
        self.parent
    }

    pub fn parent_list(&self) -> ChildListId {
        self.parent_list
    }

    pub fn principal_children(&self) -> &[BoxId] {
        &self.children
    }

    pub fn list(&self, id: ChildListId) -> &[BoxId] {
        match id {
            ChildListId::Principal => &self.children,
            _ => self
                .extra_lists
                .as_ref()
                .map_or(&[], |extra| extra.list(id).as_slice()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.style.is_anonymous()
    }

    pub fn is_inline_level(&self) -> bool {
        self.kind.is_inline_level(&self.style)
    }
}

/// Non-owning {ib}-split chain links for one chain member.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SplitLinks {
    pub prev: Option<BoxId>,
    pub next: Option<BoxId>,
}

#[derive(Debug)]
enum Entry {
    Occupied { generation: u32, data: Box<BoxData> },
    Vacant { generation: u32 },
}

/// The arena and the tree structure over it.
#[derive(Debug)]
pub struct BoxTree {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
    root: Option<BoxId>,
    splits: FxHashMap<BoxId, SplitLinks>,
    /// out-of-flow box id → placeholder id. The reverse direction is the
    /// placeholder's own kind.
    placeholders: FxHashMap<BoxId, BoxId>,
}

impl Default for BoxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxTree {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
            root: None,
            splits: FxHashMap::default(),
            placeholders: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> Option<BoxId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<BoxId>) {
        self.root = root;
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn contains(&self, id: BoxId) -> bool {
        match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, .. }) => *generation == id.generation,
            _ => false,
        }
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxData> {
        match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, data }) if *generation == id.generation => {
                Some(data)
            },
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: BoxId) -> Option<&mut BoxData> {
        match self.entries.get_mut(id.index()) {
            Some(Entry::Occupied { generation, data }) if *generation == id.generation => {
                Some(data)
            },
            _ => None,
        }
    }

    /// Allocates a detached box.
    pub fn create_box(
        &mut self,
        kind: BoxKind,
        style: ServoArc<ComputedStyle>,
        node: Option<OpaqueNode>,
        flags: BoxFlags,
    ) -> BoxId {
        let data = Box::new(BoxData {
            kind,
            style,
            node,
            flags,
            parent: None,
            parent_list: ChildListId::Principal,
            children: Vec::new(),
            extra_lists: None,
        });
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let generation = match self.entries[index as usize] {
                Entry::Vacant { generation } => generation,
                Entry::Occupied { .. } => unreachable!("free list pointed at a live box"),
            };
            self.entries[index as usize] = Entry::Occupied { generation, data };
            BoxId { index, generation }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry::Occupied {
                generation: 0,
                data,
            });
            BoxId {
                index,
                generation: 0,
            }
        }
    }

    pub fn append_child(&mut self, parent: BoxId, child: BoxId) {
        let len = self[parent].children.len();
        self.insert_in_list_at(parent, ChildListId::Principal, len, child);
    }

    pub fn insert_child_at(&mut self, parent: BoxId, index: usize, child: BoxId) {
        self.insert_in_list_at(parent, ChildListId::Principal, index, child);
    }

    pub fn append_to_list(&mut self, parent: BoxId, list: ChildListId, child: BoxId) {
        let len = self[parent].list(list).len();
        self.insert_in_list_at(parent, list, len, child);
    }

    pub fn insert_in_list_at(
        &mut self,
        parent: BoxId,
        list: ChildListId,
        index: usize,
        child: BoxId,
    ) {
        debug_assert!(self[child].parent.is_none(), "attaching an attached box");
        debug_assert!(self[parent].kind.has_children(), "parent kind is a leaf");
        {
            let child_data = self.get_mut(child).expect("stale box id");
            child_data.parent = Some(parent);
            child_data.parent_list = list;
        }
        let parent_data = self.get_mut(parent).expect("stale box id");
        let children = match list {
            ChildListId::Principal => &mut parent_data.children,
            _ => parent_data
                .extra_lists
                .get_or_insert_with(Default::default)
                .list_mut(list),
        };
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Detaches and returns every principal child in order. Used when a
    /// child list is about to be regrouped wholesale.
    pub fn take_principal_children(&mut self, id: BoxId) -> Vec<BoxId> {
        let children = std::mem::take(&mut self.get_mut(id).expect("stale box id").children);
        for &child in &children {
            if let Some(data) = self.get_mut(child) {
                data.parent = None;
            }
        }
        children
    }

    /// Detaches `child` from its parent's list. The box and its subtree
    /// stay alive.
    pub fn detach(&mut self, child: BoxId) {
        let (parent, list) = {
            let data = self.get_mut(child).expect("stale box id");
            let parent = data.parent.take();
            (parent, data.parent_list)
        };
        let Some(parent) = parent else {
            return;
        };
        let parent_data = self.get_mut(parent).expect("stale box id");
        let children = match list {
            ChildListId::Principal => &mut parent_data.children,
            _ => match &mut parent_data.extra_lists {
                Some(extra) => extra.list_mut(list),
                None => return,
            },
        };
        if let Some(position) = children.iter().position(|id| *id == child) {
            children.remove(position);
        }
    }

    pub fn index_in_parent(&self, child: BoxId) -> Option<(BoxId, ChildListId, usize)> {
        let data = self.get(child)?;
        let parent = data.parent?;
        let list = data.parent_list;
        let index = self[parent].list(list).iter().position(|id| *id == child)?;
        Some((parent, list, index))
    }

    /// Destroys a box and everything it owns, detaching it first. Paired
    /// boxes go together: destroying a placeholder destroys its
    /// out-of-flow box and vice versa. Content↔box mappings are the
    /// caller's to clear; the arena only knows opaque node ids.
    pub fn destroy_subtree(&mut self, id: BoxId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        self.destroy_detached(id);
    }

    fn destroy_detached(&mut self, id: BoxId) {
        // Splice this member out of its chain before the neighbors go
        // stale.
        if let Some(links) = self.splits.remove(&id) {
            if let Some(prev) = links.prev {
                if let Some(prev_links) = self.splits.get_mut(&prev) {
                    prev_links.next = links.next;
                }
            }
            if let Some(next) = links.next {
                if let Some(next_links) = self.splits.get_mut(&next) {
                    next_links.prev = links.prev;
                }
            }
        }

        // Pair teardown, map entry removed first so the cascade cannot
        // revisit this box.
        if let Some(placeholder) = self.placeholders.remove(&id) {
            if self.contains(placeholder) {
                self.detach(placeholder);
                self.destroy_detached(placeholder);
            }
        }
        if let BoxKind::Placeholder { out_of_flow } = self[id].kind {
            if self.placeholders.remove(&out_of_flow).is_some() && self.contains(out_of_flow) {
                self.detach(out_of_flow);
                self.destroy_detached(out_of_flow);
            }
        }

        let mut owned = std::mem::take(&mut self.get_mut(id).expect("stale box id").children);
        if let Some(extra) = self.get_mut(id).expect("stale box id").extra_lists.take() {
            owned.extend(extra.floats);
            owned.extend(extra.absolutes);
            owned.extend(extra.fixeds);
            owned.extend(extra.captions);
            owned.extend(extra.popups);
        }
        for child in owned {
            if self.contains(child) {
                self.get_mut(child).expect("stale box id").parent = None;
                self.destroy_detached(child);
            }
        }

        let index = id.index();
        match &mut self.entries[index] {
            entry @ Entry::Occupied { .. } => {
                let generation = match entry {
                    Entry::Occupied { generation, .. } => *generation,
                    Entry::Vacant { .. } => unreachable!(),
                };
                *entry = Entry::Vacant {
                    generation: generation.wrapping_add(1),
                };
                self.free.push(index as u32);
                self.live -= 1;
            },
            Entry::Vacant { .. } => {},
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    // {ib}-split side table.

    pub fn link_split(&mut self, prev: BoxId, next: BoxId) {
        self.splits.entry(prev).or_default().next = Some(next);
        self.splits.entry(next).or_default().prev = Some(prev);
    }

    pub fn split_links(&self, id: BoxId) -> Option<SplitLinks> {
        self.splits.get(&id).copied()
    }

    pub fn is_split_member(&self, id: BoxId) -> bool {
        self.splits.contains_key(&id)
    }

    pub fn split_chain_first(&self, id: BoxId) -> BoxId {
        let mut current = id;
        while let Some(prev) = self.splits.get(&current).and_then(|links| links.prev) {
            current = prev;
        }
        current
    }

    pub fn split_chain_last(&self, id: BoxId) -> BoxId {
        let mut current = id;
        while let Some(next) = self.splits.get(&current).and_then(|links| links.next) {
            current = next;
        }
        current
    }

    pub fn split_chain(&self, id: BoxId) -> Vec<BoxId> {
        let mut chain = vec![self.split_chain_first(id)];
        while let Some(next) = self
            .splits
            .get(chain.last().expect("chain cannot be empty"))
            .and_then(|links| links.next)
        {
            chain.push(next);
        }
        chain
    }

    // Placeholder side table.

    pub fn register_placeholder(&mut self, out_of_flow: BoxId, placeholder: BoxId) {
        debug_assert!(matches!(
            self[placeholder].kind,
            BoxKind::Placeholder { out_of_flow: target } if target == out_of_flow
        ));
        let previous = self.placeholders.insert(out_of_flow, placeholder);
        debug_assert!(previous.is_none(), "out-of-flow box already had a placeholder");
    }

    pub fn placeholder_for(&self, out_of_flow: BoxId) -> Option<BoxId> {
        self.placeholders.get(&out_of_flow).copied()
    }

    // Navigation helpers.

    pub fn ancestors(&self, id: BoxId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.get(id).and_then(|data| data.parent),
        }
    }

    pub fn is_ancestor_of(&self, ancestor: BoxId, descendant: BoxId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    fn path_from_root(&self, id: BoxId) -> Vec<(u8, usize)> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some((parent, list, index)) = self.index_in_parent(current) {
            path.push((list.rank(), index));
            current = parent;
        }
        path.reverse();
        path
    }

    /// Document-order comparison of two attached boxes, by their paths
    /// from the root. Ancestors order before their descendants.
    pub fn compare_tree_order(&self, a: BoxId, b: BoxId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.path_from_root(a).cmp(&self.path_from_root(b))
    }

    /// Walks the whole tree checking the structural invariants. Meant for
    /// tests and debug assertions; logs and returns the first violation.
    pub fn check_consistency(&self) -> Result<(), String> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut seen = 0usize;
        self.check_box(root, None, &mut seen)?;
        if seen != self.live {
            return Err(format!(
                "{} live boxes but {} reachable from the root",
                self.live, seen
            ));
        }
        for (out_of_flow, placeholder) in &self.placeholders {
            if !self.contains(*out_of_flow) || !self.contains(*placeholder) {
                return Err("placeholder table entry points at a dead box".to_owned());
            }
            match self[*placeholder].kind {
                BoxKind::Placeholder { out_of_flow: target } if target == *out_of_flow => {},
                _ => return Err("placeholder table disagrees with placeholder kind".to_owned()),
            }
        }
        for (member, _) in &self.splits {
            if !self.contains(*member) {
                return Err("split table entry points at a dead box".to_owned());
            }
            let chain = self.split_chain(*member);
            if chain.len() < 3 || chain.len() % 2 == 0 {
                return Err(format!("split chain of even or trivial length {}", chain.len()));
            }
            let alternates = chain
                .iter()
                .tuple_windows()
                .all(|(a, b)| self[*a].is_inline_level() != self[*b].is_inline_level());
            if !alternates {
                return Err("split chain does not alternate inline/block".to_owned());
            }
            if !self[chain[0]].is_inline_level() ||
                !self[*chain.last().expect("chain cannot be empty")].is_inline_level()
            {
                return Err("split chain must start and end inline".to_owned());
            }
        }
        Ok(())
    }

    fn check_box(
        &self,
        id: BoxId,
        parent: Option<(BoxId, ChildListId)>,
        seen: &mut usize,
    ) -> Result<(), String> {
        let Some(data) = self.get(id) else {
            return Err(format!("child list holds stale id {id:?}"));
        };
        *seen += 1;
        match (parent, data.parent) {
            (Some((expected, list)), Some(actual)) => {
                if expected != actual || list != data.parent_list {
                    return Err(format!("box {id:?} disagrees with its parent about linkage"));
                }
            },
            (None, None) => {},
            _ => return Err(format!("box {id:?} parent pointer mismatch")),
        }
        if let Some((parent_id, list)) = parent {
            if list == ChildListId::Principal {
                let provided = self[parent_id].kind.provided_slot();
                let desired = data.kind.desired_slot();
                if provided != desired {
                    return Err(format!(
                        "slot mismatch: {} under {} (desired {:?}, provided {:?})",
                        data.kind.name(),
                        self[parent_id].kind.name(),
                        desired,
                        provided,
                    ));
                }
            }
            if matches!(
                list,
                ChildListId::Floats | ChildListId::Absolutes | ChildListId::Fixeds | ChildListId::Popups
            ) {
                if !data.flags.contains(BoxFlags::OUT_OF_FLOW) {
                    return Err(format!("in-flow box {id:?} in an out-of-flow list"));
                }
                if self.placeholder_for(id).is_none() {
                    return Err(format!("out-of-flow box {id:?} has no placeholder"));
                }
            }
        }
        if data.flags.contains(BoxFlags::OUT_OF_FLOW) &&
            parent.is_some_and(|(_, list)| list == ChildListId::Principal)
        {
            return Err(format!("out-of-flow box {id:?} attached to a principal list"));
        }
        for list in ChildListId::ALL {
            for child in data.list(list) {
                self.check_box(*child, Some((id, list)), seen)?;
            }
        }
        Ok(())
    }
}

impl std::ops::Index<BoxId> for BoxTree {
    type Output = BoxData;

    fn index(&self, id: BoxId) -> &BoxData {
        self.get(id).expect("stale box id")
    }
}

impl std::ops::IndexMut<BoxId> for BoxTree {
    fn index_mut(&mut self, id: BoxId) -> &mut BoxData {
        self.get_mut(id).expect("stale box id")
    }
}

pub struct AncestorIterator<'a> {
    tree: &'a BoxTree,
    current: Option<BoxId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = BoxId;

    fn next(&mut self) -> Option<BoxId> {
        let current = self.current?;
        self.current = self.tree.get(current).and_then(|data| data.parent);
        Some(current)
    }
}
