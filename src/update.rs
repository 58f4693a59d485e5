/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Incremental maintenance of an existing box tree.
//!
//! Content mutations arrive as notifications against a live tree. Each
//! one either repairs the tree locally, runs a bounded construction pass
//! for just the affected nodes, or, when local repair cannot preserve
//! the structural invariants, falls back to reconstructing the smallest
//! safely-rebuildable ancestor subtree ("wipe"). The wipe is not an
//! error path; it is the designed coarser-granularity retry.
//!
//! Notifications are bracketed by an [`UpdateScope`]; deferred
//! bookkeeping that needs a stable whole-tree view (quote renumbering)
//! runs when the scope ends. Notifications issued without an explicit
//! scope open one for their own duration.

use std::cmp::Ordering;

use html5ever::{LocalName, local_name, namespace_url, ns};
use log::{debug, error, warn};

use crate::construct::builder::{TreeBuilder, build_document};
use crate::construct::first_line;
use crate::construct::inline_split::extend_chain_tail;
use crate::construct::items::{ConstructionItem, ItemCollector, ItemFlags};
use crate::context::DocumentContext;
use crate::dom::{ContentNode, LayoutBox};
use crate::dom_traversal::NodeAndStyleInfo;
use crate::error::ConstructionError;
use crate::positioned::{ContainingBlockState, FlushList};
use crate::quotes;
use crate::style::PseudoElement;
use crate::tree::{BoxFlags, BoxId, BoxKind, BoxTree, ChildListId, SlotType};

impl BoxTree {
    /// Opens an update scope. Mutation notifications may be batched
    /// inside it; deferred bookkeeping runs when the scope drops.
    pub fn begin_update<'t, 'ctx>(
        &'t mut self,
        context: &'ctx mut DocumentContext,
    ) -> UpdateScope<'t, 'ctx> {
        UpdateScope {
            tree: self,
            context,
        }
    }

    /// `child` was inserted among `container`'s children.
    pub fn content_inserted<'dom, Node>(
        &mut self,
        context: &mut DocumentContext,
        container: Node,
        child: Node,
    ) where
        Node: ContentNode<'dom>,
    {
        self.begin_update(context).content_inserted(container, child);
    }

    /// `first_appended` and all its following siblings were appended to
    /// `container`.
    pub fn content_appended<'dom, Node>(
        &mut self,
        context: &mut DocumentContext,
        container: Node,
        first_appended: Node,
    ) where
        Node: ContentNode<'dom>,
    {
        self.begin_update(context)
            .content_appended(container, first_appended);
    }

    /// `child` was removed from `container`. The notification arrives
    /// after the detach, while the node handle is still alive.
    pub fn content_removed<'dom, Node>(
        &mut self,
        context: &mut DocumentContext,
        container: Node,
        child: Node,
    ) where
        Node: ContentNode<'dom>,
    {
        self.begin_update(context).content_removed(container, child);
    }

    /// Discards and rebuilds the boxes for `node`'s subtree, widening to
    /// the nearest safely-rebuildable ancestor when `node`'s own boxes
    /// cannot be respliced in place.
    pub fn reconstruct_subtree<'dom, Node>(
        &mut self,
        context: &mut DocumentContext,
        node: Node,
    ) where
        Node: ContentNode<'dom>,
    {
        self.begin_update(context).reconstruct_subtree(node);
    }
}

/// A batch of mutation notifications against one tree.
pub struct UpdateScope<'t, 'ctx> {
    tree: &'t mut BoxTree,
    context: &'ctx mut DocumentContext,
}

impl Drop for UpdateScope<'_, '_> {
    fn drop(&mut self) {
        if self.context.quotes_dirty.replace(false) {
            quotes::renumber(self.tree);
        }
        if !std::thread::panicking() {
            debug_assert_eq!(self.tree.check_consistency(), Ok(()));
        }
    }
}

enum Plan {
    Local,
    ExtendChain(BoxId),
    Wipe(&'static str),
}

impl UpdateScope<'_, '_> {
    /// Box identities are not stable while layout runs; a notification
    /// arriving then is a caller bug and is dropped in release builds.
    fn rejected(&self) -> bool {
        if self.context.in_layout() {
            debug_assert!(false, "mutation notification during a layout pass");
            error!("dropping a content mutation notified during layout");
            return true;
        }
        false
    }

    pub fn content_inserted<'dom, Node>(&mut self, container: Node, child: Node)
    where
        Node: ContentNode<'dom>,
    {
        if self.rejected() {
            return;
        }
        self.insert_or_append(container, vec![child]);
    }

    pub fn content_appended<'dom, Node>(&mut self, container: Node, first_appended: Node)
    where
        Node: ContentNode<'dom>,
    {
        if self.rejected() {
            return;
        }
        let mut nodes = Vec::new();
        let mut next = Some(first_appended);
        while let Some(node) = next {
            nodes.push(node);
            next = node.next_sibling();
        }
        self.insert_or_append(container, nodes);
    }

    pub fn content_removed<'dom, Node>(&mut self, container: Node, child: Node)
    where
        Node: ContentNode<'dom>,
    {
        if self.rejected() {
            return;
        }
        let Some(mapping) = child.primary_box() else {
            // Never built; nothing to repair.
            return;
        };
        match mapping {
            LayoutBox::Undisplayed => child.unset_boxes_in_subtree(),
            LayoutBox::DisplayContents => {
                // The hoisted children are scattered through an ancestor
                // child list; rebuilding the ancestor is the sound move.
                child.unset_boxes_in_subtree();
                self.wipe(container);
            },
            LayoutBox::Principal(box_id) => self.remove_box(container, child, box_id),
        }
    }

    pub fn reconstruct_subtree<'dom, Node>(&mut self, node: Node)
    where
        Node: ContentNode<'dom>,
    {
        if self.rejected() {
            return;
        }
        // Rebuilding in place needs a box that can be destroyed and
        // respliced whole; a split-chain member or an anonymous wrapper
        // cannot, so route through the same root selection as any other
        // structural repair.
        self.wipe(node);
    }

    // Insertion.

    fn insert_or_append<'dom, Node>(&mut self, container: Node, nodes: Vec<Node>)
    where
        Node: ContentNode<'dom>,
    {
        let Some(&first) = nodes.first() else {
            return;
        };
        let Some((parent_box, owner)) = self.insertion_parent(container) else {
            debug!("mutation under a boxless container; nothing to update");
            return;
        };
        let mut items: Vec<ConstructionItem<'dom, Node>> = Vec::new();
        for &node in &nodes {
            items.extend(ItemCollector::collect_node(node));
        }
        if items.is_empty() {
            return;
        }

        let provided = self.tree[parent_box].kind.provided_slot();
        if provided != SlotType::Block && items.iter().all(|item| item.is_whitespace_only()) {
            // Whitespace the table grammar would drop anyway; the
            // shortcut is unsound under child indirection or when the
            // drop policy is off.
            let unsound = container.children_have_indirection() ||
                !self.context.options.drop_table_whitespace;
            for item in items {
                item.suppress();
            }
            if unsound {
                debug!("whitespace fast path disabled; reconstructing an ancestor");
                self.wipe(container);
            }
            return;
        }

        match self.plan_insertion(parent_box, owner, &nodes, &items) {
            Plan::Wipe(reason) => {
                debug!("local insert is unsound ({reason}); reconstructing an ancestor");
                for item in items {
                    item.suppress();
                }
                self.wipe(container);
            },
            Plan::ExtendChain(tail) => self.extend_chain(tail, owner, items),
            Plan::Local => self.insert_local(parent_box, owner, container, first, items),
        }
    }

    fn plan_insertion<'dom, Node>(
        &self,
        parent_box: BoxId,
        owner: Node,
        nodes: &[Node],
        items: &[ConstructionItem<'dom, Node>],
    ) -> Plan
    where
        Node: ContentNode<'dom>,
    {
        let parent = &self.tree[parent_box];
        if matches!(parent.kind, BoxKind::Inline) {
            let at_end = nodes
                .last()
                .copied()
                .is_some_and(|last| appended_at_end(last));
            if self.tree.is_split_member(parent_box) {
                if at_end && !has_first_pseudos(owner) {
                    return Plan::ExtendChain(self.tree.split_chain_last(parent_box));
                }
                return Plan::Wipe("mutation inside a split inline");
            }
            if items.iter().any(|item| !item.is_inline_level()) {
                // A fresh split changes the identity of ancestor boxes;
                // it can only be produced by reconstruction.
                return Plan::Wipe("block-level content inside an all-inline inline");
            }
            return Plan::Local;
        }
        let provided = parent.kind.provided_slot();
        if items.iter().any(|item| item.desired_slot != provided) {
            return Plan::Wipe("slot-incompatible content");
        }
        if matches!(parent.kind, BoxKind::Table) &&
            items
                .iter()
                .any(|item| item.flags.contains(ItemFlags::IS_CAPTION))
        {
            return Plan::Wipe("caption insertion into an existing table");
        }
        if element_is(owner, &local_name!("fieldset")) &&
            nodes
                .iter()
                .any(|&node| element_is(node, &local_name!("legend")))
        {
            return Plan::Wipe("legend change inside a fieldset");
        }
        Plan::Local
    }

    fn insert_local<'dom, Node>(
        &mut self,
        parent_box: BoxId,
        owner: Node,
        container: Node,
        first: Node,
        items: Vec<ConstructionItem<'dom, Node>>,
    ) where
        Node: ContentNode<'dom>,
    {
        // First-line/letter wrappers encode positions a mutation
        // invalidates: flatten before, reapply after.
        let bracket =
            has_first_pseudos(owner) && !matches!(self.tree[parent_box].kind, BoxKind::Inline);
        if bracket {
            first_line::unwrap_for_mutation(self.tree, parent_box);
        }
        let index = match self.insertion_index(parent_box, owner, first) {
            Ok(index) => index,
            Err(reason) => {
                debug!("sibling resolution failed ({reason}); reconstructing an ancestor");
                for item in items {
                    item.suppress();
                }
                self.wipe(container);
                return;
            },
        };

        let state = seeded_state(self.tree, parent_box);
        let mut builder = TreeBuilder::new(self.tree, self.context, state);
        let mut at = index;
        let mut failure = None;
        for item in items {
            if failure.is_some() {
                item.suppress();
                continue;
            }
            match builder.build_item_boxes(item) {
                Ok(built) => {
                    for id in built.flow {
                        builder.tree.insert_child_at(parent_box, at, id);
                        at += 1;
                    }
                },
                Err(error) => failure = Some(error),
            }
        }
        if bracket {
            if let Err(error) = first_line::apply_wrappers(&mut builder, parent_box, owner) {
                failure.get_or_insert(error);
            }
        }
        let flush = builder.into_flush();
        splice_flushed(self.tree, flush);
        if let Some(error) = failure {
            warn!("incremental construction failed: {error}; affected content stays boxless");
        }
    }

    /// Grows an existing {ib}-split chain to absorb content appended to
    /// the element's end, which lives in the chain's trailing inline.
    fn extend_chain<'dom, Node>(
        &mut self,
        tail: BoxId,
        owner: Node,
        items: Vec<ConstructionItem<'dom, Node>>,
    ) where
        Node: ContentNode<'dom>,
    {
        let state = seeded_state(self.tree, tail);
        let mut builder = TreeBuilder::new(self.tree, self.context, state);
        let mut new_boxes = Vec::new();
        let mut failure = None;
        for item in items {
            if failure.is_some() {
                item.suppress();
                continue;
            }
            match builder.build_item_boxes(item) {
                Ok(built) => new_boxes.extend(built.flow),
                Err(error) => failure = Some(error),
            }
        }
        if failure.is_none() {
            let info = NodeAndStyleInfo::new(owner, owner.style());
            match extend_chain_tail(&mut builder, tail, new_boxes, &info) {
                Ok(added) => {
                    let (chain_parent, _, tail_index) = builder
                        .tree
                        .index_in_parent(tail)
                        .expect("chain tail is attached");
                    let mut at = tail_index + 1;
                    for id in added {
                        builder.tree.insert_child_at(chain_parent, at, id);
                        at += 1;
                    }
                },
                Err(error) => failure = Some(error),
            }
        } else {
            for id in new_boxes {
                builder.tree.destroy_subtree(id);
            }
        }
        let flush = builder.into_flush();
        splice_flushed(self.tree, flush);
        if let Some(error) = failure {
            warn!("chain extension failed: {error}; appended content stays boxless");
        }
    }

    // Removal.

    fn remove_box<'dom, Node>(&mut self, container: Node, child: Node, box_id: BoxId)
    where
        Node: ContentNode<'dom>,
    {
        if !self.tree.contains(box_id) {
            child.unset_boxes_in_subtree();
            return;
        }
        if self.tree.is_split_member(box_id) {
            debug!("removing a split-chain member; reconstructing an ancestor");
            child.unset_boxes_in_subtree();
            self.wipe(container);
            return;
        }
        let Some((point, owner)) = self.insertion_parent(container) else {
            self.tree.destroy_subtree(box_id);
            child.unset_boxes_in_subtree();
            return;
        };
        let bracket =
            has_first_pseudos(owner) && !matches!(self.tree[point].kind, BoxKind::Inline);
        if bracket {
            first_line::unwrap_for_mutation(self.tree, point);
        }

        let flow = if self.tree[box_id].flags.contains(BoxFlags::OUT_OF_FLOW) {
            self.tree.placeholder_for(box_id).unwrap_or(box_id)
        } else {
            box_id
        };
        let Some((parent, _, _)) = self.tree.index_in_parent(flow) else {
            self.tree.destroy_subtree(flow);
            child.unset_boxes_in_subtree();
            return;
        };
        let parent_data = &self.tree[parent];
        let sole = parent_data.principal_children().len() == 1;
        let wipe_reason = if sole &&
            (parent_data.kind.is_table_internal() || matches!(parent_data.kind, BoxKind::Table))
        {
            Some("removal empties table structure")
        } else if sole && parent_data.is_anonymous() {
            Some("removal empties an anonymous wrapper")
        } else if element_is(container, &local_name!("fieldset")) &&
            element_is(child, &local_name!("legend"))
        {
            Some("legend removal from a fieldset")
        } else {
            None
        };
        if let Some(reason) = wipe_reason {
            debug!("local removal is unsound ({reason}); reconstructing an ancestor");
            child.unset_boxes_in_subtree();
            self.wipe(container);
            return;
        }

        if subtree_has_quotes(self.tree, box_id) {
            self.context.quotes_dirty.set(true);
        }
        self.tree.destroy_subtree(flow);
        child.unset_boxes_in_subtree();
        if bracket {
            self.rewrap(point, owner);
        }
    }

    fn rewrap<'dom, Node>(&mut self, point: BoxId, owner: Node)
    where
        Node: ContentNode<'dom>,
    {
        let state = seeded_state(self.tree, point);
        let mut builder = TreeBuilder::new(self.tree, self.context, state);
        if let Err(error) = first_line::apply_wrappers(&mut builder, point, owner) {
            warn!("reapplying first-line wrappers failed: {error}");
        }
        let flush = builder.into_flush();
        splice_flushed(self.tree, flush);
    }

    // Reconstruction.

    fn wipe<'dom, Node>(&mut self, node: Node)
    where
        Node: ContentNode<'dom>,
    {
        let root = self.reconstruction_root(node);
        self.reconstruct(root);
    }

    /// Walks content ancestors until one whose box can be destroyed and
    /// rebuilt in place: a real (non-anonymous), non-inline,
    /// non-table-internal, in-flow box outside any split chain. Worst
    /// case the document root.
    fn reconstruction_root<'dom, Node>(&self, node: Node) -> Node
    where
        Node: ContentNode<'dom>,
    {
        let mut current = node;
        loop {
            if self.is_safe_root(current) {
                return current;
            }
            match current.parent_node() {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    fn is_safe_root<'dom, Node>(&self, node: Node) -> bool
    where
        Node: ContentNode<'dom>,
    {
        match node.primary_box() {
            Some(LayoutBox::Principal(id)) if self.tree.contains(id) => {
                let data = &self.tree[id];
                !data.is_anonymous() &&
                    !data.kind.is_table_internal() &&
                    !matches!(data.kind, BoxKind::Inline) &&
                    !data.flags.contains(BoxFlags::OUT_OF_FLOW) &&
                    !self.tree.is_split_member(id)
            },
            _ => false,
        }
    }

    /// Reconstructs at `node`, escalating to successive ancestors while
    /// rebuilding fails; the last resort rebuilds from the document
    /// root, and failure there leaves an empty tree.
    fn reconstruct<'dom, Node>(&mut self, node: Node)
    where
        Node: ContentNode<'dom>,
    {
        let mut target = node;
        loop {
            match self.try_reconstruct(target) {
                Ok(()) => return,
                Err(error) => {
                    warn!("reconstruction at {target:?} failed: {error}");
                    match target.parent_node() {
                        Some(parent) => target = self.reconstruction_root(parent),
                        None => {
                            if let Some(root) = self.tree.root() {
                                self.tree.destroy_subtree(root);
                            }
                            target.unset_boxes_in_subtree();
                            return;
                        },
                    }
                },
            }
        }
    }

    fn try_reconstruct<'dom, Node>(&mut self, node: Node) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        debug!("reconstructing the subtree at {node:?}");
        capture_subtree_state(self.context, node);
        if node.parent_node().is_none() {
            if let Some(root) = self.tree.root() {
                self.tree.destroy_subtree(root);
            }
            node.unset_boxes_in_subtree();
            return build_document(self.tree, self.context, node);
        }
        let saved = match node.primary_box() {
            Some(LayoutBox::Principal(id)) if self.tree.contains(id) => {
                let flow = if self.tree[id].flags.contains(BoxFlags::OUT_OF_FLOW) {
                    self.tree.placeholder_for(id).unwrap_or(id)
                } else {
                    id
                };
                self.tree
                    .index_in_parent(flow)
                    .map(|(parent, list, index)| (flow, parent, list, index))
            },
            _ => None,
        };
        let Some((flow, parent, list, index)) = saved else {
            // No box of its own to splice back; repair the parent.
            let parent = node.parent_node().expect("non-root node has a parent");
            return self.try_reconstruct(parent);
        };
        if subtree_has_quotes(self.tree, flow) {
            self.context.quotes_dirty.set(true);
        }
        self.tree.destroy_subtree(flow);
        node.unset_boxes_in_subtree();

        let items = ItemCollector::collect_node(node);
        let state = seeded_state(self.tree, parent);
        let mut builder = TreeBuilder::new(self.tree, self.context, state);
        let mut at = index;
        let mut result = Ok(());
        for item in items {
            if result.is_err() {
                item.suppress();
                continue;
            }
            match builder.build_item_boxes(item) {
                Ok(built) => {
                    for id in built.flow {
                        builder.tree.insert_in_list_at(parent, list, at, id);
                        at += 1;
                    }
                },
                Err(error) => result = Err(error),
            }
        }
        let flush = builder.into_flush();
        splice_flushed(self.tree, flush);
        result
    }

    // Resolution helpers.

    /// The box whose principal child list corresponds to `container`'s
    /// child order, plus the node that owns it. Walks up through
    /// `display: contents`, and into the structural insertion point of
    /// scroll wrappers and fieldsets.
    fn insertion_parent<'dom, Node>(&self, container: Node) -> Option<(BoxId, Node)>
    where
        Node: ContentNode<'dom>,
    {
        let mut current = container;
        let principal = loop {
            match current.primary_box()? {
                LayoutBox::Undisplayed => return None,
                LayoutBox::DisplayContents => current = current.parent_node()?,
                LayoutBox::Principal(id) => break id,
            }
        };
        if !self.tree.contains(principal) {
            return None;
        }
        let data = &self.tree[principal];
        let point = match data.kind {
            BoxKind::Scroll => *data.principal_children().first()?,
            BoxKind::FieldSet => data.principal_children().iter().copied().find(|&child| {
                self.tree[child].style().pseudo == Some(PseudoElement::FieldsetContent)
            })?,
            _ => principal,
        };
        Some((point, current))
    }

    /// The principal-list index at which new boxes for `first` belong,
    /// from the nearest sibling with a box representation. `Err` when a
    /// sibling's boxes live under anonymous structure that a local
    /// splice cannot navigate.
    fn insertion_index<'dom, Node>(
        &self,
        parent_box: BoxId,
        owner: Node,
        first: Node,
    ) -> Result<usize, &'static str>
    where
        Node: ContentNode<'dom>,
    {
        // `first`'s siblings may be exhausted without finding a boxed
        // one when the container is `display: contents`; its boxes live
        // among the container's own siblings, so the walk climbs until
        // it runs in `owner`'s child list.
        let mut from = first;
        loop {
            let mut prev = from.previous_sibling();
            while let Some(node) = prev {
                if let Some(flow) = self.flow_repr(node, true)? {
                    let Some((parent, list, index)) = self.tree.index_in_parent(flow) else {
                        return Err("sibling box is detached");
                    };
                    if parent != parent_box || list != ChildListId::Principal {
                        return Err("anonymous structure borders the mutation point");
                    }
                    return Ok(index + 1);
                }
                prev = node.previous_sibling();
            }
            match from.parent_node() {
                Some(parent) if parent != owner => from = parent,
                _ => break,
            }
        }
        let mut from = first;
        loop {
            let mut next = from.next_sibling();
            while let Some(node) = next {
                if let Some(flow) = self.flow_repr(node, false)? {
                    let Some((parent, list, index)) = self.tree.index_in_parent(flow) else {
                        return Err("sibling box is detached");
                    };
                    if parent != parent_box || list != ChildListId::Principal {
                        return Err("anonymous structure borders the mutation point");
                    }
                    return Ok(index);
                }
                next = node.next_sibling();
            }
            match from.parent_node() {
                Some(parent) if parent != owner => from = parent,
                _ => break,
            }
        }
        // No boxed siblings: land before the ::after box if one exists.
        if let Some(LayoutBox::Principal(after)) = owner.pseudo_box(PseudoElement::After) {
            if let Some((parent, _, index)) = self.tree.index_in_parent(after) {
                if parent == parent_box {
                    return Ok(index);
                }
            }
        }
        Ok(self.tree[parent_box].principal_children().len())
    }

    /// The in-flow box standing for `node` in its parent's principal
    /// list: the placeholder of an out-of-flow box, the near end of a
    /// split chain, the flattened children of `display: contents`.
    /// `Ok(None)` for nodes with no box representation.
    fn flow_repr<'dom, Node>(
        &self,
        node: Node,
        from_the_end: bool,
    ) -> Result<Option<BoxId>, &'static str>
    where
        Node: ContentNode<'dom>,
    {
        match node.primary_box() {
            None | Some(LayoutBox::Undisplayed) => Ok(None),
            Some(LayoutBox::DisplayContents) => {
                let mut children = Vec::new();
                let mut child = node.first_child();
                while let Some(current) = child {
                    children.push(current);
                    child = current.next_sibling();
                }
                if from_the_end {
                    children.reverse();
                }
                for child in children {
                    if let Some(flow) = self.flow_repr(child, from_the_end)? {
                        return Ok(Some(flow));
                    }
                }
                Ok(None)
            },
            Some(LayoutBox::Principal(id)) => {
                if !self.tree.contains(id) {
                    return Ok(None);
                }
                let id = if from_the_end {
                    self.tree.split_chain_last(id)
                } else {
                    self.tree.split_chain_first(id)
                };
                if self.tree[id].flags.contains(BoxFlags::OUT_OF_FLOW) {
                    self.tree
                        .placeholder_for(id)
                        .map(Some)
                        .ok_or("out-of-flow sibling lacks a placeholder")
                } else {
                    Ok(Some(id))
                }
            },
        }
    }
}

/// A containing-block base scope whose anchors are the nearest existing
/// establishers above (and including) `from`.
fn seeded_state(tree: &BoxTree, from: BoxId) -> ContainingBlockState {
    let mut floats = None;
    let mut absolutes = None;
    let mut fixeds = None;
    let mut root = from;
    for id in std::iter::once(from).chain(tree.ancestors(from)) {
        let flags = tree[id].flags;
        if floats.is_none() && flags.contains(BoxFlags::ESTABLISHES_FLOAT_CB) {
            floats = Some(id);
        }
        if absolutes.is_none() && flags.contains(BoxFlags::ESTABLISHES_ABS_CB) {
            absolutes = Some(id);
        }
        if fixeds.is_none() && flags.contains(BoxFlags::ESTABLISHES_FIXED_CB) {
            fixeds = Some(id);
        }
        root = id;
    }
    ContainingBlockState::rooted(
        floats.unwrap_or(root),
        absolutes.unwrap_or(root),
        fixeds.unwrap_or(root),
        root,
    )
}

/// Attaches a pass's out-of-flow boxes, splicing each into its list at
/// the position its placeholder holds in tree order. Fresh construction
/// appends instead; only incremental passes splice into populated lists.
fn splice_flushed(tree: &mut BoxTree, flush: FlushList) {
    for (containing_block, list, boxes) in flush {
        for box_id in boxes {
            if !tree.contains(box_id) {
                continue;
            }
            let Some(placeholder) = tree.placeholder_for(box_id) else {
                tree.append_to_list(containing_block, list, box_id);
                continue;
            };
            let index = {
                let existing = tree[containing_block].list(list);
                existing
                    .iter()
                    .position(|&other| {
                        tree.placeholder_for(other).is_some_and(|other_placeholder| {
                            tree.compare_tree_order(placeholder, other_placeholder) ==
                                Ordering::Less
                        })
                    })
                    .unwrap_or(existing.len())
            };
            tree.insert_in_list_at(containing_block, list, index, box_id);
        }
    }
}

fn capture_subtree_state<'dom, Node>(context: &mut DocumentContext, node: Node)
where
    Node: ContentNode<'dom>,
{
    if let Some(blob) = node.capture_state() {
        context.store_state(node.opaque(), blob);
    }
    let mut child = node.first_child();
    while let Some(current) = child {
        capture_subtree_state(context, current);
        child = current.next_sibling();
    }
}

fn subtree_has_quotes(tree: &BoxTree, id: BoxId) -> bool {
    if tree[id]
        .flags
        .intersects(BoxFlags::OPEN_QUOTE | BoxFlags::CLOSE_QUOTE)
    {
        return true;
    }
    ChildListId::ALL.iter().any(|&list| {
        tree[id]
            .list(list)
            .iter()
            .any(|&child| subtree_has_quotes(tree, child))
    })
}

fn element_is<'dom, Node>(node: Node, name: &LocalName) -> bool
where
    Node: ContentNode<'dom>,
{
    node.node_name()
        .is_some_and(|qual| qual.ns == ns!(html) && qual.local == *name)
}

fn has_first_pseudos<'dom, Node>(node: Node) -> bool
where
    Node: ContentNode<'dom>,
{
    node.pseudo_style(PseudoElement::FirstLine).is_some() ||
        node.pseudo_style(PseudoElement::FirstLetter).is_some()
}

/// True when nothing after `last` has a box representation, i.e. the
/// mutation lands at the element's visual end.
fn appended_at_end<'dom, Node>(last: Node) -> bool
where
    Node: ContentNode<'dom>,
{
    let mut next = last.next_sibling();
    while let Some(node) = next {
        match node.primary_box() {
            None | Some(LayoutBox::Undisplayed) => {},
            _ => return false,
        }
        next = node.next_sibling();
    }
    true
}
