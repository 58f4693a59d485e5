/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Drives one construction pass: items in, attached boxes out.
//!
//! The builder owns the containing-block scope stack and the pass
//! budgets. Per-kind structure (scroll wrappers, fieldset content
//! blocks, caption routing) lives here; grammar normalization and the
//! inline split are delegated.

use html5ever::{local_name, namespace_url, ns};
use log::debug;
use servo_arc::Arc as ServoArc;
use smallvec::{SmallVec, smallvec};

use crate::construct::first_line;
use crate::construct::fixup::normalize;
use crate::construct::inline_split::split_inline_box;
use crate::construct::items::{
    ConstructionItem, ItemCollector, ItemContents, ItemFlags, classify_element,
};
use crate::context::DocumentContext;
use crate::dom::{ContentNode, LayoutBox, OpaqueNode};
use crate::dom_traversal::{NodeAndStyleInfo, PseudoElementContentItem};
use crate::error::ConstructionError;
use crate::positioned::{ContainingBlockState, FlushList, attach_flushed, discard_flushed};
use crate::quotes;
use crate::style::{ComputedStyle, Display, PseudoElement};
use crate::tree::{BoxFlags, BoxId, BoxKind, BoxTree, ChildListId};

/// The boxes one item contributed to its parent's flow, plus the box
/// the content node maps to. An out-of-flow item flows a placeholder
/// but maps to the real box; a split inline flows its whole chain.
pub(crate) struct BuiltBoxes {
    pub(crate) flow: SmallVec<[BoxId; 1]>,
    pub(crate) primary: Option<BoxId>,
}

impl BuiltBoxes {
    fn one(id: BoxId) -> Self {
        Self {
            flow: smallvec![id],
            primary: Some(id),
        }
    }
}

fn establishes_float_cb(kind: &BoxKind) -> bool {
    matches!(
        kind,
        BoxKind::Block | BoxKind::Cell | BoxKind::Scroll | BoxKind::FieldSet
    )
}

fn box_flags_for(kind: &BoxKind, style: &ComputedStyle) -> BoxFlags {
    let mut flags = BoxFlags::empty();
    if establishes_float_cb(kind) {
        flags |= BoxFlags::ESTABLISHES_FLOAT_CB;
    }
    if style.establishes_containing_block_for_absolutes() {
        flags |= BoxFlags::ESTABLISHES_ABS_CB;
    }
    flags
}

pub(crate) struct TreeBuilder<'t, 'ctx> {
    pub(crate) tree: &'t mut BoxTree,
    pub(crate) context: &'ctx mut DocumentContext,
    pub(crate) cb_state: ContainingBlockState,
    depth: usize,
    boxes_created: usize,
}

impl<'t, 'ctx> TreeBuilder<'t, 'ctx> {
    pub(crate) fn new(
        tree: &'t mut BoxTree,
        context: &'ctx mut DocumentContext,
        cb_state: ContainingBlockState,
    ) -> Self {
        Self {
            tree,
            context,
            cb_state,
            depth: 0,
            boxes_created: 0,
        }
    }

    /// Ends the pass, handing back the base scope for attachment.
    pub(crate) fn into_flush(self) -> FlushList {
        self.cb_state.finish()
    }

    /// All box allocation funnels through here so the pass budget is
    /// enforced uniformly.
    pub(crate) fn new_box(
        &mut self,
        kind: BoxKind,
        style: ServoArc<ComputedStyle>,
        node: Option<OpaqueNode>,
        flags: BoxFlags,
    ) -> Result<BoxId, ConstructionError> {
        if let Some(limit) = self.context.options.max_boxes_per_pass {
            if self.boxes_created >= limit {
                return Err(ConstructionError::BoxLimitExceeded { limit });
            }
        }
        self.boxes_created += 1;
        Ok(self.tree.create_box(kind, style, node, flags))
    }

    fn descend<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ConstructionError>,
    ) -> Result<R, ConstructionError> {
        let limit = self.context.options.max_depth;
        if self.depth >= limit {
            return Err(ConstructionError::DepthLimitExceeded { limit });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Runs `f` with `containing_block` as the nearest scope for the
    /// lists it establishes. The scope's collected boxes attach on
    /// success and are destroyed on failure; either way the scope pops.
    fn with_scope<R>(
        &mut self,
        containing_block: BoxId,
        for_floats: bool,
        for_absolutes: bool,
        f: impl FnOnce(&mut Self) -> Result<R, ConstructionError>,
    ) -> Result<R, ConstructionError> {
        if !for_floats && !for_absolutes {
            return f(self);
        }
        self.cb_state
            .push(containing_block, for_floats, for_absolutes, false);
        let result = f(self);
        let flush = self.cb_state.pop();
        match result {
            Ok(value) => {
                attach_flushed(self.tree, flush);
                Ok(value)
            },
            Err(error) => {
                discard_flushed(self.tree, flush);
                Err(error)
            },
        }
    }

    /// Normalizes `items` against `parent_box`'s slot and builds each as
    /// a child. A failed item suppresses everything after it; the error
    /// surfaces once the survivors' slots are recorded.
    pub(crate) fn build_into<'dom, Node>(
        &mut self,
        parent_box: BoxId,
        parent_info: &NodeAndStyleInfo<Node>,
        items: Vec<ConstructionItem<'dom, Node>>,
    ) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let provided = self.tree[parent_box].kind.provided_slot();
        let items = normalize(items, provided, parent_info, &self.context.options);
        let mut failure = None;
        for item in items {
            if failure.is_some() {
                item.suppress();
                continue;
            }
            if let Err(error) = self.build_and_attach(parent_box, item) {
                failure = Some(error);
            }
        }
        failure.map_or(Ok(()), Err)
    }

    fn build_and_attach<'dom, Node>(
        &mut self,
        parent_box: BoxId,
        item: ConstructionItem<'dom, Node>,
    ) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let to_captions = item.flags.contains(ItemFlags::IS_CAPTION) &&
            matches!(self.tree[parent_box].kind, BoxKind::Table);
        let built = self.build_item_boxes(item)?;
        for box_id in built.flow {
            if to_captions {
                self.tree
                    .append_to_list(parent_box, ChildListId::Captions, box_id);
            } else {
                self.tree.append_child(parent_box, box_id);
            }
        }
        Ok(())
    }

    /// Builds one item into detached boxes and records the content
    /// node's box mapping. The caller decides where the flow boxes go.
    pub(crate) fn build_item_boxes<'dom, Node>(
        &mut self,
        item: ConstructionItem<'dom, Node>,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let ConstructionItem {
            info,
            contents,
            flags,
            box_slot,
            ..
        } = item;
        let result = match contents {
            ItemContents::Text(text) => self.build_text(&info, text, flags),
            ItemContents::QuoteMark => self.build_quote_mark(&info, flags),
            ItemContents::Element(node) => self.build_element(&info, node, flags),
            ItemContents::Synthetic(children) => self.build_wrapper(&info, children),
            ItemContents::GeneratedItems(generated) => {
                self.build_generated(&info, generated, flags)
            },
        };
        match result {
            Ok(built) => {
                if let Some(slot) = box_slot {
                    match built.primary.or_else(|| built.flow.first().copied()) {
                        Some(primary) => slot.set(LayoutBox::Principal(primary)),
                        None => slot.set(LayoutBox::Undisplayed),
                    }
                }
                Ok(built)
            },
            Err(error) => {
                if let Some(slot) = box_slot {
                    slot.set(LayoutBox::Undisplayed);
                }
                Err(error)
            },
        }
    }

    fn build_text<'dom, Node>(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        text: String,
        flags: ItemFlags,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let mut box_flags = BoxFlags::empty();
        if flags.contains(ItemFlags::GENERATED_CONTENT) {
            box_flags |= BoxFlags::GENERATED_CONTENT;
        }
        let id = self.new_box(
            BoxKind::Text { text },
            info.style.clone(),
            Some(info.node.opaque()),
            box_flags,
        )?;
        Ok(BuiltBoxes::one(id))
    }

    /// Quote marks are empty text boxes until the end-of-pass renumber
    /// walk assigns depth-appropriate marks.
    fn build_quote_mark<'dom, Node>(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        flags: ItemFlags,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let mut box_flags = BoxFlags::GENERATED_CONTENT;
        if flags.contains(ItemFlags::OPEN_QUOTE) {
            box_flags |= BoxFlags::OPEN_QUOTE;
        }
        if flags.contains(ItemFlags::CLOSE_QUOTE) {
            box_flags |= BoxFlags::CLOSE_QUOTE;
        }
        if flags.contains(ItemFlags::SILENT_QUOTE) {
            box_flags |= BoxFlags::SILENT_QUOTE;
        }
        self.context.quotes_dirty.set(true);
        let id = self.new_box(
            BoxKind::Text {
                text: String::new(),
            },
            info.style.clone(),
            Some(info.node.opaque()),
            box_flags,
        )?;
        Ok(BuiltBoxes::one(id))
    }

    fn build_element<'dom, Node>(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        node: Node,
        flags: ItemFlags,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let kind = classify_element(node.node_name(), &info.style);
        let out_of_flow = flags.contains(ItemFlags::OUT_OF_FLOW);
        let mut box_flags = box_flags_for(&kind, &info.style);
        if flags.contains(ItemFlags::GENERATED_CONTENT) {
            box_flags |= BoxFlags::GENERATED_CONTENT;
        }
        if out_of_flow {
            box_flags |= BoxFlags::OUT_OF_FLOW;
        }
        let box_id = self.new_box(
            kind.clone(),
            info.style.clone(),
            Some(node.opaque()),
            box_flags,
        )?;

        // A node rebuilt after removal gets its captured state back
        // before any binding can observe the children.
        if let Some(blob) = self.context.take_state(node.opaque()) {
            node.restore_state(&blob);
        }

        let result = self.with_scope(
            box_id,
            box_flags.contains(BoxFlags::ESTABLISHES_FLOAT_CB),
            box_flags.contains(BoxFlags::ESTABLISHES_ABS_CB),
            |builder| {
                builder.build_box_children(box_id, &kind, info, node)?;
                builder.maybe_wrap_first(box_id, &kind, info, node)
            },
        );
        if let Err(error) = result {
            self.tree.destroy_subtree(box_id);
            return Err(error);
        }

        if matches!(kind, BoxKind::Inline) {
            let non_uniform = self.tree[box_id]
                .principal_children()
                .iter()
                .any(|&child| !self.tree[child].is_inline_level());
            if non_uniform {
                match split_inline_box(self, box_id, info) {
                    Ok(chain) => {
                        return Ok(BuiltBoxes {
                            flow: chain,
                            primary: Some(box_id),
                        });
                    },
                    Err(error) => {
                        self.tree.destroy_subtree(box_id);
                        return Err(error);
                    },
                }
            }
        }

        self.finish_container(box_id, info, out_of_flow)
    }

    /// Per-kind child structure. `parent_box` already exists; children
    /// are attached (in)to it.
    fn build_box_children<'dom, Node>(
        &mut self,
        parent_box: BoxId,
        kind: &BoxKind,
        info: &NodeAndStyleInfo<Node>,
        node: Node,
    ) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        match kind {
            // Columns render no content of their own.
            BoxKind::Column => Ok(()),
            BoxKind::Scroll => {
                let style = ComputedStyle::anonymous(&info.style, PseudoElement::ScrolledContent);
                let inner_info =
                    NodeAndStyleInfo::new_for_pseudo(node, PseudoElement::ScrolledContent, style);
                let inner = self.new_box(
                    BoxKind::Block,
                    inner_info.style.clone(),
                    Some(node.opaque()),
                    BoxFlags::empty(),
                )?;
                self.tree.append_child(parent_box, inner);
                let items = ItemCollector::collect_children(node);
                self.descend(|builder| builder.build_into(inner, &inner_info, items))
            },
            BoxKind::FieldSet => self.build_fieldset_children(parent_box, info, node),
            _ => {
                let items = ItemCollector::collect_children(node);
                self.descend(|builder| builder.build_into(parent_box, info, items))
            },
        }
    }

    /// A fieldset renders its first legend child directly, then the rest
    /// of its content inside an anonymous block.
    fn build_fieldset_children<'dom, Node>(
        &mut self,
        fieldset: BoxId,
        info: &NodeAndStyleInfo<Node>,
        node: Node,
    ) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let mut items = ItemCollector::collect_children(node);
        let legend = items
            .iter()
            .position(is_rendered_legend)
            .map(|index| items.remove(index));
        if let Some(legend) = legend {
            match self.descend(|builder| builder.build_item_boxes(legend)) {
                Ok(built) => {
                    for box_id in built.flow {
                        self.tree.append_child(fieldset, box_id);
                    }
                },
                Err(error) => {
                    for item in items {
                        item.suppress();
                    }
                    return Err(error);
                },
            }
        }
        let style = ComputedStyle::anonymous(&info.style, PseudoElement::FieldsetContent);
        let content_info =
            NodeAndStyleInfo::new_for_pseudo(node, PseudoElement::FieldsetContent, style);
        let content = match self.new_box(
            BoxKind::Block,
            content_info.style.clone(),
            Some(node.opaque()),
            BoxFlags::empty(),
        ) {
            Ok(content) => content,
            Err(error) => {
                for item in items {
                    item.suppress();
                }
                return Err(error);
            },
        };
        self.tree.append_child(fieldset, content);
        self.descend(|builder| builder.build_into(content, &content_info, items))
    }

    fn build_wrapper<'dom, Node>(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        children: Vec<ConstructionItem<'dom, Node>>,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let kind = classify_element(None, &info.style);
        let box_flags = box_flags_for(&kind, &info.style);
        let box_id = self.new_box(
            kind,
            info.style.clone(),
            Some(info.node.opaque()),
            box_flags,
        )?;
        let result = self.with_scope(
            box_id,
            box_flags.contains(BoxFlags::ESTABLISHES_FLOAT_CB),
            box_flags.contains(BoxFlags::ESTABLISHES_ABS_CB),
            |builder| builder.descend(|builder| builder.build_into(box_id, info, children)),
        );
        if let Err(error) = result {
            self.tree.destroy_subtree(box_id);
            return Err(error);
        }
        Ok(BuiltBoxes::one(box_id))
    }

    fn build_generated<'dom, Node>(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        generated: Vec<PseudoElementContentItem>,
        flags: ItemFlags,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        let kind = classify_element(None, &info.style);
        let out_of_flow = flags.contains(ItemFlags::OUT_OF_FLOW);
        let mut box_flags = box_flags_for(&kind, &info.style) | BoxFlags::GENERATED_CONTENT;
        if out_of_flow {
            box_flags |= BoxFlags::OUT_OF_FLOW;
        }
        let box_id = self.new_box(
            kind,
            info.style.clone(),
            Some(info.node.opaque()),
            box_flags,
        )?;
        let items = ItemCollector::collect_generated(info, generated);
        let result = self.with_scope(
            box_id,
            box_flags.contains(BoxFlags::ESTABLISHES_FLOAT_CB),
            box_flags.contains(BoxFlags::ESTABLISHES_ABS_CB),
            |builder| builder.descend(|builder| builder.build_into(box_id, info, items)),
        );
        if let Err(error) = result {
            self.tree.destroy_subtree(box_id);
            return Err(error);
        }
        self.finish_container(box_id, info, out_of_flow)
    }

    /// Common tail for containers: in-flow boxes pass through, while an
    /// out-of-flow box is queued against its containing block and leaves
    /// a placeholder behind in the flow.
    fn finish_container<'dom, Node>(
        &mut self,
        box_id: BoxId,
        info: &NodeAndStyleInfo<Node>,
        out_of_flow: bool,
    ) -> Result<BuiltBoxes, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        if !out_of_flow {
            return Ok(BuiltBoxes::one(box_id));
        }
        let Some(oof_kind) = info.style.out_of_flow_kind() else {
            debug_assert!(false, "out-of-flow item with an in-flow style");
            return Ok(BuiltBoxes::one(box_id));
        };
        let placeholder = match self.new_box(
            BoxKind::Placeholder { out_of_flow: box_id },
            info.style.clone(),
            Some(info.node.opaque()),
            BoxFlags::empty(),
        ) {
            Ok(placeholder) => placeholder,
            Err(error) => {
                self.tree.destroy_subtree(box_id);
                return Err(error);
            },
        };
        self.tree.register_placeholder(box_id, placeholder);
        self.cb_state.queue_out_of_flow(oof_kind, box_id);
        debug!(
            "queued {:?} box for {:?} behind a placeholder",
            oof_kind,
            info.node
        );
        Ok(BuiltBoxes {
            flow: smallvec![placeholder],
            primary: Some(box_id),
        })
    }

    /// First-line and first-letter wrapping applies to element-backed
    /// block containers whose element carries the pseudo styles.
    pub(crate) fn maybe_wrap_first<'dom, Node>(
        &mut self,
        box_id: BoxId,
        kind: &BoxKind,
        info: &NodeAndStyleInfo<Node>,
        node: Node,
    ) -> Result<(), ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        if !matches!(kind, BoxKind::Block | BoxKind::Cell | BoxKind::Scroll) {
            return Ok(());
        }
        if info.pseudo_element_type.is_some() {
            return Ok(());
        }
        if node.pseudo_style(PseudoElement::FirstLine).is_none() &&
            node.pseudo_style(PseudoElement::FirstLetter).is_none()
        {
            return Ok(());
        }
        let target = if matches!(kind, BoxKind::Scroll) {
            match self.tree[box_id].principal_children().first() {
                Some(&inner) => inner,
                None => return Ok(()),
            }
        } else {
            box_id
        };
        first_line::apply_wrappers(self, target, node)
    }
}

fn is_rendered_legend<'dom, Node>(item: &ConstructionItem<'dom, Node>) -> bool
where
    Node: ContentNode<'dom>,
{
    match &item.contents {
        ItemContents::Element(node) => node
            .node_name()
            .is_some_and(|name| name.ns == ns!(html) && name.local == local_name!("legend")),
        _ => false,
    }
}

/// Builds the document subtree rooted at `root` into an empty `tree`.
/// The root box is always block-level and is every kind of containing
/// block, popups included. On failure the tree is left without a root
/// and the content mappings are cleared.
pub(crate) fn build_document<'dom, Node>(
    tree: &mut BoxTree,
    context: &mut DocumentContext,
    root: Node,
) -> Result<(), ConstructionError>
where
    Node: ContentNode<'dom>,
{
    debug_assert!(tree.root().is_none(), "building into a rooted tree");
    let style = root.style();
    if matches!(style.display, Display::None) {
        root.unset_boxes_in_subtree();
        root.set_primary_box(LayoutBox::Undisplayed);
        return Ok(());
    }
    let kind = match classify_element(root.node_name(), &style) {
        BoxKind::Inline => BoxKind::Block,
        kind => kind,
    };
    let root_flags = BoxFlags::ESTABLISHES_FLOAT_CB |
        BoxFlags::ESTABLISHES_ABS_CB |
        BoxFlags::ESTABLISHES_FIXED_CB;
    let root_box = tree.create_box(kind.clone(), style.clone(), Some(root.opaque()), root_flags);
    tree.set_root(Some(root_box));
    let info = NodeAndStyleInfo::new(root, style);

    let mut builder = TreeBuilder::new(tree, context, ContainingBlockState::new(root_box));
    builder.boxes_created = 1;
    let result = builder
        .build_box_children(root_box, &kind, &info, root)
        .and_then(|()| builder.maybe_wrap_first(root_box, &kind, &info, root));
    let flush = builder.into_flush();
    match result {
        Ok(()) => attach_flushed(tree, flush),
        Err(error) => {
            discard_flushed(tree, flush);
            tree.destroy_subtree(root_box);
            root.unset_boxes_in_subtree();
            return Err(error);
        },
    }
    root.set_primary_box(LayoutBox::Principal(root_box));
    Ok(())
}

impl BoxTree {
    /// Builds a fresh box tree for the subtree rooted at `root`.
    pub fn construct<'dom, Node>(
        context: &mut DocumentContext,
        root: Node,
    ) -> Result<BoxTree, ConstructionError>
    where
        Node: ContentNode<'dom>,
    {
        debug_assert!(!context.in_layout(), "construction during a layout pass");
        let mut tree = BoxTree::new();
        build_document(&mut tree, context, root)?;
        if context.quotes_dirty.replace(false) {
            quotes::renumber(&mut tree);
        }
        debug_assert_eq!(tree.check_consistency(), Ok(()));
        Ok(tree)
    }
}
