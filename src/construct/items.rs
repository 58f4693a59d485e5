/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Construction items: per-node descriptors carrying everything the
//! grammar engine and builder need to know before any box exists.
//! Items live for one construction pass and are consumed by it.

use std::borrow::Cow;

use bitflags::bitflags;
use html5ever::{QualName, local_name, namespace_url, ns};
use log::debug;

use crate::dom::{BoxSlot, ContentNode, LayoutBox};
use crate::dom_traversal::{
    Contents, NodeAndStyleInfo, PseudoElementContentItem, TraversalHandler,
    collapse_and_transform_whitespace, is_whitespace_only, traverse_children_of, traverse_element,
};
use crate::style::{
    ComputedStyle, DisplayGeneratingBox, DisplayInside, DisplayLayoutInternal, DisplayOutside,
    PseudoElement,
};
use crate::tree::{BoxKind, SlotType};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub(crate) struct ItemFlags: u16 {
        const IS_TEXT = 1 << 0;
        /// Text that collapsed to whitespace only; candidate for dropping
        /// at table-grammar run boundaries.
        const WHITESPACE_ONLY = 1 << 1;
        const BLOCK_LEVEL = 1 << 2;
        const INLINE_LEVEL = 1 << 3;
        const OUT_OF_FLOW = 1 << 4;
        const GENERATED_CONTENT = 1 << 5;
        const IS_CAPTION = 1 << 6;
        /// `<col>`/`<colgroup>` grammar family; never shares a wrapper
        /// with row-family content.
        const COLUMN_FAMILY = 1 << 7;
        /// Produced under a container whose child list may be reordered
        /// by a binding; whitespace shortcuts are off.
        const FROM_INDIRECT_CONTAINER = 1 << 8;
        const OPEN_QUOTE = 1 << 9;
        const CLOSE_QUOTE = 1 << 10;
        /// no-open-quote / no-close-quote: depth effect, no text.
        const SILENT_QUOTE = 1 << 11;
    }
}

pub(crate) enum ItemContents<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    /// Recurse into the element's children at build time.
    Element(Node),
    /// A collapsed text run.
    Text(String),
    /// A quote mark whose text is assigned when depths renumber.
    QuoteMark,
    /// Generated `content` items of a `::before`/`::after` box.
    GeneratedItems(Vec<PseudoElementContentItem>),
    /// Grammar-synthesized wrapper: children were built ahead of it.
    Synthetic(Vec<ConstructionItem<'dom, Node>>),
}

pub(crate) struct ConstructionItem<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    pub info: NodeAndStyleInfo<Node>,
    pub contents: ItemContents<'dom, Node>,
    pub desired_slot: SlotType,
    pub flags: ItemFlags,
    /// Where to record the built box. `None` for synthesized items and
    /// generated children.
    pub box_slot: Option<BoxSlot<'dom>>,
}

impl<'dom, Node> ConstructionItem<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    pub(crate) fn is_inline_level(&self) -> bool {
        self.flags.contains(ItemFlags::INLINE_LEVEL)
    }

    pub(crate) fn is_whitespace_only(&self) -> bool {
        self.flags.contains(ItemFlags::WHITESPACE_ONLY)
    }

    /// Consumes the item without building it, recording "no box" for
    /// every slot it owns. Used for dropped whitespace, content rejected
    /// by the grammar, and unwinding after a failed sibling.
    pub(crate) fn suppress(self) {
        if let Some(slot) = self.box_slot {
            slot.set(LayoutBox::Undisplayed);
        }
        match self.contents {
            ItemContents::Synthetic(children) => {
                for child in children {
                    child.suppress();
                }
            },
            ItemContents::Element(node) => {
                node.unset_boxes_in_subtree();
                node.set_primary_box(LayoutBox::Undisplayed);
            },
            ItemContents::Text(_) |
            ItemContents::QuoteMark |
            ItemContents::GeneratedItems(_) => {},
        }
    }
}

/// Element-specific construction overrides, consulted before the display
/// fallback. Keyed by (namespace, local name).
fn element_override(name: &QualName) -> Option<BoxKind> {
    if name.ns != ns!(html) {
        return None;
    }
    match name.local {
        local_name!("fieldset") => Some(BoxKind::FieldSet),
        _ => None,
    }
}

/// Resolves the box kind for an element-backed (or anonymous) item:
/// element overrides first, then the generic display mapping.
pub(crate) fn classify_element(name: Option<&QualName>, style: &ComputedStyle) -> BoxKind {
    let out_of_flow = style.is_out_of_flow();
    if let Some(name) = name {
        if let Some(kind) = element_override(name) {
            // Overrides only apply to flow layout; e.g. a table-displayed
            // fieldset is just a table.
            let flow_display = matches!(
                style.display,
                crate::style::Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
                    inside: DisplayInside::Flow | DisplayInside::FlowRoot,
                    ..
                })
            );
            if flow_display && !style.establishes_scroll_container() {
                return kind;
            }
        }
    }
    let display = match style.display {
        crate::style::Display::GeneratingBox(display) => display,
        // None/Contents never reach classification.
        _ => return BoxKind::Block,
    };
    match display {
        DisplayGeneratingBox::LayoutInternal(internal) => {
            if out_of_flow {
                // Out-of-flow internal parts blockify.
                return BoxKind::Block;
            }
            match internal {
                DisplayLayoutInternal::TableCaption => BoxKind::Block,
                DisplayLayoutInternal::TableCell => BoxKind::Cell,
                DisplayLayoutInternal::TableColumn => BoxKind::Column,
                DisplayLayoutInternal::TableColumnGroup => BoxKind::ColumnGroup,
                DisplayLayoutInternal::TableRow => BoxKind::Row,
                DisplayLayoutInternal::TableRowGroup |
                DisplayLayoutInternal::TableHeaderGroup |
                DisplayLayoutInternal::TableFooterGroup => BoxKind::RowGroup,
            }
        },
        DisplayGeneratingBox::OutsideInside { inside, outside } => match inside {
            DisplayInside::Table => BoxKind::Table,
            DisplayInside::Flow | DisplayInside::FlowRoot => {
                let block_container = out_of_flow || outside == DisplayOutside::Block ||
                    inside == DisplayInside::FlowRoot;
                if block_container && style.establishes_scroll_container() {
                    BoxKind::Scroll
                } else if block_container {
                    BoxKind::Block
                } else {
                    BoxKind::Inline
                }
            },
        },
    }
}

fn item_flags_for_element(style: &ComputedStyle, display: DisplayGeneratingBox) -> ItemFlags {
    let mut flags = ItemFlags::empty();
    if style.is_out_of_flow() {
        flags |= ItemFlags::OUT_OF_FLOW | ItemFlags::BLOCK_LEVEL;
        return flags;
    }
    match display.outside() {
        DisplayOutside::Block => flags |= ItemFlags::BLOCK_LEVEL,
        DisplayOutside::Inline => flags |= ItemFlags::INLINE_LEVEL,
    }
    if let DisplayGeneratingBox::LayoutInternal(internal) = display {
        match internal {
            DisplayLayoutInternal::TableCaption => flags |= ItemFlags::IS_CAPTION,
            DisplayLayoutInternal::TableColumn | DisplayLayoutInternal::TableColumnGroup => {
                flags |= ItemFlags::COLUMN_FAMILY
            },
            _ => {},
        }
    }
    flags
}

/// The slot an item demands of its parent. Derived from the planned box
/// kind, except captions, which are table-bound but never slot-wrapped.
fn desired_slot_for(kind: &BoxKind, flags: ItemFlags) -> SlotType {
    if flags.contains(ItemFlags::IS_CAPTION) {
        return SlotType::Table;
    }
    kind.desired_slot()
}

/// Collects construction items from content. One collector instance
/// corresponds to one box's child list.
pub(crate) struct ItemCollector<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    items: Vec<ConstructionItem<'dom, Node>>,
    under_indirect_container: bool,
}

impl<'dom, Node> ItemCollector<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    pub(crate) fn new(under_indirect_container: bool) -> Self {
        Self {
            items: Vec::new(),
            under_indirect_container,
        }
    }

    /// Items for all children of `parent`, pseudo-elements included.
    pub(crate) fn collect_children(parent: Node) -> Vec<ConstructionItem<'dom, Node>> {
        let mut collector = Self::new(parent.children_have_indirection());
        traverse_children_of(parent, &mut collector);
        collector.items
    }

    /// Items for one node, as its parent's traversal would produce them.
    /// `display: contents` yields the hoisted child items; `display:
    /// none` yields nothing.
    pub(crate) fn collect_node(node: Node) -> Vec<ConstructionItem<'dom, Node>> {
        let indirect = node
            .parent_node()
            .is_some_and(|parent| parent.children_have_indirection());
        let mut collector = Self::new(indirect);
        if let Some(text) = node.as_text() {
            let info = NodeAndStyleInfo::new(node, node.style());
            collector.handle_text(&info, text);
        } else if node.is_element() {
            traverse_element(node, &mut collector);
        }
        collector.items
    }

    /// Items for a generated-content box's `content` list. Quote marks
    /// become dedicated items; their text is resolved at renumber time.
    pub(crate) fn collect_generated(
        info: &NodeAndStyleInfo<Node>,
        generated: Vec<PseudoElementContentItem>,
    ) -> Vec<ConstructionItem<'dom, Node>> {
        let mut collector = Self::new(false);
        for item in generated {
            let quote_flags = match item {
                PseudoElementContentItem::Text(text) => {
                    collector.handle_text(info, Cow::Owned(text));
                    continue;
                },
                PseudoElementContentItem::OpenQuote => ItemFlags::OPEN_QUOTE,
                PseudoElementContentItem::CloseQuote => ItemFlags::CLOSE_QUOTE,
                PseudoElementContentItem::NoOpenQuote => {
                    ItemFlags::OPEN_QUOTE | ItemFlags::SILENT_QUOTE
                },
                PseudoElementContentItem::NoCloseQuote => {
                    ItemFlags::CLOSE_QUOTE | ItemFlags::SILENT_QUOTE
                },
            };
            collector.items.push(ConstructionItem {
                info: info.clone(),
                contents: ItemContents::QuoteMark,
                desired_slot: SlotType::Block,
                flags: quote_flags |
                    ItemFlags::IS_TEXT |
                    ItemFlags::INLINE_LEVEL |
                    ItemFlags::GENERATED_CONTENT,
                box_slot: None,
            });
        }
        collector.items
    }
}

impl<'dom, Node> TraversalHandler<'dom, Node> for ItemCollector<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    fn handle_text(&mut self, info: &NodeAndStyleInfo<Node>, text: Cow<'dom, str>) {
        let (collapsed, _) =
            collapse_and_transform_whitespace(&text, info.style.preserve_whitespace, false);
        let generated = info.pseudo_element_type.is_some();
        if collapsed.is_empty() {
            if !generated {
                info.node.set_primary_box(LayoutBox::Undisplayed);
            }
            return;
        }
        let mut flags = ItemFlags::IS_TEXT | ItemFlags::INLINE_LEVEL;
        if !info.style.preserve_whitespace && is_whitespace_only(&collapsed) {
            flags |= ItemFlags::WHITESPACE_ONLY;
        }
        if generated {
            flags |= ItemFlags::GENERATED_CONTENT;
        }
        if self.under_indirect_container {
            flags |= ItemFlags::FROM_INDIRECT_CONTAINER;
        }
        self.items.push(ConstructionItem {
            info: info.clone(),
            contents: ItemContents::Text(collapsed),
            desired_slot: SlotType::Block,
            flags,
            box_slot: if generated {
                None
            } else {
                Some(info.node.box_slot())
            },
        });
    }

    fn handle_element(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        display: DisplayGeneratingBox,
        contents: Contents<Node>,
        box_slot: BoxSlot<'dom>,
    ) {
        let mut flags = item_flags_for_element(&info.style, display);
        if info.pseudo_element_type.is_some() {
            flags |= ItemFlags::GENERATED_CONTENT;
        }
        if self.under_indirect_container {
            flags |= ItemFlags::FROM_INDIRECT_CONTAINER;
        }
        let contents = match contents {
            Contents::OfElement(node) => ItemContents::Element(node),
            Contents::OfPseudoElement(items) => ItemContents::GeneratedItems(items),
        };
        let kind = match &contents {
            ItemContents::Element(node) => classify_element(node.node_name(), &info.style),
            _ => classify_element(None, &info.style),
        };
        if flags.contains(ItemFlags::IS_CAPTION) {
            debug!("collected caption item for {:?}", info.node);
        }
        self.items.push(ConstructionItem {
            info: info.clone(),
            desired_slot: desired_slot_for(&kind, flags),
            contents,
            flags,
            box_slot: Some(box_slot),
        });
    }
}

/// Builds the synthetic wrapper item the grammar engine inserts around a
/// run. The wrapper inherits style from the parent whose child list is
/// being normalized and owns the run as look-ahead children.
pub(crate) fn synthetic_wrapper<'dom, Node>(
    parent_info: &NodeAndStyleInfo<Node>,
    pseudo: PseudoElement,
    run: Vec<ConstructionItem<'dom, Node>>,
) -> ConstructionItem<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    let style = ComputedStyle::anonymous(&parent_info.style, pseudo);
    let info = NodeAndStyleInfo::new_for_pseudo(parent_info.node, pseudo, style.clone());
    let kind = classify_element(None, &style);
    let mut flags = if style.is_inline_level() {
        ItemFlags::INLINE_LEVEL
    } else {
        ItemFlags::BLOCK_LEVEL
    };
    if matches!(kind, BoxKind::ColumnGroup) {
        flags |= ItemFlags::COLUMN_FAMILY;
    }
    ConstructionItem {
        desired_slot: desired_slot_for(&kind, flags),
        info,
        contents: ItemContents::Synthetic(run),
        flags,
        box_slot: None,
    }
}
