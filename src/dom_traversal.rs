/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Walking the content tree.
//!
//! Construction never iterates DOM children directly; it drives a
//! [`TraversalHandler`] which receives one callback per box-generating
//! thing: a text run, an element, or an eager pseudo-element with its
//! generated content. `display: none` and `display: contents` are
//! resolved here, including their mapping records.

use std::borrow::Cow;

use log::debug;

use crate::dom::{BoxSlot, ContentNode, LayoutBox};
use crate::style::{ComputedStyle, Content, ContentItem, Display, DisplayGeneratingBox, PseudoElement};
use servo_arc::Arc as ServoArc;

/// A node paired with the style construction should use for it. For
/// pseudo-elements `node` is the originating element.
#[derive(Clone)]
pub(crate) struct NodeAndStyleInfo<Node> {
    pub node: Node,
    pub pseudo_element_type: Option<PseudoElement>,
    pub style: ServoArc<ComputedStyle>,
}

impl<Node> NodeAndStyleInfo<Node> {
    pub(crate) fn new(node: Node, style: ServoArc<ComputedStyle>) -> Self {
        Self {
            node,
            pseudo_element_type: None,
            style,
        }
    }

    pub(crate) fn new_for_pseudo(
        node: Node,
        pseudo_element_type: PseudoElement,
        style: ServoArc<ComputedStyle>,
    ) -> Self {
        Self {
            node,
            pseudo_element_type: Some(pseudo_element_type),
            style,
        }
    }
}

/// What fills a new box: the element's own children, or already-expanded
/// generated content.
pub(crate) enum Contents<Node> {
    OfElement(Node),
    OfPseudoElement(Vec<PseudoElementContentItem>),
}

pub(crate) enum PseudoElementContentItem {
    Text(String),
    /// Rendered quote mark; text assigned by renumbering.
    OpenQuote,
    CloseQuote,
    /// Depth-only quote marks that render nothing.
    NoOpenQuote,
    NoCloseQuote,
}

pub(crate) trait TraversalHandler<'dom, Node>
where
    Node: ContentNode<'dom>,
{
    fn handle_text(&mut self, info: &NodeAndStyleInfo<Node>, text: Cow<'dom, str>);

    /// The handler takes ownership of `box_slot` and must fill it.
    fn handle_element(
        &mut self,
        info: &NodeAndStyleInfo<Node>,
        display: DisplayGeneratingBox,
        contents: Contents<Node>,
        box_slot: BoxSlot<'dom>,
    );
}

pub(crate) fn traverse_children_of<'dom, Node>(
    parent: Node,
    handler: &mut impl TraversalHandler<'dom, Node>,
) where
    Node: ContentNode<'dom>,
{
    traverse_eager_pseudo_element(PseudoElement::Before, parent, handler);

    let mut next = parent.first_child();
    while let Some(node) = next {
        if let Some(text) = node.as_text() {
            let info = NodeAndStyleInfo::new(node, node.style());
            handler.handle_text(&info, text);
        } else if node.is_element() {
            traverse_element(node, handler);
        }
        next = node.next_sibling();
    }

    traverse_eager_pseudo_element(PseudoElement::After, parent, handler);
}

pub(crate) fn traverse_element<'dom, Node>(
    node: Node,
    handler: &mut impl TraversalHandler<'dom, Node>,
) where
    Node: ContentNode<'dom>,
{
    let style = node.style();
    match style.display {
        Display::None => {
            node.unset_boxes_in_subtree();
            node.set_primary_box(LayoutBox::Undisplayed);
        },
        Display::Contents => {
            node.set_primary_box(LayoutBox::DisplayContents);
            traverse_children_of(node, handler);
        },
        Display::GeneratingBox(display) => {
            let info = NodeAndStyleInfo::new(node, style);
            handler.handle_element(&info, display, Contents::OfElement(node), node.box_slot());
        },
    }
}

fn traverse_eager_pseudo_element<'dom, Node>(
    which: PseudoElement,
    element: Node,
    handler: &mut impl TraversalHandler<'dom, Node>,
) where
    Node: ContentNode<'dom>,
{
    debug_assert!(matches!(which, PseudoElement::Before | PseudoElement::After));
    if !element.is_element() {
        return;
    }
    let Some(style) = element.pseudo_style(which) else {
        return;
    };
    // `content: normal` computes to `none` on ::before/::after.
    let items = match &style.content {
        Content::Normal | Content::None => return,
        Content::Items(items) => items,
    };
    match style.display {
        Display::None => {},
        Display::Contents => {
            debug!("display:contents on a pseudo-element, traversing its items inline");
            let info = NodeAndStyleInfo::new_for_pseudo(element, which, style.clone());
            for item in generate_pseudo_element_content(items, element) {
                if let PseudoElementContentItem::Text(text) = item {
                    handler.handle_text(&info, text.into());
                }
            }
        },
        Display::GeneratingBox(display) => {
            let info = NodeAndStyleInfo::new_for_pseudo(element, which, style.clone());
            let contents =
                Contents::OfPseudoElement(generate_pseudo_element_content(items, element));
            handler.handle_element(&info, display, contents, element.pseudo_box_slot(which));
        },
    }
}

/// <https://drafts.csswg.org/css-content/#content-property>
fn generate_pseudo_element_content<'dom, Node>(
    items: &[ContentItem],
    element: Node,
) -> Vec<PseudoElementContentItem>
where
    Node: ContentNode<'dom>,
{
    items
        .iter()
        .map(|item| match item {
            ContentItem::Text(text) => PseudoElementContentItem::Text(text.clone()),
            ContentItem::Attr(name) => {
                PseudoElementContentItem::Text(element.attribute(name).unwrap_or_default())
            },
            ContentItem::OpenQuote => PseudoElementContentItem::OpenQuote,
            ContentItem::CloseQuote => PseudoElementContentItem::CloseQuote,
            ContentItem::NoOpenQuote => PseudoElementContentItem::NoOpenQuote,
            ContentItem::NoCloseQuote => PseudoElementContentItem::NoCloseQuote,
        })
        .collect()
}

/// Collapses whitespace per `white-space` processing: segment breaks and
/// tabs become spaces, runs of spaces collapse to one. Returns the
/// transformed string and whether it ended in a collapsible space.
pub(crate) fn collapse_and_transform_whitespace(
    input: &str,
    preserve_whitespace: bool,
    trim_beginning_white_space: bool,
) -> (String, bool) {
    if preserve_whitespace {
        return (input.to_owned(), false);
    }
    let mut output = String::with_capacity(input.len());
    let mut last_was_whitespace = trim_beginning_white_space;
    for character in input.chars() {
        let is_whitespace = matches!(character, ' ' | '\t' | '\n' | '\r');
        if is_whitespace {
            if !last_was_whitespace {
                output.push(' ');
            }
        } else {
            output.push(character);
        }
        last_was_whitespace = is_whitespace;
    }
    (output, last_was_whitespace)
}

pub(crate) fn is_whitespace_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|character| {
        matches!(character, ' ' | '\t' | '\n' | '\r')
    })
}

#[test]
fn test_collapse_and_transform_whitespace() {
    let output = collapse_and_transform_whitespace("H ", false, false);
    assert_eq!(output.0, "H ");
    assert!(output.1);

    let output = collapse_and_transform_whitespace("\n   H  \t \n", false, false);
    assert_eq!(output.0, " H ");
    assert!(output.1);

    let output = collapse_and_transform_whitespace("H", false, true);
    assert_eq!(output.0, "H");
    assert!(!output.1);

    let output = collapse_and_transform_whitespace(" H", false, true);
    assert_eq!(output.0, "H");
    assert!(!output.1);

    let output = collapse_and_transform_whitespace("  \n ", false, false);
    assert_eq!(output.0, " ");
    assert!(output.1);

    let output = collapse_and_transform_whitespace("  \n ", false, true);
    assert_eq!(output.0, "");
    assert!(output.1);

    let output = collapse_and_transform_whitespace(" pre\nserved ", true, true);
    assert_eq!(output.0, " pre\nserved ");
    assert!(!output.1);
}

#[test]
fn test_is_whitespace_only() {
    assert!(is_whitespace_only(" \t\n"));
    assert!(!is_whitespace_only(""));
    assert!(!is_whitespace_only(" x "));
}
