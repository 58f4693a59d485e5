/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! First-line and first-letter wrappers.
//!
//! Both wrappers are reshapes of an already-built child list, applied
//! after a block's children exist and torn back down before any
//! incremental mutation of that list. The unwrap/mutate/rewrap bracket
//! is mandatory: the wrappers encode positions ("leading", "first
//! text") that a mutation silently invalidates.

use unicode_categories::UnicodeCategories;

use crate::construct::builder::TreeBuilder;
use crate::dom::ContentNode;
use crate::error::ConstructionError;
use crate::style::{OutOfFlowKind, PseudoElement};
use crate::tree::{BoxFlags, BoxId, BoxKind, BoxTree};

/// Applies the wrappers a block's element asks for: the letter first,
/// on the flat list, then the line box, which absorbs the letter along
/// with the rest of the leading inline run.
pub(crate) fn apply_wrappers<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    block: BoxId,
    node: Node,
) -> Result<(), ConstructionError>
where
    Node: ContentNode<'dom>,
{
    wrap_first_letter(builder, block, node)?;
    wrap_first_line(builder, block, node)
}

/// Flattens the wrappers back to a plain child list. Must run before
/// any mutation of `block`'s children while the pseudo styles apply;
/// the caller reapplies the wrappers once the mutation is done.
pub(crate) fn unwrap_for_mutation(tree: &mut BoxTree, block: BoxId) {
    if let Some(&first) = tree[block].principal_children().first() {
        if matches!(tree[first].kind, BoxKind::Line) {
            let children = tree.take_principal_children(first);
            tree.destroy_subtree(first);
            for (index, child) in children.into_iter().enumerate() {
                tree.insert_child_at(block, index, child);
            }
        }
    }
    unwrap_first_letter(tree, block);
}

fn wrap_first_line<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    block: BoxId,
    node: Node,
) -> Result<(), ConstructionError>
where
    Node: ContentNode<'dom>,
{
    let Some(line_style) = node.pseudo_style(PseudoElement::FirstLine) else {
        return Ok(());
    };
    let leading: Vec<BoxId> = builder.tree[block]
        .principal_children()
        .iter()
        .copied()
        .take_while(|&child| builder.tree[child].is_inline_level())
        .collect();
    if leading.is_empty() {
        return Ok(());
    }
    let line = builder.new_box(
        BoxKind::Line,
        line_style,
        Some(node.opaque()),
        BoxFlags::empty(),
    )?;
    for &child in &leading {
        builder.tree.detach(child);
        builder.tree.append_child(line, child);
    }
    builder.tree.insert_child_at(block, 0, line);
    Ok(())
}

fn wrap_first_letter<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    block: BoxId,
    node: Node,
) -> Result<(), ConstructionError>
where
    Node: ContentNode<'dom>,
{
    let Some(letter_style) = node.pseudo_style(PseudoElement::FirstLetter) else {
        return Ok(());
    };
    let Search::Found(text_box) = first_text_in(builder.tree, block) else {
        return Ok(());
    };
    let text = match &builder.tree[text_box].kind {
        BoxKind::Text { text } => text.clone(),
        _ => return Ok(()),
    };
    let Some(letter_len) = first_letter_length(&text) else {
        return Ok(());
    };
    let (parent, _, index) = builder
        .tree
        .index_in_parent(text_box)
        .expect("first text of a block has a parent");

    let floated = letter_style.is_floated();
    let mut letter_flags = BoxFlags::empty();
    if floated {
        letter_flags |= BoxFlags::OUT_OF_FLOW;
    }
    let letter = builder.new_box(
        BoxKind::Letter,
        letter_style.clone(),
        Some(node.opaque()),
        letter_flags,
    )?;
    let prefix = match builder.new_box(
        BoxKind::Text {
            text: text[..letter_len].to_owned(),
        },
        letter_style.clone(),
        Some(node.opaque()),
        BoxFlags::empty(),
    ) {
        Ok(prefix) => prefix,
        Err(error) => {
            builder.tree.destroy_subtree(letter);
            return Err(error);
        },
    };
    let placeholder = if floated {
        match builder.new_box(
            BoxKind::Placeholder { out_of_flow: letter },
            letter_style,
            Some(node.opaque()),
            BoxFlags::empty(),
        ) {
            Ok(placeholder) => Some(placeholder),
            Err(error) => {
                builder.tree.destroy_subtree(letter);
                builder.tree.destroy_subtree(prefix);
                return Err(error);
            },
        }
    } else {
        None
    };

    // The original text box keeps the remainder, possibly empty, so the
    // unwrap can merge the letter back without inventing a style.
    if let BoxKind::Text { text } = &mut builder
        .tree
        .get_mut(text_box)
        .expect("stale box id")
        .kind
    {
        text.drain(..letter_len);
    }
    builder.tree.append_child(letter, prefix);
    match placeholder {
        Some(placeholder) => {
            builder.tree.register_placeholder(letter, placeholder);
            builder
                .cb_state
                .queue_out_of_flow(OutOfFlowKind::Float, letter);
            builder.tree.insert_child_at(parent, index, placeholder);
        },
        None => {
            builder.tree.insert_child_at(parent, index, letter);
        },
    }
    Ok(())
}

fn unwrap_first_letter(tree: &mut BoxTree, block: BoxId) {
    let Search::Found(flow_box) = find_letter_flow_box(tree, block) else {
        return;
    };
    let letter = match tree[flow_box].kind {
        BoxKind::Letter => flow_box,
        BoxKind::Placeholder { out_of_flow } => out_of_flow,
        _ => return,
    };
    let letter_text = tree[letter]
        .principal_children()
        .iter()
        .filter_map(|&child| match &tree[child].kind {
            BoxKind::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<String>();
    let Some((parent, _, index)) = tree.index_in_parent(flow_box) else {
        return;
    };
    tree.destroy_subtree(flow_box);

    // The remainder box sits where the letter was removed.
    let remainder = tree[parent].principal_children().get(index).copied();
    match remainder {
        Some(remainder_box) => {
            if let Some(data) = tree.get_mut(remainder_box) {
                if let BoxKind::Text { text } = &mut data.kind {
                    text.insert_str(0, &letter_text);
                    return;
                }
            }
            debug_assert!(false, "letter unwrap found no remainder text box");
        },
        None => debug_assert!(false, "letter unwrap found no remainder text box"),
    }
}

enum Search {
    Found(BoxId),
    Stop,
    Continue,
}

/// Depth-first through the leading inline-level content for the first
/// non-empty text box. Atomic inlines end the search; the first letter
/// never comes from inside one.
fn first_text_in(tree: &BoxTree, container: BoxId) -> Search {
    for &child in tree[container].principal_children() {
        match &tree[child].kind {
            BoxKind::Text { text } => {
                if !text.is_empty() {
                    return Search::Found(child);
                }
            },
            BoxKind::Placeholder { .. } => {},
            BoxKind::Inline => match first_text_in(tree, child) {
                Search::Continue => {},
                found_or_stop => return found_or_stop,
            },
            _ => return Search::Stop,
        }
    }
    Search::Continue
}

fn find_letter_flow_box(tree: &BoxTree, container: BoxId) -> Search {
    for &child in tree[container].principal_children() {
        match &tree[child].kind {
            BoxKind::Letter => return Search::Found(child),
            BoxKind::Placeholder { out_of_flow } => {
                if tree.contains(*out_of_flow) &&
                    matches!(tree[*out_of_flow].kind, BoxKind::Letter)
                {
                    return Search::Found(child);
                }
            },
            BoxKind::Text { .. } => {},
            BoxKind::Inline => match find_letter_flow_box(tree, child) {
                Search::Continue => {},
                found_or_stop => return found_or_stop,
            },
            _ => return Search::Stop,
        }
    }
    Search::Continue
}

fn is_letter_quote(ch: char) -> bool {
    ch == '"' ||
        ch == '\'' ||
        ch.is_punctuation_initial_quote() ||
        ch.is_punctuation_final_quote()
}

/// Leading spaces, then at most one quote mark, then one character
/// closes the letter. `None` when the text runs out first.
fn first_letter_length(text: &str) -> Option<usize> {
    let mut seen_quote = false;
    for (index, ch) in text.char_indices() {
        if !seen_quote {
            if ch.is_whitespace() {
                continue;
            }
            if is_letter_quote(ch) {
                seen_quote = true;
                continue;
            }
        }
        return Some(index + ch.len_utf8());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_lengths() {
        assert_eq!(first_letter_length("Hello"), Some(1));
        assert_eq!(first_letter_length(" Hello"), Some(2));
        assert_eq!(first_letter_length("\"Hello\""), Some(2));
        assert_eq!(first_letter_length(" \u{201c}Hello"), Some(" \u{201c}H".len()));
        assert_eq!(first_letter_length("Érable"), Some('É'.len_utf8()));
        assert_eq!(first_letter_length("   "), None);
        assert_eq!(first_letter_length("\""), None);
        assert_eq!(first_letter_length(""), None);
    }

    #[test]
    fn quotes_do_not_stack() {
        // Only one quote mark joins the letter; the second closes it.
        assert_eq!(first_letter_length("\"'x"), Some(2));
    }
}
