/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inline splitting. An inline box that ends up with block-level
//! children is broken into a chain of siblings: the original inline,
//! then an anonymous block per run of block-level children, with a
//! fresh inline between and after the blocks. The chain's first and
//! last members are always inline, empty or not, and consecutive
//! members are linked in the tree's split side table.
//!
//! Chains hoist through enclosing inlines on their own: the anonymous
//! blocks attach as ordinary children of the enclosing box, so an
//! inline ancestor sees non-uniform children and splits in turn.

use smallvec::{SmallVec, smallvec};

use crate::construct::builder::TreeBuilder;
use crate::dom::ContentNode;
use crate::dom_traversal::NodeAndStyleInfo;
use crate::error::ConstructionError;
use crate::style::{ComputedStyle, Position, PseudoElement};
use crate::tree::{BoxFlags, BoxId, BoxKind};

/// Replaces `inline_box`'s mixed child list with a chain. Returns the
/// full chain in sibling order; the first member is `inline_box`
/// itself, so attaching the result where the inline would have gone
/// keeps its position.
pub(crate) fn split_inline_box<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    inline_box: BoxId,
    info: &NodeAndStyleInfo<Node>,
) -> Result<SmallVec<[BoxId; 1]>, ConstructionError>
where
    Node: ContentNode<'dom>,
{
    let children = builder.tree.take_principal_children(inline_box);
    let runs = segment_by_level(builder, &children);
    debug_assert!(
        runs.iter().any(|run| !run.inline),
        "splitting an all-inline inline box"
    );

    let wrappers = match create_wrappers(builder, info, block_run_count(&runs)) {
        Ok(wrappers) => wrappers,
        Err(error) => {
            // Restore the original child list so the caller can tear
            // the subtree down in one piece.
            for child in children {
                builder.tree.append_child(inline_box, child);
            }
            return Err(error);
        },
    };

    let mut chain: SmallVec<[BoxId; 1]> = smallvec![inline_box];
    let mut current_inline = inline_box;
    let mut wrappers = wrappers.into_iter();
    for run in runs {
        if run.inline {
            for child in run.boxes {
                builder.tree.append_child(current_inline, child);
            }
        } else {
            let (block, continuation) = wrappers
                .next()
                .expect("one wrapper pair per block-level run");
            for child in run.boxes {
                builder.tree.append_child(block, child);
            }
            chain.push(block);
            chain.push(continuation);
            current_inline = continuation;
        }
    }
    link_consecutive(builder, &chain);
    Ok(chain)
}

/// Grows an existing chain past its trailing inline member to absorb
/// `new_boxes` appended there. Inline-level boxes join the trailing
/// member; block-level runs grow the chain by a block+inline pair each.
/// Returns the freshly created members, in order, for the caller to
/// attach after `tail`. On failure everything passed in is destroyed.
pub(crate) fn extend_chain_tail<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    tail: BoxId,
    new_boxes: Vec<BoxId>,
    info: &NodeAndStyleInfo<Node>,
) -> Result<SmallVec<[BoxId; 4]>, ConstructionError>
where
    Node: ContentNode<'dom>,
{
    let runs = segment_by_level(builder, &new_boxes);
    let wrappers = match create_wrappers(builder, info, block_run_count(&runs)) {
        Ok(wrappers) => wrappers,
        Err(error) => {
            for run in runs {
                for box_id in run.boxes {
                    builder.tree.destroy_subtree(box_id);
                }
            }
            return Err(error);
        },
    };

    let mut added: SmallVec<[BoxId; 4]> = SmallVec::new();
    let mut current_inline = tail;
    let mut wrappers = wrappers.into_iter();
    for run in runs {
        if run.inline {
            for child in run.boxes {
                builder.tree.append_child(current_inline, child);
            }
        } else {
            let (block, continuation) = wrappers
                .next()
                .expect("one wrapper pair per block-level run");
            for child in run.boxes {
                builder.tree.append_child(block, child);
            }
            builder.tree.link_split(current_inline, block);
            builder.tree.link_split(block, continuation);
            added.push(block);
            added.push(continuation);
            current_inline = continuation;
        }
    }
    Ok(added)
}

struct Run {
    inline: bool,
    boxes: Vec<BoxId>,
}

fn segment_by_level(builder: &TreeBuilder<'_, '_>, children: &[BoxId]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &child in children {
        let inline = builder.tree[child].is_inline_level();
        match runs.last_mut() {
            Some(run) if run.inline == inline => run.boxes.push(child),
            _ => runs.push(Run {
                inline,
                boxes: vec![child],
            }),
        }
    }
    runs
}

fn block_run_count(runs: &[Run]) -> usize {
    runs.iter().filter(|run| !run.inline).count()
}

/// One anonymous block plus one inline continuation per block-level
/// run. Allocation happens up front so a budget failure leaves the
/// tree untouched.
fn create_wrappers<'dom, Node>(
    builder: &mut TreeBuilder<'_, '_>,
    info: &NodeAndStyleInfo<Node>,
    pairs: usize,
) -> Result<Vec<(BoxId, BoxId)>, ConstructionError>
where
    Node: ContentNode<'dom>,
{
    let pseudo = if matches!(info.style.position, Position::Static) {
        PseudoElement::AnonymousBlock
    } else {
        PseudoElement::AnonymousPositionedBlock
    };
    let node = Some(info.node.opaque());
    let mut inline_flags = BoxFlags::empty();
    if info.style.establishes_containing_block_for_absolutes() {
        inline_flags |= BoxFlags::ESTABLISHES_ABS_CB;
    }
    let mut wrappers = Vec::with_capacity(pairs);
    let mut failure = None;
    for _ in 0..pairs {
        let block_style = ComputedStyle::anonymous(&info.style, pseudo);
        let mut block_flags = BoxFlags::ESTABLISHES_FLOAT_CB;
        if block_style.establishes_containing_block_for_absolutes() {
            block_flags |= BoxFlags::ESTABLISHES_ABS_CB;
        }
        let block = match builder.new_box(BoxKind::Block, block_style, node, block_flags) {
            Ok(block) => block,
            Err(error) => {
                failure = Some(error);
                break;
            },
        };
        let continuation =
            match builder.new_box(BoxKind::Inline, info.style.clone(), node, inline_flags) {
                Ok(continuation) => continuation,
                Err(error) => {
                    builder.tree.destroy_subtree(block);
                    failure = Some(error);
                    break;
                },
            };
        wrappers.push((block, continuation));
    }
    if let Some(error) = failure {
        for (block, continuation) in wrappers {
            builder.tree.destroy_subtree(block);
            builder.tree.destroy_subtree(continuation);
        }
        return Err(error);
    }
    Ok(wrappers)
}

fn link_consecutive(builder: &mut TreeBuilder<'_, '_>, chain: &[BoxId]) {
    for pair in chain.windows(2) {
        builder.tree.link_split(pair[0], pair[1]);
    }
}
