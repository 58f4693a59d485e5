/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Quote depth renumbering.
//!
//! `open-quote`/`close-quote` boxes are built with empty text; their
//! marks depend on the nesting depth across the whole tree, so a single
//! renumbering walk assigns them once the tree is stable. The walk is
//! the deferred bookkeeping that runs at the end of the outermost update
//! scope (and at the end of a fresh construction pass).

use log::debug;

use crate::style::QuotePairs;
use crate::tree::{BoxFlags, BoxId, BoxKind, BoxTree, ChildListId};

/// Rewrites every quote box's text for its depth. Depth accumulates in
/// document order over all child lists, out-of-flow content included.
pub(crate) fn renumber(tree: &mut BoxTree) {
    let Some(root) = tree.root() else {
        return;
    };
    let mut depth = 0usize;
    renumber_box(tree, root, &mut depth);
}

fn renumber_box(tree: &mut BoxTree, id: BoxId, depth: &mut usize) {
    let flags = tree[id].flags;
    if flags.contains(BoxFlags::OPEN_QUOTE) {
        let mark = if flags.contains(BoxFlags::SILENT_QUOTE) {
            String::new()
        } else {
            open_mark(&tree[id].style().quotes, *depth).to_owned()
        };
        set_text(tree, id, mark);
        *depth += 1;
    } else if flags.contains(BoxFlags::CLOSE_QUOTE) {
        // A close quote below depth one renders nothing and leaves the
        // depth alone.
        if *depth == 0 {
            debug!("close-quote at depth zero renders nothing");
            set_text(tree, id, String::new());
        } else {
            *depth -= 1;
            let mark = if flags.contains(BoxFlags::SILENT_QUOTE) {
                String::new()
            } else {
                close_mark(&tree[id].style().quotes, *depth).to_owned()
            };
            set_text(tree, id, mark);
        }
    }
    for list in ChildListId::ALL {
        let children = tree[id].list(list).to_vec();
        for child in children {
            renumber_box(tree, child, depth);
        }
    }
}

fn set_text(tree: &mut BoxTree, id: BoxId, mark: String) {
    match &mut tree.get_mut(id).expect("stale box id").kind {
        BoxKind::Text { text } => *text = mark,
        kind => debug_assert!(false, "quote flags on a non-text {} box", kind.name()),
    }
}

/// Depths past the last pair repeat it; an empty `quotes` renders
/// nothing at any depth.
fn open_mark(quotes: &QuotePairs, depth: usize) -> &str {
    quotes
        .get(depth.min(quotes.len().saturating_sub(1)))
        .map_or("", |pair| &pair.0)
}

fn close_mark(quotes: &QuotePairs, depth: usize) -> &str {
    quotes
        .get(depth.min(quotes.len().saturating_sub(1)))
        .map_or("", |pair| &pair.1)
}

#[cfg(test)]
mod tests {
    use servo_arc::Arc as ServoArc;

    use super::*;
    use crate::style::{ComputedStyle, Display};

    fn quote_box(tree: &mut BoxTree, parent: BoxId, flags: BoxFlags) -> BoxId {
        let id = tree.create_box(
            BoxKind::Text {
                text: String::new(),
            },
            ServoArc::new(ComputedStyle::new(Display::inline())),
            None,
            flags | BoxFlags::GENERATED_CONTENT,
        );
        tree.append_child(parent, id);
        id
    }

    fn text_of(tree: &BoxTree, id: BoxId) -> &str {
        match &tree[id].kind {
            BoxKind::Text { text } => text,
            _ => unreachable!(),
        }
    }

    #[test]
    fn depths_pick_successive_pairs() {
        let mut tree = BoxTree::new();
        let root = tree.create_box(
            BoxKind::Block,
            ServoArc::new(ComputedStyle::new(Display::block())),
            None,
            BoxFlags::empty(),
        );
        tree.set_root(Some(root));
        let outer_open = quote_box(&mut tree, root, BoxFlags::OPEN_QUOTE);
        let inner_open = quote_box(&mut tree, root, BoxFlags::OPEN_QUOTE);
        let inner_close = quote_box(&mut tree, root, BoxFlags::CLOSE_QUOTE);
        let outer_close = quote_box(&mut tree, root, BoxFlags::CLOSE_QUOTE);

        renumber(&mut tree);
        assert_eq!(text_of(&tree, outer_open), "\u{201c}");
        assert_eq!(text_of(&tree, inner_open), "\u{2018}");
        assert_eq!(text_of(&tree, inner_close), "\u{2019}");
        assert_eq!(text_of(&tree, outer_close), "\u{201d}");
    }

    #[test]
    fn silent_quotes_change_depth_without_text() {
        let mut tree = BoxTree::new();
        let root = tree.create_box(
            BoxKind::Block,
            ServoArc::new(ComputedStyle::new(Display::block())),
            None,
            BoxFlags::empty(),
        );
        tree.set_root(Some(root));
        let silent = quote_box(
            &mut tree,
            root,
            BoxFlags::OPEN_QUOTE | BoxFlags::SILENT_QUOTE,
        );
        let open = quote_box(&mut tree, root, BoxFlags::OPEN_QUOTE);

        renumber(&mut tree);
        assert_eq!(text_of(&tree, silent), "");
        assert_eq!(text_of(&tree, open), "\u{2018}", "depth one uses the inner pair");
    }

    #[test]
    fn close_quote_at_depth_zero_is_empty() {
        let mut tree = BoxTree::new();
        let root = tree.create_box(
            BoxKind::Block,
            ServoArc::new(ComputedStyle::new(Display::block())),
            None,
            BoxFlags::empty(),
        );
        tree.set_root(Some(root));
        let close = quote_box(&mut tree, root, BoxFlags::CLOSE_QUOTE);
        renumber(&mut tree);
        assert_eq!(text_of(&tree, close), "");
    }

    #[test]
    fn depths_beyond_the_pairs_repeat_the_last() {
        let quotes: QuotePairs = vec![("<".into(), ">".into())];
        assert_eq!(open_mark(&quotes, 0), "<");
        assert_eq!(open_mark(&quotes, 5), "<");
        assert_eq!(close_mark(&quotes, 5), ">");
        assert_eq!(open_mark(&QuotePairs::new(), 2), "");
    }
}
