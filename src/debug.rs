/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tree dumps: an indented ASCII rendering for eyeballing and a JSON
//! structural digest for comparing trees shape-for-shape (the round-trip
//! tests rely on it). Neither includes box identities, so two
//! independently built trees with the same shape compare equal.

use std::fmt;

use serde::Serialize;

use crate::tree::{BoxFlags, BoxId, BoxTree, ChildListId};

/// `Display`-able view of a box tree. Obtained from [`BoxTree::dump`].
pub struct DumpTree<'a> {
    tree: &'a BoxTree,
}

impl fmt::Display for DumpTree<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self.tree.root() {
            Some(root) => dump_box(formatter, self.tree, root, 0),
            None => writeln!(formatter, "(empty box tree)"),
        }
    }
}

fn dump_box(
    formatter: &mut fmt::Formatter,
    tree: &BoxTree,
    id: BoxId,
    indent: usize,
) -> fmt::Result {
    let data = &tree[id];
    write!(formatter, "{:indent$}{}", "", data.kind.name(), indent = indent)?;
    if let crate::tree::BoxKind::Text { text } = &data.kind {
        write!(formatter, " {text:?}")?;
    }
    if let Some(pseudo) = data.style().pseudo {
        write!(formatter, " ::{pseudo:?}")?;
    }
    if data.flags.contains(BoxFlags::OUT_OF_FLOW) {
        write!(formatter, " (out of flow)")?;
    }
    writeln!(formatter)?;
    for list in ChildListId::ALL {
        let children = data.list(list);
        if children.is_empty() {
            continue;
        }
        if list != ChildListId::Principal {
            let name: &'static str = list.into();
            writeln!(formatter, "{:indent$}[{name}]", "", indent = indent + 2)?;
        }
        for &child in children {
            dump_box(formatter, tree, child, indent + 2)?;
        }
    }
    Ok(())
}

/// Structural fingerprint of one box: kind, pseudo tag, text, and the
/// same for every child list. Serializes without empty lists so digests
/// stay readable in test failures.
#[derive(Debug, Eq, PartialEq, Serialize)]
pub struct BoxDigest {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pseudo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BoxDigest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub floats: Vec<BoxDigest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub absolutes: Vec<BoxDigest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixeds: Vec<BoxDigest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub captions: Vec<BoxDigest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub popups: Vec<BoxDigest>,
}

fn digest_box(tree: &BoxTree, id: BoxId) -> BoxDigest {
    let data = &tree[id];
    let digest_list = |list: ChildListId| {
        data.list(list)
            .iter()
            .map(|&child| digest_box(tree, child))
            .collect()
    };
    BoxDigest {
        kind: data.kind.name(),
        pseudo: data.style().pseudo.map(|pseudo| format!("{pseudo:?}")),
        text: match &data.kind {
            crate::tree::BoxKind::Text { text } => Some(text.clone()),
            _ => None,
        },
        children: digest_list(ChildListId::Principal),
        floats: digest_list(ChildListId::Floats),
        absolutes: digest_list(ChildListId::Absolutes),
        fixeds: digest_list(ChildListId::Fixeds),
        captions: digest_list(ChildListId::Captions),
        popups: digest_list(ChildListId::Popups),
    }
}

impl BoxTree {
    pub fn dump(&self) -> DumpTree<'_> {
        DumpTree { tree: self }
    }

    /// JSON rendering of the tree's shape. `Null` for an empty tree.
    pub fn structural_digest(&self) -> serde_json::Value {
        match self.root() {
            Some(root) => serde_json::to_value(digest_box(self, root))
                .expect("digest serialization cannot fail"),
            None => serde_json::Value::Null,
        }
    }
}
