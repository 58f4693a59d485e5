/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Construction: content nodes to boxes.
//!
//! The pipeline: content children become [`items::ConstructionItem`]
//! descriptors, [`fixup`] normalizes them against the parent's slot
//! grammar, [`builder`] turns them into boxes, with [`inline_split`]
//! handling blocks inside inlines and [`first_line`] the `::first-line`
//! and `::first-letter` wrappers.

pub(crate) mod builder;
pub(crate) mod first_line;
pub(crate) mod fixup;
pub(crate) mod inline_split;
pub(crate) mod items;
