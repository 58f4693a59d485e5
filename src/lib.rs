/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Box-tree construction and incremental maintenance.
//!
//! The crate sits between style resolution and layout: it takes a
//! content tree whose nodes carry resolved styles (the [`dom::ContentNode`]
//! trait is the embedder's side of that contract) and maintains the
//! corresponding [`tree::BoxTree`], the box structure CSS layout
//! consumes. That includes everything the CSS box model requires beyond
//! a one-to-one mapping: anonymous table pseudo-boxes, inline splitting
//! around block-level children, `::first-line` and `::first-letter`
//! wrappers, generated content and quotes, and placeholders standing in
//! for out-of-flow boxes.
//!
//! A tree is built from scratch with [`tree::BoxTree::construct`] and
//! then kept current through content mutation notifications, batched
//! under [`update::UpdateScope`]. Updates repair locally when they can
//! and reconstruct the smallest safe ancestor subtree when they cannot.

#![deny(unsafe_code)]

pub mod cell;
pub mod context;
pub mod debug;
pub mod dom;
pub mod error;
pub mod style;
pub mod tree;
pub mod update;

mod construct;
mod dom_traversal;
mod positioned;
mod quotes;
