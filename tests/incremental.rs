/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Incremental maintenance: mutation notifications against a live tree,
//! checking both the resulting shapes and which box identities survive.

mod common;

use boxtree::context::{DocumentContext, TreeOptions};
use boxtree::dom::{ContentNode, LayoutBox};
use boxtree::style::{Content, ContentItem, PseudoElement};
use boxtree::tree::{BoxId, BoxTree};
use serde_json::Value;

use common::*;

fn build(document: &common::Document) -> (DocumentContext, BoxTree) {
    let mut context = DocumentContext::new(TreeOptions::default());
    let tree = BoxTree::construct(&mut context, document.root()).expect("construction failed");
    assert_eq!(tree.check_consistency(), Ok(()));
    (context, tree)
}

fn fresh_digest(document: &common::Document) -> Value {
    let mut context = DocumentContext::new(TreeOptions::default());
    let tree = BoxTree::construct(&mut context, document.root()).expect("construction failed");
    let digest = tree.structural_digest();
    document.root().unset_boxes_in_subtree();
    digest
}

fn principal(document: &common::Document, node: usize) -> BoxId {
    match document.handle(node).primary_box() {
        Some(LayoutBox::Principal(id)) => id,
        other => panic!("node {node} has no principal box: {other:?}"),
    }
}

fn kind(value: &Value) -> &str {
    value["kind"].as_str().expect("digest box has a kind")
}

fn list<'a>(value: &'a Value, name: &str) -> Vec<&'a Value> {
    value[name]
        .as_array()
        .map(|children| children.iter().collect())
        .unwrap_or_default()
}

fn children(value: &Value) -> Vec<&Value> {
    list(value, "children")
}

fn child_kinds(value: &Value) -> Vec<String> {
    children(value)
        .iter()
        .map(|child| kind(child).to_owned())
        .collect()
}

fn only_child<'a>(value: &'a Value) -> &'a Value {
    let children = children(value);
    assert_eq!(children.len(), 1, "expected exactly one child: {value}");
    children[0]
}

fn text(value: &Value) -> &str {
    value["text"].as_str().expect("digest box has text")
}

#[test]
fn local_insert_keeps_sibling_boxes() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let first = document.append_element(div, "p", block());
    let last = document.append_element(div, "p", block());
    let (mut context, mut tree) = build(&document);

    let div_box = principal(&document, div);
    let first_box = principal(&document, first);
    let last_box = principal(&document, last);

    let middle = document.new_element("p", block());
    document.insert_before(div, middle, Some(last));
    tree.content_inserted(&mut context, document.handle(div), document.handle(middle));

    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Block", "Block", "Block"]);
    assert_eq!(principal(&document, div), div_box);
    assert_eq!(principal(&document, first), first_box);
    assert_eq!(principal(&document, last), last_box);

    let middle_box = principal(&document, middle);
    assert_eq!(
        tree[div_box].principal_children(),
        &[first_box, middle_box, last_box]
    );
}

#[test]
fn appended_text_lands_inside_the_inline() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    let (mut context, mut tree) = build(&document);

    let span_box = principal(&document, span);
    let tail = document.new_text("b", inline());
    document.append(span, tail);
    tree.content_appended(&mut context, document.handle(span), document.handle(tail));

    let digest = tree.structural_digest();
    let span_digest = only_child(only_child(&digest));
    assert_eq!(kind(span_digest), "Inline");
    let texts = children(span_digest);
    assert_eq!(text(texts[0]), "a");
    assert_eq!(text(texts[1]), "b");
    assert_eq!(principal(&document, span), span_box);
}

#[test]
fn table_whitespace_append_is_a_no_op() {
    init_logging();
    let mut document = Document::new(block());
    let table = document.append_element(0, "table", table());
    let tr = document.append_element(table, "tr", row());
    document.append_element(tr, "td", cell());
    let (mut context, mut tree) = build(&document);

    let table_box = principal(&document, table);
    let before = tree.structural_digest();

    let ws = document.new_text("\n  ", inline());
    document.append(table, ws);
    tree.content_appended(&mut context, document.handle(table), document.handle(ws));

    assert_eq!(tree.structural_digest(), before);
    assert_eq!(principal(&document, table), table_box);
    assert_eq!(
        document.handle(ws).primary_box(),
        Some(LayoutBox::Undisplayed)
    );
}

#[test]
fn indirect_whitespace_append_reconstructs() {
    init_logging();
    let mut document = Document::new(block());
    let table = document.append_element(0, "table", table());
    document.set_indirection(table);
    let tr = document.append_element(table, "tr", row());
    document.append_element(tr, "td", cell());
    let (mut context, mut tree) = build(&document);

    let table_box = principal(&document, table);
    let ws = document.new_text(" ", inline());
    document.append(table, ws);
    tree.content_appended(&mut context, document.handle(table), document.handle(ws));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_ne!(principal(&document, table), table_box);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn block_insertion_splits_the_enclosing_inline() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    let b = document.append_text(span, "b", inline());
    let (mut context, mut tree) = build(&document);

    let p = document.new_element("p", block());
    document.insert_before(span, p, Some(b));
    tree.content_inserted(&mut context, document.handle(span), document.handle(p));

    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Inline", "Block", "Inline"]);
    let first = principal(&document, span);
    assert!(tree.is_split_member(first));
    assert_eq!(tree.split_chain(first).len(), 3);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn block_appended_to_an_all_inline_span_creates_a_chain() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    document.append_text(span, "b", inline());
    let (mut context, mut tree) = build(&document);

    let appended = document.new_element("div", block());
    document.append(span, appended);
    tree.content_appended(&mut context, document.handle(span), document.handle(appended));

    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Inline", "Block", "Inline"]);
    let members = children(div_digest);
    assert_eq!(children(members[0]).len(), 2, "original inline run");
    assert!(children(members[2]).is_empty(), "trailing inline is empty");
    let first = principal(&document, span);
    assert_eq!(tree.split_chain(first).len(), 3);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn appending_a_block_extends_the_split_chain() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    let p = document.append_element(span, "p", block());
    document.append_text(p, "x", inline());
    let (mut context, mut tree) = build(&document);

    let first = principal(&document, span);
    assert_eq!(tree.split_chain(first).len(), 3);

    let appended = document.new_element("p", block());
    document.append(span, appended);
    tree.content_appended(&mut context, document.handle(span), document.handle(appended));

    // The chain absorbs the new block without rebuilding its head. A
    // fresh build would coalesce the adjacent blocks into one wrapper;
    // extension keeps them apart, which is equally well-formed.
    assert_eq!(principal(&document, span), first);
    assert_eq!(tree.split_chain(first).len(), 5);
    assert_eq!(tree.check_consistency(), Ok(()));
    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(
        child_kinds(div_digest),
        vec!["Inline", "Block", "Inline", "Block", "Inline"]
    );
}

#[test]
fn row_insertion_rebuilds_the_anonymous_table() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let td = document.append_element(div, "td", cell());
    let (mut context, mut tree) = build(&document);

    let tr = document.new_element("tr", row());
    document.insert_before(div, tr, Some(td));
    document.append_element(tr, "td", cell());
    tree.content_inserted(&mut context, document.handle(div), document.handle(tr));

    assert_eq!(tree.check_consistency(), Ok(()));
    let digest = tree.structural_digest();
    let table = only_child(only_child(&digest));
    assert_eq!(kind(table), "Table");
    let row_group = only_child(table);
    assert_eq!(child_kinds(row_group), vec!["Row", "Row"]);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn removing_the_only_cell_rebuilds_the_table() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let table = document.append_element(div, "table", table());
    let tr = document.append_element(table, "tr", row());
    let td = document.append_element(tr, "td", cell());
    let (mut context, mut tree) = build(&document);

    let table_box = principal(&document, table);
    document.detach(td);
    tree.content_removed(&mut context, document.handle(tr), document.handle(td));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_ne!(principal(&document, table), table_box);
    let digest = tree.structural_digest();
    let table_digest = only_child(only_child(&digest));
    assert_eq!(kind(table_digest), "Table");
    let row_group = only_child(table_digest);
    let row_digest = only_child(row_group);
    assert_eq!(kind(row_digest), "Row");
    assert!(children(row_digest).is_empty());
}

#[test]
fn removing_a_middle_sibling_is_local() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let first = document.append_element(div, "p", block());
    let middle = document.append_element(div, "p", block());
    let last = document.append_element(div, "p", block());
    let (mut context, mut tree) = build(&document);

    let div_box = principal(&document, div);
    let first_box = principal(&document, first);
    let last_box = principal(&document, last);

    document.detach(middle);
    tree.content_removed(&mut context, document.handle(div), document.handle(middle));

    assert_eq!(principal(&document, div), div_box);
    assert_eq!(tree[div_box].principal_children(), &[first_box, last_box]);
    assert!(document.handle(middle).primary_box().is_none());
}

#[test]
fn removing_a_split_chain_member_collapses_the_chain() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    let p = document.append_element(span, "p", block());
    document.append_text(span, "b", inline());
    let (mut context, mut tree) = build(&document);

    document.detach(p);
    tree.content_removed(&mut context, document.handle(span), document.handle(p));

    assert_eq!(tree.check_consistency(), Ok(()));
    let span_box = principal(&document, span);
    assert!(!tree.is_split_member(span_box));
    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Inline"]);
    let texts = children(only_child(div_digest));
    assert_eq!(text(texts[0]), "a");
    assert_eq!(text(texts[1]), "b");
}

#[test]
fn caption_insertion_rebuilds_the_table() {
    init_logging();
    let mut document = Document::new(block());
    let table = document.append_element(0, "table", table());
    let tr = document.append_element(table, "tr", row());
    document.append_element(tr, "td", cell());
    let (mut context, mut tree) = build(&document);

    let caption = document.new_element(
        "caption",
        internal(boxtree::style::DisplayLayoutInternal::TableCaption),
    );
    document.insert_before(table, caption, Some(tr));
    tree.content_inserted(&mut context, document.handle(table), document.handle(caption));

    assert_eq!(tree.check_consistency(), Ok(()));
    let digest = tree.structural_digest();
    let table_digest = only_child(&digest);
    assert_eq!(list(table_digest, "captions").len(), 1);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn legend_changes_rebuild_the_fieldset() {
    init_logging();
    let mut document = Document::new(block());
    let fieldset = document.append_element(0, "fieldset", block());
    let body = document.append_text(fieldset, "body", inline());
    let (mut context, mut tree) = build(&document);

    let legend = document.new_element("legend", block());
    document.insert_before(fieldset, legend, Some(body));
    tree.content_inserted(&mut context, document.handle(fieldset), document.handle(legend));

    let digest = tree.structural_digest();
    let fieldset_digest = only_child(&digest);
    assert_eq!(kind(fieldset_digest), "FieldSet");
    assert_eq!(children(fieldset_digest).len(), 2, "legend plus content");

    document.detach(legend);
    tree.content_removed(&mut context, document.handle(fieldset), document.handle(legend));

    let digest = tree.structural_digest();
    let fieldset_digest = only_child(&digest);
    assert_eq!(children(fieldset_digest).len(), 1, "content block only");
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn first_pseudos_are_reapplied_around_mutations() {
    init_logging();
    let mut document = Document::new(block());
    let p = document.append_element(0, "p", block());
    document.set_pseudo_style(p, PseudoElement::FirstLetter, inline());
    document.set_pseudo_style(p, PseudoElement::FirstLine, inline());
    document.append_text(p, "Hello", inline());
    let (mut context, mut tree) = build(&document);

    let world = document.new_text(" world", inline());
    document.append(p, world);
    tree.content_appended(&mut context, document.handle(p), document.handle(world));

    assert_eq!(tree.check_consistency(), Ok(()));
    let digest = tree.structural_digest();
    let line = only_child(only_child(&digest));
    assert_eq!(kind(line), "Line");
    let parts = children(line);
    assert_eq!(kind(parts[0]), "Letter");
    assert_eq!(text(only_child(parts[0])), "H");
    assert_eq!(text(parts[1]), "ello");
    assert_eq!(text(parts[2]), " world");

    document.detach(world);
    tree.content_removed(&mut context, document.handle(p), document.handle(world));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn bulk_appends_land_inside_the_first_line_box() {
    init_logging();
    let mut document = Document::new(block());
    let p = document.append_element(0, "p", block());
    document.set_pseudo_style(p, PseudoElement::FirstLine, inline());
    document.append_text(p, "lead", inline());
    let (mut context, mut tree) = build(&document);

    let first = document.new_text("t0", inline());
    document.append(p, first);
    for n in 1..50 {
        let node = document.new_text(&format!("t{n}"), inline());
        document.append(p, node);
    }
    tree.content_appended(&mut context, document.handle(p), document.handle(first));

    assert_eq!(tree.check_consistency(), Ok(()));
    let digest = tree.structural_digest();
    let p_digest = only_child(&digest);
    let parts = children(p_digest);
    assert_eq!(parts.len(), 1, "every text box sits inside the line box");
    assert_eq!(kind(parts[0]), "Line");
    assert_eq!(children(parts[0]).len(), 51);
}

#[test]
fn inserted_quotes_get_their_marks() {
    init_logging();
    let quote_style = |which| inline().with_content(Content::Items(vec![which]));
    let mut document = Document::new(block());
    let p = document.append_element(0, "p", block());
    let (mut context, mut tree) = build(&document);

    let q = document.new_element("q", inline());
    document.set_pseudo_style(q, PseudoElement::Before, quote_style(ContentItem::OpenQuote));
    document.set_pseudo_style(q, PseudoElement::After, quote_style(ContentItem::CloseQuote));
    document.append(p, q);
    let x = document.new_text("x", inline());
    document.append(q, x);
    tree.content_appended(&mut context, document.handle(p), document.handle(q));

    let digest = tree.structural_digest();
    let q_digest = only_child(only_child(&digest));
    let parts = children(q_digest);
    assert_eq!(text(only_child(parts[0])), "\u{201c}");
    assert_eq!(text(parts[1]), "x");
    assert_eq!(text(only_child(parts[2])), "\u{201d}");
}

#[test]
fn removing_a_quote_renumbers_the_rest() {
    init_logging();
    let quote_style = |which| inline().with_content(Content::Items(vec![which]));
    let mut document = Document::new(block());
    let p = document.append_element(0, "p", block());
    let outer = document.append_element(p, "q", inline());
    document.set_pseudo_style(outer, PseudoElement::Before, quote_style(ContentItem::OpenQuote));
    // No closing mark: the inner quote sits at depth 1 only while the
    // outer open mark precedes it.
    let inner = document.append_element(p, "q", inline());
    document.set_pseudo_style(inner, PseudoElement::Before, quote_style(ContentItem::OpenQuote));
    document.set_pseudo_style(inner, PseudoElement::After, quote_style(ContentItem::CloseQuote));
    document.append_text(inner, "x", inline());
    let (mut context, mut tree) = build(&document);

    let digest = tree.structural_digest();
    let p_digest = only_child(&digest);
    let inner_digest = children(p_digest)[1];
    assert_eq!(text(only_child(children(inner_digest)[0])), "\u{2018}");

    document.detach(outer);
    tree.content_removed(&mut context, document.handle(p), document.handle(outer));

    let digest = tree.structural_digest();
    let p_digest = only_child(&digest);
    let inner_digest = children(p_digest)[0];
    assert_eq!(
        text(only_child(children(inner_digest)[0])),
        "\u{201c}",
        "with the outer open mark gone, the survivor opens at depth zero"
    );
}

#[test]
fn out_of_flow_removal_takes_the_placeholder_along() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    document.append_text(div, "before", inline());
    let float = document.append_element(div, "aside", floated(block()));
    document.append_text(div, "after", inline());
    let (mut context, mut tree) = build(&document);

    let div_box = principal(&document, div);
    document.detach(float);
    tree.content_removed(&mut context, document.handle(div), document.handle(float));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_eq!(principal(&document, div), div_box);
    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Text", "Text"]);
    assert!(list(div_digest, "floats").is_empty());
}

#[test]
fn inserted_float_splices_into_the_float_list() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    document.append_text(div, "flow", inline());
    let (mut context, mut tree) = build(&document);

    let div_box = principal(&document, div);
    let float = document.new_element("aside", floated(block()));
    document.append(div, float);
    tree.content_appended(&mut context, document.handle(div), document.handle(float));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_eq!(principal(&document, div), div_box);
    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Text", "Placeholder"]);
    assert_eq!(list(div_digest, "floats").len(), 1);
}

#[test]
fn insertion_into_an_empty_contents_container_keeps_order() {
    init_logging();
    let mut document = Document::new(block());
    let span = document.append_element(0, "span", contents());
    document.append_element(0, "div", block());
    let (mut context, mut tree) = build(&document);

    let inserted = document.new_text("x", inline());
    document.append(span, inserted);
    tree.content_inserted(&mut context, document.handle(span), document.handle(inserted));

    assert_eq!(tree.check_consistency(), Ok(()));
    let root_digest = tree.structural_digest();
    assert_eq!(child_kinds(&root_digest), vec!["Text", "Block"]);
    assert_eq!(text(children(&root_digest)[0]), "x");
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn insertion_through_nested_contents_containers_keeps_order() {
    init_logging();
    let mut document = Document::new(block());
    let outer = document.append_element(0, "span", contents());
    let inner = document.append_element(outer, "span", contents());
    document.append_element(0, "div", block());
    let (mut context, mut tree) = build(&document);

    let inserted = document.new_text("x", inline());
    document.append(inner, inserted);
    tree.content_inserted(&mut context, document.handle(inner), document.handle(inserted));

    assert_eq!(tree.check_consistency(), Ok(()));
    let root_digest = tree.structural_digest();
    assert_eq!(child_kinds(&root_digest), vec!["Text", "Block"]);
}

#[test]
fn reconstructing_a_split_element_rebuilds_the_whole_chain() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    let p = document.append_element(span, "p", block());
    document.append_text(p, "x", inline());
    document.append_text(span, "b", inline());
    let (mut context, mut tree) = build(&document);

    let first = principal(&document, span);
    assert_eq!(tree.split_chain(first).len(), 3);

    tree.reconstruct_subtree(&mut context, document.handle(span));

    assert_eq!(tree.check_consistency(), Ok(()));
    let rebuilt = principal(&document, span);
    assert_eq!(tree.split_chain(rebuilt).len(), 3);
    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Inline", "Block", "Inline"]);
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn removing_undisplayed_content_changes_nothing() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let hidden = document.append_element(div, "p", none());
    document.append_text(div, "visible", inline());
    let (mut context, mut tree) = build(&document);

    let before = tree.structural_digest();
    let div_box = principal(&document, div);

    document.detach(hidden);
    tree.content_removed(&mut context, document.handle(div), document.handle(hidden));

    assert_eq!(tree.structural_digest(), before);
    assert_eq!(principal(&document, div), div_box);
}

#[test]
fn reconstruct_subtree_matches_fresh_construction() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let span = document.append_element(div, "span", inline());
    document.append_text(span, "a", inline());
    document.append_element(span, "p", block());
    let td = document.append_element(div, "td", cell());
    document.append_text(td, "cell", inline());
    document.append_element(div, "aside", floated(block()));
    let (mut context, mut tree) = build(&document);

    let root_box = tree.root().expect("root box exists");
    tree.reconstruct_subtree(&mut context, document.handle(div));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_eq!(tree.root(), Some(root_box), "the root box survives");
    assert_eq!(tree.structural_digest(), fresh_digest(&document));
}

#[test]
fn reconstruction_restores_captured_state() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", scrollable(block()));
    document.append_text(div, "content", inline());
    let (mut context, mut tree) = build(&document);

    document.set_ui_state(div, b"scroll=42");
    tree.reconstruct_subtree(&mut context, document.handle(div));

    assert_eq!(tree.check_consistency(), Ok(()));
    assert_eq!(document.restored_states(div), vec![b"scroll=42".to_vec()]);
}

#[test]
fn update_scope_batches_multiple_notifications() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let (mut context, mut tree) = build(&document);

    let first = document.new_element("p", block());
    document.append(div, first);
    let second = document.new_element("p", block());
    document.append(div, second);
    {
        let mut scope = tree.begin_update(&mut context);
        scope.content_inserted(document.handle(div), document.handle(first));
        scope.content_inserted(document.handle(div), document.handle(second));
    }

    let digest = tree.structural_digest();
    let div_digest = only_child(&digest);
    assert_eq!(child_kinds(div_digest), vec!["Block", "Block"]);
}

#[test]
#[should_panic(expected = "mutation notification during a layout pass")]
fn notifications_during_layout_are_a_caller_bug() {
    init_logging();
    let mut document = Document::new(block());
    let div = document.append_element(0, "div", block());
    let (mut context, mut tree) = build(&document);

    let p = document.new_element("p", block());
    document.append(div, p);
    let _guard = context.layout_guard();
    tree.content_inserted(&mut context, document.handle(div), document.handle(p));
}
