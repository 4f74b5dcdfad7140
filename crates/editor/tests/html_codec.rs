use freespace_editor::{Node, html};

#[test]
fn mark_tags_normalize_to_short_forms() {
    let doc = html::parse_document("<p><strong>a</strong><em>b</em><strike>c</strike></p>");
    assert_eq!(
        html::serialize_document(&doc),
        "<p><b>a</b><i>b</i><s>c</s></p>"
    );
}

#[test]
fn nested_lists_and_void_elements_round_trip() {
    let markup = r#"<ul><li>a<ol><li>b<br></li></ol></li></ul><p><img alt="" src="x.png"></p>"#;
    let doc = html::parse_document(markup);
    assert_eq!(html::serialize_document(&doc), markup);

    let Node::Element(list) = &doc.children[0] else {
        panic!("expected a list");
    };
    assert_eq!(list.tag, "ul");
    assert_eq!(list.children.len(), 1);
}

#[test]
fn whitespace_between_list_items_is_dropped() {
    let doc = html::parse_document("<ol>\n  <li>a</li>\n  <li>b</li>\n</ol>");
    assert_eq!(html::serialize_document(&doc), "<ol><li>a</li><li>b</li></ol>");
}

#[test]
fn stray_end_tags_are_ignored() {
    let doc = html::parse_document("<p>a</span>b</p></div>");
    assert_eq!(html::serialize_document(&doc), "<p>ab</p>");
}
