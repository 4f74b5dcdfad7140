use freespace_editor::{LinkError, LinkField, Point, RichTextEditor, Selection};

#[test]
fn bare_host_gets_https() {
    let mut editor = RichTextEditor::new("<p>Go to site now</p>");
    editor.region_mut().select_text("site");

    let modal = editor.open_link_modal();
    assert!(modal.open);
    assert_eq!(modal.text, "site");
    assert!(!modal.editing);

    editor.submit_link("example.com", "site").unwrap();

    let html = editor.to_html();
    assert!(html.contains(r#"<a href="https://example.com""#), "{html}");
    assert!(html.contains(r#"target="_blank""#));
    assert_eq!(editor.to_plain_text(), "Go to site now");
    assert!(!editor.link_modal().open);
    assert_eq!(editor.field().value(), html);
}

#[test]
fn empty_fields_are_flagged() {
    let mut editor = RichTextEditor::new("<p>text</p>");
    editor.region_mut().select_text("text");
    editor.open_link_modal();

    let err = editor.submit_link("   ", "text").unwrap_err();
    assert_eq!(
        err,
        LinkError {
            field: LinkField::Url
        }
    );
    assert_eq!(editor.link_modal().flagged, Some(LinkField::Url));

    let err = editor.submit_link("example.com", "").unwrap_err();
    assert_eq!(err.field, LinkField::Text);
    assert_eq!(editor.to_html(), "<p>text</p>");
}

#[test]
fn editing_an_existing_link_prefills_and_replaces_it() {
    let mut editor = RichTextEditor::new(r#"<p>see <a href="http://old.test">docs</a> here</p>"#);
    editor.region_mut().place_caret_after("do");

    let modal = editor.open_link_modal().clone();
    assert!(modal.editing);
    assert_eq!(modal.url, "http://old.test");
    assert_eq!(modal.text, "docs");

    editor.submit_link("new.test", "manual").unwrap();
    let html = editor.to_html();
    assert!(!html.contains("old.test"), "{html}");
    assert!(html.contains(r#"href="https://new.test""#));
    assert_eq!(editor.to_plain_text(), "see manual here");
}

#[test]
fn closing_restores_the_selection() {
    let mut editor = RichTextEditor::new("<p>keep this</p>");
    editor.region_mut().select_text("this");
    let before = editor.region().selection().cloned();

    editor.open_link_modal();
    editor.region_mut().place_caret_after("ke");
    editor.close_link_modal();

    assert_eq!(editor.region().selection().cloned(), before);
    assert!(!editor.link_modal().open);
    assert_eq!(editor.to_html(), "<p>keep this</p>");
}

#[test]
fn link_text_is_escaped() {
    let mut editor = RichTextEditor::new("<p>x</p>");
    editor.region_mut().place_caret_after("x");
    editor.open_link_modal();
    editor
        .submit_link("https://a.test/?q=1&r=2", "<tag> & co")
        .unwrap();

    let html = editor.to_html();
    assert!(html.contains(r#"href="https://a.test/?q=1&amp;r=2""#), "{html}");
    assert!(html.contains("&lt;tag&gt; &amp; co</a>"), "{html}");
}

#[test]
fn replacing_a_whole_link_keeps_document_order() {
    let mut editor = RichTextEditor::new(r#"<p>hello <a href="https://x.y">world</a> z</p>"#);
    editor.region_mut().set_selection(Some(Selection::new(
        Point::new(vec![0], 1),
        Point::new(vec![0], 2),
    )));

    editor.execute("insertHTML", Some("<i>Q</i>")).unwrap();
    assert_eq!(editor.to_html(), "<p>hello <i>Q</i> z</p>");
}
