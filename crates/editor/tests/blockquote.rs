use freespace_editor::{FormattingBackend, RichTextEditor};

#[test]
fn quote_toggle_round_trips_a_paragraph() {
    let mut editor = RichTextEditor::new("<p>Quote me</p><p>after</p>");
    editor.region_mut().place_caret_after("Quote");

    editor.execute("quote", None).unwrap();
    assert_eq!(
        editor.to_html(),
        "<blockquote><p>Quote me</p></blockquote><p>after</p>"
    );
    assert!(editor.toolbar().is_active("quote"));
    assert_eq!(editor.toolbar().value("formatBlock"), Some("blockquote"));

    editor.execute("quote", None).unwrap();
    assert_eq!(editor.to_html(), "<p>Quote me</p><p>after</p>");
    assert!(!editor.toolbar().is_active("quote"));
    assert_eq!(editor.to_plain_text(), "Quote meafter");
}

#[test]
fn quote_wraps_every_selected_block() {
    let mut editor = RichTextEditor::new("<p>one</p><p>two</p><p>three</p>");
    editor.region_mut().select_text("netw");

    editor.execute("blockquote", None).unwrap();
    assert_eq!(
        editor.to_html(),
        "<blockquote><p>one</p><p>two</p></blockquote><p>three</p>"
    );
}

#[test]
fn format_block_retags_and_reports_headings() {
    let mut editor = RichTextEditor::new("<p>Title</p>");
    editor.region_mut().place_caret_after("Ti");

    editor.execute("formatBlock", Some("<h3>")).unwrap();
    assert_eq!(editor.to_html(), "<h3>Title</h3>");
    assert_eq!(editor.toolbar().value("formatBlock"), Some("h3"));
    assert_eq!(
        editor
            .backend()
            .query_value(editor.region(), "formatBlock")
            .unwrap()
            .as_deref(),
        Some("h3")
    );
}

#[test]
fn unknown_commands_are_rejected_but_still_resync() {
    let mut editor = RichTextEditor::new("<p>x</p>");
    editor.region_mut().place_caret_after("x");
    let err = editor.execute("justifyFull", None).unwrap_err();
    assert!(err.message().contains("justifyFull"));
    assert_eq!(editor.toolbar().value("formatBlock"), Some("p"));
}

#[test]
fn quote_toggle_round_trips_under_select_all() {
    let mut editor = RichTextEditor::new("<p>hello</p>");
    editor.region_mut().select_all();

    editor.execute("quote", None).unwrap();
    assert_eq!(editor.to_html(), "<blockquote><p>hello</p></blockquote>");
    assert!(editor.toolbar().is_active("quote"));

    editor.execute("quote", None).unwrap();
    assert_eq!(editor.to_html(), "<p>hello</p>");
    assert!(!editor.toolbar().is_active("quote"));
}

#[test]
fn select_all_over_quoted_blocks_reads_as_quoted() {
    let mut editor = RichTextEditor::new("<blockquote><p>one</p><p>two</p></blockquote>");
    editor.region_mut().select_all();
    editor.reconcile();
    assert!(editor.toolbar().is_active("quote"));

    editor.execute("quote", None).unwrap();
    assert_eq!(editor.to_html(), "<p>one</p><p>two</p>");
}

#[test]
fn multi_block_quote_unwraps_on_second_toggle() {
    let mut editor = RichTextEditor::new("<p>one</p><p>two</p><p>three</p>");
    editor.region_mut().select_text("netw");

    editor.execute("quote", None).unwrap();
    assert!(editor.toolbar().is_active("quote"));
    editor.execute("quote", None).unwrap();
    assert_eq!(editor.to_html(), "<p>one</p><p>two</p><p>three</p>");
}
