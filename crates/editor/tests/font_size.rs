use freespace_editor::{FontSizeLabel, FormattingBackend, RichTextEditor, SelectionInspector};

fn label_under_caret(markup: &str, after: &str) -> (FontSizeLabel, Option<String>) {
    let mut editor = RichTextEditor::new(markup);
    editor.region_mut().place_caret_after(after);
    editor.reconcile();
    (
        editor.last_font_size(),
        editor.toolbar().value("fontSize").map(str::to_string),
    )
}

#[test]
fn pixel_sizes_map_onto_dropdown_labels() {
    let (label, value) = label_under_caret(r#"<p><span style="font-size: 12px">tiny</span></p>"#, "ti");
    assert_eq!(label, FontSizeLabel::Small);
    assert_eq!(value.as_deref(), Some("2"));

    let (label, value) = label_under_caret(r#"<p><span style="font-size: 17px">some</span></p>"#, "so");
    assert_eq!(label, FontSizeLabel::NormalPlus);
    assert_eq!(value.as_deref(), Some("5"));

    let (label, value) = label_under_caret(r#"<p><span style="font-size:20px">big</span></p>"#, "bi");
    assert_eq!(label, FontSizeLabel::Large);
    assert_eq!(value.as_deref(), Some("6"));
}

#[test]
fn font_elements_win_over_computed_sizes() {
    let (label, _) = label_under_caret(
        r#"<p style="font-size: 20px"><font size="2">small</font></p>"#,
        "sm",
    );
    assert_eq!(label, FontSizeLabel::Small);
}

#[test]
fn no_selection_keeps_the_last_known_label() {
    let mut editor = RichTextEditor::new("<p>plain</p>");
    let inspector = SelectionInspector::new(editor.region());
    assert_eq!(
        inspector.current_font_size_label(FontSizeLabel::Large),
        FontSizeLabel::Large
    );
    editor.reconcile();
    assert_eq!(editor.last_font_size(), FontSizeLabel::Normal);
}

#[test]
fn font_size_command_wraps_the_selection() {
    let mut editor = RichTextEditor::new("<p>Test text</p>");
    editor.region_mut().select_text("Test");

    editor.execute("fontSize", Some("6")).unwrap();

    assert_eq!(editor.to_html(), r#"<p><font size="6">Test</font> text</p>"#);
    assert_eq!(editor.last_font_size(), FontSizeLabel::Large);
    assert_eq!(editor.toolbar().value("fontSize"), Some("6"));
    assert_eq!(
        editor
            .backend()
            .query_value(editor.region(), "fontSize")
            .unwrap()
            .as_deref(),
        Some("6")
    );
}

#[test]
fn font_size_rejects_values_outside_the_scale() {
    let mut editor = RichTextEditor::new("<p>abc</p>");
    editor.region_mut().select_text("abc");
    assert!(editor.execute("fontSize", Some("huge")).is_err());
    assert_eq!(editor.to_html(), "<p>abc</p>");
}

#[test]
fn stepping_reuses_the_font_element_and_clamps() {
    let mut editor = RichTextEditor::new("<p>abc</p>");
    editor.region_mut().select_text("abc");

    editor.increase_font_size().unwrap();
    assert_eq!(editor.to_html(), r#"<p><font size="4">abc</font></p>"#);

    for _ in 0..5 {
        editor.increase_font_size().unwrap();
    }
    assert_eq!(editor.to_html(), r#"<p><font size="7">abc</font></p>"#);

    editor.decrease_font_size().unwrap();
    assert_eq!(editor.to_html(), r#"<p><font size="6">abc</font></p>"#);
}
