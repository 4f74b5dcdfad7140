use freespace_editor::{
    ControlKind, EditorEvent, FormattingBackend, Key, KeyInput, RichTextEditor, Toolbar,
};

#[test]
fn bold_on_select_all_activates_the_control() {
    let mut editor = RichTextEditor::new("<p>Test text</p>");
    editor.region_mut().select_all();

    editor.execute("bold", None).unwrap();

    assert_eq!(editor.to_html(), "<p><b>Test text</b></p>");
    assert!(editor.toolbar().is_active("bold"));
    assert!(
        editor
            .backend()
            .query_state(editor.region(), "bold")
            .unwrap()
    );
    assert_eq!(editor.field().value(), "<p><b>Test text</b></p>");
}

#[test]
fn toggling_bold_twice_restores_the_text() {
    let mut editor = RichTextEditor::new("<p>Test text</p>");
    editor.region_mut().select_text("text");

    editor.execute("bold", None).unwrap();
    assert_eq!(editor.to_html(), "<p>Test <b>text</b></p>");
    assert!(editor.toolbar().is_active("bold"));

    editor.execute("bold", None).unwrap();
    assert_eq!(editor.to_html(), "<p>Test text</p>");
    assert!(!editor.toolbar().is_active("bold"));
}

#[test]
fn reconcile_is_idempotent() {
    let mut editor = RichTextEditor::new("<h2><i>Heading</i></h2><p>body</p>");
    editor.region_mut().place_caret_after("Head");

    let first = editor.reconcile();
    assert!(!first.is_empty());
    let controls = editor.toolbar().controls().to_vec();

    let second = editor.reconcile();
    assert!(second.is_empty());
    assert_eq!(editor.toolbar().controls(), controls.as_slice());
    assert!(editor.toolbar().is_active("italic"));
    assert_eq!(editor.toolbar().value("formatBlock"), Some("h2"));
}

#[test]
fn selection_changes_outside_the_region_are_ignored() {
    let mut editor = RichTextEditor::new("<p><b>bold</b> plain</p>");
    editor.region_mut().place_caret_after("bo");

    editor.handle_event(EditorEvent::SelectionChange {
        region_is_active: false,
    });
    assert!(!editor.toolbar().is_active("bold"));

    editor.handle_event(EditorEvent::SelectionChange {
        region_is_active: true,
    });
    assert!(editor.toolbar().is_active("bold"));
}

#[test]
fn mouse_up_after_moving_the_caret_refreshes_controls() {
    let mut editor = RichTextEditor::new("<p><b>bold</b> plain</p>");
    editor.region_mut().place_caret_after("bo");
    editor.handle_event(EditorEvent::MouseUp);
    assert!(editor.toolbar().is_active("bold"));

    editor.region_mut().place_caret_after("pla");
    editor.handle_event(EditorEvent::KeyUp);
    assert!(!editor.toolbar().is_active("bold"));
}

#[test]
fn keyboard_shortcuts_run_mark_commands() {
    let mut editor = RichTextEditor::new("<p>word</p>");
    editor.region_mut().select_text("word");

    let outcome = editor.handle_event(EditorEvent::KeyDown(
        KeyInput::plain(Key::Char('i')).with_ctrl(),
    ));
    assert!(outcome.default_prevented());
    assert_eq!(editor.to_html(), "<p><i>word</i></p>");
    assert!(editor.toolbar().is_active("italic"));

    let outcome = editor.handle_event(EditorEvent::KeyDown(
        KeyInput::plain(Key::Char('k')).with_meta(),
    ));
    assert!(!outcome.default_prevented());
}

#[test]
fn discovered_toolbar_only_tracks_its_controls() {
    let toolbar = Toolbar::discover(
        r#"<div class="toolbar"><button data-command="underline">U</button><select data-command="formatBlock"></select></div>"#,
    );
    let mut editor = RichTextEditor::new("<p><u>under</u></p>").with_toolbar(toolbar);
    editor.region_mut().place_caret_after("und");
    editor.reconcile();

    assert_eq!(editor.toolbar().controls().len(), 2);
    assert_eq!(
        editor.toolbar().control("formatBlock").map(|c| c.kind),
        Some(ControlKind::Select)
    );
    assert!(editor.toolbar().is_active("underline"));
    assert!(editor.toolbar().control("bold").is_none());
}

#[test]
fn two_editors_do_not_share_state() {
    let mut first = RichTextEditor::new("<p>one</p>");
    let mut second = RichTextEditor::new("<p>two</p>");
    second.region_mut().place_caret_after("tw");
    second.reconcile();

    first.region_mut().select_all();
    first.execute("bold", None).unwrap();

    assert!(first.toolbar().is_active("bold"));
    assert!(!second.toolbar().is_active("bold"));
    assert_eq!(second.to_html(), "<p>two</p>");
    assert_eq!(second.field().value(), "<p>two</p>");
}

#[test]
fn losing_the_selection_clears_toggles_and_keeps_the_last_size() {
    let mut editor = RichTextEditor::new(r#"<p><font size="6"><b>Big</b></font> text</p>"#);
    editor.region_mut().place_caret_after("Big");
    editor.reconcile();
    assert!(editor.toolbar().is_active("bold"));
    assert_eq!(editor.toolbar().value("fontSize"), Some("6"));

    editor.region_mut().set_selection(None);
    editor.reconcile();

    for control in editor.toolbar().controls() {
        if control.kind == ControlKind::Toggle {
            assert!(!control.active, "{} still active", control.command);
        }
    }
    assert_eq!(editor.toolbar().value("fontSize"), Some("6"));
    assert_eq!(editor.last_font_size().label(), "large");
    assert_eq!(editor.toolbar().value("formatBlock"), None);
}
