use freespace_editor::{
    EditableRegion, EditorEvent, EventOutcome, Key, KeyInput, ListKey, ListKeyOutcome,
    ListStructureEditor, Point, RichTextEditor,
};

fn key(editor: &mut RichTextEditor, input: KeyInput) -> EventOutcome {
    editor.handle_event(EditorEvent::KeyDown(input))
}

#[test]
fn tab_then_shift_tab_restores_a_flat_list() {
    let flat = "<ul><li>A</li><li>B</li><li>C</li></ul>";
    let mut editor = RichTextEditor::new(flat);
    editor.region_mut().place_caret_after("C");

    let outcome = key(&mut editor, KeyInput::plain(Key::Tab));
    assert_eq!(outcome, EventOutcome::Handled);
    assert_eq!(
        editor.to_html(),
        "<ul><li>A</li><li>B<ul><li>C</li></ul></li></ul>"
    );
    assert_eq!(editor.field().value(), editor.to_html());

    let outcome = key(&mut editor, KeyInput::plain(Key::Tab).with_shift());
    assert_eq!(outcome, EventOutcome::Handled);
    assert_eq!(editor.to_html(), flat);
}

#[test]
fn indent_joins_an_existing_nested_list() {
    let mut editor =
        RichTextEditor::new("<ol><li>A<ol><li>B</li></ol></li><li>C</li></ol>");
    editor.region_mut().place_caret_after("C");

    key(&mut editor, KeyInput::plain(Key::Tab));
    assert_eq!(
        editor.to_html(),
        "<ol><li>A<ol><li>B</li><li>C</li></ol></li></ol>"
    );
}

#[test]
fn first_item_cannot_be_indented() {
    let flat = "<ul><li>A</li><li>B</li></ul>";
    let mut editor = RichTextEditor::new(flat);
    editor.region_mut().place_caret_after("A");

    let outcome = key(&mut editor, KeyInput::plain(Key::Tab));
    assert!(outcome.default_prevented());
    assert_eq!(editor.to_html(), flat);
}

#[test]
fn tab_outside_lists_is_left_alone() {
    let mut editor = RichTextEditor::new("<p>text</p>");
    editor.region_mut().place_caret_after("te");
    assert_eq!(
        key(&mut editor, KeyInput::plain(Key::Tab)),
        EventOutcome::Continue
    );
}

#[test]
fn enter_on_an_empty_item_leaves_the_list() {
    let mut editor = RichTextEditor::new("<ul><li>A</li><li><br></li></ul>");
    editor.region_mut().place_caret(Point::new(vec![0, 1], 0));

    let outcome = key(&mut editor, KeyInput::plain(Key::Enter));
    assert_eq!(outcome, EventOutcome::Handled);
    assert_eq!(editor.to_html(), "<ul><li>A</li></ul><p><br></p>");
    assert_eq!(
        editor.region().selection().map(|s| s.focus.clone()),
        Some(Point::new(vec![1], 0))
    );
}

#[test]
fn enter_on_an_empty_nested_item_outdents_it() {
    let mut editor = RichTextEditor::new("<ul><li>A<ul><li><br></li></ul></li></ul>");
    editor.region_mut().place_caret(Point::new(vec![0, 0, 1, 0], 0));

    key(&mut editor, KeyInput::plain(Key::Enter));
    assert_eq!(editor.to_html(), "<ul><li>A</li><li><br></li></ul>");
    assert_eq!(
        editor.region().selection().map(|s| s.focus.clone()),
        Some(Point::new(vec![0, 1], 0))
    );
}

#[test]
fn backspace_on_an_empty_nested_item_keeps_the_caret_before_the_break() {
    let mut editor = RichTextEditor::new("<ol><li>A<ol><li><br></li></ol></li></ol>");
    editor.region_mut().place_caret(Point::new(vec![0, 0, 1, 0], 0));

    let outcome = key(&mut editor, KeyInput::plain(Key::Backspace));
    assert_eq!(outcome, EventOutcome::Handled);
    assert_eq!(editor.to_html(), "<ol><li>A</li><li><br></li></ol>");
    assert_eq!(
        editor.region().selection().map(|s| s.focus.clone()),
        Some(Point::new(vec![0, 1], 0))
    );

    editor.execute("insertText", Some("B")).unwrap();
    assert_eq!(editor.to_html(), "<ol><li>A</li><li>B</li></ol>");
}

#[test]
fn backspace_on_the_only_empty_item_removes_the_list() {
    let mut editor = RichTextEditor::new("<p>before</p><ol><li><br></li></ol>");
    editor.region_mut().place_caret(Point::new(vec![1, 0], 0));

    let outcome = key(&mut editor, KeyInput::plain(Key::Backspace));
    assert_eq!(outcome, EventOutcome::Handled);
    let html = editor.to_html();
    assert!(!html.contains("<ol"));
    assert!(!html.contains("<ul"));
    assert_eq!(html, "<p>before</p><p><br></p>");
}

#[test]
fn backspace_on_an_empty_item_moves_to_the_previous_one() {
    let mut editor = RichTextEditor::new("<ul><li>A</li><li><br></li><li>C</li></ul>");
    editor.region_mut().place_caret(Point::new(vec![0, 1], 0));

    key(&mut editor, KeyInput::plain(Key::Backspace));
    assert_eq!(editor.to_html(), "<ul><li>A</li><li>C</li></ul>");
    assert_eq!(
        editor.region().selection().map(|s| s.focus.clone()),
        Some(Point::new(vec![0, 0, 0], 1))
    );
}

#[test]
fn backspace_with_text_is_native() {
    let mut region = EditableRegion::new("<ul><li>A</li></ul>");
    region.place_caret_after("A");
    let outcome = ListStructureEditor::handle_key(&mut region, ListKey::Backspace).unwrap();
    assert_eq!(outcome, ListKeyOutcome::Native);
    assert!(!outcome.prevents_default());
}

#[test]
fn enter_in_a_filled_item_continues_the_list_natively() {
    let mut editor = RichTextEditor::new("<ul><li>one</li></ul>");
    editor.run_deferred();
    editor.region_mut().place_caret_after("one");

    let outcome = key(&mut editor, KeyInput::plain(Key::Enter));
    assert_eq!(outcome, EventOutcome::Continue);
    assert_eq!(editor.deferred().len(), 1);
    assert_eq!(
        editor.deferred().pending().next().map(|d| d.delay_ms),
        Some(10)
    );

    editor
        .perform_native_default(KeyInput::plain(Key::Enter))
        .unwrap();
    assert_eq!(editor.to_html(), "<ul><li>one</li><li><br></li></ul>");
    assert_eq!(editor.run_deferred(), 1);
    assert!(editor.deferred().is_empty());

    editor
        .perform_native_default(KeyInput::plain(Key::Char('x')))
        .unwrap();
    assert_eq!(editor.to_html(), "<ul><li>one</li><li>x</li></ul>");
}

#[test]
fn list_commands_toggle_and_report_state() {
    let mut editor = RichTextEditor::new("<p>first</p><p>second</p>");
    editor.region_mut().select_text("stsec");

    editor.execute("insertOrderedList", None).unwrap();
    assert_eq!(editor.to_html(), "<ol><li>first</li><li>second</li></ol>");
    assert!(editor.toolbar().is_active("insertOrderedList"));
    assert!(!editor.toolbar().is_active("insertUnorderedList"));

    editor.execute("insertUnorderedList", None).unwrap();
    assert_eq!(editor.to_html(), "<ul><li>first</li><li>second</li></ul>");
    assert!(editor.toolbar().is_active("insertUnorderedList"));
}
