use freespace_editor::{
    ClipboardData, DeferredTask, EditorConfig, EditorEvent, EnterBehavior, EventOutcome, Key,
    KeyInput, Op, RichTextEditor, Transaction,
};

#[test]
fn initial_value_seeds_the_region_and_schedules_a_sync() {
    let mut editor = RichTextEditor::new("<p>saved</p>");
    assert_eq!(editor.to_html(), "<p>saved</p>");

    let pending: Vec<_> = editor.deferred().pending().cloned().collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task, DeferredTask::Resync);
    assert_eq!(pending[0].delay_ms, 100);

    assert_eq!(editor.run_deferred(), 1);
    assert!(editor.deferred().is_empty());
    assert_eq!(editor.toolbar().value("fontSize"), Some("4"));
}

#[test]
fn blank_initial_value_starts_empty() {
    let mut editor = RichTextEditor::new("   ");
    assert_eq!(editor.to_html(), "");
    assert!(editor.placeholder_visible());

    editor.handle_event(EditorEvent::Focus);
    assert!(!editor.placeholder_visible());
    editor.handle_event(EditorEvent::Blur);
    assert!(editor.placeholder_visible());
}

#[test]
fn enter_outside_lists_inserts_two_breaks() {
    let mut editor = RichTextEditor::new("<p>ab</p>");
    editor.region_mut().place_caret_after("a");

    let outcome = editor.handle_event(EditorEvent::KeyDown(KeyInput::plain(Key::Enter)));
    assert_eq!(outcome, EventOutcome::Handled);
    assert_eq!(editor.to_html(), "<p>a<br><br>b</p>");
    assert_eq!(editor.field().value(), "<p>a<br><br>b</p>");
}

#[test]
fn native_enter_behavior_leaves_enter_to_the_host() {
    let config = EditorConfig {
        enter_behavior: EnterBehavior::Native,
        ..EditorConfig::default()
    };
    let mut editor = RichTextEditor::with_config("<p>ab</p>", config);
    editor.region_mut().place_caret_after("a");

    let outcome = editor.handle_event(EditorEvent::KeyDown(KeyInput::plain(Key::Enter)));
    assert_eq!(outcome, EventOutcome::Continue);
    assert_eq!(editor.to_html(), "<p>ab</p>");

    editor
        .perform_native_default(KeyInput::plain(Key::Enter))
        .unwrap();
    assert_eq!(editor.to_html(), "<p>a</p><p>b</p>");
}

#[test]
fn shift_enter_is_a_single_line_break() {
    let mut editor = RichTextEditor::new("<p>ab</p>");
    editor.region_mut().place_caret_after("a");

    let input = KeyInput::plain(Key::Enter).with_shift();
    assert_eq!(
        editor.handle_event(EditorEvent::KeyDown(input)),
        EventOutcome::Continue
    );
    editor.perform_native_default(input).unwrap();
    assert_eq!(editor.to_html(), "<p>a<br>b</p>");
}

#[test]
fn paste_inserts_plain_text_only() {
    let mut editor = RichTextEditor::new("<p>ab</p>");
    editor.region_mut().place_caret_after("a");

    let outcome = editor.handle_event(EditorEvent::Paste(ClipboardData::text("XY")));
    assert!(outcome.default_prevented());
    assert_eq!(editor.to_html(), "<p>aXYb</p>");
    assert_eq!(editor.field().value(), "<p>aXYb</p>");
}

#[test]
fn pasted_markup_stays_literal() {
    let mut editor = RichTextEditor::new("<p>x</p>");
    editor.region_mut().place_caret_after("x");

    editor.handle_event(EditorEvent::Paste(ClipboardData::text("<b>y</b>")));
    assert_eq!(editor.to_html(), "<p>x&lt;b&gt;y&lt;/b&gt;</p>");
}

#[test]
fn pasted_line_feeds_become_breaks() {
    let mut editor = RichTextEditor::new("<p>x</p>");
    editor.region_mut().place_caret_after("x");

    editor.handle_event(EditorEvent::Paste(ClipboardData::text("1\n2")));
    assert_eq!(editor.to_html(), "<p>x1<br>2</p>");
}

#[test]
fn typed_text_inherits_pending_marks() {
    let mut editor = RichTextEditor::new("<p>ab</p>");
    editor.region_mut().place_caret_after("ab");

    editor.execute("bold", None).unwrap();
    assert!(editor.toolbar().is_active("bold"));
    editor
        .perform_native_default(KeyInput::plain(Key::Char('c')))
        .unwrap();
    assert_eq!(editor.to_html(), "<p>ab<b>c</b></p>");
}

#[test]
fn backspace_outside_lists_deletes_natively() {
    let mut editor = RichTextEditor::new("<p>abc</p>");
    editor.region_mut().place_caret_after("abc");

    let input = KeyInput::plain(Key::Backspace);
    assert_eq!(
        editor.handle_event(EditorEvent::KeyDown(input)),
        EventOutcome::Continue
    );
    editor.perform_native_default(input).unwrap();
    assert_eq!(editor.to_html(), "<p>ab</p>");
    assert_eq!(editor.field().value(), "<p>ab</p>");
}

#[test]
fn tables_use_configured_defaults() {
    let mut editor = RichTextEditor::new("");
    editor.insert_table(0, 2).unwrap();
    let html = editor.to_html();
    assert_eq!(html.matches("<tr>").count(), 3);
    assert_eq!(html.matches("<td>&nbsp;</td>").count(), 6);
}

#[test]
fn counts_and_exports() {
    let mut editor = RichTextEditor::new("<p>Hello brave</p><p>new world</p>");
    assert_eq!(editor.word_count(), 3);
    assert_eq!(editor.character_count(), 20);
    assert_eq!(editor.to_plain_text(), "Hello bravenew world");

    editor.load_html("<p>a &amp; b&nbsp;c</p>");
    assert_eq!(editor.to_html(), "<p>a &amp; b&nbsp;c</p>");
    assert_eq!(editor.to_plain_text(), "a & b\u{a0}c");
    assert_eq!(editor.field().value(), "<p>a &amp; b&nbsp;c</p>");
}

#[test]
fn destroyed_editors_ignore_everything() {
    let mut editor = RichTextEditor::new("<p>x</p>");
    editor.region_mut().select_all();
    editor.destroy();

    assert!(editor.execute("bold", None).is_err());
    assert_eq!(editor.run_deferred(), 0);
    assert!(!editor.mirror());
    assert_eq!(
        editor.handle_event(EditorEvent::KeyDown(KeyInput::plain(Key::Tab))),
        EventOutcome::Continue
    );
}

#[test]
fn input_resyncs_the_toolbar_and_the_field() {
    let mut editor = RichTextEditor::new("<p><b>bold</b></p>");
    editor.run_deferred();
    editor.region_mut().place_caret_after("bold");
    editor
        .region_mut()
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 4,
            text: "er".to_string(),
        }]))
        .unwrap();
    assert_eq!(editor.field().value(), "<p><b>bold</b></p>");
    assert!(!editor.toolbar().is_active("bold"));

    editor.handle_event(EditorEvent::Input);
    assert_eq!(editor.field().value(), "<p><b>bolder</b></p>");
    assert!(editor.toolbar().is_active("bold"));
}
