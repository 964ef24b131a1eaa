use editor_engine::{EditRequest, Engine, EngineConfig, EngineError, LineTerminator, Position};
use pretty_assertions::assert_eq;

fn engine(text: &str) -> Engine {
    Engine::new(text, EngineConfig::default()).unwrap()
}

fn terminators(engine: &Engine) -> Vec<LineTerminator> {
    (0..engine.line_count())
        .filter_map(|line| engine.line_terminator(line))
        .collect()
}

#[test]
fn test_mixed_terminators_survive_a_save() {
    let original = "one\r\ntwo\nthree\rfour";
    let engine = engine(original);

    assert_eq!(engine.line_count(), 4);
    assert_eq!(engine.text(), "one\ntwo\nthree\nfour");
    assert_eq!(
        terminators(&engine),
        vec![
            LineTerminator::Crlf,
            LineTerminator::Lf,
            LineTerminator::Cr,
            LineTerminator::None
        ]
    );
    assert_eq!(engine.text_for_saving(), original);
}

#[test]
fn test_each_break_is_one_offset() {
    let engine = engine("ab\r\ncd");
    assert_eq!(engine.buffer().len_chars(), 5);
    assert_eq!(engine.to_position(3), Position::new(1, 0));
    assert_eq!(engine.to_offset(Position::new(1, 2)), 5);
    assert_eq!(engine.text_in_range(1, 4), "b\nc");
}

#[test]
fn test_inserted_text_keeps_its_own_terminators() {
    let mut engine = engine("ab\ncd");
    engine.apply_edit(EditRequest::insert(1, "x\r\ny")).unwrap();
    assert_eq!(engine.text(), "ax\nyb\ncd");
    assert_eq!(engine.text_for_saving(), "ax\r\nyb\ncd");
}

#[test]
fn test_inserted_breaks_can_follow_the_document_default() {
    let config = EngineConfig {
        convert_inserted_line_endings: true,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new("a\r\nb", config).unwrap();
    engine.apply_edit(EditRequest::insert(1, "x\ny\rz")).unwrap();
    assert_eq!(engine.text_for_saving(), "ax\r\ny\r\nz\r\nb");
}

#[test]
fn test_removal_end_line_keeps_its_terminator() {
    let mut engine = engine("a\r\nb\nc");
    engine.apply_edit(EditRequest::delete(1, 2)).unwrap();
    assert_eq!(engine.text(), "a\nc");
    assert_eq!(engine.text_for_saving(), "a\nc");
    assert_eq!(engine.line_terminator(1), Some(LineTerminator::None));
}

#[test]
fn test_last_line_is_never_terminated() {
    let mut engine = engine("a\r\n");
    assert_eq!(engine.line_count(), 2);
    assert_eq!(engine.line_terminator(1), Some(LineTerminator::None));

    engine.apply_edit(EditRequest::delete(1, 1)).unwrap();
    assert_eq!(terminators(&engine), vec![LineTerminator::None]);
    assert_eq!(engine.line_terminator(1), None);
}

#[test]
fn test_from_lines_uses_configured_default() {
    let config = EngineConfig {
        default_line_ending: Some(LineTerminator::Crlf),
        ..EngineConfig::default()
    };
    let engine = Engine::from_lines(
        [
            ("first", LineTerminator::Lf),
            ("second", LineTerminator::None),
            ("third", LineTerminator::None),
        ],
        config,
    )
    .unwrap();
    assert_eq!(engine.text_for_saving(), "first\nsecond\r\nthird");
    assert_eq!(engine.buffer().default_line_ending(), LineTerminator::Crlf);
}

#[test]
fn test_insert_line_uses_default_terminator() {
    let mut engine = engine("a\r\nc");
    engine.insert_line(1, "b").unwrap();
    engine.insert_line(3, "d").unwrap();
    assert_eq!(engine.text_for_saving(), "a\r\nb\r\nc\r\nd");

    assert!(matches!(
        engine.insert_line(9, "x"),
        Err(EngineError::LineOutOfRange {
            line: 9,
            line_count: 4
        })
    ));
}

#[test]
fn test_convert_line_endings_keeps_offsets() {
    let mut engine = engine("a\nb\rc\r\nd");
    engine.set_caret(4, None);
    let version = engine.version();

    engine.convert_line_endings(LineTerminator::Crlf);
    assert_eq!(engine.text_for_saving(), "a\r\nb\r\nc\r\nd");
    assert_eq!(engine.primary_caret().position, 4);
    assert!(engine.is_modified());
    assert!(engine.has_changed_since(version));

    engine.mark_saved();
    assert!(!engine.is_modified());
}

#[test]
fn test_settings_default_line_ending_from_json() {
    let config = EngineConfig::from_json_str(r#"{"default_line_ending": "cr"}"#).unwrap();
    let mut engine = Engine::new("x", config).unwrap();
    engine.set_caret(1, None);
    engine.insert_newline().unwrap();
    assert_eq!(engine.text_for_saving(), "x\r");
}
