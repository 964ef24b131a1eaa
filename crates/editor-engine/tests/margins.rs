use editor_engine::{
    EditRequest, Engine, EngineConfig, EngineError, EngineEvent, FoldMarker, MarginClick,
    MarginContent, MarginKind, MarginSpec, MarkerShape, Position, MASK_FOLDERS,
};
use pretty_assertions::assert_eq;

const SYMBOLS: usize = 0;
const NUMBERS: usize = 1;
const TEXT: usize = 2;
const FOLDS: usize = 3;

fn engine(text: &str) -> Engine {
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.define_margin(MarginSpec::new(SYMBOLS, MarginKind::Symbol, 16));
    engine.define_margin(MarginSpec::new(NUMBERS, MarginKind::Number, 40));
    engine.define_margin(MarginSpec::new(TEXT, MarginKind::Text, 60));
    engine.define_margin(MarginSpec::new(FOLDS, MarginKind::Fold, 14));
    engine
}

fn marker_lines(engine: &Engine) -> Vec<(usize, u32)> {
    engine.margins().marker_lines().collect()
}

#[test]
fn test_markers_follow_inserted_lines() {
    let mut engine = engine("a\nb\nc\nd");
    engine.set_marker(2, 1).unwrap();

    engine.apply_edit(EditRequest::insert(0, "x\ny\n")).unwrap();
    assert_eq!(marker_lines(&engine), vec![(4, 0b10)]);

    // A line break inserted at the start of the marked line pushes the marker down with its
    // text; the new empty line carries nothing.
    let start = engine.to_offset(Position::new(4, 0));
    engine.apply_edit(EditRequest::insert(start, "\n")).unwrap();
    assert_eq!(marker_lines(&engine), vec![(5, 0b10)]);
    assert_eq!(engine.line_text(5).as_deref(), Some("c"));
    assert_eq!(engine.markers_on_line(4), 0);
}

#[test]
fn test_deleted_line_drops_its_markers() {
    let mut engine = engine("a\nb\nc\nd");
    engine.set_marker(1, 0).unwrap();
    engine.set_marker(3, 2).unwrap();

    engine.apply_edit(EditRequest::delete(2, 2)).unwrap();
    assert_eq!(engine.text(), "a\nc\nd");
    assert_eq!(marker_lines(&engine), vec![(2, 0b100)]);
}

#[test]
fn test_joining_lines_keeps_the_upper_line_markers() {
    let mut engine = engine("first\nsecond");
    engine.set_marker(0, 4).unwrap();
    engine.set_marker(1, 5).unwrap();

    engine.set_caret(engine.to_offset(Position::new(1, 0)), None);
    engine.apply_backspace().unwrap();
    assert_eq!(engine.text(), "firstsecond");
    assert_eq!(marker_lines(&engine), vec![(0, 1 << 4)]);
}

#[test]
fn test_margin_content_per_kind() {
    let mut engine = engine("def f():\n    x = 1\n    y = 2\nreturn");
    engine.set_marker(1, 3).unwrap();
    engine.set_marker(1, 25).unwrap();
    engine.set_margin_text(0, Some("E101".to_string())).unwrap();

    assert_eq!(engine.margin_content(SYMBOLS, 1).unwrap(), MarginContent::Markers(1 << 3));
    assert_eq!(engine.margin_content(SYMBOLS, 0).unwrap(), MarginContent::Empty);
    assert_eq!(engine.margin_content(NUMBERS, 2).unwrap(), MarginContent::LineNumber(3));
    assert_eq!(
        engine.margin_content(TEXT, 0).unwrap(),
        MarginContent::Text("E101".to_string())
    );
    assert_eq!(engine.margin_content(TEXT, 1).unwrap(), MarginContent::Empty);
    assert_eq!(
        engine.margin_content(FOLDS, 0).unwrap(),
        MarginContent::Fold(FoldMarker::Expanded)
    );
    assert_eq!(engine.margin_content(FOLDS, 1).unwrap(), MarginContent::Empty);

    engine.toggle_fold(0);
    assert_eq!(
        engine.margin_content(FOLDS, 0).unwrap(),
        MarginContent::Fold(FoldMarker::Collapsed)
    );
}

#[test]
fn test_margin_queries_past_the_end_are_empty() {
    let engine = engine("one line");
    assert_eq!(engine.margin_content(NUMBERS, 10).unwrap(), MarginContent::Empty);
    assert_eq!(engine.markers_on_line(10), 0);
    assert!(matches!(
        engine.margin_content(9, 0),
        Err(EngineError::InvalidMargin(9))
    ));
}

#[test]
fn test_custom_mask_shows_folder_slots() {
    let mut engine = engine("a\nb");
    engine.set_marker(0, 26).unwrap();
    assert_eq!(engine.margin_content(SYMBOLS, 0).unwrap(), MarginContent::Empty);

    engine.set_margin_mask(SYMBOLS, MASK_FOLDERS).unwrap();
    assert_eq!(engine.margin_content(SYMBOLS, 0).unwrap(), MarginContent::Markers(1 << 26));
}

#[test]
fn test_insensitive_margin_click_produces_nothing() {
    let mut engine = engine("a\nb");
    engine.set_marker(1, 0).unwrap();
    assert_eq!(engine.click_margin(SYMBOLS, 1).unwrap(), None);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_sensitive_margin_click_reports_markers() {
    let mut engine = engine("a\nb");
    engine.set_marker(1, 0).unwrap();
    engine.set_marker(1, 7).unwrap();
    engine.set_margin_sensitive(SYMBOLS, true).unwrap();

    let expected = MarginClick {
        margin: SYMBOLS,
        line: 1,
        kind: MarginKind::Symbol,
        markers: 0b1000_0001,
    };
    assert_eq!(engine.click_margin(SYMBOLS, 1).unwrap(), Some(expected));
    assert_eq!(engine.drain_events(), vec![EngineEvent::MarginClicked(expected)]);
}

#[test]
fn test_insensitive_fold_margin_ignores_clicks() {
    let mut engine = engine("a {\n  b\n}");
    let state = engine.folding_state();

    assert_eq!(engine.click_margin(FOLDS, 0).unwrap(), None);
    assert!(engine.drain_events().is_empty());
    assert!(engine.is_visible(1));
    assert_eq!(engine.folding_state(), state);
}

#[test]
fn test_sensitive_fold_margin_click_toggles_region() {
    let mut engine = engine("def f():\n    x = 1\nreturn");
    engine.set_margin_sensitive(FOLDS, true).unwrap();

    let expected = MarginClick {
        margin: FOLDS,
        line: 0,
        kind: MarginKind::Fold,
        markers: 0,
    };
    assert_eq!(engine.click_margin(FOLDS, 0).unwrap(), Some(expected));
    assert!(!engine.is_visible(1));
    assert_eq!(
        engine.drain_events(),
        vec![
            EngineEvent::FoldToggled {
                header_line: 0,
                collapsed: true
            },
            EngineEvent::MarginClicked(expected),
        ]
    );

    // Not a header: the click is reported but no fold changes.
    let click = engine.click_margin(FOLDS, 2).unwrap();
    assert!(click.is_some());
    assert!(!engine.is_visible(1));
    assert!(matches!(
        engine.drain_events().as_slice(),
        [EngineEvent::MarginClicked(MarginClick { line: 2, .. })]
    ));
}

#[test]
fn test_annotations_stay_with_their_lines() {
    let mut engine = engine("a\nb\nc\nd");
    engine.set_annotation(1, "checked").unwrap();
    engine.set_annotation(3, "todo").unwrap();
    assert!(matches!(
        engine.set_annotation(4, "past the end"),
        Err(EngineError::LineOutOfRange {
            line: 4,
            line_count: 4
        })
    ));

    // Inserted lines start without annotations.
    engine.apply_edit(EditRequest::insert(0, "new\n")).unwrap();
    assert_eq!(engine.annotation(0), None);
    assert_eq!(engine.annotation(2), Some("checked"));
    assert_eq!(engine.annotation(4), Some("todo"));

    // Deleting the annotated line "b" drops its annotation.
    let start = engine.to_offset(Position::new(2, 0));
    engine.apply_edit(EditRequest::delete(start, 2)).unwrap();
    assert_eq!(engine.text(), "new\na\nc\nd");
    let annotated: Vec<(usize, &str)> = engine.margins().annotations().collect();
    assert_eq!(annotated, vec![(3, "todo")]);
    assert_eq!(
        engine.line_render_state(3).and_then(|state| state.annotation),
        Some("todo".to_string())
    );

    engine.clear_all_annotations();
    assert_eq!(engine.margins().annotations().count(), 0);
}

#[test]
fn test_invalid_margin_and_marker_inputs() {
    let mut engine = engine("a\nb");
    assert!(matches!(
        engine.click_margin(7, 0),
        Err(EngineError::InvalidMargin(7))
    ));
    assert!(matches!(
        engine.set_margin_width(7, 10),
        Err(EngineError::InvalidMargin(7))
    ));
    assert!(matches!(
        engine.set_marker(5, 0),
        Err(EngineError::LineOutOfRange {
            line: 5,
            line_count: 2
        })
    ));
    assert!(matches!(
        engine.set_marker(0, 32),
        Err(EngineError::InvalidMarkerSymbol(32))
    ));
    assert_eq!(engine.markers_on_line(0), 0);
}

#[test]
fn test_marker_navigation_and_bulk_clear() {
    let mut engine = engine("0\n1\n2\n3\n4\n5");
    engine.set_marker(1, 0).unwrap();
    engine.set_marker(3, 1).unwrap();
    engine.set_marker(5, 0).unwrap();

    assert_eq!(engine.margins().next_marker_line(2, 0b01), Some(5));
    assert_eq!(engine.margins().next_marker_line(2, 0b11), Some(3));
    assert_eq!(engine.margins().previous_marker_line(4, 0b01), Some(1));
    assert_eq!(engine.margins().previous_marker_line(0, 0b11), None);

    engine.clear_marker_everywhere(0).unwrap();
    assert_eq!(marker_lines(&engine), vec![(3, 0b10)]);
    engine.clear_marker(3, 1).unwrap();
    engine.clear_marker(3, 1).unwrap();
    assert!(marker_lines(&engine).is_empty());
}

#[test]
fn test_marker_definitions_are_per_engine() {
    let mut first = engine("a");
    let second = engine("b");

    assert_eq!(first.define_marker(MarkerShape::Bookmark), Some(0));
    assert_eq!(first.define_marker(MarkerShape::Arrow), Some(1));
    assert_eq!(first.marker_definition(1).shape, MarkerShape::Arrow);
    assert_eq!(second.marker_definition(1).shape, MarkerShape::Circle);
}

#[test]
fn test_margin_widths() {
    let mut engine = engine("a");
    assert_eq!(engine.margins().total_width(), 16 + 40 + 60 + 14);
    engine.set_margin_width(TEXT, 0).unwrap();
    assert_eq!(engine.margins().total_width(), 16 + 40 + 14);
}
