//! The same editing script must leave the same observable state on every backend.

use editor_engine::{
    Backend, EditRequest, EditorBackend, Engine, EngineConfig, EngineEvent, FoldStrategy,
    HotspotEvents, MarginKind, MarginSpec, Position,
};
use pretty_assertions::assert_eq;

const TEXT: &str = "def f(x):\n    if x:\n        return [x]\n    return None\nprint(f(1))";

#[derive(Debug, PartialEq)]
struct Observed {
    lines: Vec<String>,
    carets: Vec<(usize, Option<usize>)>,
    visible: Vec<usize>,
    markers: Vec<u32>,
    braces: Option<(usize, usize)>,
    indicators: Vec<(usize, usize)>,
    events: Vec<EngineEvent>,
}

fn script(backend: &mut dyn EditorBackend) -> Observed {
    backend.define_margin(MarginSpec::new(0, MarginKind::Symbol, 16).sensitive(true));
    backend.set_marker(2, 1).unwrap();
    backend.add_indicator_range(4, 5, 3);
    let hotspot = backend.set_hotspot(0, 3, "def".to_string(), HotspotEvents::ALL);
    assert!(hotspot.is_some());

    backend
        .apply_edit(EditRequest::insert(0, "# header\n"))
        .unwrap();

    let first = backend.to_offset(Position::new(1, 9));
    let second = backend.to_offset(Position::new(4, 15));
    backend.add_caret(first, None);
    backend.add_caret(second, None);
    backend.remove_caret(0).unwrap();
    backend.apply_typed_text(" # note").unwrap();
    backend.apply_backspace().unwrap();

    backend.compute_folds(FoldStrategy::Indentation);
    backend.toggle_fold(2);
    backend.hide_lines(5, 5);

    let click = backend.on_margin_click(0, 3).unwrap();
    assert!(click.is_some());
    backend.pointer_clicked(1);

    let close = backend.to_offset(Position::new(3, 16));
    Observed {
        lines: (0..backend.line_count())
            .filter_map(|l| backend.line_text(l))
            .collect(),
        carets: backend
            .caret_list()
            .iter()
            .map(|c| (c.position, c.anchor))
            .collect(),
        visible: (0..backend.line_count())
            .filter(|&l| backend.is_visible(l))
            .collect(),
        markers: (0..backend.line_count())
            .map(|l| backend.markers_on_line(l))
            .collect(),
        braces: backend.match_brace_at(close),
        indicators: backend
            .query_indicators_at(13)
            .iter()
            .map(|i| (i.start, i.end))
            .collect(),
        events: backend.drain_events(),
    }
}

#[test]
fn test_native_and_fallback_behave_identically() {
    let native = Engine::new(TEXT, EngineConfig::default()).unwrap();
    let mut native = Backend::open(TEXT, EngineConfig::default(), Some(Box::new(native))).unwrap();
    let mut fallback = Backend::open(TEXT, EngineConfig::default(), None).unwrap();
    assert!(native.is_native());
    assert!(native.engine().is_none());
    assert!(!fallback.is_native());

    let from_native = script(&mut *native);
    let from_fallback = script(&mut *fallback);
    assert_eq!(from_native, from_fallback);
}

#[test]
fn test_script_results_on_the_engine() {
    let mut backend = Backend::open(TEXT, EngineConfig::default(), None).unwrap();
    let observed = script(&mut *backend);

    assert_eq!(
        observed.lines,
        vec![
            "# header",
            "def f(x): # not",
            "    if x:",
            "        return [x]",
            "    return None # not",
            "print(f(1))",
        ]
    );
    assert_eq!(observed.visible, vec![0, 1, 2, 4]);
    assert_eq!(observed.markers, vec![0, 0, 0, 0b10, 0, 0]);
    assert_eq!(observed.braces, Some((50, 52)));
    assert_eq!(observed.indicators, vec![(13, 14)]);
    assert!(matches!(
        observed.events.as_slice(),
        [EngineEvent::MarginClicked(click)] if click.line == 3 && click.markers == 0b10
    ));

    let engine = backend.engine().unwrap();
    assert_eq!(engine.carets().len(), 2);
    assert!(engine.is_modified());
}
