use editor_engine::{
    EditRequest, Engine, EngineConfig, EngineError, FoldMarker, FoldRegion, FoldStrategy, Position,
};
use pretty_assertions::assert_eq;

const PYTHON: &str = "def f():\n    x = 1\n    y = 2\nreturn";

fn python() -> Engine {
    Engine::new(PYTHON, EngineConfig::default()).unwrap()
}

fn region(header_line: usize, last_child_line: usize, level: usize) -> FoldRegion {
    FoldRegion::new(header_line, last_child_line, level)
}

fn visible(engine: &Engine) -> Vec<usize> {
    (0..engine.line_count()).filter(|&l| engine.is_visible(l)).collect()
}

#[test]
fn test_indentation_fold_scenario() {
    let mut engine = python();
    engine.compute_folds(FoldStrategy::Indentation);
    assert_eq!(engine.fold_regions(), &[region(0, 2, 1)]);

    engine.toggle_fold(0);
    assert_eq!(visible(&engine), vec![0, 3]);
}

#[test]
fn test_nested_indentation_levels() {
    let text = "class A:\n    def f(self):\n        pass\n\n    def g(self):\n        pass\nx = 1";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.compute_folds(FoldStrategy::Indentation);
    assert_eq!(
        engine.fold_regions(),
        &[region(0, 5, 1), region(1, 2, 2), region(4, 5, 2)]
    );
}

#[test]
fn test_bracket_fold_ignores_brackets_in_literals() {
    let config = EngineConfig {
        language: "javascript".to_string(),
        ..EngineConfig::default()
    };
    let text = "function f() {\n  let s = \"{\";\n  // }\n  return s;\n}";
    let mut engine = Engine::new(text, config).unwrap();
    engine.compute_folds(FoldStrategy::BracketPairs);
    assert_eq!(engine.fold_regions(), &[region(0, 4, 1)]);
}

#[test]
fn test_visibility_formula_holds_for_every_line() {
    let text = "a {\n  b {\n    c\n  }\n  d\n}\ne\nf";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.compute_folds(FoldStrategy::BracketPairs);
    engine.toggle_fold(1);
    engine.hide_lines(6, 6);

    for line in 0..engine.line_count() {
        let hidden = engine.folding().hidden_lines().contains(&line);
        let folded = engine
            .fold_regions()
            .iter()
            .any(|r| r.collapsed && r.hides(line));
        assert_eq!(engine.is_visible(line), !hidden && !folded, "line {line}");
    }
    assert_eq!(visible(&engine), vec![0, 1, 4, 5, 7]);
}

#[test]
fn test_child_state_is_sticky_across_parent_toggle() {
    let text = "a {\n  b {\n    c\n  }\n}";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.toggle_fold(1);
    engine.toggle_fold(0);
    engine.toggle_fold(0);
    assert_eq!(engine.folding().fold_marker(1), FoldMarker::Collapsed);
    assert_eq!(visible(&engine), vec![0, 1, 4]);
}

#[test]
fn test_collapse_and_hide_are_idempotent() {
    let mut engine = python();
    assert!(engine.fold_line(0, false));
    let state = engine.folding_state();
    assert!(engine.fold_line(0, false));
    assert_eq!(engine.folding_state(), state);

    assert!(engine.hide_lines(3, 3));
    let state = engine.folding_state();
    assert!(!engine.hide_lines(3, 3));
    assert_eq!(engine.folding_state(), state);
}

#[test]
fn test_hiding_does_not_touch_folds() {
    let mut engine = python();
    engine.hide_lines(1, 1);
    engine.toggle_fold(0);
    engine.toggle_fold(0);
    assert_eq!(visible(&engine), vec![0, 2, 3]);

    engine.fold_all();
    engine.show_hidden_lines(None);
    assert_eq!(visible(&engine), vec![0, 3]);
    engine.unfold_all();
    assert_eq!(visible(&engine), vec![0, 1, 2, 3]);
}

#[test]
fn test_set_fold_level_is_whole_document() {
    let text = "a {\n  b {\n    c\n  }\n}\nd {\n  e\n}";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.compute_folds(FoldStrategy::BracketPairs);
    engine.fold_all();
    engine.set_fold_level(2);
    let collapsed: Vec<usize> = engine.folding().collapsed_headers().collect();
    assert_eq!(collapsed, vec![1]);
    engine.set_fold_level(1);
    let collapsed: Vec<usize> = engine.folding().collapsed_headers().collect();
    assert_eq!(collapsed, vec![0, 1, 5]);
}

#[test]
fn test_combined_levels_follow_nesting() {
    let config = EngineConfig {
        language: "javascript".to_string(),
        ..EngineConfig::default()
    };
    let text = "function f() {\n  if (x) {\n    y();\n  }\n}";
    let mut engine = Engine::new(text, config).unwrap();
    engine.compute_folds(FoldStrategy::Combined);
    assert_eq!(engine.fold_regions(), &[region(0, 4, 1), region(1, 3, 2)]);

    engine.set_fold_level(2);
    let collapsed: Vec<usize> = engine.folding().collapsed_headers().collect();
    assert_eq!(collapsed, vec![1]);
    assert_eq!(visible(&engine), vec![0, 1, 4]);
}

#[test]
fn test_levels_follow_depth_after_removing_a_block() {
    let text = "a {\n  b {\n    c {\n      d\n    }\n  }\n}";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.compute_folds(FoldStrategy::BracketPairs);
    assert_eq!(
        engine.fold_regions(),
        &[region(0, 6, 1), region(1, 5, 2), region(2, 4, 3)]
    );

    // Removing "b {" and its closer leaves "c" one level up.
    let start = engine.to_offset(Position::new(1, 0));
    engine.apply_edit(EditRequest::delete(start, 6)).unwrap();
    let start = engine.to_offset(Position::new(4, 0));
    engine.apply_edit(EditRequest::delete(start, 4)).unwrap();
    assert_eq!(engine.text(), "a {\n    c {\n      d\n    }\n}");
    engine.compute_folds(FoldStrategy::BracketPairs);
    assert_eq!(engine.fold_regions(), &[region(0, 4, 1), region(1, 3, 2)]);
}

#[test]
fn test_ensure_line_visible_expands_ancestors_only() {
    let text = "a {\n  b {\n    c\n  }\n}";
    let mut engine = Engine::new(text, EngineConfig::default()).unwrap();
    engine.fold_all();
    engine.hide_lines(3, 3);
    assert!(engine.ensure_line_visible(2));
    assert!(engine.is_visible(2));
    assert!(!engine.is_visible(3));
    assert!(!engine.ensure_line_visible(2));
}

#[test]
fn test_edits_keep_collapsed_regions_and_hidden_lines_in_place() {
    let mut engine = python();
    engine.toggle_fold(0);
    engine.hide_lines(3, 3);

    engine
        .apply_edit(EditRequest::insert(0, "import os\n\n"))
        .unwrap();
    assert_eq!(
        engine.fold_regions(),
        &[FoldRegion {
            collapsed: true,
            ..region(2, 4, 1)
        }]
    );
    let hidden: Vec<usize> = engine.folding().hidden_lines().iter().copied().collect();
    assert_eq!(hidden, vec![5]);
    assert_eq!(visible(&engine), vec![0, 1, 2]);
}

#[test]
fn test_deleting_a_region_body_drops_the_region() {
    let mut engine = python();
    let start = engine.to_offset(Position::new(0, 8));
    let end = engine.to_offset(Position::new(2, 9));
    engine
        .apply_edit(EditRequest::delete(start, (end - start) as i64))
        .unwrap();
    assert_eq!(engine.text(), "def f():\nreturn");
    assert!(engine.fold_regions().is_empty());
}

#[test]
fn test_large_documents_refold_through_jobs() {
    let config = EngineConfig {
        sync_refold_line_limit: 3,
        fold_batch_lines: 2,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(PYTHON, config).unwrap();
    assert_eq!(engine.fold_regions(), &[region(0, 2, 1)]);

    let end = engine.to_offset(Position::new(3, 6));
    engine.apply_edit(EditRequest::insert(end, "\n    z")).unwrap();
    assert!(engine.folding().is_dirty());

    let mut job = engine.start_fold_job();
    let mut steps = 0;
    while !job.step() {
        steps += 1;
    }
    assert!(steps >= 1);
    engine.commit_fold_job(job).unwrap();
    assert!(!engine.folding().is_dirty());
    assert_eq!(engine.fold_regions(), &[region(0, 2, 1), region(3, 4, 1)]);
}

#[test]
fn test_stale_job_leaves_regions_untouched() {
    let config = EngineConfig {
        sync_refold_line_limit: 0,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(PYTHON, config).unwrap();
    let job = engine.start_fold_job();
    engine.apply_edit(EditRequest::insert(0, "#\n")).unwrap();
    let before = engine.fold_regions().to_vec();

    assert!(matches!(
        engine.commit_fold_job(job),
        Err(EngineError::StaleFoldJob { .. })
    ));
    assert_eq!(engine.fold_regions(), before.as_slice());
}

#[test]
fn test_cancelled_job_commits_nothing_until_finished() {
    let text: String = (0..50).map(|i| format!("block{i}:\n    body\n")).collect();
    let config = EngineConfig {
        fold_batch_lines: 10,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(&text, config).unwrap();
    engine.fold_all();
    let collapsed = engine.folding().collapsed_headers().count();

    let mut job = engine.start_fold_job();
    let mut polls = 0;
    assert!(!job.run(|| {
        polls += 1;
        polls > 2
    }));
    assert!(!job.is_finished());
    assert_eq!(engine.folding().collapsed_headers().count(), collapsed);

    engine.commit_fold_job(job).unwrap();
    assert_eq!(engine.fold_regions().len(), 50);
    assert_eq!(engine.folding().collapsed_headers().count(), 50);
}

#[test]
fn test_fold_line_without_region() {
    let mut engine = python();
    assert!(!engine.fold_line(3, false));
    assert_eq!(engine.toggle_fold(2), None);
    assert_eq!(engine.toggle_fold(99), None);
    assert!(!engine.is_visible(99));
}

#[test]
fn test_display_rows() {
    let mut engine = python();
    engine.toggle_fold(0);
    assert_eq!(engine.folding().line_to_display(3), Some(1));
    assert_eq!(engine.folding().display_to_line(1), Some(3));
    assert_eq!(engine.folding().line_to_display(2), None);
    assert_eq!(engine.folding().display_line_count(), 2);
}

#[test]
fn test_folding_disabled() {
    let config = EngineConfig {
        folding_enabled: false,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(PYTHON, config).unwrap();
    assert!(engine.fold_regions().is_empty());
    engine.compute_folds(FoldStrategy::Indentation);
    assert_eq!(engine.fold_regions().len(), 1);
}
