//! Tests for the line and tree factor spaces against the calc fixture.

use crate::doe::DeletionMask;
use crate::factor::{FactorSpace, LineFactorSpace, TreeFactorSpace};
use crate::test_utils::{
    CALC_INSTRUMENTED, FIXTURE_PREFIX, FixtureToolchain, init_logger, write_calc_sources,
};
use std::path::Path;

fn calc_files() -> Vec<String> {
    vec!["calc.c".to_string()]
}

fn tree_space(dir: &Path) -> TreeFactorSpace {
    write_calc_sources(dir);
    TreeFactorSpace::new(
        dir,
        &calc_files(),
        FIXTURE_PREFIX,
        Box::new(FixtureToolchain::calc()),
    )
    .unwrap()
}

// ========== LineFactorSpace ==========

#[test]
fn test_line_space_counts_lines_across_files() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "three\n").unwrap();

    let space =
        LineFactorSpace::new(dir.path(), &["a.txt".to_string(), "b.txt".to_string()]).unwrap();
    assert_eq!(space.size(), 3);
}

#[test]
fn test_line_space_blank_deleted_lines_keep_numbering() {
    init_logger();
    let orig = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(orig.path().join("a.txt"), "one\ntwo\nthree\n").unwrap();

    let space = LineFactorSpace::new(orig.path(), &["a.txt".to_string()]).unwrap();
    let mask = DeletionMask::with_set_bits(3, &[1]);
    let work_dir = work.path().join("variant");
    space.create_variant(&mask, &work_dir).unwrap();

    let variant = std::fs::read_to_string(work_dir.join("a.txt")).unwrap();
    assert_eq!(variant, "one\n\nthree\n", "deleted line becomes a blank line");
}

#[test]
fn test_line_space_records_the_mask_in_the_work_dir() {
    init_logger();
    let orig = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(orig.path().join("a.txt"), "one\ntwo\n").unwrap();

    let space = LineFactorSpace::new(orig.path(), &["a.txt".to_string()]).unwrap();
    let mask = DeletionMask::with_set_bits(2, &[0]);
    let work_dir = work.path().join("variant");
    space.create_variant(&mask, &work_dir).unwrap();

    assert_eq!(
        std::fs::read_to_string(work_dir.join("factor")).unwrap(),
        "10"
    );
}

#[test]
fn test_line_space_recreates_the_work_dir_per_variant() {
    init_logger();
    let orig = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(orig.path().join("a.txt"), "one\ntwo\n").unwrap();

    let space = LineFactorSpace::new(orig.path(), &["a.txt".to_string()]).unwrap();
    let work_dir = work.path().join("variant");
    space
        .create_variant(&DeletionMask::with_set_bits(2, &[0]), &work_dir)
        .unwrap();
    std::fs::write(work_dir.join("leftover.o"), "stale").unwrap();
    space
        .create_variant(&DeletionMask::zeros(2), &work_dir)
        .unwrap();

    assert!(
        !work_dir.join("leftover.o").exists(),
        "stale build artifacts must not leak between variants"
    );
    assert_eq!(
        std::fs::read_to_string(work_dir.join("a.txt")).unwrap(),
        "one\ntwo\n"
    );
}

// ========== TreeFactorSpace ==========

#[test]
fn test_tree_space_sizes_the_statement_catalog() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let space = tree_space(dir.path());
    // function, block, decl_stmt, two expr_stmts, return.
    assert_eq!(space.size(), 6);
}

#[test]
fn test_tree_space_revise_closes_over_nesting() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let space = tree_space(dir.path());

    let block_only = DeletionMask::with_set_bits(6, &[1]);
    assert_eq!(space.revise(&block_only).key(), "011111");

    let function_only = DeletionMask::with_set_bits(6, &[0]);
    assert_eq!(space.revise(&function_only).key(), "111111");
}

#[test]
fn test_tree_space_revise_is_idempotent() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let space = tree_space(dir.path());

    let once = space.revise(&DeletionMask::with_set_bits(6, &[1]));
    let twice = space.revise(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_tree_space_rejects_protected_statements() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let space = tree_space(dir.path());

    // decl_stmt (2), literal initialization (3) and return (5) are protected.
    for unit in [2usize, 3, 5] {
        assert!(
            !space.is_valid(&DeletionMask::with_set_bits(6, &[unit])),
            "unit {unit} must be rejected"
        );
    }
    // The computation statement (4) is fair game.
    assert!(space.is_valid(&DeletionMask::with_set_bits(6, &[4])));
    assert!(space.is_valid(&DeletionMask::zeros(6)));
}

#[test]
fn test_tree_space_variant_drops_statement_and_marker() {
    init_logger();
    let orig = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let space = tree_space(orig.path());

    let mask = DeletionMask::with_set_bits(6, &[4]);
    let work_dir = work.path().join("variant");
    space.create_variant(&mask, &work_dir).unwrap();

    let variant = std::fs::read_to_string(work_dir.join("calc.c")).unwrap();
    assert_eq!(
        variant,
        "int main() {\n    int a;\n    a = 0;\n    \n    return a;\n}\n"
    );
}

#[test]
fn test_tree_space_baseline_variant_reproduces_the_instrumented_source() {
    init_logger();
    let orig = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let space = tree_space(orig.path());

    let work_dir = work.path().join("variant");
    space
        .create_variant(&DeletionMask::zeros(6), &work_dir)
        .unwrap();

    let variant = std::fs::read_to_string(work_dir.join("calc.c")).unwrap();
    assert_eq!(variant, CALC_INSTRUMENTED);
}

#[test]
fn test_tree_space_fails_fast_on_a_corrupt_reference() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    write_calc_sources(dir.path());
    std::fs::write(dir.path().join("calc_original.c"), "something else\n").unwrap();

    let result = TreeFactorSpace::new(
        dir.path(),
        &calc_files(),
        FIXTURE_PREFIX,
        Box::new(FixtureToolchain::calc()),
    );
    assert!(matches!(result, Err(crate::error::Error::Correlation { .. })));
}
