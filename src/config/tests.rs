//! Tests for project configuration loading and program-space resolution.

use crate::config::{DEFAULT_TIMEOUT_SECS, ProgramSpace, ProjectConfig};
use crate::error::Error;
use crate::test_utils::{init_logger, scaffold_project};
use std::time::Duration;

#[test]
fn test_load_reads_config_and_applies_defaults() {
    init_logger();
    let project = scaffold_project("A\nB\n");
    let config = ProjectConfig::load(project.path()).unwrap();

    assert_eq!(config.program.files, vec!["code.txt"]);
    assert_eq!(config.scripts.compile, "compile");
    assert_eq!(config.markers.prefix, "\"\\nORBS");
    assert_eq!(config.evaluation.timeout_secs, DEFAULT_TIMEOUT_SECS);
}

#[test]
fn test_load_accepts_explicit_sections() {
    init_logger();
    let project = scaffold_project("A\n");
    std::fs::write(
        project.path().join("config").join("config.toml"),
        "[program]\norig_dir = \"program\"\nfiles = [\"code.txt\"]\n\n\
         [scripts]\ndir = \"scripts\"\ncompile = \"compile\"\n\n\
         [markers]\nprefix = \"\\\"\\\\nTRACE\"\n\n\
         [evaluation]\ntimeout_secs = 42\n",
    )
    .unwrap();

    let config = ProjectConfig::load(project.path()).unwrap();
    assert_eq!(config.markers.prefix, "\"\\nTRACE");
    assert_eq!(config.evaluation.timeout_secs, 42);
}

#[test]
fn test_load_fails_without_a_config_file() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ProjectConfig::load(dir.path()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_load_rejects_unknown_keys() {
    init_logger();
    let project = scaffold_project("A\n");
    std::fs::write(
        project.path().join("config").join("config.toml"),
        "[program]\norig_dir = \"program\"\nfiles = [\"code.txt\"]\ntypo = 1\n\n[scripts]\ndir = \"scripts\"\n",
    )
    .unwrap();
    assert!(matches!(
        ProjectConfig::load(project.path()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_program_space_discovers_the_test_suite_shape() {
    init_logger();
    let project = scaffold_project("A\nB\n");
    let config = ProjectConfig::load(project.path()).unwrap();
    let space = ProgramSpace::new(project.path(), &config).unwrap();

    assert_eq!(space.num_tests, 2);
    assert_eq!(space.num_criteria, 1);
    assert_eq!(space.response_len(), 2);
    assert_eq!(space.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert!(space.compile_script.is_file());
}

#[test]
fn test_program_space_rejects_a_missing_target_file() {
    init_logger();
    let project = scaffold_project("A\n");
    std::fs::remove_file(project.path().join("program").join("code.txt")).unwrap();

    let config = ProjectConfig::load(project.path()).unwrap();
    assert!(matches!(
        ProgramSpace::new(project.path(), &config),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_program_space_rejects_a_missing_script() {
    init_logger();
    let project = scaffold_project("A\n");
    std::fs::remove_file(project.path().join("scripts").join("execute")).unwrap();

    let config = ProjectConfig::load(project.path()).unwrap();
    assert!(matches!(
        ProgramSpace::new(project.path(), &config),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_program_space_rejects_an_empty_test_suite() {
    init_logger();
    let project = scaffold_project("A\n");
    for entry in ["t1", "t2"] {
        std::fs::remove_file(project.path().join("scripts").join("testsuite").join(entry))
            .unwrap();
    }

    let config = ProjectConfig::load(project.path()).unwrap();
    assert!(matches!(
        ProgramSpace::new(project.path(), &config),
        Err(Error::Configuration(_))
    ));
}
