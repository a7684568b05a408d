//! Project configuration and the resolved program space.

use crate::error::Error;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 500;

/// Raw contents of a project's `config/config.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub program: ProgramSection,
    pub scripts: ScriptSection,
    #[serde(default)]
    pub markers: MarkerSection,
    #[serde(default)]
    pub evaluation: EvaluationSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramSection {
    /// Directory holding the instrumented program, relative to the project.
    pub orig_dir: PathBuf,
    /// Target source files inside `orig_dir`, in unit-catalog order.
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSection {
    /// Directory holding the scripts, the `testsuite/` directory and the
    /// `criteria` file, relative to the project.
    pub dir: PathBuf,
    #[serde(default = "default_compile")]
    pub compile: String,
    #[serde(default = "default_execute")]
    pub execute: String,
    #[serde(default = "default_terminate")]
    pub terminate: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerSection {
    /// Source-text prefix of instrumentation marker string literals.
    #[serde(default = "default_marker_prefix")]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_compile() -> String {
    "compile".to_string()
}

fn default_execute() -> String {
    "execute".to_string()
}

fn default_terminate() -> String {
    "terminate".to_string()
}

fn default_marker_prefix() -> String {
    "\"\\nORBS".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for MarkerSection {
    fn default() -> Self {
        MarkerSection {
            prefix: default_marker_prefix(),
        }
    }
}

impl Default for EvaluationSection {
    fn default() -> Self {
        EvaluationSection {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProjectConfig {
    /// Read and parse `<project_dir>/config/config.toml`.
    pub fn load(project_dir: &Path) -> Result<ProjectConfig, Error> {
        let path = project_dir.join("config").join("config.toml");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("cannot parse {}: {e}", path.display())))
    }
}

/// Fully resolved view of one project: absolute paths, discovered test-suite
/// shape and the work-directory layout. Construction validates everything an
/// experiment run depends on, so a `ProgramSpace` is usable as-is.
#[derive(Debug)]
pub struct ProgramSpace {
    project_dir: PathBuf,
    pub orig_dir: PathBuf,
    pub files: Vec<String>,
    pub compile_script: PathBuf,
    pub execute_script: PathBuf,
    pub terminate_script: PathBuf,
    pub marker_prefix: String,
    pub timeout: Duration,
    pub num_tests: usize,
    pub num_criteria: usize,
}

impl ProgramSpace {
    pub fn new(project_dir: &Path, config: &ProjectConfig) -> Result<ProgramSpace, Error> {
        let orig_dir = project_dir.join(&config.program.orig_dir);
        if !orig_dir.is_dir() {
            return Err(Error::configuration(format!(
                "program directory {} does not exist",
                orig_dir.display()
            )));
        }
        if config.program.files.is_empty() {
            return Err(Error::configuration("no target files configured"));
        }
        for file in &config.program.files {
            let path = orig_dir.join(file);
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "target file {} does not exist",
                    path.display()
                )));
            }
        }

        let script_dir = project_dir.join(&config.scripts.dir);
        let script = |name: &str| -> Result<PathBuf, Error> {
            let path = script_dir.join(name);
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "script {} does not exist",
                    path.display()
                )));
            }
            Ok(path)
        };

        let num_tests = std::fs::read_dir(script_dir.join("testsuite"))
            .map_err(|e| {
                Error::configuration(format!(
                    "cannot read test suite in {}: {e}",
                    script_dir.display()
                ))
            })?
            .count();
        let criteria = std::fs::read_to_string(script_dir.join("criteria")).map_err(|e| {
            Error::configuration(format!(
                "cannot read criteria in {}: {e}",
                script_dir.display()
            ))
        })?;
        let num_criteria = criteria.lines().filter(|l| !l.trim().is_empty()).count();
        if num_tests == 0 || num_criteria == 0 {
            return Err(Error::configuration(
                "test suite and criteria must both be non-empty",
            ));
        }
        info!("program space: {num_tests} test(s), {num_criteria} criterion(s)");

        Ok(ProgramSpace {
            project_dir: project_dir.to_path_buf(),
            orig_dir,
            files: config.program.files.clone(),
            compile_script: script(&config.scripts.compile)?,
            execute_script: script(&config.scripts.execute)?,
            terminate_script: script(&config.scripts.terminate)?,
            marker_prefix: config.markers.prefix.clone(),
            timeout: Duration::from_secs(config.evaluation.timeout_secs),
            num_tests,
            num_criteria,
        })
    }

    /// One pass/fail bit per (test, criterion) pair.
    pub fn response_len(&self) -> usize {
        self.num_tests * self.num_criteria
    }

    /// The shared work directory, reused by every experiment.
    pub fn work_dir(&self) -> PathBuf {
        self.project_dir.join("work")
    }

    /// Per-experiment work directory, kept when variants are saved.
    pub fn variant_dir(&self, experiment: usize) -> PathBuf {
        self.project_dir.join("variants").join(experiment.to_string())
    }

    pub fn plan_path(&self) -> PathBuf {
        self.project_dir.join("doe_plan.csv")
    }

    pub fn matrix_path(&self) -> PathBuf {
        self.project_dir.join("doe_matrix.csv")
    }
}

#[cfg(test)]
mod tests;
