//! Variant evaluation through external compile/execute/terminate scripts.

use crate::matrix::Response;
use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// A single experiment could not produce a verdict: the execute subprocess
/// failed, timed out, or printed a malformed verdict line. The driver
/// records such variants as all-failing and moves on.
#[derive(Clone, Debug, thiserror::Error)]
#[error("evaluation failed: {0}")]
pub struct EvaluationFailure(pub String);

/// Produces a [`Response`] for a materialized program variant.
pub trait Evaluator {
    /// Length of the outcome vector every evaluation yields.
    fn response_len(&self) -> usize;

    fn evaluate(&self, work_dir: &Path) -> Result<Response, EvaluationFailure>;
}

/// Shell-script evaluator: compile, execute and terminate scripts are
/// sourced with the variant's work directory as their single argument.
///
/// Compile failure is a legitimate observation (`compile_ok = false`, all
/// outcomes failing), not an error. The verdict is the last line of the
/// execute script's stdout: one digit per (test, criterion) pair, `'0'`
/// meaning pass. Anything else (subprocess spawn failure, timeout, a digit
/// other than `'0'`/`'1'`, a short or missing verdict) is an
/// [`EvaluationFailure`].
pub struct ScriptEvaluator {
    compile_script: PathBuf,
    execute_script: PathBuf,
    terminate_script: PathBuf,
    response_len: usize,
    timeout: Duration,
    keep_artifacts: bool,
}

impl ScriptEvaluator {
    pub fn new(
        compile_script: PathBuf,
        execute_script: PathBuf,
        terminate_script: PathBuf,
        response_len: usize,
        timeout: Duration,
    ) -> Self {
        ScriptEvaluator {
            compile_script,
            execute_script,
            terminate_script,
            response_len,
            timeout,
            keep_artifacts: false,
        }
    }

    /// Skip the terminate script after each evaluation, leaving compiled
    /// artifacts in place for inspection.
    pub fn keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    fn run_terminate(&self, work_dir: &Path) {
        if self.keep_artifacts {
            return;
        }
        if let Err(e) = run_script(&self.terminate_script, work_dir, self.timeout) {
            warn!("terminate script failed: {e}");
        }
    }
}

impl Evaluator for ScriptEvaluator {
    fn response_len(&self) -> usize {
        self.response_len
    }

    fn evaluate(&self, work_dir: &Path) -> Result<Response, EvaluationFailure> {
        let compiled = run_script(&self.compile_script, work_dir, self.timeout)
            .map_err(|e| EvaluationFailure(format!("compile script: {e}")))?;
        if compiled.status != 0 {
            debug!("variant in {} did not compile", work_dir.display());
            self.run_terminate(work_dir);
            return Ok(Response::failing(self.response_len));
        }

        let executed = run_script(&self.execute_script, work_dir, self.timeout);
        self.run_terminate(work_dir);
        let executed = executed.map_err(|e| EvaluationFailure(format!("execute script: {e}")))?;

        let verdict = executed
            .stdout
            .lines()
            .next_back()
            .unwrap_or("")
            .trim()
            .to_string();
        if verdict.len() != self.response_len {
            return Err(EvaluationFailure(format!(
                "verdict '{verdict}' has {} digit(s), expected {}",
                verdict.len(),
                self.response_len
            )));
        }
        let outcomes = verdict
            .chars()
            .map(|c| match c {
                '0' => Ok(true),
                '1' => Ok(false),
                other => Err(EvaluationFailure(format!(
                    "verdict '{verdict}' contains unexpected digit '{other}'"
                ))),
            })
            .collect::<Result<Vec<bool>, _>>()?;

        Ok(Response::new(true, outcomes))
    }
}

struct ScriptOutput {
    status: i32,
    stdout: String,
}

/// Run `bash -c "source <script> <work_dir>"` with a hard deadline. The
/// child is killed on timeout; stdout and stderr are drained on reader
/// threads so a chatty script cannot deadlock on a full pipe.
fn run_script(script: &Path, work_dir: &Path, timeout: Duration) -> std::io::Result<ScriptOutput> {
    let command = format!("source {} {}", script.display(), work_dir.display());
    debug!("running: {command}");

    let mut child = Command::new("bash")
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_deadline(&mut child, timeout)?;

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    if !stderr.is_empty() {
        debug!("script stderr: {}", stderr.trim_end());
    }

    Ok(ScriptOutput { status, stdout })
}

fn drain<R: Read + Send + 'static>(
    stream: Option<R>,
) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_string(&mut buffer);
        }
        buffer
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<i32> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.code().unwrap_or(-1));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("script exceeded {} s", timeout.as_secs()),
            ));
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
