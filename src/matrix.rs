//! Experiment results and CSV persistence of plans and matrices.

use crate::doe::{DeletionMask, ExperimentQueue};
use crate::error::Error;
use log::info;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Observed behavior of one program variant: a compile bit plus one
/// pass/fail bit per (test, criterion) pair, tests-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub compile_ok: bool,
    pub outcomes: Vec<bool>,
}

impl Response {
    pub fn new(compile_ok: bool, outcomes: Vec<bool>) -> Self {
        Response {
            compile_ok,
            outcomes,
        }
    }

    /// The all-failing response: did not compile, every outcome failed.
    /// Recorded for variants whose evaluation broke down.
    pub fn failing(len: usize) -> Self {
        Response {
            compile_ok: false,
            outcomes: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Accumulated (mask, response) records in insertion order. Re-recording a
/// key overwrites the earlier response in place; the row order is the order
/// in which keys were first recorded.
#[derive(Debug, Default)]
pub struct ExperimentMatrix {
    rows: Vec<(DeletionMask, Response)>,
    index: HashMap<String, usize>,
}

impl ExperimentMatrix {
    pub fn new() -> Self {
        ExperimentMatrix::default()
    }

    pub fn record(&mut self, mask: DeletionMask, response: Response) {
        match self.index.get(&mask.key()) {
            Some(row) => self.rows[*row] = (mask, response),
            None => {
                self.index.insert(mask.key(), self.rows.len());
                self.rows.push((mask, response));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn response_of(&self, mask: &DeletionMask) -> Option<&Response> {
        self.index.get(&mask.key()).map(|row| &self.rows[*row].1)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&DeletionMask, &Response)> {
        self.rows.iter().map(|(m, r)| (m, r))
    }

    /// Write the matrix as CSV. Header names every factor column, the
    /// compile column and one `c{t}-{c}` column per (test, criterion) pair,
    /// both 1-based.
    pub fn save(&self, path: &Path, num_tests: usize, num_criteria: usize) -> Result<(), Error> {
        let size = self.rows.first().map(|(m, _)| m.len()).unwrap_or(0);
        let mut out = std::fs::File::create(path)?;

        let mut header: Vec<String> = (0..size).map(|i| format!("f{i}")).collect();
        header.push("comp".to_string());
        for t in 1..=num_tests {
            for c in 1..=num_criteria {
                header.push(format!("c{t}-{c}"));
            }
        }
        writeln!(out, "{}", header.join(","))?;

        for (mask, response) in &self.rows {
            let mut row: Vec<String> = mask.bits().iter().map(|b| bit(*b)).collect();
            row.push(bit(response.compile_ok));
            row.extend(response.outcomes.iter().map(|b| bit(*b)));
            writeln!(out, "{}", row.join(","))?;
        }
        info!("saved matrix with {} row(s) to {}", self.rows.len(), path.display());
        Ok(())
    }
}

fn bit(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

/// Persist the remaining queue as a plan CSV: header `cnt,f0,...,f{N-1}`,
/// one row per queued mask with its repeat counter.
pub fn save_plan(queue: &ExperimentQueue, path: &Path, size: usize) -> Result<(), Error> {
    let mut out = std::fs::File::create(path)?;

    let mut header = vec!["cnt".to_string()];
    header.extend((0..size).map(|i| format!("f{i}")));
    writeln!(out, "{}", header.join(","))?;

    for (mask, count) in queue.remaining() {
        let mut row = vec![count.to_string()];
        row.extend(mask.bits().iter().map(|b| bit(*b)));
        writeln!(out, "{}", row.join(","))?;
    }
    info!("saved plan with {} row(s) to {}", queue.len(), path.display());
    Ok(())
}

/// Load a plan CSV back into a queue. Plans store post-revision masks, so
/// the masks are restored verbatim. `range` selects a 0-based half-open row
/// sub-range for sharded runs; `None` loads everything.
pub fn load_plan(
    path: &Path,
    range: Option<(usize, usize)>,
    size: usize,
) -> Result<ExperimentQueue, Error> {
    let format_err = |detail: String| Error::PlanFormat {
        path: path.to_path_buf(),
        detail,
    };

    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| format_err("empty plan file".to_string()))?;
    let columns = header.split(',').count();
    if columns != size + 1 {
        return Err(format_err(format!(
            "header has {columns} column(s), expected {}",
            size + 1
        )));
    }

    let mut queue = ExperimentQueue::new();
    for (row, line) in lines.enumerate() {
        if let Some((start, end)) = range {
            if row < start || row >= end {
                continue;
            }
        }
        let (count, bits) = line
            .split_once(',')
            .ok_or_else(|| format_err(format!("row {row}: missing count column")))?;
        let count: u64 = count
            .parse()
            .map_err(|_| format_err(format!("row {row}: bad count '{count}'")))?;
        let key: String = bits.split(',').collect();
        let mask = DeletionMask::from_key(&key)
            .filter(|m| m.len() == size)
            .ok_or_else(|| format_err(format!("row {row}: bad mask '{bits}'")))?;
        queue.restore(mask, count);
    }
    info!("loaded plan with {} row(s) from {}", queue.len(), path.display());
    Ok(queue)
}
