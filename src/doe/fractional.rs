//! Incremental saturated two-level fractional factorial design.
//!
//! The design is built column by column (one column per unit). Column 0 is
//! the two-row design `{true, false}`. Each further column is either derived
//! from the existing columns, which aliases higher-order interactions
//! instead of growing the design, or, when no usable derived column exists,
//! the row count doubles: all rows are duplicated with every column negated
//! in the duplicate half, and the new column separates the halves.
//!
//! A derived column is the first candidate in a deterministic scan that is
//! *balanced* (equal true/false counts) and distinct from every existing
//! column: negations of existing columns in column order (negation is the
//! XOR with the implicit all-true identity column), then XORs of column
//! pairs in lexicographic order.
//!
//! Consequences: a power-of-two unit count S yields exactly S rows, and
//! every column is balanced across the rows.

use crate::doe::{DeletionMask, DoeStrategy, ExperimentQueue};
use crate::error::Error;
use crate::factor::FactorSpace;
use log::debug;

/// Saturated two-level design; each row of the design becomes one mask.
#[derive(Debug, Default, Clone, Copy)]
pub struct FractionalFactorial;

impl DoeStrategy for FractionalFactorial {
    fn populate(
        &mut self,
        space: &dyn FactorSpace,
        queue: &mut ExperimentQueue,
    ) -> Result<(), Error> {
        let size = space.size();
        queue.add(DeletionMask::zeros(size), space);
        if size == 0 {
            return Ok(());
        }

        let design = build_design(size);
        let rows = design[0].len();
        debug!("fractional factorial design: {size} columns x {rows} rows");
        for row in 0..rows {
            let bits = design.iter().map(|column| column[row]).collect();
            queue.add(DeletionMask::from_bits(bits), space);
        }
        Ok(())
    }
}

/// Build `size` balanced columns; column-major result.
fn build_design(size: usize) -> Vec<Vec<bool>> {
    let mut columns: Vec<Vec<bool>> = vec![vec![true, false]];
    while columns.len() < size {
        match derive_column(&columns) {
            Some(column) => columns.push(column),
            None => double_design(&mut columns),
        }
    }
    columns
}

/// First balanced, distinct column derivable from the existing ones.
fn derive_column(columns: &[Vec<bool>]) -> Option<Vec<bool>> {
    for existing in columns {
        let negated: Vec<bool> = existing.iter().map(|b| !b).collect();
        if is_new_column(columns, &negated) {
            return Some(negated);
        }
    }
    for i in 0..columns.len() {
        for j in i + 1..columns.len() {
            let xored: Vec<bool> = columns[i]
                .iter()
                .zip(&columns[j])
                .map(|(a, b)| a != b)
                .collect();
            if is_balanced(&xored) && is_new_column(columns, &xored) {
                return Some(xored);
            }
        }
    }
    None
}

/// Duplicate all rows, negate every column in the duplicate half, and append
/// the column separating the halves.
fn double_design(columns: &mut Vec<Vec<bool>>) {
    let rows = columns[0].len();
    for column in columns.iter_mut() {
        let negated: Vec<bool> = column.iter().map(|b| !b).collect();
        column.extend(negated);
    }
    let mut separator = vec![true; rows];
    separator.extend(vec![false; rows]);
    columns.push(separator);
}

fn is_balanced(column: &[bool]) -> bool {
    column.iter().filter(|b| **b).count() * 2 == column.len()
}

fn is_new_column(columns: &[Vec<bool>], candidate: &[bool]) -> bool {
    columns.iter().all(|existing| existing != candidate)
}
