//! FaLaw Kernel: Matrix Invariants
//!
//! Hard-fail validation of the transfer matrix. `validate_matrix` panics;
//! `try_validate_matrix` reports the first failure as a message and is
//! used at construction, where a broken table is a returned error.

use crate::arithmetic::EPSILON;
use crate::element::Element;
use crate::matrix::{Cells, Row, MIN_SELF_RETENTION};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check every row. Panics on the first failure.
pub fn validate_matrix(cells: &Cells) {
    if let Err(msg) = try_validate_matrix(cells) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Non-panicking variant of `validate_matrix`.
pub fn try_validate_matrix(cells: &Cells) -> Result<(), String> {
    for element in Element::ALL {
        try_check_row(element, &cells[element.index()])?;
    }
    Ok(())
}

/// All checks for a single row, in order: finite and non-negative cells,
/// diagonal floor, row sum.
pub fn try_check_row(element: Element, row: &Row) -> Result<(), String> {
    try_check_cells(element, row)?;
    try_check_diagonal(element, row)?;
    try_check_row_sum(element, row)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

fn try_check_cells(element: Element, row: &Row) -> Result<(), String> {
    for (j, v) in row.iter().enumerate() {
        if !v.is_finite() || *v < 0.0 {
            return Err(format!(
                "[INVARIANT:non_negative] cell {} -> {} is {}",
                element,
                Element::ALL[j],
                v
            ));
        }
    }
    Ok(())
}

fn try_check_diagonal(element: Element, row: &Row) -> Result<(), String> {
    let diag = row[element.index()];
    if diag < MIN_SELF_RETENTION - EPSILON {
        return Err(format!(
            "[INVARIANT:self_retention] {} retains {} < {}",
            element, diag, MIN_SELF_RETENTION
        ));
    }
    Ok(())
}

fn try_check_row_sum(element: Element, row: &Row) -> Result<(), String> {
    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > EPSILON {
        return Err(format!(
            "[INVARIANT:row_sum] row {} sums to {}",
            element, sum
        ));
    }
    Ok(())
}
