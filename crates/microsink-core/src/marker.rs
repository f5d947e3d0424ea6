//! Write-path marker node and its elimination.
//!
//! The planner wraps the analyzed plan of a query that feeds a sink in a
//! [`WriteMarker`] extension node. The marker only exists for planning; it
//! must be stripped before the plan's output is shown to user code.

use std::fmt;
use std::sync::Arc;

use datafusion::common::DFSchemaRef;
use datafusion::error::{DataFusionError, Result as DFResult};
use datafusion::logical_expr::{Expr, Extension, LogicalPlan, UserDefinedLogicalNodeCore};

// ---------------------------------------------------------------------------
// WriteMarker
// ---------------------------------------------------------------------------

/// Sentinel extension node marking "this plan feeds a write path".
///
/// Has exactly one input and exposes that input's schema unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Hash)]
pub struct WriteMarker {
    input: LogicalPlan,
}

impl WriteMarker {
    pub fn new(input: LogicalPlan) -> Self {
        Self { input }
    }

    /// Wrap `input` in a marker and return it as a `LogicalPlan::Extension`.
    pub fn wrap(input: LogicalPlan) -> LogicalPlan {
        LogicalPlan::Extension(Extension {
            node: Arc::new(Self::new(input)),
        })
    }

    /// The wrapped plan.
    pub fn input(&self) -> &LogicalPlan {
        &self.input
    }
}

impl UserDefinedLogicalNodeCore for WriteMarker {
    fn name(&self) -> &str {
        "WriteMarker"
    }

    fn inputs(&self) -> Vec<&LogicalPlan> {
        vec![&self.input]
    }

    fn schema(&self) -> &DFSchemaRef {
        self.input.schema()
    }

    fn expressions(&self) -> Vec<Expr> {
        vec![]
    }

    fn fmt_for_explain(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WriteMarker")
    }

    fn with_exprs_and_inputs(&self, exprs: Vec<Expr>, mut inputs: Vec<LogicalPlan>) -> DFResult<Self> {
        if !exprs.is_empty() || inputs.len() != 1 {
            return Err(DataFusionError::Internal(format!(
                "WriteMarker expects no expressions and exactly one input, got {} and {}",
                exprs.len(),
                inputs.len()
            )));
        }
        Ok(Self::new(inputs.swap_remove(0)))
    }
}

/// Returns the marker if `plan` is rooted at a [`WriteMarker`].
fn as_write_marker(plan: &LogicalPlan) -> Option<&WriteMarker> {
    match plan {
        LogicalPlan::Extension(ext) => ext.node.as_any().downcast_ref::<WriteMarker>(),
        _ => None,
    }
}

/// True if `plan` is rooted at a [`WriteMarker`].
pub fn is_write_marker(plan: &LogicalPlan) -> bool {
    as_write_marker(plan).is_some()
}

// ---------------------------------------------------------------------------
// MarkerEliminator
// ---------------------------------------------------------------------------

/// Strips a single top-level [`WriteMarker`].
///
/// Only the root is inspected. A marker nested below another node is left
/// alone: upstream only ever places it at the top, and a recursive rewrite
/// would touch plans it has no business touching.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerEliminator;

impl MarkerEliminator {
    /// Returns the marker's child if `plan` is a marker, `plan` otherwise.
    pub fn eliminate(plan: &LogicalPlan) -> &LogicalPlan {
        match as_write_marker(plan) {
            Some(marker) => marker.input(),
            None => plan,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
