//! Mapping dataset columns onto exposed server variables.
//!
//! The exposed variables are a synthetic `Time` variable followed by every
//! dataset column whose name does not contain "time" (case-insensitive),
//! in original column order. Time-like source columns are dropped because
//! the timestamp is recomputed at each tick rather than replayed.
//!
//! Each data variable is resolved to its source column once, here, so the
//! per-tick path never looks values up by position after reordering.

use serde::Serialize;
use tm_common::{Value, ValueKind};

use crate::source::{Dataset, Row};

/// Name of the synthesized timestamp variable.
pub const TIME_VARIABLE: &str = "Time";

/// Whether a column is treated as a pre-existing time column.
pub fn is_time_column(name: &str) -> bool {
    name.to_lowercase().contains("time")
}

/// Where a variable's value comes from at each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "column")]
pub enum VariableSource {
    /// The wall-clock timestamp of the tick.
    Clock,
    /// A dataset column, by position.
    Column(usize),
}

/// One exposed variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundVariable {
    pub name: String,
    pub kind: ValueKind,
    pub source: VariableSource,
}

impl BoundVariable {
    /// Value the variable is created with on the server.
    pub fn initial_value(&self) -> Value {
        self.kind.default_value()
    }
}

/// The ordered variable set for one dataset. Fixed once derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableBinding {
    variables: Vec<BoundVariable>,
}

impl VariableBinding {
    /// Derive the binding for `dataset`. Pure and deterministic.
    pub fn derive(dataset: &Dataset) -> Self {
        let mut variables = Vec::with_capacity(dataset.columns().len() + 1);
        variables.push(BoundVariable {
            name: TIME_VARIABLE.to_string(),
            kind: ValueKind::Text,
            source: VariableSource::Clock,
        });
        variables.extend(
            dataset
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, column)| !is_time_column(&column.name))
                .map(|(index, column)| BoundVariable {
                    name: column.name.clone(),
                    kind: column.kind,
                    source: VariableSource::Column(index),
                }),
        );
        Self { variables }
    }

    pub fn variables(&self) -> &[BoundVariable] {
        &self.variables
    }

    /// Variable names in push order, `Time` first.
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Number of variables, i.e. values pushed per tick.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Assemble the values for one tick, in variable order.
    ///
    /// The `Time` slot is always `timestamp`; the source row's own time-like
    /// columns are never read.
    pub fn tick_row(&self, timestamp: &str, row: &Row<'_>) -> TickRow {
        let values = self
            .variables
            .iter()
            .map(|variable| match variable.source {
                VariableSource::Clock => Value::Text(timestamp.to_string()),
                VariableSource::Column(index) => {
                    row.value_at(index).cloned().unwrap_or(Value::Null)
                }
            })
            .collect();
        TickRow {
            row: row.index(),
            values,
        }
    }
}

/// The values pushed during one tick, ordered like the binding.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRow {
    pub row: usize,
    pub values: Vec<Value>,
}
