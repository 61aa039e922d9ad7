// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod items;
pub mod ratings;

use controller::ToTable;
use prettytable::{cell, format::consts::FORMAT_NO_LINESEP, row, Table};
use std::fmt;

/// Metric name to value, in the order the metrics were computed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    metrics: Vec<(&'static str, f64)>,
}

impl EvaluationResult {
    pub(crate) fn with(metrics: Vec<(&'static str, f64)>) -> Self {
        Self { metrics }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| *metric == name)
            .map(|&(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.metrics.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Counts print as integers, everything else with five decimals
fn format_value(name: &str, value: f64) -> String {
    if name.starts_with("num_") {
        format!("{}", value as u64)
    } else {
        format!("{:.5}", value)
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<_> = self
            .metrics
            .iter()
            .map(|&(name, value)| format!("{} {}", name, format_value(name, value)))
            .collect();

        write!(f, "{}", parts.join(" "))
    }
}

impl ToTable for EvaluationResult {
    fn to_table(&self) -> Table {
        let mut table = Table::new();

        for (name, value) in &self.metrics {
            table.add_row(row![name, format_value(name, *value)]);
        }

        table.set_format(*FORMAT_NO_LINESEP);
        table
    }
}
