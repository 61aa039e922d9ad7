// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::dataset::DataStats;
use prettytable::{cell, format::consts::FORMAT_NO_LINESEP, row, table, Table};

pub trait ToTable {
    fn to_table(&self) -> Table;
}

impl ToTable for DataStats {
    fn to_table(&self) -> Table {
        let mut table = table![
            ["users", self.num_users],
            ["items", self.num_items],
            ["ratings", self.num_entries]
        ];

        table.add_row(row!["sparsity", format!("{:.5}%", self.sparsity)]);
        table.set_format(*FORMAT_NO_LINESEP);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_table_has_one_row_per_field() {
        let stats = DataStats {
            num_users: 3,
            num_items: 4,
            num_entries: 6,
            sparsity: 50.0,
        };

        let table = stats.to_table();
        assert_eq!(table.len(), 4);
        assert!(table.to_string().contains("50.00000%"));
    }
}
