use tabled::{builder::Builder, settings::Style};

use crate::import::ImportReport;
use crate::storage::{DependencyGraph, StoreStats};

/// Rounded table with a header row
pub struct TableBuilder {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows.push(cells.into_iter().map(|c| c.to_string()).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut builder = Builder::default();
        builder.push_record(self.header.clone());
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        builder.build().with(Style::rounded()).to_string()
    }
}

/// Row counts per table, plus a total
pub fn stats_table(stats: &StoreStats) -> String {
    let mut builder = TableBuilder::new(&["Table", "Rows"]);
    for (table, rows) in &stats.tables {
        builder.add_row([table.clone(), rows.to_string()]);
    }
    builder.add_row(["total".to_string(), stats.total().to_string()]);
    builder.build()
}

/// Creation order with the tables referencing each one
pub fn order_table(graph: &DependencyGraph, order: &[String]) -> String {
    let mut builder = TableBuilder::new(&["#", "Table", "Referenced by"]);
    for (i, table) in order.iter().enumerate() {
        let dependents = graph.dependents(table).join(", ");
        builder.add_row([(i + 1).to_string(), table.clone(), dependents]);
    }
    builder.build()
}

pub fn import_table(report: &ImportReport) -> String {
    let mut builder = TableBuilder::new(&["Family", "Inserted", "Updated"]);
    for (family, summary) in &report.families {
        builder.add_row([
            family.to_string(),
            summary.inserted.to_string(),
            summary.updated.to_string(),
        ]);
    }
    builder.build()
}
