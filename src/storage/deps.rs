//! Table dependency graph
//!
//! Edges point from a referenced table to the tables whose foreign keys
//! reference it, so a topological order is a safe creation order and its
//! reverse a safe drop order.

use std::collections::{HashMap, VecDeque};

use super::table::TableEntry;
use crate::{Error, Result};

/// Referenced-table → referencing-tables graph
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Tables in declaration order
    tables: Vec<String>,
    /// Referenced table → tables that reference it
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every entry's declared foreign keys.
    ///
    /// A foreign key naming a table that is not among `entries` is a schema error.
    pub fn from_entries(entries: &[&dyn TableEntry]) -> Result<Self> {
        let mut graph = Self::new();
        for entry in entries {
            graph.add_table(entry.table_name());
        }

        for entry in entries {
            for fk in entry.foreign_keys() {
                if !graph.contains(&fk.ref_table) {
                    return Err(Error::Schema(format!(
                        "{} references unknown table {}",
                        entry.table_name(),
                        fk.ref_table
                    )));
                }
                graph.add_reference(&fk.ref_table, entry.table_name());
            }
        }

        Ok(graph)
    }

    pub fn add_table(&mut self, table: &str) {
        if !self.contains(table) {
            self.tables.push(table.to_string());
            self.dependents.insert(table.to_string(), Vec::new());
        }
    }

    /// Record that `referencing` holds a foreign key into `referenced`.
    ///
    /// Self references do not constrain ordering and are not recorded.
    pub fn add_reference(&mut self, referenced: &str, referencing: &str) {
        self.add_table(referenced);
        self.add_table(referencing);
        if referenced == referencing {
            return;
        }
        if let Some(dependents) = self.dependents.get_mut(referenced) {
            dependents.push(referencing.to_string());
        }
    }

    pub fn contains(&self, table: &str) -> bool {
        self.dependents.contains_key(table)
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Tables referencing `table`
    pub fn dependents(&self, table: &str) -> &[String] {
        self.dependents.get(table).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Kahn's algorithm: every table comes after all the tables it references.
    ///
    /// Ties are broken by declaration order.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        let mut in_degree: HashMap<&str, usize> =
            self.tables.iter().map(|t| (t.as_str(), 0)).collect();
        for dependents in self.dependents.values() {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut ready: VecDeque<&str> = self
            .tables
            .iter()
            .map(String::as_str)
            .filter(|t| in_degree[t] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.tables.len());
        while let Some(table) = ready.pop_front() {
            order.push(table.to_string());

            for dependent in self.dependents(table) {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(dependent.as_str());
                    }
                }
            }
        }

        if order.len() < self.tables.len() {
            let stuck: Vec<&str> = self
                .tables
                .iter()
                .map(String::as_str)
                .filter(|t| !order.iter().any(|o| o == t))
                .collect();
            return Err(Error::CyclicDependency(stuck.join(", ")));
        }

        Ok(order)
    }

    /// Exact reverse of `creation_order`
    pub fn drop_order(&self) -> Result<Vec<String>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}
