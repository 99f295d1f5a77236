//! Load reports.

use std::time::Duration;

use serde::Serialize;

/// Outcome of loading one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub entity: String,
    pub table: String,
    pub level: usize,
    /// Instances materialized for this unit.
    pub instances: usize,
    /// Rows the destination reported as written.
    pub rows: u64,
    /// Bulk-transfer calls made for this unit.
    pub chunks: usize,
}

/// Summary of a completed `bulk_insert`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Units in the order they were loaded.
    pub units: Vec<UnitReport>,
    /// Wall time from the first transfer to commit.
    pub elapsed: Duration,
    /// Whether this call committed its own unit of work.
    pub committed: bool,
}

impl LoadReport {
    /// Total rows written across all units.
    pub fn total_rows(&self) -> u64 {
        self.units.iter().map(|u| u.rows).sum()
    }

    /// Number of traversal levels that produced units.
    pub fn levels(&self) -> usize {
        self.units.iter().map(|u| u.level + 1).max().unwrap_or(0)
    }

    /// Rows written into `table`, across every unit that targeted it.
    pub fn rows_for_table(&self, table: &str) -> u64 {
        self.units
            .iter()
            .filter(|u| u.table == table)
            .map(|u| u.rows)
            .sum()
    }

    /// Plain-text summary: one header line plus one line per unit.
    pub fn render_plain(&self) -> String {
        let mut lines = vec![format!(
            "bulk insert: {} rows in {} units across {} levels, {}ms{}",
            self.total_rows(),
            self.units.len(),
            self.levels(),
            self.elapsed.as_millis(),
            if self.committed { ", committed" } else { "" }
        )];

        for unit in &self.units {
            lines.push(format!(
                "  [{}] {} -> {}: {} rows, {} chunk{}",
                unit.level,
                unit.entity,
                unit.table,
                unit.rows,
                unit.chunks,
                if unit.chunks == 1 { "" } else { "s" }
            ));
        }

        lines.join("\n")
    }

    /// JSON rendering for structured logs.
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct ReportJson<'a> {
            total_rows: u64,
            levels: usize,
            elapsed_ms: u128,
            committed: bool,
            units: &'a [UnitReport],
        }

        let json = ReportJson {
            total_rows: self.total_rows(),
            levels: self.levels(),
            elapsed_ms: self.elapsed.as_millis(),
            committed: self.committed,
            units: &self.units,
        };

        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> LoadReport {
        LoadReport {
            units: vec![
                UnitReport {
                    entity: "Parent".to_string(),
                    table: "parents".to_string(),
                    level: 0,
                    instances: 3,
                    rows: 3,
                    chunks: 1,
                },
                UnitReport {
                    entity: "Child".to_string(),
                    table: "children".to_string(),
                    level: 1,
                    instances: 6,
                    rows: 6,
                    chunks: 2,
                },
            ],
            elapsed: Duration::from_millis(42),
            committed: true,
        }
    }

    #[test]
    fn test_totals() {
        let r = report();
        assert_eq!(r.total_rows(), 9);
        assert_eq!(r.levels(), 2);
        assert_eq!(r.rows_for_table("children"), 6);
        assert_eq!(LoadReport::default().levels(), 0);
    }

    #[test]
    fn test_render_plain() {
        let text = report().render_plain();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "bulk insert: 9 rows in 2 units across 2 levels, 42ms, committed"
        );
        assert_eq!(lines[1], "  [0] Parent -> parents: 3 rows, 1 chunk");
        assert_eq!(lines[2], "  [1] Child -> children: 6 rows, 2 chunks");
    }

    #[test]
    fn test_to_json() {
        let value: serde_json::Value = serde_json::from_str(&report().to_json()).unwrap();
        assert_eq!(value["total_rows"], 9);
        assert_eq!(value["committed"], true);
        assert_eq!(value["units"][1]["table"], "children");
        assert_eq!(value["units"][1]["chunks"], 2);
    }
}
