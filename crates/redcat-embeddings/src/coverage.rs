//! Source-versus-catalog id coverage check.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::catalog::{Catalog, CategoryId, CategoryRow};

/// Ids present on one side only.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Unique usable source ids.
    pub source_ids: usize,
    /// Catalog records.
    pub catalog_ids: usize,
    /// Source ids with no catalog record, in source order.
    pub missing: Vec<CategoryId>,
    /// Catalog ids absent from the source, in catalog order.
    pub extra: Vec<CategoryId>,
}

impl CoverageReport {
    /// Both sides hold the same ids.
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source ids:  {}", self.source_ids)?;
        writeln!(f, "catalog ids: {}", self.catalog_ids)?;
        writeln!(f, "missing:     {}", self.missing.len())?;
        write!(f, "extra:       {}", self.extra.len())
    }
}

/// Compare source rows with a built catalog.
///
/// Rows lacking an id or a non-blank label are ignored, matching what the batch
/// pipeline embeds.
pub fn coverage(rows: &[CategoryRow], catalog: &Catalog) -> CoverageReport {
    let mut seen = HashSet::new();
    let source: Vec<&CategoryId> = rows
        .iter()
        .filter(|r| r.is_usable())
        .filter_map(|r| r.category_id.as_ref())
        .filter(|id| seen.insert(*id))
        .collect();

    let missing = source
        .iter()
        .filter(|id| !catalog.contains(id))
        .map(|id| (*id).clone())
        .collect();
    let extra = catalog
        .records()
        .iter()
        .map(|r| &r.category_id)
        .filter(|id| !seen.contains(id))
        .cloned()
        .collect();

    CoverageReport {
        source_ids: source.len(),
        catalog_ids: catalog.len(),
        missing,
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryRecord;

    fn record(id: i64) -> CategoryRecord {
        CategoryRecord {
            category_id: id.into(),
            category_name: String::new(),
            category_level: 0,
            category_label: String::new(),
            embedding: vec![1.0],
        }
    }

    #[test]
    fn consistent_when_ids_match() {
        let rows = vec![
            CategoryRow::new(1, "a", 0, "x"),
            CategoryRow::new(2, "b", 0, "y"),
            CategoryRow::new(1, "c", 0, "z"),
        ];
        let catalog = Catalog::from_records(vec![record(2), record(1)]).unwrap();
        let report = coverage(&rows, &catalog);
        assert!(report.is_consistent());
        assert_eq!(report.source_ids, 2);
        assert_eq!(report.catalog_ids, 2);
    }

    #[test]
    fn reports_missing_and_extra() {
        let rows = vec![
            CategoryRow::new(1, "a", 0, "x"),
            CategoryRow::new(3, "c", 0, "z"),
            CategoryRow {
                category_label: None,
                ..CategoryRow::new(4, "d", 0, "w")
            },
            CategoryRow::new(5, "e", 0, "  "),
        ];
        let catalog = Catalog::from_records(vec![record(1), record(2)]).unwrap();
        let report = coverage(&rows, &catalog);
        assert!(!report.is_consistent());
        assert_eq!(report.missing, vec![CategoryId::Int(3)]);
        assert_eq!(report.extra, vec![CategoryId::Int(2)]);
        assert!(report.to_string().contains("missing:     1"));
    }
}
