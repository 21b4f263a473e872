//! Category catalog: source rows, the batch embedding pipeline, and JSON I/O.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use redcat_settings::{CatalogSettings, DedupPolicy, LABEL_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{EmbeddingError, Result};
use crate::service::TextEmbedder;

/// Opaque category identifier: an integer or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryId {
    /// Numeric id.
    Int(i64),
    /// String id.
    Text(String),
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for CategoryId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

/// One row of the tabular source. Every column may be null.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRow {
    /// Category id.
    pub category_id: Option<CategoryId>,
    /// Display name.
    pub category_name: Option<String>,
    /// Depth in the category tree.
    pub category_level: Option<i64>,
    /// Text that gets embedded.
    pub category_label: Option<String>,
}

impl CategoryRow {
    /// Build a complete row.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        level: i64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            category_id: Some(id.into()),
            category_name: Some(name.into()),
            category_level: Some(level),
            category_label: Some(label.into()),
        }
    }

    /// Has an id and a label with non-whitespace content.
    pub fn is_usable(&self) -> bool {
        self.category_id.is_some()
            && self
                .category_label
                .as_deref()
                .is_some_and(|label| !label.trim().is_empty())
    }
}

/// A category with its embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Unique within a catalog.
    pub category_id: CategoryId,
    /// Display name (empty when the source had none).
    pub category_name: String,
    /// Depth in the category tree (0 when the source had none).
    pub category_level: i64,
    /// Label the embedding was computed from.
    pub category_label: String,
    /// Finite vector of the catalog's dimension.
    pub embedding: Vec<f32>,
}

/// Ordered records sharing one dimension and unique ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    records: Vec<CategoryRecord>,
    ids: HashSet<CategoryId>,
    dim: Option<usize>,
}

impl Catalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records, checking dimension and id uniqueness.
    pub fn from_records(records: Vec<CategoryRecord>) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.records.reserve(records.len());
        for record in records {
            catalog.push(record)?;
        }
        Ok(catalog)
    }

    /// Append a record. The first record fixes the catalog dimension.
    pub fn push(&mut self, record: CategoryRecord) -> Result<()> {
        let actual = record.embedding.len();
        match self.dim {
            Some(expected) if expected != actual => {
                return Err(EmbeddingError::DimensionMismatch { expected, actual });
            }
            _ => {}
        }
        if self.ids.contains(&record.category_id) {
            return Err(EmbeddingError::DuplicateId(record.category_id.to_string()));
        }
        self.dim = Some(actual);
        let _ = self.ids.insert(record.category_id.clone());
        self.records.push(record);
        Ok(())
    }

    /// Shared dimension, `None` while empty.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [CategoryRecord] {
        &mut self.records
    }

    /// Whether a record with `id` exists.
    pub fn contains(&self, id: &CategoryId) -> bool {
        self.ids.contains(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the records as a pretty-printed JSON array.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, json)?;
        info!(path = %path.display(), records = self.len(), dim = ?self.dim, "catalog saved");
        Ok(())
    }

    /// Read a catalog written by [`Catalog::save_json`].
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let records: Vec<CategoryRecord> = serde_json::from_str(&content)?;
        let catalog = Self::from_records(records)?;
        info!(path = %path.display(), records = catalog.len(), dim = ?catalog.dim, "catalog loaded");
        Ok(catalog)
    }
}

/// Read source rows from a JSON array or a JSON Lines file.
pub fn read_rows(path: &Path) -> Result<Vec<CategoryRow>> {
    let content = fs::read_to_string(path)?;
    let rows: Vec<CategoryRow> = if content.trim_start().starts_with('[') {
        serde_json::from_str(&content)?
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };
    debug!(path = %path.display(), rows = rows.len(), "read source rows");
    Ok(rows)
}

/// Remove rows whose id repeats an earlier (or later) one.
///
/// `KeepLast` keeps the final occurrence at its own position; `KeepFirst`
/// keeps the first. Rows without an id are left untouched.
pub fn dedup_rows(rows: Vec<CategoryRow>, policy: DedupPolicy) -> Vec<CategoryRow> {
    match policy {
        DedupPolicy::KeepFirst => {
            let mut seen = HashSet::new();
            rows.into_iter()
                .filter(|row| row.category_id.as_ref().is_none_or(|id| seen.insert(id.clone())))
                .collect()
        }
        DedupPolicy::KeepLast => {
            let mut last: HashMap<CategoryId, usize> = HashMap::new();
            for (i, row) in rows.iter().enumerate() {
                if let Some(id) = &row.category_id {
                    let _ = last.insert(id.clone(), i);
                }
            }
            rows.into_iter()
                .enumerate()
                .filter(|(i, row)| row.category_id.as_ref().is_none_or(|id| last.get(id) == Some(i)))
                .map(|(_, row)| row)
                .collect()
        }
    }
}

/// Batch pipeline turning source rows into a [`Catalog`].
#[derive(Clone, Debug)]
pub struct CatalogBuilder {
    template: String,
    dedup: DedupPolicy,
    progress_every: usize,
}

impl CatalogBuilder {
    /// Create a builder; `template` must contain `{label}`.
    pub fn new(template: impl Into<String>, dedup: DedupPolicy) -> Result<Self> {
        let template = template.into();
        if !template.contains(LABEL_PLACEHOLDER) {
            return Err(EmbeddingError::Config(format!(
                "template {template:?} has no {LABEL_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self {
            template,
            dedup,
            progress_every: 1000,
        })
    }

    /// Create a builder from settings.
    pub fn from_settings(settings: &CatalogSettings) -> Result<Self> {
        Ok(Self::new(settings.template.clone(), settings.dedup)?
            .with_progress_every(settings.progress_every))
    }

    /// Log progress every `n` rows (0 logs only at completion).
    #[must_use]
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Text embedded for `label`.
    pub fn render(&self, label: &str) -> String {
        self.template.replace(LABEL_PLACEHOLDER, label)
    }

    /// Filter, deduplicate, and embed `rows`, preserving their order.
    ///
    /// Rows without an id or with a missing or blank label are dropped. The
    /// first embedding failure aborts the build.
    pub fn build(&self, embedder: &TextEmbedder, rows: Vec<CategoryRow>) -> Result<Catalog> {
        let input = rows.len();
        let complete: Vec<CategoryRow> = rows
            .into_iter()
            .filter(CategoryRow::is_usable)
            .collect();
        let filtered = input - complete.len();
        let unique = dedup_rows(complete, self.dedup);
        let total = unique.len();
        info!(
            input,
            filtered,
            duplicates = input - filtered - total,
            total,
            dedup = ?self.dedup,
            "building catalog"
        );

        let mut catalog = Catalog::new();
        for (i, row) in unique.into_iter().enumerate() {
            let CategoryRow {
                category_id: Some(category_id),
                category_name,
                category_level,
                category_label: Some(category_label),
            } = row
            else {
                continue;
            };

            let embedding = embedder.embed(&self.render(&category_label))?;
            catalog.push(CategoryRecord {
                category_id,
                category_name: category_name.unwrap_or_default(),
                category_level: category_level.unwrap_or_default(),
                category_label,
                embedding,
            })?;

            let processed = i + 1;
            if self.progress_every > 0 && processed % self.progress_every == 0 && processed < total {
                info!(processed, total, "embedding progress");
            }
        }
        info!(processed = catalog.len(), total, dim = ?catalog.dim(), "catalog built");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRuntime, MockTokenizer};
    use std::sync::Arc;

    const TEMPLATE: &str = "passage: place category: {label}";

    fn embedder(dim: usize) -> (TextEmbedder, Arc<MockRuntime>) {
        let runtime = Arc::new(MockRuntime::token_sequence(dim));
        let e = TextEmbedder::new(Arc::new(MockTokenizer::new()), runtime.clone(), 16).unwrap();
        (e, runtime)
    }

    fn record(id: i64, embedding: Vec<f32>) -> CategoryRecord {
        CategoryRecord {
            category_id: id.into(),
            category_name: format!("name-{id}"),
            category_level: 1,
            category_label: format!("label-{id}"),
            embedding,
        }
    }

    fn ids(rows: &[CategoryRow]) -> Vec<String> {
        rows.iter()
            .map(|r| format!("{}:{}", r.category_id.as_ref().unwrap(), r.category_label.as_deref().unwrap()))
            .collect()
    }

    #[test]
    fn category_id_untagged() {
        let int: CategoryId = serde_json::from_str("7").unwrap();
        let text: CategoryId = serde_json::from_str("\"food.cafe\"").unwrap();
        assert_eq!(int, CategoryId::Int(7));
        assert_eq!(text, CategoryId::Text("food.cafe".into()));
        assert_eq!(int.to_string(), "7");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"food.cafe\"");
    }

    #[test]
    fn row_nulls_and_missing_fields() {
        let row: CategoryRow =
            serde_json::from_str(r#"{"category_id": null, "category_label": "bar"}"#).unwrap();
        assert!(row.category_id.is_none());
        assert!(row.category_name.is_none());
        assert_eq!(row.category_label.as_deref(), Some("bar"));
    }

    #[test]
    fn dedup_keep_last() {
        let rows = vec![
            CategoryRow::new(1, "a", 0, "cafe"),
            CategoryRow::new(2, "b", 0, "museum"),
            CategoryRow::new(1, "c", 0, "bar"),
        ];
        let out = dedup_rows(rows, DedupPolicy::KeepLast);
        assert_eq!(ids(&out), vec!["2:museum", "1:bar"]);
    }

    #[test]
    fn dedup_keep_first() {
        let rows = vec![
            CategoryRow::new(1, "a", 0, "cafe"),
            CategoryRow::new(2, "b", 0, "museum"),
            CategoryRow::new(1, "c", 0, "bar"),
        ];
        let out = dedup_rows(rows, DedupPolicy::KeepFirst);
        assert_eq!(ids(&out), vec!["1:cafe", "2:museum"]);
    }

    #[test]
    fn dedup_distinguishes_int_and_string_ids() {
        let rows = vec![CategoryRow::new(1, "a", 0, "x"), CategoryRow::new("1", "b", 0, "y")];
        assert_eq!(dedup_rows(rows, DedupPolicy::KeepLast).len(), 2);
    }

    #[test]
    fn template_requires_placeholder() {
        assert!(matches!(
            CatalogBuilder::new("passage: ", DedupPolicy::KeepLast),
            Err(EmbeddingError::Config(_))
        ));
        let b = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepLast).unwrap();
        assert_eq!(b.render("cafe"), "passage: place category: cafe");
    }

    #[test]
    fn build_filters_dedups_and_keeps_order() {
        let (e, runtime) = embedder(8);
        let rows = vec![
            CategoryRow::new(3, "Museum", 1, "museum"),
            CategoryRow {
                category_id: None,
                ..CategoryRow::new(9, "x", 0, "orphan")
            },
            CategoryRow {
                category_label: None,
                ..CategoryRow::new(10, "y", 0, "ignored")
            },
            CategoryRow::new(1, "Cafe", 2, "cafe"),
            CategoryRow::new(2, "Park", 1, "park"),
            CategoryRow::new(1, "Bar", 2, "bar"),
        ];
        let builder = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepLast).unwrap();
        let catalog = builder.build(&e, rows).unwrap();

        let labels: Vec<&str> = catalog.records().iter().map(|r| r.category_label.as_str()).collect();
        assert_eq!(labels, vec!["museum", "park", "bar"]);
        assert_eq!(catalog.dim(), Some(8));
        assert_eq!(runtime.calls(), 3);
        assert_eq!(
            catalog.records()[2].embedding,
            e.embed("passage: place category: bar").unwrap()
        );
    }

    #[test]
    fn build_skips_blank_labels() {
        let (e, runtime) = embedder(4);
        let builder = CatalogBuilder::new("{label}", DedupPolicy::KeepLast).unwrap();
        for rows in [
            vec![CategoryRow::new(1, "a", 0, "   "), CategoryRow::new(2, "b", 0, "cafe")],
            vec![CategoryRow::new(2, "b", 0, "cafe"), CategoryRow::new(1, "a", 0, "")],
        ] {
            let catalog = builder.build(&e, rows).unwrap();
            assert_eq!(catalog.len(), 1);
            assert_eq!(catalog.dim(), Some(4));
            assert_eq!(catalog.records()[0].category_id, CategoryId::Int(2));
        }
        assert_eq!(runtime.calls(), 2);
    }

    #[test]
    fn blank_label_does_not_shadow_earlier_duplicate() {
        let (e, _) = embedder(4);
        let rows = vec![CategoryRow::new(1, "a", 0, "cafe"), CategoryRow::new(1, "b", 0, " ")];
        let catalog = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepLast)
            .unwrap()
            .build(&e, rows)
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].category_label, "cafe");
    }

    #[test]
    fn build_missing_name_and_level_default() {
        let (e, _) = embedder(4);
        let row = CategoryRow {
            category_id: Some(5.into()),
            category_label: Some("zoo".into()),
            ..CategoryRow::default()
        };
        let catalog = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepLast)
            .unwrap()
            .build(&e, vec![row])
            .unwrap();
        assert_eq!(catalog.records()[0].category_name, "");
        assert_eq!(catalog.records()[0].category_level, 0);
    }

    #[test]
    fn build_empty_input() {
        let (e, _) = embedder(4);
        let catalog = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepFirst)
            .unwrap()
            .build(&e, Vec::new())
            .unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.dim(), None);
    }

    #[test]
    fn build_propagates_embedding_failure() {
        let e = TextEmbedder::new(
            Arc::new(MockTokenizer::new()),
            Arc::new(MockRuntime::failing("oom")),
            8,
        )
        .unwrap();
        let err = CatalogBuilder::new(TEMPLATE, DedupPolicy::KeepLast)
            .unwrap()
            .build(&e, vec![CategoryRow::new(1, "a", 0, "cafe")])
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Inference(_)));
    }

    #[test]
    fn push_rejects_dimension_mismatch_and_duplicates() {
        let mut catalog = Catalog::new();
        catalog.push(record(1, vec![0.0; 3])).unwrap();
        assert!(matches!(
            catalog.push(record(2, vec![0.0; 4])),
            Err(EmbeddingError::DimensionMismatch { expected: 3, actual: 4 })
        ));
        assert!(matches!(
            catalog.push(record(1, vec![0.0; 3])),
            Err(EmbeddingError::DuplicateId(_))
        ));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&CategoryId::Int(1)));
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("catalog.json");
        let catalog =
            Catalog::from_records(vec![record(1, vec![0.5, -0.5]), record(2, vec![1.0, 0.0])]).unwrap();
        catalog.save_json(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["category_id"], 1);
        assert_eq!(raw[1]["category_label"], "label-2");

        let loaded = Catalog::load_json(&path).unwrap();
        assert_eq!(loaded.records(), catalog.records());
        assert_eq!(loaded.dim(), Some(2));
    }

    #[test]
    fn load_rejects_mixed_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let records = vec![record(1, vec![0.0; 2]), record(2, vec![0.0; 3])];
        fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
        assert!(matches!(
            Catalog::load_json(&path),
            Err(EmbeddingError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn read_rows_json_array_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("rows.json");
        fs::write(
            &array,
            r#"[{"category_id": 1, "category_name": "Cafe", "category_level": 2, "category_label": "cafe"},
                {"category_id": "x", "category_label": null}]"#,
        )
        .unwrap();
        let rows = read_rows(&array).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], CategoryRow::new(1, "Cafe", 2, "cafe"));
        assert!(rows[1].category_label.is_none());

        let lines = dir.path().join("rows.jsonl");
        fs::write(
            &lines,
            "{\"category_id\": 1, \"category_label\": \"cafe\"}\n\n{\"category_id\": 2, \"category_label\": \"bar\"}\n",
        )
        .unwrap();
        assert_eq!(read_rows(&lines).unwrap().len(), 2);
    }

    #[test]
    fn read_rows_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        fs::write(&path, "{not json}\n").unwrap();
        assert!(matches!(read_rows(&path), Err(EmbeddingError::Json(_))));
    }
}
