//! Core Store implementation

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::record::{IndexValue, Record};

/// Filter operator for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

/// A single query filter over an indexed field
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: IndexValue,
}

impl Filter {
    /// Field equals value
    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// Field does not equal value (missing fields match)
    pub fn ne(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Ne,
            value: value.into(),
        }
    }

    fn matches(&self, fields: &HashMap<String, IndexValue>) -> bool {
        match (fields.get(&self.field), self.op) {
            (Some(actual), FilterOp::Eq) => *actual == self.value,
            (Some(actual), FilterOp::Ne) => *actual != self.value,
            (None, FilterOp::Eq) => false,
            (None, FilterOp::Ne) => true,
        }
    }
}

/// One line of a collection log
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    op: LogOp,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LogOp {
    Put,
    Delete,
}

/// The record store
pub struct Store {
    /// Base path for collection logs
    base_path: PathBuf,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened plan store");
        Ok(Self { base_path })
    }

    fn log_path<R: Record>(&self) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", R::collection_name()))
    }

    /// Replay a collection log into (id, value) pairs, latest-wins.
    ///
    /// Insertion order of first put is preserved so `list` returns records
    /// in creation order.
    fn replay<R: Record>(&self) -> Result<Vec<(String, serde_json::Value)>> {
        let path = self.log_path::<R>();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&path).context(format!("Failed to open log: {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut entries: Vec<(String, serde_json::Value)> = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry =
                serde_json::from_str(&line).context(format!("Corrupt log line in {}", path.display()))?;

            match entry.op {
                LogOp::Put => {
                    let value = entry.record.unwrap_or(serde_json::Value::Null);
                    if let Some(existing) = entries.iter_mut().find(|(id, _)| *id == entry.id) {
                        existing.1 = value;
                    } else {
                        entries.push((entry.id, value));
                    }
                }
                LogOp::Delete => {
                    entries.retain(|(id, _)| *id != entry.id);
                }
            }
        }

        Ok(entries)
    }

    fn append<R: Record>(&self, entry: &LogEntry) -> Result<()> {
        let path = self.log_path::<R>();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open log for append: {}", path.display()))?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Create a new record, failing if the id already exists
    pub fn create<R: Record>(&self, record: &R) -> Result<()> {
        let entries = self.replay::<R>()?;
        if entries.iter().any(|(id, _)| id == record.id()) {
            bail!(
                "Record already exists in {}: {}",
                R::collection_name(),
                record.id()
            );
        }

        self.append::<R>(&LogEntry {
            op: LogOp::Put,
            id: record.id().to_string(),
            record: Some(serde_json::to_value(record)?),
        })?;

        debug!(collection = R::collection_name(), id = record.id(), "Created record");
        Ok(())
    }

    /// Get a record by id
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let entries = self.replay::<R>()?;
        match entries.into_iter().find(|(eid, _)| eid == id) {
            Some((_, value)) => {
                let record = serde_json::from_value(value).context("Failed to decode record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Update an existing record, failing if it does not exist
    pub fn update<R: Record>(&self, record: &R) -> Result<()> {
        let entries = self.replay::<R>()?;
        if !entries.iter().any(|(id, _)| id == record.id()) {
            bail!(
                "Record not found in {}: {}",
                R::collection_name(),
                record.id()
            );
        }

        self.append::<R>(&LogEntry {
            op: LogOp::Put,
            id: record.id().to_string(),
            record: Some(serde_json::to_value(record)?),
        })?;

        debug!(collection = R::collection_name(), id = record.id(), "Updated record");
        Ok(())
    }

    /// Delete a record by id; returns whether anything was removed
    pub fn delete<R: Record>(&self, id: &str) -> Result<bool> {
        let entries = self.replay::<R>()?;
        if !entries.iter().any(|(eid, _)| eid == id) {
            return Ok(false);
        }

        self.append::<R>(&LogEntry {
            op: LogOp::Delete,
            id: id.to_string(),
            record: None,
        })?;

        info!(collection = R::collection_name(), id, "Deleted record");
        Ok(true)
    }

    /// List all records of a collection in creation order
    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        let entries = self.replay::<R>()?;
        entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).context("Failed to decode record"))
            .collect()
    }

    /// Query records by indexed fields (all filters must match)
    pub fn query<R: Record>(&self, filters: &[Filter]) -> Result<Vec<R>> {
        let records = self.list::<R>()?;
        Ok(records
            .into_iter()
            .filter(|r| {
                let fields = r.indexed_fields();
                filters.iter().all(|f| f.matches(&fields))
            })
            .collect())
    }

    /// Rewrite a collection log to contain only the live records
    pub fn compact<R: Record>(&self) -> Result<()> {
        let entries = self.replay::<R>()?;
        let path = self.log_path::<R>();

        let mut out = String::new();
        for (id, value) in &entries {
            let line = serde_json::to_string(&LogEntry {
                op: LogOp::Put,
                id: id.clone(),
                record: Some(value.clone()),
            })?;
            out.push_str(&line);
            out.push('\n');
        }

        fs::write(&path, out).context(format!("Failed to rewrite log: {}", path.display()))?;
        info!(
            collection = R::collection_name(),
            records = entries.len(),
            "Compacted collection"
        );
        Ok(())
    }
}
