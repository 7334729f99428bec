use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::model::RoutineItem;
use crate::state::CollectionState;

const FILE_PREFIX: &str = "weekly-routine-export-";

/// Characters a browser's URI component encoder leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The routine collection exactly as held in memory when the export was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub items: BTreeMap<String, RoutineItem>,
    pub is_loading: bool,
}

impl ExportSnapshot {
    pub fn capture(state: &CollectionState<RoutineItem>) -> Self {
        Self {
            items: state
                .entries()
                .iter()
                .map(|(id, item)| (id.clone(), item.clone()))
                .collect(),
            is_loading: state.is_loading(),
        }
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes once; the document is what gets written or encoded.
    pub fn into_document(self) -> StoreResult<ExportDocument> {
        let json = self.to_json()?;
        Ok(ExportDocument {
            snapshot: self,
            json,
        })
    }

    /// `weekly-routine-export-3-9-2025.json` for 9 March 2025.
    pub fn file_name(date: NaiveDate) -> String {
        format!(
            "{FILE_PREFIX}{}-{}-{}.json",
            date.month(),
            date.day(),
            date.year()
        )
    }
}

/// A snapshot together with its pretty-printed JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub snapshot: ExportSnapshot,
    pub json: String,
}

impl ExportDocument {
    pub fn data_uri(&self) -> String {
        format!(
            "data:application/json;charset=utf-8,{}",
            utf8_percent_encode(&self.json, URI_COMPONENT)
        )
    }

    pub fn write_to(&self, dir: &Path, date: NaiveDate) -> StoreResult<PathBuf> {
        let path = dir.join(ExportSnapshot::file_name(date));
        match fs::write(&path, &self.json) {
            Ok(()) => Ok(path),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}
