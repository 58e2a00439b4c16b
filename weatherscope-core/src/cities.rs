//! Static city directory backing the search box.
//!
//! The bundled dataset is embedded in the binary and parsed once per process.

use std::path::Path;
use std::sync::OnceLock;

use crate::error::DirectoryError;
use crate::model::CityRecord;

/// Upper bound on suggestions returned for one query.
pub const MAX_MATCHES: usize = 20;

const BUNDLED_JSON: &str = include_str!("../data/cities.json");

static BUNDLED: OnceLock<CityDirectory> = OnceLock::new();

/// Result of a directory query.
///
/// A blank query is never run against the dataset; it is reported as
/// `NotSearched` so callers can tell it apart from a query with no hits.
#[derive(Debug, Clone, PartialEq)]
pub enum CityMatches<'a> {
    NotSearched,
    Searched(Vec<&'a CityRecord>),
}

impl<'a> CityMatches<'a> {
    pub fn records(&self) -> &[&'a CityRecord] {
        match self {
            Self::NotSearched => &[],
            Self::Searched(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn into_records(self) -> Vec<&'a CityRecord> {
        match self {
            Self::NotSearched => Vec::new(),
            Self::Searched(records) => records,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    record: CityRecord,
    /// Lowercased city, ascii name, admin region and country.
    keys: [String; 4],
}

impl Entry {
    fn new(record: CityRecord) -> Self {
        let keys = [
            record.city.to_lowercase(),
            record.city_ascii.to_lowercase(),
            record.admin_name.to_lowercase(),
            record.country.to_lowercase(),
        ];
        Self { record, keys }
    }

    fn matches(&self, needle: &str) -> bool {
        self.keys.iter().any(|k| k.contains(needle))
    }
}

/// Read-only list of known cities, in dataset order.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    entries: Vec<Entry>,
}

impl CityDirectory {
    pub fn new(records: Vec<CityRecord>) -> Self {
        Self { entries: records.into_iter().map(Entry::new).collect() }
    }

    /// The dataset shipped with the crate.
    pub fn bundled() -> Result<&'static CityDirectory, DirectoryError> {
        if let Some(dir) = BUNDLED.get() {
            return Ok(dir);
        }
        let dir = Self::from_json_str(BUNDLED_JSON)?;
        Ok(BUNDLED.get_or_init(|| dir))
    }

    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let records: Vec<CityRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    pub fn from_path(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring search over name, ascii name, admin region
    /// and country. At most [`MAX_MATCHES`] records, in dataset order.
    pub fn search(&self, query: &str) -> CityMatches<'_> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return CityMatches::NotSearched;
        }

        let found = self
            .entries
            .iter()
            .filter(|e| e.matches(&needle))
            .map(|e| &e.record)
            .take(MAX_MATCHES)
            .collect();

        CityMatches::Searched(found)
    }
}
