//! Reading exported CSVs back
//!
//! The movie and show importers key on title, year and TMDB id. These readers
//! look columns up by header name, so they keep working as long as the header
//! names stay stable.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::normalize::NOT_AVAILABLE;

/// One row as an importer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    pub title: String,
    pub year: Option<String>,
    /// `None` when the export had no TMDB match
    pub tmdb_id: Option<String>,
}

impl ImportCandidate {
    /// `Title (Year)` label for reports
    pub fn label(&self) -> String {
        match &self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

#[derive(Deserialize)]
struct MovieRecord {
    title: String,
    year: String,
    tmdb_id: String,
}

#[derive(Deserialize)]
struct ShowRecord {
    series_title: String,
    year: String,
    tmdb_id: String,
}

fn present(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != NOT_AVAILABLE).then(|| value.to_string())
}

fn candidate(title: String, year: String, tmdb_id: String) -> ImportCandidate {
    ImportCandidate {
        title: title.trim().to_string(),
        year: present(year),
        tmdb_id: present(tmdb_id),
    }
}

/// Read a movie export
pub fn read_movie_records(path: &Path) -> Result<Vec<ImportCandidate>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<MovieRecord>()
        .map(|record| {
            let r = record?;
            Ok(candidate(r.title, r.year, r.tmdb_id))
        })
        .collect()
}

/// Read a TV show export
pub fn read_show_records(path: &Path) -> Result<Vec<ImportCandidate>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<ShowRecord>()
        .map(|record| {
            let r = record?;
            Ok(candidate(r.series_title, r.year, r.tmdb_id))
        })
        .collect()
}
