//! Export jobs
//!
//! One job exports one library section to one CSV file:
//!
//! 1. take the run lock for the output path
//! 2. open the sink (fails early if the file exists without overwrite)
//! 3. page through the section, normalizing and writing every item
//! 4. commit the file
//!
//! The lock and the sink are scoped values, so every exit path, including a
//! dropped future on cancellation, releases the lock and discards the partial
//! file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ContentType, LibrarySection, RawItem};
use crate::error::{Error, Result};
use crate::guard::{RunGuard, DEFAULT_STALE_AFTER};
use crate::normalize::{normalize, tmdb_id, Schema};
use crate::paginate::{Paginator, DEFAULT_PAGE_SIZE};
use crate::sink::CsvSink;
use crate::utils::{canonical_target, export_file_name};

/// Consecutive failed detail lookups after which an export stops trying
const MAX_DETAIL_FAILURES: usize = 3;

/// Settings for export jobs
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Replace existing output files
    pub overwrite: bool,
    /// Items requested per page
    pub page_size: usize,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Directory holding run lock files
    pub lock_dir: PathBuf,
    /// Age after which a run lock is presumed abandoned
    pub stale_after: Duration,
    /// Fetch an item's detail payload when the listing has no TMDB id
    pub resolve_missing_ids: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::ZERO,
            lock_dir: std::env::temp_dir(),
            stale_after: DEFAULT_STALE_AFTER,
            resolve_missing_ids: true,
        }
    }
}

/// Result of one finished export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub section: String,
    pub content_type: ContentType,
    pub path: PathBuf,
    pub rows_written: usize,
    pub pages_fetched: usize,
    pub elapsed: Duration,
}

/// What happened to one library in a batch export
#[derive(Debug)]
pub enum LibraryOutcome {
    Exported(ExportSummary),
    Skipped { section: String, reason: String },
    Failed { section: String, error: Error },
}

/// Result of exporting every library
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<LibraryOutcome>,
}

impl BatchSummary {
    pub fn exported(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LibraryOutcome::Exported(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LibraryOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LibraryOutcome::Failed { .. }))
            .count()
    }

    /// Rows written across all exported libraries
    pub fn total_items(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                LibraryOutcome::Exported(summary) => summary.rows_written,
                _ => 0,
            })
            .sum()
    }
}

/// Runs export jobs against a catalog
pub struct Exporter<C> {
    catalog: C,
    options: ExportOptions,
}

impl<C: Catalog> Exporter<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// All library sections on the server
    pub async fn list_libraries(&self) -> Result<Vec<LibrarySection>> {
        self.catalog.sections().await
    }

    /// Find a section by its exact title
    pub async fn find_library(&self, title: &str) -> Result<LibrarySection> {
        self.list_libraries()
            .await?
            .into_iter()
            .find(|s| s.title == title)
            .ok_or_else(|| Error::LibraryNotFound(title.to_string()))
    }

    /// Export the section titled `title` to `output`
    pub async fn export_library_by_name(&self, title: &str, output: &Path) -> Result<ExportSummary> {
        let section = self.find_library(title).await?;
        self.export_section(&section, output).await
    }

    /// Export one section to `output`
    pub async fn export_section(
        &self,
        section: &LibrarySection,
        output: &Path,
    ) -> Result<ExportSummary> {
        let content_type = section
            .content_type
            .ok_or_else(|| Error::UnsupportedLibrary {
                section: section.title.clone(),
                kind: section.kind.clone(),
            })?;
        let schema = Schema::for_type(content_type);
        let target = resolve_target(output)?;
        let started = Instant::now();

        info!(
            library = %section.title,
            key = %section.key,
            kind = %content_type,
            output = %target.display(),
            "Exporting library"
        );

        let _guard = RunGuard::acquire(&self.options.lock_dir, &target, self.options.stale_after)?;
        let mut sink = CsvSink::create(&target, schema, self.options.overwrite)?;

        let mut detail_failures = 0;
        let mut pages = Paginator::new(&self.catalog, section, content_type, self.options.page_size)
            .with_delay(self.options.page_delay);

        while let Some(page) = pages.next_page().await? {
            for mut item in page.items {
                if self.options.resolve_missing_ids
                    && content_type.has_tmdb_id()
                    && detail_failures < MAX_DETAIL_FAILURES
                {
                    if self.resolve_guids(&mut item).await? {
                        detail_failures = 0;
                    } else {
                        detail_failures += 1;
                        if detail_failures == MAX_DETAIL_FAILURES {
                            warn!(
                                library = %section.title,
                                "Detail lookups keep failing; exporting remaining items without them"
                            );
                        }
                    }
                }
                sink.write_row(&normalize(&item, content_type))?;
            }
            debug!(
                library = %section.title,
                written = sink.rows_written(),
                "Wrote page"
            );
        }

        let pages_fetched = pages.pages_fetched();
        let rows_written = sink.finish()?;

        if rows_written == 0 {
            warn!(library = %section.title, "Library is empty; wrote header only");
        }
        info!(
            library = %section.title,
            rows = rows_written,
            pages = pages_fetched,
            "Exported {} {}",
            rows_written,
            content_type.item_label()
        );

        Ok(ExportSummary {
            section: section.title.clone(),
            content_type,
            path: target,
            rows_written,
            pages_fetched,
            elapsed: started.elapsed(),
        })
    }

    /// Export every library into `dir`, one `<title>.csv` per library.
    ///
    /// Existing files (without overwrite) and unsupported library types are
    /// skipped; other per-library failures are recorded and the batch goes on.
    /// An authentication failure stops the batch since every library would fail
    /// the same way.
    pub async fn export_all(&self, dir: &Path) -> Result<BatchSummary> {
        std::fs::create_dir_all(dir)?;
        let sections = self.list_libraries().await?;
        let mut summary = BatchSummary::default();

        for (i, section) in sections.iter().enumerate() {
            info!("Processing library {}/{}: {}", i + 1, sections.len(), section.title);
            let output = dir.join(export_file_name(&section.title));

            if section.content_type.is_none() {
                warn!(library = %section.title, kind = %section.kind, "Skipping unsupported library type");
                summary.outcomes.push(LibraryOutcome::Skipped {
                    section: section.title.clone(),
                    reason: format!("unsupported library type '{}'", section.kind),
                });
                continue;
            }

            if !self.options.overwrite && output.exists() {
                warn!(library = %section.title, output = %output.display(), "Skipping: output file already exists");
                summary.outcomes.push(LibraryOutcome::Skipped {
                    section: section.title.clone(),
                    reason: format!("{} already exists", output.display()),
                });
                continue;
            }

            match self.export_section(section, &output).await {
                Ok(result) => summary.outcomes.push(LibraryOutcome::Exported(result)),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(library = %section.title, "Export failed, continuing with next library: {}", e);
                    summary.outcomes.push(LibraryOutcome::Failed {
                        section: section.title.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Copy the detail payload's guids onto an item whose listing entry has no TMDB id.
    ///
    /// Returns `false` when the lookup failed; the item is still exported without
    /// the id. An authentication failure is returned as an error since every
    /// further request would be rejected too.
    async fn resolve_guids(&self, item: &mut RawItem) -> Result<bool> {
        if tmdb_id(item).is_some() {
            return Ok(true);
        }
        let Some(rating_key) = item.rating_key() else {
            return Ok(true);
        };

        match self.catalog.item_detail(&rating_key).await {
            Ok(Some(detail)) => {
                if let Some(guids) = detail.get("Guid") {
                    item.insert("Guid", guids.clone());
                }
                Ok(true)
            }
            Ok(None) => {
                debug!(%rating_key, "No detail payload for item");
                Ok(true)
            }
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                debug!(%rating_key, "Failed to get item metadata: {}", e);
                Ok(false)
            }
        }
    }
}

/// Create the output's parent directory and return the file's canonical path
fn resolve_target(output: &Path) -> Result<PathBuf> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(canonical_target(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::FakeCatalog;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> ExportOptions {
        ExportOptions {
            page_size: 2,
            lock_dir: dir.path().join("locks"),
            ..Default::default()
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn movie_catalog() -> FakeCatalog {
        FakeCatalog::default().with_section(
            LibrarySection::new("1", "Movies", "movie"),
            vec![
                json!({"ratingKey": "10", "title": "Alien", "year": 1979, "Guid": [{"id": "tmdb://348"}]}),
                json!({"ratingKey": "11", "title": "Heat", "year": 1995}),
                json!({"ratingKey": "12", "title": "Ran", "year": 1985}),
            ],
        )
    }

    #[tokio::test]
    async fn test_export_three_movies_in_two_pages() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let exporter = Exporter::new(movie_catalog()).with_options(options(&dir));

        let summary = exporter.export_library_by_name("Movies", &output).await.unwrap();
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.content_type, ContentType::Movie);

        let rows = read_rows(&output);
        let titles: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Heat", "Ran"]);
        assert!(rows.iter().all(|r| r.len() == Schema::for_type(ContentType::Movie).width()));
    }

    #[tokio::test]
    async fn test_missing_ids_resolved_from_detail() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let mut catalog = movie_catalog();
        catalog.details.insert(
            "11".to_string(),
            RawItem::from_value(json!({"Guid": [{"id": "tmdb://949"}]})).unwrap(),
        );
        let exporter = Exporter::new(catalog).with_options(options(&dir));

        exporter.export_library_by_name("Movies", &output).await.unwrap();

        let rows = read_rows(&output);
        let ids: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(ids, vec!["348", "949", ""]);
        // Only the two items without an id were looked up
        assert_eq!(exporter.catalog().detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_export_without_overwrite_fails() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let exporter = Exporter::new(movie_catalog()).with_options(options(&dir));

        exporter.export_library_by_name("Movies", &output).await.unwrap();
        let before = std::fs::read(&output).unwrap();

        let err = exporter
            .export_library_by_name("Movies", &output)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DestinationExists(_)));
        assert_eq!(std::fs::read(&output).unwrap(), before);
    }

    #[tokio::test]
    async fn test_page_failure_leaves_no_file_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let mut catalog = movie_catalog();
        catalog.fail_at_offset = Some(2);
        let exporter = Exporter::new(catalog).with_options(options(&dir));

        let err = exporter
            .export_library_by_name("Movies", &output)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PageFetch { offset: 2, .. }));
        assert!(!output.exists());

        let lock = RunGuard::lock_path_for(&dir.path().join("locks"), &output);
        assert!(!lock.exists());
    }

    #[tokio::test]
    async fn test_held_lock_blocks_export() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let exporter = Exporter::new(movie_catalog()).with_options(options(&dir));

        let _held = RunGuard::acquire(&dir.path().join("locks"), &output, DEFAULT_STALE_AFTER).unwrap();
        let err = exporter
            .export_library_by_name("Movies", &output)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_unknown_library_name() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(movie_catalog()).with_options(options(&dir));
        let err = exporter
            .export_library_by_name("Anime", &dir.path().join("a.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LibraryNotFound(name) if name == "Anime"));
    }

    #[tokio::test]
    async fn test_empty_library_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Music.csv");
        let catalog = FakeCatalog::default()
            .with_section(LibrarySection::new("3", "Music", "artist"), Vec::new());
        let exporter = Exporter::new(catalog).with_options(options(&dir));

        let summary = exporter.export_library_by_name("Music", &output).await.unwrap();
        assert_eq!(summary.rows_written, 0);

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("\"artist\""));
    }

    #[tokio::test]
    async fn test_export_all_skips_and_continues() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("exports");
        let mut catalog = movie_catalog()
            .with_section(
                LibrarySection::new("2", "TV Shows", "show"),
                vec![json!({"title": "Lost", "Guid": [{"id": "tmdb://4607"}]})],
            )
            .with_section(LibrarySection::new("4", "Photos", "photo"), Vec::new())
            .with_section(
                LibrarySection::new("3", "Music", "artist"),
                vec![json!({"parentTitle": "Björk", "title": "Homogenic"})],
            );
        // Movies has 3 items; its second page fails
        catalog.fail_at_offset = Some(2);

        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("Music.csv"), "existing").unwrap();

        let exporter = Exporter::new(catalog).with_options(options(&dir));
        let summary = exporter.export_all(&out_dir).await.unwrap();

        assert_eq!(summary.exported(), 1);
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_items(), 1);
        assert!(out_dir.join("TV-Shows.csv").exists());
        assert!(!out_dir.join("Movies.csv").exists());
        assert_eq!(std::fs::read_to_string(out_dir.join("Music.csv")).unwrap(), "existing");
    }

    #[tokio::test]
    async fn test_rejected_detail_lookup_fails_export() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let mut catalog = movie_catalog();
        catalog.detail_status = Some(403);
        let exporter = Exporter::new(catalog).with_options(options(&dir));

        let err = exporter
            .export_library_by_name("Movies", &output)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { status: 403 }));
        assert!(!output.exists());
        // Stopped at the first rejected lookup
        assert_eq!(exporter.catalog().detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_detail_lookups_are_abandoned() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Movies.csv");
        let items = (0..6)
            .map(|i| json!({"ratingKey": format!("{}", i), "title": format!("Movie {}", i)}))
            .collect();
        let mut catalog =
            FakeCatalog::default().with_section(LibrarySection::new("1", "Movies", "movie"), items);
        catalog.detail_status = Some(500);
        let exporter = Exporter::new(catalog).with_options(options(&dir));

        let summary = exporter.export_library_by_name("Movies", &output).await.unwrap();
        assert_eq!(summary.rows_written, 6);
        assert_eq!(
            exporter.catalog().detail_calls.load(Ordering::SeqCst),
            MAX_DETAIL_FAILURES
        );
    }

    #[tokio::test]
    async fn test_aliased_output_is_one_target() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(movie_catalog()).with_options(options(&dir));

        let plain = dir.path().join("Movies.csv");
        let _held = RunGuard::acquire(&dir.path().join("locks"), &plain, DEFAULT_STALE_AFTER).unwrap();

        let alias = dir.path().join("sub").join("..").join(".").join("Movies.csv");
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        let err = exporter
            .export_library_by_name("Movies", &alias)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning { .. }));
        assert!(!plain.exists());
    }
}
