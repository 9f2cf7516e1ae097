//! Pagination over a library section
//!
//! [`Paginator`] is a finite, non-restartable sequence of pages. It starts at
//! offset 0, advances by the number of items each page actually returned, and
//! stops once the offset reaches the server's reported total or a page comes
//! back empty. A failed fetch ends the sequence with an error; pages are never
//! skipped.

use std::time::Duration;

use tracing::{debug, info};

use crate::catalog::{Catalog, ContentType, LibrarySection, Page};
use crate::error::{Error, Result};

/// Items requested per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Walks one section page by page
pub struct Paginator<'a, C> {
    catalog: &'a C,
    section: &'a LibrarySection,
    content_type: ContentType,
    page_size: usize,
    delay: Duration,
    offset: usize,
    pages_fetched: usize,
    done: bool,
}

impl<'a, C: Catalog> Paginator<'a, C> {
    /// Create a paginator starting at offset 0
    pub fn new(
        catalog: &'a C,
        section: &'a LibrarySection,
        content_type: ContentType,
        page_size: usize,
    ) -> Self {
        Self {
            catalog,
            section,
            content_type,
            page_size: page_size.max(1),
            delay: Duration::ZERO,
            offset: 0,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Pause between consecutive page requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of items seen so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of successful page requests so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the sequence has ended
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Fetch the next non-empty page, or `None` once the section is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        if self.pages_fetched > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let page = match self
            .catalog
            .page(self.section, self.content_type, self.offset, self.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(Error::PageFetch {
                    section: self.section.title.clone(),
                    offset: self.offset,
                    source: Box::new(e),
                });
            }
        };
        self.pages_fetched += 1;

        if page.is_empty() {
            debug!(
                section = %self.section.title,
                offset = self.offset,
                "Empty page, stopping"
            );
            self.done = true;
            return Ok(None);
        }

        self.offset += page.len();
        if let Some(total) = page.total_size {
            if self.offset >= total {
                self.done = true;
            }
            let total_pages = total.div_ceil(self.page_size).max(1);
            info!(
                section = %self.section.title,
                "Fetched page {}/{} ({} items)",
                self.pages_fetched,
                total_pages,
                page.len()
            );
        } else {
            info!(
                section = %self.section.title,
                "Fetched page {} ({} items)",
                self.pages_fetched,
                page.len()
            );
        }

        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::FakeCatalog;
    use serde_json::json;

    fn movies(count: usize) -> Vec<serde_json::Value> {
        (0..count)
            .map(|i| json!({"ratingKey": i.to_string(), "title": format!("Movie {}", i)}))
            .collect()
    }

    fn section() -> LibrarySection {
        LibrarySection::new("1", "Movies", "movie")
    }

    async fn collect(paginator: &mut Paginator<'_, FakeCatalog>) -> Result<Vec<Vec<String>>> {
        let mut pages = Vec::new();
        while let Some(page) = paginator.next_page().await? {
            pages.push(page.items.iter().filter_map(|i| i.str("title")).collect());
        }
        Ok(pages)
    }

    #[tokio::test]
    async fn test_three_items_page_size_two() {
        let catalog = FakeCatalog::default().with_section(section(), movies(3));
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 2);

        let pages = collect(&mut paginator).await.unwrap();
        let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert_eq!(pages.concat(), vec!["Movie 0", "Movie 1", "Movie 2"]);
        assert_eq!(catalog.page_calls(), 2);
    }

    #[tokio::test]
    async fn test_visits_ceil_n_over_p_pages_in_order() {
        for (count, size) in [(0, 5), (1, 5), (5, 5), (6, 5), (49, 7), (100, 50)] {
            let catalog = FakeCatalog::default().with_section(section(), movies(count));
            let section = section();
            let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, size);

            let items = collect(&mut paginator).await.unwrap().concat();
            let expected: Vec<String> = (0..count).map(|i| format!("Movie {}", i)).collect();
            assert_eq!(items, expected, "{} items / page {}", count, size);
            assert_eq!(paginator.pages_fetched(), count.div_ceil(size).max(1));
        }
    }

    #[tokio::test]
    async fn test_short_pages_advance_by_returned_count() {
        let mut catalog = FakeCatalog::default().with_section(section(), movies(7));
        catalog.max_page = Some(3);
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 5);

        let pages = collect(&mut paginator).await.unwrap();
        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(*catalog.requested_offsets.lock().unwrap(), vec![0, 3, 6]);
        assert_eq!(pages.concat().len(), 7);
    }

    #[tokio::test]
    async fn test_empty_page_stops_when_total_overstated() {
        let mut catalog = FakeCatalog::default().with_section(section(), movies(3));
        catalog.reported_total = Some(Some(10));
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 2);

        let items = collect(&mut paginator).await.unwrap().concat();
        assert_eq!(items.len(), 3);
        assert_eq!(catalog.page_calls(), 3);
        assert!(paginator.is_done());
    }

    #[tokio::test]
    async fn test_unknown_total_runs_until_empty_page() {
        let mut catalog = FakeCatalog::default().with_section(section(), movies(4));
        catalog.reported_total = Some(None);
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 2);

        let items = collect(&mut paginator).await.unwrap().concat();
        assert_eq!(items.len(), 4);
        assert_eq!(catalog.page_calls(), 3);
    }

    #[tokio::test]
    async fn test_total_understated_never_over_emits() {
        let mut catalog = FakeCatalog::default().with_section(section(), movies(10));
        catalog.reported_total = Some(Some(4));
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 2);

        let items = collect(&mut paginator).await.unwrap().concat();
        assert_eq!(items, vec!["Movie 0", "Movie 1", "Movie 2", "Movie 3"]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_ends_sequence() {
        let mut catalog = FakeCatalog::default().with_section(section(), movies(5));
        catalog.fail_at_offset = Some(2);
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 2);

        assert_eq!(paginator.next_page().await.unwrap().unwrap().len(), 2);
        let err = paginator.next_page().await.unwrap_err();
        match &err {
            Error::PageFetch {
                section, offset, ..
            } => {
                assert_eq!(section, "Movies");
                assert_eq!(*offset, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(err.root(), Error::HttpStatus { status: 500, .. }));

        // Not restartable
        assert!(paginator.next_page().await.unwrap().is_none());
        assert_eq!(catalog.page_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_pages() {
        let catalog = FakeCatalog::default().with_section(section(), movies(3));
        let section = section();
        let mut paginator = Paginator::new(&catalog, &section, ContentType::Movie, 1)
            .with_delay(Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        collect(&mut paginator).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }
}
