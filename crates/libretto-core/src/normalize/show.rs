//! TV show extraction rule

use super::format::{self, MAX_CAST};
use super::{tag_list, text, time, tmdb_id, Column};
use crate::catalog::RawItem;

pub(super) const COLUMNS: &[Column] = &[
    Column::new("series_title"),
    Column::with_placeholder("tmdb_id", ""),
    Column::with_placeholder("total_episodes", "0"),
    Column::with_placeholder("seasons", "0"),
    Column::new("studio"),
    Column::new("content_rating"),
    Column::new("summary"),
    Column::new("audience_rating"),
    Column::new("year"),
    Column::new("duration"),
    Column::new("air_date_range"),
    Column::new("added_at"),
    Column::new("updated_at"),
    Column::new("genres"),
    Column::new("countries"),
    Column::new("actors"),
];

pub(super) fn extract(item: &RawItem) -> Vec<Option<String>> {
    vec![
        text(item, "title"),
        tmdb_id(item),
        // leafCount counts episodes, childCount counts seasons
        item.int("leafCount").map(|n| n.to_string()),
        item.int("childCount").map(|n| n.to_string()),
        text(item, "studio"),
        item.str("contentRating"),
        text(item, "summary"),
        item.float("audienceRating").and_then(format::rating_percent),
        item.str("year"),
        item.int("duration").and_then(format::duration_minutes),
        item.str("originallyAvailableAt")
            .and_then(|date| format::open_date_range(&date)),
        time(item, "addedAt"),
        time(item, "updatedAt"),
        tag_list(item, "Genre", None),
        tag_list(item, "Country", None),
        tag_list(item, "Role", Some(MAX_CAST)),
    ]
}
