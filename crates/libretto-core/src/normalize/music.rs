//! Music extraction rule (one row per album)

use super::{tag_list, text, time, Column};
use crate::catalog::RawItem;

pub(super) const COLUMNS: &[Column] = &[
    Column::new("artist"),
    Column::new("album"),
    Column::new("year"),
    Column::new("genres"),
    Column::new("studio"),
    Column::new("added_at"),
    Column::new("updated_at"),
];

pub(super) fn extract(item: &RawItem) -> Vec<Option<String>> {
    vec![
        text(item, "parentTitle"),
        text(item, "title"),
        item.str("year"),
        tag_list(item, "Genre", None),
        text(item, "studio"),
        time(item, "addedAt"),
        time(item, "updatedAt"),
    ]
}
