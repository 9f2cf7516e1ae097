//! Movie extraction rule

use super::format::{self, MAX_CAST};
use super::{tag_list, text, time, tmdb_id, Column};
use crate::catalog::RawItem;

pub(super) const COLUMNS: &[Column] = &[
    Column::new("title"),
    Column::new("year"),
    Column::with_placeholder("tmdb_id", ""),
    Column::new("duration"),
    Column::new("studio"),
    Column::new("content_rating"),
    Column::new("summary"),
    Column::new("rating"),
    Column::new("audience_rating"),
    Column::new("tagline"),
    Column::new("originally_available_at"),
    Column::new("added_at"),
    Column::new("updated_at"),
    Column::new("video_resolution"),
    Column::new("audio_channels"),
    Column::new("audio_codec"),
    Column::new("video_codec"),
    Column::new("container"),
    Column::new("video_frame_rate"),
    Column::new("size"),
    Column::new("genres"),
    Column::new("countries"),
    Column::new("directors"),
    Column::new("writers"),
    Column::new("actors"),
];

pub(super) fn extract(item: &RawItem) -> Vec<Option<String>> {
    // Technical info lives on the first media version and its first part
    let media = item.first("Media");
    let part = media.as_ref().and_then(|m| m.first("Part"));
    let media_str = |key: &str| media.as_ref().and_then(|m| m.str(key));

    vec![
        text(item, "title"),
        item.str("year"),
        tmdb_id(item),
        item.int("duration").and_then(format::duration_minutes),
        text(item, "studio"),
        item.str("contentRating"),
        text(item, "summary"),
        item.float("rating").and_then(format::rating_percent),
        item.float("audienceRating").and_then(format::rating_percent),
        text(item, "tagline"),
        item.str("originallyAvailableAt"),
        time(item, "addedAt"),
        time(item, "updatedAt"),
        media_str("videoResolution"),
        media_str("audioChannels"),
        media_str("audioCodec"),
        media_str("videoCodec"),
        media_str("container"),
        media_str("videoFrameRate"),
        part.and_then(|p| p.int("size")).and_then(format::file_size),
        tag_list(item, "Genre", None),
        tag_list(item, "Country", None),
        tag_list(item, "Director", None),
        tag_list(item, "Writer", None),
        tag_list(item, "Role", Some(MAX_CAST)),
    ]
}
