//! Metadata normalization
//!
//! Turns a [`RawItem`] into a [`NormalizedRow`] whose width and column order are
//! fixed by the [`Schema`] of its content type. Each content type has its own
//! extraction rule; every rule is a pure function of the item.
//!
//! Missing values never fail: they become the column's placeholder, and a
//! column's placeholder never changes between rows or runs.

pub mod format;
mod movie;
mod music;
mod show;

use crate::catalog::{ContentType, RawItem};

/// Placeholder for descriptive columns
pub const NOT_AVAILABLE: &str = "N/A";

/// One output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Header name
    pub name: &'static str,
    /// Value written when the item has no data for this column
    pub placeholder: &'static str,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            placeholder: NOT_AVAILABLE,
        }
    }

    pub const fn with_placeholder(name: &'static str, placeholder: &'static str) -> Self {
        Self { name, placeholder }
    }
}

/// Fixed column list for one content type
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub content_type: ContentType,
    pub name: &'static str,
    pub columns: &'static [Column],
}

static MOVIE_SCHEMA: Schema = Schema {
    content_type: ContentType::Movie,
    name: "movie",
    columns: movie::COLUMNS,
};

static SHOW_SCHEMA: Schema = Schema {
    content_type: ContentType::Show,
    name: "show",
    columns: show::COLUMNS,
};

static MUSIC_SCHEMA: Schema = Schema {
    content_type: ContentType::Music,
    name: "music",
    columns: music::COLUMNS,
};

impl Schema {
    /// Schema for a content type
    pub fn for_type(content_type: ContentType) -> &'static Schema {
        match content_type {
            ContentType::Movie => &MOVIE_SCHEMA,
            ContentType::Show => &SHOW_SCHEMA,
            ContentType::Music => &MUSIC_SCHEMA,
        }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Header names in column order
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Position of a column by header name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Fill missing values with placeholders.
    ///
    /// `values` comes from an extraction rule and lists one entry per column.
    fn complete(&'static self, values: Vec<Option<String>>) -> NormalizedRow {
        debug_assert_eq!(values.len(), self.width(), "{} rule width", self.name);

        let values = self
            .columns
            .iter()
            .zip(values.into_iter().chain(std::iter::repeat(None)))
            .map(|(column, value)| value.unwrap_or_else(|| column.placeholder.to_string()))
            .collect();

        NormalizedRow {
            schema: self,
            values,
        }
    }
}

/// One item flattened into its content type's column order
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub schema: &'static Schema,
    pub values: Vec<String>,
}

impl NormalizedRow {
    /// Value of a column by header name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.schema
            .index_of(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

/// Normalize one item according to its content type
pub fn normalize(item: &RawItem, content_type: ContentType) -> NormalizedRow {
    let schema = Schema::for_type(content_type);
    let values = match content_type {
        ContentType::Movie => movie::extract(item),
        ContentType::Show => show::extract(item),
        ContentType::Music => music::extract(item),
    };
    schema.complete(values)
}

/// TMDB id from the item's guid list
pub fn tmdb_id(item: &RawItem) -> Option<String> {
    format::tmdb_id_from_guids(&item.attrs("Guid", "id"))
}

/// Cleaned text field
fn text(item: &RawItem, key: &str) -> Option<String> {
    item.str(key).and_then(|s| format::clean_text(&s))
}

/// Timestamp field in unix seconds
fn time(item: &RawItem, key: &str) -> Option<String> {
    item.int(key).and_then(format::timestamp)
}

/// Tag list joined with the list separator
fn tag_list(item: &RawItem, key: &str, cap: Option<usize>) -> Option<String> {
    format::join_list(item.tags(key), cap)
}
