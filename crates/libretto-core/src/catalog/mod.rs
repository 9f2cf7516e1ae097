//! Library catalog: sections, pages and items
//!
//! The [`Catalog`] trait is what the pagination engine and the exporter talk
//! to. [`PlexClient`](crate::client::PlexClient) implements it against the real
//! HTTP API; tests substitute an in-memory catalog.

mod item;
mod plex;

pub use item::RawItem;
pub use plex::{parse_page, parse_sections};

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of content a library section holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Show,
    Music,
}

impl ContentType {
    /// Map the server's section type (`movie`, `show`, `artist`)
    pub fn from_section_type(kind: &str) -> Option<Self> {
        match kind {
            "movie" => Some(Self::Movie),
            "show" => Some(Self::Show),
            "artist" => Some(Self::Music),
            _ => None,
        }
    }

    /// Item type code used to filter a section listing (movie, show, album)
    pub fn item_type_code(self) -> u8 {
        match self {
            Self::Movie => 1,
            Self::Show => 2,
            Self::Music => 9,
        }
    }

    /// Human-readable plural used in progress output
    pub fn item_label(self) -> &'static str {
        match self {
            Self::Movie => "movies",
            Self::Show => "TV shows",
            Self::Music => "albums",
        }
    }

    /// Whether rows of this type carry an external TMDB identifier
    pub fn has_tmdb_id(self) -> bool {
        matches!(self, Self::Movie | Self::Show)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Movie => "movie",
            Self::Show => "show",
            Self::Music => "music",
        })
    }
}

/// A named collection on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    /// Server identifier, used in listing paths
    pub key: String,
    /// Display name
    pub title: String,
    /// Type string as reported by the server
    pub kind: String,
    /// Exportable content type, `None` for types without an export schema
    pub content_type: Option<ContentType>,
}

impl LibrarySection {
    pub fn new(key: impl Into<String>, title: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            key: key.into(),
            title: title.into(),
            content_type: ContentType::from_section_type(&kind),
            kind,
        }
    }
}

/// One page of a section listing
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Items in server order
    pub items: Vec<RawItem>,
    /// Offset the page was requested at
    pub offset: usize,
    /// Page size that was requested
    pub requested: usize,
    /// Total number of items in the section, if the server reported it
    pub total_size: Option<usize>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Read access to a media server's library catalog
pub trait Catalog {
    /// All library sections
    fn sections(&self) -> impl Future<Output = Result<Vec<LibrarySection>>> + Send;

    /// Up to `size` items of `section` starting at `offset`
    fn page(
        &self,
        section: &LibrarySection,
        content_type: ContentType,
        offset: usize,
        size: usize,
    ) -> impl Future<Output = Result<Page>> + Send;

    /// Full detail payload of one item, `None` if the server has no such item
    fn item_detail(&self, rating_key: &str)
        -> impl Future<Output = Result<Option<RawItem>>> + Send;
}
