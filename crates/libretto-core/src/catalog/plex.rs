//! Catalog implementation over the media server's HTTP API

use serde_json::Value;
use tracing::debug;

use super::{Catalog, ContentType, LibrarySection, Page, RawItem};
use crate::client::PlexClient;
use crate::error::{Error, Result};

const SECTIONS_PATH: &str = "/library/sections";

impl Catalog for PlexClient {
    async fn sections(&self) -> Result<Vec<LibrarySection>> {
        let body = self.fetch(SECTIONS_PATH, &[]).await?;
        parse_sections(&body, SECTIONS_PATH)
    }

    async fn page(
        &self,
        section: &LibrarySection,
        content_type: ContentType,
        offset: usize,
        size: usize,
    ) -> Result<Page> {
        let path = format!("/library/sections/{}/all", section.key);
        let query = [
            ("type", content_type.item_type_code().to_string()),
            ("includeGuids", "1".to_string()),
            ("X-Plex-Container-Start", offset.to_string()),
            ("X-Plex-Container-Size", size.to_string()),
        ];
        let body = self.fetch(&path, &query).await?;
        let page = parse_page(&body, &path, offset, size)?;
        debug!(
            section = %section.title,
            offset,
            returned = page.len(),
            total = ?page.total_size,
            "Fetched page"
        );
        Ok(page)
    }

    async fn item_detail(&self, rating_key: &str) -> Result<Option<RawItem>> {
        let path = format!("/library/metadata/{}", rating_key);
        let body = self.fetch(&path, &[]).await?;
        let mut items = metadata_items(container(&body, &path)?, &path)?;
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }
}

fn container<'a>(body: &'a Value, context: &str) -> Result<&'a Value> {
    body.get("MediaContainer")
        .filter(|c| c.is_object())
        .ok_or_else(|| Error::Decode {
            context: context.to_string(),
            message: "missing MediaContainer object".to_string(),
        })
}

fn metadata_items(container: &Value, context: &str) -> Result<Vec<RawItem>> {
    match container.get("Metadata") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                RawItem::from_value(v.clone()).ok_or_else(|| Error::Decode {
                    context: context.to_string(),
                    message: format!("Metadata[{}] is not an object", i),
                })
            })
            .collect(),
        Some(_) => Err(Error::Decode {
            context: context.to_string(),
            message: "Metadata is not an array".to_string(),
        }),
    }
}

fn size_field(container: &Value, key: &str) -> Option<usize> {
    match container.get(key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a section listing response
pub fn parse_sections(body: &Value, context: &str) -> Result<Vec<LibrarySection>> {
    let container = container(body, context)?;
    let directories = match container.get("Directory") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(_) => {
            return Err(Error::Decode {
                context: context.to_string(),
                message: "Directory is not an array".to_string(),
            })
        }
    };

    directories
        .iter()
        .map(|dir| {
            let raw = RawItem::from_value(dir.clone());
            let field = |name: &str| raw.as_ref().and_then(|r| r.str(name));
            match (field("key"), field("title")) {
                (Some(key), Some(title)) => Ok(LibrarySection::new(
                    key,
                    title,
                    field("type").unwrap_or_default(),
                )),
                _ => Err(Error::Decode {
                    context: context.to_string(),
                    message: "library section without key or title".to_string(),
                }),
            }
        })
        .collect()
}

/// Decode one page of a section listing
pub fn parse_page(body: &Value, context: &str, offset: usize, requested: usize) -> Result<Page> {
    let container = container(body, context)?;
    Ok(Page {
        items: metadata_items(container, context)?,
        offset,
        requested,
        total_size: size_field(container, "totalSize"),
    })
}
