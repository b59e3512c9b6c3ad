//! Meme catalog: the templates users pick from.

use serde::Deserialize;

use crate::core::config;
use crate::core::error::AppResult;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemeStatus {
    Active,
    /// Listed but not yet selectable
    Soon,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Meme {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: MemeStatus,
    /// Example video shown after selection
    pub video_url: Option<String>,
    pub preview_url: Option<String>,
}

impl Meme {
    pub fn is_available(&self) -> bool {
        self.status == MemeStatus::Active
    }
}

/// One page of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage<'a> {
    pub items: &'a [Meme],
    /// Zero-based page index, clamped to the last page
    pub page: usize,
    pub total_pages: usize,
}

impl CatalogPage<'_> {
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    memes: Vec<Meme>,
}

impl Catalog {
    pub fn new(memes: Vec<Meme>) -> Self {
        Self { memes }
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Catalog from CATALOG_PATH, or the built-in one.
    pub fn load() -> AppResult<Self> {
        match config::CATALOG_PATH.as_deref() {
            Some(path) => {
                log::info!("Loading catalog from {}", path);
                Self::from_json(&std::fs::read_to_string(path)?)
            }
            None => Self::from_json(BUILTIN_CATALOG),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Meme> {
        self.memes.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.memes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memes.is_empty()
    }

    pub fn page(&self, page: usize, page_size: usize) -> CatalogPage<'_> {
        let page_size = page_size.max(1);
        let total_pages = self.memes.len().div_ceil(page_size).max(1);
        let page = page.min(total_pages - 1);
        let start = (page * page_size).min(self.memes.len());
        let end = (start + page_size).min(self.memes.len());
        CatalogPage {
            items: &self.memes[start..end],
            page,
            total_pages,
        }
    }
}
