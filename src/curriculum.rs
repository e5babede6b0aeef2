pub mod access;

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

/// Curriculum shipped with the binary, used when no curriculum file is configured.
const BUILTIN_CURRICULUM: &str = include_str!("../curriculum.toml");

/// A single lesson, identified by its unique path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Lesson {
    /// Unique path of the lesson, e.g. "/materi/bab1/pengenalan"
    pub path: String,
    /// Display label
    pub label: String,
}

/// An ordered group of lessons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Chapter {
    pub id: u32,
    pub title: String,
    /// Icon key used by the front-end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    chapters: Vec<Chapter>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("lesson path {0} appears more than once in the curriculum")]
    DuplicateLesson(String),
    #[error("curriculum has no lessons")]
    Empty,
    #[error("failed to parse curriculum: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read curriculum: {0}")]
    Io(#[from] std::io::Error),
}

/// The full chapter/lesson tree together with its flattened lesson order.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    chapters: Vec<Chapter>,
    /// Lesson paths in teaching order: chapter order, then lesson order within the chapter
    order: Vec<String>,
    /// Lesson path -> position in `order`
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(chapters: Vec<Chapter>) -> Result<Self, CatalogError> {
        let order: Vec<String> = chapters
            .iter()
            .flat_map(|ch| ch.lessons.iter().map(|lesson| lesson.path.clone()))
            .collect();
        if order.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut index = HashMap::with_capacity(order.len());
        for (i, path) in order.iter().enumerate() {
            if index.insert(path.clone(), i).is_some() {
                return Err(CatalogError::DuplicateLesson(path.clone()));
            }
        }
        Ok(Self {
            chapters,
            order,
            index,
        })
    }

    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file = toml::from_str::<CatalogFile>(s)?;
        Self::new(file.chapters)
    }

    /// Load a curriculum from a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        info!("Loading curriculum from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CURRICULUM)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.chapters.iter().flat_map(|ch| ch.lessons.iter())
    }

    /// Lesson paths in teaching order
    pub fn lesson_paths(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of a lesson in teaching order
    pub fn position(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }
}
