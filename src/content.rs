//! Content library access / 内容库
//!
//! The library itself (books -> chapters -> lessons) belongs to another
//! service; only its read interface is used here. `None`, empty lists and
//! errors from the repository all count as "no matches".

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config::CategoryLimits;
use crate::error::{LookupError, LookupResult};
use crate::models::{ContentItem, ContentKind, ContentResult};
use crate::text::fold;

/// Read interface of the content library / 内容库读取接口
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn get_books(&self, level: &str) -> anyhow::Result<Option<Vec<ContentItem>>>;

    async fn get_chapters(&self, book_id: &str) -> anyhow::Result<Option<Vec<ContentItem>>>;

    async fn get_lessons(&self, book_id: &str, chapter_id: &str) -> anyhow::Result<Option<Vec<ContentItem>>>;
}

// ---- File-backed library ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Vec<ChapterRecord>,
}

/// Nested library held in memory, keyed by level / 按等级组织的内容库
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentLibrary {
    levels: HashMap<String, Vec<BookRecord>>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(mut self, level: &str, books: Vec<BookRecord>) -> Self {
        self.levels.entry(level.to_string()).or_default().extend(books);
        self
    }

    /// Load a `{ "N5": [book, ...], ... }` JSON file / 从 JSON 文件加载
    pub async fn from_json_file(path: impl AsRef<Path>) -> LookupResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let library: Self = serde_json::from_str(&content)
            .map_err(|e| LookupError::Dataset(format!("{:?}: {}", path, e)))?;
        tracing::info!("Content library loaded: {} books", library.book_count());
        Ok(library)
    }

    pub fn book_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    fn find_book(&self, book_id: &str) -> Option<&BookRecord> {
        self.levels.values().flatten().find(|b| b.id == book_id)
    }
}

fn as_item(id: &str, title: &str, description: &Option<String>) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        description: description.clone(),
    }
}

#[async_trait]
impl ContentRepository for ContentLibrary {
    async fn get_books(&self, level: &str) -> anyhow::Result<Option<Vec<ContentItem>>> {
        Ok(self.levels.get(level).map(|books| {
            books.iter().map(|b| as_item(&b.id, &b.title, &b.description)).collect()
        }))
    }

    async fn get_chapters(&self, book_id: &str) -> anyhow::Result<Option<Vec<ContentItem>>> {
        Ok(self.find_book(book_id).map(|book| {
            book.chapters.iter().map(|c| as_item(&c.id, &c.title, &c.description)).collect()
        }))
    }

    async fn get_lessons(&self, book_id: &str, chapter_id: &str) -> anyhow::Result<Option<Vec<ContentItem>>> {
        Ok(self.find_book(book_id)
            .and_then(|book| book.chapters.iter().find(|c| c.id == chapter_id))
            .map(|chapter| {
                chapter.lessons.iter().map(|l| as_item(&l.id, &l.title, &l.description)).collect()
            }))
    }
}

// ---- Walker ----

/// Book, chapter and lesson matches for one query / 内容搜索结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentMatches {
    pub books: Vec<ContentResult>,
    pub chapters: Vec<ContentResult>,
    pub lessons: Vec<ContentResult>,
}

impl ContentMatches {
    fn is_full(&self, limits: &CategoryLimits) -> bool {
        self.books.len() >= limits.books
            && self.chapters.len() >= limits.chapters
            && self.lessons.len() >= limits.lessons
    }
}

fn item_matches(item: &ContentItem, folded_query: &str) -> bool {
    fold(&item.title).contains(folded_query)
        || item.description.as_deref().is_some_and(|d| fold(d).contains(folded_query))
}

fn or_empty(result: anyhow::Result<Option<Vec<ContentItem>>>, what: &str) -> Vec<ContentItem> {
    match result {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Content repository failed on {}, treating as empty: {}", what, e);
            Vec::new()
        }
    }
}

/// Walk levels -> books -> chapters -> lessons collecting matches up to the caps.
///
/// Chapters are visited even when their book does not match, so a lesson
/// title can match inside an unrelated book.
pub async fn search_content(
    repo: &dyn ContentRepository,
    query: &str,
    levels: &[String],
    limits: &CategoryLimits,
) -> ContentMatches {
    let mut matches = ContentMatches::default();
    let folded = fold(query.trim());
    if folded.is_empty() {
        return matches;
    }

    'levels: for level in levels {
        let books = or_empty(repo.get_books(level).await, &format!("books of {}", level));
        for book in books {
            if matches.books.len() < limits.books && item_matches(&book, &folded) {
                matches.books.push(ContentResult {
                    kind: ContentKind::Book,
                    id: book.id.clone(),
                    title: book.title.clone(),
                    level: level.clone(),
                    book_id: None,
                    chapter_id: None,
                });
            }

            let chapters = or_empty(repo.get_chapters(&book.id).await, &format!("chapters of {}", book.id));

            // lesson lists of one book are fetched together; order is preserved
            let lesson_lists = if matches.lessons.len() < limits.lessons {
                join_all(chapters.iter().map(|c| repo.get_lessons(&book.id, &c.id))).await
            } else {
                Vec::new()
            };
            let mut lesson_lists = lesson_lists.into_iter();

            for chapter in &chapters {
                if matches.chapters.len() < limits.chapters && item_matches(chapter, &folded) {
                    matches.chapters.push(ContentResult {
                        kind: ContentKind::Chapter,
                        id: chapter.id.clone(),
                        title: chapter.title.clone(),
                        level: level.clone(),
                        book_id: Some(book.id.clone()),
                        chapter_id: None,
                    });
                }

                if let Some(result) = lesson_lists.next() {
                    let lessons = or_empty(result, &format!("lessons of {}/{}", book.id, chapter.id));
                    for lesson in lessons.iter().filter(|l| item_matches(l, &folded)) {
                        if matches.lessons.len() >= limits.lessons {
                            break;
                        }
                        matches.lessons.push(ContentResult {
                            kind: ContentKind::Lesson,
                            id: lesson.id.clone(),
                            title: lesson.title.clone(),
                            level: level.clone(),
                            book_id: Some(book.id.clone()),
                            chapter_id: Some(chapter.id.clone()),
                        });
                    }
                }

                if matches.is_full(limits) {
                    break 'levels;
                }
            }
        }
    }

    tracing::debug!(
        "content search {:?}: {} books, {} chapters, {} lessons",
        query,
        matches.books.len(),
        matches.chapters.len(),
        matches.lessons.len()
    );
    matches
}
