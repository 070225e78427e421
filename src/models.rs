//! Shared data model / 数据模型

use serde::{Deserialize, Serialize};

/// Allowed-roles marker for items everyone can see, guests included
pub const PUBLIC_ROLE: &str = "public";

/// Searchable catalog record (application feature / page / tool) / 注册项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Category tag shown next to the result / 分类标签
    #[serde(default)]
    pub category: String,
    /// Role identifiers allowed to see the item, or `["public"]`
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    /// Static priority added on top of the text score
    #[serde(default)]
    pub priority: f64,
}

fn default_roles() -> Vec<String> {
    vec![PUBLIC_ROLE.to_string()]
}

impl RegistryItem {
    pub fn is_public(&self) -> bool {
        self.roles.iter().any(|r| r == PUBLIC_ROLE)
    }

    /// Guests (`None`) only see public items
    pub fn visible_to(&self, role: Option<&str>) -> bool {
        if self.is_public() {
            return true;
        }
        match role {
            Some(role) => self.roles.iter().any(|r| r == role),
            None => false,
        }
    }
}

/// Registry item with its match score / 带分数的注册项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRegistryItem {
    #[serde(flatten)]
    pub item: RegistryItem,
    pub score: f64,
}

/// Bundled dictionary record / 本地词典条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Canonical written form (dictionary key)
    pub headword: String,
    #[serde(default)]
    pub kanji: Option<String>,
    #[serde(default)]
    pub kana: Option<String>,
    /// Meaning in the display language
    pub meaning: String,
    /// JLPT-style level tag (N5..N1)
    #[serde(default)]
    pub level: Option<String>,
}

/// Where a resolved word came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordSource {
    Local,
    CachedRemote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub reading: Option<String>,
}

/// One meaning group of a word / 义项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    #[serde(default)]
    pub parts_of_speech: Vec<String>,
    /// Definitions, localized into the display language when translation succeeded
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Normalized word produced by the resolver / 解析后的词条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWord {
    pub headword: String,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub is_common: bool,
    #[serde(default)]
    pub levels: Vec<String>,
    pub source: WordSource,
    /// Untouched provider payload kept for later re-rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ResolvedWord {
    pub fn from_entry(entry: &DictionaryEntry) -> Self {
        Self {
            headword: entry.headword.clone(),
            readings: vec![Reading {
                word: entry.kanji.clone().or_else(|| Some(entry.headword.clone())),
                reading: entry.kana.clone(),
            }],
            senses: vec![Sense {
                parts_of_speech: Vec::new(),
                definitions: vec![entry.meaning.clone()],
                tags: entry.level.iter().cloned().collect(),
            }],
            is_common: false,
            levels: entry.level.iter().cloned().collect(),
            source: WordSource::Local,
            raw: None,
        }
    }
}

/// Outcome of a word resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Found { word: ResolvedWord },
    NotFound,
}

impl Resolution {
    pub fn found(&self) -> Option<&ResolvedWord> {
        match self {
            Resolution::Found { word } => Some(word),
            Resolution::NotFound => None,
        }
    }
}

/// Record returned by the content repository / 内容条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Book,
    Chapter,
    Lesson,
}

/// Matched book, chapter or lesson with the ids needed to navigate to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResult {
    pub kind: ContentKind,
    pub id: String,
    pub title: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
}

/// Dictionary bucket entry / 词典结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DictionaryResult {
    /// Placeholder shown while the resolver is still working
    Pending { query: String },
    Entry { word: ResolvedWord },
    /// Resolution exhausted every source; the UI offers a retry
    NotFound { query: String },
}

/// One row of the flattened result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum SearchHit {
    Dictionary(DictionaryResult),
    Registry(RankedRegistryItem),
    Book(ContentResult),
    Chapter(ContentResult),
    Lesson(ContentResult),
}

/// Per-category buckets in display order / 分类结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub dictionary: Vec<DictionaryResult>,
    pub registry: Vec<RankedRegistryItem>,
    pub books: Vec<ContentResult>,
    pub chapters: Vec<ContentResult>,
    pub lessons: Vec<ContentResult>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.dictionary.len()
            + self.registry.len()
            + self.books.len()
            + self.chapters.len()
            + self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Flatten into dictionary → registry → books → chapters → lessons
    pub fn flatten(&self) -> Vec<SearchHit> {
        let mut hits = Vec::with_capacity(self.total());
        hits.extend(self.dictionary.iter().cloned().map(SearchHit::Dictionary));
        hits.extend(self.registry.iter().cloned().map(SearchHit::Registry));
        hits.extend(self.books.iter().cloned().map(SearchHit::Book));
        hits.extend(self.chapters.iter().cloned().map(SearchHit::Chapter));
        hits.extend(self.lessons.iter().cloned().map(SearchHit::Lesson));
        hits
    }

    /// Row at `index` of the flattened order without building the whole list
    pub fn hit_at(&self, index: usize) -> Option<SearchHit> {
        let mut index = index;
        if let Some(d) = self.dictionary.get(index) {
            return Some(SearchHit::Dictionary(d.clone()));
        }
        index -= self.dictionary.len();
        if index < self.registry.len() {
            return Some(SearchHit::Registry(self.registry[index].clone()));
        }
        index -= self.registry.len();
        if index < self.books.len() {
            return Some(SearchHit::Book(self.books[index].clone()));
        }
        index -= self.books.len();
        if index < self.chapters.len() {
            return Some(SearchHit::Chapter(self.chapters[index].clone()));
        }
        index -= self.chapters.len();
        self.lessons.get(index).cloned().map(SearchHit::Lesson)
    }
}
