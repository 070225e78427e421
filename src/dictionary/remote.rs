//! Remote dictionary and translation providers / 远程词典与翻译服务
//!
//! Providers are unreliable by assumption. They only report what happened on
//! one attempt; retries, timeouts and failover live in the chain.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LookupError, LookupResult};
use crate::models::Reading;

/// Provider-neutral lookup payload / 统一的查词结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteLookup {
    pub found: bool,
    pub readings: Vec<Reading>,
    pub senses: Vec<RemoteSense>,
    pub is_common: bool,
    pub levels: Vec<String>,
    pub raw: Value,
}

impl RemoteLookup {
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSense {
    pub parts_of_speech: Vec<String>,
    /// Definitions in the provider's language (English for Jisho)
    pub definitions: Vec<String>,
    pub tags: Vec<String>,
}

/// `lookup(word) -> {found, readings, senses}` contract
#[async_trait]
pub trait WordProvider: Send + Sync {
    async fn lookup(&self, word: &str) -> LookupResult<RemoteLookup>;
}

/// `translate(text, target_lang) -> text` contract
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> LookupResult<String>;
}

// ---- Jisho-compatible lookup ----

#[derive(Debug, Deserialize)]
struct JishoResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JishoEntry {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    is_common: Option<bool>,
    #[serde(default)]
    jlpt: Vec<String>,
    #[serde(default)]
    japanese: Vec<Reading>,
    #[serde(default)]
    senses: Vec<JishoSense>,
}

#[derive(Debug, Deserialize)]
struct JishoSense {
    #[serde(default)]
    english_definitions: Vec<String>,
    #[serde(default)]
    parts_of_speech: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Word lookup against the Jisho search API or a mirror of it / Jisho 查词
pub struct JishoProvider {
    name: String,
    base_url: String,
    client: Client,
}

impl JishoProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(name, base_url, Client::new())
    }

    pub fn with_client(name: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client,
        }
    }

    fn failure(&self, reason: impl ToString) -> LookupError {
        LookupError::RemoteFailure {
            endpoint: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// "jlpt-n5" -> "N5"
fn level_tag(tag: &str) -> String {
    tag.trim_start_matches("jlpt-").to_uppercase()
}

fn matches_word(entry: &JishoEntry, word: &str) -> bool {
    entry.slug == word
        || entry.japanese.iter().any(|r| {
            r.word.as_deref() == Some(word) || r.reading.as_deref() == Some(word)
        })
}

/// Pick the entry for `word` from a Jisho response and normalize it
fn normalize_jisho(data: Vec<Value>, word: &str) -> LookupResult<RemoteLookup> {
    let mut parsed = Vec::with_capacity(data.len());
    for raw in data {
        let entry: JishoEntry = serde_json::from_value(raw.clone())
            .map_err(|e| LookupError::RemoteFailure {
                endpoint: "jisho".to_string(),
                reason: format!("unexpected entry shape: {}", e),
            })?;
        parsed.push((entry, raw));
    }

    let pick = parsed.iter().position(|(entry, _)| matches_word(entry, word)).unwrap_or(0);
    let Some((entry, raw)) = parsed.into_iter().nth(pick) else {
        return Ok(RemoteLookup::not_found());
    };

    Ok(RemoteLookup {
        found: true,
        readings: entry.japanese,
        senses: entry.senses.into_iter()
            .map(|s| RemoteSense {
                parts_of_speech: s.parts_of_speech,
                definitions: s.english_definitions,
                tags: s.tags,
            })
            .collect(),
        is_common: entry.is_common.unwrap_or(false),
        levels: entry.jlpt.iter().map(|t| level_tag(t)).collect(),
        raw,
    })
}

#[async_trait]
impl WordProvider for JishoProvider {
    async fn lookup(&self, word: &str) -> LookupResult<RemoteLookup> {
        let resp = self.client.get(&self.base_url)
            .query(&[("keyword", word)])
            .send()
            .await
            .map_err(|e| self.failure(e))?
            .error_for_status()
            .map_err(|e| self.failure(e))?;

        let body: JishoResponse = resp.json().await.map_err(|e| self.failure(e))?;
        normalize_jisho(body.data, word)
    }
}

// ---- Google-translate-compatible translation ----

/// Translation through the public `translate_a/single` endpoint / 谷歌翻译
pub struct GoogleTranslator {
    base_url: String,
    client: Client,
}

impl GoogleTranslator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

/// Concatenate the translated segments of a `[[["dịch","src",...],...],...]` body
fn parse_google_body(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments.iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> LookupResult<String> {
        let resp = self.client.get(&self.base_url)
            .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target_lang), ("dt", "t"), ("q", text)])
            .send()
            .await
            .map_err(|e| LookupError::TranslationFailure(e.to_string()))?
            .error_for_status()
            .map_err(|e| LookupError::TranslationFailure(e.to_string()))?;

        let body: Value = resp.json().await
            .map_err(|e| LookupError::TranslationFailure(e.to_string()))?;
        parse_google_body(&body)
            .ok_or_else(|| LookupError::TranslationFailure("empty translation".to_string()))
    }
}
