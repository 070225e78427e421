//! Weighted fuzzy matcher over registry items / 注册项加权模糊匹配
//!
//! Pure and synchronous. Each item accumulates a score from its title,
//! description and keywords; the static priority is added on top when the text
//! matched at all.

use crate::models::{RankedRegistryItem, RegistryItem};
use crate::text::{fold, normalize_query};

const TITLE_EXACT: f64 = 1000.0;
const TITLE_PREFIX: f64 = 500.0;
const TITLE_CONTAINS: f64 = 200.0;
const TITLE_FUZZY_SCALE: f64 = 10.0;
const TITLE_DIACRITIC_BONUS: f64 = 150.0;

const DESCRIPTION_CONTAINS: f64 = 100.0;
const DESCRIPTION_FUZZY_SCALE: f64 = 5.0;

const KEYWORD_EXACT: f64 = 400.0;
const KEYWORD_CONTAINS: f64 = 300.0;
const KEYWORD_DIACRITIC: f64 = 250.0;
const KEYWORD_FUZZY_SCALE: f64 = 8.0;

/// Ordered-subsequence fuzzy score.
///
/// Consecutive matched characters earn increasing credit (`1 + run`). Returns 0
/// unless every query character is found in order.
pub fn fuzzy_score(text: &str, query: &str) -> f64 {
    let text_chars: Vec<char> = text.chars().collect();
    let query_chars: Vec<char> = query.chars().collect();
    if query_chars.is_empty() || text_chars.is_empty() {
        return 0.0;
    }

    let mut qi = 0;
    let mut run = 0usize;
    let mut score = 0.0;
    for &c in &text_chars {
        if qi < query_chars.len() && c == query_chars[qi] {
            score += 1.0 + run as f64;
            run += 1;
            qi += 1;
        } else {
            run = 0;
        }
    }

    if qi < query_chars.len() {
        return 0.0;
    }

    if text == query {
        score += 100.0;
    } else if text.starts_with(query) {
        score += 50.0;
    }

    let len_diff = text_chars.len().abs_diff(query_chars.len()) as f64;
    (score - 0.5 * len_diff).max(0.0)
}

/// Prepared query: lowercase and diacritic-folded forms computed once per search
struct PreparedQuery {
    lower: String,
    folded: String,
}

impl PreparedQuery {
    fn new(query: &str) -> Self {
        let lower = normalize_query(query);
        let folded = fold(&lower);
        Self { lower, folded }
    }
}

fn score_title(title: &str, q: &PreparedQuery) -> f64 {
    let title = title.to_lowercase();
    let mut score = if title == q.lower {
        TITLE_EXACT
    } else if title.starts_with(&q.lower) {
        TITLE_PREFIX
    } else if title.contains(&q.lower) {
        TITLE_CONTAINS
    } else {
        fuzzy_score(&title, &q.lower) * TITLE_FUZZY_SCALE
    };

    if !title.contains(&q.lower) && fold(&title).contains(&q.folded) {
        score += TITLE_DIACRITIC_BONUS;
    }
    score
}

fn score_description(description: &str, q: &PreparedQuery) -> f64 {
    let description = description.to_lowercase();
    if description.contains(&q.lower) {
        DESCRIPTION_CONTAINS
    } else {
        fuzzy_score(&description, &q.lower) * DESCRIPTION_FUZZY_SCALE
    }
}

fn score_keywords(keywords: &[String], q: &PreparedQuery) -> f64 {
    let mut score = 0.0;
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if keyword == q.lower {
            // exact keyword hit ends keyword scoring for this item
            score += KEYWORD_EXACT;
            break;
        } else if keyword.contains(&q.lower) {
            score += KEYWORD_CONTAINS;
        } else if fold(&keyword).contains(&q.folded) {
            score += KEYWORD_DIACRITIC;
        } else {
            score += fuzzy_score(&keyword, &q.lower) * KEYWORD_FUZZY_SCALE;
        }
    }
    score
}

fn score_prepared(item: &RegistryItem, q: &PreparedQuery) -> f64 {
    let text_score = score_title(&item.title, q)
        + score_description(&item.description, q)
        + score_keywords(&item.keywords, q);

    if text_score > 0.0 {
        text_score + item.priority
    } else {
        0.0
    }
}

/// Score a single item against a query (0 means no match) / 计算单项分数
pub fn score_item(item: &RegistryItem, query: &str) -> f64 {
    let q = PreparedQuery::new(query);
    if q.lower.is_empty() {
        return 0.0;
    }
    score_prepared(item, &q)
}

/// Filter by role, score, drop non-matches and sort descending / 搜索
pub fn search_items(items: &[RegistryItem], query: &str, role: Option<&str>) -> Vec<RankedRegistryItem> {
    let q = PreparedQuery::new(query);
    if q.lower.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<RankedRegistryItem> = items
        .iter()
        .filter(|item| item.visible_to(role))
        .filter_map(|item| {
            let score = score_prepared(item, &q);
            (score > 0.0).then(|| RankedRegistryItem {
                item: item.clone(),
                score,
            })
        })
        .collect();

    // stable sort keeps catalog order for ties
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, title: &str, description: &str, keywords: &[&str], roles: &[&str], priority: f64) -> RegistryItem {
        RegistryItem {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: "page".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            priority,
        }
    }

    fn level_selection() -> RegistryItem {
        item("level", "Level Selection", "", &["level", "cap do", "l"], &["public"], 95.0)
    }

    fn is_subsequence(needle: &str, haystack: &str) -> bool {
        let mut hay = haystack.chars();
        needle.chars().all(|c| hay.any(|h| h == c))
    }

    #[test]
    fn test_fuzzy_score_runs() {
        // "abc" in "abc": 1 + 2 + 3, +100 exact, no length penalty
        assert_eq!(fuzzy_score("abc", "abc"), 106.0);
        // "ac" in "abc": 1 + 1, no prefix bonus ("abc" does not start with "ac"), -0.5
        assert_eq!(fuzzy_score("abc", "ac"), 1.5);
        // prefix bonus
        assert_eq!(fuzzy_score("abcd", "ab"), 1.0 + 2.0 + 50.0 - 1.0);
        assert_eq!(fuzzy_score("abc", "cb"), 0.0);
        assert_eq!(fuzzy_score("", "a"), 0.0);
    }

    #[test]
    fn test_fuzzy_score_floors_at_zero() {
        let long = format!("x{}", "y".repeat(40));
        assert_eq!(fuzzy_score(&long, "x"), 1.0 + 50.0 - 20.0);
        let longer = format!("x{}", "y".repeat(400));
        assert_eq!(fuzzy_score(&longer, "x"), 0.0);
    }

    #[test]
    fn test_level_selection_keyword_exact() {
        let score = score_item(&level_selection(), "l");
        assert!(score >= 400.0 + 95.0, "score was {}", score);
    }

    #[test]
    fn test_title_tiers() {
        let it = item("x", "Flashcards", "", &[], &["public"], 0.0);
        assert_eq!(score_item(&it, "flashcards"), TITLE_EXACT);
        assert_eq!(score_item(&it, "flash"), TITLE_PREFIX);
        assert_eq!(score_item(&it, "cards"), TITLE_CONTAINS);
        assert_eq!(score_item(&it, "fshc"), fuzzy_score("flashcards", "fshc") * TITLE_FUZZY_SCALE);
    }

    #[test]
    fn test_diacritic_insensitive_title_bonus() {
        let it = item("x", "Cấp độ", "", &[], &["public"], 0.0);
        let score = score_item(&it, "cap do");
        assert!(score >= TITLE_DIACRITIC_BONUS);
        // accented query on accented title: plain exact match, no bonus
        assert_eq!(score_item(&it, "cấp độ"), TITLE_EXACT);
    }

    #[test]
    fn test_keyword_contains_accumulates() {
        let it = item("x", "Zzz", "", &["vocabulary", "vocab list"], &["public"], 0.0);
        assert_eq!(score_item(&it, "vocab"), KEYWORD_CONTAINS * 2.0);
    }

    #[test]
    fn test_keyword_exact_stops_scoring() {
        let it = item("x", "Zzz", "", &["vocab", "vocab list"], &["public"], 0.0);
        assert_eq!(score_item(&it, "vocab"), KEYWORD_EXACT);
    }

    #[test]
    fn test_keyword_diacritic_match() {
        let it = item("x", "Zzz", "", &["từ vựng"], &["public"], 0.0);
        assert_eq!(score_item(&it, "tu vung"), KEYWORD_DIACRITIC);
    }

    #[test]
    fn test_priority_only_added_on_match() {
        let it = item("x", "Flashcards", "", &[], &["public"], 50.0);
        assert_eq!(score_item(&it, "qqq"), 0.0);
        assert_eq!(score_item(&it, "flashcards"), TITLE_EXACT + 50.0);
    }

    #[test]
    fn test_role_filter() {
        let items = vec![
            item("pub", "Dictionary", "", &[], &["public"], 0.0),
            item("adm", "Dictionary Admin", "", &[], &["admin"], 0.0),
            item("tch", "Dictionary Review", "", &[], &["teacher", "admin"], 0.0),
        ];
        let ids = |role| search_items(&items, "dictionary", role)
            .into_iter()
            .map(|r| r.item.id)
            .collect::<Vec<_>>();

        assert_eq!(ids(None), vec!["pub"]);
        assert_eq!(ids(Some("student")), vec!["pub"]);
        assert_eq!(ids(Some("teacher")), vec!["pub", "tch"]);
        assert_eq!(ids(Some("admin")).len(), 3);
    }

    #[test]
    fn test_sorted_descending_and_empty_query() {
        let items = vec![
            item("a", "Grammar Library", "", &[], &["public"], 0.0),
            item("b", "Grammar", "", &[], &["public"], 0.0),
        ];
        let results = search_items(&items, "grammar", None);
        assert_eq!(results[0].item.id, "b");
        assert!(results[0].score > results[1].score);
        assert!(search_items(&items, "   ", None).is_empty());
    }

    #[test]
    fn test_positive_score_implies_subsequence() {
        let catalog = crate::registry::Catalog::builtin();
        for query in ["l", "lv", "kanji", "tu vung", "cấp", "exm", "dash", "zzqx", "ng", "漢"] {
            for ranked in search_items(catalog.items(), query, Some("admin")) {
                let q = fold(&normalize_query(query));
                let it = &ranked.item;
                let fields = std::iter::once(&it.title)
                    .chain(std::iter::once(&it.description))
                    .chain(it.keywords.iter());
                let matched = fields.map(|f| fold(f)).any(|f| is_subsequence(&q, &f));
                assert!(matched, "{} scored {} for {:?} without a subsequence match", it.id, ranked.score, query);
            }
        }
    }
}
