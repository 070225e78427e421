//! Text helpers shared by the matcher, resolver and orchestrator / 文本工具
//!
//! - Query normalization (trim + lowercase + whitespace collapse)
//! - Diacritic folding for Vietnamese / Latin text
//! - Japanese script detection (kana + Han ideographs)

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Check if text contains Japanese script (kana or Han ideographs) / 检测文本是否包含日文字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
        '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
        '\u{f900}'..='\u{faff}' |  // CJK Compatibility Ideographs
        '\u{3040}'..='\u{309f}' |  // Hiragana
        '\u{30a0}'..='\u{30ff}' |  // Katakana
        '\u{ff66}'..='\u{ff9f}'    // Halfwidth Katakana
    )
}

/// Normalize a query: trim, lowercase, collapse inner whitespace / 标准化查询
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Key form of a headword, used for cache keys and exact dictionary lookups.
///
/// NFKC folds full-width Latin and half-width katakana into their canonical forms.
pub fn normalize_headword(word: &str) -> String {
    let folded: String = word.nfkc().collect();
    folded.trim().to_lowercase()
}

/// Remove combining marks so "cấp độ" compares equal to "cap do" / 去除变音符号
///
/// `đ` is a base letter rather than a combining sequence, so it is mapped by hand.
/// Kana voicing marks (U+3099/U+309A) are kept and recomposed.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c) || matches!(c, '\u{3099}' | '\u{309a}'))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            _ => c,
        })
        .nfc()
        .collect()
}

/// Lowercase + diacritic-stripped form used for accent-insensitive comparisons
pub fn fold(text: &str) -> String {
    strip_diacritics(&text.to_lowercase())
}

/// True when the text is exactly one whitespace-delimited token
pub fn is_single_token(text: &str) -> bool {
    let mut parts = text.split_whitespace();
    parts.next().is_some() && parts.next().is_none()
}

/// Fold katakana into hiragana so kana spellings compare equal / 片假名转平假名
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{30a1}'..='\u{30f6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}
