use std::collections::HashSet;

use moka::sync::Cache;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::lexicon::{
    ABBREVIATIONS, ACADEMIC_PATTERNS, CAMPUS_PATTERNS, DOMAIN_KEYWORDS, IRRELEVANT_PATTERNS,
    PROGRAM_PATTERNS, STOP_WORDS,
};

/// Queries shorter than this (in characters, after trimming) are never relevant.
pub const MIN_RELEVANT_CHARS: usize = 3;

/// Share of non-ASCII letters above which text is treated as Vietnamese.
pub const VIETNAMESE_CHAR_RATIO: f32 = 0.1;

pub const DEFAULT_MEMO_CAPACITY: u64 = 1024;

pub const DEFAULT_MIN_KEYWORD_LEN: usize = 2;
pub const DEFAULT_MAX_KEYWORDS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    #[serde(rename = "vi")]
    Vietnamese,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Vietnamese => "vi",
            Language::English => "en",
            Language::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Domain vocabulary found in a query.
pub struct AcademicContext {
    pub academic_terms: Vec<String>,
    pub programs: Vec<String>,
    pub campuses: Vec<String>,
    pub domain_keywords: Vec<String>,
}

impl AcademicContext {
    pub fn is_empty(&self) -> bool {
        self.academic_terms.is_empty()
            && self.programs.is_empty()
            && self.campuses.is_empty()
            && self.domain_keywords.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStatistics {
    pub length: usize,
    pub word_count: usize,
    pub language: Language,
    pub keywords: Vec<String>,
    pub academic_context: AcademicContext,
    pub is_irrelevant: bool,
}

struct Phrase {
    words: Vec<&'static str>,
}

impl Phrase {
    fn new(text: &'static str) -> Self {
        Self {
            words: text.split(' ').collect(),
        }
    }
}

struct Abbreviation {
    key: Phrase,
    expansion: &'static str,
}

/// Lowercases, NFC-normalizes, collapses whitespace and expands the domain
/// abbreviation table. Also hosts the relevance and keyword heuristics that
/// operate on normalized text.
///
/// `normalize` is deterministic and idempotent. Results are memoized in a
/// bounded cache since the same query is normalized by several stages.
pub struct TextNormalizer {
    abbreviations: Vec<Abbreviation>,
    expansions: Vec<Phrase>,
    irrelevant: Vec<Regex>,
    academic: Vec<Regex>,
    programs: Vec<(&'static str, Regex)>,
    campuses: Vec<(&'static str, Regex)>,
    domain: Regex,
    word: Regex,
    stop_words: HashSet<&'static str>,
    domain_words: HashSet<&'static str>,
    memo: Cache<String, String>,
}

fn alternation(pattern: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).expect("built-in lexicon pattern is valid")
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::with_memo_capacity(DEFAULT_MEMO_CAPACITY)
    }

    pub fn with_memo_capacity(capacity: u64) -> Self {
        let mut abbreviations: Vec<Abbreviation> = ABBREVIATIONS
            .iter()
            .map(|(key, expansion)| Abbreviation {
                key: Phrase::new(key),
                expansion,
            })
            .collect();
        // Longest key first so "fpt edu" wins over "fpt".
        abbreviations.sort_by(|a, b| b.key.words.len().cmp(&a.key.words.len()));

        let mut expansions: Vec<Phrase> = Vec::new();
        for (_, expansion) in ABBREVIATIONS {
            if !expansions.iter().any(|p| p.words.join(" ") == *expansion) {
                expansions.push(Phrase::new(expansion));
            }
        }
        expansions.sort_by(|a, b| b.words.len().cmp(&a.words.len()));

        Self {
            abbreviations,
            expansions,
            irrelevant: IRRELEVANT_PATTERNS.iter().map(|p| alternation(p)).collect(),
            academic: ACADEMIC_PATTERNS.iter().map(|p| alternation(p)).collect(),
            programs: PROGRAM_PATTERNS
                .iter()
                .map(|(name, p)| (*name, alternation(p)))
                .collect(),
            campuses: CAMPUS_PATTERNS
                .iter()
                .map(|(name, p)| (*name, alternation(p)))
                .collect(),
            domain: alternation(&DOMAIN_KEYWORDS.join("|")),
            word: Regex::new(r"\w+").expect("word pattern is valid"),
            stop_words: STOP_WORDS.iter().copied().collect(),
            domain_words: DOMAIN_KEYWORDS.iter().copied().collect(),
            memo: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Canonical form of `text` used by every matcher and as the cache key input.
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        if let Some(hit) = self.memo.get(text) {
            return hit;
        }

        let lowered: String = text.to_lowercase().nfc().collect();
        let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = self.expand_abbreviations(&collapsed);

        self.memo.insert(text.to_string(), normalized.clone());
        normalized
    }

    /// Replaces punctuation and symbols with spaces, then normalizes.
    pub fn clean_query(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let stripped: String = text
            .chars()
            .map(|c| {
                if is_word_char(c) || c.is_whitespace() || c == '_' {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        self.normalize(&stripped)
    }

    /// Single left-to-right pass over word tokens. Text that already spells an
    /// expansion is skipped verbatim, which keeps the pass idempotent.
    fn expand_abbreviations(&self, text: &str) -> String {
        let spans: Vec<(usize, usize)> = word_spans(text);
        let mut out = String::with_capacity(text.len() + 16);
        let mut cursor = 0;
        let mut i = 0;

        while i < spans.len() {
            if let Some(n) = self
                .expansions
                .iter()
                .find_map(|p| phrase_at(text, &spans, i, p))
            {
                i += n;
                continue;
            }

            if let Some((n, expansion)) = self
                .abbreviations
                .iter()
                .find_map(|a| phrase_at(text, &spans, i, &a.key).map(|n| (n, a.expansion)))
            {
                out.push_str(&text[cursor..spans[i].0]);
                out.push_str(expansion);
                cursor = spans[i + n - 1].1;
                i += n;
                continue;
            }

            i += 1;
        }

        out.push_str(&text[cursor..]);
        out
    }

    /// Domain vocabulary present in `text` (after normalization).
    pub fn academic_context(&self, text: &str) -> AcademicContext {
        let normalized = self.normalize(text);
        let mut context = AcademicContext::default();
        if normalized.is_empty() {
            return context;
        }

        for pattern in &self.academic {
            context
                .academic_terms
                .extend(pattern.find_iter(&normalized).map(|m| m.as_str().to_string()));
        }
        for (name, pattern) in &self.programs {
            if pattern.is_match(&normalized) {
                context.programs.push((*name).to_string());
            }
        }
        for (name, pattern) in &self.campuses {
            if pattern.is_match(&normalized) {
                context.campuses.push((*name).to_string());
            }
        }
        context.domain_keywords = self
            .domain
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect();

        context
    }

    /// `true` for input that is too short, or that hits an off-topic family
    /// without any domain vocabulary. Domain vocabulary always wins.
    pub fn is_irrelevant(&self, text: &str) -> bool {
        if text.trim().chars().count() < MIN_RELEVANT_CHARS {
            return true;
        }

        if !self.academic_context(text).is_empty() {
            return false;
        }

        let normalized = self.normalize(text);
        self.irrelevant.iter().any(|p| p.is_match(&normalized))
    }

    /// Distinct non-stopword tokens, domain words first.
    pub fn extract_keywords(&self, text: &str, min_len: usize, max_keywords: usize) -> Vec<String> {
        let normalized = self.normalize(text);
        let mut keywords: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for word in self.word.find_iter(&normalized).map(|m| m.as_str()) {
            if keywords.len() >= max_keywords {
                break;
            }
            if word.chars().count() < min_len
                || self.stop_words.contains(word)
                || word.chars().all(|c| c.is_numeric())
                || !seen.insert(word)
            {
                continue;
            }

            if self.domain_words.contains(word) {
                keywords.insert(0, word.to_string());
            } else {
                keywords.push(word.to_string());
            }
        }

        keywords
    }

    pub fn detect_language(&self, text: &str) -> Language {
        detect_language(text)
    }

    pub fn text_statistics(&self, text: &str) -> TextStatistics {
        TextStatistics {
            length: text.chars().count(),
            word_count: text.split_whitespace().count(),
            language: detect_language(text),
            keywords: self.extract_keywords(text, DEFAULT_MIN_KEYWORD_LEN, DEFAULT_MAX_KEYWORDS),
            academic_context: self.academic_context(text),
            is_irrelevant: self.is_irrelevant(text),
        }
    }

    /// Drops memoized normalizations.
    pub fn clear_cache(&self) {
        self.memo.invalidate_all();
    }

    /// Number of memoized normalizations (approximate until pending tasks run).
    pub fn memo_len(&self) -> u64 {
        self.memo.run_pending_tasks();
        self.memo.entry_count()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextNormalizer")
            .field("abbreviations", &self.abbreviations.len())
            .field("memoized", &self.memo.entry_count())
            .finish()
    }
}

/// `vi` when more than 10% of letters are non-ASCII, `en` otherwise, `unknown`
/// when there are no letters.
pub fn detect_language(text: &str) -> Language {
    let (non_ascii, total) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(n, t), c| {
            (n + usize::from(!c.is_ascii()), t + 1)
        });

    if total == 0 {
        return Language::Unknown;
    }

    if non_ascii as f32 / total as f32 > VIETNAMESE_CHAR_RATIO {
        Language::Vietnamese
    } else {
        Language::English
    }
}

/// Letters, digits and combining marks. A mark left over after NFC belongs
/// to the word it follows.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c)
}

/// Byte spans of maximal word-character runs.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

/// Number of words consumed if `phrase` occurs at word `i`, words joined by single spaces.
fn phrase_at(text: &str, spans: &[(usize, usize)], i: usize, phrase: &Phrase) -> Option<usize> {
    let n = phrase.words.len();
    if i + n > spans.len() {
        return None;
    }

    for (j, expected) in phrase.words.iter().enumerate() {
        let (start, end) = spans[i + j];
        if &text[start..end] != *expected {
            return None;
        }
        if j > 0 && &text[spans[i + j - 1].1..start] != " " {
            return None;
        }
    }

    Some(n)
}
