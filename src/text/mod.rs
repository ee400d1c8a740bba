//! Query normalization and relevance heuristics.
//!
//! Every matcher works on the output of [`TextNormalizer::normalize`], and the
//! result cache keys on it, so two queries that normalize equally are the same query.

pub mod lexicon;
mod normalizer;


pub use normalizer::{
    AcademicContext, DEFAULT_MAX_KEYWORDS, DEFAULT_MEMO_CAPACITY, DEFAULT_MIN_KEYWORD_LEN,
    Language, MIN_RELEVANT_CHARS, TextNormalizer, TextStatistics, VIETNAMESE_CHAR_RATIO,
    detect_language,
};
