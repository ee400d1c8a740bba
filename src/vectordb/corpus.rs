//! Intent example corpus: `{intents: [{id, name, examples: [string | {text, ...}]}]}`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{CorpusError, VectorSearchError};
use super::model::IndexPoint;
use super::IntentIndex;
use crate::embedding::{MAX_BATCH, QueryEmbedder};
use crate::hashing::example_point_id;
use crate::intent::Metadata;
use crate::text::TextNormalizer;

#[derive(Debug, Clone, Deserialize)]
pub struct IntentCorpus {
    #[serde(default)]
    pub intents: Vec<IntentExamples>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentExamples {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Example {
    Text(String),
    Detailed {
        text: String,
        #[serde(flatten)]
        extra: Metadata,
    },
}

impl Example {
    pub fn text(&self) -> &str {
        match self {
            Example::Text(t) => t,
            Example::Detailed { text, .. } => text,
        }
    }
}

impl IntentCorpus {
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_json(&raw).map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if corpus.example_count() == 0 {
            return Err(CorpusError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(corpus)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Examples with non-blank text under a non-blank intent id.
    pub fn example_count(&self) -> usize {
        self.intents
            .iter()
            .filter(|i| !i.id.trim().is_empty())
            .flat_map(|i| &i.examples)
            .filter(|e| !e.text().trim().is_empty())
            .count()
    }
}

/// Outcome of [`index_corpus`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub total_examples: usize,
    pub indexed_examples: usize,
    pub failed_embeddings: usize,
}

#[derive(Debug)]
struct Prepared {
    text: String,
    intent_id: String,
    intent_name: String,
    original_text: String,
    language: String,
    extra: Metadata,
}

fn prepare(corpus: &IntentCorpus, normalizer: &TextNormalizer) -> Vec<Prepared> {
    let mut out = Vec::new();
    for intent in &corpus.intents {
        let intent_id = intent.id.trim();
        if intent_id.is_empty() {
            warn!("Skipping corpus intent with empty id");
            continue;
        }
        let intent_name = intent.name.clone().unwrap_or_else(|| intent_id.to_string());

        for example in &intent.examples {
            let original = example.text().trim();
            if original.is_empty() {
                continue;
            }
            let extra = match example {
                Example::Text(_) => Metadata::new(),
                Example::Detailed { extra, .. } => extra.clone(),
            };
            out.push(Prepared {
                text: normalizer.normalize(original),
                intent_id: intent_id.to_string(),
                intent_name: intent_name.clone(),
                original_text: original.to_string(),
                language: normalizer.detect_language(original).code().to_string(),
                extra,
            });
        }
    }
    out
}

/// Normalizes, embeds and upserts every corpus example.
///
/// A failed embedding batch is counted and skipped; index failures abort.
pub async fn index_corpus(
    corpus: &IntentCorpus,
    embedder: &dyn QueryEmbedder,
    index: &dyn IntentIndex,
    normalizer: &TextNormalizer,
) -> Result<IndexReport, VectorSearchError> {
    let prepared = prepare(corpus, normalizer);
    let mut report = IndexReport {
        total_examples: prepared.len(),
        ..IndexReport::default()
    };
    if prepared.is_empty() {
        return Ok(report);
    }

    index.ensure_collection(embedder.dimension() as u64).await?;

    for chunk in prepared.chunks(MAX_BATCH) {
        let texts: Vec<String> = chunk.iter().map(|p| p.text.clone()).collect();
        let vectors = match embedder.embed_batch(&texts).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, batch = chunk.len(), "Embedding batch failed, skipping");
                report.failed_embeddings += chunk.len();
                continue;
            }
        };

        let points: Vec<IndexPoint> = chunk
            .iter()
            .zip(vectors)
            .map(|(p, vector)| IndexPoint {
                id: example_point_id(&p.intent_id, &p.text),
                vector,
                text: p.text.clone(),
                intent_id: p.intent_id.clone(),
                intent_name: p.intent_name.clone(),
                original_text: p.original_text.clone(),
                language: p.language.clone(),
                extra: p.extra.clone(),
            })
            .collect();

        report.indexed_examples += index.upsert(points).await?;
    }

    info!(
        total = report.total_examples,
        indexed = report.indexed_examples,
        failed = report.failed_embeddings,
        backend = index.name(),
        "Indexed intent corpus"
    );
    Ok(report)
}
