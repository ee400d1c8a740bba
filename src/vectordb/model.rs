use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{ListValue, ScoredPoint, Struct, Value as QdrantValue};
use serde::Serialize;

use crate::intent::{FALLBACK_INTENT_ID, Metadata, SearchCandidate};

pub const PAYLOAD_TEXT: &str = "text";
pub const PAYLOAD_INTENT_ID: &str = "intent_id";
pub const PAYLOAD_INTENT_NAME: &str = "intent_name";
pub const PAYLOAD_ORIGINAL_TEXT: &str = "original_text";
pub const PAYLOAD_LANGUAGE: &str = "language";

/// One embedded example utterance ready for upsert.
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    /// Normalized example text; this is what reranking compares against.
    pub text: String,
    pub intent_id: String,
    pub intent_name: String,
    pub original_text: String,
    pub language: String,
    pub extra: Metadata,
}

impl IndexPoint {
    /// Full payload, extra fields first so the fixed fields always win.
    pub fn payload(&self) -> Metadata {
        let mut payload = self.extra.clone();
        payload.insert(PAYLOAD_TEXT.into(), self.text.clone().into());
        payload.insert(PAYLOAD_INTENT_ID.into(), self.intent_id.clone().into());
        payload.insert(PAYLOAD_INTENT_NAME.into(), self.intent_name.clone().into());
        payload.insert(PAYLOAD_ORIGINAL_TEXT.into(), self.original_text.clone().into());
        payload.insert(PAYLOAD_LANGUAGE.into(), self.language.clone().into());
        payload
    }

    pub(crate) fn qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        self.payload()
            .into_iter()
            .map(|(k, v)| (k, json_to_qdrant(v)))
            .collect()
    }
}

/// Builds a candidate from a payload map; missing fields degrade to defaults.
pub fn candidate_from_payload(score: f32, payload: Metadata, source: &str) -> SearchCandidate {
    let text = payload
        .get(PAYLOAD_TEXT)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let intent_id = payload
        .get(PAYLOAD_INTENT_ID)
        .and_then(|v| v.as_str())
        .unwrap_or(FALLBACK_INTENT_ID)
        .to_string();

    SearchCandidate {
        text,
        intent_id,
        score,
        metadata: payload,
        source: source.to_string(),
    }
}

pub(crate) fn candidate_from_scored_point(point: ScoredPoint) -> SearchCandidate {
    let mut payload: Metadata = point
        .payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_to_json(v)))
        .collect();

    if let Some(PointIdOptions::Num(n)) = point.id.and_then(|pid| pid.point_id_options) {
        payload.entry("point_id".to_string()).or_insert(n.into());
    }

    candidate_from_payload(point.score, payload, "qdrant")
}

pub(crate) fn json_to_qdrant(value: serde_json::Value) -> QdrantValue {
    use serde_json::Value as J;

    let kind = match value {
        J::Null => Kind::NullValue(0),
        J::Bool(b) => Kind::BoolValue(b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        J::String(s) => Kind::StringValue(s),
        J::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant).collect(),
        }),
        J::Object(map) => Kind::StructValue(Struct {
            fields: map.into_iter().map(|(k, v)| (k, json_to_qdrant(v))).collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

pub(crate) fn qdrant_to_json(value: QdrantValue) -> serde_json::Value {
    use serde_json::Value as J;

    match value.kind {
        None | Some(Kind::NullValue(_)) => J::Null,
        Some(Kind::BoolValue(b)) => J::Bool(b),
        Some(Kind::IntegerValue(i)) => J::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(J::Number)
            .unwrap_or(J::Null),
        Some(Kind::StringValue(s)) => J::String(s),
        Some(Kind::ListValue(list)) => {
            J::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(s)) => J::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_to_json(v)))
                .collect(),
        ),
    }
}

/// Snapshot of an index for `get_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub backend: String,
    pub collection: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexStats {
    pub fn unavailable(backend: &str, collection: &str, error: impl ToString) -> Self {
        Self {
            backend: backend.to_string(),
            collection: collection.to_string(),
            available: false,
            points_count: None,
            error: Some(error.to_string()),
        }
    }
}
