// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-step metrics.
//!
//! Every step carries a reserved `durationNs` plus an open map of named
//! values. On the wire the two are flattened into a single object.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(i64::from(v))
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// Metrics recorded on a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Wall-clock duration of the step in nanoseconds.
    #[serde(default)]
    pub duration_ns: u64,

    /// Additional named metrics.
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetricValue>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_ns(duration_ns: u64) -> Self {
        Self {
            duration_ns,
            ..Default::default()
        }
    }

    /// Set a named metric. The reserved `durationNs` key updates the duration.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        let key = key.into();
        let value = value.into();
        if key == DURATION_KEY {
            if let Some(ns) = value.as_i64() {
                self.duration_ns = u64::try_from(ns).unwrap_or(0);
            }
            return;
        }
        self.extra.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.extra.get(key)
    }

    /// Merge `other` into `self`; keys in `other` win, a zero duration does not.
    pub fn merge(&mut self, other: &Metrics) {
        if other.duration_ns > 0 {
            self.duration_ns = other.duration_ns;
        }
        for (k, v) in &other.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }

    /// Flatten into the wire object (`durationNs` plus dynamic keys).
    pub fn to_wire(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

const DURATION_KEY: &str = "durationNs";

/// Token and latency metrics reported for an LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmMetrics {
    pub num_input_tokens: Option<u32>,
    pub num_output_tokens: Option<u32>,
    pub num_total_tokens: Option<u32>,
    pub time_to_first_token_ns: Option<u64>,
}

impl LlmMetrics {
    pub const INPUT_TOKENS: &'static str = "numInputTokens";
    pub const OUTPUT_TOKENS: &'static str = "numOutputTokens";
    pub const TOTAL_TOKENS: &'static str = "numTotalTokens";
    pub const TIME_TO_FIRST_TOKEN: &'static str = "timeToFirstTokenNs";

    /// Input and output counts with their total. The total saturates at `u32::MAX`.
    pub fn tokens(input: u32, output: u32) -> Self {
        Self {
            num_input_tokens: Some(input),
            num_output_tokens: Some(output),
            num_total_tokens: Some(input.saturating_add(output)),
            time_to_first_token_ns: None,
        }
    }

    pub fn with_time_to_first_token_ns(mut self, ns: u64) -> Self {
        self.time_to_first_token_ns = Some(ns);
        self
    }

    /// Fold the present values into a metrics map.
    pub fn apply_to(&self, metrics: &mut Metrics) {
        if let Some(v) = self.num_input_tokens {
            metrics.set(Self::INPUT_TOKENS, v);
        }
        if let Some(v) = self.num_output_tokens {
            metrics.set(Self::OUTPUT_TOKENS, v);
        }
        let total = self.num_total_tokens.or(match (self.num_input_tokens, self.num_output_tokens) {
            (Some(i), Some(o)) => Some(i.saturating_add(o)),
            _ => None,
        });
        if let Some(v) = total {
            metrics.set(Self::TOTAL_TOKENS, v);
        }
        if let Some(v) = self.time_to_first_token_ns {
            metrics.set(Self::TIME_TO_FIRST_TOKEN, v);
        }
    }

    /// Read token metrics back out of a metrics map.
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let read_u32 = |key: &str| {
            metrics
                .get(key)
                .and_then(MetricValue::as_i64)
                .and_then(|v| u32::try_from(v).ok())
        };
        Self {
            num_input_tokens: read_u32(Self::INPUT_TOKENS),
            num_output_tokens: read_u32(Self::OUTPUT_TOKENS),
            num_total_tokens: read_u32(Self::TOTAL_TOKENS),
            time_to_first_token_ns: metrics
                .get(Self::TIME_TO_FIRST_TOKEN)
                .and_then(MetricValue::as_i64)
                .and_then(|v| u64::try_from(v).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metrics_wire_shape_is_flat() {
        let mut metrics = Metrics::with_duration_ns(1_500);
        metrics.set("cost", 0.25);
        metrics.set("cached", true);

        let wire = serde_json::to_value(&metrics).unwrap();
        assert_eq!(wire, json!({"durationNs": 1500, "cost": 0.25, "cached": true}));
        assert_eq!(metrics.to_wire().len(), 3);
    }

    #[test]
    fn test_metrics_roundtrip_keeps_dynamic_keys() {
        let parsed: Metrics =
            serde_json::from_value(json!({"durationNs": 10, "model": "gpt-4o", "score": 3})).unwrap();
        assert_eq!(parsed.duration_ns, 10);
        assert_eq!(parsed.get("model"), Some(&MetricValue::Text("gpt-4o".to_string())));
        assert_eq!(parsed.get("score"), Some(&MetricValue::Int(3)));
    }

    #[test]
    fn test_set_reserved_key_updates_duration() {
        let mut metrics = Metrics::new();
        metrics.set("durationNs", 42u64);
        assert_eq!(metrics.duration_ns, 42);
        assert!(metrics.extra.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut base = Metrics::with_duration_ns(100);
        base.set("a", 1i64);

        let mut other = Metrics::new();
        other.set("a", 2i64);
        other.set("b", "x");
        base.merge(&other);

        assert_eq!(base.duration_ns, 100);
        assert_eq!(base.get("a"), Some(&MetricValue::Int(2)));
        assert_eq!(base.get("b"), Some(&MetricValue::Text("x".to_string())));
    }

    #[test]
    fn test_llm_metrics_apply_and_read_back() {
        let mut metrics = Metrics::new();
        LlmMetrics::tokens(10, 5)
            .with_time_to_first_token_ns(2_000)
            .apply_to(&mut metrics);

        let read = LlmMetrics::from_metrics(&metrics);
        assert_eq!(read.num_input_tokens, Some(10));
        assert_eq!(read.num_output_tokens, Some(5));
        assert_eq!(read.num_total_tokens, Some(15));
        assert_eq!(read.time_to_first_token_ns, Some(2_000));
    }

    #[test]
    fn test_llm_token_total_saturates() {
        let full = LlmMetrics::tokens(u32::MAX, 1);
        assert_eq!(full.num_total_tokens, Some(u32::MAX));

        let partial = LlmMetrics {
            num_input_tokens: Some(u32::MAX),
            num_output_tokens: Some(u32::MAX),
            ..LlmMetrics::default()
        };
        let mut metrics = Metrics::new();
        partial.apply_to(&mut metrics);
        assert_eq!(
            LlmMetrics::from_metrics(&metrics).num_total_tokens,
            Some(u32::MAX)
        );
    }
}
