//! Size-bucket quantities and the derived total.
//!
//! A work order carries twenty per-size counts (`p01`..`p20`). Payloads may
//! mention any subset of them; a bucket counts as present when its key is
//! present, whatever the value. Present values that are not usable counts
//! are coerced to `0` instead of being rejected.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

/// One of the twenty fixed size buckets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
pub enum QuantityBucket {
    P01,
    P02,
    P03,
    P04,
    P05,
    P06,
    P07,
    P08,
    P09,
    P10,
    P11,
    P12,
    P13,
    P14,
    P15,
    P16,
    P17,
    P18,
    P19,
    P20,
}

impl QuantityBucket {
    /// Zero-based slot of this bucket.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }
}

pub const BUCKET_COUNT: usize = QuantityBucket::COUNT;

/// How an update recomputes the derived total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalPolicy {
    /// Sum only the buckets present in the patch.
    #[default]
    PatchOnly,
    /// Overlay the patch on the stored buckets, then sum all twenty.
    MergeStored,
}

/// The full set of stored bucket counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantities([i32; BUCKET_COUNT]);

impl Quantities {
    pub fn new(counts: [i32; BUCKET_COUNT]) -> Self {
        Self(counts)
    }

    pub fn get(&self, bucket: QuantityBucket) -> i32 {
        self.0[bucket.index()]
    }

    pub fn set(&mut self, bucket: QuantityBucket, count: i32) {
        self.0[bucket.index()] = count;
    }

    pub fn as_array(&self) -> &[i32; BUCKET_COUNT] {
        &self.0
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|&count| i64::from(count)).sum()
    }

    /// Returns a copy with every bucket present in `patch` overwritten.
    pub fn overlay(&self, patch: &QuantityPatch) -> Self {
        let mut merged = *self;
        for (bucket, count) in patch.iter() {
            merged.set(bucket, count);
        }
        merged
    }
}

/// Buckets mentioned by a payload, with their coerced counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityPatch {
    counts: BTreeMap<QuantityBucket, i32>,
}

impl QuantityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper, mostly for callers that already hold integers.
    pub fn with(mut self, bucket: QuantityBucket, count: i32) -> Self {
        self.counts.insert(bucket, count);
        self
    }

    pub fn insert(&mut self, bucket: QuantityBucket, count: i32) {
        self.counts.insert(bucket, count);
    }

    /// Records a raw payload value for `bucket`, coercing it to a count.
    pub fn insert_raw(&mut self, bucket: QuantityBucket, raw: &Value) {
        self.counts.insert(bucket, coerce_count(raw));
    }

    pub fn get(&self, bucket: QuantityBucket) -> Option<i32> {
        self.counts.get(&bucket).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuantityBucket, i32)> + '_ {
        self.counts.iter().map(|(bucket, count)| (*bucket, *count))
    }

    /// Builds a patch from the `p01`..`p20` keys of a JSON object, ignoring any other key.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut patch = Self::new();
        for (key, raw) in object {
            if let Ok(bucket) = QuantityBucket::from_str(key) {
                patch.insert_raw(bucket, raw);
            }
        }
        patch
    }
}

/// Sum of the buckets present in `patch`, or `None` when no bucket is present.
pub fn aggregate(patch: &QuantityPatch) -> Option<i64> {
    if patch.is_empty() {
        return None;
    }
    Some(patch.iter().map(|(_, count)| i64::from(count)).sum())
}

/// Total to store after applying `patch` to a record holding `stored`.
/// `None` means the stored total stays as it is.
pub fn recompute_total(
    policy: TotalPolicy,
    patch: &QuantityPatch,
    stored: &Quantities,
) -> Option<i64> {
    match policy {
        TotalPolicy::PatchOnly => aggregate(patch),
        TotalPolicy::MergeStored if patch.is_empty() => None,
        TotalPolicy::MergeStored => Some(stored.overlay(patch).total()),
    }
}

/// Coerces a raw payload value into a bucket count. Anything unusable becomes `0`.
pub fn coerce_count(raw: &Value) -> i32 {
    match raw {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                i32::try_from(int).unwrap_or(0)
            } else {
                number.as_f64().map(truncate_float).unwrap_or(0)
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                i32::try_from(int).unwrap_or(0)
            } else {
                text.parse::<f64>().map(truncate_float).unwrap_or(0)
            }
        }
        _ => 0,
    }
}

fn truncate_float(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let truncated = value.trunc();
    if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        0
    } else {
        truncated as i32
    }
}

impl<'de> Deserialize<'de> for QuantityPatch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PatchVisitor;

        impl<'de> Visitor<'de> for PatchVisitor {
            type Value = QuantityPatch;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of size buckets p01..p20")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut patch = QuantityPatch::new();
                while let Some(key) = map.next_key::<String>()? {
                    let raw: Value = map.next_value()?;
                    if let Ok(bucket) = QuantityBucket::from_str(&key) {
                        patch.insert_raw(bucket, &raw);
                    }
                }
                Ok(patch)
            }
        }

        deserializer.deserialize_map(PatchVisitor)
    }
}

impl Serialize for QuantityPatch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (bucket, count) in &self.counts {
            map.serialize_entry(&bucket.to_string(), count)?;
        }
        map.end()
    }
}
