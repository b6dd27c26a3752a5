//! Hashing utilities for RETURN DISTINCT

use super::QueryExecutor;
use crate::types::value::Value;

// FNV-1a constants
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

impl QueryExecutor {
    /// Hash a value for deduplication using FNV-1a
    ///
    /// Consistent with `Value` equality: `1` and `1.0` hash alike, and
    /// object attribute order does not matter.
    pub(crate) fn hash_value(&self, value: &Value) -> u64 {
        self.hash_into(value, FNV_OFFSET)
    }

    fn hash_into(&self, value: &Value, mut hash: u64) -> u64 {
        // Numbers share one tag because Int and Float compare equal
        let type_tag: u8 = match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        };
        hash = mix(hash, &[type_tag]);

        match value {
            Value::Null => hash,
            Value::Bool(b) => mix(hash, &[u8::from(*b)]),
            Value::Int(_) | Value::Float(_) => {
                let number = value.to_number();
                // -0.0 == 0.0
                let number = if number == 0.0 { 0.0 } else { number };
                mix(hash, &number.to_le_bytes())
            }
            Value::String(s) => mix(hash, s.as_bytes()),
            Value::Array(items) => {
                for item in items {
                    hash = self.hash_into(item, hash);
                }
                hash
            }
            Value::Object(entries) => {
                // Order-independent combination of per-entry hashes
                let combined = entries.iter().fold(0u64, |acc, (key, value)| {
                    let entry = self.hash_into(value, mix(FNV_OFFSET, key.as_bytes()));
                    acc.wrapping_add(entry)
                });
                mix(hash, &combined.to_le_bytes())
            }
        }
    }
}

#[inline]
fn mix(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
