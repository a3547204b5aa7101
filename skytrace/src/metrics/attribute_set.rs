use std::hash::{Hash, Hasher};

use crate::common::{KeyValue, Value};

/// A normalized attribute combination used to key counter sub-totals.
///
/// Attributes are sorted by key and de-duplicated (last value wins), so the
/// same combination hashes identically regardless of call-site ordering.
#[derive(Clone, Debug)]
pub(crate) struct AttributeSet(Vec<KeyValue>);

impl AttributeSet {
    pub(crate) fn to_vec(&self) -> Vec<KeyValue> {
        self.0.clone()
    }
}

impl From<&[KeyValue]> for AttributeSet {
    fn from(attributes: &[KeyValue]) -> Self {
        let mut kvs: Vec<KeyValue> = attributes.to_vec();
        kvs.sort_by(|a, b| a.key.cmp(&b.key));
        // Last write wins for duplicate keys; after the stable sort the last
        // duplicate is the later call-site argument.
        kvs.reverse();
        kvs.dedup_by(|a, b| a.key == b.key);
        kvs.reverse();
        AttributeSet(kvs)
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Bool(v) => {
            state.write_u8(1);
            v.hash(state);
        }
        Value::I64(v) => {
            state.write_u8(2);
            v.hash(state);
        }
        Value::F64(v) => {
            state.write_u8(3);
            // Bitwise identity; NaN payloads are distinct on purpose.
            v.to_bits().hash(state);
        }
        Value::String(v) => {
            state.write_u8(4);
            v.hash(state);
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for kv in &self.0 {
            kv.key.hash(state);
            hash_value(&kv.value, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyValue;

    #[test]
    fn order_is_normalized() {
        let a = AttributeSet::from(&[KeyValue::new("x", 1i64), KeyValue::new("y", 2i64)][..]);
        let b = AttributeSet::from(&[KeyValue::new("y", 2i64), KeyValue::new("x", 1i64)][..]);
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let set = AttributeSet::from(&[KeyValue::new("x", 1i64), KeyValue::new("x", 2i64)][..]);
        assert_eq!(set.to_vec(), vec![KeyValue::new("x", 2i64)]);
    }

    #[test]
    fn float_values_compare_bitwise() {
        let a = AttributeSet::from(&[KeyValue::new("lat", 50.0f64)][..]);
        let b = AttributeSet::from(&[KeyValue::new("lat", 50.0f64)][..]);
        let c = AttributeSet::from(&[KeyValue::new("lat", 50.1f64)][..]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
