//! The runtime-typed payload of render commands.

use std::cmp::Ordering;

/// One value in a [`crate::RenderCommand`]'s data tuple.
///
/// A tagged sum with a *stable total order*, so command payloads can be
/// used as sort keys for deterministic frame composition. Floats are
/// ordered with [`f64::total_cmp`].
#[derive(Clone, Debug)]
pub enum DataValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    List(Vec<DataValue>),
}

impl DataValue {
    /// Rank used to order values of different variants.
    fn variant_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::I64(_) => 2,
            Self::F64(_) => 3,
            Self::Str(_) => 4,
            Self::List(_) => 5,
        }
    }

    pub fn stable_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.stable_cmp(right);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(value) => Some(*value),
            Self::I64(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        self.stable_cmp(other) == Ordering::Equal
    }
}

impl Eq for DataValue {}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.stable_cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stable_cmp(other)
    }
}

/// The stable textual representation used as a sort-key fallback.
impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::I64(value) => write!(f, "{value}"),
            Self::F64(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u32> for DataValue {
    fn from(value: u32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Option<String>> for DataValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Str)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(values: Vec<DataValue>) -> Self {
        Self::List(values)
    }
}

impl From<&DataValue> for serde_json::Value {
    fn from(value: &DataValue) -> Self {
        match value {
            DataValue::Null => Self::Null,
            DataValue::Bool(value) => Self::Bool(*value),
            DataValue::I64(value) => Self::from(*value),
            DataValue::F64(value) => serde_json::Number::from_f64(*value)
                .map_or(Self::Null, Self::Number),
            DataValue::Str(value) => Self::String(value.clone()),
            DataValue::List(values) => Self::Array(values.iter().map(Self::from).collect()),
        }
    }
}

impl serde::Serialize for DataValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total_across_variants() {
        let mut values = vec![
            DataValue::Str("b".into()),
            DataValue::F64(1.5),
            DataValue::Null,
            DataValue::I64(2),
            DataValue::Bool(true),
            DataValue::List(vec![DataValue::I64(1)]),
        ];
        values.sort();
        assert_eq!(values[0], DataValue::Null);
        assert_eq!(values[5], DataValue::List(vec![DataValue::I64(1)]));
    }

    #[test]
    fn nan_ordering_is_stable() {
        let a = DataValue::F64(f64::NAN);
        let b = DataValue::F64(1.0);
        assert_eq!(a.stable_cmp(&b), b.stable_cmp(&a).reverse());
        assert_eq!(a.stable_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn json_conversion_keeps_nesting() {
        let value = DataValue::List(vec![DataValue::F64(0.5), DataValue::Str("x".into())]);
        let json: serde_json::Value = (&value).into();
        assert_eq!(json, serde_json::json!([0.5, "x"]));
    }
}
