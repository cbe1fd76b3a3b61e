//! Field types and dynamically typed field values

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Storage type of a branch field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 32-bit floating point
    Float,
    /// 32-bit signed integer
    Integer,
    /// Boolean flag
    Boolean,
}

impl FieldType {
    /// All field types, in storage order
    pub const ALL: [FieldType; 3] = [FieldType::Float, FieldType::Integer, FieldType::Boolean];

    /// Stable lowercase name, as written in persisted schemas
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field value tagged with its type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Float value
    Float(f32),
    /// Integer value
    Integer(i32),
    /// Boolean value
    Boolean(bool),
}

impl FieldValue {
    /// Type of this value
    #[inline]
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Float(_) => FieldType::Float,
            Self::Integer(_) => FieldType::Integer,
            Self::Boolean(_) => FieldType::Boolean,
        }
    }

    /// Default (zero) value of a type
    #[inline]
    #[must_use]
    pub const fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Float => Self::Float(0.0),
            FieldType::Integer => Self::Integer(0),
            FieldType::Boolean => Self::Boolean(false),
        }
    }

    /// Widen to `f64`; booleans map to 0 or 1
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => f64::from(v),
            Self::Integer(v) => f64::from(v),
            Self::Boolean(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Convert a number into a value of the requested type
    ///
    /// Integers truncate toward zero and saturate at the `i32` bounds,
    /// booleans are `value != 0`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn from_f64(field_type: FieldType, value: f64) -> Self {
        match field_type {
            FieldType::Float => Self::Float(value as f32),
            FieldType::Integer => Self::Integer(value as i32),
            FieldType::Boolean => Self::Boolean(value != 0.0),
        }
    }

    /// Re-express this value as another type
    #[inline]
    #[must_use]
    pub fn convert(self, field_type: FieldType) -> Self {
        if self.field_type() == field_type {
            self
        } else {
            Self::from_f64(field_type, self.as_f64())
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening() {
        assert_eq!(FieldValue::Float(1.5).as_f64(), 1.5);
        assert_eq!(FieldValue::Integer(-3).as_f64(), -3.0);
        assert_eq!(FieldValue::Boolean(true).as_f64(), 1.0);
    }

    #[test]
    fn conversion_from_number() {
        assert_eq!(FieldValue::from_f64(FieldType::Integer, 2.9), FieldValue::Integer(2));
        assert_eq!(FieldValue::from_f64(FieldType::Integer, -2.9), FieldValue::Integer(-2));
        assert_eq!(FieldValue::from_f64(FieldType::Boolean, 0.0), FieldValue::Boolean(false));
        assert_eq!(FieldValue::from_f64(FieldType::Boolean, 0.1), FieldValue::Boolean(true));
    }

    #[test]
    fn convert_keeps_same_type() {
        let v = FieldValue::Float(0.25);
        assert_eq!(v.convert(FieldType::Float), v);
        assert_eq!(v.convert(FieldType::Boolean), FieldValue::Boolean(true));
    }

    #[test]
    fn display_matches_serde_name() {
        for ty in FieldType::ALL {
            assert_eq!(
                serde_json::to_string(&ty).unwrap(),
                format!("\"{ty}\"")
            );
        }
        assert_eq!(FieldType::Integer.to_string(), "integer");
    }
}
