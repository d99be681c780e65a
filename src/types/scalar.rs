use serde::{Deserialize, Serialize};

/// A loosely typed scalar as sent by the upstream service and by browsers.
///
/// KeyAuth reports levels, expiries and timestamps as either JSON numbers or
/// numeric strings depending on the endpoint, and dashboard forms post
/// numbers as strings. Values are kept as received so they can be passed
/// back to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Interpret as a non-negative integer, the way a form field is read.
    ///
    /// Text is trimmed and parsed; floats are truncated.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Scalar::Int(n) => u32::try_from(*n).ok(),
            Scalar::Float(f) if f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64 => {
                Some(f.trunc() as u32)
            }
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }

    /// Render as text; empty strings count as absent.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Int(n) => Some(n.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Text(s) if s.is_empty() => None,
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}
