//! Data elements attached to hierarchy nodes.
//!
//! Each node carries a flat name-to-value map. Values remember when they
//! were last edited by a person; values written programmatically (for
//! example by the sync engine) carry no edit timestamp, which is what lets
//! three-way merges distinguish user edits from synced state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The value of one data element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum DataValue {
    /// A numeric value (minutes, counts, sizes).
    Number(f64),
    /// A text value.
    Text(String),
    /// A timestamp value.
    Date(DateTime<Utc>),
    /// A marker with no payload; its presence is the information.
    Tag,
}

impl DataValue {
    /// The numeric payload, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text payload, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The timestamp payload, if this is a date.
    #[must_use]
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<f64> for DataValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

/// One stored data element: a value plus its last user-edit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    /// The current value.
    pub value: DataValue,
    /// When a person last edited this element. `None` for values that were
    /// only ever written programmatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited: Option<DateTime<Utc>>,
}

impl DataEntry {
    /// An entry with no edit timestamp.
    #[must_use]
    pub fn new(value: impl Into<DataValue>) -> Self {
        Self { value: value.into(), edited: None }
    }

    /// A numeric entry with no edit timestamp.
    #[must_use]
    pub fn number(n: f64) -> Self {
        Self::new(n)
    }

    /// A text entry with no edit timestamp.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::new(s.into())
    }

    /// A date entry with no edit timestamp.
    #[must_use]
    pub fn date(d: DateTime<Utc>) -> Self {
        Self::new(d)
    }

    /// A tag entry with no edit timestamp.
    #[must_use]
    pub fn tag() -> Self {
        Self { value: DataValue::Tag, edited: None }
    }

    /// Marks the entry as user-edited at the given time.
    #[must_use]
    pub fn with_edited(mut self, at: DateTime<Utc>) -> Self {
        self.edited = Some(at);
        self
    }
}
