use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type TestDefinitionId = i64;
pub type WorkflowId = String;
pub type AnnotationTagId = String;

/// Link to a related row by id, without loading the row itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef<I> {
    pub id: I,
}

impl<I> EntityRef<I> {
    pub fn new(id: I) -> Self {
        Self { id }
    }
}

/// Presence-aware value for partial updates.
///
/// `Missing` means the key was not sent at all and the stored value must be
/// left untouched. `Null` means the caller sent an explicit `null`. Use with
/// `#[serde(default)]` so that absent keys deserialize to `Missing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Collapses `Missing` and `Null` into `None`
    pub fn into_value(self) -> Option<T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Missing => Field::Missing,
            Field::Null => Field::Null,
            Field::Value(value) => Field::Value(f(value)),
        }
    }

    /// Resets the field to `Missing` and returns what it held
    pub fn take(&mut self) -> Field<T> {
        std::mem::take(self)
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Value(value),
            None => Field::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

// `Missing` is expected to be skipped with `skip_serializing_if = "Field::is_missing"`.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Value(value) => serializer.serialize_some(value),
            Field::Missing | Field::Null => serializer.serialize_none(),
        }
    }
}
