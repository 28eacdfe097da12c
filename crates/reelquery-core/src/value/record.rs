use crate::value::Value;
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;

///
/// Record
///
/// Field-name keyed row payload. Used both for full rows exchanged with the
/// storage collaborator and for reshaped, projection-exact results.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Field value, treating an absent key as missing rather than null.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Key set in sorted order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Decode this record into a caller-defined shape.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        let json = serde_json::to_value(&self)?;

        serde_json::from_value(json)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
