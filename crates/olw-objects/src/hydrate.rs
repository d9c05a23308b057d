//! Turning server JSON into typed entities.
//!
//! Each entity is a serde struct: known fields are typed (nested lists and
//! sub-records included) and everything else lands in an `extra` map, so new
//! server fields never break decoding. Top-level entities also carry a `type`
//! discriminator that is checked before decoding.

use olw_session::{Error, Result, Session};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::ops::Deref;

/// A top-level entity the server can return.
pub trait Entity: DeserializeOwned {
    /// Name used in error messages.
    const KIND: &'static str;

    /// Accepted values of the `type` discriminator. Empty means unchecked.
    const TYPE_NAMES: &'static [&'static str];
}

/// Decode one JSON object into an entity, checking its `type`.
pub fn hydrate<T: Entity>(value: Value) -> Result<T> {
    let Value::Object(map) = &value else {
        return Err(Error::Shape(format!(
            "{} data must be a JSON object, got {}",
            T::KIND,
            json_kind(&value)
        )));
    };

    if !T::TYPE_NAMES.is_empty() {
        match map.get("type").and_then(Value::as_str) {
            Some(kind) if T::TYPE_NAMES.contains(&kind) => {}
            Some(kind) => {
                return Err(Error::Shape(format!(
                    "data is of type {kind}, expected {}",
                    T::TYPE_NAMES.join(" or ")
                )));
            }
            None => {
                return Err(Error::Shape(format!(
                    "{} data has no type discriminator",
                    T::KIND
                )));
            }
        }
    }

    serde_json::from_value(value).map_err(|e| Error::Shape(format!("invalid {}: {e}", T::KIND)))
}

/// Decode a JSON list, hydrating each element independently.
pub fn hydrate_list<T: Entity>(value: Value) -> Result<Vec<T>> {
    match value {
        Value::Array(items) => items.into_iter().map(hydrate).collect(),
        other => Err(Error::Shape(format!(
            "expected a list of {}, got {}",
            T::KIND,
            json_kind(&other)
        ))),
    }
}

/// Deserialize a list or sub-record that may be null, defaulting when it is.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// An entity together with the session that fetched it.
///
/// Remote actions (`open`, `kill`, ...) are defined on `Bound` so they can
/// reuse the session. The session is borrowed, never owned.
#[derive(Clone)]
pub struct Bound<'s, T> {
    session: &'s Session,
    record: T,
}

impl<'s, T> Bound<'s, T> {
    pub fn new(session: &'s Session, record: T) -> Self {
        Self { session, record }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }
}

impl<'s, T: Entity> Bound<'s, T> {
    /// Hydrate `value` and bind it to `session`.
    pub fn hydrate(session: &'s Session, value: Value) -> Result<Self> {
        hydrate(value).map(|record| Self::new(session, record))
    }

    /// Hydrate a list and bind every element to `session`.
    pub fn hydrate_list(session: &'s Session, value: Value) -> Result<Vec<Self>> {
        Ok(hydrate_list(value)?
            .into_iter()
            .map(|record| Self::new(session, record))
            .collect())
    }
}

impl<T> Deref for Bound<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Bound<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bound")
            .field("base_url", &self.session.base_url())
            .field("record", &self.record)
            .finish()
    }
}
