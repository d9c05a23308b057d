//! Sub-records nested inside hosts, queues and jobs.
//!
//! These never appear at the top level of a response, so they carry no
//! `type` check. Unknown fields are kept in `extra`.

use crate::hydrate::nullable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A status flag on a host, queue or job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Short display name, e.g. `ok` or `closed_Adm`.
    #[serde(default, deserialize_with = "nullable")]
    pub friendly: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Numeric status code.
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.friendly)
    }
}

/// A resource a host provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub flags: Vec<Status>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub order: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resource usage reported for a running or finished job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumedResource {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub limit: Value,
    #[serde(default, deserialize_with = "nullable")]
    pub unit: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A submission option set on a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOption {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub friendly: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A process belonging to a running job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default, deserialize_with = "nullable")]
    pub hostname: String,
    #[serde(default)]
    pub process_id: Option<i64>,
    #[serde(default)]
    pub parent_process_id: Option<i64>,
    #[serde(default)]
    pub process_group_id: Option<i64>,
    #[serde(default)]
    pub cray_job_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A runtime limit on a queue or job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimit {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub soft_limit: Value,
    #[serde(default)]
    pub hard_limit: Value,
    #[serde(default, deserialize_with = "nullable")]
    pub unit: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Load indices of a host, one row per [`LoadValues`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadInformation {
    #[serde(default, deserialize_with = "nullable")]
    pub short_names: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub names: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<LoadValues>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One named row of load index values, e.g. `Total` or `Reserved`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadValues {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A host a job runs on, with the slots it uses there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHost {
    pub name: String,
    #[serde(default = "one_slot")]
    pub num_slots: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn one_slot() -> i64 {
    1
}

/// Reference to another entity, sent either as a bare name or as an
/// object with a `name` field.
///
/// The raw form is kept so that serializing gives back what was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct NameRef {
    name: String,
    raw: Value,
}

impl NameRef {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TryFrom<Value> for NameRef {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let name = match &raw {
            Value::String(name) => name.clone(),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| "reference object has no name".to_string())?
                .to_string(),
            other => return Err(format!("invalid reference: {other}")),
        };
        Ok(Self { name, raw })
    }
}

impl From<NameRef> for Value {
    fn from(reference: NameRef) -> Value {
        reference.raw
    }
}
