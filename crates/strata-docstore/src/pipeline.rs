//! Aggregation pipeline: match stages followed by an optional group stage

use serde_json::{Map, Value, json};

use crate::filter::Filter;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupSpec),
}

/// Counts documents per distinct tuple of key values
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Output key name and the dotted path it is read from
    pub keys: Vec<(String, String)>,
    /// Name of the count field of each result row
    pub total_field: String,
}

impl GroupSpec {
    pub fn new(total_field: impl Into<String>) -> Self {
        Self {
            keys: Vec::new(),
            total_field: total_field.into(),
        }
    }

    pub fn key(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.keys.push((name.into(), path.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn group(mut self, spec: GroupSpec) -> Self {
        self.stages.push(Stage::Group(spec));
        self
    }

    pub fn to_json(&self) -> Value {
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|stage| match stage {
                Stage::Match(filter) => json!({ "$match": filter.to_json() }),
                Stage::Group(spec) => {
                    let mut id = Map::new();
                    for (name, path) in &spec.keys {
                        id.insert(name.clone(), Value::String(format!("${}", path)));
                    }
                    let mut group = Map::new();
                    group.insert("_id".to_string(), Value::Object(id));
                    group.insert(spec.total_field.clone(), json!({ "$sum": 1 }));
                    json!({ "$group": group })
                }
            })
            .collect();
        Value::Array(stages)
    }
}

/// Aggregation result.
///
/// `ok == false` means the store answered but produced no usable result;
/// hard failures are reported as errors instead.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReply {
    pub ok: bool,
    pub documents: Vec<Value>,
}

impl AggregateReply {
    pub fn ok(documents: Vec<Value>) -> Self {
        Self {
            ok: true,
            documents,
        }
    }

    pub fn not_ok() -> Self {
        Self {
            ok: false,
            documents: Vec::new(),
        }
    }
}
