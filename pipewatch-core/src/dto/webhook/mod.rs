//! Pipeline webhook payloads
//!
//! Decoding of the pipeline event tree sent by the external CI system.
//! Unknown fields are ignored; only the fields the engine needs are required.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The only event kind the engine consumes
pub const PIPELINE_KIND: &str = "pipeline";

/// Why an inbound event could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// `object_kind` is missing or not `pipeline`
    #[error("unsupported event kind: {0}")]
    UnsupportedKind(String),

    /// A required field is missing or has the wrong type
    #[error("malformed pipeline event: {0}")]
    Malformed(String),
}

/// The fields of a pipeline event the engine acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub project: String,
    pub git_ref: String,
    pub sha: String,
    pub status: String,
    /// Empty when the sender omitted it
    pub detailed_status: String,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    project: RawProject,
    object_attributes: RawAttributes,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawAttributes {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
    status: String,
    #[serde(default)]
    detailed_status: Option<String>,
}

impl PipelineEvent {
    /// Decode a pipeline event from a parsed JSON tree
    pub fn from_value(value: &Value) -> Result<Self, EventError> {
        match value.get("object_kind").and_then(Value::as_str) {
            Some(PIPELINE_KIND) => {}
            Some(kind) => return Err(EventError::UnsupportedKind(kind.to_string())),
            None => return Err(EventError::UnsupportedKind("<missing>".to_string())),
        }

        let raw = RawEvent::deserialize(value).map_err(|e| EventError::Malformed(e.to_string()))?;

        Ok(Self {
            project: raw.project.name,
            git_ref: raw.object_attributes.git_ref,
            sha: raw.object_attributes.sha,
            status: raw.object_attributes.status,
            detailed_status: raw.object_attributes.detailed_status.unwrap_or_default(),
        })
    }

    /// Encode back into the wire shape, as a sender would post it
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "object_kind": PIPELINE_KIND,
            "project": { "name": self.project },
            "object_attributes": {
                "ref": self.git_ref,
                "sha": self.sha,
                "status": self.status,
                "detailed_status": self.detailed_status,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_event() {
        let value = json!({
            "object_kind": "pipeline",
            "object_attributes": {
                "id": 31,
                "ref": "master",
                "tag": false,
                "sha": "bcbb5ec396a2c0f828686f14fac9b80b780504f2",
                "status": "success",
                "detailed_status": "passed",
                "duration": 63
            },
            "project": { "id": 1, "name": "Gitlab Test" },
            "builds": []
        });

        let event = PipelineEvent::from_value(&value).unwrap();

        assert_eq!(event.project, "Gitlab Test");
        assert_eq!(event.git_ref, "master");
        assert_eq!(event.sha, "bcbb5ec396a2c0f828686f14fac9b80b780504f2");
        assert_eq!(event.status, "success");
        assert_eq!(event.detailed_status, "passed");
    }

    #[test]
    fn test_missing_detailed_status_defaults_to_empty() {
        let value = json!({
            "object_kind": "pipeline",
            "project": { "name": "Demo" },
            "object_attributes": { "ref": "master", "sha": "abc", "status": "running", "detailed_status": null }
        });

        assert_eq!(PipelineEvent::from_value(&value).unwrap().detailed_status, "");
    }

    #[test]
    fn test_other_kinds_are_rejected() {
        let push = json!({ "object_kind": "push", "project": { "name": "Demo" } });
        assert_eq!(
            PipelineEvent::from_value(&push),
            Err(EventError::UnsupportedKind("push".to_string()))
        );

        assert!(matches!(
            PipelineEvent::from_value(&json!({})),
            Err(EventError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let value = json!({
            "object_kind": "pipeline",
            "project": { "name": "Demo" },
            "object_attributes": { "ref": "master", "status": "running" }
        });

        assert!(matches!(
            PipelineEvent::from_value(&value),
            Err(EventError::Malformed(_))
        ));
    }

    #[test]
    fn test_to_value_decodes_back() {
        let event = PipelineEvent {
            project: "Demo".to_string(),
            git_ref: "master".to_string(),
            sha: "abc".to_string(),
            status: "running".to_string(),
            detailed_status: String::new(),
        };

        assert_eq!(PipelineEvent::from_value(&event.to_value()).unwrap(), event);
    }
}
