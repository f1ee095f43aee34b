use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A side effect requested by executed code. Collected, never dispatched by
/// the bridge itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SendMessage {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
    },
    CreateNotification {
        title: String,
        #[serde(default)]
        body: String,
        #[serde(default = "default_kind")]
        kind: String,
    },
}

fn default_kind() -> String {
    "info".to_string()
}

impl Action {
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SendMessage { .. } => "send_message",
            Action::CreateNotification { .. } => "create_notification",
        }
    }
}

/// The response document of one invocation.
///
/// Field presence is part of the contract: `result` is written (possibly as
/// `null`) only on success, `error` only on failure, and `output`/`actions`
/// only when capture and collection were active for the failing stage.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub actions: Option<Vec<Action>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(result: Option<String>, output: String, actions: Vec<Action>) -> Self {
        Self {
            success: true,
            result,
            output: Some(output),
            actions: Some(actions),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = Some(actions);
        self
    }
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("success", &self.success)?;
        if self.success {
            map.serialize_entry("result", &self.result)?;
        } else if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        if let Some(output) = &self.output {
            map.serialize_entry("output", output)?;
        }
        if let Some(actions) = &self.actions {
            map.serialize_entry("actions", actions)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_wire_shape() {
        let msg = Action::SendMessage {
            content: "hi".into(),
            conversation_id: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "send_message", "content": "hi"})
        );

        let note = Action::CreateNotification {
            title: "Done".into(),
            body: String::new(),
            kind: "success".into(),
        };
        assert_eq!(
            serde_json::to_value(&note).unwrap(),
            json!({"type": "create_notification", "title": "Done", "body": "", "kind": "success"})
        );
    }

    #[test]
    fn test_action_defaults_on_decode() {
        let action: Action =
            serde_json::from_value(json!({"type": "create_notification", "title": "T"})).unwrap();
        assert_eq!(
            action,
            Action::CreateNotification {
                title: "T".into(),
                body: String::new(),
                kind: "info".into()
            }
        );
        assert_eq!(action.type_name(), "create_notification");
    }

    #[test]
    fn test_success_always_writes_result() {
        let outcome = ExecutionOutcome::success(None, String::new(), vec![]);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "result": null, "output": "", "actions": []})
        );
    }

    #[test]
    fn test_bare_failure_has_only_error() {
        let outcome = ExecutionOutcome::failure("No skill file specified");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": false, "error": "No skill file specified"})
        );
    }

    #[test]
    fn test_failure_with_partial_state() {
        let outcome = ExecutionOutcome::failure("boom")
            .with_output("before\n".into())
            .with_actions(vec![Action::SendMessage {
                content: "x".into(),
                conversation_id: Some("c1".into()),
            }]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["output"], "before\n");
        assert_eq!(value["actions"][0]["conversation_id"], "c1");
        assert!(value.get("result").is_none());
    }
}
