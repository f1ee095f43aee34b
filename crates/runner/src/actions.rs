use async_trait::async_trait;
use serde_json::Value;
use skillbridge_core::{Action, Result};
use tracing::{debug, error, warn};

/// Host-side delivery of the actions a bridge run reported.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<()>;

    async fn create_notification(&self, title: &str, body: &str, kind: &str) -> Result<()>;
}

/// Deliver `actions` in order and return how many reached the sink.
///
/// A `send_message` without a conversation of its own goes to
/// `default_conversation`, and is skipped when there is none. Unknown or
/// malformed entries and sink failures are logged and do not stop the rest.
pub async fn process_actions(
    actions: &[Value],
    sink: &dyn ActionSink,
    default_conversation: Option<&str>,
) -> usize {
    let mut delivered = 0;

    for raw in actions {
        let action = match serde_json::from_value::<Action>(raw.clone()) {
            Ok(action) => action,
            Err(e) => {
                let kind = raw.get("type").and_then(Value::as_str).unwrap_or("<none>");
                warn!(action_type = kind, error = %e, "Unknown bridge action type");
                continue;
            }
        };

        let outcome = match &action {
            Action::SendMessage {
                content,
                conversation_id,
            } => {
                let Some(conversation) = conversation_id.as_deref().or(default_conversation) else {
                    debug!("send_message without conversation, skipped");
                    continue;
                };
                sink.send_message(conversation, content).await
            }
            Action::CreateNotification { title, body, kind } => {
                sink.create_notification(title, body, kind).await
            }
        };

        match outcome {
            Ok(()) => delivered += 1,
            Err(e) => error!(action = %raw, error = %e, "Failed to process bridge action"),
        }
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skillbridge_core::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionSink for RecordingSink {
        async fn send_message(&self, conversation_id: &str, content: &str) -> Result<()> {
            if content == "explode" {
                return Err(Error::Other("sink down".into()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("msg {} {}", conversation_id, content));
            Ok(())
        }

        async fn create_notification(&self, title: &str, body: &str, kind: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("note {}|{}|{}", title, body, kind));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatches_in_order() {
        let sink = RecordingSink::default();
        let actions = vec![
            json!({"type": "send_message", "content": "hi", "conversation_id": "c1"}),
            json!({"type": "create_notification", "title": "Done"}),
            json!({"type": "send_message", "content": "fallback"}),
        ];

        let delivered = process_actions(&actions, &sink, Some("default")).await;
        assert_eq!(delivered, 3);
        assert_eq!(
            *sink.calls.lock().unwrap(),
            vec!["msg c1 hi", "note Done||info", "msg default fallback"]
        );
    }

    #[tokio::test]
    async fn test_message_without_conversation_is_skipped() {
        let sink = RecordingSink::default();
        let actions = vec![json!({"type": "send_message", "content": "lost"})];

        assert_eq!(process_actions(&actions, &sink, None).await, 0);
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_failing_actions_do_not_stop_the_rest() {
        let sink = RecordingSink::default();
        let actions = vec![
            json!({"type": "launch_rocket"}),
            json!({"type": "send_message", "content": "explode", "conversation_id": "c"}),
            json!({"type": "create_notification", "title": "t", "body": "b", "kind": "warning"}),
        ];

        assert_eq!(process_actions(&actions, &sink, None).await, 1);
        assert_eq!(*sink.calls.lock().unwrap(), vec!["note t|b|warning"]);
    }
}
