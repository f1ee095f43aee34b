use rhai::{Dynamic, Engine, Map};
use skillbridge_core::Action;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const DEFAULT_NOTIFICATION_KIND: &str = "info";

/// Ordered log of the side effects a script asked for.
///
/// Owned by one request; clones share the log so the callables registered on
/// the engine append to the same list the dispatcher reports.
#[derive(Debug, Clone, Default)]
pub struct ActionCollector {
    log: Arc<Mutex<Vec<Action>>>,
}

impl ActionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: Action) {
        debug!(action = action.type_name(), "Action recorded");
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
    }

    pub fn snapshot(&self) -> Vec<Action> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Expose `send_message` and `create_notification` to scripts.
    pub fn register(&self, engine: &mut Engine) {
        // send_message(content [, conversation_id])
        {
            let log = self.clone();
            engine.register_fn("send_message", move |content: Dynamic| {
                log.send_message(&content, None);
            });
        }
        {
            let log = self.clone();
            engine.register_fn(
                "send_message",
                move |content: Dynamic, conversation_id: Dynamic| {
                    log.send_message(&content, Some(&conversation_id));
                },
            );
        }

        // create_notification(title [, body [, kind]])
        {
            let log = self.clone();
            engine.register_fn("create_notification", move |title: Dynamic| {
                log.create_notification(&title, None, None);
            });
        }
        {
            let log = self.clone();
            engine.register_fn("create_notification", move |title: Dynamic, body: Dynamic| {
                log.create_notification(&title, Some(&body), None);
            });
        }
        {
            let log = self.clone();
            engine.register_fn(
                "create_notification",
                move |title: Dynamic, body: Dynamic, kind: Dynamic| {
                    log.create_notification(&title, Some(&body), Some(&kind));
                },
            );
        }
    }

    fn send_message(&self, content: &Dynamic, conversation_id: Option<&Dynamic>) {
        let conversation_id = conversation_id
            .filter(|id| !is_blank(id))
            .map(|id| id.to_string());
        self.record(Action::SendMessage {
            content: content.to_string(),
            conversation_id,
        });
    }

    fn create_notification(
        &self,
        title: &Dynamic,
        body: Option<&Dynamic>,
        kind: Option<&Dynamic>,
    ) {
        self.record(Action::CreateNotification {
            title: title.to_string(),
            body: body.map(|b| b.to_string()).unwrap_or_default(),
            kind: kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_KIND.to_string()),
        });
    }
}

/// An optional argument that counts as not given: unit, `false`, zero, and
/// empty strings or collections.
fn is_blank(value: &Dynamic) -> bool {
    if value.is_unit() {
        true
    } else if let Ok(b) = value.as_bool() {
        !b
    } else if let Ok(i) = value.as_int() {
        i == 0
    } else if let Ok(f) = value.as_float() {
        f == 0.0
    } else if value.is_string() {
        value.clone().into_string().is_ok_and(|s| s.is_empty())
    } else if value.is_array() {
        value.clone().into_array().is_ok_and(|a| a.is_empty())
    } else if value.is_map() {
        value.clone().try_cast::<Map>().is_some_and(|m| m.is_empty())
    } else if value.is_blob() {
        value.clone().into_blob().is_ok_and(|b| b.is_empty())
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(collector: &ActionCollector) -> Engine {
        let mut engine = Engine::new();
        collector.register(&mut engine);
        engine
    }

    #[test]
    fn test_messages_keep_call_order() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine
            .run(r#"send_message("msg1"); send_message("msg2", "conv-9");"#)
            .unwrap();

        assert_eq!(
            collector.snapshot(),
            vec![
                Action::SendMessage {
                    content: "msg1".into(),
                    conversation_id: None
                },
                Action::SendMessage {
                    content: "msg2".into(),
                    conversation_id: Some("conv-9".into())
                },
            ]
        );
    }

    #[test]
    fn test_fields_are_stringified() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine
            .run(r#"send_message(42, 7); create_notification(true, 1.5, "warning");"#)
            .unwrap();

        let actions = collector.snapshot();
        assert_eq!(
            actions[0],
            Action::SendMessage {
                content: "42".into(),
                conversation_id: Some("7".into())
            }
        );
        match &actions[1] {
            Action::CreateNotification { title, body, kind } => {
                assert_eq!(title, "true");
                assert_eq!(body, "1.5");
                assert_eq!(kind, "warning");
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_notification_defaults() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine
            .run(r#"create_notification("Alert"); create_notification("Done", "all good");"#)
            .unwrap();

        assert_eq!(
            collector.snapshot(),
            vec![
                Action::CreateNotification {
                    title: "Alert".into(),
                    body: String::new(),
                    kind: "info".into()
                },
                Action::CreateNotification {
                    title: "Done".into(),
                    body: "all good".into(),
                    kind: "info".into()
                },
            ]
        );
    }

    #[test]
    fn test_unit_conversation_id_is_omitted() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine.run(r#"send_message("hi", ()); send_message("yo", "");"#).unwrap();

        assert!(collector.snapshot().iter().all(|a| matches!(
            a,
            Action::SendMessage {
                conversation_id: None,
                ..
            }
        )));
        assert_eq!(collector.snapshot().len(), 2);
    }

    #[test]
    fn test_falsy_conversation_ids_are_omitted() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine
            .run(
                r#"
                send_message("a", false);
                send_message("b", 0);
                send_message("c", 0.0);
                send_message("d", []);
                send_message("e", #{});
                "#,
            )
            .unwrap();

        let actions = collector.snapshot();
        assert_eq!(actions.len(), 5);
        assert!(actions.iter().all(|a| matches!(
            a,
            Action::SendMessage {
                conversation_id: None,
                ..
            }
        )));
    }

    #[test]
    fn test_truthy_conversation_ids_are_kept() {
        let collector = ActionCollector::new();
        let engine = engine_with(&collector);
        engine
            .run(r#"send_message("a", true); send_message("b", -1); send_message("c", [0]);"#)
            .unwrap();

        let ids: Vec<_> = collector
            .snapshot()
            .into_iter()
            .map(|a| match a {
                Action::SendMessage { conversation_id, .. } => conversation_id,
                other => panic!("unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(
            ids,
            vec![Some("true".to_string()), Some("-1".to_string()), Some("[0]".to_string())]
        );
    }
}
