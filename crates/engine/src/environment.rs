use rhai::{Dynamic, Engine};
use serde_json::Value;
use skillbridge_core::config::EngineConfig;
use skillbridge_core::Action;
use tracing::{info, warn};

use crate::actions::ActionCollector;
use crate::capture::OutputCapture;
use crate::convert::{dynamic_to_json_lossy, json_to_dynamic};

/// Name under which the caller's context is visible to scripts.
pub const CONTEXT_BINDING: &str = "context";

/// Per-request state: the action log and the console buffer.
///
/// A fresh `Invocation` is created for every request and threaded through
/// environment construction and evaluation, so nothing recorded by one
/// request can leak into another served by the same process.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    actions: ActionCollector,
    capture: OutputCapture,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.snapshot()
    }

    pub fn output(&self) -> String {
        self.capture.contents()
    }
}

/// Build the evaluation environment for one request.
///
/// The engine carries the action callables, the JSON helpers, console capture
/// and a read-only `context` binding. All of them are engine-level, so they
/// are already visible when a skill's top-level statements run and inside
/// any function the script defines.
pub fn build_engine(config: &EngineConfig, invocation: &Invocation, context: &Value) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);

    {
        let capture = invocation.capture.clone();
        engine.on_print(move |text| capture.write_line(text));
    }
    {
        let capture = invocation.capture.clone();
        engine.on_debug(move |text, _source, _pos| capture.write_line(text));
    }

    // Resolved ahead of the scope and handed out read-only. A non-zero index
    // means the parser already bound the name to a script local.
    {
        let context = json_to_dynamic(context);
        #[allow(deprecated)]
        engine.on_var(move |name, index, _ctx| {
            if index == 0 && name == CONTEXT_BINDING {
                Ok(Some(context.clone()))
            } else {
                Ok(None)
            }
        });
    }

    invocation.actions.register(&mut engine);
    register_helpers(&mut engine);

    engine
}

fn register_helpers(engine: &mut Engine) {
    // to_json(value): compact JSON text of a script value
    engine.register_fn("to_json", |val: Dynamic| -> String {
        serde_json::to_string(&dynamic_to_json_lossy(&val)).unwrap_or_default()
    });

    // from_json(text): parse JSON, unit on failure
    engine.register_fn("from_json", |text: String| -> Dynamic {
        match serde_json::from_str::<Value>(&text) {
            Ok(v) => json_to_dynamic(&v),
            Err(_) => Dynamic::UNIT,
        }
    });

    engine.register_fn("log", |msg: Dynamic| {
        info!(source = "script", "{}", msg);
    });

    engine.register_fn("log_warn", |msg: Dynamic| {
        warn!(source = "script", "{}", msg);
    });
}
