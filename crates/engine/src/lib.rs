pub mod actions;
pub mod capture;
pub mod convert;
pub mod dispatcher;
pub mod environment;
pub mod evaluator;
pub mod report;
pub mod serializer;
pub mod skill;

pub use dispatcher::Bridge;
pub use environment::{build_engine, Invocation};
pub use skill::SkillUnit;
