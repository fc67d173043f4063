//! Run configuration, engine environment and the stage sequence tying everything together.

pub(crate) mod environment;
pub(crate) mod orchestrator;
pub(crate) mod settings;
