pub(crate) mod clock;
pub(crate) mod error;
pub(crate) mod escalation;
pub(crate) mod integrity;
pub(crate) mod lifecycle;
pub(crate) mod model;
pub(crate) mod orchestrator;
pub(crate) mod payload;
pub(crate) mod redis_store;
pub(crate) mod shuffle;
pub(crate) mod store;
