mod parsing;
mod settings;
mod types;

pub(crate) use types::{SessionSettings, Settings, StoreBackend};
