mod base;

pub use base::{EventBus, EventEmitter, LaunchEvent, LaunchId, LaunchState};
