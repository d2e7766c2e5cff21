//! Infrastructure layer: configuration, permit storage, command orchestration.

pub mod config;
pub mod dispatcher;
pub mod store;

mod integration_tests;

pub use config::EngineConfig;
pub use dispatcher::{DispatchError, TransitionDispatcher};
pub use store::{InMemoryPermitStore, PermitStore, StoreError};
