// src/lib.rs
pub mod config;
pub mod engine;
pub mod rpc;
pub mod sigpro;
pub mod store;
pub mod types;
pub mod weavess;
pub use config::AppConfig;
pub use engine::{dispatch, spawn_workers, WorkerContext, WorkerPool};
pub use rpc::{Delivery, PendingCall, ResponseSlot, WorkerClient};
pub use sigpro::PipelineError;
pub use store::{StoreSnapshot, WaveformStore};
