pub mod config;
pub mod error;
pub mod linkage;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod signature;
pub mod telemetry;
pub mod template;
pub mod versioning;
pub mod workflow;
