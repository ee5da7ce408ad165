pub mod domain;
pub mod incoming;
pub mod outgoing;
pub mod router;
pub mod sequence;
pub mod service;
pub mod store;
