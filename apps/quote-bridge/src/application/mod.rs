//! Application Layer
//!
//! Orchestration between the outer surfaces and the upstream connection.

pub mod services;

pub use services::{FacadeError, SubscriptionFacade};
