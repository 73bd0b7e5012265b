pub mod admin_review_service;
pub mod catalog_service;
pub mod settlement_flow;
pub mod spin_service;
pub mod wheel_animator;
pub mod wheel_session;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin_review_service::*;
pub use catalog_service::*;
pub use settlement_flow::*;
pub use spin_service::*;
pub use wheel_animator::*;
pub use wheel_session::*;
