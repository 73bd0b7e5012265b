pub mod session_context;
pub mod store;

pub use session_context::*;
pub use store::*;
