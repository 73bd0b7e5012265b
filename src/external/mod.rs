pub mod http_backend;
pub mod wheel_backend;

pub use http_backend::*;
pub use wheel_backend::*;
