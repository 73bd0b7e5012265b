pub mod busy_flag;
pub mod request_token;
pub mod wheel_geometry;

pub use busy_flag::*;
pub use request_token::new_request_token;
pub use wheel_geometry::*;
