pub mod common;
pub mod payment;
pub mod prize;
pub mod spin_record;
pub mod user;

pub use common::*;
pub use payment::*;
pub use prize::*;
pub use spin_record::*;
pub use user::*;
