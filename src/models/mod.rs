pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod user;

pub use appointment::*;
pub use doctor::*;
pub use filters::*;
pub use user::*;
