//! External-interface data types: the already-resolved user and
//! organization facts a caller hands the engine. The engine never queries
//! any identity or org store directly.

pub mod actor;
pub mod organization;
pub mod user;

pub use actor::Actor;
pub use organization::{Designation, Group, OrganizationContext, Position};
pub use user::User;
