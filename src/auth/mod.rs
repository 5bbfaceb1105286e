pub mod access;
pub mod identity;
pub mod middleware;

pub use identity::{HttpIdentityProvider, IdentityProvider, Principal};
pub use middleware::{AuthUser, authenticate};
