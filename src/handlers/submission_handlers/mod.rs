pub mod manage;
pub mod submit;

pub use manage::{delete, download, list};
pub use submit::submit;
