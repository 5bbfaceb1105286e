pub mod schema;
pub mod types;

pub use schema::*;
pub use types::*;
