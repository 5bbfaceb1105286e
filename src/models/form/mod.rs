pub mod queries;
pub mod theme;
pub mod types;

pub use queries::*;
pub use theme::*;
pub use types::*;
