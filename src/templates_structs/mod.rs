// Response bodies and Askama template contexts, organized by concern.
// All types are re-exported: `use formdesk::templates_structs::*`

pub mod api;
pub mod email;

pub use api::*;
pub use email::*;
