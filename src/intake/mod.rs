//! Submission intake: multipart parsing, file screening and upload,
//! required-field validation, persistence and owner notification.

pub mod files;
pub mod multipart;
pub mod notify;
pub mod persister;
pub mod validator;
