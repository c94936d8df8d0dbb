//! Sequential uploader for traffic study scenario files.
//!
//! Files are classified by name into AM/PM count CSVs or ATTOUT text output,
//! queued per batch, and posted one at a time to the scenario upload route.
//! The server's rendered fragment is spliced back into the page after each upload.

pub mod commands;
pub mod config;
pub mod errors;
pub mod page;
pub mod security;
pub mod uploader;
