//! Background Tasks Module
//!
//! Tasks that run alongside an interactive session.
//!
//! # Tasks
//! - Cache sweep: deletes expired cache files at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
