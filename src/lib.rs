//! # taskflow
//!
//! A task and project manager for the terminal: tasks carry a priority,
//! a status and an optional due date, projects nest into a forest, and tasks
//! can be viewed as a filtered, sorted and grouped list or laid out on a
//! daily, weekly or monthly calendar.
//!
//! ## Layout
//!
//! - [`store`]: the authoritative collections, validation, write-through
//!   persistence and change notifications.
//! - [`storage`]: the key-value contract the store persists through, with a
//!   JSON-file backend and an in-memory one.
//! - [`view`], [`calendar`], [`tree`]: pure derivations over store slices.
//! - [`cmd`], [`tui`]: the command line and the terminal UI.
//!
//! ## Example
//!
//! ```
//! use taskflow::store::Store;
//! use taskflow::task::TaskDraft;
//! use taskflow::view::{derive_view, ViewOptions};
//!
//! let mut store = Store::in_memory();
//! store.create_task(TaskDraft::new("Write report")).unwrap();
//! let groups = derive_view(store.tasks(), &ViewOptions::default());
//! assert_eq!(groups[0].tasks.len(), 1);
//! ```
//!
//! Data is stored as one JSON file per collection in the configured data
//! directory (`tasks.json` and `projects.json` by default).

pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fields;
pub mod format;
pub mod project;
pub mod storage;
pub mod store;
pub mod task;
pub mod tree;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod calendar_view;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

pub use error::{Error, Result};
