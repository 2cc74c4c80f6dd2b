//! ProjectDesk: offline tracking of projects, tasks, team members and documents.
//!
//! The [`db::Database`] handle owns the in-memory entity store and writes every
//! mutation through to a JSON dataset file. [`query`] runs filters, search,
//! dashboard statistics and schedule analysis over a borrowed store, and
//! [`prefs`] keeps cross-session settings.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod prefs;
pub mod query;

pub use error::{Error, Result};
