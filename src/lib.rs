//! PR Reviewers - pull request lifecycle and reviewer assignment service.
//!
//! Pull requests are created with up to two reviewers drawn at random from
//! the author's team, can have reviewers swapped while open, and are merged
//! exactly once. State lives in SQLite and is served over a JSON HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod store;
