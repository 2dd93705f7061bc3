//! Taste similarity between a reader and their connections on a book-rating
//! platform.
//!
//! A comparison run fetches every connection's commonly-rated books, scores
//! each connection with a Pearson correlation and stores one result table per
//! user. Runs happen in the background; clients poll progress and fetch the
//! stored result through the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use error::{AppError, AppResult};
