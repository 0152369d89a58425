//! Headless client for the marketplace REST backend.
//!
//! Pages are driven through [`state::AppContext`]: list views use
//! [`controllers::ListController`], row actions use
//! [`controllers::MutationController`], and create/edit screens use the
//! controllers in [`forms`].

pub mod admin;
pub mod auth;
pub mod blogs;
pub mod complaints;
pub mod config;
pub mod controllers;
pub mod error;
pub mod forms;
pub mod http;
pub mod logging;
pub mod models;
pub mod notify;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod routes;
pub mod settings;
pub mod state;
pub mod uploads;

#[cfg(test)]
pub(crate) mod testkit;

pub use error::{ClientError, FieldErrors};
pub use state::AppContext;
