#![doc = "The `todo_backend` library crate."]
#![doc = ""]
#![doc = "Accounts, session tokens, owner-scoped tasks and job dispatch for a TodoMVC-style"]
#![doc = "backend, plus the HTTP routes that expose them. The binary (`main.rs`) only wires"]
#![doc = "configuration, storage and the queue together and starts the server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod tasks;

pub use crate::error::{AppError, AppResult};
pub use crate::state::AppState;
