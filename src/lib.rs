pub mod auth;
pub mod certificate;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod templates;
pub mod validation;

pub use routes::router;
