pub mod aggregate;
pub mod fallback;
pub mod handlers;
pub mod models;
pub mod query;
pub mod service;
