pub mod handlers;
pub mod server;

pub use server::{build_app, serve_on, HttpServer};
