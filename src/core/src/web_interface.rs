//! Local dashboard exposing the synchronized feed over HTTP.
pub mod routes;
pub mod types;
pub mod web_server;

pub use routes::routes;
pub use web_server::WebServer;
