pub mod admin;
pub mod api;
pub mod configuration;
pub mod error_handling;
pub mod feed;
pub mod notification;
pub mod presentation;
pub mod scheduler;
pub mod web_interface;
