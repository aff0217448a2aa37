// File: ./src/lib.rs
// Crate root library declaration and module exports.
pub mod address;
pub mod cli;
pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod mailer;
pub mod model;
pub mod paths;
pub mod report;
pub mod window;
