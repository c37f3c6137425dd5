//! Mock DB Server
//!
//! A file-backed mock HTTP server. Request paths map to JSON payloads stored
//! in a single database file, optionally generated from a template with
//! variables and random value functions.
//!
//! # Features
//!
//! - **Plain Databases**: Serve pre-recorded JSON payloads by exact path
//! - **Templated Databases**: Handlebars body plus a parameter block after `---`
//! - **Random Generators**: Strings, ints, floats and arrays within constraints
//! - **Static or Dynamic**: Load once at startup or regenerate on every request
//! - **CORS Friendly**: Preflight handling and origin echo
//!
//! # Example Database
//!
//! ```text
//! {"urls": {"/user": {"json": {"id": {{id}}, "name": {{name}}, "tags": {{tags}}}}}}
//! ---
//! {
//!   "variables": {"name": "Ada"},
//!   "functions": {
//!     "rand": {"id": {"type": "int", "min": 1, "max": 1000}},
//!     "array": {"tags": {"type": "string", "arraysize": 3, "size": 6}}
//!   }
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod generator;
pub mod params;
pub mod server;
pub mod template;

pub use config::ServerConfig;
pub use database::{load, RouteTable};
pub use error::{GeneratorError, LoadError};
pub use generator::RandomSource;
pub use server::MockServer;
