//! Folio Core - identity model and access policy
//!
//! Shared by the client-side session core and the server-side route gate so
//! that both enforcement points evaluate the same rule.

pub mod access;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod route;
pub mod types;

pub use access::*;
pub use config::*;
pub use content::*;
pub use error::*;
pub use logging::*;
pub use route::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
