//! Folio Client - client-side session core
//!
//! Holds the current identity, keeps it mirrored across the durable store and
//! the cookie jar, and decides how restricted content is presented.

pub mod backend;
pub mod client;
pub mod content_access;
pub mod context;
pub mod flow;
pub mod navigation;
pub mod store;

pub use backend::{CookieStore, FileBackend, MemoryBackend, StorageBackend};
pub use client::{
    AuthClient, AuthOperation, ClientError, ClientResult, ResetPasswordRequest, SignInRequest,
    SignInResponse, SignUpRequest,
};
pub use content_access::{decide, ContentAccess, DisplayMode, RenderChoice, RestrictedPlaceholder};
pub use context::SessionContext;
pub use flow::AuthFlow;
pub use navigation::{LogoutCountdown, Navigator, TracingNavigator};
pub use store::{SessionKeys, SessionStore};
