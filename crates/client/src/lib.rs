//! Community client session runtime.
//!
//! This crate provides the client side of cross-surface authentication and
//! device routing for the desktop web, mobile web and WebView surfaces.
//!
//! # Modules
//!
//! - [`runtime`] - Host environment seams (user agent, shell, storage, cookies, navigation)
//! - [`device`] - Cached device classification and surface redirects
//! - [`bridge`] - Messaging with the native shell
//! - [`auth_bridge`] - Credential replication to cookies, storage and shell
//! - [`session`] - Shared observable auth state
//! - [`store`] - The login/logout/register state machine
//! - [`http`] - The single backend gateway with global 401 handling
//! - [`context`] - Wiring for one page

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth_bridge;
pub mod bridge;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod http;
pub mod runtime;
pub mod session;
pub mod store;

pub use auth_bridge::{AuthBridge, ChannelOutcome, Reconciliation, SyncReport, injection_script};
pub use bridge::{Delivery, Subscription, WebViewBridge};
pub use config::{ClientConfig, CredentialMode};
pub use context::ClientContext;
pub use device::DeviceDetector;
pub use error::{BridgeError, ClientError};
pub use http::SessionClient;
pub use session::{AuthStatus, ClientAuthState, SessionState};
pub use store::{AuthBackend, AuthSessionStore};
