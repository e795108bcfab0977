//! Community Core - Shared types library.
//!
//! This crate provides the types and pure policies shared by every surface of
//! the community platform:
//! - `client` - Session runtime embedded in the web, mobile-web and WebView surfaces
//! - `edge` - Request-time device redirect gate in front of the web surfaces
//! - `cli` - Operator tools for inspecting routing and WebView bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. The same redirect policy therefore runs unchanged in the
//! client and at the edge.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, nicknames and users
//! - [`auth`] - Backend auth request/response shapes
//! - [`device`] - User-agent classification into [`DeviceInfo`]
//! - [`routing`] - The desktop/mobile host redirect policy
//! - [`message`] - WebView bridge messages as a closed tagged union

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod device;
pub mod message;
pub mod routing;
pub mod types;

pub use device::{DeviceInfo, Platform};
pub use message::{BridgeMessage, MessageError, MessageType, WebViewMessage};
pub use routing::{RedirectDecision, RedirectKind, RedirectPolicy};
pub use types::*;
