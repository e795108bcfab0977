//! Integration test support.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p community-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `edge_redirect` - The edge router end to end, driven with `tower::ServiceExt`
//! - `session_client` - The client runtime against an in-process mock backend
//!
//! Nothing here needs a network beyond the loopback interface.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod mock_backend;

/// iPhone Safari.
pub const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

/// Desktop Chrome on Windows.
pub const DESKTOP_CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
