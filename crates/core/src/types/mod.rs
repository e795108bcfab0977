//! Core types for the community platform.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod nickname;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use nickname::{Nickname, NicknameError};
pub use user::UserSummary;
