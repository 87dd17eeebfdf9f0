//! One-request-lifetime temp data for `tower` services.
//!
//! Values stashed in [`TempData`] while handling one request become visible to the next request
//! from the same client and then vanish, unless kept for one more hop. The mapping is persisted
//! exactly once per request, either into a protected cookie ([`CookieBackend`]) or into a slot of
//! the `tower_sessions` session ([`SessionBackend`]).
//!
//! # Security
//! The default cookie protection is authenticated encryption (`private` feature). Cookie payloads
//! are client input: anything that fails base64 decoding, authentication or payload decoding is
//! treated as "no temp data".
//!
//! The `dangerous-plaintext` feature enables a pass-through protector. This offers **no tamper
//! resistance** and should only be used for **testing and debugging**.

mod backend;
mod config;
mod cookie;
mod error;
pub mod filter;
pub mod format;
pub mod layer;
mod protector;
mod response;
mod session;
mod store;
mod value;

pub use tower_cookies::cookie::SameSite;
pub use tower_sessions_core::Session;

#[cfg(any(feature = "signed", feature = "private"))]
pub use tower_cookies::Key;

pub use crate::backend::{PathBase, RequestContext, TempDataBackend};
pub use crate::config::{CookieTempDataConfig, DEFAULT_COOKIE_NAME};
pub use crate::cookie::CookieBackend;
pub use crate::error::{Error, Result};
pub use crate::layer::TempDataLayer;
pub use crate::protector::{DEFAULT_PURPOSE, Protector};
pub use crate::response::{KeepTempData, RequestItems, ResponseStart, ResultKind};
pub use crate::session::{DEFAULT_SESSION_KEY, SessionBackend};
pub use crate::store::TempData;
pub use crate::value::{DateTimeKind, EnumValue, TempEnum, TempMap, TempValue, Timestamp};

#[cfg(feature = "private")]
pub use crate::protector::PrivateProtector;

#[cfg(feature = "signed")]
pub use crate::protector::SignedProtector;

#[cfg(feature = "dangerous-plaintext")]
pub use crate::protector::DangerousPlaintext;
