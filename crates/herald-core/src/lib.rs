//! Core types, store abstraction and notification engine for Herald.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::NotifyStore`]; the [`engine::Notifier`] drives
//! event registration, fan-out, follow/unfollow and delivery on top of any
//! such backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod notification;
pub mod store;
pub mod subscription;
pub mod user;

pub use error::{Error, Result};
