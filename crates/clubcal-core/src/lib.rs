//! Core types and the event lifecycle service for club calendars.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement the traits in [`store`]; transports wrap
//! [`service::EventService`].

// Store implementations write `async fn`; the trait declarations spell out
// `Send` futures themselves.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod error;
pub mod event;
pub mod input;
pub mod membership;
pub mod service;
pub mod store;
pub mod temporal;

pub use error::{Action, Error, Result};

#[cfg(test)]
mod tests;
