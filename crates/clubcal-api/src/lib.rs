//! JSON REST API for club calendars.
//!
//! Exposes an axum [`Router`] backed by an [`EventService`] over any store
//! implementing both [`EventStore`] and [`MembershipStore`]. Authentication
//! is the upstream identity provider's job; see [`identity`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", clubcal_api::api_router(AppState::new(store, invalidator)))
//! ```

pub mod calendar;
pub mod error;
pub mod etag;
pub mod events;
pub mod identity;
pub mod invalidate;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use clubcal_core::{
  service::EventService,
  store::{EventStore, MembershipStore},
};

pub use error::ApiError;
pub use invalidate::BroadcastInvalidator;

/// The service type the API drives: one store for both events and
/// memberships, broadcasting invalidations.
pub type Service<S> = EventService<S, S, BroadcastInvalidator>;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub service: Arc<Service<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { service: Arc::clone(&self.service) } }
}

impl<S> AppState<S>
where
  S: EventStore + MembershipStore + Clone,
{
  pub fn new(store: S, invalidator: BroadcastInvalidator) -> Self {
    Self {
      service: Arc::new(EventService::new(store.clone(), store, invalidator)),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: EventStore + MembershipStore + 'static,
{
  Router::new()
    .route(
      "/clubs/{club_id}/events",
      get(events::list::<S>).post(events::create::<S>),
    )
    .route(
      "/clubs/{club_id}/events/{event_id}",
      get(events::get_one::<S>)
        .put(events::update::<S>)
        .delete(events::delete_one::<S>),
    )
    .route(
      "/clubs/{club_id}/events/{event_id}/media",
      put(events::attach_media::<S>),
    )
    .route("/calendar", get(calendar::handler::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
