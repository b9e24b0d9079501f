//! Error types for `clubcal-core`.
//!
//! Every variant renders as the message shown to the person who attempted the
//! operation. Messages never contain internal identifiers.

use serde::Serialize;
use thiserror::Error;

/// The mutating or reading operation an error refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  #[strum(serialize = "create")]
  Create,
  #[strum(serialize = "update")]
  Update,
  #[strum(serialize = "delete")]
  Delete,
  #[strum(serialize = "attach media to")]
  AttachMedia,
  #[strum(serialize = "view")]
  View,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("You are not a member of this club")]
  NotAMember,

  #[error("Only club admins and officers can {action} events")]
  InsufficientRole { action: Action },

  #[error("Event not found")]
  EventNotFound,

  #[error("Event does not belong to this club")]
  EventNotInOrganization,

  #[error("{}", passed_message(.action))]
  EventHasPassed { action: Action },

  #[error("Event end time must be after start time")]
  InvalidTimeWindow,

  #[error("Event title is required")]
  MissingTitle,

  #[error("Please select at least one major if not targeting all majors")]
  NoTargetMajors,

  #[error("A location name is required for in-person and hybrid events")]
  MissingLocation,

  #[error("An address is required for off-campus and hybrid events")]
  MissingAddress,

  #[error("An online URL is required for online and hybrid events")]
  MissingOnlineUrl,

  #[error("Event was modified by someone else; reload and try again")]
  VersionConflict,

  #[error("{}", storage_message(.action, .message))]
  Storage {
    action:  Action,
    /// Underlying backend message, when there is one worth showing.
    message: Option<String>,
  },
}

impl Error {
  /// Wrap a backend failure that happened while performing `action`.
  pub fn storage(action: Action, source: &dyn std::error::Error) -> Self {
    let message = source.to_string();
    Self::Storage {
      action,
      message: (!message.is_empty()).then_some(message),
    }
  }

  /// Stable machine-readable discriminant for transports.
  pub fn code(&self) -> &'static str {
    match self {
      Self::NotAMember => "not_a_member",
      Self::InsufficientRole { .. } => "insufficient_role",
      Self::EventNotFound => "event_not_found",
      Self::EventNotInOrganization => "event_not_in_organization",
      Self::EventHasPassed { .. } => "event_has_passed",
      Self::InvalidTimeWindow => "invalid_time_window",
      Self::MissingTitle => "missing_title",
      Self::NoTargetMajors => "no_target_majors",
      Self::MissingLocation => "missing_location",
      Self::MissingAddress => "missing_address",
      Self::MissingOnlineUrl => "missing_online_url",
      Self::VersionConflict => "version_conflict",
      Self::Storage { .. } => "storage_failure",
    }
  }

  /// `true` for authorization failures (not a member, role too low).
  pub fn is_authorization(&self) -> bool {
    matches!(self, Self::NotAMember | Self::InsufficientRole { .. })
  }

  /// `true` for failures detected before any storage access.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::EventHasPassed { .. }
        | Self::InvalidTimeWindow
        | Self::MissingTitle
        | Self::NoTargetMajors
        | Self::MissingLocation
        | Self::MissingAddress
        | Self::MissingOnlineUrl
    )
  }
}

fn passed_message(action: &Action) -> &'static str {
  match action {
    Action::Create => "Cannot create events that have already passed",
    _ => "Cannot edit events that have already passed",
  }
}

fn storage_message(action: &Action, message: &Option<String>) -> String {
  match message {
    Some(m) => m.clone(),
    None => format!("Failed to {action} event"),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
