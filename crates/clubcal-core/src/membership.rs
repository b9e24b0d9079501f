//! Roles within a club and the single authorization policy every event
//! operation goes through.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Action, Error, Result, store::MembershipStore};

/// A caller's role within one organization. Ordered by privilege.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Member,
  Officer,
  Admin,
}

impl Role {
  /// Officers and admins may create, edit and delete the club's events.
  pub fn can_manage_events(self) -> bool { self >= Self::Officer }
}

/// Look up the caller's role in `organization_id`.
///
/// Fails with [`Error::NotAMember`] when the caller has no membership row.
pub async fn authorize<M>(
  members: &M,
  caller_id: Uuid,
  organization_id: Uuid,
  action: Action,
) -> Result<Role>
where
  M: MembershipStore,
{
  members
    .role_of(organization_id, caller_id)
    .await
    .map_err(|e| Error::storage(action, &e))?
    .ok_or(Error::NotAMember)
}

/// Like [`authorize`], but additionally demands at least `minimum`.
pub async fn require_role<M>(
  members: &M,
  caller_id: Uuid,
  organization_id: Uuid,
  minimum: Role,
  action: Action,
) -> Result<Role>
where
  M: MembershipStore,
{
  let role = authorize(members, caller_id, organization_id, action)
    .await
    .inspect_err(|e| {
      if matches!(e, Error::NotAMember) {
        tracing::debug!(%caller_id, %organization_id, ?action, "caller is not a member");
      }
    })?;

  if role < minimum {
    tracing::debug!(
      %caller_id, %organization_id, ?action, %role, %minimum,
      "role below required minimum"
    );
    return Err(Error::InsufficientRole { action });
  }
  Ok(role)
}
