//! Timesheet sharing between a worker (owner) and a manager (viewer).
//!
//! The owner generates a short-lived [`PendingToken`] and shows it as a QR
//! code. The viewer scans it and redeems the token, which creates an
//! [`AccessGrant`] and consumes the token. Depending on
//! [`AccessPolicy::require_owner_approval`], the grant starts `active` or
//! waits as `pending` until the owner approves it. Only the owner can revoke,
//! and revocation is terminal.
//!
//! ```text
//!   generate-token ──▶ PendingToken ──redeem──▶ ┌─────────┐ approve ┌────────┐
//!                       (5 min TTL)             │ pending │────────▶│ active │
//!                                   (no approval)└─────────┘         └────────┘
//!                                         └──────────────────────────────▲
//!                                   pending/active ──revoke──▶ revoked (terminal)
//! ```
//!
//! Every read of another identity's sessions must pass
//! [`AccessManager::authorize_read`] first.

use crate::libs::error::{Result, TimekeeperError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// `app` field every QR payload must carry.
pub const QR_APP: &str = "onsite-timekeeper";
/// `action` field of a linking QR payload.
pub const QR_ACTION_LINK: &str = "link";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 5;
const DEFAULT_OWNER_NAME: &str = "User";
const TOKEN_LENGTH: usize = 32;

/// Lifecycle state of an access grant.
///
/// `Expired` exists in the model but nothing in this crate moves a grant into
/// it; an external process may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Pending,
    Active,
    Revoked,
    Expired,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "pending",
            GrantStatus::Active => "active",
            GrantStatus::Revoked => "revoked",
            GrantStatus::Expired => "expired",
        }
    }

    /// Whether an owner-driven transition from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: GrantStatus) -> bool {
        matches!(
            (self, next),
            (GrantStatus::Pending, GrantStatus::Active) | (GrantStatus::Pending, GrantStatus::Revoked) | (GrantStatus::Active, GrantStatus::Revoked)
        )
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantStatus {
    type Err = TimekeeperError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(GrantStatus::Pending),
            "active" => Ok(GrantStatus::Active),
            "revoked" => Ok(GrantStatus::Revoked),
            "expired" => Ok(GrantStatus::Expired),
            other => Err(TimekeeperError::validation(format!("Unknown grant status: {}", other))),
        }
    }
}

/// A viewer's permission to read an owner's sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessGrant {
    pub id: String,
    pub owner_id: String,
    pub viewer_id: String,
    /// The redeemed token, kept for audit.
    pub token: String,
    pub status: GrantStatus,
    /// Owner display name captured from the redeemed token.
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// A single-use linking credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingToken {
    pub id: String,
    pub token: String,
    pub owner_id: String,
    /// Display name captured when the token was generated.
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingToken {
    /// A token is usable strictly before `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// JSON carried inside the linking QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub app: String,
    pub action: String,
    pub token: String,
    pub owner_name: String,
}

impl QrPayload {
    pub fn for_token(token: &PendingToken) -> Self {
        Self {
            app: QR_APP.to_string(),
            action: QR_ACTION_LINK.to_string(),
            token: token.token.clone(),
            owner_name: token.owner_name.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes scanned text, rejecting anything that is not a linking payload
    /// for this app.
    pub fn parse(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Loose {
            app: Option<String>,
            action: Option<String>,
            token: Option<String>,
            owner_name: Option<String>,
        }

        let invalid = || TimekeeperError::validation("Invalid QR code");
        let loose: Loose = serde_json::from_str(text.trim()).map_err(|_| invalid())?;

        if loose.app.as_deref() != Some(QR_APP) || loose.action.as_deref() != Some(QR_ACTION_LINK) {
            return Err(invalid());
        }
        let token = loose.token.filter(|t| !t.trim().is_empty()).ok_or_else(invalid)?;

        Ok(Self {
            app: QR_APP.to_string(),
            action: QR_ACTION_LINK.to_string(),
            token,
            owner_name: loose.owner_name.unwrap_or_default(),
        })
    }
}

/// Status fields changed by approve/revoke.
#[derive(Debug, Clone)]
pub struct GrantUpdate {
    pub status: GrantStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Storage contract for grants and pending tokens.
pub trait GrantStore {
    fn insert_token(&mut self, token: &PendingToken) -> Result<()>;

    /// Looks a token up by its value, expired or not.
    fn find_token(&mut self, token: &str) -> Result<Option<PendingToken>>;

    /// Consumes `token` and inserts `grant` as one atomic step.
    ///
    /// Fails with `NotFound` when the token row is already gone (another
    /// redemption won) and with `Conflict` when a non-revoked grant exists for
    /// the pair; in both cases nothing is written.
    fn redeem(&mut self, token: &PendingToken, grant: &AccessGrant) -> Result<()>;

    fn get_grant(&mut self, id: &str) -> Result<Option<AccessGrant>>;

    /// Most recent grant for the pair, optionally restricted to one status.
    fn find_grant(&mut self, owner_id: &str, viewer_id: &str, status: Option<GrantStatus>) -> Result<Option<AccessGrant>>;

    fn update_grant(&mut self, id: &str, update: &GrantUpdate) -> Result<()>;

    /// Grants where `owner_id` is the owner, newest first.
    fn grants_for_owner(&mut self, owner_id: &str) -> Result<Vec<AccessGrant>>;

    /// Grants where `viewer_id` is the viewer, newest first.
    fn grants_for_viewer(&mut self, viewer_id: &str, status: Option<GrantStatus>) -> Result<Vec<AccessGrant>>;
}

/// Knobs of the grant lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// When set, redeemed grants start `pending` and need owner approval.
    pub require_owner_approval: bool,
    pub token_ttl: Duration,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            require_owner_approval: false,
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }
}

/// Drives the grant state machine over a [`GrantStore`].
pub struct AccessManager<S: GrantStore> {
    store: S,
    policy: AccessPolicy,
}

impl<S: GrantStore> AccessManager<S> {
    pub fn new(store: S, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    pub fn generate_token(&mut self, owner_id: &str, owner_name: &str) -> Result<PendingToken> {
        self.generate_token_at(owner_id, owner_name, Utc::now())
    }

    /// Creates and persists a fresh token for `owner_id`. No grant exists yet.
    pub fn generate_token_at(&mut self, owner_id: &str, owner_name: &str, now: DateTime<Utc>) -> Result<PendingToken> {
        require_identity(owner_id)?;

        let owner_name = match owner_name.trim() {
            "" => DEFAULT_OWNER_NAME.to_string(),
            name => name.to_string(),
        };
        let token = PendingToken {
            id: uuid::Uuid::new_v4().to_string(),
            token: new_token_value(),
            owner_id: owner_id.to_string(),
            owner_name,
            created_at: now,
            expires_at: now + self.policy.token_ttl,
        };
        self.store.insert_token(&token)?;

        info!(owner_id, expires_at = %token.expires_at, "Generated linking token");
        Ok(token)
    }

    /// Redeems the scanned QR text on behalf of `viewer_id`.
    pub fn redeem_payload(&mut self, payload: &str, viewer_id: &str) -> Result<AccessGrant> {
        self.redeem_payload_at(payload, viewer_id, Utc::now())
    }

    pub fn redeem_payload_at(&mut self, payload: &str, viewer_id: &str, now: DateTime<Utc>) -> Result<AccessGrant> {
        let payload = QrPayload::parse(payload)?;
        self.redeem_at(&payload.token, viewer_id, now)
    }

    pub fn redeem(&mut self, token: &str, viewer_id: &str) -> Result<AccessGrant> {
        self.redeem_at(token, viewer_id, Utc::now())
    }

    /// Consumes `token` and grants `viewer_id` access to the token owner.
    pub fn redeem_at(&mut self, token: &str, viewer_id: &str, now: DateTime<Utc>) -> Result<AccessGrant> {
        require_identity(viewer_id)?;

        let pending = self
            .store
            .find_token(token)?
            .ok_or_else(|| TimekeeperError::not_found("Token invalid or expired"))?;
        if pending.is_expired_at(now) {
            debug!(token_id = %pending.id, "Rejected expired token");
            return Err(TimekeeperError::Expired("Token invalid or expired".to_string()));
        }
        if pending.owner_id == viewer_id {
            return Err(TimekeeperError::validation("You cannot link to your own timesheet"));
        }

        let (status, accepted_at) = if self.policy.require_owner_approval {
            (GrantStatus::Pending, None)
        } else {
            (GrantStatus::Active, Some(now))
        };
        let grant = AccessGrant {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: pending.owner_id.clone(),
            viewer_id: viewer_id.to_string(),
            token: pending.token.clone(),
            status,
            label: Some(pending.owner_name.clone()),
            created_at: now,
            accepted_at,
            revoked_at: None,
        };
        self.store.redeem(&pending, &grant)?;

        info!(grant_id = %grant.id, owner_id = %grant.owner_id, viewer_id, status = %grant.status, "Redeemed linking token");
        Ok(grant)
    }

    pub fn approve(&mut self, grant_id: &str, actor_id: &str) -> Result<AccessGrant> {
        self.approve_at(grant_id, actor_id, Utc::now())
    }

    /// Owner promotes a `pending` grant to `active`.
    pub fn approve_at(&mut self, grant_id: &str, actor_id: &str, now: DateTime<Utc>) -> Result<AccessGrant> {
        let mut grant = self.owned_grant(grant_id, actor_id)?;
        if !grant.status.can_transition_to(GrantStatus::Active) {
            return Err(TimekeeperError::validation(format!("Grant is {}, only pending grants can be approved", grant.status)));
        }

        grant.status = GrantStatus::Active;
        grant.accepted_at = Some(now);
        self.store.update_grant(
            &grant.id,
            &GrantUpdate {
                status: grant.status,
                accepted_at: grant.accepted_at,
                revoked_at: None,
            },
        )?;

        info!(grant_id, "Approved access grant");
        Ok(grant)
    }

    pub fn revoke(&mut self, grant_id: &str, actor_id: &str) -> Result<AccessGrant> {
        self.revoke_at(grant_id, actor_id, Utc::now())
    }

    /// Owner revokes an `active` or `pending` grant. Terminal.
    pub fn revoke_at(&mut self, grant_id: &str, actor_id: &str, now: DateTime<Utc>) -> Result<AccessGrant> {
        let mut grant = self.owned_grant(grant_id, actor_id)?;
        if !grant.status.can_transition_to(GrantStatus::Revoked) {
            return Err(TimekeeperError::validation(format!("Grant is {} and cannot be revoked", grant.status)));
        }

        grant.status = GrantStatus::Revoked;
        grant.revoked_at = Some(now);
        self.store.update_grant(
            &grant.id,
            &GrantUpdate {
                status: grant.status,
                accepted_at: grant.accepted_at,
                revoked_at: grant.revoked_at,
            },
        )?;

        info!(grant_id, "Revoked access grant");
        Ok(grant)
    }

    /// Succeeds when `requester` may read `owner_id`'s sessions.
    ///
    /// Owners can always read their own data. Anyone else needs an active
    /// grant; otherwise the answer is `AccessDenied`, whether or not the
    /// owner exists.
    pub fn authorize_read(&mut self, requester_id: &str, owner_id: &str) -> Result<()> {
        require_identity(requester_id)?;
        if requester_id == owner_id {
            return Ok(());
        }
        match self.store.find_grant(owner_id, requester_id, Some(GrantStatus::Active))? {
            Some(_) => Ok(()),
            None => {
                debug!(requester_id, "Denied read without active grant");
                Err(TimekeeperError::AccessDenied)
            }
        }
    }

    pub fn owner_grants(&mut self, owner_id: &str) -> Result<Vec<AccessGrant>> {
        self.store.grants_for_owner(owner_id)
    }

    /// Owners whose timesheets `viewer_id` can currently read.
    pub fn viewer_grants(&mut self, viewer_id: &str) -> Result<Vec<AccessGrant>> {
        self.store.grants_for_viewer(viewer_id, Some(GrantStatus::Active))
    }

    fn owned_grant(&mut self, grant_id: &str, actor_id: &str) -> Result<AccessGrant> {
        require_identity(actor_id)?;
        let grant = self
            .store
            .get_grant(grant_id)?
            .ok_or_else(|| TimekeeperError::not_found(format!("Grant {}", grant_id)))?;
        if grant.owner_id != actor_id {
            return Err(TimekeeperError::AccessDenied);
        }
        Ok(grant)
    }
}

fn require_identity(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(TimekeeperError::NotAuthenticated);
    }
    Ok(())
}

/// 32 lowercase hex characters.
fn new_token_value() -> String {
    let mut value = uuid::Uuid::new_v4().simple().to_string();
    value.truncate(TOKEN_LENGTH);
    value
}
