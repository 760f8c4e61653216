//! User profile and archive models for storage and API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Role;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    PendingDeletion,
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Active
    }
}

/// User profile stored in Firestore at `users/{uid}`.
///
/// Field names match the documents the web frontend already reads, hence
/// the camelCase wire format. The role is kept as the raw stored string;
/// normalization happens in the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Raw role string ("member", "contributor", "admin", legacy titles)
    #[serde(default)]
    pub role: Option<String>,
    /// Display name shown on posts, comments and RSVPs
    #[serde(default)]
    pub display_name: String,
    /// Email address (mirrors the identity record)
    #[serde(default)]
    pub email: Option<String>,
    /// Profile picture URL (storage URL or data URL)
    #[serde(default)]
    pub photo_url: Option<String>,
    /// When the membership started (RFC 3339)
    #[serde(default)]
    pub member_since: String,
    /// Board title, if any ("Sekretær", "Styremedlem")
    #[serde(default)]
    pub org_role: Option<String>,
    /// Account lifecycle status
    #[serde(default)]
    pub status: AccountStatus,
    /// When deletion was requested (RFC 3339), for `pending_deletion`
    #[serde(default)]
    pub deletion_requested_at: Option<String>,
    /// Consent flags (photo publication, newsletter, ...)
    #[serde(default)]
    pub consents: HashMap<String, bool>,
}

impl UserProfile {
    /// Synthesize the default profile for a first-time user.
    ///
    /// The display name is the email local-part, matching what the identity
    /// record gives us before the user has edited anything.
    /// Normalize the stored role string without writing repairs back.
    /// Missing, unknown and legacy-title values all read as plain members.
    pub fn normalized_role(&self) -> Role {
        match self.role.as_deref() {
            None | Some("") => Role::Member,
            Some(raw) => match crate::models::Role::normalize(raw) {
                crate::models::RoleNormalization::Role(role) => role,
                crate::models::RoleNormalization::LegacyTitle { role, .. } => role,
                crate::models::RoleNormalization::Unknown => Role::Member,
            },
        }
    }

    pub fn default_for(email: &str, now: &str) -> Self {
        let display_name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            role: Some(Role::Member.as_str().to_string()),
            display_name,
            email: Some(email.to_string()),
            photo_url: None,
            member_since: now.to_string(),
            org_role: None,
            status: AccountStatus::Active,
            deletion_requested_at: None,
            consents: HashMap::new(),
        }
    }
}

/// Reason a user ended up in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveReason {
    /// Requested deletion, purged after the grace period.
    #[serde(rename = "voluntary")]
    Voluntary,
    /// Admin-triggered immediate removal.
    #[serde(rename = "banned/immediate")]
    BannedImmediate,
}

/// Snapshot kept after a user is permanently removed, stored at
/// `archive/{uid}`. Keying by uid keeps an archive record and an active
/// user record mutually exclusive for the same identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub uid: String,
    pub full_name: String,
    pub email: String,
    /// Membership start date carried over from the profile
    #[serde(default)]
    pub start_date: Option<String>,
    /// When the account was archived (RFC 3339)
    pub end_date: String,
    pub reason: ArchiveReason,
}

impl ArchiveRecord {
    /// Build an archive record from a profile about to be removed.
    pub fn from_profile(uid: &str, profile: &UserProfile, now: &str, reason: ArchiveReason) -> Self {
        Self {
            uid: uid.to_string(),
            full_name: if profile.display_name.is_empty() {
                "Ukjent".to_string()
            } else {
                profile.display_name.clone()
            },
            email: profile
                .email
                .clone()
                .unwrap_or_else(|| "Ingen e-post".to_string()),
            start_date: if profile.member_since.is_empty() {
                None
            } else {
                Some(profile.member_since.clone())
            },
            end_date: now.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_uses_email_local_part() {
        let profile = UserProfile::default_for("kari.nordmann@example.com", "2026-01-01T00:00:00Z");
        assert_eq!(profile.display_name, "kari.nordmann");
        assert_eq!(profile.role.as_deref(), Some("member"));
        assert!(profile.photo_url.is_none());
        assert_eq!(profile.status, AccountStatus::Active);
    }

    #[test]
    fn test_archive_record_fallbacks() {
        let mut profile = UserProfile::default_for("a@b.no", "2026-01-01T00:00:00Z");
        profile.display_name = String::new();
        profile.email = None;
        profile.member_since = String::new();

        let record = ArchiveRecord::from_profile(
            "uid-1",
            &profile,
            "2026-02-01T00:00:00Z",
            ArchiveReason::Voluntary,
        );

        assert_eq!(record.full_name, "Ukjent");
        assert_eq!(record.email, "Ingen e-post");
        assert!(record.start_date.is_none());
    }

    #[test]
    fn test_archive_reason_wire_format() {
        let json = serde_json::to_string(&ArchiveReason::BannedImmediate).unwrap();
        assert_eq!(json, "\"banned/immediate\"");
        let json = serde_json::to_string(&ArchiveReason::Voluntary).unwrap();
        assert_eq!(json, "\"voluntary\"");
    }

    #[test]
    fn test_profile_missing_fields_deserialize() {
        // Old documents may lack most fields entirely
        let profile: UserProfile = serde_json::from_str("{}").unwrap();
        assert!(profile.role.is_none());
        assert_eq!(profile.status, AccountStatus::Active);
    }
}
