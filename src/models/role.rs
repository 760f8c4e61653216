// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access roles and their capability set.
//!
//! Role strings in stored documents are inconsistently capitalized and the
//! oldest records carry board titles ("sekretær", "styremedlem") in the role
//! field. All of that is normalized once, at the store boundary, so the rest
//! of the code only ever sees this enum.

use serde::{Deserialize, Serialize};

/// Access level of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Contributor,
    Admin,
}

/// Result of normalizing a raw role string from a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleNormalization {
    /// A recognized role value (possibly after case folding).
    Role(Role),
    /// A legacy board title stored in the role field; the account is a
    /// regular member and the title belongs in the organization-role field.
    LegacyTitle { role: Role, org_role: String },
    /// Not a role we know. Treated the same as a missing role.
    Unknown,
}

impl Role {
    /// Normalize a raw role string from a stored document.
    pub fn normalize(raw: &str) -> RoleNormalization {
        match raw.trim().to_lowercase().as_str() {
            "member" | "medlem" => RoleNormalization::Role(Role::Member),
            "contributor" => RoleNormalization::Role(Role::Contributor),
            "admin" => RoleNormalization::Role(Role::Admin),
            "sekretær" | "sekretaer" => RoleNormalization::LegacyTitle {
                role: Role::Member,
                org_role: "Sekretær".to_string(),
            },
            "styremedlem" => RoleNormalization::LegacyTitle {
                role: Role::Member,
                org_role: "Styremedlem".to_string(),
            },
            _ => RoleNormalization::Unknown,
        }
    }

    /// The canonical string stored in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Contributor => "contributor",
            Role::Admin => "admin",
        }
    }

    // ─── Capabilities ────────────────────────────────────────────
    //
    // View logic checks capabilities, never role strings.

    /// Publish posts to the members feed.
    pub fn can_publish_posts(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Publish events to the arrangements page.
    pub fn can_publish_events(&self) -> bool {
        matches!(self, Role::Admin | Role::Contributor)
    }

    /// Manage user accounts (delete, restore, archive).
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Delete posts and events authored by anyone.
    pub fn can_delete_content(&self) -> bool {
        matches!(self, Role::Admin)
    }
}
