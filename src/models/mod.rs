// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod content;
pub mod role;
pub mod user;

pub use content::{Comment, Event, EventRsvp, GalleryImage, Post, Reaction, RsvpStatus};
pub use role::{Role, RoleNormalization};
pub use user::{AccountStatus, ArchiveReason, ArchiveRecord, UserProfile};
