// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View models: what a bound region redraws from the latest snapshot.
//!
//! Each snapshot callback rebuilds the whole region view; there is no
//! incremental patching or client-side reordering.

use crate::db::Doc;
use crate::models::{Comment, Event, EventRsvp, GalleryImage, Post, Reaction, RsvpStatus};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The rendered state of one bound feed region.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedView {
    /// No snapshot yet (and no paint hint available).
    Loading,
    Posts {
        posts: Vec<PostView>,
    },
    Events {
        upcoming: Vec<EventView>,
        /// Newest past event first
        past: Vec<EventView>,
    },
    Gallery {
        images: Vec<String>,
    },
    Comments {
        post_id: String,
        comments: Vec<CommentView>,
    },
    Reactions {
        post_id: String,
        likes: u32,
        reactions: Vec<ReactionView>,
    },
    Rsvps {
        event_id: String,
        coming_count: u32,
        /// Display names of everyone coming
        coming: Vec<String>,
        entries: Vec<RsvpView>,
    },
    /// Subscription failure for this region only; siblings keep working.
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub created_at: String,
    /// "4. november 2025, 19:45"
    pub created_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub date_label: String,
    pub location: String,
    pub image_url: Option<String>,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentView {
    pub author_name: String,
    pub body: String,
    pub created_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReactionView {
    pub user_id: String,
    pub user_name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RsvpView {
    pub user_id: String,
    pub user_name: String,
    pub status: RsvpStatus,
}

const NB_MONTHS: [&str; 12] = [
    "januar", "februar", "mars", "april", "mai", "juni", "juli", "august", "september", "oktober",
    "november", "desember",
];

/// Format an RFC 3339 timestamp the way the site displays dates:
/// "4. november 2025, 19:45". Unparseable input becomes "Ukjent dato".
pub fn format_nb_datetime(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(date) => {
            let date = date.with_timezone(&Utc);
            let month = NB_MONTHS[date.month0() as usize];
            format!(
                "{}. {} {}, {:02}:{:02}",
                date.day(),
                month,
                date.year(),
                date.hour(),
                date.minute()
            )
        }
        Err(_) => "Ukjent dato".to_string(),
    }
}

/// Build the posts region view.
pub fn posts_view(posts: Vec<Doc<Post>>) -> FeedView {
    let posts = posts
        .into_iter()
        .map(|doc| {
            let id = doc.id_str().to_string();
            let post = doc.data;
            PostView {
                id,
                title: post.title,
                content: post.content,
                author_name: post.author_name,
                created_label: format_nb_datetime(&post.created_at),
                created_at: post.created_at,
            }
        })
        .collect();
    FeedView::Posts { posts }
}

/// Build the events region view, split into upcoming and past around the
/// start of today. Past events are shown newest first.
pub fn events_view(events: Vec<Doc<Event>>, now: DateTime<Utc>) -> FeedView {
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);

    let mut upcoming = Vec::new();
    let mut past = Vec::new();

    for doc in events {
        let id = doc.id_str().to_string();
        let event = doc.data;
        let view = EventView {
            id,
            title: event.title,
            description: event.description,
            date_label: format_nb_datetime(&event.date),
            location: event.location,
            image_url: event.image_url,
            author_name: event.author_name,
            date: event.date,
        };

        let is_past = DateTime::parse_from_rfc3339(&view.date)
            .map(|d| d.with_timezone(&Utc) < today_start)
            .unwrap_or(false);

        if is_past {
            past.push(view);
        } else {
            upcoming.push(view);
        }
    }

    // The query orders ascending by date; newest past first
    past.reverse();

    FeedView::Events { upcoming, past }
}

/// Build the gallery region view in display order.
pub fn gallery_view(mut images: Vec<GalleryImage>) -> FeedView {
    images.sort_by_key(|image| image.order);
    FeedView::Gallery {
        images: images.into_iter().map(|image| image.image_url).collect(),
    }
}

/// Build the comments region view for a post.
pub fn comments_view(post_id: &str, comments: Vec<Doc<Comment>>) -> FeedView {
    let comments = comments
        .into_iter()
        .map(|doc| {
            let comment = doc.data;
            CommentView {
                author_name: comment.author_name,
                body: comment.body,
                created_label: format_nb_datetime(&comment.created_at),
            }
        })
        .collect();
    FeedView::Comments {
        post_id: post_id.to_string(),
        comments,
    }
}

/// Build the reactions region view for a post. The like count is the
/// number of reaction documents, one per reacting user.
pub fn reactions_view(post_id: &str, reactions: Vec<Doc<Reaction>>) -> FeedView {
    let reactions: Vec<ReactionView> = reactions
        .into_iter()
        .map(|doc| {
            let id = doc.id_str().to_string();
            let reaction = doc.data;
            ReactionView {
                // Keyed by uid; prefer the document id
                user_id: if id.is_empty() { reaction.user_id } else { id },
                user_name: reaction.user_name,
                kind: reaction.kind,
            }
        })
        .collect();

    FeedView::Reactions {
        post_id: post_id.to_string(),
        likes: reactions.len() as u32,
        reactions,
    }
}

/// Build the RSVP region view for an event.
pub fn rsvps_view(event_id: &str, rsvps: Vec<Doc<EventRsvp>>) -> FeedView {
    let entries: Vec<RsvpView> = rsvps
        .into_iter()
        .map(|doc| {
            let id = doc.id_str().to_string();
            let rsvp = doc.data;
            RsvpView {
                user_id: if id.is_empty() { rsvp.user_id } else { id },
                user_name: rsvp.user_name,
                status: rsvp.status,
            }
        })
        .collect();

    let coming: Vec<String> = entries
        .iter()
        .filter(|entry| entry.status == RsvpStatus::Coming)
        .map(|entry| entry.user_name.clone())
        .collect();

    FeedView::Rsvps {
        event_id: event_id.to_string(),
        coming_count: coming.len() as u32,
        coming,
        entries,
    }
}
