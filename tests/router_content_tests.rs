// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for the content write surface and live feeds.
//!
//! These tests require the Firestore emulator to be running.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use forening_api::feeds::{FeedBinder, FeedKey, FeedView, FirestoreFeedSource};
use forening_api::models::{AccountStatus, UserProfile};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Seed a profile with the given role and return its session cookie.
async fn seed_user(
    db: &forening_api::db::FirestoreDb,
    prefix: &str,
    role: &str,
) -> (String, String) {
    let uid = common::unique_uid(prefix);
    let email = format!("{uid}@example.com");
    let mut profile = UserProfile::default_for(&email, "2024-01-01T00:00:00Z");
    profile.role = Some(role.to_string());
    profile.display_name = format!("Bruker {prefix}");
    db.upsert_profile(&uid, &profile).await.unwrap();

    let cookie = common::session_cookie(&uid, &email);
    (uid, cookie)
}

#[tokio::test]
async fn test_member_cannot_publish_posts() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());
    let (_, cookie) = seed_user(&db, "member", "member").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/posts",
            &cookie,
            r#"{"title": "Nytt innlegg", "content": "Hei alle sammen"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "permission-denied");
}

#[tokio::test]
async fn test_admin_publishes_post_and_feed_updates() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, state) = common::create_test_app_with_db(db.clone());
    let (admin_uid, cookie) = seed_user(&db, "admin", "admin").await;

    // Bind the posts feed first, like an open members page
    let binder = FeedBinder::new(
        FirestoreFeedSource::new(state.db.clone()),
        Arc::new(dashmap::DashMap::new()),
    );
    let mut feed_rx = binder.bind(FeedKey::Posts);

    let title = format!("Innlegg {admin_uid}");
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/posts",
            &cookie,
            &format!(r#"{{"title": "{title}", "content": "Linje en\nLinje to"}}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let post_id = body["id"].as_str().unwrap().to_string();
    assert!(!post_id.is_empty());

    // The live subscription redraws with the new post at the top
    let view = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            {
                let view = feed_rx.borrow_and_update();
                if let FeedView::Posts { posts } = &*view {
                    if posts.iter().any(|p| p.id == post_id) {
                        return view.clone();
                    }
                }
            }
            feed_rx.changed().await.unwrap();
        }
    })
    .await
    .expect("feed should pick up the new post");

    match view {
        FeedView::Posts { posts } => {
            let post = posts.iter().find(|p| p.id == post_id).unwrap();
            assert_eq!(post.title, title);
            assert_eq!(post.author_name, "Bruker admin");
        }
        other => panic!("unexpected view: {other:?}"),
    }
}

#[tokio::test]
async fn test_reaction_toggle_increments_and_decrements() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());
    let (admin_uid, admin_cookie) = seed_user(&db, "author", "admin").await;
    let (_, member_cookie) = seed_user(&db, "liker", "member").await;

    // Author publishes a post
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/posts",
            &admin_cookie,
            &format!(r#"{{"title": "Likbart {admin_uid}", "content": "..."}}"#),
        ))
        .await
        .unwrap();
    let post_id = body_json(response).await["id"].as_str().unwrap().to_string();

    assert_eq!(db.list_reactions(&post_id).await.unwrap().len(), 0);

    // First toggle creates the member's reaction: count goes to 1
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/posts/{post_id}/reaction"),
            &member_cookie,
            "{}",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["reacted"], true);
    assert_eq!(db.list_reactions(&post_id).await.unwrap().len(), 1);

    // Second toggle deletes that same record: count back to 0
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/posts/{post_id}/reaction"),
            &member_cookie,
            "{}",
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["reacted"], false);
    assert_eq!(db.list_reactions(&post_id).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_rsvp_same_status_withdraws() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());
    let (_, contributor_cookie) = seed_user(&db, "arrangor", "contributor").await;
    let (member_uid, member_cookie) = seed_user(&db, "deltaker", "member").await;

    // A contributor may publish events
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/events",
            &contributor_cookie,
            r#"{"title": "Rakubrenning", "description": "Ta med kopp", "date": "2030-06-01T18:00:00Z"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let event_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Location fell back to the default
    let events = db.get_events().await.unwrap();
    let event = events
        .iter()
        .find(|doc| doc.id_str() == event_id)
        .expect("event stored");
    assert_eq!(event.data.location, "Ikke oppgitt");

    // Answer "coming"
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/events/{event_id}/rsvp"),
            &member_cookie,
            r#"{"status": "coming"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "coming");
    assert!(db.get_rsvp(&event_id, &member_uid).await.unwrap().is_some());

    // Same answer again withdraws the RSVP
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/events/{event_id}/rsvp"),
            &member_cookie,
            r#"{"status": "coming"}"#,
        ))
        .await
        .unwrap();
    assert!(body_json(response).await["status"].is_null());
    assert!(db.get_rsvp(&event_id, &member_uid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_member_comments_on_post() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());
    let (admin_uid, admin_cookie) = seed_user(&db, "poster", "admin").await;
    let (_, member_cookie) = seed_user(&db, "kommentator", "member").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/posts",
            &admin_cookie,
            &format!(r#"{{"title": "Kommenterbar {admin_uid}", "content": "..."}}"#),
        ))
        .await
        .unwrap();
    let post_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/posts/{post_id}/comments"),
            &member_cookie,
            r#"{"body": "Gleder meg!"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let comments = db.list_comments(&post_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].data.body, "Gleder meg!");
    assert_eq!(comments[0].data.author_name, "Bruker kommentator");
}

#[tokio::test]
async fn test_pending_deletion_account_cannot_write() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());

    let uid = common::unique_uid("pending");
    let email = format!("{uid}@example.com");
    let mut profile = UserProfile::default_for(&email, "2024-01-01T00:00:00Z");
    profile.status = AccountStatus::PendingDeletion;
    db.upsert_profile(&uid, &profile).await.unwrap();

    let cookie = common::session_cookie(&uid, &email);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/posts/some-post/comments",
            &cookie,
            r#"{"body": "hei"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
