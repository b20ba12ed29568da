//! Fixture rows for a brand-new engine.
//!
//! Gives the UI something to show before the first network sync. Seeding is
//! gated on the `users` table alone: if any user exists nothing is inserted,
//! even when every other table is empty.

use nook_types::{Group, Listing, Post, User, UserProfile};
use rusqlite::Connection;

use crate::queries::documents;
use crate::{Result, Table};

/// Base timestamp of the fixture set (2023-11-14T22:13:20Z).
const FIXTURE_EPOCH: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

/// Insert the fixture set if the engine has no users. Returns whether rows
/// were inserted.
pub fn seed(conn: &Connection) -> Result<bool> {
    if documents::count(conn, Table::Users)? > 0 {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;

    for user in fixture_users() {
        documents::upsert(&tx, Table::Users, &user.email, &user, None)?;
    }
    for group in fixture_groups() {
        documents::upsert(&tx, Table::Groups, &group.id, &group, None)?;
    }
    for post in fixture_posts() {
        documents::upsert(&tx, Table::Posts, &post.id, &post, Some(post.timestamp))?;
    }
    for listing in fixture_listings() {
        documents::upsert(&tx, Table::Marketplace, &listing.id, &listing, Some(listing.timestamp))?;
    }

    tx.commit()?;
    tracing::info!("seeded fixture rows into empty engine");
    Ok(true)
}

fn fixture_users() -> Vec<User> {
    vec![
        User {
            email: "admin@nook.app".into(),
            profile: UserProfile {
                name: "Nook Team".into(),
                bio: "Official announcements".into(),
                avatar: None,
            },
            is_vip: true,
            created_at: FIXTURE_EPOCH,
        },
        User {
            email: "maya@nook.app".into(),
            profile: UserProfile {
                name: "Maya".into(),
                bio: "Film photography and long walks".into(),
                avatar: None,
            },
            is_vip: false,
            created_at: FIXTURE_EPOCH,
        },
        User {
            email: "jon@nook.app".into(),
            profile: UserProfile {
                name: "Jon".into(),
                bio: "Selling the bikes I fix".into(),
                avatar: None,
            },
            is_vip: false,
            created_at: FIXTURE_EPOCH,
        },
    ]
}

fn fixture_groups() -> Vec<Group> {
    vec![
        Group {
            id: "group-welcome".into(),
            name: "Welcome".into(),
            description: "Say hi and find your way around".into(),
            owner_email: "admin@nook.app".into(),
            members: vec![
                "admin@nook.app".into(),
                "maya@nook.app".into(),
                "jon@nook.app".into(),
            ],
            is_vip: false,
            created_at: FIXTURE_EPOCH,
        },
        Group {
            id: "group-insiders".into(),
            name: "Insiders".into(),
            description: "Early previews for VIP members".into(),
            owner_email: "admin@nook.app".into(),
            members: vec!["admin@nook.app".into()],
            is_vip: true,
            created_at: FIXTURE_EPOCH,
        },
    ]
}

fn fixture_posts() -> Vec<Post> {
    vec![
        Post {
            id: "post-welcome".into(),
            author_email: "admin@nook.app".into(),
            content: "Welcome to Nook! Everything here works offline.".into(),
            group_id: Some("group-welcome".into()),
            timestamp: FIXTURE_EPOCH,
            ..Post::default()
        },
        Post {
            id: "post-maya-1".into(),
            author_email: "maya@nook.app".into(),
            content: "First roll of the season came back today.".into(),
            timestamp: FIXTURE_EPOCH + MINUTE,
            ..Post::default()
        },
        Post {
            id: "post-jon-1".into(),
            author_email: "jon@nook.app".into(),
            content: "Two commuter bikes ready, see the marketplace.".into(),
            timestamp: FIXTURE_EPOCH + 2 * MINUTE,
            ..Post::default()
        },
    ]
}

fn fixture_listings() -> Vec<Listing> {
    vec![
        Listing {
            id: "listing-bike-1".into(),
            seller_email: "jon@nook.app".into(),
            title: "Steel commuter bike".into(),
            description: "New chain and brake pads.".into(),
            price_cents: 18_000,
            currency: "USD".into(),
            timestamp: FIXTURE_EPOCH + 3 * MINUTE,
            ..Listing::default()
        },
        Listing {
            id: "listing-camera-1".into(),
            seller_email: "maya@nook.app".into(),
            title: "35mm rangefinder".into(),
            description: "Light seals replaced.".into(),
            price_cents: 25_000,
            currency: "USD".into(),
            timestamp: FIXTURE_EPOCH + 4 * MINUTE,
            ..Listing::default()
        },
    ]
}
