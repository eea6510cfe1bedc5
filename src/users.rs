//! User dimension: one row per distinct, non-blank user id.

use rustc_hash::FxHashSet;

use crate::models::{SongplayEvent, UserRow};

/// Extract unique users from a batch of events.
///
/// Events with an empty `userId` are dropped. For repeated ids the first
/// occurrence wins, so a later level change in the same file is not seen here;
/// storage decides how to treat a user that already exists.
pub fn dedupe_users(events: &[SongplayEvent]) -> Vec<UserRow> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut users = Vec::new();

    for event in events {
        if event.user_id.is_empty() || !seen.insert(event.user_id.as_str()) {
            continue;
        }
        users.push(UserRow {
            user_id: event.user_id.clone(),
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            gender: event.gender,
            level: event.level,
        });
    }

    users
}
