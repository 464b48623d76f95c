//! Friend-request workflow.
//!
//! A request is a directed `sender -> receiver` row that is either accepted
//! (the pair of friend rows is written and the request deleted) or declined
//! (the request is deleted). Each operation runs in one `BEGIN IMMEDIATE`
//! transaction, so the existence checks and the writes that depend on them
//! cannot interleave with another writer.

use amity_types::models::{FriendAction, InvalidAction, SendOutcome};
use rusqlite::Connection;
use tracing::info;

use crate::Database;
use crate::models::{FriendRequestRow, FriendRow, PendingRequestRow};
use crate::queries::{OptionalExt, query_user_by_username};

#[derive(Debug, thiserror::Error)]
pub enum FriendshipError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("You cannot send a friend request to yourself")]
    InvalidTarget,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("This friend request is not addressed to you")]
    Forbidden,
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for FriendshipError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

impl From<InvalidAction> for FriendshipError {
    fn from(e: InvalidAction) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

pub type FriendshipResult<T> = Result<T, FriendshipError>;

impl Database {
    /// Send a friend request from `sender_id` to the user named
    /// `receiver_username`.
    ///
    /// If the receiver already has a pending request to the sender, the two
    /// requests collide: the users become friends and the opposite request
    /// is removed instead of storing a second one.
    pub fn send_friend_request(
        &self,
        sender_id: i64,
        receiver_username: &str,
    ) -> FriendshipResult<SendOutcome> {
        self.with_tx(|conn| {
            let receiver = query_user_by_username(conn, receiver_username)?
                .ok_or(FriendshipError::NotFound("User"))?;

            if receiver.id == sender_id {
                return Err(FriendshipError::InvalidTarget);
            }
            if find_request(conn, sender_id, receiver.id)?.is_some() {
                return Err(FriendshipError::Conflict("Friend request already sent"));
            }
            if are_friends(conn, sender_id, receiver.id)? {
                return Err(FriendshipError::Conflict("Already friends"));
            }

            if let Some(opposite) = find_request(conn, receiver.id, sender_id)? {
                insert_friend_pair(conn, sender_id, receiver.id)?;
                delete_request(conn, opposite.id)?;
                info!(
                    "Crossed requests between {} and {} resolved as friendship",
                    sender_id, receiver.id
                );
                return Ok(SendOutcome::BecameFriends);
            }

            conn.execute(
                "INSERT INTO friend_requests (sender_id, receiver_id) VALUES (?1, ?2)",
                [sender_id, receiver.id],
            )?;
            let request_id = conn.last_insert_rowid();
            info!("Friend request {} sent: {} -> {}", request_id, sender_id, receiver.id);

            Ok(SendOutcome::Requested { request_id })
        })
    }

    /// Accept or decline request `request_id` on behalf of `responder_id`,
    /// who must be its receiver. `action` is checked only once the request
    /// is known to exist and to be addressed to the responder.
    pub fn respond_to_friend_request(
        &self,
        responder_id: i64,
        request_id: i64,
        action: &str,
    ) -> FriendshipResult<FriendAction> {
        self.with_tx(|conn| {
            let request = conn
                .query_row(
                    "SELECT id, sender_id, receiver_id, created_at
                     FROM friend_requests WHERE id = ?1",
                    [request_id],
                    map_request,
                )
                .optional()?
                .ok_or(FriendshipError::NotFound("Friend request"))?;

            if request.receiver_id != responder_id {
                return Err(FriendshipError::Forbidden);
            }
            let action: FriendAction = action.parse()?;

            if action == FriendAction::Accept {
                insert_friend_pair(conn, request.sender_id, request.receiver_id)?;
            }
            delete_request(conn, request.id)?;

            info!(
                "Friend request {} ({} -> {}) resolved: {}",
                request.id, request.sender_id, request.receiver_id, action
            );
            Ok(action)
        })
    }

    /// Friends of `user_id`, ordered by username.
    pub fn list_friends(&self, user_id: i64) -> anyhow::Result<Vec<FriendRow>> {
        self.with_conn(|conn| {
            // Rows are symmetric, so one direction covers every friendship.
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.profile_img
                 FROM friends f
                 JOIN users u ON u.id = f.friend2
                 WHERE f.friend1 = ?1
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FriendRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        profile_img: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Pending requests involving `user_id`, as `(received, sent)`. Each
    /// entry carries the username of the other party.
    pub fn list_pending_requests(
        &self,
        user_id: i64,
    ) -> anyhow::Result<(Vec<PendingRequestRow>, Vec<PendingRequestRow>)> {
        self.with_conn(|conn| {
            let received = query_pending(
                conn,
                "SELECT r.id, u.username FROM friend_requests r
                 JOIN users u ON u.id = r.sender_id
                 WHERE r.receiver_id = ?1 AND r.status = 'pending'
                 ORDER BY r.id",
                user_id,
            )?;
            let sent = query_pending(
                conn,
                "SELECT r.id, u.username FROM friend_requests r
                 JOIN users u ON u.id = r.receiver_id
                 WHERE r.sender_id = ?1 AND r.status = 'pending'
                 ORDER BY r.id",
                user_id,
            )?;
            Ok((received, sent))
        })
    }

    pub fn are_friends(&self, a: i64, b: i64) -> anyhow::Result<bool> {
        self.with_conn(|conn| are_friends(conn, a, b))
    }
}

fn find_request(
    conn: &Connection,
    sender_id: i64,
    receiver_id: i64,
) -> anyhow::Result<Option<FriendRequestRow>> {
    conn.query_row(
        "SELECT id, sender_id, receiver_id, created_at FROM friend_requests
         WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
        [sender_id, receiver_id],
        map_request,
    )
    .optional()
}

fn are_friends(conn: &Connection, a: i64, b: i64) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM friends WHERE friend1 = ?1 AND friend2 = ?2",
            [a, b],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Both directions, always together. Callers run inside a transaction so
/// a failure on the second insert also discards the first.
fn insert_friend_pair(conn: &Connection, a: i64, b: i64) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached("INSERT INTO friends (friend1, friend2) VALUES (?1, ?2)")?;
    stmt.execute([a, b])?;
    stmt.execute([b, a])?;
    Ok(())
}

fn delete_request(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM friend_requests WHERE id = ?1", [id])?;
    Ok(())
}

fn map_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn query_pending(conn: &Connection, sql: &str, user_id: i64) -> anyhow::Result<Vec<PendingRequestRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(PendingRequestRow {
                id: row.get(0)?,
                counterpart_username: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    struct Fixture {
        db: Database,
        alice: i64,
        bob: i64,
        carol: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "h").unwrap().unwrap();
        let bob = db.create_user("bob", "h").unwrap().unwrap();
        let carol = db.create_user("carol", "h").unwrap().unwrap();
        Fixture { db, alice, bob, carol }
    }

    fn friend_rows(db: &Database) -> Vec<(i64, i64)> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT friend1, friend2 FROM friends ORDER BY friend1, friend2")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .unwrap()
    }

    fn request_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM friend_requests", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    fn friend_names(db: &Database, user: i64) -> Vec<String> {
        db.list_friends(user).unwrap().into_iter().map(|f| f.username).collect()
    }

    fn send(f: &Fixture, from: i64, to: &str) -> i64 {
        match f.db.send_friend_request(from, to).unwrap() {
            SendOutcome::Requested { request_id } => request_id,
            other => panic!("expected a pending request, got {:?}", other),
        }
    }

    #[test]
    fn test_send_creates_pending_request() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        let (received, sent) = f.db.list_pending_requests(f.bob).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, id);
        assert_eq!(received[0].counterpart_username, "alice");
        assert!(sent.is_empty());

        let (received, sent) = f.db.list_pending_requests(f.alice).unwrap();
        assert!(received.is_empty());
        assert_eq!(sent[0].counterpart_username, "bob");

        assert!(friend_names(&f.db, f.alice).is_empty());
        assert!(friend_names(&f.db, f.bob).is_empty());
    }

    #[test]
    fn test_send_to_unknown_user() {
        let f = fixture();
        let err = f.db.send_friend_request(f.alice, "nobody").unwrap_err();
        assert!(matches!(err, FriendshipError::NotFound(_)));
        assert_eq!(request_count(&f.db), 0);
    }

    #[test]
    fn test_send_to_self_is_invalid_target() {
        let f = fixture();
        let err = f.db.send_friend_request(f.alice, "alice").unwrap_err();
        assert!(matches!(err, FriendshipError::InvalidTarget));
        assert_eq!(request_count(&f.db), 0);
    }

    #[test]
    fn test_duplicate_send_conflicts() {
        let f = fixture();
        send(&f, f.alice, "bob");
        let err = f.db.send_friend_request(f.alice, "bob").unwrap_err();
        assert!(matches!(err, FriendshipError::Conflict(_)));
        assert_eq!(request_count(&f.db), 1);
    }

    #[test]
    fn test_crossed_requests_become_friendship() {
        let f = fixture();
        send(&f, f.bob, "alice");

        let outcome = f.db.send_friend_request(f.alice, "bob").unwrap();
        assert_eq!(outcome, SendOutcome::BecameFriends);

        assert_eq!(request_count(&f.db), 0);
        assert_eq!(friend_rows(&f.db), vec![(f.alice, f.bob), (f.bob, f.alice)]);
        assert_eq!(friend_names(&f.db, f.alice), vec!["bob"]);
        assert_eq!(friend_names(&f.db, f.bob), vec!["alice"]);
    }

    #[test]
    fn test_accept_creates_symmetric_pair_and_deletes_request() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        f.db.respond_to_friend_request(f.bob, id, "accept").unwrap();

        assert_eq!(request_count(&f.db), 0);
        assert_eq!(friend_rows(&f.db), vec![(f.alice, f.bob), (f.bob, f.alice)]);
        assert!(f.db.are_friends(f.alice, f.bob).unwrap());
        assert!(f.db.are_friends(f.bob, f.alice).unwrap());
        assert_eq!(friend_names(&f.db, f.alice), vec!["bob"]);
        assert_eq!(friend_names(&f.db, f.bob), vec!["alice"]);
    }

    #[test]
    fn test_decline_deletes_request_only() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        f.db.respond_to_friend_request(f.bob, id, "decline").unwrap();

        assert_eq!(request_count(&f.db), 0);
        assert!(friend_rows(&f.db).is_empty());

        // A declined request can be sent again.
        send(&f, f.alice, "bob");
    }

    #[test]
    fn test_respond_by_non_receiver_is_forbidden() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        for who in [f.alice, f.carol] {
            let err = f.db.respond_to_friend_request(who, id, "accept").unwrap_err();
            assert!(matches!(err, FriendshipError::Forbidden));
        }
        assert_eq!(request_count(&f.db), 1);
        assert!(friend_rows(&f.db).is_empty());
    }

    #[test]
    fn test_unknown_action_leaves_request_intact() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        let err = f.db.respond_to_friend_request(f.bob, id, "block").unwrap_err();
        assert!(matches!(err, FriendshipError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Invalid action 'block'");
        assert_eq!(request_count(&f.db), 1);
        assert!(friend_rows(&f.db).is_empty());
    }

    #[test]
    fn test_request_checks_come_before_action_check() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        let err = f.db.respond_to_friend_request(f.carol, id, "block").unwrap_err();
        assert!(matches!(err, FriendshipError::Forbidden));

        let err = f.db.respond_to_friend_request(f.bob, id + 99, "block").unwrap_err();
        assert!(matches!(err, FriendshipError::NotFound(_)));

        assert_eq!(request_count(&f.db), 1);
    }

    #[test]
    fn test_concurrent_crossed_requests_end_as_one_friendship() {
        for _ in 0..50 {
            let f = fixture();
            let barrier = Barrier::new(2);

            let outcomes: Vec<SendOutcome> = thread::scope(|s| {
                let handles = [(f.alice, "bob"), (f.bob, "alice")].map(|(from, to)| {
                    let (db, barrier) = (&f.db, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        db.send_friend_request(from, to).unwrap()
                    })
                });
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert_eq!(
                outcomes.iter().filter(|o| **o == SendOutcome::BecameFriends).count(),
                1
            );
            assert_eq!(request_count(&f.db), 0);
            assert_eq!(friend_names(&f.db, f.alice), vec!["bob"]);
            assert_eq!(friend_names(&f.db, f.bob), vec!["alice"]);
        }
    }

    #[test]
    fn test_respond_to_missing_request() {
        let f = fixture();
        let err = f.db.respond_to_friend_request(f.bob, 42, "decline").unwrap_err();
        assert!(matches!(err, FriendshipError::NotFound(_)));
    }

    #[test]
    fn test_send_to_existing_friend_conflicts() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");
        f.db.respond_to_friend_request(f.bob, id, "accept").unwrap();

        for (from, to) in [(f.alice, "bob"), (f.bob, "alice")] {
            let err = f.db.send_friend_request(from, to).unwrap_err();
            assert!(matches!(err, FriendshipError::Conflict(_)));
        }
        assert_eq!(friend_rows(&f.db).len(), 2);
    }

    #[test]
    fn test_friend_lists_are_per_user() {
        let f = fixture();
        let ab = send(&f, f.alice, "bob");
        let cb = send(&f, f.carol, "bob");
        f.db.respond_to_friend_request(f.bob, ab, "accept").unwrap();
        f.db.respond_to_friend_request(f.bob, cb, "accept").unwrap();

        assert_eq!(friend_names(&f.db, f.bob), vec!["alice", "carol"]);
        assert_eq!(friend_names(&f.db, f.alice), vec!["bob"]);
        assert_eq!(friend_names(&f.db, f.carol), vec!["bob"]);
        assert!(!f.db.are_friends(f.alice, f.carol).unwrap());
    }

    #[test]
    fn test_failed_pair_insert_rolls_back() {
        let f = fixture();
        let id = send(&f, f.alice, "bob");

        // Leave a half pair behind so the second insert of the accept fails.
        f.db.with_conn(|conn| {
            conn.execute("INSERT INTO friends (friend1, friend2) VALUES (?1, ?2)", [f.bob, f.alice])?;
            Ok(())
        })
        .unwrap();

        let err = f.db.respond_to_friend_request(f.bob, id, "accept").unwrap_err();
        assert!(matches!(err, FriendshipError::Storage(_)));

        // Nothing from the failed transaction persisted.
        assert_eq!(request_count(&f.db), 1);
        assert_eq!(friend_rows(&f.db), vec![(f.bob, f.alice)]);
    }
}
