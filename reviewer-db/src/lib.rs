//! SQLite persistence for the reviewer assignment engine
//!
//! Implements the repository and transaction contracts of `reviewer-core`
//! with sqlx. The schema is embedded and applied by [`Database::migrate`].

pub mod db;
pub mod error;
pub mod repos;

use std::sync::Arc;

use reviewer_core::{Dependencies, Engine};

pub use db::Database;
pub use error::{translate, DbError, Result};
pub use repos::{SqliteStore, SqliteTx};

/// Wire every service against `db`
pub fn engine(db: &Database, deps: Dependencies) -> Engine<SqliteStore> {
    Engine::new(Arc::new(db.store()), deps)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use reviewer_core::ports::{FixedClock, StdRandom, UuidGenerator};
    use reviewer_core::{
        AssignmentSettings, DatabaseSettings, Error, PrStatus, PullRequest, RandomAssignment,
    };
    use tempfile::TempDir;

    use super::*;

    struct Harness {
        // Keeps the database file alive for the test.
        _dir: TempDir,
        db: Database,
        engine: Engine<SqliteStore>,
    }

    async fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let settings = DatabaseSettings {
            path: dir.path().join("reviewer.db"),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        };
        let db = Database::open(&settings).await.unwrap();
        let deps = Dependencies {
            clock: Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            )),
            ids: Arc::new(UuidGenerator),
            strategy: Arc::new(RandomAssignment::new(Arc::new(StdRandom::seeded(5)))),
            settings: AssignmentSettings::default(),
        };
        let engine = engine(&db, deps);
        Harness {
            _dir: dir,
            db,
            engine,
        }
    }

    /// Creates a team and its users, returning their ids in order
    async fn team_with(h: &Harness, name: &str, users: &[&str]) -> (String, Vec<String>) {
        let team = h.engine.teams.create(name, None).await.unwrap();
        let mut ids = Vec::new();
        for user in users {
            let u = h
                .engine
                .users
                .create(&team.id, user, true, None)
                .await
                .unwrap();
            ids.push(u.id);
        }
        (team.id, ids)
    }

    fn reviewer_ids(pr: &PullRequest) -> Vec<String> {
        pr.reviewers.iter().map(|r| r.user_id.clone()).collect()
    }

    fn slot_numbers(pr: &PullRequest) -> Vec<u32> {
        pr.reviewers.iter().map(|r| r.slot).collect()
    }

    #[tokio::test]
    async fn test_create_and_reload_pull_request() {
        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob", "Carol", "Dave"]).await;

        let pr = h
            .engine
            .pull_requests
            .create("Add retries", &users[0], None)
            .await
            .unwrap();
        assert_eq!(slot_numbers(&pr), vec![1, 2]);
        assert!(!reviewer_ids(&pr).contains(&users[0]));

        let loaded = h.engine.pull_requests.get(&pr.id).await.unwrap();
        assert_eq!(loaded, pr);
    }

    #[tokio::test]
    async fn test_reassign_and_merge() {
        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob", "Carol", "Dave"]).await;
        let pr = h
            .engine
            .pull_requests
            .create("Add retries", &users[0], None)
            .await
            .unwrap();
        let old = pr.reviewers[0].user_id.clone();
        let kept = pr.reviewers[1].user_id.clone();

        let pr = h.engine.pull_requests.reassign(&pr.id, &old).await.unwrap();
        let ids = reviewer_ids(&pr);
        assert_eq!(ids[1], kept);
        assert!(!ids.contains(&old));
        assert!(!ids.contains(&users[0]));
        assert_eq!(h.engine.pull_requests.get(&pr.id).await.unwrap(), pr);

        let merged = h.engine.pull_requests.merge(&pr.id).await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        let again = h.engine.pull_requests.merge(&pr.id).await.unwrap();
        assert_eq!(again.merged_at, merged.merged_at);

        assert!(matches!(
            h.engine.pull_requests.reassign(&pr.id, &ids[0]).await,
            Err(Error::AlreadyMerged)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_team_name() {
        let h = harness().await;
        h.engine.teams.create("backend", None).await.unwrap();
        assert!(matches!(
            h.engine.teams.create("backend", None).await,
            Err(Error::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_reviewer_is_a_constraint_violation() {
        use reviewer_core::{PullRequestRepository, ReviewerSlot, TxManager};

        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob"]).await;
        let pr = h
            .engine
            .pull_requests
            .create("Solo", &users[0], None)
            .await
            .unwrap();

        let store = h.db.store();
        let mut tx = store.begin().await.unwrap();
        let slot = |n: u32| ReviewerSlot {
            pr_id: pr.id.clone(),
            slot: n,
            user_id: users[1].clone(),
            assigned_at: pr.created_at,
        };
        let err = store
            .replace_reviewers(&mut tx, &pr.id, &[slot(1), slot(2)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation));
        store.rollback(tx).await.unwrap();

        assert_eq!(h.engine.pull_requests.get(&pr.id).await.unwrap(), pr);
    }

    /// Insert an open pull request with exactly the given reviewers
    async fn seed_pr(h: &Harness, id: &str, author: &str, reviewers: &[&String]) {
        use reviewer_core::{PullRequestRepository, ReviewerSlot, TxManager};

        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let pr = PullRequest {
            id: id.to_string(),
            title: format!("PR {}", id),
            author_id: author.to_string(),
            status: PrStatus::Open,
            created_at,
            merged_at: None,
            reviewers: reviewers
                .iter()
                .enumerate()
                .map(|(i, user)| ReviewerSlot {
                    pr_id: id.to_string(),
                    slot: (i + 1) as u32,
                    user_id: user.to_string(),
                    assigned_at: created_at,
                })
                .collect(),
        };
        let store = h.db.store();
        let mut tx = store.begin().await.unwrap();
        PullRequestRepository::create(&store, &mut tx, &pr)
            .await
            .unwrap();
        store.commit(tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_deactivation_reassigns_open_reviews() {
        let h = harness().await;
        let (team, users) = team_with(
            &h,
            "backend",
            &["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"],
        )
        .await;
        let [alice, bob, carol, dave, erin, _frank] = users.as_slice() else {
            unreachable!()
        };

        // Bob reviews three open pull requests, Dave none.
        seed_pr(&h, "pr-1", alice, &[bob, carol]).await;
        seed_pr(&h, "pr-2", carol, &[erin, bob]).await;
        seed_pr(&h, "pr-3", erin, &[bob]).await;

        let outcome = h
            .engine
            .bulk
            .deactivate(&team, &[bob.clone(), dave.clone()])
            .await
            .unwrap();
        assert_eq!(outcome.deactivated, 2);
        assert_eq!(outcome.reassigned, 3);

        for id in ["pr-1", "pr-2", "pr-3"] {
            let pr = h.engine.pull_requests.get(id).await.unwrap();
            let ids = reviewer_ids(&pr);
            assert!(!ids.contains(bob));
            assert!(!ids.contains(dave));
            assert!(!ids.contains(&pr.author_id));
            let unique: HashSet<&String> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len());
            assert_eq!(slot_numbers(&pr), (1..=ids.len() as u32).collect::<Vec<_>>());
        }
        assert!(!h.engine.users.get(bob).await.unwrap().is_active);
        assert!(!h.engine.users.get(dave).await.unwrap().is_active);

        let again = h
            .engine
            .bulk
            .deactivate(&team, &[bob.clone(), dave.clone()])
            .await
            .unwrap();
        assert_eq!((again.deactivated, again.reassigned), (0, 0));
    }

    #[tokio::test]
    async fn test_cross_team_bulk_deactivation_changes_nothing() {
        let h = harness().await;
        let (team, users) = team_with(&h, "backend", &["Alice", "Bob"]).await;
        let (_, others) = team_with(&h, "frontend", &["Xavier"]).await;

        let err = h
            .engine
            .bulk
            .deactivate(&team, &[users[1].clone(), others[0].clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CrossTeamDeactivation));

        let active = h.engine.users.list(None, Some(true)).await.unwrap();
        assert_eq!(active.len(), 3);
    }

    #[tokio::test]
    async fn test_stranded_deactivation_rolls_back() {
        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob", "Carol"]).await;
        let pr = h
            .engine
            .pull_requests
            .create("Change", &users[0], None)
            .await
            .unwrap();
        assert_eq!(pr.reviewers.len(), 2);

        let err = h
            .engine
            .users
            .update(
                &users[1],
                reviewer_core::UserUpdate {
                    name: None,
                    is_active: Some(false),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCandidate));

        assert!(h.engine.users.get(&users[1]).await.unwrap().is_active);
        assert_eq!(h.engine.pull_requests.get(&pr.id).await.unwrap(), pr);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_agree() {
        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob"]).await;
        let pr = h
            .engine
            .pull_requests
            .create("Change", &users[0], None)
            .await
            .unwrap();

        let engine = Arc::new(h.engine);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let id = pr.id.clone();
                tokio::spawn(async move { engine.pull_requests.merge(&id).await })
            })
            .collect();

        let mut merged_at = HashSet::new();
        for handle in handles {
            let merged = handle.await.unwrap().unwrap();
            assert_eq!(merged.status, PrStatus::Merged);
            merged_at.insert(merged.merged_at);
        }
        assert_eq!(merged_at.len(), 1);
        assert!(merged_at.iter().all(Option::is_some));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_all_succeed() {
        let h = harness().await;
        let (_, users) = team_with(&h, "backend", &["Alice", "Bob", "Carol", "Dave"]).await;

        let engine = Arc::new(h.engine);
        let users = Arc::new(users);
        for round in 0..5 {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let engine = engine.clone();
                    let users = users.clone();
                    tokio::spawn(async move {
                        let author = &users[i % users.len()];
                        let title = format!("Change {}-{}", round, i);
                        engine.pull_requests.create(&title, author, None).await
                    })
                })
                .collect();
            for handle in handles {
                let pr = handle.await.unwrap().unwrap();
                assert_eq!(pr.reviewers.len(), 2);
                assert!(!reviewer_ids(&pr).contains(&pr.author_id));
            }
        }

        let all = engine.pull_requests.list(None).await.unwrap();
        assert_eq!(all.len(), 40);
        let ids: HashSet<&String> = all.iter().map(|pr| &pr.id).collect();
        assert_eq!(ids.len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reassigns_of_one_reviewer_serialize() {
        let h = harness().await;
        let (_, users) = team_with(
            &h,
            "backend",
            &["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"],
        )
        .await;
        let pr = h
            .engine
            .pull_requests
            .create("Change", &users[0], None)
            .await
            .unwrap();
        let old = pr.reviewers[0].user_id.clone();

        let engine = Arc::new(h.engine);
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let id = pr.id.clone();
                let old = old.clone();
                tokio::spawn(async move { engine.pull_requests.reassign(&id, &old).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert!(matches!(err, Error::BadReviewer), "{:?}", err),
            }
        }
        assert_eq!(succeeded, 1);

        let current = engine.pull_requests.get(&pr.id).await.unwrap();
        let ids = reviewer_ids(&current);
        assert!(!ids.contains(&old));
        assert!(!ids.contains(&current.author_id));
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), 2);
        assert_eq!(slot_numbers(&current), vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reassigns_of_both_reviewers() {
        let h = harness().await;
        let (_, users) = team_with(
            &h,
            "backend",
            &["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"],
        )
        .await;
        let pr = h
            .engine
            .pull_requests
            .create("Change", &users[0], None)
            .await
            .unwrap();
        let original = reviewer_ids(&pr);

        let engine = Arc::new(h.engine);
        let handles: Vec<_> = original
            .iter()
            .cloned()
            .map(|old| {
                let engine = engine.clone();
                let id = pr.id.clone();
                tokio::spawn(async move { engine.pull_requests.reassign(&id, &old).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let current = engine.pull_requests.get(&pr.id).await.unwrap();
        let ids = reviewer_ids(&current);
        assert!(original.iter().all(|old| !ids.contains(old)));
        assert!(!ids.contains(&current.author_id));
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deactivation_racing_reassign() {
        let h = harness().await;
        let (team, users) = team_with(
            &h,
            "backend",
            &["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"],
        )
        .await;
        let (_, others) = team_with(&h, "frontend", &["Xavier", "Yara", "Zoe"]).await;
        seed_pr(&h, "pr-1", &users[0], &[&users[1], &users[2]]).await;
        seed_pr(&h, "pr-2", &users[3], &[&users[1]]).await;
        let bob = users[1].clone();
        let carol = users[2].clone();

        let engine = Arc::new(h.engine);
        let deactivate = {
            let engine = engine.clone();
            let bob = bob.clone();
            tokio::spawn(async move { engine.bulk.deactivate(&team, &[bob]).await })
        };
        let reassign = {
            let engine = engine.clone();
            let carol = carol.clone();
            tokio::spawn(async move { engine.pull_requests.reassign("pr-1", &carol).await })
        };
        // Another team keeps writing alongside.
        let creates: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                let author = others[i % others.len()].clone();
                tokio::spawn(async move {
                    let title = format!("Side change {}", i);
                    engine.pull_requests.create(&title, &author, None).await
                })
            })
            .collect();

        let outcome = deactivate.await.unwrap().unwrap();
        assert_eq!((outcome.deactivated, outcome.reassigned), (1, 2));
        reassign.await.unwrap().unwrap();
        for handle in creates {
            handle.await.unwrap().unwrap();
        }

        for id in ["pr-1", "pr-2"] {
            let pr = engine.pull_requests.get(id).await.unwrap();
            let ids = reviewer_ids(&pr);
            assert!(!ids.contains(&bob));
            assert!(!ids.contains(&pr.author_id));
            let unique: HashSet<&String> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len());
        }
        assert!(!engine.users.get(&bob).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_stats() {
        let h = harness().await;
        let (team, users) = team_with(&h, "backend", &["Alice", "Bob", "Carol"]).await;
        let pr = h
            .engine
            .pull_requests
            .create("Change", &users[0], None)
            .await
            .unwrap();
        h.engine.pull_requests.merge(&pr.id).await.unwrap();

        let by_user = h.engine.stats.by_user(Some(&team)).await.unwrap();
        assert_eq!(by_user.len(), 3);
        let total: u64 = by_user.iter().map(|s| s.total_assigned).sum();
        let merged: u64 = by_user.iter().map(|s| s.merged_assigned).sum();
        assert_eq!((total, merged), (2, 2));
        assert!(by_user.iter().all(|s| s.open_assigned == 0));

        let by_pr = h.engine.stats.by_pr(None).await.unwrap();
        assert_eq!(by_pr.len(), 1);
        assert_eq!(by_pr[0].reviewers_count, 2);
        assert!(h.engine.stats.by_pr(Some("other")).await.unwrap().is_empty());
    }
}
