/// End-to-end checks of the forum contract against an in-memory store:
/// vote toggling, reaction involution, reply bookkeeping and moderation.

use std::sync::Arc;
use std::time::Duration;

use forum_core::rate_limit::{RateLimitConfig, RateLimiter};
use forum_core::reports::DELETION_NOTE;
use forum_core::votes::VoteTransition;
use forum_core::{Forum, ForumConfig, ForumError, Identity, Moderator};
use forum_db::Database;
use forum_types::models::{ReportReason, ReportStatus, User, VoteChoice};

fn forum() -> Arc<Forum> {
    let config = ForumConfig::default().with_moderators(["0xm0d"]);
    Arc::new(Forum::new(Database::open_in_memory().unwrap(), config))
}

fn login(forum: &Forum, address: &str) -> User {
    forum
        .login_user(&Identity {
            address: address.into(),
            username: Some(format!("@{}", address)),
            profile_picture_url: None,
            is_orb_verified: true,
        })
        .unwrap()
}

fn counts(forum: &Forum, message: uuid::Uuid) -> (i64, i64) {
    let m = forum.get_message(message).unwrap().unwrap();
    (m.upvotes, m.downvotes)
}

#[test]
fn voting_the_same_way_twice_clears_the_vote() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let m = forum.create_message(&alice, "gm", None).unwrap();
    let before = counts(&forum, m);

    assert_eq!(forum.vote(m, "0xb0b", VoteChoice::Up).unwrap(), Some(VoteChoice::Up));
    assert_eq!(forum.vote(m, "0xb0b", VoteChoice::Up).unwrap(), None);

    assert_eq!(forum.get_vote(m, "0xb0b"), None);
    assert!(forum.db().votes_for_message(&m.to_string()).unwrap().is_empty());
    assert_eq!(counts(&forum, m), before);
}

#[test]
fn two_voters_and_a_change_of_mind() {
    let forum = forum();
    let author = login(&forum, "0xauth0r");
    let m = forum.create_message(&author, "hot take", None).unwrap();

    forum.vote(m, "0xa", VoteChoice::Up).unwrap();
    assert_eq!(counts(&forum, m), (1, 0));

    forum.vote(m, "0xb", VoteChoice::Down).unwrap();
    assert_eq!(counts(&forum, m), (1, 1));

    forum.vote(m, "0xa", VoteChoice::Down).unwrap();
    assert_eq!(counts(&forum, m), (0, 2));
    assert_eq!(forum.get_vote(m, "0xa"), Some(VoteChoice::Down));

    // Counters agree with the vote records when nothing failed
    let ups = forum
        .db()
        .votes_for_message(&m.to_string())
        .unwrap()
        .iter()
        .filter(|v| v.choice == "up")
        .count();
    assert_eq!(ups, 0);
}

#[test]
fn optimistic_update_matches_the_stored_counters() {
    let forum = forum();
    let author = login(&forum, "0xauth0r");
    let m = forum.create_message(&author, "predict me", None).unwrap();
    forum.vote(m, "0xa", VoteChoice::Up).unwrap();

    let mut local = forum.get_message(m).unwrap().unwrap();
    let current = forum.get_vote(m, "0xa");
    VoteTransition::compute(current, VoteChoice::Down).apply(&mut local);

    forum.vote(m, "0xa", VoteChoice::Down).unwrap();
    assert_eq!((local.upvotes, local.downvotes), counts(&forum, m));
}

#[test]
fn voting_on_a_missing_message_is_not_found() {
    let forum = forum();
    assert!(matches!(
        forum.vote(uuid::Uuid::new_v4(), "0xa", VoteChoice::Up),
        Err(ForumError::NotFound("message"))
    ));
}

#[test]
fn toggling_a_reaction_twice_restores_the_set() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let m = forum.create_message(&alice, "🔥 take", None).unwrap();
    forum.toggle_reaction(m, "0xc4r0l", "🔥").unwrap();
    let original = forum.reaction_summary(m).unwrap();

    assert!(forum.toggle_reaction(m, "0xb0b", "🔥").unwrap());
    let reacted = forum.reaction_summary(m).unwrap();
    assert_eq!(reacted["🔥"].count, original["🔥"].count + 1);
    assert!(reacted["🔥"].users.contains(&"0xb0b".to_string()));

    assert!(!forum.toggle_reaction(m, "0xb0b", "🔥").unwrap());
    let after = forum.reaction_summary(m).unwrap();
    assert_eq!(after, original);
    assert!(!after["🔥"].users.contains(&"0xb0b".to_string()));
}

#[test]
fn reply_shows_up_in_parent_thread() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let bob = login(&forum, "0xb0b");

    let parent = forum.create_message(&alice, "who's around?", None).unwrap();
    let r1 = forum.create_message(&bob, "me", Some(parent)).unwrap();
    let r2 = forum.create_message(&alice, "great", Some(parent)).unwrap();

    let feed = forum.list_messages().unwrap();
    let p = feed.iter().find(|m| m.id == parent).unwrap();
    assert_eq!(p.replies, vec![r1, r2]);
    assert_eq!(feed.last().unwrap().id, r2);
}

#[test]
fn deleting_a_message_resolves_its_reports_first() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let bob = login(&forum, "0xb0b");
    let carol = login(&forum, "0xc4r0l");

    let spam = forum.create_message(&alice, "free airdrop", None).unwrap();
    let keep = forum.create_message(&alice, "normal post", None).unwrap();
    forum.create_report(spam, &bob, &ReportReason::Spam).unwrap();
    forum.create_report(spam, &carol, &ReportReason::Scam).unwrap();
    forum.create_report(keep, &bob, &ReportReason::Misleading).unwrap();

    let moderator = forum.moderator("0xM0D").unwrap();
    let outcome = forum.delete_message_and_resolve_reports(&moderator, spam).unwrap();
    assert!(outcome.deleted_message);
    assert_eq!(outcome.updated_reports, 2);

    assert!(forum.get_message(spam).unwrap().is_none());
    let reports = forum.list_reports(&moderator, None).unwrap();
    let on_spam: Vec<_> = reports.iter().filter(|r| r.message_id == spam).collect();
    assert_eq!(on_spam.len(), 2);
    for r in on_spam {
        assert_eq!(r.status, ReportStatus::Resolved);
        assert_eq!(r.notes.as_deref(), Some(DELETION_NOTE));
        assert_eq!(r.reviewed_by.as_deref(), Some("0xm0d"));
    }
    let pending = forum.list_reports(&moderator, Some(ReportStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message_id, keep);
}

#[test]
fn system_deletion_is_attributed_to_system() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let m = forum.create_message(&alice, "bye", None).unwrap();
    let r = forum.create_report(m, &alice, &ReportReason::Spam).unwrap();

    forum
        .delete_message_and_resolve_reports(&Moderator::system(), m)
        .unwrap();
    let moderator = forum.moderator("0xm0d").unwrap();
    let report = forum
        .list_reports(&moderator, None)
        .unwrap()
        .into_iter()
        .find(|x| x.id == r)
        .unwrap();
    assert_eq!(report.reviewed_by.as_deref(), Some("system"));
}

#[tokio::test(start_paused = true)]
async fn sixth_message_in_a_minute_is_refused_then_allowed() {
    let forum = forum();
    let limiter = RateLimiter::new(RateLimitConfig::default());
    let alice = login(&forum, "0xa11ce");

    let post = |n: usize| -> Result<uuid::Uuid, ForumError> {
        limiter.reserve(&alice.address)?;
        forum
            .create_message(&alice, &format!("message {}", n), None)
            .inspect_err(|_| limiter.release(&alice.address))
    };

    for n in 0..5 {
        post(n).unwrap();
    }
    assert!(matches!(post(5), Err(ForumError::RateLimited { .. })));
    assert_eq!(forum.list_messages().unwrap().len(), 5);

    tokio::time::advance(Duration::from_secs(61)).await;
    post(5).unwrap();
    assert_eq!(forum.list_messages().unwrap().len(), 6);
}

#[tokio::test]
async fn feed_subscription_sees_votes_and_deletions() {
    let forum = forum();
    let alice = login(&forum, "0xa11ce");
    let m = forum.create_message(&alice, "watch me", None).unwrap();

    let mut feed = forum.subscribe_messages().await.unwrap();
    forum.vote(m, "0xb0b", VoteChoice::Up).unwrap();
    tokio::time::timeout(Duration::from_secs(5), feed.wait_for(|f| f.first().is_some_and(|x| x.upvotes == 1)))
        .await
        .unwrap()
        .unwrap();

    forum
        .delete_message_and_resolve_reports(&Moderator::system(), m)
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), feed.wait_for(|f| f.is_empty()))
        .await
        .unwrap()
        .unwrap();
}
