use chrono::Utc;
use forum_db::models::ReportRow;
use forum_db::{MessageCounter, format_timestamp};
use forum_types::models::{Report, ReportReason, ReportStatus, User};
use tracing::info;
use uuid::Uuid;

use crate::config::normalize_address;
use crate::{Change, Forum, ForumError, Result, best_effort, convert};

/// Note attached to reports closed by a message deletion.
pub const DELETION_NOTE: &str = "Message deleted by moderator";

/// Proof that the caller may moderate. Only [`Forum::moderator`] and
/// [`Moderator::system`] hand these out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moderator {
    reviewer: String,
}

impl Moderator {
    /// The server acting on its own behalf.
    pub fn system() -> Self {
        Self {
            reviewer: "system".into(),
        }
    }

    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub deleted_message: bool,
    pub updated_reports: usize,
}

impl Forum {
    pub fn moderator(&self, address: &str) -> Result<Moderator> {
        if self.config.is_moderator(address) {
            Ok(Moderator {
                reviewer: normalize_address(address),
            })
        } else {
            Err(ForumError::Forbidden)
        }
    }

    /// File a pending report. The message's report counter is bumped
    /// best-effort.
    pub fn create_report(&self, message_id: Uuid, reporter: &User, reason: &ReportReason) -> Result<Uuid> {
        if reporter.address.trim().is_empty() {
            return Err(ForumError::invalid("missing reporter identity"));
        }
        if let ReportReason::Other(text) = reason {
            if text.trim().is_empty() {
                return Err(ForumError::invalid("describe the problem for 'Other' reports"));
            }
        }
        let mid = message_id.to_string();
        if self.db.get_message(&mid)?.is_none() {
            return Err(ForumError::NotFound("message"));
        }

        let id = Uuid::new_v4();
        self.db.insert_report(&ReportRow {
            id: id.to_string(),
            message_id: mid.clone(),
            reporter_id: reporter.address.clone(),
            reporter_username: reporter.username.clone(),
            reason: reason.to_string(),
            status: ReportStatus::Pending.as_str().to_string(),
            created_at: format_timestamp(Utc::now()),
            reviewed_at: None,
            reviewed_by: None,
            notes: None,
        })?;

        best_effort(
            "report count",
            self.db.adjust_message_counter(&mid, MessageCounter::Reports, 1),
        );

        info!("Report {} filed on {} by {}: {}", id, message_id, reporter.address, reason);
        self.hub.publish(Change::Messages);
        Ok(id)
    }

    pub fn update_report_status(
        &self,
        moderator: &Moderator,
        report_id: Uuid,
        status: ReportStatus,
        notes: Option<&str>,
    ) -> Result<Report> {
        if status == ReportStatus::Pending {
            return Err(ForumError::invalid("a reviewed report cannot return to pending"));
        }

        let rid = report_id.to_string();
        let updated = self.db.update_report_status(
            &rid,
            status.as_str(),
            &format_timestamp(Utc::now()),
            Some(moderator.reviewer()),
            notes,
        )?;
        if !updated {
            return Err(ForumError::NotFound("report"));
        }

        info!("Report {} marked {} by {}", report_id, status.as_str(), moderator.reviewer());
        self.db
            .get_report(&rid)?
            .and_then(convert::report)
            .ok_or(ForumError::NotFound("report"))
    }

    /// Resolve every report on the message, then delete it.
    ///
    /// Reports are not cascade-deleted, so they are closed first; if any of
    /// those writes fails the message is left in place.
    pub fn delete_message_and_resolve_reports(
        &self,
        moderator: &Moderator,
        message_id: Uuid,
    ) -> Result<DeletionOutcome> {
        let mid = message_id.to_string();
        let reports = self.db.reports_for_message(&mid)?;
        let now = format_timestamp(Utc::now());

        for report in &reports {
            self.db.update_report_status(
                &report.id,
                ReportStatus::Resolved.as_str(),
                &now,
                Some(moderator.reviewer()),
                Some(DELETION_NOTE),
            )?;
        }

        let deleted_message = self.db.delete_message(&mid)?;
        info!(
            "Message {} deleted by {} ({} reports resolved)",
            message_id,
            moderator.reviewer(),
            reports.len()
        );

        self.hub.publish(Change::Messages);
        Ok(DeletionOutcome {
            deleted_message,
            updated_reports: reports.len(),
        })
    }

    /// Reports newest first, optionally filtered by status.
    pub fn list_reports(&self, _moderator: &Moderator, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        let rows = self.db.list_reports(status.map(ReportStatus::as_str))?;
        Ok(rows.into_iter().filter_map(convert::report).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ForumConfig, Identity};
    use forum_db::Database;

    fn setup() -> (Forum, User, User) {
        let forum = Forum::new(
            Database::open_in_memory().unwrap(),
            ForumConfig::default().with_moderators(["0xM0D"]),
        );
        let login = |address: &str| {
            forum
                .login_user(&Identity {
                    address: address.into(),
                    username: None,
                    profile_picture_url: None,
                    is_orb_verified: true,
                })
                .unwrap()
        };
        let alice = login("0xa11ce");
        let bob = login("0xb0b");
        (forum, alice, bob)
    }

    #[test]
    fn only_configured_addresses_moderate() {
        let (forum, _, _) = setup();
        assert!(forum.moderator("0xm0d").is_ok());
        assert!(matches!(forum.moderator("0xb0b"), Err(ForumError::Forbidden)));
    }

    #[test]
    fn report_starts_pending_and_bumps_counter() {
        let (forum, alice, bob) = setup();
        let m = forum.create_message(&alice, "buy my token", None).unwrap();

        forum.create_report(m, &bob, &ReportReason::Scam).unwrap();
        forum
            .create_report(m, &alice, &ReportReason::Other("self report".into()))
            .unwrap();

        let moderator = forum.moderator("0xm0d").unwrap();
        let pending = forum.list_reports(&moderator, Some(ReportStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().any(|r| r.reason == "Other: self report"));
        assert_eq!(forum.get_message(m).unwrap().unwrap().report_count, 2);
        assert_eq!(forum.flagged_messages(2).unwrap().len(), 1);
    }

    #[test]
    fn reports_need_a_real_message_and_reason() {
        let (forum, alice, bob) = setup();
        assert!(matches!(
            forum.create_report(Uuid::new_v4(), &bob, &ReportReason::Spam),
            Err(ForumError::NotFound("message"))
        ));
        let m = forum.create_message(&alice, "hi", None).unwrap();
        assert!(matches!(
            forum.create_report(m, &bob, &ReportReason::Other("  ".into())),
            Err(ForumError::Invalid(_))
        ));
    }

    #[test]
    fn status_update_records_reviewer() {
        let (forum, alice, bob) = setup();
        let m = forum.create_message(&alice, "hi", None).unwrap();
        let r = forum.create_report(m, &bob, &ReportReason::Misleading).unwrap();
        let moderator = forum.moderator("0xM0D").unwrap();

        let report = forum
            .update_report_status(&moderator, r, ReportStatus::Dismissed, Some("fine"))
            .unwrap();
        assert_eq!(report.status, ReportStatus::Dismissed);
        assert_eq!(report.reviewed_by.as_deref(), Some("0xm0d"));
        assert_eq!(report.notes.as_deref(), Some("fine"));
        assert!(report.reviewed_at.is_some());

        assert!(matches!(
            forum.update_report_status(&moderator, r, ReportStatus::Pending, None),
            Err(ForumError::Invalid(_))
        ));
        assert!(matches!(
            forum.update_report_status(&moderator, Uuid::new_v4(), ReportStatus::Reviewed, None),
            Err(ForumError::NotFound("report"))
        ));
    }
}
