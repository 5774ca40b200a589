#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use onsite_timekeeper::db::db::Db;
    use onsite_timekeeper::db::dismissals::Dismissals;
    use onsite_timekeeper::db::grants::Grants;
    use onsite_timekeeper::db::sessions::Sessions;
    use onsite_timekeeper::libs::archive::DismissalCache;
    use onsite_timekeeper::libs::error::{or_empty, Result, TimekeeperError};
    use onsite_timekeeper::libs::grant::{AccessManager, AccessPolicy};
    use onsite_timekeeper::libs::report::ReportSettings;
    use onsite_timekeeper::libs::session::{Session, SessionStore};
    use onsite_timekeeper::libs::timesheet::{Timesheet, DEFAULT_HISTORY_DAYS};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct TimesheetTestContext {
        _temp_dir: TempDir,
        db_path: PathBuf,
        access: AccessManager<Grants>,
        sessions: Sessions,
    }

    impl TestContext for TimesheetTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let db_path = temp_dir.path().join("test.db");
            let mut access = AccessManager::new(Grants::with_db(Db::open(&db_path).unwrap()), AccessPolicy::default());

            let token = access.generate_token_at("worker-1", "Alex Martin", now()).unwrap();
            access.redeem_at(&token.token, "manager-1", now()).unwrap();

            TimesheetTestContext {
                sessions: Sessions::with_db(Db::open(&db_path).unwrap()),
                _temp_dir: temp_dir,
                db_path,
                access,
            }
        }
    }

    impl TimesheetTestContext {
        fn timesheet(&mut self) -> Timesheet<'_, Grants, Sessions> {
            Timesheet::new(&mut self.access, &mut self.sessions, ReportSettings::default(), Some("QC".to_string()))
        }

        fn dismissals(&self) -> Dismissals {
            Dismissals::with_db(Db::open(&self.db_path).unwrap())
        }

        fn add(&mut self, entry: DateTime<Utc>, hours: i64, pause: u32) -> Session {
            let mut session = Session::open("worker-1", entry);
            session.location_name = Some("Main St Site".to_string());
            session.exit_at = Some(entry + Duration::hours(hours));
            session.pause_minutes = pause;
            self.sessions.insert(&session).unwrap();
            session
        }
    }

    /// Cache whose sweep always fails.
    struct FailingSweep;

    impl DismissalCache for FailingSweep {
        fn dismissed_ids(&mut self, _worker_id: &str) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }

        fn mark_dismissed(&mut self, entry_ids: &[String], _worker_id: &str, _at: DateTime<Utc>) -> Result<usize> {
            Ok(entry_ids.len())
        }

        fn sweep_expired(&mut self, _now: DateTime<Utc>) -> Result<usize> {
            Err(TimekeeperError::Database(rusqlite::Error::InvalidQuery))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_daily_report_for_owner(ctx: &mut TimesheetTestContext) {
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(), 9, 30);
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 14, 8, 0, 0).unwrap(), 9, 30);

        let report = ctx.timesheet().daily_at("worker-1", "Alex Martin", day(3, 15), now()).unwrap();
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.total_minutes, 510);
        assert!(report.text.starts_with("Alex Martin\n"));
        assert!(report.text.contains("TOTAL: 8h 30min"));
        assert!(report.text.ends_with("Ref #   QC-KER1-0315-01\n"));
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_range_report_for_linked_viewer(ctx: &mut TimesheetTestContext) {
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap(), 8, 0);
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 13, 8, 0, 0).unwrap(), 4, 0);
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap(), 4, 0);

        let report = ctx
            .timesheet()
            .range_at("manager-1", "worker-1", "Alex Martin", day(3, 10), day(3, 16), now())
            .unwrap();
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.day_keys.len(), 2);
        assert_eq!(report.total_minutes, 12 * 60);
        assert_eq!(report.text.matches("Day Total:").count(), 2);
        assert!(report.text.contains("TOTAL: 12h"));
        assert_eq!(report.first_day().unwrap().to_string(), "2024-03-11");
        assert_eq!(report.last_day().unwrap().to_string(), "2024-03-13");
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_unlinked_viewer_is_denied(ctx: &mut TimesheetTestContext) {
        ctx.add(Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap(), 8, 0);

        let result = ctx.timesheet().range_at("stranger", "worker-1", "Alex Martin", day(3, 10), day(3, 16), now());
        assert!(matches!(result, Err(TimekeeperError::AccessDenied)));
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_empty_range_renders_nothing(ctx: &mut TimesheetTestContext) {
        let report = ctx
            .timesheet()
            .range_at("manager-1", "worker-1", "Alex Martin", day(3, 10), day(3, 16), now())
            .unwrap();
        assert!(report.is_empty());
        assert!(report.text.is_empty());
        assert_eq!(report.total_minutes, 0);
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_pending_hours_hide_dismissed_entries(ctx: &mut TimesheetTestContext) {
        let recent = ctx.add(now() - Duration::days(1), 8, 0);
        let older = ctx.add(now() - Duration::days(10), 6, 0);
        ctx.add(now() - Duration::days(DEFAULT_HISTORY_DAYS + 5), 8, 0);

        let mut dismissals = ctx.dismissals();
        let report = ctx
            .timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now())
            .unwrap();
        assert_eq!(report.entry_ids(), vec![older.id.clone(), recent.id.clone()]);
        assert_eq!(report.total_minutes, 14 * 60);

        dismissals.mark_dismissed(&[older.id.clone()], "worker-1", now()).unwrap();
        let report = ctx
            .timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now())
            .unwrap();
        assert_eq!(report.entry_ids(), vec![recent.id.clone()]);

        dismissals.mark_dismissed(&report.entry_ids(), "worker-1", now()).unwrap();
        let report = ctx
            .timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now())
            .unwrap();
        assert!(report.is_empty());
        assert!(report.text.is_empty());
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_dismissals_expire_and_are_swept(ctx: &mut TimesheetTestContext) {
        let session = ctx.add(now() - Duration::days(2), 8, 0);
        let mut dismissals = ctx.dismissals().with_expiry_days(60);

        dismissals.mark_dismissed(&[session.id.clone()], "worker-1", now() - Duration::days(61)).unwrap();
        assert!(dismissals.dismissed_ids("worker-1").unwrap().contains(&session.id));
        assert!(dismissals.dismissed_ids("worker-2").unwrap().is_empty());

        // Loading the view sweeps the stale marker, so the entry reappears next time.
        ctx.timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now())
            .unwrap();
        assert!(dismissals.dismissed_ids("worker-1").unwrap().is_empty());
        assert_eq!(dismissals.sweep_expired(now()).unwrap(), 0);
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_failed_sweep_still_shows_pending_hours(ctx: &mut TimesheetTestContext) {
        let session = ctx.add(now() - Duration::days(1), 8, 0);

        let report = ctx
            .timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut FailingSweep, DEFAULT_HISTORY_DAYS, now())
            .unwrap();
        assert_eq!(report.entry_ids(), vec![session.id]);
        assert_eq!(report.total_minutes, 8 * 60);
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_history_out_of_range_is_rejected(ctx: &mut TimesheetTestContext) {
        ctx.add(now() - Duration::days(1), 8, 0);
        let mut dismissals = ctx.dismissals();

        for days in [i64::MAX, 0, -1] {
            let result = ctx
                .timesheet()
                .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, days, now());
            assert!(matches!(result, Err(TimekeeperError::Validation(_))), "history_days = {}", days);
        }
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_huge_expiry_keeps_markers(ctx: &mut TimesheetTestContext) {
        let session = ctx.add(now() - Duration::days(1), 8, 0);
        let mut dismissals = ctx.dismissals().with_expiry_days(i64::MAX);
        dismissals.mark_dismissed(&[session.id.clone()], "worker-1", now() - Duration::days(61)).unwrap();

        assert_eq!(dismissals.sweep_expired(now()).unwrap(), 0);
        assert!(dismissals.dismissed_ids("worker-1").unwrap().contains(&session.id));

        let mut dismissals = ctx.dismissals().with_expiry_days(100_000_000_000);
        assert_eq!(dismissals.sweep_expired(now()).unwrap(), 0);
    }

    #[test_context(TimesheetTestContext)]
    #[test]
    fn test_unreadable_sessions_show_as_empty(ctx: &mut TimesheetTestContext) {
        ctx.add(now() - Duration::days(1), 8, 0);
        Db::open(&ctx.db_path).unwrap().conn.execute("DROP TABLE sessions", []).unwrap();

        let mut dismissals = ctx.dismissals();
        let result = ctx
            .timesheet()
            .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now());
        assert!(matches!(result, Err(TimekeeperError::Database(_))));

        let report = or_empty(
            ctx.timesheet()
                .pending_hours_at("manager-1", "worker-1", "Alex Martin", &mut dismissals, DEFAULT_HISTORY_DAYS, now()),
            "pending hours",
        )
        .unwrap();
        assert!(report.is_empty());

        let denied = ctx.timesheet().range_at("stranger", "worker-1", "Alex Martin", day(3, 10), day(3, 16), now());
        assert!(matches!(or_empty(denied, "timesheet"), Err(TimekeeperError::AccessDenied)));
    }
}
