#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use onsite_timekeeper::db::db::Db;
    use onsite_timekeeper::db::grants::Grants;
    use onsite_timekeeper::libs::error::TimekeeperError;
    use onsite_timekeeper::libs::grant::{AccessGrant, AccessManager, AccessPolicy, GrantStatus, GrantStore, QrPayload};
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct GrantTestContext {
        temp_dir: TempDir,
    }

    impl TestContext for GrantTestContext {
        fn setup() -> Self {
            GrantTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    impl GrantTestContext {
        fn manager(&self, policy: AccessPolicy) -> AccessManager<Grants> {
            let db = Db::open(self.temp_dir.path().join("test.db")).unwrap();
            AccessManager::new(Grants::with_db(db), policy)
        }

        fn store(&self) -> Grants {
            Grants::with_db(Db::open(self.temp_dir.path().join("test.db")).unwrap())
        }
    }

    fn noon() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_scan_links_viewer_to_worker(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());

        let token = access.generate_token_at("worker-1", "Alex Martin", noon()).unwrap();
        assert_eq!(token.token.len(), 32);
        assert_eq!(token.expires_at, noon() + Duration::minutes(5));

        let payload = QrPayload::for_token(&token).to_json().unwrap();
        let grant = access.redeem_payload_at(&payload, "manager-1", noon() + Duration::minutes(1)).unwrap();
        assert_eq!(grant.status, GrantStatus::Active);
        assert_eq!(grant.owner_id, "worker-1");
        assert_eq!(grant.label.as_deref(), Some("Alex Martin"));
        assert!(grant.accepted_at.is_some());

        access.authorize_read("manager-1", "worker-1").unwrap();
        assert_eq!(access.viewer_grants("manager-1").unwrap().len(), 1);
        assert_eq!(access.owner_grants("worker-1").unwrap().len(), 1);
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_token_is_single_use(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();

        access.redeem_at(&token.token, "manager-1", noon()).unwrap();
        let second = access.redeem_at(&token.token, "manager-2", noon());
        assert!(matches!(second, Err(TimekeeperError::NotFound(_))));
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_expired_token_is_rejected(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();

        let late = access.redeem_at(&token.token, "manager-1", noon() + Duration::minutes(5));
        assert!(matches!(late, Err(TimekeeperError::Expired(_))));
        assert!(matches!(access.authorize_read("manager-1", "worker-1"), Err(TimekeeperError::AccessDenied)));
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_duplicate_link_conflicts_and_keeps_token(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let first = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        access.redeem_at(&first.token, "manager-1", noon()).unwrap();

        let second = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        match access.redeem_at(&second.token, "manager-1", noon()) {
            Err(TimekeeperError::Conflict(message)) => assert_eq!(message, "You already have access to this worker"),
            other => panic!("expected conflict, got {:?}", other),
        }

        // The failed redemption rolled back, so someone else can still use it.
        let other = access.redeem_at(&second.token, "manager-2", noon()).unwrap();
        assert_eq!(other.viewer_id, "manager-2");
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_revoke_cuts_access_and_allows_relinking(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        let grant = access.redeem_at(&token.token, "manager-1", noon()).unwrap();

        let revoked = access.revoke_at(&grant.id, "worker-1", noon()).unwrap();
        assert_eq!(revoked.status, GrantStatus::Revoked);
        assert!(revoked.revoked_at.is_some());
        assert!(matches!(access.authorize_read("manager-1", "worker-1"), Err(TimekeeperError::AccessDenied)));
        assert!(access.viewer_grants("manager-1").unwrap().is_empty());

        // Revoked is terminal.
        assert!(matches!(access.revoke_at(&grant.id, "worker-1", noon()), Err(TimekeeperError::Validation(_))));

        let again = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        access.redeem_at(&again.token, "manager-1", noon()).unwrap();
        access.authorize_read("manager-1", "worker-1").unwrap();
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_only_owner_can_change_a_grant(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        let grant = access.redeem_at(&token.token, "manager-1", noon()).unwrap();

        assert!(matches!(access.revoke_at(&grant.id, "manager-1", noon()), Err(TimekeeperError::AccessDenied)));
        assert!(matches!(access.revoke_at("missing", "worker-1", noon()), Err(TimekeeperError::NotFound(_))));
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_approval_mode(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy {
            require_owner_approval: true,
            ..AccessPolicy::default()
        });
        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        let grant = access.redeem_at(&token.token, "manager-1", noon()).unwrap();
        assert_eq!(grant.status, GrantStatus::Pending);
        assert!(grant.accepted_at.is_none());
        assert!(matches!(access.authorize_read("manager-1", "worker-1"), Err(TimekeeperError::AccessDenied)));

        assert!(matches!(access.approve_at(&grant.id, "manager-1", noon()), Err(TimekeeperError::AccessDenied)));

        let approved = access.approve_at(&grant.id, "worker-1", noon() + Duration::hours(1)).unwrap();
        assert_eq!(approved.status, GrantStatus::Active);
        assert_eq!(approved.accepted_at, Some(noon() + Duration::hours(1)));
        access.authorize_read("manager-1", "worker-1").unwrap();

        // Active grants cannot be approved twice.
        assert!(matches!(access.approve_at(&grant.id, "worker-1", noon()), Err(TimekeeperError::Validation(_))));
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_identity_rules(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        assert!(matches!(access.generate_token_at("", "Alex", noon()), Err(TimekeeperError::NotAuthenticated)));

        let token = access.generate_token_at("worker-1", "Alex", noon()).unwrap();
        assert!(matches!(access.redeem_at(&token.token, "", noon()), Err(TimekeeperError::NotAuthenticated)));
        assert!(matches!(access.redeem_at(&token.token, "worker-1", noon()), Err(TimekeeperError::Validation(_))));

        // Owners always read their own data, strangers never do.
        access.authorize_read("worker-1", "worker-1").unwrap();
        assert!(matches!(access.authorize_read("stranger", "worker-1"), Err(TimekeeperError::AccessDenied)));
        assert!(matches!(access.authorize_read("stranger", "nobody"), Err(TimekeeperError::AccessDenied)));
    }

    #[test_context(GrantTestContext)]
    #[test]
    fn test_concurrent_redemption_consumes_token_once(ctx: &mut GrantTestContext) {
        let mut access = ctx.manager(AccessPolicy::default());
        let token = access.generate_token_at("worker-1", "Alex Martin", noon()).unwrap();

        // A second connection looks the token up before the first one redeems it.
        let mut late = ctx.store();
        let stale = late.find_token(&token.token).unwrap().unwrap();

        access.redeem_at(&token.token, "manager-1", noon()).unwrap();

        let grant = AccessGrant {
            id: "late-grant".to_string(),
            owner_id: stale.owner_id.clone(),
            viewer_id: "manager-2".to_string(),
            token: stale.token.clone(),
            status: GrantStatus::Active,
            label: Some(stale.owner_name.clone()),
            created_at: noon(),
            accepted_at: Some(noon()),
            revoked_at: None,
        };
        assert!(matches!(late.redeem(&stale, &grant), Err(TimekeeperError::NotFound(_))));

        assert!(late.get_grant("late-grant").unwrap().is_none());
        assert!(matches!(access.authorize_read("manager-2", "worker-1"), Err(TimekeeperError::AccessDenied)));
        access.authorize_read("manager-1", "worker-1").unwrap();
    }
}
