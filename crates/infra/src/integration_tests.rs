//! Integration tests for the full permit pipeline.
//!
//! Tests: Config → RoleRegistry → TransitionDispatcher → WorkflowEngine → PermitStore
//!
//! Verifies:
//! - The permit lifecycle end to end with role-gated stages
//! - Segregation of duties at approval
//! - Concurrent transitions on one permit cannot both commit
//! - Registry reloads (rules and super-role) take effect without rebuilding the dispatcher

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use sitesafe_auth::{
        Action, PermissionRule, RegistryHandle, Resource, RoleDefinition, RoleKey, Scope, User,
        check, default_catalog,
    };
    use sitesafe_core::{OrgId, PermitId, PermitType, UserId};
    use sitesafe_permits::{
        CreatePermit, PermitPayload, RiskTier, TimeWindow, TransitionRequest, Weather,
        WorkDetails, WorkflowError, WorkflowStage,
    };

    use crate::config::EngineConfig;
    use crate::dispatcher::{DispatchError, TransitionDispatcher};
    use crate::store::{InMemoryPermitStore, PermitStore};

    type Dispatcher = TransitionDispatcher<Arc<InMemoryPermitStore>>;

    struct Site {
        dispatcher: Dispatcher,
        org: OrgId,
        u1_worker: User,
        u2_supervisor: User,
        manager: User,
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
    }

    fn setup() -> Site {
        let config = EngineConfig::default();
        let registry = config.load_registry().unwrap();
        let engine = sitesafe_permits::WorkflowEngine::new(config.actor_policy(&registry));
        let dispatcher = TransitionDispatcher::new(
            Arc::new(InMemoryPermitStore::new()),
            Arc::new(RegistryHandle::new(registry)),
            engine,
        );
        let org = OrgId::new();
        Site {
            dispatcher,
            org,
            u1_worker: User::new(UserId::new(), org, RoleKey::WORKER),
            u2_supervisor: User::new(UserId::new(), org, RoleKey::SUPERVISOR),
            manager: User::new(UserId::new(), org, RoleKey::HSE_MANAGER),
        }
    }

    fn test_payload(location: &str) -> PermitPayload {
        PermitPayload::new(
            "PTW-2026-014",
            WorkDetails {
                location: location.to_string(),
                description: "Hot tapping on firewater header".to_string(),
                coverage: TimeWindow::new(test_time(), test_time() + Duration::hours(6)),
                number_of_workers: 4,
            },
        )
    }

    fn create(site: &Site, creator: &User, location: &str) -> PermitId {
        let permit_id = PermitId::new();
        site.dispatcher
            .create(
                creator,
                CreatePermit {
                    permit_id,
                    org_id: site.org,
                    project_id: None,
                    permit_type: PermitType::HotWork,
                    creator_id: creator.id,
                    payload: test_payload(location),
                    occurred_at: test_time(),
                },
            )
            .unwrap();
        permit_id
    }

    fn request(target: WorkflowStage) -> TransitionRequest {
        TransitionRequest::new(target, test_time())
    }

    fn move_to(
        site: &Site,
        id: PermitId,
        from: WorkflowStage,
        user: &User,
        to: WorkflowStage,
    ) -> Result<WorkflowStage, DispatchError> {
        site.dispatcher
            .transition(id, from, user, request(to))
            .map(|p| p.stage())
    }

    #[test]
    fn worker_permit_moves_from_draft_to_approved() {
        use WorkflowStage::*;

        let site = setup();
        let (u1, u2, hse) = (&site.u1_worker, &site.u2_supervisor, &site.manager);
        let id = create(&site, u1, "Zone 1 - Firewater Ring");

        assert_eq!(move_to(&site, id, Draft, u1, Requested).unwrap(), Requested);

        let err = move_to(&site, id, Requested, u1, IssuerReview).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Workflow(WorkflowError::ActorRejected { stage: Requested, .. })
        ));
        assert_eq!(move_to(&site, id, Requested, u2, IssuerReview).unwrap(), IssuerReview);
        assert_eq!(move_to(&site, id, IssuerReview, u2, IssuerSigned).unwrap(), IssuerSigned);

        // Neither the creator nor the issuer may push it into approval.
        assert!(move_to(&site, id, IssuerSigned, u1, PendingApproval).is_err());
        assert!(move_to(&site, id, IssuerSigned, u2, PendingApproval).is_err());
        assert_eq!(move_to(&site, id, IssuerSigned, hse, PendingApproval).unwrap(), PendingApproval);

        assert!(move_to(&site, id, PendingApproval, u1, Approved).is_err());
        assert!(move_to(&site, id, PendingApproval, u2, Approved).is_err());
        assert_eq!(move_to(&site, id, PendingApproval, hse, Approved).unwrap(), Approved);

        let permit = site.dispatcher.store().load(id).unwrap();
        let trail: Vec<(WorkflowStage, UserId)> =
            permit.log().iter().map(|e| (e.stage, e.user_id)).collect();
        assert_eq!(
            trail,
            vec![
                (Requested, u1.id),
                (IssuerReview, u2.id),
                (IssuerSigned, u2.id),
                (PendingApproval, hse.id),
                (Approved, hse.id),
            ]
        );
    }

    #[test]
    fn manager_cannot_approve_own_permit() {
        use WorkflowStage::*;

        let site = setup();
        let other_manager = User::new(UserId::new(), site.org, RoleKey::HSE_MANAGER);
        let id = create(&site, &site.manager, "Tank Farm");

        move_to(&site, id, Draft, &site.manager, Requested).unwrap();
        move_to(&site, id, Requested, &site.u2_supervisor, IssuerReview).unwrap();
        move_to(&site, id, IssuerReview, &site.u2_supervisor, IssuerSigned).unwrap();
        move_to(&site, id, IssuerSigned, &other_manager, PendingApproval).unwrap();

        let err = move_to(&site, id, PendingApproval, &site.manager, Approved).unwrap_err();
        assert!(matches!(err, DispatchError::Workflow(WorkflowError::ActorRejected { .. })));
        assert_eq!(move_to(&site, id, PendingApproval, &other_manager, Approved).unwrap(), Approved);
    }

    #[test]
    fn stale_reader_is_told_to_refetch() {
        use WorkflowStage::*;

        let site = setup();
        let id = create(&site, &site.u1_worker, "Jetty 2");
        move_to(&site, id, Draft, &site.u1_worker, Requested).unwrap();

        // Caller still believes the permit is in DRAFT.
        let err = move_to(&site, id, Draft, &site.u1_worker, Requested).unwrap_err();
        assert!(matches!(err, DispatchError::StaleState(_)));
    }

    #[test]
    fn concurrent_transitions_on_one_permit_commit_once() {
        use WorkflowStage::*;

        let site = Arc::new(setup());
        let id = create(&site, &site.u1_worker, "Compressor House");
        move_to(&site, id, Draft, &site.u1_worker, Requested).unwrap();

        let second_supervisor = User::new(UserId::new(), site.org, RoleKey::SUPERVISOR);
        let barrier = Arc::new(Barrier::new(2));
        let attempts = [
            (site.u2_supervisor.clone(), IssuerReview),
            (second_supervisor, Draft),
        ];

        let handles: Vec<_> = attempts
            .into_iter()
            .map(|(user, target)| {
                let site = site.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    site.dispatcher.transition(id, Requested, &user, request(target))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let committed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(committed, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DispatchError::StaleState(_))));

        let permit = site.dispatcher.store().load(id).unwrap();
        assert_eq!(permit.log().len(), 2);
    }

    #[test]
    fn workers_cannot_touch_other_workers_permits() {
        let site = setup();
        let id = create(&site, &site.u1_worker, "Pipe Rack 4");
        let other_worker = User::new(UserId::new(), site.org, RoleKey::WORKER);

        let err = site
            .dispatcher
            .update_payload(id, &other_worker, test_payload("Pipe Rack 5"), test_time())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized(_)));

        let updated = site
            .dispatcher
            .update_payload(id, &site.u1_worker, test_payload("Pipe Rack 5"), test_time())
            .unwrap();
        assert_eq!(updated.location(), Some("Pipe Rack 5"));
    }

    #[test]
    fn receiver_and_risk_annotations_persist() {
        let site = setup();
        let id = create(&site, &site.u1_worker, "Boiler Room");

        site.dispatcher
            .assign_receiver(id, &site.manager, &site.u1_worker, test_time())
            .unwrap();
        site.dispatcher
            .annotate_risk(id, &site.manager, true, Weather::Hot, test_time())
            .unwrap();

        let permit = site.dispatcher.store().load(id).unwrap();
        assert!(permit.is_receiver(site.u1_worker.id));
        // Hot work at night in heat: 40 * 1.5 * 1.2 * 1.4 = 100.8 -> capped.
        assert_eq!(permit.risk().map(|r| r.tier), Some(RiskTier::Critical));
    }

    #[test]
    fn active_permits_in_same_zone_are_reported() {
        use WorkflowStage::*;

        let site = setup();
        let id = create(&site, &site.u1_worker, "Zone 1 - Pump House");
        let path = [
            (Draft, &site.u1_worker, Requested),
            (Requested, &site.u2_supervisor, IssuerReview),
            (IssuerReview, &site.u2_supervisor, IssuerSigned),
            (IssuerSigned, &site.manager, PendingApproval),
            (PendingApproval, &site.manager, Approved),
            (Approved, &site.u2_supervisor, Active),
        ];
        for (from, user, to) in path {
            move_to(&site, id, from, user, to).unwrap();
        }

        let overlapping = TimeWindow::new(test_time() + Duration::hours(2), test_time() + Duration::hours(8));
        let conflicts = site
            .dispatcher
            .simops_conflicts(&site.u2_supervisor, "zone 1", &overlapping)
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].permit_id, id);

        let later = TimeWindow::new(test_time() + Duration::hours(7), test_time() + Duration::hours(9));
        assert!(site
            .dispatcher
            .simops_conflicts(&site.u2_supervisor, "zone 1", &later)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn proposed_role_is_honoured_without_restart() {
        let site = setup();
        let planner = RoleKey::new("PERMIT_PLANNER");
        let user = User::new(UserId::new(), site.org, planner.clone());

        let attempt = |site: &Site| {
            site.dispatcher.create(
                &user,
                CreatePermit {
                    permit_id: PermitId::new(),
                    org_id: site.org,
                    project_id: None,
                    permit_type: PermitType::GeneralWork,
                    creator_id: user.id,
                    payload: test_payload("Laydown Yard"),
                    occurred_at: test_time(),
                },
            )
        };

        assert!(matches!(attempt(&site), Err(DispatchError::Unauthorized(_))));

        let revision = site
            .dispatcher
            .registry()
            .propose_role(
                RoleDefinition::new(planner, "Permit Planner", Scope::Organization).rule(
                    PermissionRule::new(Resource::Ptw, &[Action::Read, Action::Create], Scope::Organization),
                ),
            )
            .unwrap()
            .revision();
        assert_eq!(revision, 2);
        assert!(attempt(&site).is_ok());
    }

    #[test]
    fn reloaded_super_role_governs_the_workflow() {
        use WorkflowStage::*;

        let site = setup();
        let admin = User::new(UserId::new(), site.org, RoleKey::ADMIN);
        let org_admin = User::new(UserId::new(), site.org, RoleKey::ORG_ADMIN);
        let id = create(&site, &site.u1_worker, "Substation B");
        move_to(&site, id, Draft, &site.u1_worker, Requested).unwrap();

        let mut catalog = default_catalog();
        catalog.super_role = RoleKey::ORG_ADMIN;
        let registry = site.dispatcher.registry().reload(catalog).unwrap();
        assert_eq!(registry.revision(), 2);

        let subject = site.dispatcher.store().load(id).unwrap().subject();
        assert!(check(&registry, Some(&org_admin), Action::Approve, Resource::Ptw, Some(&subject)));
        assert!(!check(&registry, Some(&admin), Action::Approve, Resource::Ptw, Some(&subject)));

        let err = move_to(&site, id, Requested, &admin, IssuerReview).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Workflow(WorkflowError::ActorRejected { stage: Requested, .. })
        ));
        assert_eq!(move_to(&site, id, Requested, &org_admin, IssuerReview).unwrap(), IssuerReview);
    }
}
