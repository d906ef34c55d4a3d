//! Dispute state machine
//!
//! Drives the dispute service end to end over the escrow projection:
//! opening preconditions, the claim race, strict escalation monotonicity,
//! recommendations, and terminal resolution. Also checks that rejected
//! operations leave no trace.

use peerlock_types::{AnalysisDocument, DisputeOutcome, DisputeStatus, EscrowState, Role};
use server::error::ApiError;
use server::models::audit_event::AuditEvent;
use server::models::dispute::Dispute;
use server::models::escrow::Escrow;

use crate::support::{actor, escrow_id, TestEnv, TestWallet};

fn addr(seed: u8) -> String {
    TestWallet::new(seed).address()
}

#[actix_web::test]
async fn participant_opens_dispute_on_funded_escrow() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let id = escrow_id(1);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);

    let dispute = env
        .disputes
        .open_dispute(&id, Some("NOT_PAID".to_string()), None, &actor(&buyer))
        .await
        .unwrap();

    assert_eq!(dispute.status, DisputeStatus::Open.as_str());
    assert_eq!(dispute.opened_by, buyer);
    assert_eq!(env.escrow_state(&id), Some(EscrowState::Disputed));

    // The open is audited
    let mut conn = env.pool.get().unwrap();
    let events = AuditEvent::recent(&mut conn, 10).unwrap();
    assert!(events.iter().any(|e| e.action == "dispute_open"));
}

#[actix_web::test]
async fn open_rejected_outside_disputable_states() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let id = escrow_id(2);
    env.seed_escrow(&id, EscrowState::Created, &seller, &buyer);

    let err = env
        .disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    // No side effects: state untouched, no dispute row, nothing audited
    assert_eq!(env.escrow_state(&id), Some(EscrowState::Created));
    let mut conn = env.pool.get().unwrap();
    assert!(Dispute::find(&mut conn, &id).unwrap().is_none());
    assert_eq!(AuditEvent::count(&mut conn).unwrap(), 0);
}

#[actix_web::test]
async fn stranger_cannot_open_but_arbitrator_can() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let stranger = addr(3);
    let arb = addr(4);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(3);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);

    let err = env
        .disputes
        .open_dispute(&id, None, None, &actor(&stranger))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    assert_eq!(env.escrow_state(&id), Some(EscrowState::Funded));

    env.disputes
        .open_dispute(&id, None, None, &actor(&arb))
        .await
        .unwrap();
    assert_eq!(env.escrow_state(&id), Some(EscrowState::Disputed));
}

#[actix_web::test]
async fn reopen_overwrites_without_duplicating() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let id = escrow_id(4);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);

    env.disputes
        .open_dispute(&id, Some("NOT_PAID".to_string()), None, &actor(&buyer))
        .await
        .unwrap();

    // Escrow is now DISPUTED, which remains disputable for a re-open
    let second = env
        .disputes
        .open_dispute(
            &id,
            Some("PAID_WRONG_AMOUNT".to_string()),
            Some("updated details".to_string()),
            &actor(&seller),
        )
        .await
        .unwrap();

    assert_eq!(second.reason_code.as_deref(), Some("PAID_WRONG_AMOUNT"));
    let mut conn = env.pool.get().unwrap();
    assert_eq!(Dispute::list(&mut conn).unwrap().len(), 1);
}

#[actix_web::test]
async fn first_claim_wins() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let (arb_a, arb_b) = (addr(5), addr(6));
    env.grant(&arb_a, Role::Arbitrator);
    env.grant(&arb_b, Role::Arbitrator);

    let id = escrow_id(5);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    let claimed = env.disputes.claim_dispute(&id, &actor(&arb_a)).await.unwrap();
    assert_eq!(claimed.arbitrator.as_deref(), Some(arb_a.as_str()));
    assert_eq!(claimed.status, DisputeStatus::InProgress.as_str());

    let err = env
        .disputes
        .claim_dispute(&id, &actor(&arb_b))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::AlreadyAssigned(_)));

    // The loser did not overwrite the assignment
    let mut conn = env.pool.get().unwrap();
    let current = Dispute::find(&mut conn, &id).unwrap().unwrap();
    assert_eq!(current.arbitrator.as_deref(), Some(arb_a.as_str()));
}

#[actix_web::test]
async fn unprivileged_claim_is_forbidden() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let id = escrow_id(6);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    // Even a participant cannot claim without the role
    let err = env
        .disputes
        .claim_dispute(&id, &actor(&buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[actix_web::test]
async fn escalation_is_strictly_monotonic() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let arb = addr(5);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(7);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    let escalated = env
        .disputes
        .escalate_dispute(&id, 1, DisputeStatus::Escalated, None, &actor(&arb))
        .await
        .unwrap();
    assert_eq!(escalated.escalation_level, 1);
    assert_eq!(escalated.status, DisputeStatus::Escalated.as_str());

    // Same level again: rejected
    let err = env
        .disputes
        .escalate_dispute(&id, 1, DisputeStatus::Escalated, None, &actor(&arb))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidEscalation(_)));

    // Lower level: rejected
    let err = env
        .disputes
        .escalate_dispute(&id, 0, DisputeStatus::Escalated, None, &actor(&arb))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidEscalation(_)));
}

#[actix_web::test]
async fn tier2_escalation_stores_analysis_in_tier2_column() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let arb = addr(5);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(8);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    let doc = AnalysisDocument {
        schema: "dispute-analysis/v1".to_string(),
        body: "automated triage output".to_string(),
    };
    let first = env
        .disputes
        .escalate_dispute(&id, 1, DisputeStatus::Escalated, Some(doc.clone()), &actor(&arb))
        .await
        .unwrap();
    assert!(first.ai_analysis.is_some());
    assert!(first.tier2_analysis.is_none());

    let second = env
        .disputes
        .escalate_dispute(&id, 2, DisputeStatus::Escalated, Some(doc), &actor(&arb))
        .await
        .unwrap();
    assert!(second.tier2_analysis.is_some());
}

#[actix_web::test]
async fn recommendation_then_resolution() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let arb = addr(5);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(9);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();
    env.disputes.claim_dispute(&id, &actor(&arb)).await.unwrap();

    let recommended = env
        .disputes
        .add_recommendation(
            &id,
            "Refund the buyer".to_string(),
            Some("seller unresponsive".to_string()),
            &actor(&arb),
        )
        .await
        .unwrap();
    assert_eq!(recommended.status, DisputeStatus::Recommended.as_str());
    assert!(recommended.summary.as_deref().unwrap().contains("Refund the buyer"));

    let resolved = env
        .disputes
        .resolve_dispute(
            &id,
            DisputeOutcome::BuyerWins,
            Some("0xtxref".to_string()),
            &actor(&arb),
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved.as_str());
    assert_eq!(resolved.outcome.as_deref(), Some("BUYER_WINS"));
    assert_eq!(env.escrow_state(&id), Some(EscrowState::Resolved));
}

#[actix_web::test]
async fn resolution_is_terminal() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let arb = addr(5);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(10);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    env.disputes
        .resolve_dispute(&id, DisputeOutcome::SellerWins, None, &actor(&arb))
        .await
        .unwrap();

    // Second resolution, recommendation and re-open all bounce
    let err = env
        .disputes
        .resolve_dispute(&id, DisputeOutcome::BuyerWins, None, &actor(&arb))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let err = env
        .disputes
        .add_recommendation(&id, "too late".to_string(), None, &actor(&arb))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let err = env
        .disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    // Outcome unchanged
    let mut conn = env.pool.get().unwrap();
    let current = Dispute::find(&mut conn, &id).unwrap().unwrap();
    assert_eq!(current.outcome.as_deref(), Some("SELLER_WINS"));
}

#[actix_web::test]
async fn rewound_escrow_cannot_revive_resolved_dispute() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let arb = addr(5);
    env.grant(&arb, Role::Arbitrator);

    let id = escrow_id(12);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, Some("NOT_PAID".to_string()), None, &actor(&buyer))
        .await
        .unwrap();
    env.disputes
        .resolve_dispute(&id, DisputeOutcome::SellerWins, None, &actor(&arb))
        .await
        .unwrap();

    // Indexer rewind puts the projection back into a disputable state
    {
        let mut conn = env.pool.get().unwrap();
        Escrow::force_state(&mut conn, &id, EscrowState::Funded).unwrap();
    }

    let err = env
        .disputes
        .open_dispute(&id, Some("FRAUD".to_string()), None, &actor(&buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    // The settled dispute is untouched
    let mut conn = env.pool.get().unwrap();
    let dispute = Dispute::find(&mut conn, &id).unwrap().unwrap();
    assert_eq!(dispute.status, DisputeStatus::Resolved.as_str());
    assert_eq!(dispute.reason_code.as_deref(), Some("NOT_PAID"));
}

#[actix_web::test]
async fn admin_cannot_claim_or_resolve() {
    let env = TestEnv::new();
    let (seller, buyer) = (addr(1), addr(2));
    let admin = addr(6);
    env.grant(&admin, Role::Admin);

    let id = escrow_id(11);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    // Claim and resolution require the ARBITRATOR role specifically;
    // ADMIN administers the registry, it does not adjudicate
    let err = env
        .disputes
        .claim_dispute(&id, &actor(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = env
        .disputes
        .resolve_dispute(&id, DisputeOutcome::BuyerWins, None, &actor(&admin))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}
