//! Dispute records
//!
//! One dispute per escrow, keyed by the escrow handle. Every mutating
//! query here is a conditional write so that racing callers are decided
//! by the database, not by application-level locking.

use diesel::prelude::*;
use peerlock_types::{AnalysisDocument, DisputeOutcome, DisputeStatus};
use serde::{Deserialize, Serialize};

use crate::models::now_rfc3339;
use crate::schema::disputes;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = disputes)]
pub struct Dispute {
    pub escrow_id: String,
    pub opened_by: String,
    pub reason_code: Option<String>,
    pub summary: Option<String>,
    pub status: String,
    pub outcome: Option<String>,
    pub arbitrator: Option<String>,
    pub escalation_level: i32,
    pub ai_analysis: Option<String>,
    pub tier2_analysis: Option<String>,
    pub resolution_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = disputes)]
pub struct NewDispute {
    pub escrow_id: String,
    pub opened_by: String,
    pub reason_code: Option<String>,
    pub summary: Option<String>,
    pub status: String,
    pub escalation_level: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl Dispute {
    pub fn find(conn: &mut SqliteConnection, escrow_id: &str) -> QueryResult<Option<Dispute>> {
        disputes::table
            .filter(disputes::escrow_id.eq(escrow_id))
            .first(conn)
            .optional()
    }

    pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<Dispute>> {
        disputes::table.order(disputes::updated_at.desc()).load(conn)
    }

    /// Open or re-open: at most one dispute per escrow, re-opening
    /// overwrites reason and summary instead of duplicating. RESOLVED is
    /// terminal even here, so an escrow projection rewound by the indexer
    /// cannot revive a settled dispute; returns `None` when the guard
    /// blocks.
    pub fn upsert_open(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        opened_by: &str,
        reason_code: Option<&str>,
        summary: Option<&str>,
    ) -> QueryResult<Option<Dispute>> {
        let now = now_rfc3339();

        let updated = diesel::update(
            disputes::table
                .filter(disputes::escrow_id.eq(escrow_id))
                .filter(disputes::status.ne(DisputeStatus::Resolved.as_str())),
        )
        .set((
            disputes::reason_code.eq(reason_code.map(str::to_string)),
            disputes::summary.eq(summary.map(str::to_string)),
            disputes::status.eq(DisputeStatus::Open.as_str()),
            disputes::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if updated == 0 {
            if Self::find(conn, escrow_id)?.is_some() {
                // The only row the conditional update skips is RESOLVED
                return Ok(None);
            }

            let record = NewDispute {
                escrow_id: escrow_id.to_string(),
                opened_by: opened_by.to_string(),
                reason_code: reason_code.map(str::to_string),
                summary: summary.map(str::to_string),
                status: DisputeStatus::Open.as_str().to_string(),
                escalation_level: 0,
                created_at: now.clone(),
                updated_at: now,
            };
            diesel::insert_into(disputes::table)
                .values(&record)
                .execute(conn)?;
        }

        Self::find(conn, escrow_id)
    }

    /// First-claim-wins assignment; true when this caller took it.
    pub fn claim(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        arbitrator: &str,
    ) -> QueryResult<bool> {
        let updated = diesel::update(
            disputes::table
                .filter(disputes::escrow_id.eq(escrow_id))
                .filter(disputes::arbitrator.is_null()),
        )
        .set((
            disputes::arbitrator.eq(arbitrator),
            disputes::status.eq(DisputeStatus::InProgress.as_str()),
            disputes::updated_at.eq(now_rfc3339()),
        ))
        .execute(conn)?;

        Ok(updated == 1)
    }

    /// Monotonic escalation; the level guard in the WHERE clause makes
    /// concurrent escalations settle on the highest requested level.
    pub fn escalate(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        new_level: i32,
        new_status: DisputeStatus,
        analysis: Option<&AnalysisDocument>,
    ) -> QueryResult<bool> {
        let analysis_json = analysis
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| diesel::result::Error::SerializationError(Box::new(e)))?;

        let updated = if new_level >= 2 {
            diesel::update(
                disputes::table
                    .filter(disputes::escrow_id.eq(escrow_id))
                    .filter(disputes::escalation_level.lt(new_level)),
            )
            .set((
                disputes::escalation_level.eq(new_level),
                disputes::status.eq(new_status.as_str()),
                disputes::tier2_analysis.eq(analysis_json),
                disputes::updated_at.eq(now_rfc3339()),
            ))
            .execute(conn)?
        } else {
            diesel::update(
                disputes::table
                    .filter(disputes::escrow_id.eq(escrow_id))
                    .filter(disputes::escalation_level.lt(new_level)),
            )
            .set((
                disputes::escalation_level.eq(new_level),
                disputes::status.eq(new_status.as_str()),
                disputes::ai_analysis.eq(analysis_json),
                disputes::updated_at.eq(now_rfc3339()),
            ))
            .execute(conn)?
        };

        Ok(updated == 1)
    }

    /// Append a recommendation note to the summary and mark the dispute
    /// RECOMMENDED. Existing summary text is preserved.
    pub fn set_recommendation(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        combined_summary: &str,
    ) -> QueryResult<bool> {
        let updated = diesel::update(
            disputes::table
                .filter(disputes::escrow_id.eq(escrow_id))
                .filter(disputes::status.ne(DisputeStatus::Resolved.as_str())),
        )
        .set((
            disputes::summary.eq(combined_summary),
            disputes::status.eq(DisputeStatus::Recommended.as_str()),
            disputes::updated_at.eq(now_rfc3339()),
        ))
        .execute(conn)?;

        Ok(updated == 1)
    }

    /// Terminal transition; RESOLVED never transitions out.
    pub fn resolve(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        outcome: DisputeOutcome,
        arbitrator: &str,
        resolution_ref: Option<&str>,
    ) -> QueryResult<bool> {
        let updated = diesel::update(
            disputes::table
                .filter(disputes::escrow_id.eq(escrow_id))
                .filter(disputes::status.ne(DisputeStatus::Resolved.as_str())),
        )
        .set((
            disputes::outcome.eq(outcome.as_str()),
            disputes::status.eq(DisputeStatus::Resolved.as_str()),
            disputes::arbitrator.eq(arbitrator),
            disputes::resolution_ref.eq(resolution_ref.map(str::to_string)),
            disputes::updated_at.eq(now_rfc3339()),
        ))
        .execute(conn)?;

        Ok(updated == 1)
    }

    pub fn current_status(&self) -> Option<DisputeStatus> {
        DisputeStatus::from_str(&self.status)
    }
}
