//! Escrow projection
//!
//! Read-mostly mirror of on-chain escrow records. The external indexer
//! writes rows through `upsert_projection`; the only in-process writes
//! are the dispute-driven state forcing in the dispute service.

use diesel::prelude::*;
use peerlock_types::EscrowState;
use serde::{Deserialize, Serialize};

use crate::models::now_rfc3339;
use crate::schema::escrows;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = escrows)]
pub struct Escrow {
    pub id: String,
    pub chain_id: i64,
    pub token_key: String,
    /// Decimal string, uint256 range
    pub amount: String,
    pub fee_amount: String,
    pub seller_bond: String,
    pub buyer_bond: String,
    pub seller: String,
    pub buyer: Option<String>,
    pub state: String,
    pub updated_at_block: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = escrows)]
pub struct NewEscrow {
    pub id: String,
    pub chain_id: i64,
    pub token_key: String,
    pub amount: String,
    pub fee_amount: String,
    pub seller_bond: String,
    pub buyer_bond: String,
    pub seller: String,
    pub buyer: Option<String>,
    pub state: String,
    pub updated_at_block: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Escrow {
    pub fn find(conn: &mut SqliteConnection, escrow_id: &str) -> QueryResult<Option<Escrow>> {
        escrows::table
            .filter(escrows::id.eq(escrow_id))
            .first(conn)
            .optional()
    }

    /// Indexer entry point: mirror an on-chain escrow event.
    ///
    /// Stale events are ignored: an update only lands if its block height
    /// is not behind the stored projection.
    pub fn upsert_projection(conn: &mut SqliteConnection, record: &NewEscrow) -> QueryResult<()> {
        let inserted = diesel::insert_into(escrows::table)
            .values(record)
            .on_conflict_do_nothing()
            .execute(conn)?;

        if inserted == 0 {
            diesel::update(
                escrows::table
                    .filter(escrows::id.eq(&record.id))
                    .filter(escrows::updated_at_block.le(record.updated_at_block)),
            )
            .set((
                escrows::buyer.eq(&record.buyer),
                escrows::state.eq(&record.state),
                escrows::updated_at_block.eq(record.updated_at_block),
                escrows::updated_at.eq(now_rfc3339()),
            ))
            .execute(conn)?;
        }

        Ok(())
    }

    /// Force the state if the current state is one of `from`; returns
    /// whether a row changed. This is the dispute service's only way to
    /// touch escrow state.
    pub fn set_state_if(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        from: &[EscrowState],
        to: EscrowState,
    ) -> QueryResult<bool> {
        let from_strs: Vec<&str> = from.iter().map(|s| s.as_str()).collect();

        let updated = diesel::update(
            escrows::table
                .filter(escrows::id.eq(escrow_id))
                .filter(escrows::state.eq_any(from_strs)),
        )
        .set((
            escrows::state.eq(to.as_str()),
            escrows::updated_at.eq(now_rfc3339()),
        ))
        .execute(conn)?;

        Ok(updated == 1)
    }

    /// Unconditional state force, used when a dispute resolution settles
    /// the escrow regardless of what the projection currently shows.
    pub fn force_state(
        conn: &mut SqliteConnection,
        escrow_id: &str,
        to: EscrowState,
    ) -> QueryResult<bool> {
        let updated = diesel::update(escrows::table.filter(escrows::id.eq(escrow_id)))
            .set((
                escrows::state.eq(to.as_str()),
                escrows::updated_at.eq(now_rfc3339()),
            ))
            .execute(conn)?;

        Ok(updated == 1)
    }

    pub fn current_state(&self) -> Option<EscrowState> {
        EscrowState::from_str(&self.state)
    }

    /// Participants with a non-null address.
    pub fn participants(&self) -> Vec<String> {
        let mut out = vec![self.seller.clone()];
        if let Some(buyer) = &self.buyer {
            out.push(buyer.clone());
        }
        out
    }

    /// The participant other than `address`, if any.
    pub fn counterparty_of(&self, address: &str) -> Option<String> {
        if self.seller.eq_ignore_ascii_case(address) {
            self.buyer.clone()
        } else if self
            .buyer
            .as_deref()
            .is_some_and(|b| b.eq_ignore_ascii_case(address))
        {
            Some(self.seller.clone())
        } else {
            None
        }
    }

    pub fn is_participant(&self, address: &str) -> bool {
        self.seller.eq_ignore_ascii_case(address)
            || self
                .buyer
                .as_deref()
                .is_some_and(|b| b.eq_ignore_ascii_case(address))
    }
}
