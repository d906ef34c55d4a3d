//! Notification rows
//!
//! Every dispatched event is persisted per recipient before delivery is
//! attempted, so a crashed or unconfigured sink never loses the record
//! of what should have been sent.

use diesel::prelude::*;
use peerlock_types::NotificationEventType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::now_rfc3339;
use crate::schema::notifications;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: String,
    pub event_type: String,
    pub escrow_id: String,
    pub sender: String,
    pub recipient: String,
    pub payload: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: String,
    pub event_type: String,
    pub escrow_id: String,
    pub sender: String,
    pub recipient: String,
    pub payload: String,
    pub created_at: String,
}

impl Notification {
    pub fn insert(
        conn: &mut SqliteConnection,
        event_type: NotificationEventType,
        escrow_id: &str,
        sender: &str,
        recipient: &str,
        payload: &serde_json::Value,
    ) -> QueryResult<Notification> {
        let record = NewNotification {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.as_str().to_string(),
            escrow_id: escrow_id.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            payload: payload.to_string(),
            created_at: now_rfc3339(),
        };

        diesel::insert_into(notifications::table)
            .values(&record)
            .execute(conn)?;

        notifications::table
            .filter(notifications::id.eq(&record.id))
            .first(conn)
    }

    pub fn for_escrow(conn: &mut SqliteConnection, escrow_id: &str) -> QueryResult<Vec<Notification>> {
        notifications::table
            .filter(notifications::escrow_id.eq(escrow_id))
            .order(notifications::created_at.asc())
            .load(conn)
    }

    pub fn for_recipient(
        conn: &mut SqliteConnection,
        recipient: &str,
    ) -> QueryResult<Vec<Notification>> {
        notifications::table
            .filter(notifications::recipient.eq(recipient))
            .order(notifications::created_at.asc())
            .load(conn)
    }
}
