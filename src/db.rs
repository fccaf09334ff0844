//! Postgres-backed record store for message and booking rows.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::error;

use crate::capabilities::RecordStore;
use crate::db_types::{Booking, MessageRecord};
use crate::error::AppError;

pub struct PgRecordStore {
    pool: Pool<Postgres>,
}

impl PgRecordStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_message(&self, record: &MessageRecord) -> Result<(), AppError> {
        let extracted = record.extracted.as_ref();
        sqlx::query(
            "
            insert into messages (
              id,
              from_number,
              kind,
              content,
              extracted_name,
              extracted_intent,
              extracted_details,
              created_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(record.id)
        .bind(&record.from_number)
        .bind(record.kind.as_str())
        .bind(&record.content)
        .bind(extracted.map(|e| e.name.as_str()))
        .bind(extracted.map(|e| e.intent.as_str()))
        .bind(extracted.map(|e| e.description.as_str()))
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to insert message row");
            AppError("db error")
        })?;

        Ok(())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError> {
        sqlx::query(
            "
            insert into bookings (
              id,
              customer_name,
              intent,
              details,
              proposed_time,
              caller_number,
              created_at
            ) values ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(booking.id)
        .bind(&booking.customer_name)
        .bind(&booking.intent)
        .bind(&booking.details)
        .bind(booking.proposed_time)
        .bind(&booking.caller_number)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to insert booking row");
            AppError("db error")
        })?;

        Ok(())
    }
}
