//! `PostgreSQL` reservation store.

use crate::rows::{RESERVATION_COLUMNS, ReservationRow, convert_all, db_error};
use async_trait::async_trait;
use equipment_booking_core::error::BookingError;
use equipment_booking_core::reservations::{ReservationFilter, ReservationStats, ReservationStore};
use equipment_booking_core::types::{
    EquipmentId, Reservation, ReservationId, ReservationStatus, TimeRange,
};
use sqlx::PgPool;

/// Reservation records in the `reservations` table.
#[derive(Clone, Debug)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn labels(statuses: &[ReservationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn insert(&self, reservation: Reservation) -> Result<(), BookingError> {
        sqlx::query(
            r"
            INSERT INTO reservations
                (id, equipment_id, user_id, start_date, end_date, quantity, description,
                 status, validated_by, validated_at, rejection_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(*reservation.id.as_uuid())
        .bind(*reservation.equipment_id.as_uuid())
        .bind(*reservation.user_id.as_uuid())
        .bind(reservation.window.start())
        .bind(reservation.window.end())
        .bind(i64::from(reservation.quantity))
        .bind(&reservation.description)
        .bind(reservation.status.as_str())
        .bind(reservation.validated_by.map(|id| *id.as_uuid()))
        .bind(reservation.validated_at)
        .bind(&reservation.rejection_reason)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert reservation"))?;
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, BookingError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get reservation"))?;
        row.map(Reservation::try_from).transpose()
    }

    async fn update(&self, reservation: Reservation) -> Result<bool, BookingError> {
        let result = sqlx::query(
            r"
            UPDATE reservations
            SET equipment_id = $2,
                start_date = $3,
                end_date = $4,
                quantity = $5,
                description = $6,
                status = $7,
                validated_by = $8,
                validated_at = $9,
                rejection_reason = $10,
                updated_at = $11
            WHERE id = $1
            ",
        )
        .bind(*reservation.id.as_uuid())
        .bind(*reservation.equipment_id.as_uuid())
        .bind(reservation.window.start())
        .bind(reservation.window.end())
        .bind(i64::from(reservation.quantity))
        .bind(&reservation.description)
        .bind(reservation.status.as_str())
        .bind(reservation.validated_by.map(|id| *id.as_uuid()))
        .bind(reservation.validated_at)
        .bind(&reservation.rejection_reason)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("update reservation"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, BookingError> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete reservation"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_overlapping(
        &self,
        equipment_id: EquipmentId,
        window: &TimeRange,
        active: &[ReservationStatus],
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, BookingError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE equipment_id = $1
              AND start_date < $3
              AND end_date > $2
              AND status = ANY($4)
              AND ($5::uuid IS NULL OR id <> $5)
            "
        ))
        .bind(*equipment_id.as_uuid())
        .bind(window.start())
        .bind(window.end())
        .bind(labels(active))
        .bind(exclude.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("query overlapping reservations"))?;
        convert_all(rows)
    }

    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, BookingError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r"
            SELECT {RESERVATION_COLUMNS} FROM reservations
            WHERE ($1::uuid IS NULL OR equipment_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR (start_date < $5 AND end_date > $4))
              AND ($6::timestamptz IS NULL OR created_at >= $6)
              AND ($7::timestamptz IS NULL OR created_at <= $7)
            ORDER BY created_at DESC, id
            "
        ))
        .bind(filter.equipment_id.map(|id| *id.as_uuid()))
        .bind(filter.user_id.map(|id| *id.as_uuid()))
        .bind(filter.status.map(ReservationStatus::as_str))
        .bind(filter.window.map(|w| w.start()))
        .bind(filter.window.map(|w| w.end()))
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list reservations"))?;
        convert_all(rows)
    }

    async fn count_by_status(&self) -> Result<ReservationStats, BookingError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM reservations GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("count reservations"))?;

        let mut stats = ReservationStats::tally(std::iter::empty());
        for (status, count) in rows {
            let status: ReservationStatus = status
                .parse()
                .map_err(|e| BookingError::Storage(format!("Corrupt status column: {e}")))?;
            let count = u64::try_from(count).unwrap_or(0);
            stats.by_status.insert(status, count);
            stats.total += count;
        }
        Ok(stats)
    }

    async fn ping(&self) -> Result<(), BookingError> {
        crate::ping(&self.pool).await
    }
}
