//! `PostgreSQL` equipment catalog.

use crate::rows::{EQUIPMENT_COLUMNS, EquipmentRow, convert_all, db_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use equipment_booking_core::catalog::{EquipmentCatalog, EquipmentFilter};
use equipment_booking_core::error::BookingError;
use equipment_booking_core::types::{Equipment, EquipmentId, EquipmentStatus};
use sqlx::PgPool;
use sqlx::types::Json;

/// Equipment records in the `equipment` table.
#[derive(Clone, Debug)]
pub struct PostgresEquipmentCatalog {
    pool: PgPool,
}

impl PostgresEquipmentCatalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentCatalog for PostgresEquipmentCatalog {
    async fn insert(&self, equipment: Equipment) -> Result<(), BookingError> {
        sqlx::query(
            r"
            INSERT INTO equipment
                (id, name, photo, description, capacity_value, capacity_unit,
                 equipment_type, location, schedule, access_conditions, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(*equipment.id.as_uuid())
        .bind(&equipment.name)
        .bind(&equipment.photo)
        .bind(&equipment.description)
        .bind(i64::from(equipment.capacity.value))
        .bind(equipment.capacity.unit.as_str())
        .bind(equipment.equipment_type.as_str())
        .bind(equipment.location.as_str())
        .bind(Json(&equipment.schedule))
        .bind(&equipment.access_conditions)
        .bind(equipment.status.as_str())
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert equipment"))?;
        Ok(())
    }

    async fn get(&self, id: EquipmentId) -> Result<Option<Equipment>, BookingError> {
        let row = sqlx::query_as::<_, EquipmentRow>(&format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get equipment"))?;
        row.map(Equipment::try_from).transpose()
    }

    async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BookingError> {
        let rows = sqlx::query_as::<_, EquipmentRow>(&format!(
            r"
            SELECT {EQUIPMENT_COLUMNS} FROM equipment
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR location = $2)
              AND ($3::text IS NULL OR equipment_type = $3)
            ORDER BY name, id
            "
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.location.map(|l| l.as_str()))
        .bind(filter.equipment_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list equipment"))?;
        convert_all(rows)
    }

    async fn update(&self, equipment: Equipment) -> Result<bool, BookingError> {
        let result = sqlx::query(
            r"
            UPDATE equipment
            SET name = $2,
                photo = $3,
                description = $4,
                capacity_value = $5,
                capacity_unit = $6,
                equipment_type = $7,
                location = $8,
                schedule = $9,
                access_conditions = $10,
                status = $11,
                updated_at = $12
            WHERE id = $1
            ",
        )
        .bind(*equipment.id.as_uuid())
        .bind(&equipment.name)
        .bind(&equipment.photo)
        .bind(&equipment.description)
        .bind(i64::from(equipment.capacity.value))
        .bind(equipment.capacity.unit.as_str())
        .bind(equipment.equipment_type.as_str())
        .bind(equipment.location.as_str())
        .bind(Json(&equipment.schedule))
        .bind(&equipment.access_conditions)
        .bind(equipment.status.as_str())
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("update equipment"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(
        &self,
        id: EquipmentId,
        status: EquipmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let result = sqlx::query("UPDATE equipment SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(status.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error("set equipment status"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: EquipmentId) -> Result<bool, BookingError> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete equipment"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), BookingError> {
        crate::ping(&self.pool).await
    }
}
