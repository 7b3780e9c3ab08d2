//! Row types and their conversion to domain records.

use chrono::{DateTime, Utc};
use equipment_booking_core::error::BookingError;
use equipment_booking_core::types::{
    Capacity, Equipment, EquipmentId, Reservation, ReservationId, TimeRange, UserId,
    WeeklySchedule,
};
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const EQUIPMENT_COLUMNS: &str = "id, name, photo, description, capacity_value, \
     capacity_unit, equipment_type, location, schedule, access_conditions, status, \
     created_at, updated_at";

pub(crate) const RESERVATION_COLUMNS: &str = "id, equipment_id, user_id, start_date, end_date, \
     quantity, description, status, validated_by, validated_at, rejection_reason, \
     created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EquipmentRow {
    id: Uuid,
    name: String,
    photo: Option<String>,
    description: String,
    capacity_value: i64,
    capacity_unit: String,
    equipment_type: String,
    location: String,
    schedule: Json<WeeklySchedule>,
    access_conditions: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: Uuid,
    equipment_id: Uuid,
    user_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    quantity: i64,
    description: Option<String>,
    status: String,
    validated_by: Option<Uuid>,
    validated_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn label<T>(column: &str, raw: &str) -> Result<T, BookingError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| BookingError::Storage(format!("Corrupt {column} column: {e}")))
}

fn amount(column: &str, raw: i64) -> Result<u32, BookingError> {
    u32::try_from(raw)
        .map_err(|_| BookingError::Storage(format!("Corrupt {column} column: {raw}")))
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = BookingError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EquipmentId::from_uuid(row.id),
            name: row.name,
            photo: row.photo,
            description: row.description,
            capacity: Capacity::new(
                amount("capacity_value", row.capacity_value)?,
                label("capacity_unit", &row.capacity_unit)?,
            ),
            equipment_type: label("equipment_type", &row.equipment_type)?,
            location: label("location", &row.location)?,
            schedule: row.schedule.0,
            access_conditions: row.access_conditions,
            status: label("status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = BookingError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReservationId::from_uuid(row.id),
            equipment_id: EquipmentId::from_uuid(row.equipment_id),
            user_id: UserId::from_uuid(row.user_id),
            window: TimeRange::new(row.start_date, row.end_date)?,
            quantity: amount("quantity", row.quantity)?,
            description: row.description,
            status: label("status", &row.status)?,
            validated_by: row.validated_by.map(UserId::from_uuid),
            validated_at: row.validated_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Converts a batch of rows, failing on the first corrupt one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, BookingError>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}

pub(crate) fn db_error(action: &str) -> impl Fn(sqlx::Error) -> BookingError + '_ {
    move |e| BookingError::Storage(format!("Failed to {action}: {e}"))
}
