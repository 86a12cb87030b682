use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Slot, WorkingHours};

/// True when a non-cancelled appointment already holds exactly this
/// (doctor, date, time). Start times are compared as strings; a longer
/// appointment that overlaps a later start time is not a conflict.
pub fn check_conflict(
    conn: &Connection,
    doctor_id: i64,
    date: &NaiveDate,
    time: &str,
    exclude_id: Option<i64>,
) -> anyhow::Result<bool> {
    Ok(queries::find_conflicting_appointment(conn, doctor_id, date, time, exclude_id)?.is_some())
}

/// Bookable slots for the doctor on `date`, in time order.
///
/// Only scheduled and confirmed appointments take a slot. Taken slots are
/// left out rather than returned with `available: false`.
pub fn generate_slots(
    conn: &Connection,
    doctor_id: i64,
    date: &NaiveDate,
    hours: &WorkingHours,
) -> anyhow::Result<Vec<Slot>> {
    let booked = queries::booked_times(conn, doctor_id, date)?;
    Ok(free_slots(hours, &booked))
}

pub fn free_slots(hours: &WorkingHours, booked: &[String]) -> Vec<Slot> {
    let booked: HashSet<&str> = booked.iter().map(String::as_str).collect();

    hours
        .slot_times()
        .into_iter()
        .filter(|time| !booked.contains(time.as_str()))
        .map(|time| Slot {
            time,
            available: true,
        })
        .collect()
}
