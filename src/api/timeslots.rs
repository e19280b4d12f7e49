//! Time-slot administration client
//!
//! Client for the doctor-availability endpoints: list, create, and
//! delete slots. Creation is validated locally before any request, and
//! deletion of a booked slot is refused client-side — the server would
//! reject it anyway, with a detail message we surface verbatim.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::remote_error;
use crate::{Error, Result};

/// Wire format for slot times
const TIME_FORMAT: &str = "%H:%M";

/// A doctor-availability slot as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique identifier
    pub id: i64,
    /// Day of the slot
    pub date: NaiveDate,
    /// Start time, "HH:MM"
    pub start_time: String,
    /// End time, "HH:MM"
    pub end_time: String,
    /// Whether a patient has booked this slot
    pub is_booked: bool,
}

/// A slot to be created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeSlot {
    /// Day of the slot
    pub date: NaiveDate,
    /// Start time, "HH:MM"
    pub start_time: String,
    /// End time, "HH:MM"
    pub end_time: String,
}

impl NewTimeSlot {
    /// Validate the slot against a reference "now"
    ///
    /// Rules carried over from the admin form: the slot must start in
    /// the future, and the end time must be at least one hour after
    /// the start time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSlot` describing the first violated rule.
    pub fn validate_at(&self, now: NaiveDateTime) -> Result<()> {
        let start = parse_time(&self.start_time, "start time")?;
        let end = parse_time(&self.end_time, "end time")?;

        if end.signed_duration_since(start) < TimeDelta::hours(1) {
            return Err(Error::InvalidSlot(
                "end time must be at least one hour after the start time".to_string(),
            ));
        }

        if self.date.and_time(start) <= now {
            return Err(Error::InvalidSlot(
                "slot must start in the future".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_time(value: &str, what: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| Error::InvalidSlot(format!("bad {what} {value:?}: {e}")))
}

/// Client for the time-slot endpoints
#[derive(Debug, Clone)]
pub struct TimeSlotClient {
    client: Client,
    base_url: String,
}

impl TimeSlotClient {
    /// Create a client for a backend base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// List all availability slots
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is invalid
    pub async fn list(&self) -> Result<Vec<TimeSlot>> {
        let url = format!("{}/timeslots/", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let slots = response.json().await?;
        Ok(slots)
    }

    /// Create a new availability slot
    ///
    /// # Errors
    ///
    /// Returns `InvalidSlot` before any request when local validation
    /// fails, or a remote error from the backend.
    pub async fn create(&self, slot: &NewTimeSlot) -> Result<TimeSlot> {
        slot.validate_at(Local::now().naive_local())?;

        let url = format!("{}/timeslots/", self.base_url);
        let response = self.client.post(&url).json(slot).send().await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let created = response.json().await?;
        Ok(created)
    }

    /// Delete an availability slot
    ///
    /// # Errors
    ///
    /// Returns `SlotBooked` without issuing a request when the slot is
    /// already booked, or a remote error from the backend.
    pub async fn delete(&self, slot: &TimeSlot) -> Result<()> {
        if slot.is_booked {
            return Err(Error::SlotBooked);
        }

        let url = format!("{}/timeslots/{}/", self.base_url, slot.id);
        let response = self.client.delete(&url).send().await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        tracing::info!(id = slot.id, "slot deleted");
        Ok(())
    }
}
