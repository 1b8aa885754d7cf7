use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum TravelStatus {
    Pending,
    Approved,
    Rejected,
}

/// Inclusive number of days between two dates, `None` when `to` precedes `from`.
pub fn days_requested(from: NaiveDate, to: NaiveDate) -> Option<i32> {
    let span = (to - from).num_days();
    if span < 0 {
        return None;
    }
    i32::try_from(span + 1).ok()
}

/// The fields an employee fills in when submitting a request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TravelDraft {
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2024-01-05", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Dhaka")]
    pub from_location: String,
    #[schema(example = "Chittagong")]
    pub destination: String,
    #[schema(example = "Train")]
    pub mode_of_transport: String,
    #[schema(example = "Client workshop")]
    pub purpose_of_travel: String,
}

impl TravelDraft {
    /// Rejects blank text fields and reversed dates; returns the day count.
    pub fn validate(&self) -> Result<i32, AppError> {
        let fields = [
            ("fromLocation", &self.from_location),
            ("destination", &self.destination),
            ("modeOfTransport", &self.mode_of_transport),
            ("purposeOfTravel", &self.purpose_of_travel),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::ValidationFailed(format!("{name} is required")));
            }
        }

        days_requested(self.from_date, self.to_date).ok_or_else(|| {
            AppError::ValidationFailed("toDate cannot be before fromDate".to_string())
        })
    }
}

/// A request row before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewTravelRequest {
    pub employee_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub from_location: String,
    pub destination: String,
    pub mode_of_transport: String,
    pub purpose_of_travel: String,
    pub days_requested: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelRequest {
    pub id: u64,
    pub employee_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub from_location: String,
    pub destination: String,
    pub mode_of_transport: String,
    pub purpose_of_travel: String,
    pub status: TravelStatus,
    pub days_requested: i32,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelRequest {
    pub fn from_new(id: u64, new: NewTravelRequest) -> Self {
        Self {
            id,
            employee_id: new.employee_id,
            from_date: new.from_date,
            to_date: new.to_date,
            from_location: new.from_location,
            destination: new.destination,
            mode_of_transport: new.mode_of_transport,
            purpose_of_travel: new.purpose_of_travel,
            status: TravelStatus::Pending,
            days_requested: new.days_requested,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    pub fn approve(&mut self, manager_id: u64, now: DateTime<Utc>) -> Result<(), AppError> {
        self.decide(TravelStatus::Approved, manager_id, now)
    }

    pub fn reject(&mut self, manager_id: u64, reason: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        self.decide(TravelStatus::Rejected, manager_id, now)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    fn decide(&mut self, to: TravelStatus, manager_id: u64, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status != TravelStatus::Pending {
            return Err(AppError::AlreadyProcessed);
        }
        // approved_at may never precede created_at, even with a skewed clock
        let at = now.max(self.created_at);
        self.status = to;
        self.approved_by = Some(manager_id);
        self.approved_at = Some(at);
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending() -> TravelRequest {
        TravelRequest::from_new(
            1,
            NewTravelRequest {
                employee_id: 7,
                from_date: date(2024, 1, 1),
                to_date: date(2024, 1, 5),
                from_location: "Dhaka".into(),
                destination: "Sylhet".into(),
                mode_of_transport: "Bus".into(),
                purpose_of_travel: "Audit".into(),
                days_requested: 5,
                created_at: Utc::now(),
            },
        )
    }

    #[test]
    fn counts_days_inclusively() {
        assert_eq!(days_requested(date(2024, 1, 1), date(2024, 1, 5)), Some(5));
        assert_eq!(days_requested(date(2024, 1, 1), date(2024, 1, 1)), Some(1));
        assert_eq!(days_requested(date(2024, 2, 28), date(2024, 3, 1)), Some(3));
        assert_eq!(days_requested(date(2024, 1, 2), date(2024, 1, 1)), None);
    }

    #[test]
    fn draft_validation_rejects_blank_fields() {
        let draft = TravelDraft {
            from_date: date(2024, 1, 1),
            to_date: date(2024, 1, 2),
            from_location: "Dhaka".into(),
            destination: "   ".into(),
            mode_of_transport: "Air".into(),
            purpose_of_travel: "Conference".into(),
        };
        assert!(matches!(draft.validate(), Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn decided_requests_are_frozen() {
        let mut request = pending();
        request.approve(3, Utc::now()).unwrap();
        let snapshot = request.clone();

        assert!(matches!(request.approve(3, Utc::now()), Err(AppError::AlreadyProcessed)));
        assert!(matches!(request.reject(3, "late", Utc::now()), Err(AppError::AlreadyProcessed)));
        assert_eq!(request, snapshot);
    }

    #[test]
    fn reject_records_reason_and_decider() {
        let mut request = pending();
        request.reject(9, "budget freeze", Utc::now()).unwrap();

        assert_eq!(request.status, TravelStatus::Rejected);
        assert_eq!(request.approved_by, Some(9));
        assert_eq!(request.rejection_reason.as_deref(), Some("budget freeze"));
        assert!(request.approved_at.unwrap() >= request.created_at);
    }

    proptest! {
        #[test]
        fn day_count_matches_span(start in 0i64..20_000, len in 0i64..400) {
            let from = date(1990, 1, 1) + chrono::Duration::days(start);
            let to = from + chrono::Duration::days(len);
            prop_assert_eq!(days_requested(from, to), Some(len as i32 + 1));
        }
    }
}
