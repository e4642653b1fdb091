// src/workshops/validators.rs

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::models::*;
use crate::common::{format_timestamp, ApiError, ValidationResult, Validator};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const DEFAULT_PRICE: &str = "0.00";

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,8})(?:\.(\d{1,2}))?$").expect("price pattern is valid"))
}

/// Normalize a price to two fractional digits
///
/// Returns `None` for negatives, more than two decimals or anything that
/// is not a plain decimal number.
pub fn normalize_price(input: &PriceInput) -> Option<String> {
    let raw = match input {
        PriceInput::Text(s) => s.trim().to_string(),
        PriceInput::Number(n) => n.to_string(),
    };

    let caps = price_pattern().captures(&raw)?;
    let whole: u64 = caps.get(1)?.as_str().parse().ok()?;
    let cents = match caps.get(2).map(|m| m.as_str()) {
        None => "00".to_string(),
        Some(frac) if frac.len() == 1 => format!("{}0", frac),
        Some(frac) => frac.to_string(),
    };

    Some(format!("{}.{}", whole, cents))
}

/// Parse a client start time into UTC
pub fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// Workshop Validators
// ============================================================================

pub struct WorkshopValidator;

impl Validator<CreateWorkshop> for WorkshopValidator {
    fn validate(&self, data: &CreateWorkshop) -> ValidationResult {
        let mut result = ValidationResult::new();

        let title = data.title.trim();
        if title.is_empty() {
            result.add_error("title", "Title is required");
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            result.add_error("title", "Title must be at most 200 characters");
        }

        if parse_start_time(&data.start_time).is_none() {
            result.add_error("start_time", "Start time must be an ISO 8601 timestamp");
        }

        if data.duration_minutes < 1 {
            result.add_error("duration_minutes", "Duration must be at least 1 minute");
        }

        if data.max_participants < 1 {
            result.add_error("max_participants", "Max participants must be at least 1");
        }

        if let Some(price) = &data.price {
            if normalize_price(price).is_none() {
                result.add_error(
                    "price",
                    "Price must be a non-negative amount with at most 2 decimal places",
                );
            }
        }

        result
    }
}

impl TryFrom<CreateWorkshop> for NewWorkshop {
    type Error = ApiError;

    fn try_from(request: CreateWorkshop) -> Result<Self, Self::Error> {
        WorkshopValidator.validate(&request).into_result()?;

        let start_time = parse_start_time(&request.start_time)
            .ok_or_else(|| ApiError::ValidationError("start_time: invalid timestamp".to_string()))?;
        let price = match &request.price {
            Some(price) => normalize_price(price)
                .ok_or_else(|| ApiError::ValidationError("price: invalid amount".to_string()))?,
            None => DEFAULT_PRICE.to_string(),
        };

        Ok(NewWorkshop {
            title: request.title.trim().to_string(),
            description: request.description.unwrap_or_default().trim().to_string(),
            start_time: format_timestamp(start_time),
            duration_minutes: request.duration_minutes,
            price,
            max_participants: request.max_participants,
        })
    }
}
