//! Year-level dashboard aggregation. The shapes match the remote
//! analytics endpoint so a fetched payload and a locally computed one are
//! interchangeable.

use crate::error::AppError;
use crate::model::{Mode, Schedule, ScheduleStatus};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};
use tracing::warn;

pub const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub past: u32,
    pub current: u32,
    pub future: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub cancelled: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub not_started: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub online: u32,
    pub in_person: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableDays {
    pub month: String,
    pub total_days: u8,
    pub booked_days: u8,
    pub available: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearAnalytics {
    pub year: i32,
    pub status_breakdown: StatusBreakdown,
    pub progress: Progress,
    pub engagement: Engagement,
    pub monthly_booked: Vec<MonthCount>,
    pub daily_booked: Vec<DayCount>,
    pub available_days: Vec<AvailableDays>,
}

/// Aggregate one year of schedules. `month` selects the month for the
/// daily breakdown; `today` anchors the past/current/future split.
/// Records with unparseable timestamps are skipped with a warning.
pub fn compute_year(
    schedules: &[Schedule],
    year: i32,
    month: u8,
    today: Date,
) -> Result<YearAnalytics, AppError> {
    let mut parsed = Vec::new();
    for schedule in schedules {
        let start = match OffsetDateTime::parse(&schedule.start_time, &Rfc3339) {
            Ok(start) => start,
            Err(_) => {
                warn!(id = %schedule.id, "skipping schedule with malformed start_time");
                continue;
            }
        };
        let end = match OffsetDateTime::parse(&schedule.end_time, &Rfc3339) {
            Ok(end) => end,
            Err(_) => {
                warn!(id = %schedule.id, "skipping schedule with malformed end_time");
                continue;
            }
        };
        if start.year() == year {
            parsed.push((schedule, start.date(), end.date()));
        }
    }

    let mut breakdown = StatusBreakdown::default();
    for (_, start_date, end_date) in &parsed {
        if *end_date < today {
            breakdown.past += 1;
        } else if *start_date > today {
            breakdown.future += 1;
        } else {
            breakdown.current += 1;
        }
    }

    let mut progress = Progress::default();
    let mut engagement = Engagement::default();
    for (schedule, _, _) in &parsed {
        match schedule.status {
            ScheduleStatus::Cancelled => progress.cancelled += 1,
            ScheduleStatus::Completed => progress.completed += 1,
            ScheduleStatus::InProgress => progress.in_progress += 1,
            ScheduleStatus::NotStarted => progress.not_started += 1,
        }
        match schedule.mode {
            Mode::Online => engagement.online += 1,
            Mode::InPerson => engagement.in_person += 1,
        }
    }

    let mut monthly_booked = Vec::with_capacity(12);
    for (index, abbr) in MONTH_ABBR.iter().enumerate() {
        let month_number = index as u8 + 1;
        let count = parsed
            .iter()
            .filter(|(_, start_date, _)| u8::from(start_date.month()) == month_number)
            .count() as u32;
        monthly_booked.push(MonthCount { month: (*abbr).to_string(), count });
    }

    let mut daily: Vec<(String, u32)> = Vec::new();
    for (_, start_date, _) in &parsed {
        if u8::from(start_date.month()) != month {
            continue;
        }
        let label = format!(
            "{:04}-{:02}-{:02}",
            start_date.year(),
            u8::from(start_date.month()),
            start_date.day()
        );
        match daily.iter_mut().find(|(date, _)| *date == label) {
            Some((_, count)) => *count += 1,
            None => daily.push((label, 1)),
        }
    }
    daily.sort_by(|a, b| a.0.cmp(&b.0));
    let daily_booked = daily
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect();

    let mut available_days = Vec::with_capacity(12);
    for (index, abbr) in MONTH_ABBR.iter().enumerate() {
        let month_number = index as u8 + 1;
        let month_enum = Month::try_from(month_number)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let total_days = time::util::days_in_year_month(year, month_enum);
        let mut booked: Vec<u8> = Vec::new();
        for (_, start_date, _) in &parsed {
            if u8::from(start_date.month()) == month_number && !booked.contains(&start_date.day()) {
                booked.push(start_date.day());
            }
        }
        available_days.push(AvailableDays {
            month: (*abbr).to_string(),
            total_days,
            booked_days: booked.len() as u8,
            available: total_days - booked.len() as u8,
        });
    }

    Ok(YearAnalytics {
        year,
        status_breakdown: breakdown,
        progress,
        engagement,
        monthly_booked,
        daily_booked,
        available_days,
    })
}
