use crate::analytics::{self, YearAnalytics};
use crate::config::Config;
use crate::error::AppError;
use crate::model::{Mode, Schedule, ScheduleStatus};
use crate::parser::{ParsedCommand, REMINDER_OPTIONS};
use crate::remote;
use crate::storage::json_store;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};
use tracing::warn;

/// Fields required to create a schedule. Validation happens in
/// `create_schedule`, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDraft {
    pub task_name: String,
    pub start_time: String,
    pub end_time: String,
    pub status: ScheduleStatus,
    pub mode: Mode,
    pub reminder_minutes: u32,
    pub ringtone_id: Option<u8>,
}

/// Partial update; `None` fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleChanges {
    pub task_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<ScheduleStatus>,
    pub mode: Option<Mode>,
    pub reminder_minutes: Option<u32>,
    pub ringtone_id: Option<u8>,
}

pub fn create_schedule(draft: ScheduleDraft) -> Result<Schedule, AppError> {
    let path = json_store::store_path()?;
    if let Some(client) = remote::client_from_env() {
        let candidate = build_schedule(&draft)?;
        match client.create(&candidate) {
            Ok(created) => return Ok(created),
            Err(err) => warn!("remote create failed, using local store: {err}"),
        }
    }
    create_schedule_with_path(&path, draft)
}

pub fn list_month(year: i32, month: u8) -> Result<Vec<Schedule>, AppError> {
    let path = json_store::store_path()?;
    if let Some(client) = remote::client_from_env() {
        match client.list(year, month) {
            Ok(schedules) => return Ok(schedules),
            Err(err) => warn!("remote list failed, using local store: {err}"),
        }
    }
    list_month_with_path(&path, year, month)
}

pub fn get_schedule(id: &str) -> Result<Schedule, AppError> {
    if let Some(client) = remote::client_from_env() {
        match client.get(id.trim()) {
            Ok(schedule) => return Ok(schedule),
            Err(err) => warn!("remote get failed, using local store: {err}"),
        }
    }
    let path = json_store::store_path()?;
    get_schedule_with_path(&path, id)
}

pub fn update_schedule(id: &str, changes: ScheduleChanges) -> Result<Schedule, AppError> {
    if let Some(client) = remote::client_from_env() {
        match remote_update(&client, id.trim(), changes.clone()) {
            Ok(updated) => return Ok(updated),
            // validation errors are terminal, only transport failures
            // fall back to the local store
            Err(AppError::Remote(err)) => {
                warn!("remote update failed, using local store: {err}")
            }
            Err(err) => return Err(err),
        }
    }
    let path = json_store::store_path()?;
    update_schedule_with_path(&path, id, changes)
}

fn remote_update(
    client: &remote::RemoteClient,
    id: &str,
    changes: ScheduleChanges,
) -> Result<Schedule, AppError> {
    let mut schedule = client.get(id)?;
    apply_changes(&mut schedule, changes)?;
    client.update(id, &schedule)
}

pub fn set_status(id: &str, status: ScheduleStatus) -> Result<Schedule, AppError> {
    update_schedule(
        id,
        ScheduleChanges {
            status: Some(status),
            ..ScheduleChanges::default()
        },
    )
}

pub fn delete_schedule(id: &str) -> Result<Schedule, AppError> {
    if let Some(client) = remote::client_from_env() {
        match remote_delete(&client, id.trim()) {
            Ok(removed) => return Ok(removed),
            Err(err) => warn!("remote delete failed, using local store: {err}"),
        }
    }
    let path = json_store::store_path()?;
    delete_schedule_with_path(&path, id)
}

fn remote_delete(client: &remote::RemoteClient, id: &str) -> Result<Schedule, AppError> {
    let removed = client.get(id)?;
    client.delete(id)?;
    Ok(removed)
}

pub fn fetch_analytics(year: i32, month: u8) -> Result<YearAnalytics, AppError> {
    if let Some(client) = remote::client_from_env() {
        match client.analytics(year, month) {
            Ok(payload) => return Ok(payload),
            Err(err) => warn!("remote analytics failed, computing locally: {err}"),
        }
    }
    let path = json_store::store_path()?;
    let schedules = json_store::load_schedules(&path)?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset()).date();
    analytics::compute_year(&schedules, year, month, today)
}

/// Turn a parsed utterance into a creatable draft, anchored on the given
/// date. Missing end time defaults to one hour after start; unset
/// reminder and ringtone fall back to the configured defaults.
pub fn draft_from_command(
    command: &ParsedCommand,
    date: Date,
    offset: UtcOffset,
    config: &Config,
) -> Result<ScheduleDraft, AppError> {
    let start_raw = command
        .start_time
        .as_deref()
        .ok_or_else(|| AppError::invalid_input("utterance has no start time"))?;
    let start = clock_time(start_raw)?;
    let start_odt = date.with_time(start).assume_offset(offset);

    let end_odt = match command.end_time.as_deref() {
        Some(end_raw) => {
            let end = clock_time(end_raw)?;
            let end_odt = date.with_time(end).assume_offset(offset);
            if end_odt <= start_odt {
                return Err(AppError::invalid_input("end time is not after start time"));
            }
            end_odt
        }
        None => start_odt + Duration::hours(1),
    };

    Ok(ScheduleDraft {
        task_name: command.task_name.clone(),
        start_time: format_rfc3339(start_odt)?,
        end_time: format_rfc3339(end_odt)?,
        status: ScheduleStatus::NotStarted,
        mode: command.mode,
        reminder_minutes: command.reminder_minutes.unwrap_or_else(|| config.reminder_minutes()),
        ringtone_id: command.ringtone_id.or(config.default_ringtone_id),
    })
}

pub fn create_schedule_with_path(path: &Path, draft: ScheduleDraft) -> Result<Schedule, AppError> {
    let schedule = build_schedule(&draft)?;
    let mut schedules = json_store::load_schedules(path)?;
    schedules.push(schedule.clone());
    json_store::save_schedules(path, &schedules)?;
    Ok(schedule)
}

pub fn list_month_with_path(path: &Path, year: i32, month: u8) -> Result<Vec<Schedule>, AppError> {
    let schedules = json_store::load_schedules(path)?;
    let offset = local_offset();
    let mut filtered = Vec::new();
    for schedule in schedules {
        let start = parse_timestamp(&schedule.start_time, "start_time")?.to_offset(offset);
        if start.year() == year && u8::from(start.month()) == month {
            filtered.push((start, schedule));
        }
    }
    filtered.sort_by_key(|(start, _)| *start);
    Ok(filtered.into_iter().map(|(_, schedule)| schedule).collect())
}

pub fn get_schedule_with_path(path: &Path, id: &str) -> Result<Schedule, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    let schedules = json_store::load_schedules(path)?;
    schedules
        .into_iter()
        .find(|schedule| schedule.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("schedule not found"))
}

pub fn update_schedule_with_path(
    path: &Path,
    id: &str,
    changes: ScheduleChanges,
) -> Result<Schedule, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    let mut schedules = json_store::load_schedules(path)?;
    let mut updated_schedule = None;

    for schedule in &mut schedules {
        if schedule.id == trimmed_id {
            apply_changes(schedule, changes)?;
            updated_schedule = Some(schedule.clone());
            break;
        }
    }

    let updated = updated_schedule.ok_or_else(|| AppError::invalid_input("schedule not found"))?;
    json_store::save_schedules(path, &schedules)?;
    Ok(updated)
}

/// Merge a partial update into a schedule, re-validate the result and
/// stamp `updated_at`.
fn apply_changes(schedule: &mut Schedule, changes: ScheduleChanges) -> Result<(), AppError> {
    if let Some(task_name) = changes.task_name {
        let trimmed = task_name.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("task_name is required"));
        }
        schedule.task_name = trimmed.to_string();
    }
    if let Some(start_time) = changes.start_time {
        schedule.start_time = normalize_timestamp(&start_time, "start_time")?;
    }
    if let Some(end_time) = changes.end_time {
        schedule.end_time = normalize_timestamp(&end_time, "end_time")?;
    }
    if let Some(status) = changes.status {
        schedule.status = status;
    }
    if let Some(mode) = changes.mode {
        schedule.mode = mode;
    }
    if let Some(reminder_minutes) = changes.reminder_minutes {
        validate_reminder(reminder_minutes)?;
        schedule.reminder_minutes = reminder_minutes;
    }
    if let Some(ringtone_id) = changes.ringtone_id {
        schedule.ringtone_id = Some(ringtone_id);
    }
    validate_window(&schedule.start_time, &schedule.end_time)?;
    schedule.updated_at = Some(now_rfc3339()?);
    Ok(())
}

pub fn delete_schedule_with_path(path: &Path, id: &str) -> Result<Schedule, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    let mut schedules = json_store::load_schedules(path)?;
    let index = schedules
        .iter()
        .position(|schedule| schedule.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("schedule not found"))?;

    let removed = schedules.remove(index);
    json_store::save_schedules(path, &schedules)?;
    Ok(removed)
}

fn build_schedule(draft: &ScheduleDraft) -> Result<Schedule, AppError> {
    let task_name = match draft.task_name.trim() {
        "" => crate::parser::DEFAULT_TASK_NAME.to_string(),
        trimmed => trimmed.to_string(),
    };
    let start_time = normalize_timestamp(&draft.start_time, "start_time")?;
    let end_time = normalize_timestamp(&draft.end_time, "end_time")?;
    validate_window(&start_time, &end_time)?;
    validate_reminder(draft.reminder_minutes)?;

    let created_at = now_rfc3339()?;
    let id = format!("sched-{}", OffsetDateTime::now_utc().unix_timestamp_nanos());

    Ok(Schedule {
        id,
        task_name,
        start_time,
        end_time,
        status: draft.status,
        mode: draft.mode,
        reminder_minutes: draft.reminder_minutes,
        ringtone_id: draft.ringtone_id,
        created_at,
        updated_at: None,
    })
}

fn clock_time(raw: &str) -> Result<Time, AppError> {
    let (hours, minutes) = raw
        .split_once(':')
        .ok_or_else(|| AppError::invalid_input("time must be HH:MM"))?;
    let hours: u8 = hours
        .parse()
        .map_err(|_| AppError::invalid_input("time must be HH:MM"))?;
    let minutes: u8 = minutes
        .parse()
        .map_err(|_| AppError::invalid_input("time must be HH:MM"))?;
    Time::from_hms(hours, minutes, 0)
        .map_err(|_| AppError::invalid_input("time of day out of range"))
}

fn parse_timestamp(raw: &str, field: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|_| AppError::invalid_input(format!("{field} must be RFC3339")))
}

fn normalize_timestamp(raw: &str, field: &str) -> Result<String, AppError> {
    let parsed = parse_timestamp(raw.trim(), field)?;
    format_rfc3339(parsed)
}

fn validate_window(start_time: &str, end_time: &str) -> Result<(), AppError> {
    let start = parse_timestamp(start_time, "start_time")?;
    let end = parse_timestamp(end_time, "end_time")?;
    if start >= end {
        return Err(AppError::invalid_input("start_time must be before end_time"));
    }
    Ok(())
}

fn validate_reminder(minutes: u32) -> Result<(), AppError> {
    if minutes != 0 && !REMINDER_OPTIONS.contains(&minutes) {
        return Err(AppError::invalid_input(format!(
            "reminder_minutes must be 0 or one of {REMINDER_OPTIONS:?}"
        )));
    }
    Ok(())
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn format_rfc3339(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
