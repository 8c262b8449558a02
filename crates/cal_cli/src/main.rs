mod cli;

use crate::cli::{Cli, Command, ConfigOverrideTarget};
use cal_core::analytics::YearAnalytics;
use cal_core::config::{self, Config, ConfigOverrides, Palette};
use cal_core::error::AppError;
use cal_core::model::{Mode, Schedule, ScheduleStatus};
use cal_core::parser::{self, ParsedCommand};
use cal_core::reminder::{FiredReminder, ReminderScheduler};
use cal_core::ringtones::{self, RINGTONES};
use cal_core::schedule_api::{self, ScheduleChanges, ScheduleDraft};
use cal_core::storage::JsonStore;
use cal_core::transcript::{SpeechError, TranscriptSession};
use clap::Parser;
use std::io::{self, BufRead, IsTerminal};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::warn;

const DATETIME_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATETIME_MINUTES: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const DATE_ONLY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

/// Accept RFC3339, "YYYY-MM-DD HH:MM[:SS]" or a bare date (midnight);
/// naive forms are taken in the local offset. Returns RFC3339.
fn parse_cli_datetime(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();

    let parsed = if let Ok(with_offset) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        with_offset
    } else if let Ok(naive) = PrimitiveDateTime::parse(trimmed, DATETIME_SECONDS) {
        naive.assume_offset(local_offset())
    } else if let Ok(naive) = PrimitiveDateTime::parse(trimmed, DATETIME_MINUTES) {
        naive.assume_offset(local_offset())
    } else if let Ok(date) = Date::parse(trimmed, DATE_ONLY) {
        date.midnight().assume_offset(local_offset())
    } else {
        return Err(AppError::invalid_input(format!(
            "unrecognized datetime '{trimmed}', use \"YYYY-MM-DD HH:MM\" or RFC3339"
        )));
    };

    parsed
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn parse_cli_date(raw: Option<&str>) -> Result<Date, AppError> {
    match raw {
        Some(value) => Date::parse(value.trim(), DATE_ONLY)
            .map_err(|_| AppError::invalid_input("date must be YYYY-MM-DD")),
        None => Ok(local_now().date()),
    }
}

/// Stored timestamps are RFC3339; render them in local time for humans.
fn display_time(raw: &str) -> String {
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|parsed| parsed.to_offset(local_offset()).format(DATETIME_MINUTES).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn mode_from_arg(raw: &str) -> Result<Mode, AppError> {
    Mode::from_arg(raw)
        .ok_or_else(|| AppError::invalid_input(format!("unknown mode '{raw}', use online or in-person")))
}

fn status_from_arg(raw: &str) -> Result<ScheduleStatus, AppError> {
    ScheduleStatus::from_arg(raw).ok_or_else(|| {
        AppError::invalid_input(format!(
            "unknown status '{raw}', use not-started, in-progress, completed or cancelled"
        ))
    })
}

fn effective_config(cli: &Cli) -> Result<Config, AppError> {
    let load = config::load_config_with_fallback();
    if let Some(err) = load.error {
        warn!("config unusable, falling back to defaults: {err}");
    }

    let mut overrides = ConfigOverrides::default();
    for raw in &cli.config_override {
        let parsed = cli::parse_config_override(raw).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::ReminderMinutes => {
                let minutes: u32 = parsed
                    .value
                    .parse()
                    .map_err(|_| AppError::invalid_input("reminder override must be a number"))?;
                overrides.default_reminder_minutes = Some(minutes);
            }
            ConfigOverrideTarget::RingtoneId => {
                let id: u8 = parsed
                    .value
                    .parse()
                    .map_err(|_| AppError::invalid_input("ringtone override must be a tone id"))?;
                overrides.default_ringtone_id = Some(id);
            }
        }
    }

    Ok(config::merge_overrides(&load.config, &overrides))
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Mode")]
    mode: &'static str,
    #[tabled(rename = "Reminder")]
    reminder: String,
    #[tabled(rename = "Tone")]
    tone: String,
}

impl ScheduleRow {
    fn from_schedule(schedule: &Schedule) -> Self {
        let reminder = if schedule.reminder_minutes == 0 {
            "-".to_string()
        } else {
            format!("{} min", schedule.reminder_minutes)
        };
        let tone = match schedule.ringtone_id {
            Some(id) => ringtones::ringtone_by_id(id).name.to_string(),
            None => "-".to_string(),
        };
        Self {
            id: schedule.id.clone(),
            task: schedule.task_name.clone(),
            start: display_time(&schedule.start_time),
            end: display_time(&schedule.end_time),
            status: schedule.status.label(),
            mode: schedule.mode.label(),
            reminder,
            tone,
        }
    }
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: u32,
}

#[derive(Tabled)]
struct MonthRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Booked")]
    count: u32,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Booked")]
    count: u32,
}

#[derive(Tabled)]
struct AvailabilityRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Days")]
    total_days: u8,
    #[tabled(rename = "Booked")]
    booked_days: u8,
    #[tabled(rename = "Available")]
    available: u8,
}

fn render_rows<R: Tabled>(rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

fn print_schedules_plain(schedules: &[Schedule]) {
    if schedules.is_empty() {
        println!("No schedules.");
        return;
    }
    let rows: Vec<ScheduleRow> = schedules.iter().map(ScheduleRow::from_schedule).collect();
    println!("{}", render_rows(rows));
}

fn print_schedule_detail(schedule: &Schedule, palette: &Palette) {
    println!("{} {}", palette.mutedize("ID:"), schedule.id);
    println!("{} {}", palette.mutedize("Task:"), palette.accentize(&schedule.task_name));
    println!("{} {}", palette.mutedize("Start:"), display_time(&schedule.start_time));
    println!("{} {}", palette.mutedize("End:"), display_time(&schedule.end_time));
    println!("{} {}", palette.mutedize("Status:"), schedule.status.label());
    println!("{} {}", palette.mutedize("Mode:"), schedule.mode.label());
    if schedule.reminder_minutes == 0 {
        println!("{} none", palette.mutedize("Reminder:"));
    } else {
        println!("{} {} min before", palette.mutedize("Reminder:"), schedule.reminder_minutes);
    }
    if let Some(id) = schedule.ringtone_id {
        println!("{} {} ({})", palette.mutedize("Tone:"), ringtones::ringtone_by_id(id).name, id);
    }
    println!("{} {}", palette.mutedize("Created:"), display_time(&schedule.created_at));
    if let Some(updated_at) = schedule.updated_at.as_deref() {
        println!("{} {}", palette.mutedize("Updated:"), display_time(updated_at));
    }
}

fn print_schedule_json(schedule: &Schedule) -> Result<(), AppError> {
    let json = serde_json::to_string(schedule)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn print_parsed_plain(parsed: &ParsedCommand, palette: &Palette) {
    let start = parsed.start_time.as_deref().unwrap_or("-");
    let end = parsed.end_time.as_deref().unwrap_or("-");
    let reminder = match parsed.reminder_minutes {
        Some(minutes) => format!("{minutes} min"),
        None => "-".to_string(),
    };
    let tone = match parsed.ringtone_id {
        Some(id) => ringtones::ringtone_by_id(id).name.to_string(),
        None => "-".to_string(),
    };
    println!(
        "Parsed: {} | {} to {} | {} | reminder {} | tone {}",
        palette.accentize(&parsed.task_name),
        start,
        end,
        parsed.mode.label(),
        reminder,
        tone
    );
}

fn print_analytics_plain(analytics: &YearAnalytics, month: u8, palette: &Palette) {
    println!("{}", palette.accentize(&format!("Schedules in {}", analytics.year)));
    println!(
        "{}",
        render_rows(vec![
            CountRow { metric: "Past", count: analytics.status_breakdown.past },
            CountRow { metric: "Current", count: analytics.status_breakdown.current },
            CountRow { metric: "Future", count: analytics.status_breakdown.future },
        ])
    );

    println!("{}", palette.accentize("Progress"));
    println!(
        "{}",
        render_rows(vec![
            CountRow { metric: "Not Started", count: analytics.progress.not_started },
            CountRow { metric: "In Progress", count: analytics.progress.in_progress },
            CountRow { metric: "Completed", count: analytics.progress.completed },
            CountRow { metric: "Cancelled", count: analytics.progress.cancelled },
        ])
    );

    println!("{}", palette.accentize("Engagement"));
    println!(
        "{}",
        render_rows(vec![
            CountRow { metric: "Online", count: analytics.engagement.online },
            CountRow { metric: "In-Person", count: analytics.engagement.in_person },
        ])
    );

    println!("{}", palette.accentize("Monthly bookings"));
    let month_rows: Vec<MonthRow> = analytics
        .monthly_booked
        .iter()
        .map(|entry| MonthRow { month: entry.month.clone(), count: entry.count })
        .collect();
    println!("{}", render_rows(month_rows));

    println!("{}", palette.accentize("Availability"));
    let availability_rows: Vec<AvailabilityRow> = analytics
        .available_days
        .iter()
        .map(|entry| AvailabilityRow {
            month: entry.month.clone(),
            total_days: entry.total_days,
            booked_days: entry.booked_days,
            available: entry.available,
        })
        .collect();
    println!("{}", render_rows(availability_rows));

    println!("{}", palette.accentize(&format!("Daily bookings, month {month}")));
    if analytics.daily_booked.is_empty() {
        println!("No bookings.");
    } else {
        let day_rows: Vec<DayRow> = analytics
            .daily_booked
            .iter()
            .map(|entry| DayRow { date: entry.date.clone(), count: entry.count })
            .collect();
        println!("{}", render_rows(day_rows));
    }
}

fn print_fired_plain(fired: &[FiredReminder]) {
    if fired.is_empty() {
        println!("No reminders due.");
        return;
    }
    for reminder in fired {
        println!("Fired reminder: {} ({})", reminder.task_name, reminder.schedule_id);
    }
}

/// Create from a parsed utterance; shared by `say` and `dictate`.
fn create_from_utterance(
    text: &str,
    date: Option<&str>,
    config: &Config,
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    let parsed = parser::parse_command(text)
        .ok_or_else(|| AppError::invalid_input("text is required"))?;
    let date = parse_cli_date(date)?;
    let draft = schedule_api::draft_from_command(&parsed, date, local_offset(), config)?;
    let schedule = schedule_api::create_schedule(draft)?;

    if json {
        let json = serde_json::json!({ "parsed": parsed, "schedule": schedule });
        println!("{json}");
    } else {
        print_parsed_plain(&parsed, palette);
        println!(
            "Added schedule: {} ({})",
            palette.accentize(&schedule.task_name),
            schedule.id
        );
    }
    Ok(())
}

fn read_transcript_from_stdin(palette: &Palette) -> Result<String, AppError> {
    let mut session = TranscriptSession::new();
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdin_lock = stdin.lock();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes = stdin_lock
            .read_line(&mut line)
            .map_err(|err| AppError::io(err.to_string()))?;
        if bytes == 0 {
            break;
        }
        let segment = line.trim();
        if segment.is_empty() {
            break;
        }
        session.push_segment(true, segment);
        if interactive
            && let Some(parsed) = parser::parse_command(&session.snapshot())
        {
            print_parsed_plain(&parsed, palette);
        }
    }

    if session.is_empty() {
        return Err(AppError::invalid_input(SpeechError::NoSpeech.user_message()));
    }
    Ok(session.snapshot())
}

fn wait_for_stdin_close() -> Result<(), AppError> {
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = stdin_lock
            .read_line(&mut line)
            .map_err(|err| AppError::io(err.to_string()))?;
        if bytes == 0 {
            return Ok(());
        }
    }
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let config = effective_config(&cli)?;
    let palette = config::palette_for_theme(config.theme.as_deref());

    match cli.command {
        Command::Add { task_name, start, end, mode, reminder, ringtone } => {
            let start_time = parse_cli_datetime(&start)?;
            let end_time = match end {
                Some(raw) => parse_cli_datetime(&raw)?,
                None => {
                    let start_parsed = OffsetDateTime::parse(&start_time, &Rfc3339)
                        .map_err(|err| AppError::invalid_data(err.to_string()))?;
                    (start_parsed + Duration::hours(1))
                        .format(&Rfc3339)
                        .map_err(|err| AppError::invalid_data(err.to_string()))?
                }
            };
            let mode = match mode.as_deref() {
                Some(raw) => mode_from_arg(raw)?,
                None => Mode::Online,
            };

            let schedule = schedule_api::create_schedule(ScheduleDraft {
                task_name: task_name.unwrap_or_default(),
                start_time,
                end_time,
                status: ScheduleStatus::NotStarted,
                mode,
                reminder_minutes: reminder.unwrap_or_else(|| config.reminder_minutes()),
                ringtone_id: ringtone.or(config.default_ringtone_id),
            })?;

            if cli.json {
                print_schedule_json(&schedule)?;
            } else {
                println!(
                    "Added schedule: {} ({})",
                    palette.accentize(&schedule.task_name),
                    schedule.id
                );
            }
        }
        Command::Say { text, date } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };
            create_from_utterance(&text, date.as_deref(), &config, cli.json, &palette)?;
        }
        Command::Dictate { date } => {
            if io::stdin().is_terminal() {
                println!("Speak, one segment per line; finish with a blank line:");
            }
            let transcript = read_transcript_from_stdin(&palette)?;
            create_from_utterance(&transcript, date.as_deref(), &config, cli.json, &palette)?;
        }
        Command::List { year, month } => {
            let now = local_now();
            let year = year.unwrap_or_else(|| now.year());
            let month = month.unwrap_or_else(|| u8::from(now.month()));
            let schedules = schedule_api::list_month(year, month)?;
            if cli.json {
                let json = serde_json::to_string(&schedules)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                println!("{json}");
            } else {
                print_schedules_plain(&schedules);
            }
        }
        Command::Show { id } => {
            let schedule = schedule_api::get_schedule(&id)?;
            if cli.json {
                print_schedule_json(&schedule)?;
            } else {
                print_schedule_detail(&schedule, &palette);
            }
        }
        Command::Edit { id, task, start, end, mode, reminder, ringtone, status } => {
            if task.is_none()
                && start.is_none()
                && end.is_none()
                && mode.is_none()
                && reminder.is_none()
                && ringtone.is_none()
                && status.is_none()
            {
                return Err(AppError::invalid_input("nothing to change"));
            }

            let changes = ScheduleChanges {
                task_name: task,
                start_time: start.as_deref().map(parse_cli_datetime).transpose()?,
                end_time: end.as_deref().map(parse_cli_datetime).transpose()?,
                status: status.as_deref().map(status_from_arg).transpose()?,
                mode: mode.as_deref().map(mode_from_arg).transpose()?,
                reminder_minutes: reminder,
                ringtone_id: ringtone,
            };
            let schedule = schedule_api::update_schedule(&id, changes)?;
            if cli.json {
                print_schedule_json(&schedule)?;
            } else {
                println!(
                    "Updated schedule: {} ({})",
                    palette.accentize(&schedule.task_name),
                    schedule.id
                );
            }
        }
        Command::Status { id, status } => {
            let status = status_from_arg(&status)?;
            let schedule = schedule_api::set_status(&id, status)?;
            if cli.json {
                print_schedule_json(&schedule)?;
            } else {
                println!(
                    "Marked {} as {} ({})",
                    palette.accentize(&schedule.task_name),
                    schedule.status.label(),
                    schedule.id
                );
            }
        }
        Command::Delete { id } => {
            let schedule = schedule_api::delete_schedule(&id)?;
            if cli.json {
                print_schedule_json(&schedule)?;
            } else {
                println!(
                    "Deleted schedule: {} ({})",
                    palette.accentize(&schedule.task_name),
                    schedule.id
                );
            }
        }
        Command::Analytics { year, month } => {
            let now = local_now();
            let year = year.unwrap_or_else(|| now.year());
            let month = month.unwrap_or_else(|| u8::from(now.month()));
            let analytics = schedule_api::fetch_analytics(year, month)?;
            if cli.json {
                let json = serde_json::to_string(&analytics)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                println!("{json}");
            } else {
                print_analytics_plain(&analytics, month, &palette);
            }
        }
        Command::Ringtones => {
            if cli.json {
                let payload: Vec<serde_json::Value> = RINGTONES
                    .iter()
                    .map(|tone| {
                        serde_json::json!({
                            "id": tone.id,
                            "name": tone.name,
                            "tempo_ms": tone.tempo_ms,
                            "notes": tone.notes.len(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else {
                for tone in &RINGTONES {
                    println!(
                        "{:>2}  {}  ({} notes, {} ms each)",
                        tone.id,
                        palette.accentize(tone.name),
                        tone.notes.len(),
                        tone.tempo_ms
                    );
                }
            }
        }
        Command::Play { tone_id, repeat } => {
            let tone = ringtones::ringtone_by_id(tone_id);
            let player = ringtones::player_from_env();
            let handle = player.play(tone.id, repeat)?;
            while !handle.is_stopped() {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            if !cli.json {
                println!("Played tone: {} ({})", palette.accentize(tone.name), tone.id);
            }
        }
        Command::Watch { once } => {
            let store = JsonStore::from_env()?;
            let notifier = cal_core::notify::notifier_from_env()?;
            let alarm = ringtones::player_from_env();
            let scheduler = ReminderScheduler::new(store, notifier, alarm);

            if once {
                let fired = scheduler.check_now()?;
                if cli.json {
                    let payload: Vec<serde_json::Value> = fired
                        .iter()
                        .map(|reminder| {
                            serde_json::json!({
                                "schedule_id": reminder.schedule_id,
                                "task_name": reminder.task_name,
                                "occurrence_key": reminder.occurrence_key,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::Value::Array(payload));
                } else {
                    print_fired_plain(&fired);
                }
            } else {
                let handle = cal_core::reminder::spawn(scheduler);
                if !cli.json {
                    println!("Watching for reminders; close stdin to stop.");
                }
                wait_for_stdin_close()?;
                handle.stop();
            }
        }
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.use_stderr() {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                std::process::exit(1);
            }
            // help and version go to stdout with a zero exit
            print!("{err}");
            return;
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{display_time, parse_cli_date, parse_cli_datetime};

    #[test]
    fn parse_cli_datetime_accepts_common_forms() {
        assert!(parse_cli_datetime("2026-06-15T09:00:00Z").is_ok());
        assert!(parse_cli_datetime("2026-06-15 09:00").is_ok());
        assert!(parse_cli_datetime("2026-06-15 09:00:30").is_ok());
        assert!(parse_cli_datetime("2026-06-15").is_ok());
    }

    #[test]
    fn parse_cli_datetime_rejects_garbage() {
        let err = parse_cli_datetime("next tuesday").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn parse_cli_date_requires_iso_date() {
        assert!(parse_cli_date(Some("2026-06-15")).is_ok());
        assert!(parse_cli_date(Some("15/06/2026")).is_err());
        assert!(parse_cli_date(None).is_ok());
    }

    #[test]
    fn display_time_falls_back_to_raw_on_bad_input() {
        assert_eq!(display_time("not a timestamp"), "not a timestamp");
    }
}
