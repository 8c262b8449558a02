//! Reminder scheduler: a periodic full-collection scan that fires each
//! eligible reminder exactly once per (schedule, start_time) occurrence.
//!
//! Precision is bounded by the 30-second polling period; there are no
//! per-schedule timers. A reminder whose whole window passes while no
//! scan runs is lost, matching the original behavior (no catch-up).

use crate::error::AppError;
use crate::model::Schedule;
use crate::notify::{activation_argument, Notifier, ReminderMessage};
use crate::ringtones::{AlarmPlayer, DEFAULT_RINGTONE_ID};
use crate::storage::ScheduleStore;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::{info, warn};

/// Polling period of the scan loop.
pub const CHECK_PERIOD: StdDuration = StdDuration::from_secs(30);
/// The notified set keeps at most this many occurrence keys; the oldest
/// entries are evicted first.
pub const NOTIFIED_CAP: usize = 500;
const ALARM_REPEATS: u32 = 3;

/// One fired reminder, reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredReminder {
    pub schedule_id: String,
    pub task_name: String,
    pub occurrence_key: String,
}

pub struct ReminderScheduler<S: ScheduleStore> {
    store: S,
    notifier: Box<dyn Notifier>,
    alarm: Box<dyn AlarmPlayer>,
}

impl<S: ScheduleStore> ReminderScheduler<S> {
    pub fn new(store: S, notifier: Box<dyn Notifier>, alarm: Box<dyn AlarmPlayer>) -> Self {
        Self { store, notifier, alarm }
    }

    pub fn check_now(&self) -> Result<Vec<FiredReminder>, AppError> {
        self.check_at(OffsetDateTime::now_utc())
    }

    /// One idempotent scan at the given instant. Re-running with the same
    /// store state never fires an occurrence twice: the key is recorded
    /// and persisted before dispatch.
    pub fn check_at(&self, now: OffsetDateTime) -> Result<Vec<FiredReminder>, AppError> {
        let schedules = self.store.load_schedules()?;
        let mut notified = self.store.load_notified()?;
        let mut fired = Vec::new();

        for schedule in &schedules {
            if schedule.reminder_minutes == 0 {
                continue;
            }
            if schedule.status.is_terminal() {
                continue;
            }

            let start = match OffsetDateTime::parse(&schedule.start_time, &Rfc3339) {
                Ok(start) => start,
                Err(_) => {
                    warn!(id = %schedule.id, "skipping schedule with malformed start_time");
                    continue;
                }
            };
            let threshold = start - Duration::minutes(i64::from(schedule.reminder_minutes));

            let key = schedule.occurrence_key();
            if notified.contains(&key) {
                continue;
            }
            if now < threshold || now >= start {
                continue;
            }

            push_notified(&mut notified, key.clone());
            self.store.save_notified(&notified)?;

            self.fire(schedule, start);
            info!(id = %schedule.id, task = %schedule.task_name, "reminder fired");
            fired.push(FiredReminder {
                schedule_id: schedule.id.clone(),
                task_name: schedule.task_name.clone(),
                occurrence_key: key,
            });
        }

        Ok(fired)
    }

    /// Alarm and notification side effects. Delivery failures are logged
    /// and swallowed; the occurrence stays marked either way.
    fn fire(&self, schedule: &Schedule, start: OffsetDateTime) {
        let ringtone_id = schedule.ringtone_id.unwrap_or(DEFAULT_RINGTONE_ID);
        if let Err(err) = self.alarm.play(ringtone_id, ALARM_REPEATS) {
            warn!(id = %schedule.id, "alarm playback unavailable: {err}");
        }

        let message = compose_message(schedule, start);
        let action = activation_argument(&schedule.id);
        if let Err(err) = self.notifier.notify_with_action(&message, &action) {
            warn!(id = %schedule.id, "notification dispatch failed: {err}");
        }
    }

    /// Scan every 30 seconds until the stop channel fires; the first scan
    /// runs immediately, not after one full period.
    pub fn run(&self, stop: &Receiver<()>) {
        loop {
            if let Err(err) = self.check_now() {
                warn!("reminder scan failed: {err}");
            }
            match stop.recv_timeout(CHECK_PERIOD) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

/// A running scheduler thread with an explicit stop lifecycle.
pub struct SchedulerHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.thread.join();
    }
}

pub fn spawn<S>(scheduler: ReminderScheduler<S>) -> SchedulerHandle
where
    S: ScheduleStore + Send + 'static,
{
    let (stop, stop_rx) = mpsc::channel();
    let thread = std::thread::spawn(move || scheduler.run(&stop_rx));
    SchedulerHandle { stop, thread }
}

/// Append an occurrence key, evicting oldest entries beyond the cap.
pub fn push_notified(keys: &mut Vec<String>, key: String) {
    keys.push(key);
    if keys.len() > NOTIFIED_CAP {
        let excess = keys.len() - NOTIFIED_CAP;
        keys.drain(..excess);
    }
}

fn compose_message(schedule: &Schedule, start: OffsetDateTime) -> ReminderMessage {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let start_local = start.to_offset(local_offset);
    ReminderMessage {
        title: format!("Reminder: {}", schedule.task_name),
        body: format!(
            "{} at {:02}:{:02}\nStarting in {} min",
            schedule.mode.label(),
            start_local.hour(),
            start_local.minute(),
            schedule.reminder_minutes
        ),
        tag: schedule.id.clone(),
    }
}
