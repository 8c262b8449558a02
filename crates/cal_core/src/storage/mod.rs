pub mod json_store;

use crate::error::AppError;
use crate::model::Schedule;
use std::path::PathBuf;

/// Read-all/write-all access to the persisted collections. There is no
/// partial-update API: callers read, mutate and write back the whole
/// snapshot, accepting last-write-wins semantics.
pub trait ScheduleStore {
    fn load_schedules(&self) -> Result<Vec<Schedule>, AppError>;
    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), AppError>;
    fn load_notified(&self) -> Result<Vec<String>, AppError>;
    fn save_notified(&self, keys: &[String]) -> Result<(), AppError>;
}

/// File-backed store keeping schedules and the notified-occurrence set in
/// separate JSON files.
#[derive(Debug, Clone)]
pub struct JsonStore {
    schedules_path: PathBuf,
    notified_path: PathBuf,
}

impl JsonStore {
    pub fn new(schedules_path: PathBuf, notified_path: PathBuf) -> Self {
        Self { schedules_path, notified_path }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            schedules_path: json_store::store_path()?,
            notified_path: json_store::notified_path()?,
        })
    }
}

impl ScheduleStore for JsonStore {
    fn load_schedules(&self) -> Result<Vec<Schedule>, AppError> {
        json_store::load_schedules(&self.schedules_path)
    }

    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), AppError> {
        json_store::save_schedules(&self.schedules_path, schedules)
    }

    fn load_notified(&self) -> Result<Vec<String>, AppError> {
        json_store::load_notified(&self.notified_path)
    }

    fn save_notified(&self, keys: &[String]) -> Result<(), AppError> {
        json_store::save_notified(&self.notified_path, keys)
    }
}
