use crate::error::AppError;
use crate::model::Schedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "schedules.json";
const NOTIFIED_FILE_NAME: &str = "notified.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSchedules {
    schema_version: u32,
    schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredNotified {
    schema_version: u32,
    #[serde(default)]
    notified: Vec<String>,
}

fn data_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("CALCLI_DATA_DIR")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("calcli"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("calcli"))
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("CALCLI_STORE_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(data_dir()?.join(STORE_FILE_NAME))
}

pub fn notified_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("CALCLI_NOTIFIED_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(data_dir()?.join(NOTIFIED_FILE_NAME))
}

pub fn load_schedules(path: &Path) -> Result<Vec<Schedule>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredSchedules =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.schedules)
}

pub fn save_schedules(path: &Path, schedules: &[Schedule]) -> Result<(), AppError> {
    let stored = StoredSchedules {
        schema_version: SCHEMA_VERSION,
        schedules: schedules.to_vec(),
    };
    write_pretty(path, &stored)
}

pub fn load_notified(path: &Path) -> Result<Vec<String>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredNotified =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.notified)
}

pub fn save_notified(path: &Path, keys: &[String]) -> Result<(), AppError> {
    let stored = StoredNotified {
        schema_version: SCHEMA_VERSION,
        notified: keys.to_vec(),
    };
    write_pretty(path, &stored)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let content =
        serde_json::to_string_pretty(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
