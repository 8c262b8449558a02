//! Best-effort remote service client. Every caller treats a failure here
//! as a cue to fall back to the local store, so errors carry the
//! `remote_error` code and are logged rather than surfaced.

use crate::analytics::YearAnalytics;
use crate::error::AppError;
use crate::model::Schedule;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub struct RemoteClient {
    agent: ureq::Agent,
    base_url: String,
}

/// Build a client when `CALCLI_API_URL` is configured; `None` means the
/// caller should go straight to the local store.
pub fn client_from_env() -> Option<RemoteClient> {
    let base_url = std::env::var("CALCLI_API_URL").ok()?;
    let base_url = base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        return None;
    }
    Some(RemoteClient::new(base_url))
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn list(&self, year: i32, month: u8) -> Result<Vec<Schedule>, AppError> {
        self.agent
            .get(&format!("{}/schedules/", self.base_url))
            .query("year", &year.to_string())
            .query("month", &month.to_string())
            .call()
            .map_err(remote_err)?
            .into_json()
            .map_err(|err| AppError::remote(err.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<Schedule, AppError> {
        self.agent
            .get(&format!("{}/schedules/{id}/", self.base_url))
            .call()
            .map_err(remote_err)?
            .into_json()
            .map_err(|err| AppError::remote(err.to_string()))
    }

    pub fn create(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        self.agent
            .post(&format!("{}/schedules/", self.base_url))
            .send_json(schedule)
            .map_err(remote_err)?
            .into_json()
            .map_err(|err| AppError::remote(err.to_string()))
    }

    pub fn update(&self, id: &str, schedule: &Schedule) -> Result<Schedule, AppError> {
        self.agent
            .put(&format!("{}/schedules/{id}/", self.base_url))
            .send_json(schedule)
            .map_err(remote_err)?
            .into_json()
            .map_err(|err| AppError::remote(err.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        self.agent
            .delete(&format!("{}/schedules/{id}/", self.base_url))
            .call()
            .map_err(remote_err)?;
        Ok(())
    }

    pub fn analytics(&self, year: i32, month: u8) -> Result<YearAnalytics, AppError> {
        self.agent
            .get(&format!("{}/analytics/", self.base_url))
            .query("year", &year.to_string())
            .query("month", &month.to_string())
            .call()
            .map_err(remote_err)?
            .into_json()
            .map_err(|err| AppError::remote(err.to_string()))
    }
}

fn remote_err(err: ureq::Error) -> AppError {
    AppError::remote(err.to_string())
}
