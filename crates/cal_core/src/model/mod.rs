mod schedule;

pub use schedule::{Mode, Schedule, ScheduleStatus};
