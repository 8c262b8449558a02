use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a schedule with explicit times
    ///
    /// Example: calcli add "Budget Review" --start "2026-06-15 14:00" --end "2026-06-15 15:30"
    /// Example: calcli add "Standup" --start "2026-06-15 09:00" --mode in-person --reminder 10
    Add {
        task_name: Option<String>,
        /// Start time ("YYYY-MM-DD HH:MM" local, or RFC3339)
        #[arg(long)]
        start: String,
        /// End time; defaults to one hour after start
        #[arg(long)]
        end: Option<String>,
        /// online or in-person
        #[arg(long)]
        mode: Option<String>,
        /// Lead time in minutes (0, 5, 10, 15, 30 or 60)
        #[arg(long)]
        reminder: Option<u32>,
        /// Alarm tone id (1-10)
        #[arg(long)]
        ringtone: Option<u8>,
    },
    /// Parse a spoken-style command and create the schedule
    ///
    /// Example: calcli say "Schedule a meeting at 2 PM to 3:30 PM for Budget Review"
    /// Example: calcli say "In-person standup at 9 to 10 remind me with alarm" --date 2026-06-15
    Say {
        text: Option<String>,
        /// Anchor date for the parsed times (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Read a transcript from stdin and create the schedule
    ///
    /// Each line is one final speech segment; a blank line or EOF ends
    /// the session.
    ///
    /// Example: echo "meeting at 10 am for review" | calcli dictate
    Dictate {
        /// Anchor date for the parsed times (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List schedules for a month
    ///
    /// Example: calcli list
    /// Example: calcli list --year 2026 --month 6
    List {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u8>,
    },
    /// Show details of a schedule
    ///
    /// Example: calcli show sched-1
    Show {
        id: String,
    },
    /// Edit schedule fields
    ///
    /// Example: calcli edit sched-1 --task "Quarterly Review" --reminder 30
    Edit {
        id: String,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        reminder: Option<u32>,
        #[arg(long)]
        ringtone: Option<u8>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Set a schedule's status
    ///
    /// Example: calcli status sched-1 completed
    Status {
        id: String,
        /// not-started, in-progress, completed or cancelled
        status: String,
    },
    /// Delete a schedule
    ///
    /// Example: calcli delete sched-1
    Delete {
        id: String,
    },
    /// Year analytics with a monthly focus
    ///
    /// Example: calcli analytics
    /// Example: calcli analytics --year 2026 --month 6
    Analytics {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u8>,
    },
    /// List the alarm tone catalog
    ///
    /// Example: calcli ringtones
    Ringtones,
    /// Play an alarm tone
    ///
    /// Example: calcli play 4
    Play {
        tone_id: u8,
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Run the reminder loop until stdin closes
    ///
    /// Example: calcli watch
    /// Example: calcli watch --once
    Watch {
        /// Perform a single scan and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    ReminderMinutes,
    RingtoneId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "default_reminder_minutes" | "reminder" | "reminder_minutes" => {
            ConfigOverrideTarget::ReminderMinutes
        }
        "default_ringtone_id" | "ringtone" | "ringtone_id" => ConfigOverrideTarget::RingtoneId,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
