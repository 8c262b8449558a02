//! Voice-command parser: free-text utterance to partial schedule fields.
//!
//! Examples it understands:
//!   "Schedule a meeting at 10 AM to 11 AM for Project Review"
//!   "Book online session from 2 PM to 3:30 PM about Budget Planning"
//!   "Set up in-person meeting at 9 to 10 for Team Standup"
//!
//! The time-token grammar is deliberately permissive: any one- or
//! two-digit run matches, so bare numbers ("room 12") parse as times.
//! Kept for compatibility with existing saved transcripts.

use crate::model::Mode;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const REMINDER_OPTIONS: [u32; 5] = [5, 10, 15, 30, 60];
pub const DEFAULT_TASK_NAME: &str = "New Meeting";
const KEYWORD_REMINDER_MINUTES: u32 = 10;

static TIME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(am|pm)?").expect("time token pattern"));
static REMINDER_LEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s*min").expect("reminder lead pattern"));

static COMMAND_VERBS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)schedule\s*(a|an)?\s*").expect("verb pattern"),
        Regex::new(r"(?i)book\s*(a|an)?\s*").expect("verb pattern"),
        Regex::new(r"(?i)set\s*up\s*(a|an)?\s*").expect("verb pattern"),
        Regex::new(r"(?i)create\s*(a|an)?\s*").expect("verb pattern"),
    ]
});
static CONNECTIVES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(at|from|to|for|about|regarding)\b").expect("connective pattern"));
static REMINDER_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*min(utes)?\s*(before)?\b").expect("reminder fragment pattern"));
static MODE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(online|in-person|in person|offline)\b").expect("mode word pattern"));
static ALARM_PHRASES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(remind\s*me|with\s*alarm|ringtone)\b").expect("alarm phrase pattern"));
static TONE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(classic|bell|gentle|chime|clock|melody|rise|digital|beep|soft|wave|piano|drop|urgent|alert|sparkle|trumpet|call)\b",
    )
    .expect("tone word pattern")
});
static REPEATED_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern"));

/// Keyword table for tone hints, scanned in order; first hit wins.
const TONE_KEYWORDS: [(&str, u8); 18] = [
    ("classic", 1),
    ("bell", 1),
    ("gentle", 2),
    ("chime", 2),
    ("clock", 3),
    ("melody", 4),
    ("rise", 4),
    ("digital", 5),
    ("beep", 5),
    ("soft", 6),
    ("wave", 6),
    ("piano", 7),
    ("drop", 7),
    ("urgent", 8),
    ("alert", 8),
    ("sparkle", 9),
    ("trumpet", 10),
    ("call", 10),
];

/// Best-effort schedule fragment extracted from one utterance. Unset
/// options mean "the utterance said nothing about this"; callers keep
/// their prior values for those fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub task_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub mode: Mode,
    pub reminder_minutes: Option<u32>,
    pub ringtone_id: Option<u8>,
}

/// Parse an utterance into schedule fields. Returns `None` only for an
/// empty input; malformed input degrades to defaults, never an error.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();

    let mode = if lower.contains("in-person") || lower.contains("in person") || lower.contains("offline") {
        Mode::InPerson
    } else {
        Mode::Online
    };

    let mut times = TIME_TOKEN.captures_iter(text).map(|caps| {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minutes: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
        to_24h(hour, minutes, meridiem.as_deref())
    });
    let start_time = times.next();
    let end_time = times.next();

    let reminder_minutes = match REMINDER_LEAD.captures(&lower) {
        Some(caps) => {
            let raw: u64 = caps[1].parse().unwrap_or(u64::MAX);
            Some(snap_reminder(raw))
        }
        None if lower.contains("remind") || lower.contains("alarm") => Some(KEYWORD_REMINDER_MINUTES),
        None => None,
    };

    let ringtone_id = TONE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|&(_, id)| id)
        .or_else(|| {
            if lower.contains("ringtone") || lower.contains("alarm") {
                Some(1)
            } else {
                None
            }
        });

    Some(ParsedCommand {
        task_name: extract_task_name(text),
        start_time,
        end_time,
        mode,
        reminder_minutes,
        ringtone_id,
    })
}

/// Convert a matched time token to 24-hour "HH:MM". pm adds 12 unless the
/// hour already is 12; am maps 12 to 0.
fn to_24h(hour: u32, minutes: u32, meridiem: Option<&str>) -> String {
    let mut hour = hour;
    match meridiem {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    format!("{hour:02}:{minutes:02}")
}

/// Snap a raw lead time to the nearest allowed value. Exact ties resolve
/// to the earlier entry of the option list, so 45 snaps to 30.
pub fn snap_reminder(raw: u64) -> u32 {
    let mut best = REMINDER_OPTIONS[0];
    for option in REMINDER_OPTIONS {
        if u64::from(option).abs_diff(raw) < u64::from(best).abs_diff(raw) {
            best = option;
        }
    }
    best
}

fn extract_task_name(text: &str) -> String {
    let mut remainder = text.to_string();
    for verb in COMMAND_VERBS.iter() {
        remainder = verb.replace_all(&remainder, "").into_owned();
    }
    remainder = CONNECTIVES.replace_all(&remainder, " ").into_owned();
    remainder = TIME_TOKEN.replace_all(&remainder, "").into_owned();
    remainder = REMINDER_FRAGMENT.replace_all(&remainder, "").into_owned();
    remainder = MODE_WORDS.replace_all(&remainder, "").into_owned();
    remainder = ALARM_PHRASES.replace_all(&remainder, "").into_owned();
    remainder = TONE_WORDS.replace_all(&remainder, "").into_owned();
    remainder = REPEATED_WHITESPACE.replace_all(&remainder, " ").into_owned();
    let trimmed = remainder.trim();

    if trimmed.is_empty() {
        return DEFAULT_TASK_NAME.to_string();
    }
    capitalize(trimmed)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_command, snap_reminder, DEFAULT_TASK_NAME};
    use crate::model::Mode;

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn budget_review_example() {
        let parsed = parse_command("Meeting at 2 PM to 3:30 PM for Budget Review").unwrap();
        assert_eq!(parsed.mode, Mode::Online);
        assert_eq!(parsed.start_time.as_deref(), Some("14:00"));
        assert_eq!(parsed.end_time.as_deref(), Some("15:30"));
        assert!(parsed.task_name.contains("Budget Review"), "got {:?}", parsed.task_name);
        assert_eq!(parsed.reminder_minutes, None);
        assert_eq!(parsed.ringtone_id, None);
    }

    #[test]
    fn in_person_standup_example() {
        let parsed = parse_command("In-person standup at 9 to 10").unwrap();
        assert_eq!(parsed.mode, Mode::InPerson);
        assert_eq!(parsed.start_time.as_deref(), Some("09:00"));
        assert_eq!(parsed.end_time.as_deref(), Some("10:00"));
        assert_eq!(parsed.task_name, "Standup");
    }

    #[test]
    fn chronological_tokens_keep_order() {
        let parsed = parse_command("10 AM to 11 AM").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("10:00"));
        assert_eq!(parsed.end_time.as_deref(), Some("11:00"));
        assert!(parsed.start_time < parsed.end_time);
    }

    #[test]
    fn single_time_sets_start_only() {
        let parsed = parse_command("review at 4 pm").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("16:00"));
        assert_eq!(parsed.end_time, None);
    }

    #[test]
    fn extra_time_tokens_are_ignored() {
        let parsed = parse_command("from 1 pm to 2 pm or 3 pm").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("13:00"));
        assert_eq!(parsed.end_time.as_deref(), Some("14:00"));
    }

    #[test]
    fn noon_and_midnight_meridiem_rules() {
        let parsed = parse_command("lunch at 12 pm to 12:30 pm").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("12:00"));
        let parsed = parse_command("call at 12 am").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("00:00"));
    }

    #[test]
    fn greedy_grammar_matches_bare_digits() {
        // "room 12" is treated as a time token; this mirrors the legacy
        // grammar on purpose.
        let parsed = parse_command("meeting in room 12").unwrap();
        assert_eq!(parsed.start_time.as_deref(), Some("12:00"));
    }

    #[test]
    fn reminder_lead_is_snapped() {
        let parsed = parse_command("standup at 9 remind me 7 min before").unwrap();
        assert_eq!(parsed.reminder_minutes, Some(5));
    }

    #[test]
    fn snap_ties_pick_earlier_option() {
        assert_eq!(snap_reminder(45), 30);
        assert_eq!(snap_reminder(7), 5);
        assert_eq!(snap_reminder(8), 10);
        assert_eq!(snap_reminder(22), 15);
        assert_eq!(snap_reminder(600), 60);
    }

    #[test]
    fn bare_alarm_keyword_defaults_reminder_and_tone() {
        let parsed = parse_command("meeting at 3 pm with alarm").unwrap();
        assert_eq!(parsed.reminder_minutes, Some(10));
        assert_eq!(parsed.ringtone_id, Some(1));
    }

    #[test]
    fn tone_keywords_resolve_in_scan_order() {
        let parsed = parse_command("meeting at 3 pm with gentle chime ringtone").unwrap();
        assert_eq!(parsed.ringtone_id, Some(2));
        let parsed = parse_command("meeting at 3 pm with piano drop alarm").unwrap();
        assert_eq!(parsed.ringtone_id, Some(7));
        // "bell" belongs to an earlier table entry than "chime".
        let parsed = parse_command("gentle bell at 5").unwrap();
        assert_eq!(parsed.ringtone_id, Some(1));
    }

    #[test]
    fn command_verbs_are_stripped() {
        let parsed = parse_command("Schedule a meeting at 10 AM to 11 AM for Project Review").unwrap();
        assert!(parsed.task_name.contains("Project Review"), "got {:?}", parsed.task_name);
        assert!(!parsed.task_name.to_lowercase().contains("schedule"));
    }

    #[test]
    fn empty_remainder_falls_back_to_default_name() {
        let parsed = parse_command("at 10 am").unwrap();
        assert_eq!(parsed.task_name, DEFAULT_TASK_NAME);
    }

    #[test]
    fn parser_is_pure() {
        let first = parse_command("Book session from 2 PM to 3 PM about Planning 15 min before");
        let second = parse_command("Book session from 2 PM to 3 PM about Planning 15 min before");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_input_never_panics() {
        for text in ["::::", "99:99 pm", "min min min", "12345678901234567890 min", "\u{1f514}"] {
            let parsed = parse_command(text);
            assert!(parsed.is_some());
        }
    }
}
