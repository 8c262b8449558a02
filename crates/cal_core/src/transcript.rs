//! Accumulation of speech-capture results. A session receives zero or
//! more interim segments and any number of final segments; finals are
//! retained by concatenation for the rest of the session while each new
//! interim replaces the previous one.

/// Running transcript of one capture session.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSession {
    finals: String,
    interim: String,
}

impl TranscriptSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_segment(&mut self, is_final: bool, text: &str) {
        if is_final {
            self.finals.push_str(text);
            self.finals.push(' ');
            self.interim.clear();
        } else {
            self.interim = text.to_string();
        }
    }

    /// Current best transcript: all finals followed by the live interim.
    pub fn snapshot(&self) -> String {
        format!("{}{}", self.finals, self.interim).trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

/// Speech-capture failure categories surfaced to the user as dismissible
/// messages; none of them are retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    PermissionDenied,
    NoSpeech,
    Network,
    Other(String),
}

impl SpeechError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Microphone access was denied; voice input is unavailable.".to_string()
            }
            Self::NoSpeech => "No speech heard. Start again and speak.".to_string(),
            Self::Network => "Voice input needs a network connection.".to_string(),
            Self::Other(code) => format!("Voice input error: {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SpeechError, TranscriptSession};

    #[test]
    fn finals_accumulate_across_segments() {
        let mut session = TranscriptSession::new();
        session.push_segment(true, "schedule a meeting");
        session.push_segment(true, "at 10 am");
        assert_eq!(session.snapshot(), "schedule a meeting at 10 am");
    }

    #[test]
    fn interim_replaces_rather_than_accumulates() {
        let mut session = TranscriptSession::new();
        session.push_segment(false, "sched");
        session.push_segment(false, "schedule a");
        assert_eq!(session.snapshot(), "schedule a");
    }

    #[test]
    fn finals_survive_later_interims() {
        let mut session = TranscriptSession::new();
        session.push_segment(true, "schedule a meeting");
        session.push_segment(false, "at te");
        session.push_segment(false, "at ten");
        assert_eq!(session.snapshot(), "schedule a meeting at ten");

        session.push_segment(true, "at 10 am");
        assert_eq!(session.snapshot(), "schedule a meeting at 10 am");
    }

    #[test]
    fn discarding_interims_is_safe() {
        let mut session = TranscriptSession::new();
        session.push_segment(false, "half a wor");
        session.push_segment(true, "a full sentence");
        assert_eq!(session.snapshot(), "a full sentence");
    }

    #[test]
    fn empty_session_reports_empty() {
        let session = TranscriptSession::new();
        assert!(session.is_empty());
        assert_eq!(session.snapshot(), "");
    }

    #[test]
    fn error_codes_map_to_categories() {
        assert_eq!(SpeechError::from_code("not-allowed"), SpeechError::PermissionDenied);
        assert_eq!(SpeechError::from_code("service-not-allowed"), SpeechError::PermissionDenied);
        assert_eq!(SpeechError::from_code("no-speech"), SpeechError::NoSpeech);
        assert_eq!(SpeechError::from_code("network"), SpeechError::Network);
        assert_eq!(
            SpeechError::from_code("aborted"),
            SpeechError::Other("aborted".to_string())
        );
    }

    #[test]
    fn every_category_has_a_user_message() {
        for error in [
            SpeechError::PermissionDenied,
            SpeechError::NoSpeech,
            SpeechError::Network,
            SpeechError::Other("aborted".to_string()),
        ] {
            assert!(!error.user_message().is_empty());
        }
    }
}
