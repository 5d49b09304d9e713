use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the live endpoint credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Languages offered by the practice partner; free to extend
pub const LANGUAGES: &[&str] = &["French", "Spanish", "German", "Italian", "Japanese", "Korean"];

/// Conversation scenarios; free to extend
pub const SCENARIOS: &[&str] = &[
    "Ordering coffee",
    "Asking for directions",
    "Booking a hotel room",
    "Shopping for clothes",
    "Making a dinner reservation",
];

/// Configuration for a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Language the partner speaks
    pub language: String,

    /// Situational prompt for the conversation
    pub scenario: String,

    /// Model identifier at the live endpoint
    pub model: String,

    /// Websocket endpoint URL
    pub url: String,

    /// Live endpoint credential; empty means not configured
    pub api_key: String,

    /// Capture sample rate (the endpoint expects 16kHz input)
    pub input_sample_rate: u32,

    /// Synthesized audio sample rate (the endpoint produces 24kHz)
    pub output_sample_rate: u32,

    /// Samples per capture frame
    pub frame_samples: usize,

    /// Silence period after which the session auto-terminates
    pub inactivity_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("conversation-{}", uuid::Uuid::new_v4()),
            language: LANGUAGES[0].to_string(),
            scenario: SCENARIOS[0].to_string(),
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 4096,
            inactivity_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// System instruction interpolating language and scenario
    pub fn system_instruction(&self) -> String {
        format!(
            "You are a conversational partner helping a user practice the {language} language. \
             The scenario is: \"{scenario}\". You must speak only in {language}. \
             Keep your responses concise and natural for a real conversation.",
            language = self.language,
            scenario = self.scenario,
        )
    }
}
