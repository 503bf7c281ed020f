// Process-wide defaults, read once from the environment.

use std::env;

/// Where the backend listens when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable that points the client at a different backend.
pub const API_URL_ENV: &str = "MEALPREP_API_URL";

pub const GREETING: &str = "Namaste! 👋 I'm your meal prep planner assistant. I help Indian students abroad create time-efficient meal plans that bring the comfort of home food to your busy schedule. Whether you're juggling studies and part-time work, I'll help you plan budget-friendly, make-ahead meals that remind you of home. What would you like help with today?";

pub const THINKING_INDICATOR: &str = "Thinking...";

/// Input box height limits in text lines (the box grows with content up to the cap).
pub const INPUT_MIN_LINES: u16 = 1;
pub const INPUT_MAX_LINES: u16 = 6;

pub const DEFAULT_LOG_FILE: &str = "mealprep.log";
pub const DEFAULT_WEB_PORT: u16 = 3000;

lazy_static::lazy_static! {
    pub static ref API_URL: String = env::var(API_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
}
