//! Turns the session's preferences into the context block appended to every
//! outgoing message.

use crate::preferences::{Choice, Preferences};

/// Header placed between the user's text and the preference lines.
pub const CONTEXT_HEADER: &str = "\n\nUser Preferences:\n";

/// One line per set field, in the fixed order Country, Diet, Budget, Prep Time,
/// Preferred Store. Unset fields are omitted.
pub fn preference_lines(prefs: &Preferences) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(country) = prefs.country {
        lines.push(format!("Country: {}", country.wire()));
    }
    if let Some(diet) = prefs.diet {
        lines.push(format!("Diet: {}", diet.wire()));
    }
    if let Some(budget) = prefs.budget_level {
        lines.push(format!("Budget: {}", budget.wire()));
    }
    if let Some(prep) = prefs.prep_time {
        lines.push(format!("Prep Time: {} minutes", prep.minutes()));
    }
    if let Some(store) = prefs.preferred_store {
        lines.push(format!("Preferred Store: {}", store.wire()));
    }
    lines
}

/// The preference lines joined with newlines, or an empty string when nothing is set.
pub fn format_preferences(prefs: &Preferences) -> String {
    preference_lines(prefs).join("\n")
}

/// The text actually sent to the assistant: the user's text, followed by the
/// context block when at least one preference is set.
pub fn compose_outgoing(user_text: &str, prefs: &Preferences) -> String {
    let block = format_preferences(prefs);
    if block.is_empty() {
        user_text.to_string()
    } else {
        format!("{user_text}{CONTEXT_HEADER}{block}")
    }
}
