//! Interpret inbound replies against a pending request's kind

use crate::models::{LabelStyle, RequestKind, RequestResult};
use crate::providers::keyboard::{letter_index, CHOICE_PREFIX, CONFIRM_NO, CONFIRM_YES};

pub const CANCEL_KEYWORDS: &[&str] = &["skip", "cancel", "no", "none"];

/// y/yes/1/ok -> true, n/no/0 -> false, anything else -> None
pub fn parse_confirm(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "y" | "yes" | "1" | "ok" => Some(true),
        "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Whether the text declines a photo request
pub fn is_cancel_keyword(text: &str) -> bool {
    CANCEL_KEYWORDS.contains(&text.trim().to_lowercase().as_str())
}

/// Typed answer to a choice prompt: 1-based number, label letter (letters
/// style), or the option text itself. Free-form text when allowed.
pub fn parse_choice_text(
    text: &str,
    options: &[String],
    allow_freeform: bool,
    style: LabelStyle,
) -> Option<RequestResult> {
    let t = text.trim();
    if let Ok(n) = t.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(RequestResult::Choice(n - 1));
        }
    }
    if style == LabelStyle::Letters {
        if let Some(index) = letter_index(t, options.len()) {
            return Some(RequestResult::Choice(index));
        }
    }
    if let Some(index) = options.iter().position(|o| o.trim().eq_ignore_ascii_case(t)) {
        return Some(RequestResult::Choice(index));
    }
    if allow_freeform && !t.is_empty() {
        return Some(RequestResult::Text(t.to_string()));
    }
    None
}

/// Plain text reply for a request of `kind`; None leaves the request open
pub fn parse_text(kind: &RequestKind, text: &str, style: LabelStyle) -> Option<RequestResult> {
    match kind {
        RequestKind::FreeText => {
            let t = text.trim();
            (!t.is_empty()).then(|| RequestResult::Text(t.to_string()))
        }
        RequestKind::SingleChoice {
            options,
            allow_freeform,
        } => parse_choice_text(text, options, *allow_freeform, style),
        RequestKind::YesNo => parse_confirm(text).map(RequestResult::Confirm),
        RequestKind::PhotoRequest => is_cancel_keyword(text).then_some(RequestResult::NoAnswer),
    }
}

/// Button payload for a request of `kind`; None when the token is not valid
pub fn parse_callback(kind: &RequestKind, data: &str) -> Option<RequestResult> {
    match kind {
        RequestKind::SingleChoice { options, .. } => data
            .strip_prefix(CHOICE_PREFIX)
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|i| *i < options.len())
            .map(RequestResult::Choice),
        RequestKind::YesNo => match data {
            CONFIRM_YES => Some(RequestResult::Confirm(true)),
            CONFIRM_NO => Some(RequestResult::Confirm(false)),
            _ => None,
        },
        RequestKind::FreeText | RequestKind::PhotoRequest => None,
    }
}
