//! Prompt rendering: choice labels, inline keyboards, answered markers

use crate::error::{ChefError, Result};
use crate::models::{LabelStyle, MAX_OPTIONS};
use crate::providers::{reply, Button, Keyboard};

pub const CHOICE_PREFIX: &str = "choice:";
pub const CONFIRM_YES: &str = "confirm:yes";
pub const CONFIRM_NO: &str = "confirm:no";

/// Label shown next to option `index` (zero-based)
pub fn label(index: usize, style: LabelStyle) -> String {
    match style {
        LabelStyle::Letters => char::from(b'A' + index as u8).to_string(),
        LabelStyle::Numbers => (index + 1).to_string(),
    }
}

/// Map a label letter back to its zero-based index
pub fn letter_index(text: &str, count: usize) -> Option<usize> {
    let mut chars = text.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !c.is_ascii_uppercase() {
        return None;
    }
    let index = (c as u8 - b'A') as usize;
    (index < count).then_some(index)
}

/// Reject empty or oversized option lists before anything is sent
pub fn validate_options(options: &[String]) -> Result<()> {
    if options.is_empty() || options.len() > MAX_OPTIONS {
        return Err(ChefError::InvalidOptions {
            count: options.len(),
            max: MAX_OPTIONS,
        });
    }
    Ok(())
}

/// Reject blank prompts
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(ChefError::EmptyPrompt);
    }
    Ok(())
}

pub fn choice_payload(index: usize) -> String {
    format!("{}{}", CHOICE_PREFIX, index)
}

/// One button per row so long option labels stay readable
pub fn choice_keyboard(options: &[String], style: LabelStyle) -> Keyboard {
    let rows = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            vec![Button {
                label: format!("{}. {}", label(i, style), option),
                data: choice_payload(i),
            }]
        })
        .collect();
    Keyboard { rows }
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![vec![
            Button {
                label: "✅ Yes".to_string(),
                data: CONFIRM_YES.to_string(),
            },
            Button {
                label: "❌ No".to_string(),
                data: CONFIRM_NO.to_string(),
            },
        ]],
    }
}

/// Prompt text with the option list repeated for clients that hide buttons
pub fn render_choice_prompt(prompt: &str, options: &[String], style: LabelStyle) -> String {
    let mut text = prompt.trim().to_string();
    text.push_str("\n\n");
    for (i, option) in options.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", label(i, style), option));
    }
    let hint = match style {
        LabelStyle::Letters => "Tap a button or reply with a letter or number.",
        LabelStyle::Numbers => "Tap a button or reply with a number.",
    };
    text.push('\n');
    text.push_str(hint);
    text
}

pub fn render_confirm_prompt(prompt: &str) -> String {
    format!("{}\n\nTap a button or reply yes / no.", prompt.trim())
}

pub fn render_photo_prompt(prompt: &str) -> String {
    let keywords = reply::CANCEL_KEYWORDS
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(" / ");
    format!(
        "{}\n\n📷 Attach an image, or reply {} to continue without one.",
        prompt.trim(),
        keywords
    )
}

/// Original prompt with a visible answered marker
pub fn answered_text(prompt: &str, answer: &str) -> String {
    format!("{}\n\n✅ {}", prompt, answer)
}
