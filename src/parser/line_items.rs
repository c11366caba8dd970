//! Best-effort extraction of list items from free-text replies.
//!
//! Intermediate chained stages answer with bulleted or numbered lines. Each line
//! loses its leading marker and surrounding whitespace; blank lines and lines that
//! held nothing but a marker are dropped; order is preserved. Never fails.

use crate::recommendation::FoodItem;

const BULLETS: [char; 5] = ['-', '*', '•', '+', '–'];

/// Split `text` into list items.
pub fn extract_line_items(text: &str) -> Vec<FoodItem> {
    text.lines()
        .filter_map(clean_line)
        .map(FoodItem::new)
        .collect()
}

fn clean_line(line: &str) -> Option<String> {
    let mut rest = line.trim();
    // Markers can stack, e.g. "- 1. Banana".
    loop {
        let stripped = strip_bullet(rest).or_else(|| strip_number(rest));
        match stripped {
            Some(next) => rest = next.trim_start(),
            None => break,
        }
    }
    let rest = strip_bold(rest.trim());
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !BULLETS.contains(&first) {
        return None;
    }
    let rest = chars.as_str();
    // "**Banana**" is emphasis, not a bullet; "-5%" is a value, not a bullet.
    if first == '*' && rest.starts_with('*') {
        return None;
    }
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Strip "1.", "1)", "(1)" or "1:" followed by whitespace or end of line.
fn strip_number(line: &str) -> Option<&str> {
    let (inner, close) = match line.strip_prefix('(') {
        Some(after_paren) => (after_paren, Some(')')),
        None => (line, None),
    };
    let digits = inner.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after_digits = &inner[digits..];
    let after_marker = match close {
        Some(paren) => after_digits.strip_prefix(paren)?,
        None => after_digits
            .strip_prefix('.')
            .or_else(|| after_digits.strip_prefix(')'))
            .or_else(|| after_digits.strip_prefix(':'))?,
    };
    if after_marker.is_empty() || after_marker.starts_with(char::is_whitespace) {
        Some(after_marker)
    } else {
        None
    }
}

fn strip_bold(line: &str) -> &str {
    line.strip_prefix("**")
        .and_then(|inner| inner.strip_suffix("**"))
        .map(str::trim)
        .filter(|inner| !inner.contains("**"))
        .unwrap_or(line)
}
