//! WebDriver special key code points (W3C WebDriver, section 17.4.2).

pub const NULL: char = '\u{E000}';
pub const BACKSPACE: char = '\u{E003}';
pub const CONTROL: char = '\u{E009}';

/// Key sequence that selects everything in a focused field and deletes it.
pub fn select_all_and_delete() -> String {
    format!("{CONTROL}a{NULL}{BACKSPACE}")
}
