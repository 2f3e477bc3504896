/// Strip characters the console's text fields (and chromedriver's key input)
/// reject.
///
/// Keeps ASCII when the text has any; text with no ASCII at all keeps its
/// Basic Multilingual Plane characters so non-Latin titles survive.
pub fn sanitize_for_entry(text: &str) -> String {
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    let ascii = ascii.trim();
    if !ascii.is_empty() {
        return collapse_spaces(ascii);
    }
    let bmp: String = text.chars().filter(|c| (*c as u32) <= 0xFFFF).collect();
    collapse_spaces(bmp.trim())
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !previous_space {
                out.push(c);
            }
            previous_space = true;
        } else {
            out.push(c);
            previous_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_emoji_from_latin_text() {
        assert_eq!(sanitize_for_entry("Big news 🚀 today"), "Big news today");
    }

    #[test]
    fn keeps_newlines() {
        assert_eq!(sanitize_for_entry("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn non_latin_text_keeps_bmp() {
        assert_eq!(sanitize_for_entry("新しい発表 🎉"), "新しい発表");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(sanitize_for_entry("🎉🎉"), "");
    }
}
