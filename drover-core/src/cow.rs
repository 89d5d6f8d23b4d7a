//! Cowsay-style banners: a pure string transform.
//!
//! Runs announce themselves through the multiplexer with `type=cowsay`;
//! the transform here only builds the text.

/// Wrap width of the speech bubble.
const BUBBLE_WIDTH: usize = 40;

const DEFAULT_COW: &str = r#"        \   ^__^
         \  (oo)\_______
            (__)\       )\/\
                ||----w |
                ||     ||"#;

/// Render `message` in a speech bubble over the default cow.
pub fn cowsay(message: &str) -> String {
    cowsay_with(DEFAULT_COW, message)
}

/// Render `message` over a custom cow body (the part below the bubble).
pub fn cowsay_with(cow: &str, message: &str) -> String {
    let lines = wrap(message, BUBBLE_WIDTH);
    let width = lines.iter().map(|line| line.len()).max().unwrap_or(0);

    let mut out = String::new();
    out.push(' ');
    out.push_str(&"_".repeat(width + 2));
    out.push('\n');

    match lines.len() {
        0 | 1 => {
            let line = lines.first().map(String::as_str).unwrap_or("");
            out.push_str(&format!("< {line:width$} >\n"));
        }
        n => {
            for (index, line) in lines.iter().enumerate() {
                let (open, close) = if index == 0 {
                    ('/', '\\')
                } else if index == n - 1 {
                    ('\\', '/')
                } else {
                    ('|', '|')
                };
                out.push_str(&format!("{open} {line:width$} {close}\n"));
            }
        }
    }

    out.push(' ');
    out.push_str(&"-".repeat(width + 2));
    out.push('\n');
    out.push_str(cow);
    out
}

fn wrap(message: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in message.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_bubble() {
        let out = cowsay("moo");
        assert!(out.contains("< moo >"));
        assert!(out.contains("(oo)"));
    }

    #[test]
    fn test_long_message_wraps() {
        let out = cowsay(
            "a considerably longer message that surely cannot fit on one bubble line at all",
        );
        assert!(out.contains("/ "));
        assert!(out.contains("\\ "));
    }

    #[test]
    fn test_custom_cow_body() {
        let out = cowsay_with("  (custom)", "hi");
        assert!(out.ends_with("  (custom)"));
    }
}
