//! Terminal styling utilities for consistent CLI output

use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// Print an error message to stderr
pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Print a warning message to stderr
pub fn warning(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

/// Print a success message to stdout
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a hint message to stderr (dimmed)
pub fn hint(msg: &str) {
    eprintln!("{} {}", "hint:".dimmed(), msg.dimmed());
}

/// Print a status update to stderr, keeping stdout clean for reports
pub fn status(msg: &str) {
    eprintln!("{} {}", "→".blue(), msg);
}

/// Format a path for display (bright white)
pub fn path(p: &std::path::Path) -> String {
    p.display().to_string().bright_white().to_string()
}

/// Format a label-value pair for metrics display
pub fn metric(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {}: {}", label.dimmed(), value.to_string().cyan())
}

/// Print a section header to stderr
pub fn section(title: &str) {
    eprintln!("\n{}", title.bold());
}

/// Check if stdout is a terminal (TTY)
pub fn is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Render markdown to the terminal with colors and formatting.
/// If not a TTY, writes plain markdown.
pub fn render_markdown(markdown: &str, output: &mut dyn Write) -> io::Result<()> {
    if is_terminal() {
        let skin = create_skin();
        let rendered = skin.term_text(markdown);
        write!(output, "{}", rendered)
    } else {
        write!(output, "{}", markdown)
    }
}

/// Create a custom termimad skin with our color scheme
fn create_skin() -> termimad::MadSkin {
    use crossterm::style::Color;
    use termimad::*;

    let mut skin = MadSkin::default();

    skin.set_headers_fg(Color::Cyan);
    skin.bold.set_fg(Color::White);
    skin.bullet = StyledChar::from_fg_char(Color::Blue, '•');

    // Class and package names are rendered as inline code
    skin.inline_code.set_fg(Color::Yellow);

    // Status banner
    skin.quote_mark = StyledChar::from_fg_char(Color::Red, '▐');

    skin.horizontal_rule = StyledChar::from_fg_char(Color::DarkGrey, '─');

    skin
}
