//! Soliton CLI UI primitives.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal palette.
pub mod colors {
    use console::Color;

    pub const CYAN: Color = Color::Color256(51);
    pub const AMBER: Color = Color::Color256(214);
    pub const RED: Color = Color::Color256(203);
    pub const GREEN: Color = Color::Color256(82);
    pub const DIM: Color = Color::Color256(240);
}

pub mod symbols {
    pub const DIAMOND: &str = "\u{25C6}"; // ◆
    pub const DIAMOND_OUTLINE: &str = "\u{25C7}"; // ◇
    pub const TARGET_FILLED: &str = "\u{25C9}"; // ◉
    pub const TRIANGLE: &str = "\u{25B8}"; // ▸
    pub const PROGRESS_FILLED: &str = "\u{25B0}"; // ▰
    pub const PROGRESS_EMPTY: &str = "\u{25B1}"; // ▱
    pub const ARROW: &str = "\u{2500}\u{25B8}"; // ─▸
}

/// Width of the box drawn around report sections.
const BOX_WIDTH: usize = 55;

pub fn print_header(version: &str) {
    println!(
        "  {} {} {}",
        style(symbols::DIAMOND).fg(colors::CYAN),
        style("soliton").fg(colors::CYAN).bold(),
        style(version).dim()
    );
    println!();
}

pub fn success(msg: &str) {
    println!("  {} {}", style(symbols::TARGET_FILLED).fg(colors::GREEN), msg);
}

pub fn info(msg: &str) {
    println!("  {} {}", style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN), msg);
}

/// A soft problem: the run continues.
pub fn warning(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::AMBER),
        style(msg).fg(colors::AMBER)
    );
}

pub fn error(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::RED),
        style(msg).fg(colors::RED)
    );
}

pub fn dim(msg: &str) {
    println!("  {}", style(msg).fg(colors::DIM));
}

/// Spinner shown while a phase runs.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("\u{25CE}\u{25C9}\u{25CE}\u{25C9}") // ◎◉◎◉
        .template("  {spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn box_header(title: &str) {
    let title_padded = format!(" {} ", title);
    let dashes = BOX_WIDTH.saturating_sub(title_padded.chars().count() + 4);

    println!(
        "  {}{}{}{}",
        style("\u{256D}\u{2500}").fg(colors::CYAN), // ╭─
        style(title_padded).fg(colors::CYAN).bold(),
        style("\u{2500}".repeat(dashes)).fg(colors::CYAN),
        style("\u{256E}").fg(colors::CYAN) // ╮
    );
}

/// A line inside a box. `content` must be unstyled so it can be padded.
pub fn box_line(content: &str) {
    let padding = (BOX_WIDTH - 2).saturating_sub(content.chars().count());
    println!(
        "  {} {}{}{}",
        style("\u{2502}").fg(colors::CYAN), // │
        content,
        " ".repeat(padding),
        style("\u{2502}").fg(colors::CYAN)
    );
}

pub fn box_footer() {
    println!(
        "  {}{}{}",
        style("\u{2570}").fg(colors::CYAN), // ╰
        style("\u{2500}".repeat(BOX_WIDTH - 2)).fg(colors::CYAN),
        style("\u{256F}").fg(colors::CYAN) // ╯
    );
}

/// Eight-cell bar showing the success share of a kind.
pub fn ratio_bar(succeeded: usize, total: usize) -> String {
    let filled = ((succeeded * 8) / total.max(1)).min(8);
    format!(
        "{}{}",
        symbols::PROGRESS_FILLED.repeat(filled),
        symbols::PROGRESS_EMPTY.repeat(8 - filled)
    )
}

/// One row of the per-kind summary.
pub fn kind_line(kind: &str, succeeded: usize, failed: usize) {
    let marker = if failed == 0 {
        style(symbols::TRIANGLE).fg(colors::CYAN)
    } else {
        style(symbols::TRIANGLE).fg(colors::RED)
    };
    let failed_text = if failed == 0 {
        style(format!("{:>3} failed", failed)).dim()
    } else {
        style(format!("{:>3} failed", failed)).fg(colors::RED)
    };
    println!(
        "  {}   {:26} {:>3} ok  {}   {}",
        marker,
        kind,
        succeeded,
        failed_text,
        style(ratio_bar(succeeded, succeeded + failed)).fg(colors::CYAN)
    );
}

pub fn timing(label: &str, duration_ms: u128) {
    println!(
        "  {} {} in {}ms",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        label,
        duration_ms
    );
}

pub fn section(title: &str) {
    println!();
    println!("  {}", style(title).fg(colors::CYAN).bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bar() {
        assert_eq!(ratio_bar(4, 4), symbols::PROGRESS_FILLED.repeat(8));
        assert_eq!(ratio_bar(0, 0), symbols::PROGRESS_EMPTY.repeat(8));
        assert_eq!(
            ratio_bar(1, 2),
            format!("{}{}", symbols::PROGRESS_FILLED.repeat(4), symbols::PROGRESS_EMPTY.repeat(4))
        );
    }
}
