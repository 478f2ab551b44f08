//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};
use serde::Serialize;

use crate::domain::models::{PolicyAction, Verdict};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Borderless table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// BLOCK red, REVIEW yellow, ALLOW green, the rest dimmed.
pub fn style_verdict(verdict: Verdict) -> StyledObject<&'static str> {
    let text = style(verdict.as_str());
    match verdict {
        Verdict::Block => text.red().bold(),
        Verdict::Review => text.yellow(),
        Verdict::Allow => text.green(),
        Verdict::Abstain | Verdict::Error => text.dim(),
    }
}

pub fn style_action(action: PolicyAction) -> StyledObject<&'static str> {
    let text = style(action.as_str());
    match action {
        PolicyAction::Deny => text.red().bold(),
        PolicyAction::Escalate => text.magenta().bold(),
        PolicyAction::Review => text.yellow(),
        PolicyAction::Warn => text.cyan(),
        PolicyAction::Allow => text.green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long justification", 10), "a rathe...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_list_table_headers() {
        let mut table = list_table(&["critic", "verdict"]);
        table.add_row(vec!["safety", "BLOCK"]);
        let rendered = table.to_string();
        assert!(rendered.contains("CRITIC"));
        assert!(rendered.contains("safety"));
    }
}
