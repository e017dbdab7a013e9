//! Status table rendering.

use cairn_migration::{StatusReport, pretty};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use super::colors::Tone;

fn status_color(tone: Tone) -> Color {
    match tone {
        Tone::Success => Color::Green,
        Tone::Warning => Color::Yellow,
        Tone::Error => Color::Red,
        Tone::Code => Color::Blue,
        Tone::Muted | Tone::Header => Color::DarkGrey,
    }
}

/// One row per migration: state, pretty name, filename.
pub fn status_table(report: &StatusReport) -> Table {
    let mut table = Table::new();

    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = ["Status", "Migration", "File"]
        .into_iter()
        .map(|title| {
            if super::no_color() {
                Cell::new(title)
            } else {
                Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)
            }
        })
        .collect();
    table.set_header(header);

    for entry in &report.entries {
        let label = entry.status.label();
        let status = if super::no_color() {
            Cell::new(label)
        } else {
            Cell::new(label).fg(status_color(Tone::for_status(&entry.status)))
        };
        table.add_row(vec![
            status,
            Cell::new(pretty(&entry.filename)),
            Cell::new(&entry.filename),
        ]);
    }

    table
}
