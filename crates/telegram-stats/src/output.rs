//! Plain-text tables for the summary and histogram views.
//!
//! JSON output bypasses this module and serializes the data types directly.

use chrono_tz::Tz;
use stats_core::formatting::{format_chat_duration, format_count, percentage};
use stats_core::models::Histogram;
use stats_data::analysis::ChatSummary;
use stats_data::navigation::NavigationState;

/// Right-aligned columns after a left-aligned first column.
fn render_rows(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = header.len();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    format!("{:<width$}", cell, width = widths[i])
                } else {
                    format!("{:>width$}", cell, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule_width = widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1);
    let mut out = String::new();
    out.push_str(&format_row(header));
    out.push('\n');
    out.push_str(&"-".repeat(rule_width));
    out.push('\n');
    for row in rows {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

/// Whole-chat overview: span, per-participant totals and category breakdown.
pub fn render_summary(summary: &ChatSummary, tz: Tz) -> String {
    let total = summary.total_messages as u64;
    let mut out = String::new();

    out.push_str(&format!("Chat: {}\n", summary.name));
    out.push_str(&format!(
        "Messages: {} over {}\n",
        format_count(total),
        format_chat_duration(summary.total_span_ms)
    ));
    if let (Some(first), Some(last)) = (summary.first_message, summary.last_message) {
        out.push_str(&format!(
            "From {} to {}\n",
            first.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            last.with_timezone(&tz).format("%Y-%m-%d %H:%M")
        ));
    }
    out.push('\n');

    let header: Vec<String> = ["Participant", "Messages", "Share", "Characters", "Words"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = summary
        .participants
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                format_count(p.messages),
                format!("{:.1}%", percentage(p.messages, total, 1)),
                format_count(p.characters),
                format_count(p.words),
            ]
        })
        .collect();
    out.push_str(&render_rows(&header, &rows));
    out.push('\n');

    let header: Vec<String> = ["Category", "Messages", "Share"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = summary
        .categories
        .iter()
        .map(|(category, count)| {
            vec![
                category.label().to_string(),
                format_count(*count),
                format!("{:.1}%", percentage(*count, total, 1)),
            ]
        })
        .collect();
    out.push_str(&render_rows(&header, &rows));
    out
}

/// One row per bucket, one column per series, plus a totals row.
pub fn render_histogram(histogram: &Histogram, state: &NavigationState, tz: Tz) -> String {
    let mut out = format!(
        "{} window ending {} (split by {})\n\n",
        capitalize(state.granularity.as_str()),
        state.end.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
        state.split_mode.as_str()
    );

    if histogram.series.is_empty() {
        out.push_str("No series to show: the chat needs two participants.\n");
        return out;
    }

    let mut header = vec!["Period".to_string()];
    header.extend(histogram.series.iter().map(|s| s.key.clone()));
    header.push("Total".to_string());

    let bucket_totals = histogram.bucket_totals();
    let mut rows: Vec<Vec<String>> = histogram
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut row = vec![label.clone()];
            row.extend(
                histogram
                    .series
                    .iter()
                    .map(|s| format_count(s.counts.get(i).copied().unwrap_or(0))),
            );
            row.push(format_count(bucket_totals.get(i).copied().unwrap_or(0)));
            row
        })
        .collect();

    let mut totals = vec!["Total".to_string()];
    totals.extend(histogram.series.iter().map(|s| format_count(s.total())));
    totals.push(format_count(histogram.total()));
    rows.push(totals);

    out.push_str(&render_rows(&header, &rows));
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
