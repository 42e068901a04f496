use chrono::{DateTime, Utc};
use colored::Colorize;
use resume_sync::config::SyncConfig;
use resume_sync::diff::FieldDiff;
use resume_sync::document::DocumentStore;
use resume_sync::model::{JobRecord, SectionId};
use resume_sync::session::SessionCache;
use resume_sync::store::{DoctorReport, StorageBackend};
use serde_json::Value;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const STATUS_WIDTH: usize = 16;
const PENDING_MARKER: &str = "⟳";

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn info(message: &str) {
    println!("{}", message.dimmed());
}

pub fn warning(message: &str) {
    println!("{}", message.yellow());
}

pub fn print_document<B: StorageBackend>(store: &DocumentStore<B>) {
    let state = store.state();
    let doc = store.active();

    if doc.is_empty() {
        info("No active resume.");
    } else {
        let name = if doc.personal_info.name.is_empty() {
            "(unnamed)"
        } else {
            doc.personal_info.name.as_str()
        };
        let saved = if state.is_saved {
            "saved".green()
        } else {
            "unsaved".yellow()
        };
        println!("{} [{}]", name.bold(), saved);
        if !doc.summary.is_empty() {
            println!("{}", truncate_to_width(&doc.summary, LINE_WIDTH));
        }
        println!("--------------------------------");

        let visibility = store.visibility();
        for section in &state.section_order {
            let shown = match section {
                SectionId::Summary => visibility.show_summary,
                SectionId::Leadership => visibility.show_leadership,
                SectionId::Projects => visibility.show_projects,
                SectionId::Publications => visibility.show_publications,
                _ => true,
            };
            let label = format!("{:<14}{:>3}", section.as_str(), doc.section_len(*section));
            if shown {
                println!("  {}", label);
            } else {
                println!("  {} {}", label.dimmed(), "(hidden)".dimmed());
            }
        }
    }

    match store.last_selected() {
        Some((snapshot, id)) => println!(
            "\nLast selected: {} {}",
            id.yellow(),
            snapshot.personal_info.name
        ),
        None => info("\nNo resume selected."),
    }
}

pub fn print_jobs<B: StorageBackend>(cache: &SessionCache<B>, records: &[&JobRecord]) {
    if records.is_empty() {
        println!("No jobs found.");
        return;
    }

    let id_width = records.iter().map(|r| r.job_id.width()).max().unwrap_or(0) + 2;

    for record in records {
        let status = cache.effective_status(record);
        let pending = cache.pending(&record.job_id).is_some();

        let idx_str = format!("{:<width$}", record.job_id, width = id_width);
        let marker = if pending { PENDING_MARKER } else { " " };
        let status_str = truncate_to_width(status, STATUS_WIDTH);
        let status_padded = format!(
            "{}{}",
            status_str,
            " ".repeat(STATUS_WIDTH.saturating_sub(status_str.width()))
        );

        let fixed_width = 2 + id_width + STATUS_WIDTH + 2 + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let title = format!("{} @ {}", record.title, record.company);
        let title_display = truncate_to_width(&title, available);
        let padding = available.saturating_sub(title_display.width());

        let status_colored = if pending {
            status_padded.yellow()
        } else {
            status_padded.normal()
        };

        println!(
            "  {}{}{}{} {}{}",
            idx_str.yellow(),
            title_display,
            " ".repeat(padding),
            status_colored,
            marker,
            format_time_ago(record.updated_at).dimmed()
        );
    }
}

pub fn print_diff(diff: &FieldDiff) {
    if diff.is_empty() {
        println!("No differences.");
        return;
    }

    for path in diff.after.paths() {
        println!("{}", path.to_string().bold());
        if let Some(before) = diff.before.get(path) {
            println!("  {} {}", "-".red(), render_value(before).red());
        }
        if let Some(after) = diff.after.get(path) {
            println!("  {} {}", "+".green(), render_value(after).green());
        }
    }
}

pub fn print_doctor(label: &str, report: &DoctorReport) {
    let line = format!(
        "{}: {} checked, {} corrupt removed, {} pending flushed",
        label, report.checked, report.removed_corrupt, report.flushed_pending
    );
    if report.removed_corrupt > 0 {
        warning(&line);
    } else {
        success(&line);
    }
}

pub fn print_config(config: &SyncConfig) {
    for key in SyncConfig::keys() {
        if let Some(value) = config.get(key) {
            println!("{} = {}", key, value);
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => s.clone(),
        other => truncate_to_width(&other.to_string(), LINE_WIDTH - 4),
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
