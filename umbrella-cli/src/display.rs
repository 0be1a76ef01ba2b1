//! Human-readable rendering of an update report.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::{Display, Write};
use umbrella_core::{Freshness, UpdateReport};

pub const READY_STATUS: &str = "Ready";
pub const OFFLINE_STATUS: &str = "Offline — showing last saved result";
pub const FAILURE_STATUS: &str = "Couldn't get the forecast. Check your connection and try again.";

pub fn status_line(freshness: Freshness) -> &'static str {
    if freshness.is_degraded() { OFFLINE_STATUS } else { READY_STATUS }
}

/// Whole percent, halves rounded up.
pub fn format_probability(percent: f64) -> String {
    format!("{}", (percent + 0.5).floor())
}

/// Millimetres with one decimal, halves rounded up.
pub fn format_rainfall(mm: f64) -> String {
    format!("{:.1}", (mm * 10.0 + 0.5).floor() / 10.0)
}

pub fn format_updated<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%d %b, %H:%M").to_string()
}

pub fn render(report: &UpdateReport) -> String {
    render_in(report, &Local)
}

fn render_in<Tz>(report: &UpdateReport, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rec = &report.recommendation;
    let mut out = String::new();

    let _ = write!(out, "{} · {}", report.day, report.coordinate.label);
    if let Some(date) = &report.forecast_date {
        let _ = write!(out, " ({date})");
    }
    out.push('\n');

    let _ = writeln!(out, "{} {}", rec.emoji, rec.title);
    let _ = writeln!(out, "{}", rec.subtitle);
    let _ = writeln!(
        out,
        "Chance of rain: {}%   Rainfall: {} mm",
        format_probability(report.probability_max_percent),
        format_rainfall(report.rainfall_sum_mm),
    );
    let _ = writeln!(out, "Updated: {}", format_updated(report.fetched_at, tz));
    let _ = writeln!(out, "Status: {}", status_line(report.freshness));

    out
}
