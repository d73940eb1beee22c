//! Output formatting for scan results, store status and capture reports.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use tennis_core::{CaptureSummary, DiscoveredSensor, SessionKey, StopReason, StoreStats, UploadReceipt};

use crate::style::{format_success, format_warning};

/// One scan result, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRow {
    pub name: Option<String>,
    pub identifier: String,
    pub rssi: Option<i16>,
    pub advertises_nus: bool,
}

impl From<&DiscoveredSensor> for ScanRow {
    fn from(sensor: &DiscoveredSensor) -> Self {
        Self {
            name: sensor.name.clone(),
            identifier: sensor.identifier.clone(),
            rssi: sensor.rssi,
            advertises_nus: sensor.advertises_nus,
        }
    }
}

pub fn format_scan_text(rows: &[ScanRow], show_tips: bool) -> String {
    if rows.is_empty() {
        let mut out = String::from("No sensors found.\n");
        if show_tips {
            out.push_str("Make sure the sensor is powered on and advertising.\n");
        }
        return out;
    }

    let name_width = rows
        .iter()
        .map(|r| r.name.as_deref().unwrap_or("Unknown").len())
        .max()
        .unwrap_or(0)
        .max(4);
    let id_width = rows.iter().map(|r| r.identifier.len()).max().unwrap_or(0).max(10);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:<id_width$}  {:>5}  UART",
        "NAME", "IDENTIFIER", "RSSI"
    );
    for row in rows {
        let rssi = row
            .rssi
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<id_width$}  {:>5}  {}",
            row.name.as_deref().unwrap_or("Unknown"),
            row.identifier,
            rssi,
            if row.advertises_nus { "yes" } else { "no" }
        );
    }

    if show_tips {
        let _ = writeln!(out, "\nConnect with: tennis capture --device <IDENTIFIER>");
    }
    out
}

pub fn format_scan_json(rows: &[ScanRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)? + "\n")
}

/// Status line shown while capturing.
pub fn format_progress(stats: &StoreStats, active_points: usize) -> String {
    match &stats.active_session {
        Some(key) => format!(
            "{} frames in {} sessions | session {}: {} frames",
            stats.points, stats.sessions, key, active_points
        ),
        None => format!(
            "{} frames in {} sessions | no active session",
            stats.points, stats.sessions
        ),
    }
}

/// Answer to the `status` line command.
pub fn format_status(stats: &StoreStats, sessions: &[(SessionKey, usize)]) -> String {
    let mut out = format!("{} frames in {} sessions", stats.points, stats.sessions);
    for (key, count) in sessions {
        let marker = if stats.active_session.as_ref() == Some(key) {
            " (active)"
        } else {
            ""
        };
        let _ = write!(out, "\n  {}: {} frames{}", key, count, marker);
    }
    out
}

pub fn format_summary(summary: &CaptureSummary) -> String {
    let reason = match summary.stop_reason {
        StopReason::Disconnected => "sensor disconnected",
        StopReason::Cancelled => "stopped",
        StopReason::FrameLimit => "frame limit reached",
    };
    let mut out = format!(
        "Capture ended ({}): {} frames, {} sessions",
        reason, summary.frames, summary.sessions_opened
    );
    if summary.rejected > 0 {
        let _ = write!(out, ", {} malformed buffers skipped", summary.rejected);
    }
    out
}

pub fn format_receipt(receipt: &UploadReceipt, no_color: bool) -> String {
    let line = format!("{} -> HTTP {}", receipt.url, receipt.status);
    let body = receipt.body.trim();
    let mut out = if receipt.is_success() {
        format_success(&format!("Uploaded: {}", line), no_color)
    } else {
        format_warning(&format!("Upload rejected: {}", line), no_color)
    };
    if !body.is_empty() {
        let _ = write!(out, "\n{}", body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(millis: u64) -> SessionKey {
        SessionKey::from_millis(millis)
    }

    #[test]
    fn test_scan_text_lists_rows() {
        let rows = vec![ScanRow {
            name: Some("Tennis Sensor".to_string()),
            identifier: "AA:BB:CC:DD:EE:FF".to_string(),
            rssi: Some(-61),
            advertises_nus: true,
        }];
        let text = format_scan_text(&rows, false);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("NAME"));
        let row = lines.next().unwrap();
        assert!(row.contains("Tennis Sensor"));
        assert!(row.contains("AA:BB:CC:DD:EE:FF"));
        assert!(row.contains("-61"));
        assert!(row.ends_with("yes"));
    }

    #[test]
    fn test_scan_text_empty() {
        assert_eq!(format_scan_text(&[], false), "No sensors found.\n");
        assert!(format_scan_text(&[], true).contains("powered on"));
    }

    #[test]
    fn test_scan_json() {
        let rows = vec![ScanRow {
            name: None,
            identifier: "1234".to_string(),
            rssi: None,
            advertises_nus: false,
        }];
        let json: serde_json::Value = serde_json::from_str(&format_scan_json(&rows).unwrap()).unwrap();
        assert_eq!(json[0]["identifier"], "1234");
        assert!(json[0]["name"].is_null());
    }

    #[test]
    fn test_progress_line() {
        let stats = StoreStats {
            points: 12,
            sessions: 2,
            active_session: Some(key(1700000000001)),
        };
        assert_eq!(
            format_progress(&stats, 5),
            "12 frames in 2 sessions | session 1700000000001: 5 frames"
        );

        let idle = StoreStats {
            points: 0,
            sessions: 0,
            active_session: None,
        };
        assert_eq!(format_progress(&idle, 0), "0 frames in 0 sessions | no active session");
    }

    #[test]
    fn test_status_marks_active_session() {
        let stats = StoreStats {
            points: 5,
            sessions: 2,
            active_session: Some(key(2)),
        };
        let text = format_status(&stats, &[(key(1), 3), (key(2), 2)]);
        assert_eq!(text, "5 frames in 2 sessions\n  1: 3 frames\n  2: 2 frames (active)");
    }

    #[test]
    fn test_summary() {
        let summary = CaptureSummary {
            frames: 5,
            rejected: 1,
            sessions_opened: 2,
            stop_reason: StopReason::Disconnected,
            connected: false,
        };
        assert_eq!(
            format_summary(&summary),
            "Capture ended (sensor disconnected): 5 frames, 2 sessions, 1 malformed buffers skipped"
        );
    }

    #[test]
    fn test_receipt() {
        let ok = UploadReceipt {
            url: "http://localhost/api/training/data".to_string(),
            status: 200,
            body: "OK\n".to_string(),
        };
        assert_eq!(
            format_receipt(&ok, true),
            "[OK] Uploaded: http://localhost/api/training/data -> HTTP 200\nOK"
        );

        let denied = UploadReceipt {
            status: 401,
            body: String::new(),
            ..ok
        };
        assert_eq!(
            format_receipt(&denied, true),
            "[!!] Upload rejected: http://localhost/api/training/data -> HTTP 401"
        );
    }
}
