//! Text rendering of the feed: one line per stream for the list, and a
//! detailed view of the selected stream with its packets.

use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::api::types::{Packet, StreamWithPackets};

/// One row of the stream list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRow {
    pub id: i64,
    pub service: String,
    pub port: u16,
    pub rules: Vec<String>,
    pub at: String,
}

impl From<&StreamWithPackets> for StreamRow {
    fn from(entry: &StreamWithPackets) -> Self {
        let stream = &entry.stream;
        Self {
            id: stream.id,
            service: stream.service_name.clone(),
            port: stream.service_port,
            rules: stream.rules.iter().map(|r| r.name.clone()).collect(),
            at: short_time(&stream.started_at),
        }
    }
}

/// Time of day of a backend timestamp, or the timestamp itself when it is in
/// a format we do not recognize.
pub fn short_time(timestamp: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return parsed.format("%H:%M:%S").to_string();
    }
    let naive = timestamp.trim_end_matches(" UTC");
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return parsed.format("%H:%M:%S").to_string();
        }
    }
    timestamp.to_string()
}

pub fn render_row(entry: &StreamWithPackets) -> String {
    let row = StreamRow::from(entry);
    let rules = if row.rules.is_empty() {
        "-".to_string()
    } else {
        row.rules.join(",")
    };
    format!(
        "#{:<6} {:<16} {:>5}  {:<24} {}",
        row.id, row.service, row.port, rules, row.at
    )
}

/// Payload text with every colored segment wrapped as `[text](color)`.
pub fn render_payload(packet: &Packet) -> String {
    let mut out = String::new();
    for segment in &packet.payload {
        if segment.color.is_empty() {
            out.push_str(&segment.text);
        } else {
            let _ = write!(out, "[{}]({})", segment.text, segment.color);
        }
    }
    out
}

pub fn render_stream(entry: &StreamWithPackets) -> String {
    let stream = &entry.stream;
    let mut out = format!(
        "Stream #{} {}:{} started {}",
        stream.id, stream.service_name, stream.service_port, stream.started_at
    );
    match &stream.ended_at {
        Some(ended) => {
            let _ = write!(out, ", ended {}", ended);
        }
        None => out.push_str(", open"),
    }
    out.push('\n');

    for packet in &entry.packets {
        let _ = writeln!(out, "--- {} {}", packet.direction, packet.at);
        out.push_str(&render_payload(packet));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
