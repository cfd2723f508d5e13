//! Terminal rendering for command results

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use mongodesk_connection::{CacheStats, TestOutcome};
use mongodesk_core::DatabaseInfo;
use mongodesk_services::{ConnectionSummary, ErrorEnvelope};
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_connections(connections: &[ConnectionSummary]) {
    if connections.is_empty() {
        println!("No saved connections");
        return;
    }

    let mut table = table();
    table.set_header(vec!["ID", "Name", "Color", "Last connected", "Active"]);
    for conn in connections {
        table.add_row(vec![
            conn.id.to_string(),
            conn.name.clone(),
            conn.color.clone().unwrap_or_default(),
            conn.last_connected_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string()),
            if conn.active { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn print_databases(databases: &[DatabaseInfo]) {
    let mut table = table();
    table.set_header(vec!["Database", "Size on disk", "Empty"]);
    for db in databases {
        table.add_row(vec![
            db.name.clone(),
            db.size_on_disk.map(format_bytes).unwrap_or_default(),
            db.empty.map(|e| e.to_string()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

pub fn print_test_outcome(outcome: &TestOutcome) {
    match &outcome.error {
        None => {
            let version = outcome
                .server_info
                .as_ref()
                .map(|info| info.version.as_str())
                .unwrap_or("unknown");
            println!("Connection OK (server {version})");
            if let Some(databases) = &outcome.databases {
                print_databases(databases);
            }
        }
        Some(failure) => println!("Connection failed: {}", failure.message),
    }
}

pub fn print_stats(stats: &CacheStats) {
    let mut table = table();
    table.set_header(vec!["Connection", "Idle (ms)"]);
    for entry in &stats.connections {
        table.add_row(vec![entry.connection_id.clone(), entry.age_ms.to_string()]);
    }
    println!("{} active connection(s)", stats.active_connections);
    if !stats.is_empty() {
        println!("{table}");
    }
}

pub fn print_error(envelope: &ErrorEnvelope) {
    eprintln!("error [{}]: {}", envelope.error.code, envelope.error.message);
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
