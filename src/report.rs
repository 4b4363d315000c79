use std::fmt::Write;

use clap::ValueEnum;
use owo_colors::OwoColorize;

use poolprobe_api::{
    constants::UNKNOWN_MARKER,
    error::{InternalError, ProbeError, ReportError},
    inventory::{or_unknown, DiskRecord, InventorySnapshot},
};

const RULE_WIDTH: usize = 172;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Renders a snapshot for the terminal or for machine consumption.
pub fn render(
    snapshot: &InventorySnapshot,
    format: OutputFormat,
    color: bool,
) -> Result<String, ProbeError> {
    match format {
        OutputFormat::Table => render_table(snapshot, color),
        OutputFormat::Json => serde_json::to_string_pretty(snapshot)
            .map(|json| json + "\n")
            .structured(InternalError::SerializeInventory),
        OutputFormat::Yaml => {
            serde_yaml::to_string(snapshot).structured(InternalError::SerializeInventory)
        }
    }
}

fn render_table(snapshot: &InventorySnapshot, color: bool) -> Result<String, ProbeError> {
    let mut out = String::new();
    for pool in &snapshot.pools {
        writeln!(out, "\nPool: {}", pool.name).structured(InternalError::WriteReport)?;
        write_section(&mut out, &pool.disks, color)?;
    }

    writeln!(out, "\nUnassigned Devices:").structured(InternalError::WriteReport)?;
    write_section(&mut out, &snapshot.unclaimed, color)?;
    Ok(out)
}

fn write_section(out: &mut String, records: &[DiskRecord], color: bool) -> Result<(), ProbeError> {
    writeln!(
        out,
        "{}",
        format_row([
            "Device", "Size", "Vendor", "Model", "Serial", "/dev/sdX", "/dev/sgX", "STATE", "Year",
            "Written", "SMR",
        ])
    )
    .structured(InternalError::WriteReport)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH)).structured(InternalError::WriteReport)?;

    for record in records {
        let row = record_row(record);
        let written = if color && record.attributes.shingled {
            writeln!(out, "{}", row.red())
        } else {
            writeln!(out, "{row}")
        };
        written.structured(InternalError::WriteReport)?;
    }

    Ok(())
}

fn record_row(record: &DiskRecord) -> String {
    let attributes = &record.attributes;
    let written = attributes
        .bytes_written
        .map(|written| written.to_string())
        .unwrap_or_else(|| UNKNOWN_MARKER.to_owned());

    format_row([
        &record.label(),
        or_unknown(attributes.size.as_deref()),
        or_unknown(attributes.vendor.as_deref()),
        or_unknown(attributes.model.as_deref()),
        or_unknown(attributes.serial.as_deref()),
        &record.disk.to_string_lossy(),
        &record.channel.to_string(),
        &record.state.to_string(),
        &attributes.manufacture_year.to_string(),
        &written,
        if attributes.shingled { "YES" } else { "NO" },
    ])
}

fn format_row(columns: [&str; 11]) -> String {
    let [label, size, vendor, model, serial, disk, channel, state, year, written, smr] = columns;
    format!(
        "{label:<36} {size:<6} {vendor:<10} {model:<24} {serial:<22} {disk:<10} {channel:<10} \
         {state:<10} {year:<12} {written:<12} {smr:<4}"
    )
}
