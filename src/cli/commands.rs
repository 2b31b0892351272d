// CLI command implementations
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use oggscope::theora::SetupHeader;
use oggscope::{inspect, Bitstream, Inspection, Packet};

use crate::cli::{CliError, CliResult, Commands, Config, OutputFormatter};

/// Run the selected subcommand over every file argument
///
/// A file that cannot be read or parsed is reported and skipped; the run
/// fails at the end if any file did.
pub fn run(config: &Config) -> CliResult<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);
    let paths = expand_paths(config.command.files())?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut failed = 0;
    for path in &paths {
        if let Err(e) = run_file(path, &config.command, &formatter, &mut writer) {
            formatter.print_error(&e.to_string());
            failed += 1;
        }
    }
    writer.flush()?;

    if failed > 0 {
        return Err(CliError::Failed(failed, paths.len()));
    }
    Ok(())
}

fn run_file(
    path: &Path,
    command: &Commands,
    formatter: &OutputFormatter,
    writer: &mut impl Write,
) -> CliResult<()> {
    let display = path.display().to_string();
    let data = std::fs::read(path)?;
    debug!(file = %path.display(), bytes = data.len(), "read file");

    let value = match command {
        Commands::Detect { .. } => detect_value(&display, &data),
        Commands::Pages { .. } => {
            serde_json::to_value(&inspect_file(&display, &data, formatter)?.pages)?
        }
        Commands::Streams {
            packets, payload, ..
        } => {
            let inspection = inspect_file(&display, &data, formatter)?;
            streams_value(&inspection, *packets || *payload, *payload)
        }
        Commands::Headers {
            serial, full_setup, ..
        } => {
            let inspection = inspect_file(&display, &data, formatter)?;
            headers_value(&inspection, *serial, *full_setup, formatter)?
        }
    };
    formatter.output(&value, writer)
}

fn inspect_file<'a>(
    display: &str,
    data: &'a [u8],
    formatter: &OutputFormatter,
) -> CliResult<Inspection<'a>> {
    let inspection = inspect(data).map_err(|source| CliError::Inspect {
        path: display.to_string(),
        source,
    })?;
    formatter.print_info(display);
    Ok(inspection)
}

/// Expand file arguments; patterns with glob metacharacters must match something
fn expand_paths(patterns: &[String]) -> CliResult<Vec<PathBuf>> {
    if patterns.is_empty() {
        return Err(CliError::NoFiles);
    }

    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            let path = PathBuf::from(pattern);
            if !path.exists() {
                return Err(CliError::FileNotFound(pattern.clone()));
            }
            paths.push(path);
            continue;
        }

        let entries = glob::glob(pattern).map_err(|e| CliError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        let before = paths.len();
        for entry in entries {
            let path = entry.map_err(|e| CliError::Io(e.into_error()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.len() == before {
            return Err(CliError::FileNotFound(pattern.clone()));
        }
    }
    Ok(paths)
}

fn codec_name(inspection: &Inspection<'_>, serial: u32) -> &'static str {
    if inspection.theora.contains_key(&serial) {
        "theora"
    } else {
        "unknown"
    }
}

fn detect_value(display: &str, data: &[u8]) -> Value {
    match inspect(data) {
        Ok(inspection) => {
            let bitstreams: Vec<Value> = inspection
                .bitstreams
                .keys()
                .map(|&serial| {
                    let mut entry = json!({
                        "serial_number": serial,
                        "codec": codec_name(&inspection, serial),
                    });
                    let ident = inspection
                        .theora
                        .get(&serial)
                        .and_then(|headers| headers.identification.as_ref());
                    if let Some(ident) = ident {
                        entry["picture"] =
                            json!(format!("{}x{}", ident.picture_width, ident.picture_height));
                    }
                    entry
                })
                .collect();
            json!({
                "file": display,
                "format": "ogg",
                "pages": inspection.pages.len(),
                "bitstreams": bitstreams,
            })
        }
        Err(e) => json!({
            "file": display,
            "format": "unknown",
            "error": e.to_string(),
        }),
    }
}

fn packet_value(index: usize, packet: &Packet<'_>, payload: bool) -> Value {
    let mut value = json!({
        "index": index,
        "length": packet.len(),
        "granule_position": packet.granule_position.to_string(),
        "spans": packet.spans(),
    });
    if payload {
        value["payload"] = json!(STANDARD.encode(packet.to_vec()));
    }
    value
}

fn stream_value(inspection: &Inspection<'_>, bitstream: &Bitstream<'_>, packets: bool, payload: bool) -> Value {
    let first_offset = bitstream.pages.first().map(|page| page.offset);
    let last_granule = bitstream
        .pages
        .last()
        .map(|page| page.granule_position().to_string());

    let mut value = json!({
        "serial_number": bitstream.serial_number,
        "codec": codec_name(inspection, bitstream.serial_number),
        "pages": bitstream.pages.len(),
        "packets": bitstream.packets.len(),
        "first_page_offset": first_offset,
        "last_granule_position": last_granule,
    });
    if packets {
        let list: Vec<Value> = bitstream
            .packets
            .iter()
            .enumerate()
            .map(|(i, packet)| packet_value(i, packet, payload))
            .collect();
        value["packet_list"] = Value::Array(list);
    }
    value
}

fn streams_value(inspection: &Inspection<'_>, packets: bool, payload: bool) -> Value {
    Value::Array(
        inspection
            .bitstreams
            .values()
            .map(|bitstream| stream_value(inspection, bitstream, packets, payload))
            .collect(),
    )
}

/// Counts instead of full tables; the Huffman trees alone hold thousands of codes
fn setup_summary(setup: &SetupHeader) -> Value {
    let quant_ranges: Vec<usize> = setup.quant_ranges.iter().map(|range| range.count()).collect();
    let huffman_codes: Vec<usize> = setup.huffman_trees.iter().map(|tree| tree.codes.len()).collect();
    json!({
        "loop_filter_limits": setup.loop_filter_limits,
        "ac_scale": setup.ac_scale,
        "dc_scale": setup.dc_scale,
        "base_matrices": setup.base_matrices.len(),
        "quant_ranges": quant_ranges,
        "huffman_codes": huffman_codes,
    })
}

fn headers_value(
    inspection: &Inspection<'_>,
    serial: Option<u32>,
    full_setup: bool,
    formatter: &OutputFormatter,
) -> CliResult<Value> {
    let mut streams = Vec::new();
    for (&serial_number, headers) in &inspection.theora {
        if serial.map_or(false, |wanted| wanted != serial_number) {
            continue;
        }
        let setup = match &headers.setup {
            Some(setup) if full_setup => serde_json::to_value(setup)?,
            Some(setup) => setup_summary(setup),
            None => Value::Null,
        };
        streams.push(json!({
            "serial_number": serial_number,
            "identification": serde_json::to_value(&headers.identification)?,
            "comments": serde_json::to_value(&headers.comments)?,
            "setup": setup,
        }));
    }
    if streams.is_empty() {
        formatter.print_info("no matching Theora bitstream");
    }
    Ok(Value::Array(streams))
}
