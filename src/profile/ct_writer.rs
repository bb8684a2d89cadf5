//! CT script rendering and orchestration.
//!
//! The CT format drives the downstream trace runtime. A script is a
//! sequence of blocks:
//!
//! ```text
//! begin { ... }                              executed once at startup
//! jprobe:<file>:uc<N>:line<L1,L2,...> { ... } fired at each listed line
//! end { ... }                                executed once at shutdown
//! ```
//!
//! Each block may carry an embedded scripting sub-block between
//! `@blockopen` and `@blockclose` markers; the runtime hands those lines to
//! its embedded interpreter to accumulate and finally serialize the
//! captured samples. The generator treats the embedded snippets as opaque
//! templated text with well-defined insertion points; it never parses them
//! back.
//!
//! Rendering is pure string building, split from file I/O so the exact
//! output bytes can be tested hermetically.

use crate::catalog::StaticCatalog;
use crate::config::Settings;
use crate::device::registers::{format_address, AieGeometry};
use crate::parser::timestamps::{read_asm_info, AsmFileInfo};
use crate::profile::counters::{build_counters, filter_counters_by_column, CtCounter};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the generated CT script in the invocation directory.
pub const CT_OUTPUT_FILENAME: &str = "aie_profile.ct";

/// Name of the JSON file the executed script writes its samples to.
pub const COUNTER_JSON_FILENAME: &str = "aie_profile_counters.json";

/// Generates the CT script for one device's configured counters.
pub struct CtWriter<'a> {
    catalog: &'a StaticCatalog,
    settings: &'a Settings,
    device_id: u64,
    geometry: AieGeometry,
}

impl<'a> CtWriter<'a> {
    /// Create a writer for one device.
    ///
    /// The address packing geometry is captured from the settings at
    /// construction.
    pub fn new(catalog: &'a StaticCatalog, settings: &'a Settings, device_id: u64) -> Self {
        let geometry = settings.geometry();
        Self {
            catalog,
            settings,
            device_id,
            geometry,
        }
    }

    /// Run the full generation pipeline.
    ///
    /// Returns false when the inputs are insufficient or the output cannot
    /// be written; no partial CT file is considered valid. All paths are
    /// explicit so callers resolve the invocation directory exactly once.
    pub fn generate(&self, csv_path: &Path, output_path: &Path) -> bool {
        let mut asm_files = read_asm_info(csv_path);
        if asm_files.is_empty() {
            log::debug!("No control file information found in CSV. CT file will not be generated.");
            return false;
        }

        // Per-tile metric assignment is rebuilt from settings every time;
        // the shared catalog may not hold the current configuration yet.
        let profile_config = self.settings.create_profile_config();
        let all_counters =
            build_counters(self.catalog, self.device_id, &profile_config, self.geometry);
        if all_counters.is_empty() {
            log::debug!("No counters configured. CT file will not be generated.");
            return false;
        }

        let mut has_timestamps = false;
        for asm_file in &mut asm_files {
            if !asm_file.timestamps.is_empty() {
                has_timestamps = true;
            }
            asm_file.counters =
                filter_counters_by_column(&all_counters, asm_file.col_start, asm_file.col_end);
        }

        if !has_timestamps {
            log::debug!("No capture points found in CSV. CT file will not be generated.");
            return false;
        }

        let script = render_ct_script(&asm_files, &all_counters);
        match std::fs::write(output_path, script) {
            Ok(()) => {
                log::info!("Generated CT file: {}", output_path.display());
                true
            }
            Err(e) => {
                log::warn!("Unable to create CT file {}: {}", output_path.display(), e);
                false
            }
        }
    }
}

/// Render the complete CT script.
///
/// Deterministic: the same inputs produce byte-identical output. The
/// metadata section lists every catalog counter; probe blocks are emitted
/// only for files with both capture points and assigned counters.
pub fn render_ct_script(asm_files: &[AsmFileInfo], all_counters: &[CtCounter]) -> String {
    let mut out = String::new();

    out.push_str("# Auto-generated CT file for AIE Profile counters\n");
    out.push_str("# Generated by the AIE profile CT writer\n\n");

    render_begin_block(&mut out, all_counters);

    for asm_file in asm_files {
        if asm_file.timestamps.is_empty() || asm_file.counters.is_empty() {
            continue;
        }
        render_probe_block(&mut out, asm_file);
    }

    render_end_block(&mut out);

    out
}

/// Start block: capture the start timestamp and initialize the result
/// structure with one metadata entry per counter.
fn render_begin_block(out: &mut String, all_counters: &[CtCounter]) {
    out.push_str("begin\n");
    out.push_str("{\n");
    out.push_str("    ts_start = timestamp32()\n");
    out.push_str("    print(\"\\nAIE Profile tracing started\\n\")\n");
    out.push_str("@blockopen\n");
    out.push_str("import json\n");
    out.push_str("import os\n");
    out.push('\n');
    out.push_str("# Initialize data collection\n");
    out.push_str("profile_data = {\n");
    out.push_str("    \"start_timestamp\": ts_start,\n");
    out.push_str("    \"counter_metadata\": [\n");

    for (i, counter) in all_counters.iter().enumerate() {
        out.push_str(&format!(
            "        {{\"column\": {}, \"row\": {}, \"counter\": {}, \"module\": \"{}\", \"address\": \"{}\"",
            counter.column,
            counter.row,
            counter.counter_number,
            counter.module,
            format_address(counter.address)
        ));

        if let Some(metric_set) = &counter.metric_set {
            out.push_str(&format!(", \"metric_set\": \"{}\"", metric_set));
        }
        if let Some(direction) = counter.port_direction {
            out.push_str(&format!(", \"port_direction\": \"{}\"", direction));
        }

        out.push('}');
        if i + 1 < all_counters.len() {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str("    ],\n");
    out.push_str("    \"probes\": []\n");
    out.push_str("}\n");
    out.push_str("@blockclose\n");
    out.push_str("}\n\n");
}

/// Probe block for one control file: read every assigned counter at each
/// capture line and append a sample grouped by owning tile.
fn render_probe_block(out: &mut String, asm_file: &AsmFileInfo) {
    let basename = base_name(&asm_file.filename);

    out.push_str(&format!(
        "# Probes for {} (columns {}-{})\n",
        basename, asm_file.col_start, asm_file.col_end
    ));

    let lines: Vec<String> = asm_file
        .timestamps
        .iter()
        .map(|t| t.line_number.to_string())
        .collect();
    out.push_str(&format!(
        "jprobe:{}:uc{}:line{}\n",
        basename,
        asm_file.uc_number,
        lines.join(",")
    ));
    out.push_str("{\n");
    out.push_str("    ts = timestamp32()\n");

    for (i, counter) in asm_file.counters.iter().enumerate() {
        out.push_str(&format!(
            "    ctr_{} = read_reg({})\n",
            i,
            format_address(counter.address)
        ));
    }

    // Samples are grouped by owning tile, tiles in (col, row) order,
    // counters within a tile in filtered order.
    let mut tile_counters: BTreeMap<(u8, u8), Vec<usize>> = BTreeMap::new();
    for (i, counter) in asm_file.counters.iter().enumerate() {
        tile_counters
            .entry((counter.column, counter.row))
            .or_default()
            .push(i);
    }

    out.push_str("    print(f\"Probe fired: ts={ts}\")\n");
    out.push_str("@blockopen\n");
    out.push_str("profile_data[\"probes\"].append({\n");
    out.push_str(&format!("    \"asm_file\": \"{}\",\n", basename));
    out.push_str("    \"timestamp\": ts,\n");
    out.push_str("    \"tiles\": [\n");

    for (tile_idx, ((col, row), indices)) in tile_counters.iter().enumerate() {
        let locals: Vec<String> = indices.iter().map(|i| format!("ctr_{}", i)).collect();
        out.push_str(&format!(
            "        {{\"col\": {}, \"row\": {}, \"counters\": [{}]}}",
            col,
            row,
            locals.join(", ")
        ));
        if tile_idx + 1 < tile_counters.len() {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str("    ]\n");
    out.push_str("})\n");
    out.push_str("@blockclose\n");
    out.push_str("}\n\n");
}

/// End block: record the end timestamp and serialize the result structure
/// next to the runtime's working directory.
fn render_end_block(out: &mut String) {
    out.push_str("end\n");
    out.push_str("{\n");
    out.push_str("    ts_end = timestamp32()\n");
    out.push_str("    print(\"\\nAIE Profile tracing ended\\n\")\n");
    out.push_str("@blockopen\n");
    out.push_str("profile_data[\"end_timestamp\"] = ts_end\n");
    out.push_str("profile_data[\"total_time\"] = ts_end - profile_data[\"start_timestamp\"]\n");
    out.push('\n');
    out.push_str(&format!(
        "output_path = os.path.join(os.getcwd(), \"{}\")\n",
        COUNTER_JSON_FILENAME
    ));
    out.push_str("with open(output_path, \"w\") as f:\n");
    out.push_str("    json.dump(profile_data, f, indent=2)\n");
    out.push_str("print(f\"Profile data written to {output_path}\")\n");
    out.push_str("@blockclose\n");
    out.push_str("}\n");
}

/// Base name of a control file path; CSV rows usually carry the bare
/// filename already.
fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}
