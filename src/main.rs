//! aie-profile-ct: CT script generator for AIE performance counters

use std::env;
use std::path::{Path, PathBuf};

use aie_profile_ct::catalog::{StaticCatalog, COUNTER_CATALOG_FILENAME};
use aie_profile_ct::config::Settings;
use aie_profile_ct::parser::timestamps::TIMESTAMP_CSV_FILENAME;
use aie_profile_ct::profile::ct_writer::{CtWriter, CT_OUTPUT_FILENAME};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut csv_arg: Option<String> = None;
    let mut output_arg: Option<String> = None;
    let mut config_arg: Option<String> = None;
    let mut counters_arg: Option<String> = None;
    let mut device_arg: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--csv" => csv_arg = Some(value_after(&args, &mut i, "--csv")?),
            "--output" | "-o" => output_arg = Some(value_after(&args, &mut i, "--output")?),
            "--config" => config_arg = Some(value_after(&args, &mut i, "--config")?),
            "--counters" => counters_arg = Some(value_after(&args, &mut i, "--counters")?),
            "--device" => device_arg = Some(value_after(&args, &mut i, "--device")?),
            "--sample-config" => {
                print!("{}", Settings::sample_config());
                return Ok(());
            }
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                print_usage();
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let settings = match &config_arg {
        Some(path) => Settings::from_file(Path::new(path))?,
        None => Settings::load(),
    };

    let device_id: u64 = match &device_arg {
        Some(id) => id
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid device id: {}", id))?,
        None => 0,
    };

    // All paths are resolved against the invocation directory exactly once;
    // the pipeline itself never queries ambient process state.
    let cwd = env::current_dir()?;
    let csv_path = resolve(&cwd, csv_arg, TIMESTAMP_CSV_FILENAME);
    let output_path = resolve(&cwd, output_arg, CT_OUTPUT_FILENAME);
    let counters_path = resolve(&cwd, counters_arg, COUNTER_CATALOG_FILENAME);

    let catalog = if counters_path.exists() {
        StaticCatalog::from_toml_file(&counters_path, device_id)?
    } else {
        log::warn!(
            "Counter catalog {} not found; no counters are configured",
            counters_path.display()
        );
        StaticCatalog::new()
    };

    let writer = CtWriter::new(&catalog, &settings, device_id);
    if writer.generate(&csv_path, &output_path) {
        println!("Generated {}", output_path.display());
        Ok(())
    } else {
        anyhow::bail!("CT file generation failed; see diagnostics above");
    }
}

/// Consume the value following a flag.
fn value_after(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
}

/// Resolve an optional path argument against the invocation directory.
fn resolve(cwd: &Path, arg: Option<String>, default_name: &str) -> PathBuf {
    match arg {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        }
        None => cwd.join(default_name),
    }
}

fn print_usage() {
    println!("aie-profile-ct - CT script generator for AIE performance counters");
    println!();
    println!("Usage: aie-profile-ct [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --csv <path>       Instrumentation CSV (default: ./{})", TIMESTAMP_CSV_FILENAME);
    println!("  --output <path>    Generated CT script (default: ./{})", CT_OUTPUT_FILENAME);
    println!("  --counters <path>  Counter catalog TOML (default: ./{})", COUNTER_CATALOG_FILENAME);
    println!("  --config <path>    Settings file (default: layered lookup)");
    println!("  --device <id>      Numeric device id (default: 0)");
    println!("  --sample-config    Print a sample settings file and exit");
    println!("  -h, --help         Show this help");
}
