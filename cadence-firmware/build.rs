//! Build script for cadence-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates show.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Capacity limits enforced by the firmware's fixed tables
const MAX_SEQUENCES: usize = 20;
const MAX_CUES: usize = 48;
const MAX_SCHEDULES: usize = 128;
const MAX_MOTORS: usize = 12;

const CUE_LEN: usize = 20;
const PATTERN_LEN: usize = 19;

fn main() {
    setup_linker();
    validate_show();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate show.toml at compile time
fn validate_show() {
    println!("cargo:rerun-if-changed=show.toml");

    let show_path = Path::new("show.toml");

    if !show_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: show.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds show.toml as its first-boot show.           ║\n\
            ║  Please create one in the cadence-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(show_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read show.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let show: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in show.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    validate_settings(&show, &mut errors);
    validate_sequences(&show, &mut errors);
    report("Invalid show configuration", &errors);

    println!("cargo:warning=show.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Panic with every collected error
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn int_in_range(
    show: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    match show.get(section).and_then(|s| s.get(key)) {
        None => {}
        Some(toml::Value::Integer(v)) if range.contains(v) => {}
        Some(_) => errors.push(format!(
            "[{}] {} must be an integer in {}..={}",
            section,
            key,
            range.start(),
            range.end()
        )),
    }
}

/// Validate the optional hardware and timing sections
fn validate_settings(show: &toml::Value, errors: &mut Vec<String>) {
    int_in_range(show, "motor", "baud_rate", 1200..=115_200, errors);
    int_in_range(show, "motor", "max_speed_percent", 0..=100, errors);
    int_in_range(show, "motor", "read_timeout_ms", 1..=1000, errors);
    int_in_range(show, "relay", "i2c_address", 0x08..=0x77, errors);
    int_in_range(show, "dmx", "channels", 1..=512, errors);
    int_in_range(show, "dmx", "refresh_interval_ms", 23..=1000, errors);
    int_in_range(show, "scheduler", "tick_interval_ms", 1..=1000, errors);
    int_in_range(show, "clock", "boot_epoch_s", 0..=i64::MAX, errors);

    if let Some(devices) = show.get("motor").and_then(|m| m.get("devices")) {
        match devices.as_array() {
            Some(list) => {
                if list.len() > MAX_MOTORS {
                    errors.push(format!("[motor] at most {} devices", MAX_MOTORS));
                }
                for d in list {
                    if !matches!(d.as_integer(), Some(0..=253)) {
                        errors.push("[motor] devices must be integers in 0..=253".into());
                    }
                }
            }
            None => errors.push("[motor] devices must be an array".into()),
        }
    }
}

/// Validate every [sequence.N] table
fn validate_sequences(show: &toml::Value, errors: &mut Vec<String>) {
    let sequences = match show.get("sequence") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("sequence must be a table of [sequence.N] sections".into());
            return;
        }
        None => {
            println!("cargo:warning=show.toml has no [sequence.N] sections, the show is empty");
            return;
        }
    };

    if sequences.len() > MAX_SEQUENCES {
        errors.push(format!("at most {} sequences", MAX_SEQUENCES));
    }

    let mut schedule_total = 0;
    for (name, sequence) in sequences {
        if name.parse::<u32>().is_err() {
            errors.push(format!("[sequence.{}] id must be a number", name));
        }

        let cues = string_list(sequence, "cues", name, errors);
        if cues.len() > MAX_CUES {
            errors.push(format!("[sequence.{}] at most {} cues", name, MAX_CUES));
        }
        for cue in &cues {
            if cue.len() != CUE_LEN || !cue.starts_with('$') || !cue.ends_with('%') {
                errors.push(format!("[sequence.{}] bad cue '{}'", name, cue));
            } else if !["MOT", "REL", "DMX"].contains(&&cue[6..9]) {
                println!(
                    "cargo:warning=[sequence.{}] cue '{}' has an unknown type and will be ignored",
                    name, cue
                );
            }
        }

        let schedules = string_list(sequence, "schedules", name, errors);
        for pattern in &schedules {
            if pattern.len() != PATTERN_LEN || !pattern.starts_with('$') || !pattern.ends_with('%') {
                errors.push(format!("[sequence.{}] bad schedule '{}'", name, pattern));
            }
        }
        schedule_total += schedules.len();
    }

    if schedule_total > MAX_SCHEDULES {
        errors.push(format!("at most {} schedules in total", MAX_SCHEDULES));
    }
}

fn string_list(
    sequence: &toml::Value,
    key: &str,
    name: &str,
    errors: &mut Vec<String>,
) -> Vec<String> {
    match sequence.get(key) {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(s) => Some(s.to_string()),
                None => {
                    errors.push(format!("[sequence.{}] {} must be strings", name, key));
                    None
                }
            })
            .collect(),
        Some(_) => {
            errors.push(format!("[sequence.{}] {} must be an array", name, key));
            Vec::new()
        }
    }
}
