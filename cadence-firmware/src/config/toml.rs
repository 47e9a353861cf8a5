//! Simple TOML parser for the show file
//!
//! This is a minimal TOML parser that handles only the subset used by
//! `show.toml`. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - Hex integers (`0x38`)
//! - [section] and [sequence.N] headers
//! - String and integer arrays, on one line or spread over several
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings
//! - Inline tables
//! - Dotted keys outside section headers
//!
//! Cues and schedules are handed straight to the [`SequenceStore`], so a
//! show that parses here is already validated against the store limits.

use alloc::string::String;
use alloc::vec::Vec;

use cadence_core::config::{SystemConfig, MAX_MOTORS};
use cadence_core::scheduler::{SequenceStore, StoreError};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Array opened but never closed
    UnterminatedArray,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// A cue or schedule was rejected by the store
    Store(StoreError),
}

impl From<StoreError> for ParseError {
    fn from(e: StoreError) -> Self {
        ParseError::Store(e)
    }
}

/// Settings read from the show file alongside the show itself
#[derive(Debug, Clone, Default)]
pub struct ShowSettings {
    pub config: SystemConfig,
    /// Motor controllers to register at boot
    pub motors: heapless::Vec<u8, MAX_MOTORS>,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Motor,
    Relay,
    Dmx,
    Scheduler,
    Clock,
    Sequence(u32),
}

/// Parse a show file
///
/// Settings are returned; sequences and schedules are added to `store`.
/// On error the store may hold part of the show and should be cleared.
pub fn parse_show(input: &str, store: &mut SequenceStore) -> Result<ShowSettings, ParseError> {
    let mut settings = ShowSettings::default();
    let mut section = Section::Root;

    // Array value being collected over several lines
    let mut pending: Option<(String, String)> = None;

    for line in input.lines() {
        let line = strip_comment(line).trim();

        if let Some((key, mut value)) = pending.take() {
            value.push(' ');
            value.push_str(line);
            if line.ends_with(']') {
                apply_value(section, &key, &value, &mut settings, store)?;
            } else {
                pending = Some((key, value));
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            if let Section::Sequence(id) = section {
                store.add_sequence(id)?;
            }
            continue;
        }

        let Some((key, value)) = parse_key_value(line) else {
            continue;
        };

        if value.starts_with('[') && !value.ends_with(']') {
            pending = Some((String::from(key), String::from(value)));
            continue;
        }

        apply_value(section, key, value, &mut settings, store)?;
    }

    if pending.is_some() {
        return Err(ParseError::UnterminatedArray);
    }

    Ok(settings)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    if let Some((kind, name)) = header.split_once('.') {
        return match kind {
            "sequence" => name
                .trim()
                .parse()
                .map(Section::Sequence)
                .map_err(|_| ParseError::InvalidSection),
            _ => Err(ParseError::InvalidSection),
        };
    }

    match header {
        "motor" => Ok(Section::Motor),
        "relay" => Ok(Section::Relay),
        "dmx" => Ok(Section::Dmx),
        "scheduler" => Ok(Section::Scheduler),
        "clock" => Ok(Section::Clock),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment unless the `#` sits inside a string
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) if line[..pos].matches('"').count() % 2 == 0 => &line[..pos],
        _ => line,
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseError::InvalidValue)
    }
}

fn parse_int<T: TryFrom<i64>>(value: &str) -> Result<T, ParseError> {
    let raw = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    let raw = raw.map_err(|_| ParseError::InvalidValue)?;
    T::try_from(raw).map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Split `[a, b, c]` into trimmed items, allowing a trailing comma
fn parse_array(value: &str) -> Result<Vec<&str>, ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    Ok(inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect())
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    settings: &mut ShowSettings,
    store: &mut SequenceStore,
) -> Result<(), ParseError> {
    let config = &mut settings.config;

    match section {
        Section::Root => {}
        Section::Motor => match key {
            "baud_rate" => config.motor.baud_rate = parse_int(value)?,
            "max_speed_percent" => config.motor.max_speed_percent = parse_int(value)?,
            "crc_enabled" => config.motor.crc_enabled = parse_bool(value)?,
            "read_timeout_ms" => config.motor.read_timeout_ms = parse_int(value)?,
            "devices" => {
                settings.motors.clear();
                for item in parse_array(value)? {
                    settings
                        .motors
                        .push(parse_int(item)?)
                        .map_err(|_| ParseError::TooManyItems)?;
                }
            }
            _ => {}
        },
        Section::Relay => {
            if key == "i2c_address" {
                config.relay.i2c_address = parse_int(value)?;
            }
        }
        Section::Dmx => match key {
            "channels" => config.dmx.channels = parse_int(value)?,
            "refresh_interval_ms" => config.dmx.refresh_interval_ms = parse_int(value)?,
            _ => {}
        },
        Section::Scheduler => match key {
            "tick_interval_ms" => config.scheduler.tick_interval_ms = parse_int(value)?,
            "autostart" => config.scheduler.autostart = parse_bool(value)?,
            _ => {}
        },
        Section::Clock => {
            if key == "boot_epoch_s" {
                config.clock.boot_epoch_s = parse_int(value)?;
            }
        }
        Section::Sequence(id) => match key {
            "cues" => {
                for item in parse_array(value)? {
                    store.append_cue(id, parse_string(item)?)?;
                }
            }
            "schedules" => {
                for item in parse_array(value)? {
                    store.add_schedule(id, parse_string(item)?)?;
                }
            }
            _ => {}
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::MAX_CUES;
    use cadence_protocol::{CueError, CueKind};

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("motor"), Ok(Section::Motor));
        assert_eq!(parse_section_header("sequence.12"), Ok(Section::Sequence(12)));
        assert_eq!(parse_section_header("sequence.x"), Err(ParseError::InvalidSection));
        assert_eq!(parse_section_header("lights"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int::<u8>("0x38"), Ok(0x38));
        assert_eq!(parse_int::<u32>("9600"), Ok(9600));
        assert_eq!(parse_int::<i64>("-5"), Ok(-5));
        assert_eq!(parse_int::<u8>("300"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("ten"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_comment_inside_string_is_kept() {
        assert_eq!(strip_comment(r#"a = "x#y" # note"#).trim(), r#"a = "x#y""#);
        assert_eq!(strip_comment("b = 1 # note").trim(), "b = 1");
    }

    #[test]
    fn test_parse_settings() {
        let input = r#"
[motor]
baud_rate = 19200
max_speed_percent = 80 # limiter
crc_enabled = true
devices = [1, 2, 13]

[relay]
i2c_address = 0x20

[dmx]
channels = 64

[scheduler]
autostart = false

[clock]
boot_epoch_s = 1700000000
"#;
        let mut store = SequenceStore::new();
        let settings = parse_show(input, &mut store).unwrap();
        let config = settings.config;

        assert_eq!(config.motor.baud_rate, 19200);
        assert_eq!(config.motor.max_speed_percent, 80);
        assert!(config.motor.crc_enabled);
        assert_eq!(config.relay.i2c_address, 0x20);
        assert_eq!(config.dmx.channels, 64);
        assert!(!config.scheduler.autostart);
        assert_eq!(config.clock.boot_epoch_s, 1_700_000_000);
        assert_eq!(settings.motors.as_slice(), &[1, 2, 13]);
        assert_eq!(store.sequence_count(), 0);
    }

    #[test]
    fn test_parse_sequences() {
        let input = r#"
[sequence.3]
cues = [
    "$00000MOT0105012300%",
    "$00500REL0110000000%",   # relay on
]
schedules = ["$********WDY120000%"]

[sequence.9]
"#;
        let mut store = SequenceStore::new();
        parse_show(input, &mut store).unwrap();

        let seq = store.sequence(3).unwrap();
        assert_eq!(seq.cues().len(), 2);
        assert_eq!(seq.cues()[1].kind(), CueKind::Relay);
        assert_eq!(store.schedules()[0].text(), "$********WDY120000%");
        // Empty sections still create the sequence
        assert!(store.sequence(9).is_some());
    }

    #[test]
    fn test_bad_cue_is_reported() {
        let input = "[sequence.1]\ncues = [\"$00000MOT01050%\"]\n";
        let mut store = SequenceStore::new();
        assert_eq!(
            parse_show(input, &mut store).unwrap_err(),
            ParseError::Store(StoreError::Cue(CueError::Length))
        );
    }

    #[test]
    fn test_unterminated_array() {
        let input = "[sequence.1]\ncues = [\n\"$00000MOT0105012300%\",\n";
        let mut store = SequenceStore::new();
        assert_eq!(
            parse_show(input, &mut store).unwrap_err(),
            ParseError::UnterminatedArray
        );
    }

    #[test]
    fn test_cue_capacity() {
        let mut input = String::from("[sequence.1]\ncues = [\n");
        for _ in 0..=MAX_CUES {
            input.push_str("\"$00000MOT0105012300%\",\n");
        }
        input.push_str("]\n");

        let mut store = SequenceStore::new();
        assert_eq!(
            parse_show(&input, &mut store).unwrap_err(),
            ParseError::Store(StoreError::Capacity)
        );
    }
}
