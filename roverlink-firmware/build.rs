//! Build script for roverlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates controller.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keys accepted in each table, root first
const KNOWN_KEYS: [(&str, &[&str]); 5] = [
    ("", &["version", "board", "stats_interval_ticks"]),
    ("link", &["rover_id", "frequency_hz", "tx_power_dbm", "pa_boost"]),
    (
        "timing",
        &["settle_ms", "reply_timeout_ms", "tick_delay_ms", "reset_pulse_ms"],
    ),
    ("input", &["mode", "hold", "ping_command"]),
    ("pins", &["cs", "irq", "reset", "led"]),
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate controller.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=controller.toml");

    let config_path = Path::new("controller.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: controller.toml not found!                               ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds controller.toml at build time.              ║\n\
            ║  Please create one in the roverlink-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read controller.toml                           ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Syntax first, with the full TOML parser for good messages
    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in controller.toml                   ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    report("Unknown keys in controller.toml", check_known_keys(&config));

    // Then the same parser and checks the firmware runs at boot
    let parsed = match roverlink_core::config::parse_config(&config_content) {
        Ok(parsed) => parsed,
        Err(e) => {
            report(
                "controller.toml rejected by the firmware parser",
                vec![format!("line {}: {:?}", e.line, e.kind)],
            );
            return;
        }
    };
    if let Err(e) = parsed.validate() {
        report("Invalid controller configuration", vec![format!("{:?}", e)]);
    }

    println!("cargo:warning=controller.toml validated successfully");
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

/// Fail the build with a boxed list of errors
fn report(title: &str, errors: Vec<String>) {
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

/// Every table and key must be one the firmware parser understands
fn check_known_keys(config: &toml::Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(root) = config.as_table() else {
        return errors;
    };
    let root_keys = KNOWN_KEYS[0].1;

    for (key, value) in root {
        match value {
            toml::Value::Table(table) => {
                let known = KNOWN_KEYS[1..].iter().find(|(name, _)| *name == key.as_str());
                let Some((_, keys)) = known else {
                    errors.push(format!("unknown section [{}]", key));
                    continue;
                };
                for inner in table.keys() {
                    if !keys.contains(&inner.as_str()) {
                        errors.push(format!("[{}] unknown key '{}'", key, inner));
                    }
                }
            }
            _ if root_keys.contains(&key.as_str()) => {}
            _ => errors.push(format!("unknown key '{}'", key)),
        }
    }
    errors
}
