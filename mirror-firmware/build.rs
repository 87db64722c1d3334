//! Build script for mirror-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Parses and validates controller.toml, embedding it as postcard

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use mirror_core::config::ControllerConfig;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    setup_linker(&out_dir);
    embed_config(&out_dir);
}

/// Set up linker search paths for memory.x
fn setup_linker(out_dir: &Path) {
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate controller.toml and write the encoded config to OUT_DIR
fn embed_config(out_dir: &Path) {
    println!("cargo:rerun-if-changed=controller.toml");

    let config_path = Path::new("controller.toml");
    let config = if config_path.exists() {
        let text = match fs::read_to_string(config_path) {
            Ok(text) => text,
            Err(e) => fail("Failed to read controller.toml", &e.to_string()),
        };
        match ControllerConfig::from_toml(&text) {
            Ok(config) => config,
            Err(e) => fail("Invalid controller.toml", &format!("{:?}", e)),
        }
    } else {
        println!("cargo:warning=controller.toml not found, embedding defaults");
        ControllerConfig::default()
    };

    let encoded = match postcard::to_allocvec(&config) {
        Ok(bytes) => bytes,
        Err(e) => fail("Failed to encode configuration", &e.to_string()),
    };
    fs::write(out_dir.join("controller.bin"), &encoded).unwrap();

    println!(
        "cargo:warning=controller.toml validated: {}x{} pixels, {} channels",
        config.matrix.width, config.matrix.height, config.actuators.channel_count
    );
}

/// Shorten `line` to at most `width` characters, marking the cut with "..."
fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let cut = line
        .char_indices()
        .nth(width - 3)
        .map_or(line.len(), |(index, _)| index);
    format!("{}...", &line[..cut])
}

fn fail(title: &str, detail: &str) -> ! {
    let lines = detail
        .lines()
        .map(|line| format!("║  {:<64} ║", truncate(line, 64)))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<58} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, lines
    );
}
