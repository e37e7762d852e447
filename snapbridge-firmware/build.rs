//! Build script for snapbridge-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates the Wi-Fi credentials and server override taken from the
//!   environment, and generates `net_config.rs`
//! - Locates the CYW43 radio firmware blobs and copies them to OUT_DIR

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Radio firmware files expected in CYW43_FIRMWARE_DIR
const CYW43_BLOBS: [&str; 2] = ["43439A0.bin", "43439A0_clm.bin"];

/// Blob directory used when CYW43_FIRMWARE_DIR is unset
const DEFAULT_CYW43_DIR: &str = "../cyw43-firmware";

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    setup_linker(&out_dir);
    generate_net_config(&out_dir);
    install_radio_firmware(&out_dir);
}

/// Set up linker search paths for memory.x
fn setup_linker(out_dir: &Path) {
    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate network settings and write them out as Rust constants
fn generate_net_config(out_dir: &Path) {
    for var in ["WIFI_SSID", "WIFI_PASSWORD", "SERVER_IP", "SERVER_PORT"] {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    let mut errors = Vec::new();

    let ssid = env::var("WIFI_SSID").unwrap_or_default();
    if ssid.is_empty() {
        errors.push("WIFI_SSID is not set".to_string());
    } else if ssid.len() > 32 {
        errors.push(format!("WIFI_SSID is {} bytes, at most 32 allowed", ssid.len()));
    }

    // An empty password joins an open network
    let password = env::var("WIFI_PASSWORD").unwrap_or_default();
    if !password.is_empty() && !(8..=63).contains(&password.len()) {
        errors.push(format!(
            "WIFI_PASSWORD is {} bytes, WPA2 needs 8-63",
            password.len()
        ));
    }

    let server_ip = match env::var("SERVER_IP") {
        Ok(ip) => match ip.parse::<Ipv4Addr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                errors.push(format!("SERVER_IP '{}' is not an IPv4 address", ip));
                None
            }
        },
        Err(_) => None,
    };

    let server_port = match env::var("SERVER_PORT") {
        Ok(port) => match port.parse::<u16>() {
            Ok(p) if p != 0 => Some(p),
            _ => {
                errors.push(format!("SERVER_PORT '{}' must be 1-65535", port));
                None
            }
        },
        Err(_) => None,
    };

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid network configuration                            ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ║                                                                  ║\n\
            ║  Set WIFI_SSID / WIFI_PASSWORD (and optionally SERVER_IP,        ║\n\
            ║  SERVER_PORT) in the environment and rebuild.                    ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors)
        );
    }

    let server_ip = match server_ip {
        Some(addr) => format!("Some({:?})", addr.octets()),
        None => "None".to_string(),
    };
    let server_port = match server_port {
        Some(port) => format!("Some({})", port),
        None => "None".to_string(),
    };

    let generated = format!(
        "pub const WIFI_SSID: &str = {:?};\n\
         pub const WIFI_PASSWORD: &str = {:?};\n\
         pub const SERVER_IP_OVERRIDE: Option<[u8; 4]> = {};\n\
         pub const SERVER_PORT_OVERRIDE: Option<u16> = {};\n",
        ssid, password, server_ip, server_port
    );
    fs::write(out_dir.join("net_config.rs"), generated).unwrap();
}

/// Copy the CYW43 firmware and CLM blobs next to the build output
fn install_radio_firmware(out_dir: &Path) {
    println!("cargo:rerun-if-env-changed=CYW43_FIRMWARE_DIR");

    let dir = env::var("CYW43_FIRMWARE_DIR").unwrap_or_else(|_| DEFAULT_CYW43_DIR.to_string());
    let dir = Path::new(&dir);

    let missing: Vec<String> = CYW43_BLOBS
        .iter()
        .filter(|blob| !dir.join(blob).is_file())
        .map(|blob| format!("missing {}", blob))
        .collect();

    if !missing.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: CYW43 radio firmware not found                           ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ║                                                                  ║\n\
            ║  Point CYW43_FIRMWARE_DIR at the embassy cyw43-firmware folder.  ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&missing)
        );
    }

    for blob in CYW43_BLOBS {
        let src = dir.join(blob);
        fs::copy(&src, out_dir.join(blob)).unwrap();
        println!("cargo:rerun-if-changed={}", src.display());
    }
}

/// Format error message lines with box drawing
fn format_error_lines(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| {
            let truncated = if e.len() > 62 {
                format!("{}...", &e[..59])
            } else {
                e.clone()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
