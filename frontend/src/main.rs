use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crabapple_machines::apple1::{Apple1Config, Apple1System, LoadImage};

mod config;

use config::FileConfig;

/// Apple-1 microcomputer emulator.
///
/// Runs a MOS 6502 at ~1 MHz against the classic memory map: 4 KB RAM, a
/// 6820 PIA at $D010-$D013 bridging the keyboard and the video terminal,
/// and ROM overlays for the monitor (and, optionally, BASIC).
///
/// Lines typed on stdin are fed to the keyboard; terminal output is
/// echoed to stdout. A telnet listener serves the same machine over TCP.
#[derive(Debug, Parser)]
#[command(name = "crabapple", version, about)]
struct Args {
    /// ROM image with load address, e.g. roms/monitor.bin@FF00
    #[arg(long = "rom", value_name = "FILE@ADDR", value_parser = parse_image)]
    roms: Vec<LoadImage>,

    /// RAM preload with load address, e.g. programs/demo.bin@0280
    #[arg(long = "load", value_name = "FILE@ADDR", value_parser = parse_image)]
    loads: Vec<LoadImage>,

    /// RAM size in KB (power of two)
    #[arg(long, value_name = "KB")]
    ram_kb: Option<u32>,

    /// Base address (hex) of a disjoint upper RAM window
    #[arg(long, value_name = "ADDR", value_parser = parse_hex_addr)]
    himem: Option<u16>,

    /// Telnet port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Config file (default: <config dir>/crabapple/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_hex_addr(text: &str) -> Result<u16, String> {
    let trimmed = text.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(trimmed, 16).map_err(|e| format!("bad address {text:?}: {e}"))
}

fn parse_image(text: &str) -> Result<LoadImage, String> {
    let (path, addr) = text
        .rsplit_once('@')
        .ok_or_else(|| format!("expected FILE@ADDR, got {text:?}"))?;
    Ok(LoadImage {
        path: PathBuf::from(path),
        address: parse_hex_addr(addr)?,
    })
}

fn build_config(args: &Args) -> Result<Apple1Config, String> {
    let mut config = Apple1Config::default();

    // File config first, explicitly-given files being an error to miss;
    // the default location is allowed to be absent.
    if let Some(path) = &args.config {
        FileConfig::load(path)?.apply(&mut config);
    } else if let Some(path) = FileConfig::default_path()
        && path.is_file()
    {
        FileConfig::load(&path)?.apply(&mut config);
    }

    // Command line wins.
    if let Some(ram_kb) = args.ram_kb {
        config.ram_kb = ram_kb;
    }
    if let Some(himem) = args.himem {
        config.himem = himem;
    }
    if let Some(port) = args.port {
        config.telnet_port = port;
    }
    config.roms.extend(args.roms.iter().cloned());
    config.ram_images.extend(args.loads.iter().cloned());

    if config.roms.is_empty() {
        log::warn!("no ROM images configured; the reset vector comes from RAM");
    }
    Ok(config)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("crabapple: {message}");
            std::process::exit(2);
        }
    };

    let mut system = match Apple1System::build(&config) {
        Ok(system) => system,
        Err(e) => {
            eprintln!("crabapple: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = system.start() {
        eprintln!("crabapple: {e}");
        std::process::exit(1);
    }

    // Echo thread: drain the terminal capture to stdout.
    let terminal = system.terminal().clone();
    std::thread::spawn(move || {
        loop {
            let output = terminal.take_output();
            if !output.is_empty() {
                print!("{}", String::from_utf8_lossy(&output));
                use std::io::Write;
                let _ = std::io::stdout().flush();
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    });

    // Feed stdin lines to the keyboard until EOF or "quit".
    let keyboard = system.keyboard().clone();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("stdin closed: {e}");
                break;
            }
        };
        match line.trim() {
            "quit" => break,
            "reset" => {
                system.reset();
                continue;
            }
            _ => {}
        }
        // Feed the line at roughly the original link speed so the running
        // program sees every keystroke, not just the last one.
        for byte in line.bytes() {
            keyboard.keypress(byte);
            std::thread::sleep(Duration::from_millis(27));
        }
        keyboard.keypress(b'\r');
    }

    system.stop();
}
