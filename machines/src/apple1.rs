use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crabapple_core::bus::{MemoryBus, Ram, Rom, SetupError};
use crabapple_core::cpu::{CpuControl, CpuThread, Mos6502};
use crabapple_core::device::Pia6820;
use crabapple_core::peripheral::{AsciiKeyboard, Peripheral, VideoTerminal};

use crate::telnet::TelnetServer;

// ---------------------------------------------------------------------------
// Memory map
//
// | Range           | Provider                                   |
// |-----------------|--------------------------------------------|
// | 0x0000..0x0FFF  | RAM (4 KB default)                         |
// | 0xD010..0xD013  | PIA registers (mirrored across 2 KB)       |
// | 0xE000..0xEFFF  | BASIC ROM (optional)                       |
// | 0xFF00..0xFFFF  | monitor ROM, reset vector at 0xFFFC/0xFFFD |
// ---------------------------------------------------------------------------

pub const PIA_BASE: u16 = 0xD000;
pub const KEYBOARD_DATA: u16 = 0xD010;
pub const KEYBOARD_CR: u16 = 0xD011;
pub const DISPLAY_DATA: u16 = 0xD012;
pub const DISPLAY_CR: u16 = 0xD013;

/// Errors that keep the machine from starting.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("failed to bind telnet port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("failed to spawn thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// A raw binary image and the address it loads at.
#[derive(Debug, Clone)]
pub struct LoadImage {
    pub path: PathBuf,
    pub address: u16,
}

/// Boot configuration for the machine.
#[derive(Debug, Clone)]
pub struct Apple1Config {
    /// RAM size in kilobytes; must be a power of two.
    pub ram_kb: u32,
    /// Base of a disjoint upper RAM window; 0 disables it.
    pub himem: u16,
    /// ROM overlays (monitor, BASIC, ...).
    pub roms: Vec<LoadImage>,
    /// RAM preloads (programs, saved snapshots).
    pub ram_images: Vec<LoadImage>,
    /// TCP port served by the telnet front door.
    pub telnet_port: u16,
    /// How long the terminal stays busy after each character, modeling
    /// the ~60 cps display link.
    pub output_delay: Duration,
}

impl Default for Apple1Config {
    fn default() -> Self {
        Self {
            ram_kb: 4,
            himem: 0,
            roms: Vec::new(),
            ram_images: Vec::new(),
            telnet_port: 2121,
            output_delay: Duration::from_micros(16_667),
        }
    }
}

/// The wired-up machine: bus, CPU, PIA and peripherals, plus the host
/// threads that keep them alive.
///
/// `build` assembles everything and leaves the CPU stopped with a RESET
/// pending; `start` brings up the peripheral threads and then the CPU
/// thread; `stop` tears them down in the opposite order.
pub struct Apple1System {
    bus: Arc<MemoryBus>,
    keyboard: Arc<AsciiKeyboard>,
    terminal: Arc<VideoTerminal>,
    pia: Arc<Pia6820>,
    roms: Vec<Arc<Rom>>,
    control: Arc<CpuControl>,
    cpu: Option<Mos6502>,
    cpu_thread: Option<CpuThread>,
    telnet: TelnetServer,
    display_stop: Arc<AtomicBool>,
    display_thread: Option<JoinHandle<()>>,
}

impl Apple1System {
    pub fn build(config: &Apple1Config) -> Result<Self, MachineError> {
        let ram = Ram::new(config.ram_kb, config.himem)?;
        let bus = MemoryBus::new(ram);

        let mut roms = Vec::new();
        for image in &config.roms {
            roms.push(bus.load_rom(image.address, &image.path)?);
        }
        for image in &config.ram_images {
            bus.load_ram(image.address, &image.path)?;
        }

        let keyboard = Arc::new(AsciiKeyboard::new());
        let terminal = Arc::new(VideoTerminal::with_busy_interval(config.output_delay));
        let pia = Arc::new(Pia6820::new(
            PIA_BASE,
            Some(keyboard.clone() as Arc<dyn Peripheral>),
            Some(terminal.clone() as Arc<dyn Peripheral>),
        ));
        bus.register_device(pia.clone());

        let cpu = Mos6502::new(bus.clone());
        let control = cpu.control();
        let telnet = TelnetServer::new(keyboard.clone(), terminal.clone(), config.telnet_port);

        Ok(Self {
            bus,
            keyboard,
            terminal,
            pia,
            roms,
            control,
            cpu: Some(cpu),
            cpu_thread: None,
            telnet,
            display_stop: Arc::new(AtomicBool::new(false)),
            display_thread: None,
        })
    }

    /// Bring up the peripheral threads, then the CPU.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.cpu_thread.is_some() {
            return Ok(()); // already running
        }

        self.telnet.start()?;

        self.display_stop.store(false, Ordering::SeqCst);
        let terminal = self.terminal.clone();
        let stop = self.display_stop.clone();
        self.display_thread = Some(
            thread::Builder::new().name("display".into()).spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(terminal.timer_duration());
                    terminal.timer();
                }
            })?,
        );

        if let Some(cpu) = self.cpu.take() {
            log::info!("starting CPU");
            self.cpu_thread = Some(cpu.start()?);
        }
        Ok(())
    }

    /// Stop the CPU first, then tear down the peripheral threads.
    pub fn stop(&mut self) {
        if let Some(thread) = self.cpu_thread.take() {
            let cpu = thread.stop();
            log::debug!("CPU stopped at {}", cpu.state());
            self.cpu = Some(cpu);
        }
        self.display_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.display_thread.take() {
            if handle.join().is_err() {
                log::warn!("display thread panicked");
            }
        }
        self.telnet.stop();
    }

    /// Route a reset to the CPU and the PIA.
    pub fn reset(&self) {
        self.control.reset();
        self.pia.reset();
    }

    pub fn bus(&self) -> &Arc<MemoryBus> {
        &self.bus
    }

    pub fn keyboard(&self) -> &Arc<AsciiKeyboard> {
        &self.keyboard
    }

    pub fn terminal(&self) -> &Arc<VideoTerminal> {
        &self.terminal
    }

    pub fn control(&self) -> &Arc<CpuControl> {
        &self.control
    }

    /// ROM overlays in load order, for bank switching.
    pub fn roms(&self) -> &[Arc<Rom>] {
        &self.roms
    }

    /// The interpreter, when the execution thread is not running.
    pub fn cpu_mut(&mut self) -> Option<&mut Mos6502> {
        self.cpu.as_mut()
    }

    /// The telnet listener address, once started.
    pub fn telnet_addr(&self) -> Option<std::net::SocketAddr> {
        self.telnet.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.cpu_thread.is_some()
    }
}

impl Drop for Apple1System {
    fn drop(&mut self) {
        self.stop();
    }
}
