use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crabapple_core::peripheral::{AsciiKeyboard, VideoTerminal};

use crate::apple1::MachineError;

/// Input throttle: one byte every 26.667 ms, ~300 bps, matching the
/// serial link the machine was designed for.
const INPUT_BYTE_DELAY: Duration = Duration::from_micros(26_667);

/// Accept-loop idle period.
const POLL_DELAY: Duration = Duration::from_millis(10);

/// Plain-byte TCP front door to the machine.
///
/// Client bytes are injected into the keyboard peripheral as keystrokes
/// (line feeds are swallowed; carriage returns already map to 0x8D in the
/// keyboard). Each client is also registered with the terminal so the
/// display output fans out to it. Socket errors are confined to the
/// affected client: it is logged and dropped, everyone else keeps going.
pub struct TelnetServer {
    keyboard: Arc<AsciiKeyboard>,
    terminal: Arc<VideoTerminal>,
    port: u16,
    local_addr: Option<SocketAddr>,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TelnetServer {
    pub fn new(keyboard: Arc<AsciiKeyboard>, terminal: Arc<VideoTerminal>, port: u16) -> Self {
        Self {
            keyboard,
            terminal,
            port,
            local_addr: None,
            stopping: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// The bound listener address, once started. Mostly useful with
    /// port 0, where the OS picks the port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and spawn the accept/drain thread. Bind failures
    /// surface here so the machine can refuse to start.
    pub fn start(&mut self) -> Result<(), MachineError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .map_err(|source| MachineError::Bind { port: self.port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| MachineError::Bind { port: self.port, source })?;
        self.local_addr = listener.local_addr().ok();
        log::info!("telnet server listening on {:?}", self.local_addr);

        self.stopping.store(false, Ordering::SeqCst);
        let keyboard = self.keyboard.clone();
        let terminal = self.terminal.clone();
        let stopping = self.stopping.clone();
        self.handle = Some(
            thread::Builder::new()
                .name("telnet".into())
                .spawn(move || serve(listener, keyboard, terminal, stopping))
                .map_err(|source| MachineError::Bind { port: self.port, source })?,
        );
        Ok(())
    }

    /// Cooperative stop: raise the flag and join the server thread.
    pub fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("telnet server thread panicked");
            }
        }
    }
}

impl Drop for TelnetServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(
    listener: TcpListener,
    keyboard: Arc<AsciiKeyboard>,
    terminal: Arc<VideoTerminal>,
    stopping: Arc<AtomicBool>,
) {
    let mut clients: Vec<TcpStream> = Vec::new();
    let mut buf = [0u8; 100];

    while !stopping.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                log::info!("client connected from {peer}");
                if let Err(e) = stream.set_nonblocking(true) {
                    log::warn!("rejecting client {peer}: {e}");
                    continue;
                }
                match stream.try_clone() {
                    Ok(output) => terminal.add_socket(output),
                    Err(e) => log::warn!("no display fan-out for {peer}: {e}"),
                }
                clients.push(stream);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => log::warn!("accept failed: {e}"),
        }

        let mut index = 0;
        while index < clients.len() {
            match clients[index].read(&mut buf) {
                Ok(0) => {
                    log::info!("client disconnected");
                    clients.swap_remove(index);
                }
                Ok(count) => {
                    for &byte in &buf[..count] {
                        if byte == 0x0A {
                            continue; // LF is swallowed; CR becomes 0x8D
                        }
                        keyboard.keypress(byte);
                        // Throttle so a paste arrives at link speed and the
                        // CPU gets a chance to read each keystroke.
                        thread::sleep(INPUT_BYTE_DELAY);
                    }
                    index += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => index += 1,
                Err(e) => {
                    log::warn!("dropping client: {e}");
                    clients.swap_remove(index);
                }
            }
        }

        thread::sleep(POLL_DELAY);
    }
}
