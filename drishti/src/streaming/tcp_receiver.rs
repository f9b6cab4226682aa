//! Inbound bus connection handler
//!
//! Each connected producer (camera process, upstream detector) gets one
//! receiver thread. The receiver only decodes frames and forwards them to the
//! pipeline channel; all estimation happens on the pipeline thread.
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Producer connects to the inbound TCP port
//! 2. Daemon spawns a TcpReceiver thread for this connection
//! 3. Receiver loop forwards messages until disconnect or shutdown
//! ```
//!
//! # Safety Features
//!
//! - **Read timeout**: 500ms timeout allows periodic shutdown flag checks
//! - **Frame limit**: frames > 1MB close the connection
//! - **Bad payloads**: logged and skipped, the connection stays open

use crate::error::{Error, Result};
use crate::streaming::messages::BusMessage;
use crate::streaming::wire::{MAX_FRAME_SIZE, Serializer, split_frame};
use crossbeam_channel::Sender;
use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Initial capacity for the frame read buffer (typical notification size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Decodes bus frames from one connection and forwards them to the pipeline
pub struct TcpReceiver {
    serializer: Serializer,
    sender: Sender<BusMessage>,
    /// Global running flag (daemon shutdown)
    running: Arc<AtomicBool>,
    /// Reusable buffer for frame bodies
    read_buffer: Vec<u8>,
}

impl TcpReceiver {
    pub fn new(serializer: Serializer, sender: Sender<BusMessage>, running: Arc<AtomicBool>) -> Self {
        Self {
            serializer,
            sender,
            running,
            read_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Run the receiver loop for a connected producer
    pub fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        log::info!("TCP receiver started for {:?}", stream.peer_addr());

        if let Err(e) = stream.set_read_timeout(Some(Duration::from_millis(500))) {
            log::warn!("Failed to set read timeout: {}", e);
        }

        while self.running.load(Ordering::Relaxed) {
            match self.read_message(&mut stream) {
                Ok(Some(message)) => {
                    if self.sender.send(message).is_err() {
                        log::debug!("Pipeline channel closed, stopping receiver");
                        break;
                    }
                }
                Ok(None) => {}
                Err(Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof
                        || e.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    log::info!("Producer disconnected");
                    return Ok(());
                }
                Err(e) => {
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                    log::error!("Failed to read frame: {}", e);
                    return Err(e);
                }
            }
        }

        let _ = stream.shutdown(std::net::Shutdown::Both);
        log::info!("TCP receiver stopped");
        Ok(())
    }

    /// Read one frame and decode it
    ///
    /// Returns `Ok(None)` on read timeout and for frames that do not decode.
    pub fn read_message<R: Read>(&mut self, stream: &mut R) -> Result<Option<BusMessage>> {
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(Error::Other(format!("Frame too large: {} bytes", len)));
        }

        self.read_buffer.clear();
        self.read_buffer.resize(len, 0);
        stream.read_exact(&mut self.read_buffer)?;

        let (topic, payload) = match split_frame(&self.read_buffer) {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("Discarding malformed frame: {}", e);
                return Ok(None);
            }
        };

        match self.serializer.deserialize::<BusMessage>(payload) {
            Ok(message) if message.topic() == topic => Ok(Some(message)),
            Ok(message) => {
                log::warn!(
                    "Discarding '{}' message framed under topic '{}'",
                    message.topic(),
                    topic
                );
                Ok(None)
            }
            Err(e) => {
                log::warn!("Discarding undecodable '{}' frame: {}", topic, e);
                Ok(None)
            }
        }
    }
}
