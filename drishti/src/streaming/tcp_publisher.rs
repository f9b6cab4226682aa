//! Detected-object publisher using TCP sockets.
//!
//! Publishes [`DetectedObject`] records to every connected subscriber.
//!
//! The estimation cycle must never wait on the network, so it only pushes into
//! a bounded lock-free queue. A dedicated publisher thread owns the listener,
//! accepts subscribers and drains the queue. When the queue is full the object
//! is dropped: publication is fire-and-forget.

use crate::error::Result;
use crate::publish::ObjectSink;
use crate::streaming::messages::{DetectedObject, TOPIC_OBJECT};
use crate::streaming::wire::{Serializer, encode_frame};
use crossbeam_queue::ArrayQueue;
use log::{debug, error, info, warn};
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Queue depth: ~10 seconds of objects at 10 objects/frame and 30 frames/s
const QUEUE_CAPACITY: usize = 3000;

/// Maximum objects sent per loop iteration before accepting new clients again
const MAX_BATCH: usize = 50;

/// Object publisher that broadcasts framed records via TCP
pub struct TcpPublisher {
    queue: Arc<ArrayQueue<DetectedObject>>,
    local_addr: SocketAddr,
    clients: Arc<AtomicUsize>,
    dropped: AtomicU64,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl TcpPublisher {
    /// Bind the listener and spawn the publisher thread
    ///
    /// # Arguments
    /// - `bind_address`: TCP bind address (e.g., "0.0.0.0:5560")
    /// - `serializer`: wire format for object payloads
    pub fn new(bind_address: &str, serializer: Serializer) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let queue = Arc::new(ArrayQueue::new(QUEUE_CAPACITY));
        let clients = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let queue_clone = Arc::clone(&queue);
        let clients_clone = Arc::clone(&clients);
        let shutdown_clone = Arc::clone(&shutdown);

        let publisher_thread = thread::Builder::new()
            .name("tcp-publisher".to_string())
            .spawn(move || {
                Self::publisher_thread_loop(
                    listener,
                    serializer,
                    queue_clone,
                    clients_clone,
                    shutdown_clone,
                );
            })?;

        info!("TCP object publisher listening on {}", local_addr);

        Ok(Self {
            queue,
            local_addr,
            clients,
            dropped: AtomicU64::new(0),
            publisher_thread: Some(publisher_thread),
            shutdown,
        })
    }

    /// Publisher thread main loop - owns the TCP listener
    fn publisher_thread_loop(
        listener: TcpListener,
        serializer: Serializer,
        queue: Arc<ArrayQueue<DetectedObject>>,
        client_count: Arc<AtomicUsize>,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut clients: Vec<TcpStream> = Vec::new();
        let mut sent = 0u64;

        // Reusable buffer for framing (avoids allocation per object)
        let mut frame_buffer = Vec::with_capacity(1024);

        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!("Failed to set blocking mode for subscriber {}: {}", addr, e);
                    } else {
                        info!("Subscriber connected: {}", addr);
                        clients.push(stream);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    error!("Error accepting subscriber: {}", e);
                }
            }

            let mut batch = 0;
            while let Some(object) = queue.pop() {
                match Self::broadcast(&mut clients, &serializer, &object, &mut frame_buffer) {
                    Ok(()) => sent += 1,
                    Err(e) => debug!("Failed to publish object: {}", e),
                }
                batch += 1;
                if batch >= MAX_BATCH {
                    break;
                }
            }
            client_count.store(clients.len(), Ordering::Relaxed);

            if queue.is_empty() {
                thread::sleep(Duration::from_millis(5));
            }
        }

        info!("Publisher thread exiting ({} objects sent)", sent);
    }

    /// Send one object to all subscribers, removing disconnected ones
    fn broadcast(
        clients: &mut Vec<TcpStream>,
        serializer: &Serializer,
        object: &DetectedObject,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        let payload = serializer.serialize(object)?;
        encode_frame(TOPIC_OBJECT, &payload, buffer)?;

        clients.retain_mut(|client| match client.write_all(buffer) {
            Ok(_) => true,
            Err(e) => {
                if let Ok(addr) = client.peer_addr() {
                    debug!("Subscriber {} disconnected: {}", addr, e);
                }
                false
            }
        });
        Ok(())
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected subscribers, as of the last publisher iteration
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    /// Objects dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the publisher
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        info!("TCP object publisher shutdown requested");
    }
}

impl ObjectSink for TcpPublisher {
    fn send(&self, object: DetectedObject) {
        if self.queue.push(object).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped % 100 == 1 {
                warn!("Object queue full, {} objects dropped so far", dropped);
            }
        }
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.stop();

        if let Some(thread) = self.publisher_thread.take() {
            let _ = thread.join();
        }
    }
}
