use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use log::{debug, info, warn};

use super::protocol::{FrameReader, Message, PROTOCOL_STRIKE_LIMIT};
use crate::world::MAX_CLIENTS;

const READ_CHUNK: usize = 512;

/// Bytes a slow recipient may leave queued before it is disconnected.
const OUTBOX_LIMIT: usize = 8 * 1024;

/// One inbound event surfaced by a receive pass.
#[derive(Debug)]
pub enum NetEvent {
    Message { slot: u8, message: Message },
    Disconnected { slot: u8 },
}

#[derive(Debug, Default)]
struct ConnectionSlot {
    stream: Option<TcpStream>,
    reader: FrameReader,
    outbox: Vec<u8>,
    strikes: u32,
    active: bool,
}

impl ConnectionSlot {
    fn clear(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.reader.clear();
        self.outbox.clear();
        self.strikes = 0;
        self.active = false;
    }
}

/// Fixed-capacity table of client connections behind a non-blocking
/// listener. The slot index doubles as the client id; indices are reused
/// after a disconnect, so ids are not stable identities across
/// connections.
pub struct ConnectionRegistry {
    listener: TcpListener,
    local_addr: SocketAddr,
    slots: [ConnectionSlot; MAX_CLIENTS],
}

impl ConnectionRegistry {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            slots: std::array::from_fn(|_| ConnectionSlot::default()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_active(&self, slot: u8) -> bool {
        self.slots
            .get(slot as usize)
            .is_some_and(|entry| entry.active)
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|entry| entry.active).count()
    }

    /// Drains pending accepts. A new socket claims the first inactive
    /// slot; with no slot free it is closed on the spot, no message
    /// sent. The claimed index becomes the client id but is only told to
    /// the client in the welcome that answers its hello.
    pub fn poll_accept(&mut self) -> Vec<(u8, SocketAddr)> {
        let mut accepted = Vec::new();

        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let Some(index) = self.slots.iter().position(|entry| !entry.active) else {
                        info!("rejecting connection from {addr}: server full");
                        drop(stream);
                        continue;
                    };
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("failed to configure socket from {addr}: {e}");
                        continue;
                    }
                    let _ = stream.set_nodelay(true);

                    let slot = &mut self.slots[index];
                    slot.clear();
                    slot.stream = Some(stream);
                    slot.active = true;

                    debug!("client {index} connected from {addr}");
                    accepted.push((index as u8, addr));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }

        accepted
    }

    /// One non-blocking read attempt per active slot, in ascending slot
    /// order. The fixed scan order is what breaks same-tick ties, so
    /// lower slots win simultaneous races. Complete buffered frames are
    /// surfaced as events; a failed or zero-length read (the peer closed
    /// the stream) disconnects that slot only.
    pub fn receive(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();

        for index in 0..self.slots.len() {
            if !self.slots[index].active {
                continue;
            }

            let mut buf = [0u8; READ_CHUNK];
            let read = match self.slots[index].stream.as_mut() {
                Some(stream) => stream.read(&mut buf),
                None => continue,
            };

            match read {
                Ok(0) => {
                    debug!("client {index} closed the connection");
                    self.disconnect(index as u8);
                    events.push(NetEvent::Disconnected { slot: index as u8 });
                }
                Ok(n) => {
                    let slot = &mut self.slots[index];
                    slot.reader.push(&buf[..n]);

                    let mut drop_slot = false;
                    loop {
                        match slot.reader.next_message() {
                            Ok(Some(message)) => events.push(NetEvent::Message {
                                slot: index as u8,
                                message,
                            }),
                            Ok(None) => break,
                            Err(e) => {
                                slot.strikes += 1;
                                warn!(
                                    "client {index}: dropped malformed message ({e}), strike {}/{}",
                                    slot.strikes, PROTOCOL_STRIKE_LIMIT
                                );
                                if slot.strikes >= PROTOCOL_STRIKE_LIMIT {
                                    drop_slot = true;
                                    break;
                                }
                            }
                        }
                    }

                    if drop_slot {
                        self.disconnect(index as u8);
                        events.push(NetEvent::Disconnected { slot: index as u8 });
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("read from client {index} failed: {e}");
                    self.disconnect(index as u8);
                    events.push(NetEvent::Disconnected { slot: index as u8 });
                }
            }
        }

        events
    }

    /// Queues a message for one slot and flushes what the kernel will
    /// take. Returns false if the slot was (or had to be) disconnected.
    pub fn send(&mut self, slot: u8, message: &Message) -> bool {
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode {:?}: {e}", message.tag());
                return true;
            }
        };
        self.send_bytes(slot as usize, &bytes)
    }

    /// Writes to every active slot except `exclude` (`None` includes
    /// all). A failed write disconnects that one recipient; the scan
    /// continues, so partial delivery is expected under failure. Returns
    /// the slots that were disconnected along the way.
    pub fn broadcast(&mut self, message: &Message, exclude: Option<u8>) -> Vec<u8> {
        let mut dropped = Vec::new();
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode {:?}: {e}", message.tag());
                return dropped;
            }
        };

        for index in 0..self.slots.len() {
            if exclude == Some(index as u8) || !self.slots[index].active {
                continue;
            }
            if !self.send_bytes(index, &bytes) {
                dropped.push(index as u8);
            }
        }

        dropped
    }

    /// Retries queued outbox bytes for every slot. Returns slots
    /// disconnected by hard write failures or outbox overflow.
    pub fn flush(&mut self) -> Vec<u8> {
        let mut dropped = Vec::new();
        for index in 0..self.slots.len() {
            if !self.slots[index].active || self.slots[index].outbox.is_empty() {
                continue;
            }
            if !self.flush_slot(index) {
                dropped.push(index as u8);
            }
        }
        dropped
    }

    /// Idempotent: closes the socket if present and clears the slot.
    /// Calling it on an already-inactive slot is a no-op.
    pub fn disconnect(&mut self, slot: u8) {
        let Some(entry) = self.slots.get_mut(slot as usize) else {
            return;
        };
        if entry.active {
            debug!("client {slot} disconnected");
        }
        entry.clear();
    }

    fn send_bytes(&mut self, index: usize, bytes: &[u8]) -> bool {
        if !self.slots[index].active {
            return false;
        }
        self.slots[index].outbox.extend_from_slice(bytes);
        self.flush_slot(index)
    }

    fn flush_slot(&mut self, index: usize) -> bool {
        let slot = &mut self.slots[index];
        let Some(stream) = slot.stream.as_mut() else {
            return false;
        };

        let mut written = 0;
        let mut failed = None;
        while written < slot.outbox.len() {
            match stream.write(&slot.outbox[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    failed = Some(e);
                    break;
                }
            }
        }
        slot.outbox.drain(..written);

        if let Some(e) = failed {
            warn!("write to client {index} failed: {e}");
            self.disconnect(index as u8);
            return false;
        }
        if self.slots[index].outbox.len() > OUTBOX_LIMIT {
            warn!("client {index} is not draining its stream, dropping it");
            self.disconnect(index as u8);
            return false;
        }
        true
    }
}
