//! Shared helpers for integration tests: loopback collectors and a
//! capturing diagnostic stream.

#![allow(dead_code)]

use std::{
    io::{self, BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};

pub const WAIT: Duration = Duration::from_secs(5);

/// Event observed by a [`LineServer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    Accepted(usize),
    Line(usize, String),
    /// The client closed connection `n`.
    Eof(usize),
    /// The server hung up on connection `n`.
    Dropped(usize),
}

/// Loopback collector reading newline-terminated entries.
pub struct LineServer {
    pub addr: SocketAddr,
    pub events: Receiver<ServerEvent>,
}

impl LineServer {
    /// Accept connections forever. When `hang_up_after` is set, the first
    /// connection is closed by the server after that many lines.
    pub fn spawn(hang_up_after: Option<usize>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, events) = unbounded();
        thread::spawn(move || {
            for (n, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else { return };
                if tx.send(ServerEvent::Accepted(n)).is_err() {
                    return;
                }
                let limit = if n == 0 { hang_up_after } else { None };
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut reader = BufReader::new(stream);
                    let mut seen = 0;
                    loop {
                        if limit == Some(seen) {
                            let _ = tx.send(ServerEvent::Dropped(n));
                            return;
                        }
                        let mut line = String::new();
                        match reader.read_line(&mut line) {
                            Ok(0) | Err(_) => {
                                let _ = tx.send(ServerEvent::Eof(n));
                                return;
                            }
                            Ok(_) => {
                                seen += 1;
                                let _ = tx.send(ServerEvent::Line(n, line));
                            }
                        }
                    }
                });
            }
        });
        Self { addr, events }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the next event matching `pred`, skipping others.
    pub fn wait_for<F>(&self, mut pred: F) -> ServerEvent
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        loop {
            match self.events.recv_timeout(WAIT) {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for server event"),
                Err(RecvTimeoutError::Disconnected) => panic!("server stopped"),
            }
        }
    }

    /// Collect the next `count` lines in arrival order.
    pub fn lines(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| match self.wait_for(|e| matches!(e, ServerEvent::Line(..))) {
                ServerEvent::Line(_, line) => line,
                _ => unreachable!(),
            })
            .collect()
    }
}

/// Server answering every connection with bytes that are not TLS.
pub fn spawn_plaintext_responder() -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { return };
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        }
    });
    addr
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    listener.local_addr().expect("listener has address").port()
}

/// Thread-safe byte buffer usable as a diagnostic stream.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
