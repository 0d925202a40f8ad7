//! Connection and queue state machine.
//!
//! The transport is driven entirely by discrete events: entries arriving,
//! connection attempts completing, the peer closing the channel, and `end`.
//! It never blocks waiting for the network other than inside a single
//! channel write, and it never spawns work itself; starting a connection is
//! delegated to a [`Connector`].

use std::{collections::VecDeque, sync::Arc};

use log::{debug, warn};

use crate::{
    error::{ChannelError, LogError},
    log_entry::{LineFormat, LogEntry},
    notifier::{EventSink, Notification},
};

use super::channel::{Channel, Connector};

/// Stage of the connection lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

/// Orthogonal shutdown progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosingPhase {
    Closing,
    Closed,
}

/// Queueing transport with lazy connect and deferred close.
pub struct Transport<C: Connector> {
    connector: C,
    sink: Arc<dyn EventSink>,
    line: LineFormat,
    queue: VecDeque<LogEntry>,
    phase: ConnectionPhase,
    closing: Option<ClosingPhase>,
    channel: Option<C::Channel>,
    generation: u64,
    opened: bool,
}

impl<C: Connector> Transport<C> {
    pub fn new(connector: C, line: LineFormat, sink: Arc<dyn EventSink>) -> Self {
        Self {
            connector,
            sink,
            line,
            queue: VecDeque::new(),
            phase: ConnectionPhase::Disconnected,
            closing: None,
            channel: None,
            generation: 0,
            opened: false,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn closing(&self) -> Option<ClosingPhase> {
        self.closing
    }

    /// Number of entries awaiting transmission.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of queued entries, front first.
    pub fn queued(&self) -> impl Iterator<Item = &LogEntry> {
        self.queue.iter()
    }

    /// Generation of the most recent connection attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Whether no further progress can happen without new input.
    ///
    /// True once closed, or once closing with no connection in flight.
    pub fn is_settled(&self) -> bool {
        match self.closing {
            Some(ClosingPhase::Closed) => true,
            Some(ClosingPhase::Closing) => self.phase != ConnectionPhase::Connecting,
            None => !self.opened,
        }
    }

    /// Queue an entry, flushing or connecting as the phase dictates.
    pub fn consume(&mut self, entry: LogEntry) -> Result<(), LogError> {
        if self.closing.is_some() {
            return Err(LogError::TransportClosed);
        }
        self.queue.push_back(entry);
        match self.phase {
            ConnectionPhase::Connected => self.drain(),
            ConnectionPhase::Disconnected => self.connect(),
            ConnectionPhase::Connecting => {}
        }
        Ok(())
    }

    fn connect(&mut self) {
        self.generation += 1;
        self.opened = true;
        self.phase = ConnectionPhase::Connecting;
        debug!("tokenlog: starting connection attempt {}", self.generation);
        self.connector.begin_connect(self.generation);
    }

    /// Deliver the outcome of connection attempt `generation`.
    pub fn on_connect_complete(
        &mut self,
        generation: u64,
        result: Result<C::Channel, ChannelError>,
    ) {
        if generation != self.generation || self.phase != ConnectionPhase::Connecting {
            if let Ok(mut stale) = result {
                debug!("tokenlog: discarding superseded connection {generation}");
                if let Err(err) = stale.close() {
                    self.report(err.into());
                }
            }
            return;
        }

        match result {
            Ok(channel) => {
                self.channel = Some(channel);
                self.phase = ConnectionPhase::Connected;
                self.sink.notify(Notification::Connect);
                self.drain();
                if self.closing == Some(ClosingPhase::Closing) {
                    self.finish_close();
                }
            }
            Err(err) => {
                self.report(err.into());
                self.phase = ConnectionPhase::Disconnected;
            }
        }
    }

    /// The channel of `generation` closed or failed underneath us.
    pub fn on_channel_closed(&mut self, generation: u64, error: Option<ChannelError>) {
        if generation != self.generation || self.channel.is_none() {
            return;
        }
        if let Some(err) = error {
            self.report(err.into());
        }
        self.close_channel();
    }

    /// Begin closing, deferring while a connection is in flight.
    pub fn end(&mut self) {
        if !self.opened || self.closing.is_some() {
            return;
        }
        self.closing = Some(ClosingPhase::Closing);
        if !self.queue.is_empty() {
            if self.phase == ConnectionPhase::Connecting {
                return;
            }
            self.drain();
        }
        self.finish_close();
    }

    /// Drop everything still queued, reporting the loss once.
    pub fn discard_pending(&mut self) -> usize {
        let count = self.queue.len();
        if count > 0 {
            self.queue.clear();
            warn!("tokenlog: discarding {count} unsent entries");
            self.report(ChannelError::Discarded { count }.into());
        }
        count
    }

    fn drain(&mut self) {
        while self.phase == ConnectionPhase::Connected {
            let Some(channel) = self.channel.as_mut() else {
                self.phase = ConnectionPhase::Disconnected;
                return;
            };
            let Some(entry) = self.queue.pop_front() else {
                return;
            };
            if let Err(err) = channel.write_line(entry.to_line(&self.line).as_bytes()) {
                self.queue.push_front(entry);
                self.report(err.into());
                self.close_channel();
                return;
            }
        }
    }

    fn finish_close(&mut self) {
        self.close_channel();
        self.closing = Some(ClosingPhase::Closed);
        self.discard_pending();
        self.sink.notify(Notification::End);
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take()
            && let Err(err) = channel.close()
        {
            self.report(err.into());
        }
        self.phase = ConnectionPhase::Disconnected;
    }

    fn report(&self, err: LogError) {
        self.sink.notify(Notification::Error(err));
    }
}

impl<C: Connector> std::fmt::Debug for Transport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("phase", &self.phase)
            .field("closing", &self.closing)
            .field("pending", &self.queue.len())
            .field("generation", &self.generation)
            .finish()
    }
}
