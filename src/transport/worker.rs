//! Worker thread driving the transport state machine.
//!
//! Every state transition happens on this thread. Connection attempts and
//! peer-close detection run on helper threads that report back through the
//! same command queue, so the state machine observes one event at a time.

use std::{io, sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use log::{debug, warn};

use crate::{
    error::ChannelError,
    log_entry::LogEntry,
    notifier::{EventSink, Notification},
};

use super::{
    channel::Connector,
    config::TransportConfig,
    state::Transport,
    tcp::{ActiveConnection, connect_endpoint},
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum TransportCommand {
    Consume(LogEntry),
    End,
    /// `end()` followed by exit once the transport has settled.
    Shutdown,
    Connected {
        generation: u64,
        result: Result<ActiveConnection, ChannelError>,
    },
    ChannelClosed {
        generation: u64,
        error: Option<ChannelError>,
    },
}

/// Connector that dials on a helper thread and reports back to the worker.
pub struct TcpConnector {
    config: Arc<TransportConfig>,
    events: Sender<TransportCommand>,
}

impl TcpConnector {
    pub fn new(config: Arc<TransportConfig>, events: Sender<TransportCommand>) -> Self {
        Self { config, events }
    }
}

impl Connector for TcpConnector {
    type Channel = ActiveConnection;

    fn begin_connect(&mut self, generation: u64) {
        let config = Arc::clone(&self.config);
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("tokenlog-connect".into())
            .spawn(move || dial(&config, generation, &events));
        if let Err(err) = spawned {
            let result = Err(ChannelError::connect(self.config.endpoint.address(), &err));
            let _ = self
                .events
                .send(TransportCommand::Connected { generation, result });
        }
    }
}

fn dial(config: &TransportConfig, generation: u64, events: &Sender<TransportCommand>) {
    let result = connect_endpoint(
        &config.endpoint,
        config.connect_timeout,
        config.write_timeout,
    );
    let monitor = match &result {
        Ok(conn) => match conn.peer_monitor() {
            Ok(monitor) => Some(monitor),
            Err(err) => {
                warn!("tokenlog: cannot watch connection for peer close: {err}");
                None
            }
        },
        Err(_) => None,
    };
    if events
        .send(TransportCommand::Connected { generation, result })
        .is_err()
    {
        return;
    }
    // Started only after `Connected` is queued so close events never overtake it.
    if let Some(monitor) = monitor {
        let events = events.clone();
        let spawned = monitor.spawn(move |error| {
            let _ = events.send(TransportCommand::ChannelClosed { generation, error });
        });
        if let Err(err) = spawned {
            warn!("tokenlog: failed to spawn peer monitor: {err}");
        }
    }
}

/// Handles to a running worker.
pub struct WorkerHandle {
    pub tx: Sender<TransportCommand>,
    pub handle: thread::JoinHandle<()>,
    pub done_rx: Receiver<()>,
}

pub fn spawn_worker(
    config: TransportConfig,
    sink: Arc<dyn EventSink>,
) -> io::Result<WorkerHandle> {
    let (tx, rx) = unbounded();
    let (done_tx, done_rx) = bounded(1);
    let connector = TcpConnector::new(Arc::new(config.clone()), tx.clone());
    let handle = thread::Builder::new()
        .name("tokenlog-transport".into())
        .spawn(move || {
            let transport = Transport::new(connector, config.line, sink.clone());
            run(transport, rx, sink.as_ref());
            let _ = done_tx.send(());
        })?;
    Ok(WorkerHandle {
        tx,
        handle,
        done_rx,
    })
}

/// Process commands until a requested shutdown has settled.
pub fn run(
    mut transport: Transport<TcpConnector>,
    rx: Receiver<TransportCommand>,
    sink: &dyn EventSink,
) {
    let mut shutting_down = false;
    while let Ok(cmd) = rx.recv() {
        match cmd {
            TransportCommand::Consume(entry) => match transport.consume(entry.clone()) {
                Ok(()) => sink.notify(Notification::Log(entry)),
                Err(err) => sink.notify(Notification::Error(err)),
            },
            TransportCommand::End => transport.end(),
            TransportCommand::Shutdown => {
                shutting_down = true;
                transport.end();
            }
            TransportCommand::Connected { generation, result } => {
                transport.on_connect_complete(generation, result);
            }
            TransportCommand::ChannelClosed { generation, error } => {
                debug!("tokenlog: connection {generation} reported closed");
                transport.on_channel_closed(generation, error);
            }
        }
        if shutting_down && transport.is_settled() {
            break;
        }
    }
    transport.discard_pending();
    debug!("tokenlog: transport worker exiting");
}
