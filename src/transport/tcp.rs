//! TCP and TLS channel primitives.

use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    thread,
    time::Duration,
};

use native_tls::{HandshakeError, TlsConnector, TlsStream};

use crate::error::ChannelError;

use super::{
    channel::Channel,
    config::{Endpoint, TlsOptions},
};

impl Endpoint {
    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

impl TlsOptions {
    fn connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(io::Error::other)
    }
}

/// Active socket connection state.
pub enum ActiveConnection {
    PlainTcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ActiveConnection {
    fn tcp(&self) -> &TcpStream {
        match self {
            ActiveConnection::PlainTcp(stream) => stream,
            ActiveConnection::Tls(stream) => stream.get_ref(),
        }
    }

    /// Update the write timeout for the underlying socket.
    pub fn set_write_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.tcp().set_write_timeout(Some(timeout))
    }

    /// Clone the raw socket so a monitor can observe peer close.
    ///
    /// The monitor only ever sees EOF or an error on a TLS session because
    /// the collector never sends application data.
    pub fn peer_monitor(&self) -> io::Result<PeerMonitor> {
        let stream = self.tcp().try_clone()?;
        stream.set_read_timeout(None)?;
        Ok(PeerMonitor { stream })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            ActiveConnection::Tls(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if let ActiveConnection::Tls(stream) = self {
            stream.shutdown()?;
        }
        match self.tcp().shutdown(Shutdown::Both) {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl Channel for ActiveConnection {
    fn write_line(&mut self, line: &[u8]) -> Result<(), ChannelError> {
        self.write_all(line).map_err(|err| ChannelError::write(&err))
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.shutdown().map_err(|err| ChannelError::close(&err))
    }
}

impl std::fmt::Debug for ActiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ActiveConnection::PlainTcp(_) => "PlainTcp",
            ActiveConnection::Tls(_) => "Tls",
        };
        f.debug_tuple(kind)
            .field(&self.tcp().peer_addr().ok())
            .finish()
    }
}

/// Read half watching for the peer closing the connection.
pub struct PeerMonitor {
    stream: TcpStream,
}

impl PeerMonitor {
    /// Spawn a thread that calls `on_close` once the socket stops being readable.
    ///
    /// `on_close` receives `None` for an orderly EOF.
    pub fn spawn<F>(self, on_close: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce(Option<ChannelError>) + Send + 'static,
    {
        thread::Builder::new()
            .name("tokenlog-peer-monitor".into())
            .spawn(move || {
                let mut stream = self.stream;
                let mut buf = [0u8; 512];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) => return on_close(None),
                        Ok(_) => continue,
                        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                        Err(err) => return on_close(Some(ChannelError::peer(&err))),
                    }
                }
            })
    }
}

fn connect_tcp(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, ChannelError> {
    let addrs = endpoint
        .socket_addrs()
        .map_err(|err| ChannelError::connect(endpoint.address(), &err))?;
    let mut last_err = io::Error::new(
        io::ErrorKind::NotFound,
        format!("no addresses resolved for {}", endpoint.host),
    );
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream
                    .set_nonblocking(false)
                    .map_err(|err| ChannelError::connect(endpoint.address(), &err))?;
                return Ok(stream);
            }
            Err(err) => last_err = err,
        }
    }
    Err(ChannelError::connect(endpoint.address(), &last_err))
}

/// Establish a connection to `endpoint`, completing and verifying the TLS
/// handshake when TLS is configured.
pub fn connect_endpoint(
    endpoint: &Endpoint,
    connect_timeout: Duration,
    write_timeout: Duration,
) -> Result<ActiveConnection, ChannelError> {
    let stream = connect_tcp(endpoint, connect_timeout)?;
    let io_err = |err: io::Error| ChannelError::connect(endpoint.address(), &err);
    let connection = match &endpoint.tls {
        Some(tls) => {
            let connector = tls.connector().map_err(io_err)?;
            stream
                .set_read_timeout(Some(connect_timeout))
                .map_err(io_err)?;
            stream
                .set_write_timeout(Some(connect_timeout))
                .map_err(io_err)?;
            let stream = match connector.connect(&tls.domain, stream) {
                Ok(stream) => stream,
                Err(HandshakeError::Failure(err)) => {
                    return Err(ChannelError::unauthorized(&tls.domain, err));
                }
                Err(HandshakeError::WouldBlock(_)) => {
                    return Err(ChannelError::unauthorized(
                        &tls.domain,
                        "handshake did not complete",
                    ));
                }
            };
            stream.get_ref().set_read_timeout(None).map_err(io_err)?;
            ActiveConnection::Tls(Box::new(stream))
        }
        None => ActiveConnection::PlainTcp(stream),
    };
    connection.set_write_timeout(write_timeout).map_err(io_err)?;
    Ok(connection)
}
