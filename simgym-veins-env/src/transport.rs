//! Connection to the simulator.
//!
//! The agent is the listening side. The simulator connects once per run and
//! then alternates strictly: one request frame in, one reply frame out.
//! Every message is framed with a 4-byte big-endian length by
//! [`LengthDelimitedCodec`], see [`FramedStream`].
use log::{debug, trace};
use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpListener, TcpStream},
    thread,
    time::{Duration, Instant},
};
use tokio_util::{
    bytes::{Bytes, BytesMut},
    codec::{Decoder, Encoder, LengthDelimitedCodec},
};

/// Largest frame accepted from the simulator.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

const READ_CHUNK: usize = 8 * 1024;

/// Point in time `timeout` from now.
///
/// `None` if there is no timeout or if the deadline is not representable;
/// both mean waiting indefinitely.
pub(crate) fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

/// Request/reply channel to one simulator instance.
///
/// `None` as a timeout means waiting indefinitely.
pub trait Transport: Send {
    /// Starts listening and returns the port the simulator has to connect to.
    ///
    /// `port == None` picks a free port.
    fn listen(&mut self, host: &str, port: Option<u16>) -> io::Result<u16>;

    /// Waits for the simulator to connect. Returns `false` if `timeout` elapsed first.
    fn accept(&mut self, timeout: Option<Duration>) -> io::Result<bool>;

    /// Receives the next request. Returns `None` if `timeout` elapsed first.
    fn recv(&mut self, timeout: Option<Duration>) -> io::Result<Option<Vec<u8>>>;

    /// Sends a reply.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Drops the connection and stops listening.
    fn close(&mut self);
}

/// A byte stream carrying length-prefixed frames.
///
/// Both sides of the connection use it: the session wraps its accepted
/// socket, a simulator (or a test playing one) wraps its client socket.
#[derive(Debug)]
pub struct FramedStream<S> {
    inner: S,
    codec: LengthDelimitedCodec,
    buf: BytesMut,
}

impl<S> FramedStream<S> {
    /// Wraps a connected stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            codec: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// The wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn next_buffered(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.codec.decode(&mut self.buf)?.map(|frame| frame.to_vec()))
    }
}

impl<S: Read + Write> FramedStream<S> {
    /// Writes one frame.
    pub fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut out = BytesMut::with_capacity(payload.len() + 4);
        self.codec.encode(Bytes::copy_from_slice(payload), &mut out)?;
        self.inner.write_all(&out)?;
        self.inner.flush()
    }

    /// Reads the next frame, blocking.
    pub fn recv(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(frame) = self.next_buffered()? {
                return Ok(frame);
            }
            self.fill()?;
        }
    }

    /// Reads once from the stream into the frame buffer.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.inner.read(&mut chunk)? {
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            )),
            n => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(())
            }
        }
    }
}

impl FramedStream<TcpStream> {
    /// Reads the next frame unless `deadline` passes first.
    fn recv_until(&mut self, deadline: Option<Instant>) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.next_buffered()? {
                return Ok(Some(frame));
            }
            let remaining = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return Ok(None);
                    }
                    Some(d - now)
                }
                None => None,
            };
            self.inner.set_read_timeout(remaining)?;
            match self.fill() {
                Ok(()) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// Length-prefixed frames over TCP.
#[derive(Debug, Default)]
pub struct TcpTransport {
    listener: Option<TcpListener>,
    stream: Option<FramedStream<TcpStream>>,
}

impl TcpTransport {
    /// Constructs a transport that is not listening yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> io::Result<&mut FramedStream<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "simulator not connected"))
    }
}

impl Transport for TcpTransport {
    fn listen(&mut self, host: &str, port: Option<u16>) -> io::Result<u16> {
        self.close();
        let listener = TcpListener::bind((host, port.unwrap_or(0)))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        debug!("Listening on {}:{}", host, port);
        self.listener = Some(listener);
        Ok(port)
    }

    fn accept(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        if self.stream.is_some() {
            return Ok(true);
        }
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not listening"))?;
        let deadline = deadline(timeout);

        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!("Simulator connected from {}", addr);
                    stream.set_nonblocking(false)?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(FramedStream::new(stream));
                    // One simulator per run; later connection attempts are refused.
                    self.listener = None;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    match deadline {
                        Some(d) if now >= d => return Ok(false),
                        Some(d) => thread::sleep(ACCEPT_POLL.min(d - now)),
                        None => thread::sleep(ACCEPT_POLL),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn recv(&mut self, timeout: Option<Duration>) -> io::Result<Option<Vec<u8>>> {
        let deadline = deadline(timeout);
        let frame = self.stream()?.recv_until(deadline)?;
        if let Some(frame) = frame.as_ref() {
            trace!("Received frame of {} bytes", frame.len());
        }
        Ok(frame)
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream()?.send(frame)?;
        trace!("Sent frame of {} bytes", frame.len());
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.get_ref().shutdown(Shutdown::Both);
        }
        self.listener = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn connected() -> (TcpTransport, FramedStream<TcpStream>) {
        let mut transport = TcpTransport::new();
        let port = transport.listen("127.0.0.1", None).unwrap();
        let peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
        assert!(transport.accept(Some(Duration::from_secs(5))).unwrap());
        (transport, FramedStream::new(peer))
    }

    #[test]
    fn frames_cross_the_socket() {
        let (mut transport, mut peer) = connected();

        peer.send(b"request").unwrap();
        peer.send(b"").unwrap();
        let got = transport.recv(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(got.as_deref(), Some(&b"request"[..]));
        let got = transport.recv(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(got.as_deref(), Some(&b""[..]));

        transport.send(b"reply").unwrap();
        assert_eq!(peer.recv().unwrap(), b"reply");
    }

    #[test]
    fn frame_split_across_writes() {
        let (mut transport, peer) = connected();
        let mut raw = peer.get_ref().try_clone().unwrap();
        let writer = thread::spawn(move || {
            raw.write_all(&[0, 0, 0, 5, b'h']).unwrap();
            thread::sleep(Duration::from_millis(50));
            raw.write_all(b"ello").unwrap();
        });

        let got = transport.recv(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(got.as_deref(), Some(&b"hello"[..]));
        writer.join().unwrap();
    }

    #[test]
    fn recv_times_out_without_data() {
        let (mut transport, _peer) = connected();
        let start = Instant::now();
        let got = transport.recv(Some(Duration::from_millis(200))).unwrap();
        assert!(got.is_none());
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn accept_times_out_without_peer() {
        let mut transport = TcpTransport::new();
        transport.listen("127.0.0.1", None).unwrap();
        assert!(!transport.accept(Some(Duration::from_millis(50))).unwrap());
    }

    #[test]
    fn closed_peer_is_an_error() {
        let (mut transport, peer) = connected();
        drop(peer);
        let err = transport.recv(Some(Duration::from_secs(5))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let (mut transport, peer) = connected();
        let mut raw = peer.get_ref().try_clone().unwrap();
        raw.write_all(&u32::MAX.to_be_bytes()).unwrap();
        let err = transport.recv(Some(Duration::from_secs(5))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn listener_is_released_after_accept() {
        let mut transport = TcpTransport::new();
        let port = transport.listen("127.0.0.1", None).unwrap();
        let _peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
        assert!(transport.accept(Some(Duration::from_secs(5))).unwrap());
        assert!(TcpStream::connect(("127.0.0.1", port)).is_err());
    }

    #[test]
    fn not_connected_is_an_error() {
        let mut transport = TcpTransport::new();
        assert!(transport.send(b"x").is_err());
        assert!(transport.accept(Some(Duration::ZERO)).is_err());
    }

    #[test]
    fn unrepresentable_deadline_waits_indefinitely() {
        assert!(deadline(None).is_none());
        assert!(deadline(Some(Duration::from_secs(1))).is_some());
        assert!(deadline(Some(Duration::MAX)).is_none());
    }
}
