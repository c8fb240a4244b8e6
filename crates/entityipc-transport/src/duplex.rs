use std::io::{Read, Write};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// The write half of a duplex stream.
///
/// `shutdown` closes the connection so that a reader blocked on the other
/// half (or on the peer) observes end-of-stream. Streams that cannot signal
/// this only flush.
pub trait DuplexWriter: Write + Send {
    fn shutdown(&mut self) -> std::io::Result<()> {
        self.flush()
    }
}

/// A bidirectional byte stream that can be split into independently owned
/// read and write halves.
pub trait Duplex {
    type Reader: Read + Send + 'static;
    type Writer: DuplexWriter + 'static;

    fn split(self) -> Result<(Self::Reader, Self::Writer)>;
}

/// Adapter for write halves that have no shutdown primitive of their own
/// (pipes, buffers). Dropping it closes the underlying handle.
#[derive(Debug)]
pub struct WriteHalf<W>(pub W);

impl<W: Write> Write for WriteHalf<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Send> DuplexWriter for WriteHalf<W> {}

impl<R, W> Duplex for (R, WriteHalf<W>)
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    type Reader = R;
    type Writer = WriteHalf<W>;

    fn split(self) -> Result<(R, WriteHalf<W>)> {
        Ok(self)
    }
}

#[cfg(unix)]
impl DuplexWriter for IpcStream {
    fn shutdown(&mut self) -> std::io::Result<()> {
        IpcStream::shutdown(self).map_err(TransportError::into_io)
    }
}

#[cfg(unix)]
impl Duplex for IpcStream {
    type Reader = IpcStream;
    type Writer = IpcStream;

    fn split(self) -> Result<(IpcStream, IpcStream)> {
        let reader = self.try_clone().map_err(|err| TransportError::Split(err.into_io()))?;
        Ok((reader, self))
    }
}

#[cfg(unix)]
impl DuplexWriter for std::os::unix::net::UnixStream {
    fn shutdown(&mut self) -> std::io::Result<()> {
        ignore_not_connected(std::os::unix::net::UnixStream::shutdown(
            self,
            std::net::Shutdown::Both,
        ))
    }
}

#[cfg(unix)]
impl Duplex for std::os::unix::net::UnixStream {
    type Reader = std::os::unix::net::UnixStream;
    type Writer = std::os::unix::net::UnixStream;

    fn split(self) -> Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone().map_err(TransportError::Split)?;
        Ok((reader, self))
    }
}

impl DuplexWriter for std::net::TcpStream {
    fn shutdown(&mut self) -> std::io::Result<()> {
        ignore_not_connected(std::net::TcpStream::shutdown(self, std::net::Shutdown::Both))
    }
}

impl Duplex for std::net::TcpStream {
    type Reader = std::net::TcpStream;
    type Writer = std::net::TcpStream;

    fn split(self) -> Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone().map_err(TransportError::Split)?;
        Ok((reader, self))
    }
}

fn ignore_not_connected(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn pair_split_returns_halves() {
        let stream = (Cursor::new(b"inbound".to_vec()), WriteHalf(Vec::<u8>::new()));
        let (mut reader, mut writer) = stream.split().unwrap();

        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "inbound");

        writer.write_all(b"outbound").unwrap();
        writer.shutdown().unwrap();
        assert_eq!(writer.0, b"outbound");
    }

    #[test]
    #[cfg(unix)]
    fn unix_stream_shutdown_reaches_reader_half() {
        let (left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        let (mut reader, mut writer) = left.split().unwrap();

        writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        DuplexWriter::shutdown(&mut writer).unwrap();
        let mut rest = Vec::new();
        assert_eq!(reader.read_to_end(&mut rest).unwrap(), 0);
        assert_eq!(right.read_to_end(&mut rest).unwrap(), 0);
    }

    #[test]
    fn tcp_stream_split() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || std::net::TcpStream::connect(addr).unwrap());
        let (mut server, _) = listener.accept().unwrap();
        let client = client.join().unwrap();

        let (_reader, mut writer) = client.split().unwrap();
        writer.write_all(b"tcp").unwrap();
        let mut buf = [0u8; 3];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"tcp");
    }
}
