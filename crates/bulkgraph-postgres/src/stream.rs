//! Byte transport under a [`PgWire`](crate::PgWire).

#![allow(clippy::manual_async_fn)]

use asupersync::io::{AsyncRead, AsyncWrite, ReadBuf};
use asupersync::net::TcpStream;
use std::future::Future;
use std::io;

/// A connected, authenticated byte stream to the server.
///
/// Connection startup and authentication happen before a stream is handed to
/// the wire layer.
pub trait WireStream: Send {
    /// Write all of `data` and flush.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Read whatever is available into `buf`. `Ok(0)` means end of stream.
    fn read_into(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

impl WireStream for TcpStream {
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let mut written = 0;
            while written < data.len() {
                let n = std::future::poll_fn(|cx| {
                    std::pin::Pin::new(&mut *self).poll_write(cx, &data[written..])
                })
                .await?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                written += n;
            }
            std::future::poll_fn(|cx| std::pin::Pin::new(&mut *self).poll_flush(cx)).await
        }
    }

    fn read_into(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        async move {
            let mut read_buf = ReadBuf::new(buf);
            std::future::poll_fn(|cx| std::pin::Pin::new(&mut *self).poll_read(cx, &mut read_buf))
                .await?;
            Ok(read_buf.filled().len())
        }
    }
}
