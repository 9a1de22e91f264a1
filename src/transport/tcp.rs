//! DNS over TCP framing.
//!
//! TCP DNS messages are prefixed with a 2-byte big-endian length. The
//! helpers here work on any async byte stream, so the same exchange runs
//! over a direct connection and over a SOCKS5 tunnel.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Send one query and wait for one response on `stream`.
///
/// Both `query` and the returned message exclude the length prefix.
pub async fn exchange<S>(stream: &mut S, query: &[u8]) -> io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_dns_message(stream, query).await?;
    read_dns_message(stream).await
}

/// Write a DNS message with its length prefix.
pub async fn write_dns_message<S>(stream: &mut S, message: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let len = u16::try_from(message.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "DNS message exceeds 65535 bytes")
    })?;

    let mut framed = Vec::with_capacity(2 + message.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message);

    stream.write_all(&framed).await?;
    stream.flush().await
}

/// Read a length-prefixed DNS message from a stream.
///
/// Returns the message without the prefix. A stream that closes before
/// the full message arrives yields `UnexpectedEof`.
pub async fn read_dns_message<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix).await?;

    let msg_len = u16::from_be_bytes(prefix) as usize;
    let mut buf = vec![0u8; msg_len];
    stream.read_exact(&mut buf).await?;

    Ok(buf)
}
