use core::future::Future;
use core::pin::Pin;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::transport::AsyncTransport;

/// Tokio transport over any async byte stream.
///
/// Use [`StreamTransport::new`] with a TLS stream for real iLO cards; [`StreamTransport::connect`]
/// opens a plain TCP connection.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl StreamTransport<TcpStream> {
    /// Connect a plain TCP stream to `target`, giving up after `timeout`.
    pub async fn connect(target: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(target))
            .await
            .map_err(|_elapsed| Error::Timeout)??;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl<S> StreamTransport<S> {
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Give the stream back.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> AsyncTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn send<'a>(
        &'a mut self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.stream.write_all(data).await?;
            self.stream.flush().await?;
            Ok(())
        })
    }

    fn recv<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::time::timeout(timeout, self.stream.read(buf)).await {
                Ok(Ok(n)) => Ok(n),
                Ok(Err(e)) => Err(Error::Io(e)),
                Err(_elapsed) => Err(Error::Timeout),
            }
        })
    }
}
