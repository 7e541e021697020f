#[cfg(feature = "blocking")]
use std::time::Duration;

#[cfg(feature = "blocking")]
use crate::error::Result;

/// A synchronous duplex byte stream to the controller.
///
/// The stream is expected to be connected (and, for real iLO cards, wrapped in TLS) before it is
/// handed to the client.
#[cfg(feature = "blocking")]
pub trait Transport {
    /// Write all of `data` to the stream.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` at end of stream and [`crate::Error::Timeout`] when nothing arrived in time.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

#[cfg(feature = "async")]
mod async_support {
    use core::future::Future;
    use core::pin::Pin;
    use std::time::Duration;

    use crate::error::Result;

    /// An asynchronous duplex byte stream to the controller.
    pub trait AsyncTransport {
        /// Write all of `data` to the stream.
        fn send<'a>(
            &'a mut self,
            data: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

        /// Read whatever is available into `buf`, waiting at most `timeout`.
        ///
        /// Returns `Ok(0)` at end of stream and [`crate::Error::Timeout`] when nothing arrived in
        /// time.
        fn recv<'a>(
            &'a mut self,
            buf: &'a mut [u8],
            timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>;
    }
}

#[cfg(feature = "async")]
pub use async_support::AsyncTransport;

#[cfg(feature = "blocking")]
pub(crate) mod blocking;

#[cfg(feature = "async")]
pub(crate) mod tokio;
