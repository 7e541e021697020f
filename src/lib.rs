#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A blocking (and optionally Tokio-based) RIBCL client for HP iLO power control.
//!
//! The crate implements the part of RIBCL a fencing agent needs:
//! - greeting and protocol version discovery
//! - login and, on RIBCL 2.0+, firmware/processor detection
//! - host power status queries
//! - power commands in the dialect the controller generation understands
//! - fence actions (on, off, cycle) that wait for the host to reach the requested state
//!
//! The encrypted stream itself is supplied by the caller through [`Transport`] (or
//! [`AsyncTransport`] with the `async` feature).
//!
//! ```no_run
//! # #[cfg(feature = "blocking")]
//! # fn main() -> ribcl::Result<()> {
//! use ribcl::{Client, PowerAction};
//!
//! let mut client = Client::builder()
//!     .username("Administrator")
//!     .password("secret")
//!     .connect("127.0.0.1:8443".parse().expect("address"))?;
//! client.fence(PowerAction::Cycle)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "blocking"))]
//! # fn main() {}
//! ```

mod client;
mod debug;
mod error;
mod expect;
mod observe;
mod protocol;
mod secret;
mod session;
mod transport;
mod types;

#[cfg(feature = "async")]
pub use crate::client::AsyncClient;
#[cfg(feature = "blocking")]
pub use crate::client::Client;
pub use crate::client::ClientBuilder;
pub use crate::error::{Error, Result};
#[cfg(feature = "async")]
pub use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
pub use crate::transport::Transport;
#[cfg(feature = "blocking")]
pub use crate::transport::blocking::TcpTransport;
#[cfg(feature = "async")]
pub use crate::transport::tokio::StreamTransport;
pub use crate::types::{
    Capabilities, PowerAction, PowerControlDialect, PowerState, ProcessorFamily, ProtocolVersion,
};
