#[cfg(feature = "blocking")]
pub(crate) mod blocking;

pub(crate) mod core;

#[cfg(feature = "async")]
pub(crate) mod tokio;

#[cfg(feature = "blocking")]
pub use self::blocking::Client;
pub use self::core::ClientBuilder;
#[cfg(feature = "async")]
pub use self::tokio::AsyncClient;
