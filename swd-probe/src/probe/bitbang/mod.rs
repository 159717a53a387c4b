//! SWD over the OpenOCD `remote_bitbang` protocol.
//!
//! The server side can be OpenOCD's own `remote_bitbang` driver counterpart, a simulator,
//! or a small firmware toggling GPIOs. Open it with the `remote-bitbang` backend:
//!
//! ```no_run
//! let config = "remote-bitbang:host=localhost:port=44242".parse()?;
//! let session = swd_probe::open_backend(&config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bitbang_adapter;
mod bitbang_engine;

pub use bitbang_adapter::BitBangAdapter;
pub use bitbang_engine::BitBangEngine;
