#![forbid(unsafe_code)]
//! Asynchronous server for a minimal 9P2000.L dialect.
//!
//! This crate implements the server side of a small subset of 9P2000.L on top
//! of tokio: version negotiation, attaching named resources to client chosen
//! fids, querying their attributes and releasing them.
//!
//! # Overview
//!
//! The server is built from a few layers:
//!
//! - [`serialize`]: a template driven codec over the field alphabet
//!   `B W L Q S I` (byte, word, long, quad, string, qid).
//! - [`frame`]: cuts a byte stream into `size[4] type[1] payload` frames.
//! - [`catalog`]: the table of supported requests, their templates and the
//!   templates of their replies.
//! - [`session`]: per-connection state, i.e. the negotiated frame size and
//!   the fid table.
//! - [`srv`]: reads a frame, dispatches it against the session and writes
//!   the reply; plus TCP and Unix socket listeners.
//!
//! Resource identities come from a [`provider::ResourceProvider`]; the
//! bundled [`provider::DirProvider`] uses inode numbers below an exported
//! directory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lite9p::{config::Config, provider::DirProvider, srv::srv_async};
//!
//! #[tokio::main]
//! async fn main() -> lite9p::Result<()> {
//!     let provider = Arc::new(DirProvider::new("/srv/export"));
//!     srv_async(provider, Config::default(), "tcp!0.0.0.0!1942").await
//! }
//! ```
//!
//! # Protocol Details
//!
//! | request      | code | template | reply        | code | template     |
//! |--------------|------|----------|--------------|------|--------------|
//! | `TVersion`   | 100  | `WLS`    | `RVersion`   | 101  | `WLS`        |
//! | `TAttach`    | 104  | `WLLSSL` | `RAttach`    | 105  | `WI`         |
//! | `TGetAttr`   | 24   | `WLQ`    | `RGetAttr`   | 26   | `WQI` + 30 Q |
//! | `TClunk`     | 120  | `WL`     | `RClunk`     | 121  | `W`          |
//!
//! Requests referencing an unattached fid, or attaching a resource that
//! cannot be found, are answered with `RlError` (code 7, template `WL`)
//! carrying an errno. Malformed frames and unknown commands close the
//! connection without a reply.
//!
//! ## Fid Management
//!
//! - Attaching an already attached fid replaces its binding
//! - `TVersion` drops every fid of the connection
//! - After `TClunk`, the fid is unknown until attached again
pub mod catalog;
pub mod config;
pub mod error;
pub mod fcall;
pub mod frame;
pub mod provider;
pub mod qid;
pub mod serialize;
pub mod session;
pub mod srv;
#[macro_use]
pub mod utils;

pub use crate::error::Error;
pub use crate::error::errno;
pub use crate::error::string as errstr;
pub use crate::fcall::*;
pub use crate::utils::Result;
