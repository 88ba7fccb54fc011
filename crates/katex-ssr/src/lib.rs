//! Build-time KaTeX rendering host.
//!
//! Formulas are typeset by a persistent `katex-ssr-worker` process that
//! speaks newline-delimited JSON over its stdin and stdout. The host side
//! layers three pieces over that channel:
//!
//! - [`ChannelSupervisor`] owns the worker, admits one request at a time,
//!   and replaces the process after any failure that could desynchronise
//!   the response stream;
//! - [`RenderCache`] maps a fingerprint of every rendering input to
//!   previously produced HTML, optionally persisted on disk;
//! - [`RenderService`] composes the two and is the entry point for callers.
//!
//! ```no_run
//! use katex_ssr::{bootstrap, FileConfigLoader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = bootstrap(&FileConfigLoader::default())?;
//! let html = service.render_formula("E = mc^2", false)?;
//! assert!(html.contains("katex"));
//! service.finish();
//! # Ok(())
//! # }
//! ```

mod bootstrap;
pub mod cache;
pub mod cli;
mod error;
pub mod service;
pub mod supervisor;
pub mod telemetry;

pub use self::bootstrap::{
    BootstrapError, ConfigLoader, FileConfigLoader, bootstrap, build_service, load_config,
};
pub use self::cache::{CacheKey, RenderCache};
pub use self::error::{ChannelError, RenderServiceError};
pub use self::service::{RenderService, RenderSettings, StatsSnapshot};
pub use self::supervisor::{
    ChannelReply, ChannelSupervisor, RenderChannel, WorkerConfig, WorkerState,
};
