//! Wire protocol shared by the KaTeX SSR host and its rendering worker.
//!
//! The host and the worker exchange newline-terminated JSON records over the
//! worker's standard input and output. The host writes one
//! [`RenderRequest`] per line; the worker answers every render request with
//! exactly one [`RenderResponse`] line and answers setup requests with
//! nothing at all.
//!
//! The channel carries no mandatory correlation identifier, so responses are
//! matched to requests purely by order. Render requests may carry an optional
//! `id` which a cooperating worker echoes back; the host uses it to detect a
//! desynchronised channel but never relies on it for routing.
//!
//! # Example
//!
//! ```
//! use katex_ssr_protocol::{RenderRequest, RenderResponse, decode_response, encode_request};
//!
//! let request = RenderRequest::render("E = mc^2", false, Default::default());
//! let record = encode_request(&request).expect("encodes");
//! assert!(record.ends_with('\n'));
//!
//! let response = decode_response(r#"{"status":"success","html":"<span>E</span>"}"#)
//!     .expect("decodes");
//! assert_eq!(response.html(), Some("<span>E</span>"));
//! ```

pub mod codec;
pub mod error;
pub mod request;
pub mod response;

pub use self::codec::{
    RECORD_TERMINATOR, decode_request, decode_response, encode_request, encode_response,
};
pub use self::error::{ProtocolError, RecordKind};
pub use self::request::{FormulaRequest, RenderOptions, RenderRequest};
pub use self::response::{RenderResponse, ResponseStatus};
