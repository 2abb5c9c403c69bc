//! AWS SigV4 request signing with a replayable body stream.
//!
//! This crate signs one finished HTTP request at a time with the
//! `AWS4-HMAC-SHA256` algorithm, appending the `Authorization`,
//! `X-Amz-Date`, and (when a session token is present)
//! `X-Amz-Security-Token` headers that an AWS service endpoint expects.
//!
//! Request bodies are handled through the [`InputStream`] abstraction.
//! A single-pass body is transparently wrapped in a [`TeeStream`] so the
//! signer can hash it while the transport layer later replays the exact
//! same bytes from offset zero.
//!
//! # Example
//!
//! ```
//! use http::Request;
//! use sigv4::{Body, Credential, CursorStream, RequestSigner};
//!
//! # fn main() -> sigv4::Result<()> {
//! let body: Body = Some(Box::new(CursorStream::new("Test request body")));
//! let mut req = Request::builder()
//!     .method("PUT")
//!     .uri("https://example.amazonaws.com/upload")
//!     .header("host", "example.amazonaws.com")
//!     .body(body)?;
//!
//! let cred = Credential {
//!     access_key_id: "AKIDEXAMPLE".to_string(),
//!     secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
//!     session_token: None,
//! };
//!
//! let signer = RequestSigner::new("service", "us-east-1");
//! let when = sigv4::time::parse_iso8601("20150830T123600Z")?;
//! signer.sign_request(&mut req, &cred, when)?;
//!
//! assert!(req.headers().contains_key("authorization"));
//! assert!(req.headers().contains_key("x-amz-date"));
//! # Ok(())
//! # }
//! ```
//!
//! # Design notes
//!
//! - Signing is synchronous and deterministic: the signing instant is a
//!   caller-supplied [`time::DateTime`], never the system clock.
//! - All errors carry an [`ErrorKind`]; the first error aborts signing
//!   and no partial headers are emitted.
//! - The signing key and every intermediate of the derivation chain are
//!   zeroized on drop.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;

mod constants;
mod credential;
mod error;
mod sign;
mod stream;
mod tee;

pub use credential::Credential;
pub use error::{Error, ErrorKind, Result};
pub use sign::{RepeatedHeaderMode, RequestSigner};
pub use stream::{Body, CursorStream, InputStream, StreamStatus};
pub use tee::{TeeBranch, TeeStream};
