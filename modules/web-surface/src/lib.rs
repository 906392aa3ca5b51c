//! Building blocks for probing one HTTP path: client, response filters,
//! path sanitization, title and technology extraction, raw response storage
//! and the XSS / CRLF probers.

pub mod client;
pub mod crlf;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod path;
pub mod store;
pub mod title;
pub mod xss;

pub use client::{build_client, random_user_agent, read_body, ClientOptions};
pub use crlf::{CrlfProber, HeaderInjectionProber};
pub use error::PathError;
pub use filter::{FetchedResponse, FilterContext, PathIndex, Verdict};
pub use fingerprint::fingerprint;
pub use path::{normalize_path, sanitize_segment};
pub use store::{RawResponse, ResponseStore};
pub use title::extract_title;
pub use xss::{ProbeOptions, ReflectionProber, XssProber, XssReport};
