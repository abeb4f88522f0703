//! Target/source registry clients: a live `reqwest` implementation and, for
//! tests, an in-memory fake of the same capability traits (`spec.md` §6.2,
//! §9).

pub mod http;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use http::HttpRegistryClient;

#[cfg(any(test, feature = "test-util"))]
pub use fake::{FakeCall, FakeRegistryClient, FakeSubjectState};
