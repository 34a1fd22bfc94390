//! A thin HTTP client for the Agent Communication Protocol, mirroring the
//! shape of `ag-ui-client::http::HttpAgent`: a `reqwest::Client` plus a
//! base URL, with the streaming mode decoded via server-sent events.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod http;
mod stream;

pub use error::{ClientError, ClientResult};
pub use http::AcpClient;
pub use stream::EventStream;
