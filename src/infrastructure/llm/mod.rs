//! Generation backend client and its HTTP transport

mod client;
mod http_client;

pub use client::GenerationClient;
pub use http_client::{ByteStream, GenerationTransport, HttpResponse, ReqwestTransport, TransportError};

#[cfg(test)]
pub use http_client::mock::{MockReply, MockTransport};
