//! HTTP message types and the probe transport

mod message;
mod response;
mod transport;

pub use message::{Parameter, ProbeRequest, ProbeRequestBuilder};
pub use response::{ProbeResponse, SetCookie};
pub use transport::{ReqwestTransport, Transport};
