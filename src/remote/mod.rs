pub mod adapter;
pub mod client;
pub mod response;

pub use adapter::{adapt_response, AdaptedResponse};
pub use client::{RemoteClient, RemoteRequest};
pub use response::RemoteResponse;
