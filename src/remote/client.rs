//! Seam between the dispatcher and the web calibration transport
use futures_util::future::BoxFuture;
use url::Url;

use crate::libre::RawBlock;
use crate::remote::response::RemoteResponse;

/// A request for the web calibration service
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRequest {
    /// A2 sensors, the service needs nothing but the block
    A2 { block: RawBlock, site: Url },
    /// Every other web-decoded sensor family
    General {
        block: RawBlock,
        serial: String,
        patch_info: Vec<u8>,
        site: Url,
        token: String,
    },
}

impl RemoteRequest {
    pub fn site(&self) -> &Url {
        match self {
            RemoteRequest::A2 { site, .. } | RemoteRequest::General { site, .. } => site,
        }
    }
}

/// Transport for the web calibration service
///
/// Retries, timeouts and connection handling belong to the implementation.
/// The returned future resolves once per request; if it never resolves, the
/// block produces no readings.
pub trait RemoteClient: Send + Sync {
    fn fetch(&self, request: RemoteRequest) -> BoxFuture<'static, Result<RemoteResponse, String>>;
}
