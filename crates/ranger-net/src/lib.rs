//! Request/response model and transport seam for ranger.
//!
//! This crate defines what travels between the client core and a store:
//!
//! - [`Request`] / [`Response`]: the per-command messages, with the
//!   region routing context a store uses to check ownership.
//! - [`ShardError`]: the shard-ownership errors a store answers with when
//!   the request was routed with stale region information.
//! - [`Transport`]: the narrow `send` interface the client consumes.
//! - [`encode_frame`] / [`decode_frame`]: length-prefixed postcard framing
//!   for transports that move messages over a byte stream.

mod codec;
mod error;
mod message;

use std::time::Duration;

use ranger_types::StoreId;

pub use codec::{MAX_FRAME_SIZE, decode_frame, encode_frame};
pub use error::NetError;
pub use message::{
    Command, DeleteRangeResponse, RawDeleteRangeResponse, RawDeleteResponse, RawGetResponse,
    RawPutResponse, RawScanResponse, Request, RequestContext, Response, ResponseBody, ShardError,
};

/// Trait abstracting request delivery to a store.
///
/// Implementations own connection management, encoding and any retry on
/// transport failures. The client treats every `Err` as final for the call.
/// This allows substituting an in-memory cluster in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `store` and wait for its response.
    ///
    /// `timeout` is the latency budget the caller grants this single
    /// round-trip.
    async fn send(
        &self,
        store: StoreId,
        request: Request,
        timeout: Duration,
    ) -> Result<Response, NetError>;
}
