//! Headset discovery.

use serde_json::json;

use crate::client::CortexClient;
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Methods;
use crate::protocol::headset::HeadsetInfo;
use crate::transport::Channel;

impl<C: Channel> CortexClient<C> {
    /// Query headsets known to the service.
    pub async fn query_headsets(&mut self) -> CortexResult<Vec<HeadsetInfo>> {
        let result = self.call(Methods::QUERY_HEADSETS, json!({})).await?;

        let headsets: Vec<HeadsetInfo> =
            serde_json::from_value(result).map_err(|e| CortexError::ProtocolError {
                reason: format!("Failed to parse headset list: {e}"),
            })?;

        tracing::info!(count = headsets.len(), "Queried headsets");
        Ok(headsets)
    }

    /// Id of the first headset the service reports.
    ///
    /// Fails with [`CortexError::NoHeadsetFound`] when the list is empty.
    pub async fn locate_headset(&mut self) -> CortexResult<String> {
        let headsets = self.query_headsets().await?;
        let headset = headsets
            .into_iter()
            .next()
            .ok_or(CortexError::NoHeadsetFound)?;

        tracing::info!(
            headset = %headset.id,
            status = headset.status.as_deref().unwrap_or("unknown"),
            connected_by = headset.connected_by.as_deref().unwrap_or("unknown"),
            "Using headset"
        );
        Ok(headset.id)
    }
}
