//! Training profiles and detection info.

use serde_json::json;

use crate::auth::AuthToken;
use crate::client::CortexClient;
use crate::error::{CortexError, CortexResult};
use crate::protocol::constants::Methods;
use crate::protocol::profiles::{ProfileStatus, current_profile_name};
use crate::protocol::training::{DetectionInfo, DetectionType};
use crate::transport::Channel;

impl<C: Channel> CortexClient<C> {
    /// Name of the profile currently loaded for `headset`.
    ///
    /// Fails with [`CortexError::NoProfile`] when nothing is loaded.
    pub async fn ensure_profile(
        &mut self,
        token: &AuthToken,
        headset: &str,
    ) -> CortexResult<String> {
        let result = self
            .call(
                Methods::GET_CURRENT_PROFILE,
                json!({
                    "_auth": token.as_str(),
                    "headset": headset,
                }),
            )
            .await?;

        current_profile_name(&result).ok_or_else(|| CortexError::NoProfile {
            headset: headset.to_owned(),
        })
    }

    /// Create, load or save `profile` for `headset`.
    pub async fn setup_profile(
        &mut self,
        token: &AuthToken,
        headset: &str,
        profile: &str,
        status: ProfileStatus,
    ) -> CortexResult<()> {
        self.call(
            Methods::SETUP_PROFILE,
            json!({
                "_auth": token.as_str(),
                "headset": headset,
                "profile": profile,
                "status": status.as_str(),
            }),
        )
        .await?;

        tracing::info!(headset, profile, status = status.as_str(), "Profile updated");
        Ok(())
    }

    /// Make sure a profile is loaded for `headset`, creating and loading
    /// `profile` if none is.
    ///
    /// Returns the name of the loaded profile, which may differ from
    /// `profile` when another one was already loaded.
    pub async fn load_or_create_profile(
        &mut self,
        token: &AuthToken,
        headset: &str,
        profile: &str,
    ) -> CortexResult<String> {
        match self.ensure_profile(token, headset).await {
            Ok(current) => {
                tracing::info!(headset, profile = %current, "Using loaded profile");
                Ok(current)
            }
            Err(CortexError::NoProfile { .. }) => {
                tracing::info!(headset, profile, "No profile loaded, creating one");
                self.setup_profile(token, headset, profile, ProfileStatus::Create)
                    .await?;
                self.setup_profile(token, headset, profile, ProfileStatus::Load)
                    .await?;
                Ok(profile.to_owned())
            }
            Err(e) => Err(e),
        }
    }

    /// Actions, controls and events available for a detection type.
    pub async fn get_detection_info(
        &mut self,
        detection: DetectionType,
    ) -> CortexResult<DetectionInfo> {
        let result = self
            .call(
                Methods::GET_DETECTION_INFO,
                json!({ "detection": detection.as_str() }),
            )
            .await?;

        serde_json::from_value(result).map_err(|e| CortexError::ProtocolError {
            reason: format!("Failed to parse detection info: {e}"),
        })
    }
}
