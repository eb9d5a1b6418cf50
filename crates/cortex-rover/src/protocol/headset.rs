//! Headset discovery protocol types.

use serde::Deserialize;

/// Headset info returned by `queryHeadsets`.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadsetInfo {
    /// Headset ID (e.g., "INSIGHT-A1B2C3D4").
    pub id: String,

    /// Connection status: "discovered", "connecting", "connected".
    #[serde(default)]
    pub status: Option<String>,

    /// How the headset is connected: "dongle", "bluetooth", "usb cable".
    #[serde(default, rename = "connectedBy")]
    pub connected_by: Option<String>,
}
