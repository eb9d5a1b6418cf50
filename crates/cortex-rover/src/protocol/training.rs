//! Detection and training protocol types.

use serde::Deserialize;

/// Detection type for the `training` and `getDetectionInfo` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionType {
    /// Mental command detection.
    MentalCommand,
}

impl DetectionType {
    /// Returns the Cortex API string for this detection type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::MentalCommand => "mentalCommand",
        }
    }
}

/// Training status/command for the `training` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    /// Start recording a sample for the action.
    Start,
    /// Keep the recorded sample and add it to the profile.
    Accept,
    /// Discard the recorded sample.
    Reject,
    /// Abort the training in progress.
    Reset,
}

impl TrainingStatus {
    /// Returns the Cortex API string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Start => "start",
            TrainingStatus::Accept => "accept",
            TrainingStatus::Reject => "reject",
            TrainingStatus::Reset => "reset",
        }
    }
}

/// Detection info from `getDetectionInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionInfo {
    /// Available actions for this detection type.
    pub actions: Vec<String>,
    /// Available training controls.
    #[serde(default)]
    pub controls: Vec<String>,
    /// Possible training events.
    #[serde(default)]
    pub events: Vec<String>,
}

impl DetectionInfo {
    /// Actions from `wanted` that the device does not support.
    pub fn unsupported<'a>(&self, wanted: &'a [String]) -> Vec<&'a str> {
        wanted
            .iter()
            .filter(|action| !self.actions.contains(action))
            .map(String::as_str)
            .collect()
    }
}
