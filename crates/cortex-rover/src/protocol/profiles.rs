//! Profile protocol types.

use serde_json::Value;

/// Status values for the `setupProfile` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// Create a new empty profile.
    Create,
    /// Load a profile for a headset.
    Load,
    /// Persist the current profile state.
    Save,
}

impl ProfileStatus {
    /// Returns the Cortex API string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Create => "create",
            ProfileStatus::Load => "load",
            ProfileStatus::Save => "save",
        }
    }
}

/// Extract the profile name from a `getCurrentProfile` result.
///
/// The service answers with a bare name or a `{name, ..}` object; `null`,
/// `""`, `{}` and `{"name": null}` all mean no profile is loaded.
pub fn current_profile_name(result: &Value) -> Option<String> {
    let name = match result {
        Value::String(name) => Some(name.as_str()),
        Value::Object(object) => object.get("name").and_then(Value::as_str),
        _ => None,
    };
    name.filter(|n| !n.is_empty()).map(str::to_owned)
}
