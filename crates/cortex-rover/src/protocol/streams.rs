//! Parsed push-event payloads for the `sys` and `com` streams.

use serde_json::Value;

fn f64_to_f32(value: f64) -> Option<f32> {
    if !value.is_finite() {
        return None;
    }
    value.to_string().parse::<f32>().ok()
}

/// Parsed mental command data from a `com` stream event.
#[derive(Debug, Clone, PartialEq)]
pub struct MentalCommand {
    /// The detected action name (e.g., "push", "pull", "neutral").
    pub action: String,
    /// Action intensity 0.0–1.0. Zero when the service omits it.
    pub power: f32,
}

impl MentalCommand {
    /// Parse a `com` array: `[action_name, power]`.
    ///
    /// Returns `None` if the label is missing or not a string.
    #[must_use]
    pub fn from_com_array(com: &[Value]) -> Option<Self> {
        let action = com.first()?.as_str()?.to_owned();
        let power = com
            .get(1)
            .and_then(Value::as_f64)
            .and_then(f64_to_f32)
            .unwrap_or_default();

        Some(Self { action, power })
    }
}

/// Parsed system event from a `sys` stream event.
///
/// Layout: `[detection, event_name, ..]`. Training reacts to the event name
/// at index 1 only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysEvent {
    /// Detection the event belongs to, e.g. `"mentalCommand"`.
    pub detection: String,
    /// Event name, e.g. `"MC_Started"`.
    pub event: String,
}

impl SysEvent {
    /// Parse a `sys` array. Returns `None` if either element is missing.
    #[must_use]
    pub fn from_sys_array(sys: &[Value]) -> Option<Self> {
        Some(Self {
            detection: sys.first()?.as_str()?.to_owned(),
            event: sys.get(1)?.as_str()?.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mental_command_from_com_array() {
        let data = vec![json!("push"), json!(0.72)];
        let command = MentalCommand::from_com_array(&data).unwrap();
        assert_eq!(command.action, "push");
        assert!((command.power - 0.72).abs() < 1e-6);
    }

    #[test]
    fn test_mental_command_missing_power_defaults_to_zero() {
        let command = MentalCommand::from_com_array(&[json!("neutral")]).unwrap();
        assert_eq!(command.action, "neutral");
        assert!(command.power.abs() < f32::EPSILON);
    }

    #[test]
    fn test_mental_command_rejects_non_string_label() {
        assert!(MentalCommand::from_com_array(&[]).is_none());
        assert!(MentalCommand::from_com_array(&[json!(1), json!(0.5)]).is_none());
    }

    #[test]
    fn test_sys_event_reads_name_at_index_one() {
        let data = vec![json!("mentalCommand"), json!("MC_Succeeded")];
        let event = SysEvent::from_sys_array(&data).unwrap();
        assert_eq!(event.detection, "mentalCommand");
        assert_eq!(event.event, "MC_Succeeded");
    }

    #[test]
    fn test_sys_event_too_short() {
        assert!(SysEvent::from_sys_array(&[json!("mentalCommand")]).is_none());
    }
}
