use serde::Deserialize;
use serde_json::Value;

use presence_types::Status;
use presence_types::models::Observation;

use crate::probe::ProbeError;

/// Maps a raw reply for a target's group into an observation.
pub type ResultProcessor = fn(&str, Value) -> Result<Observation, ProbeError>;

/// Reply from the probe endpoint.
///
/// Either `status` (`success` / `warning` / `error`) or a bare `online` flag
/// must be present. `user` overrides the username the target was filed under.
#[derive(Debug, Deserialize)]
struct ProbePayload {
    status: Option<String>,
    online: Option<bool>,
    user: Option<String>,
}

/// Normalize a raw probe reply for `group` into an observation.
pub fn process_result(group: &str, result: Value) -> Result<Observation, ProbeError> {
    let payload: ProbePayload =
        serde_json::from_value(result).map_err(|e| ProbeError::Payload(e.to_string()))?;

    let status = match (payload.status.as_deref(), payload.online) {
        (Some(raw), _) => raw
            .trim()
            .to_ascii_lowercase()
            .parse::<Status>()
            .map_err(|e| ProbeError::Payload(e.to_string()))?,
        (None, Some(true)) => Status::Success,
        (None, Some(false)) => Status::Error,
        (None, None) => return Err(ProbeError::Payload("no status or online field".into())),
    };

    let username = payload
        .user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| group.to_string());

    Ok(Observation::new(username, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_field() {
        let obs = process_result("alice", json!({ "status": "warning" })).unwrap();
        assert_eq!(obs, Observation::new("alice", Status::Warning));

        let obs = process_result("alice", json!({ "status": " SUCCESS " })).unwrap();
        assert_eq!(obs.status, Status::Success);
    }

    #[test]
    fn test_online_flag() {
        assert_eq!(process_result("a", json!({ "online": true })).unwrap().status, Status::Success);
        assert_eq!(process_result("a", json!({ "online": false })).unwrap().status, Status::Error);
    }

    #[test]
    fn test_status_wins_over_online() {
        let obs = process_result("a", json!({ "status": "warning", "online": true })).unwrap();
        assert_eq!(obs.status, Status::Warning);
    }

    #[test]
    fn test_user_override() {
        let obs = process_result("group-1", json!({ "status": "success", "user": "bob" })).unwrap();
        assert_eq!(obs.username, "bob");

        let obs = process_result("group-1", json!({ "status": "success", "user": "  " })).unwrap();
        assert_eq!(obs.username, "group-1");
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(process_result("a", json!({})), Err(ProbeError::Payload(_))));
        assert!(matches!(process_result("a", json!([1, 2])), Err(ProbeError::Payload(_))));
        assert!(matches!(
            process_result("a", json!({ "status": "online" })),
            Err(ProbeError::Payload(_))
        ));
        assert!(matches!(
            process_result("a", json!({ "status": 3 })),
            Err(ProbeError::Payload(_))
        ));
    }
}
