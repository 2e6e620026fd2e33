//! Response bodies served by the HTTP status endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse service status reported by `GET /`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
	Ready,
	Initializing,
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBody {
	pub status: ServiceStatus,
	pub message: String,
}

impl StatusBody {
	pub fn from_ready(ready: bool) -> Self {
		if ready {
			Self {
				status: ServiceStatus::Ready,
				message: "WhatsApp headless session is running".to_string(),
			}
		} else {
			Self {
				status: ServiceStatus::Initializing,
				message: "Session is initializing".to_string(),
			}
		}
	}
}

/// Body of `GET /health`.
///
/// `state` and `last_error` are operator diagnostics; clients should only
/// rely on `whatsapp_ready`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
	pub status: String,
	pub whatsapp_ready: bool,
	pub timestamp: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

impl HealthBody {
	pub fn new(whatsapp_ready: bool, timestamp: DateTime<Utc>) -> Self {
		Self {
			status: "ok".to_string(),
			whatsapp_ready,
			timestamp,
			state: None,
			last_error: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;
	use serde_json::json;

	use super::*;

	#[test]
	fn status_body_uses_lowercase_status() {
		let body = serde_json::to_value(StatusBody::from_ready(false)).unwrap();
		assert_eq!(body["status"], "initializing");

		let body = serde_json::to_value(StatusBody::from_ready(true)).unwrap();
		assert_eq!(body["status"], "ready");
	}

	#[test]
	fn health_body_matches_endpoint_shape() {
		let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
		let body = serde_json::to_value(HealthBody::new(true, timestamp)).unwrap();
		assert_eq!(
			body,
			json!({
				"status": "ok",
				"whatsappReady": true,
				"timestamp": "2026-01-02T03:04:05Z"
			})
		);
	}

	#[test]
	fn health_body_includes_diagnostics_when_present() {
		let mut body = HealthBody::new(false, Utc::now());
		body.state = Some("retrying".to_string());
		body.last_error = Some("no page marker detected".to_string());

		let value = serde_json::to_value(&body).unwrap();
		assert_eq!(value["state"], "retrying");
		assert_eq!(value["lastError"], "no page marker detected");
	}
}
