//! Web API adapters.
//!
//! [`HttpScheduleStore`] implements [`ScheduleStore`] against the medicine
//! management server's JSON API and [`HttpNotifier`] implements
//! [`NotificationSender`] through its emergency-notification endpoint.  Both
//! use a blocking `reqwest` client that sends the `X-API-Key` header on every
//! request and gives up after the configured timeout.
//!
//! Endpoint map:
//!
//! | Operation                  | Request                                   |
//! |----------------------------|-------------------------------------------|
//! | `due_schedules`            | `GET  /api/check_schedule_by_user/{id}`   |
//! | `record_confirmation`      | `POST /api/confirm_medicine_by_user`      |
//! | `system_enabled`           | `GET  /api/system_status`                 |
//! | `set_system_enabled`       | `POST /api/system_control`                |
//! | `notification_profile`     | `GET  /api/user_profile/{id}`             |
//! | `update_medicine_quantity` | `POST /api/update_quantity`               |
//! | `send_emergency`           | `POST /api/emergency_notification`        |

use core::time::Duration;

use chrono::NaiveDateTime;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::app::ports::{ConfigError, NotificationSender, ScheduleStore};
use crate::config::ControllerConfig;
use crate::error::{NotifyError, TransportError};
use crate::model::{DueSchedule, MedicineId, NotificationProfile, ScheduleId, UserId};

const API_KEY_HEADER: &str = "X-API-Key";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shared client plumbing.
#[derive(Debug, Clone)]
struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ConfigError::ValidationFailed("api_key is not a valid header value"))?;
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(Self {
            http,
            base: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        debug!("HTTP: GET {path}");
        let resp = self.http.get(self.url(path)).send().map_err(transport)?;
        decode(resp)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T, TransportError> {
        debug!("HTTP: POST {path}");
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(transport)?;
        decode(resp)
    }
}

fn transport(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Unreachable(e.to_string())
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    let body = resp.text().map_err(transport)?;
    serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

// ───────────────────────────────────────────────────────────────
// Wire shapes
// ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SuccessReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusReply {
    system_enabled: bool,
}

#[derive(Deserialize)]
struct ControlReply {
    #[serde(default)]
    success: bool,
    system_enabled: Option<bool>,
}

#[derive(Deserialize)]
struct QuantityReply {
    #[serde(default)]
    success: bool,
    new_quantity: Option<i64>,
}

#[derive(Deserialize)]
struct ProfileReply {
    user_info: UserInfo,
}

#[derive(Deserialize)]
struct UserInfo {
    id: UserId,
    #[serde(default)]
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    notification_delay_minutes: Option<u32>,
    #[serde(default)]
    emergency_contact_name: Option<String>,
    #[serde(default)]
    emergency_contact_phone: Option<String>,
    #[serde(default)]
    emergency_contact_email: Option<String>,
}

/// The server fills unknown fields with `"N/A"`.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "N/A")
}

impl From<UserInfo> for NotificationProfile {
    fn from(info: UserInfo) -> Self {
        let mut profile = NotificationProfile::fallback(info.id);
        profile.full_name = present(info.full_name).unwrap_or_else(|| info.username.clone());
        profile.username = info.username;
        if let Some(delay) = info.notification_delay_minutes {
            profile.notification_delay_minutes = delay;
        }
        profile.emergency_contact_name = present(info.emergency_contact_name);
        profile.emergency_contact_phone = present(info.emergency_contact_phone).or(present(info.phone));
        profile.emergency_contact_email = present(info.emergency_contact_email).or(present(info.email));
        profile
    }
}

// ───────────────────────────────────────────────────────────────
// Schedule store
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpScheduleStore {
    api: ApiClient,
}

impl HttpScheduleStore {
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }
}

impl ScheduleStore for HttpScheduleStore {
    fn due_schedules(&self, user_id: UserId) -> Result<Vec<DueSchedule>, TransportError> {
        self.api.get(&format!("/api/check_schedule_by_user/{user_id}"))
    }

    fn record_confirmation(
        &self,
        schedule_id: ScheduleId,
        user_id: UserId,
        taken_at: NaiveDateTime,
    ) -> Result<(), TransportError> {
        let body = json!({
            "schedule_id": schedule_id,
            "user_id": user_id,
            "timestamp": taken_at.format(TIMESTAMP_FORMAT).to_string(),
        });
        let reply: SuccessReply = self.api.post("/api/confirm_medicine_by_user", &body)?;
        if reply.success {
            Ok(())
        } else {
            Err(TransportError::Decode(
                reply.error.unwrap_or_else(|| "confirmation rejected".into()),
            ))
        }
    }

    fn system_enabled(&self) -> Result<bool, TransportError> {
        let reply: StatusReply = self.api.get("/api/system_status")?;
        Ok(reply.system_enabled)
    }

    fn set_system_enabled(&self, enabled: bool, source: &str) -> Result<bool, TransportError> {
        let body = json!({
            "action": if enabled { "enable" } else { "disable" },
            "source": source,
            "notes": format!("toggled by {source}"),
        });
        let reply: ControlReply = self.api.post("/api/system_control", &body)?;
        if !reply.success {
            return Err(TransportError::Decode("system control rejected".into()));
        }
        Ok(reply.system_enabled.unwrap_or(enabled))
    }

    fn notification_profile(&self, user_id: UserId) -> Result<NotificationProfile, TransportError> {
        let reply: ProfileReply = self.api.get(&format!("/api/user_profile/{user_id}"))?;
        Ok(reply.user_info.into())
    }

    fn update_medicine_quantity(&self, medicine_id: MedicineId, delta: i32) -> Result<u32, TransportError> {
        let body = json!({ "medicine_id": medicine_id, "quantity_change": delta });
        let reply: QuantityReply = self.api.post("/api/update_quantity", &body)?;
        match (reply.success, reply.new_quantity) {
            (true, Some(q)) => Ok(q.clamp(0, u32::MAX as i64) as u32),
            _ => Err(TransportError::Decode("quantity update rejected".into())),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Caregiver notifier
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    api: ApiClient,
}

impl HttpNotifier {
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }
}

impl NotificationSender for HttpNotifier {
    fn send_emergency(
        &self,
        profile: &NotificationProfile,
        medicine_name: &str,
        compartment: u8,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "user_id": profile.user_id,
            "medicine_name": medicine_name,
            "compartment": compartment,
            "delay_minutes": profile.notification_delay_minutes,
        });
        let reply: SuccessReply = self
            .api
            .post("/api/emergency_notification", &body)
            .map_err(NotifyError::Transport)?;
        if reply.success {
            Ok(())
        } else {
            Err(NotifyError::Delivery(
                reply.error.unwrap_or_else(|| "server reported failure".into()),
            ))
        }
    }
}
