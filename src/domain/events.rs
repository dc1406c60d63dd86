// Decoded push events delivered over the messaging channel
use super::notification::Notification;
use super::reading::ClassifiedReading;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    BatteryUpdate(ClassifiedReading),
    Notification(Notification),
}
