//! MQTT settings and the topic scheme derived from them.
//!
//! Every topic has the shape `[prefix/]<kind>/<client id>[/suffix]`:
//!
//! | Kind        | Segment | Direction |
//! |-------------|---------|-----------|
//! | Config      | `conf`  | inbound   |
//! | Command     | `cmnd`  | inbound   |
//! | Status      | `stat`  | outbound  |
//! | Telemetry   | `tele`  | outbound  |
//! | Adopt       | `adopt` | outbound  |
//! | Log         | `log`   | outbound  |

use serde::{Deserialize, Serialize};

/// Default unencrypted MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Config,
    Command,
    Status,
    Telemetry,
    Adopt,
    Log,
}

impl TopicKind {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Config => "conf",
            Self::Command => "cmnd",
            Self::Status => "stat",
            Self::Telemetry => "tele",
            Self::Adopt => "adopt",
            Self::Log => "log",
        }
    }
}

/// Broker connection and topic settings.
///
/// The client id starts out as the MAC-derived default set during bring-up;
/// persisted settings loaded by the management API take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MqttSettings {
    pub client_id: String,
    pub broker: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: Option<String>,
    pub topic_suffix: Option<String>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            broker: None,
            port: DEFAULT_BROKER_PORT,
            username: None,
            password: None,
            topic_prefix: None,
            topic_suffix: None,
        }
    }
}

impl MqttSettings {
    /// Full topic string for `kind`.
    pub fn topic(&self, kind: TopicKind) -> String {
        let mut topic = String::new();
        if let Some(prefix) = non_empty(self.topic_prefix.as_deref()) {
            topic.push_str(prefix);
            topic.push('/');
        }
        topic.push_str(kind.segment());
        topic.push('/');
        topic.push_str(&self.client_id);
        if let Some(suffix) = non_empty(self.topic_suffix.as_deref()) {
            topic.push('/');
            topic.push_str(suffix);
        }
        topic
    }

    /// Map an inbound topic onto the kinds this device subscribes to.
    pub fn classify(&self, topic: &str) -> Option<TopicKind> {
        [TopicKind::Config, TopicKind::Command]
            .into_iter()
            .find(|kind| self.topic(*kind) == topic)
    }

    /// Whether enough is configured to attempt a broker connection.
    pub fn is_connectable(&self) -> bool {
        !self.client_id.is_empty() && non_empty(self.broker.as_deref()).is_some()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
