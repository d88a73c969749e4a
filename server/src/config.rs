//! Relay configuration: routing table, id scheme and back-pressure policy.

use serde::{Deserialize, Serialize};
use shared::protocol::{CREATE_PLAYER, UPDATE_PLAYER};
use std::collections::HashMap;
use std::str::FromStr;

/// Where a relayed message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayPolicy {
    /// Echo back to the session that sent it.
    ToSender,
    /// Every live session except the sender.
    ToOthers,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown relay policy `{0}` (expected toSender or toOthers)")]
    UnknownPolicy(String),
    #[error("route `{0}` must look like <type>=<policy>")]
    MalformedRoute(String),
}

impl FromStr for RelayPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toSender" | "player" => Ok(RelayPolicy::ToSender),
            "toOthers" | "others" => Ok(RelayPolicy::ToOthers),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Static map from message type to relay policy. Types not in the table are
/// logged and dropped by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<String, RelayPolicy>,
}

impl RoutingTable {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn with_route(mut self, kind: impl Into<String>, policy: RelayPolicy) -> Self {
        self.insert(kind, policy);
        self
    }

    pub fn insert(&mut self, kind: impl Into<String>, policy: RelayPolicy) {
        self.routes.insert(kind.into(), policy);
    }

    pub fn policy_for(&self, kind: &str) -> Option<RelayPolicy> {
        self.routes.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::empty()
            .with_route(CREATE_PLAYER, RelayPolicy::ToOthers)
            .with_route(UPDATE_PLAYER, RelayPolicy::ToOthers)
    }
}

/// Parses a `<type>=<policy>` command-line route.
pub fn parse_route(rule: &str) -> Result<(String, RelayPolicy), ConfigError> {
    let (kind, policy) = rule
        .split_once('=')
        .ok_or_else(|| ConfigError::MalformedRoute(rule.to_string()))?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(ConfigError::MalformedRoute(rule.to_string()));
    }
    Ok((kind.to_string(), policy.trim().parse()?))
}

/// How session ids are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IdScheme {
    /// "1", "2", ... in connection order.
    #[default]
    Counter,
    /// 32 random hex digits.
    Random,
}

/// What happens when a session's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the frame for that session only.
    #[default]
    Drop,
    /// Evict the session as if it had closed.
    Disconnect,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub id_scheme: IdScheme,
    /// Frames buffered per connection before the overflow policy applies.
    pub queue_size: usize,
    pub overflow: OverflowPolicy,
    pub routes: RoutingTable,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            id_scheme: IdScheme::default(),
            queue_size: 256,
            overflow: OverflowPolicy::default(),
            routes: RoutingTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let routes = RoutingTable::default();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes.policy_for(CREATE_PLAYER), Some(RelayPolicy::ToOthers));
        assert_eq!(routes.policy_for(UPDATE_PLAYER), Some(RelayPolicy::ToOthers));
        assert_eq!(routes.policy_for("chat"), None);
    }

    #[test]
    fn test_policy_names_and_aliases() {
        assert_eq!("toSender".parse::<RelayPolicy>(), Ok(RelayPolicy::ToSender));
        assert_eq!("player".parse::<RelayPolicy>(), Ok(RelayPolicy::ToSender));
        assert_eq!("toOthers".parse::<RelayPolicy>(), Ok(RelayPolicy::ToOthers));
        assert_eq!("others".parse::<RelayPolicy>(), Ok(RelayPolicy::ToOthers));
        assert_eq!(
            "everyone".parse::<RelayPolicy>(),
            Err(ConfigError::UnknownPolicy("everyone".into()))
        );
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&RelayPolicy::ToSender).unwrap(),
            "\"toSender\""
        );
        let policy: RelayPolicy = serde_json::from_str("\"toOthers\"").unwrap();
        assert_eq!(policy, RelayPolicy::ToOthers);
    }

    #[test]
    fn test_parse_route() {
        assert_eq!(
            parse_route("ping=toSender"),
            Ok(("ping".to_string(), RelayPolicy::ToSender))
        );
        assert_eq!(
            parse_route(" chat = others "),
            Ok(("chat".to_string(), RelayPolicy::ToOthers))
        );
        assert!(matches!(
            parse_route("chat"),
            Err(ConfigError::MalformedRoute(_))
        ));
        assert!(matches!(
            parse_route("=toSender"),
            Err(ConfigError::MalformedRoute(_))
        ));
        assert!(matches!(
            parse_route("chat=nobody"),
            Err(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_route_override() {
        let mut routes = RoutingTable::default();
        routes.insert(UPDATE_PLAYER, RelayPolicy::ToSender);
        assert_eq!(routes.policy_for(UPDATE_PLAYER), Some(RelayPolicy::ToSender));
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.id_scheme, IdScheme::Counter);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert_eq!(config.queue_size, 256);
        assert!(config.bind_addr.parse::<std::net::SocketAddr>().is_ok());
    }
}
