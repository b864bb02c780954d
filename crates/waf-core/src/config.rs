//! Plugin configuration
//!
//! Decodes the plugin-wide JSON payload delivered by the host. Unknown keys
//! are rejected; enumerated values match regardless of letter case.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Behaviour when the engine cannot produce a verdict
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Let the request through
    #[default]
    FailOpen,
    /// Deny the request
    FailClosed,
}

/// How rule fragments are applied on reconfiguration
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Append to the rule set already loaded
    #[default]
    Accumulate,
    /// Load into an empty rule set and swap it in on success
    Rebuild,
}

const FAILURE_MODE_NAMES: &[&str] = &["fail_open", "fail_closed"];
const RELOAD_POLICY_NAMES: &[&str] = &["accumulate", "rebuild"];

const FAILURE_MODES: &[(&str, FailureMode)] = &[
    ("fail_open", FailureMode::FailOpen),
    ("fail_closed", FailureMode::FailClosed),
];

const RELOAD_POLICIES: &[(&str, ReloadPolicy)] = &[
    ("accumulate", ReloadPolicy::Accumulate),
    ("rebuild", ReloadPolicy::Rebuild),
];

fn parse_variant<T: Copy>(value: &str, variants: &[(&'static str, T)]) -> Option<T> {
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, variant)| *variant)
}

impl<'de> Deserialize<'de> for FailureMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_variant(&value, FAILURE_MODES)
            .ok_or_else(|| de::Error::unknown_variant(&value, FAILURE_MODE_NAMES))
    }
}

impl<'de> Deserialize<'de> for ReloadPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_variant(&value, RELOAD_POLICIES)
            .ok_or_else(|| de::Error::unknown_variant(&value, RELOAD_POLICY_NAMES))
    }
}

/// WAF filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WafConfig {
    /// Turn inspection off. Omitting the key leaves inspection off.
    #[serde(default = "default_true")]
    pub disable: bool,

    /// Rule-language source fragments, loaded in order
    #[serde(default)]
    pub rules: Vec<String>,

    /// Verdict when inspection faults
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// Rule set handling across reloads
    #[serde(default)]
    pub reload_policy: ReloadPolicy,
}

fn default_true() -> bool { true }

impl Default for WafConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl WafConfig {
    /// Configuration with inspection turned off
    pub fn disabled() -> Self {
        Self {
            disable: true,
            rules: Vec::new(),
            failure_mode: FailureMode::default(),
            reload_policy: ReloadPolicy::default(),
        }
    }

    /// Decode the raw plugin configuration.
    ///
    /// A missing or blank payload is not an error: it yields a disabled
    /// configuration.
    pub fn from_payload(payload: Option<&[u8]>) -> Result<Self, ConfigError> {
        let bytes = match payload {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
            _ => {
                log::info!("received null config - waf filter will be disabled");
                return Ok(Self::disabled());
            }
        };

        serde_json::from_slice::<WafConfig>(bytes).map_err(|source| {
            let payload = String::from_utf8_lossy(bytes).into_owned();
            log::error!("failed parsing config: {}\n error: {}", payload, source);
            ConfigError::Malformed { payload, source }
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.disable
    }
}
