use crate::error::{ConfigError, Result};
use crate::thresholds::{parse_u64, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the run boundary needs: thresholds for the evaluator plus
/// delivery endpoints and feature toggles consumed only by the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub region: String,
    /// Teams incoming-webhook URL. Required: a run always attempts
    /// exactly one card delivery.
    pub webhook_url: String,
    pub thresholds: Thresholds,
    /// How far back to look for the latest metric datapoint.
    pub metric_lookback_min: u64,
    /// Metric aggregation period in seconds.
    pub metric_period_sec: u64,
    pub email: EmailSettings,
}

/// Mail channel settings. When `enabled` is false the boundary skips
/// the e-mail renderer and transport entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub enabled: bool,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Optional subject override; the report title is used otherwise.
    pub subject: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    #[serde(skip_serializing)]
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
}

impl EmailSettings {
    /// Sending is possible only when the toggle is on and the minimum
    /// wiring (sender, at least one recipient, SMTP host) is present.
    pub fn is_sendable(&self) -> bool {
        self.enabled && self.from.is_some() && !self.to.is_empty() && self.smtp_host.is_some()
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&env)
    }

    /// Load settings from an explicit environment map.
    pub fn from_map(env: &HashMap<String, String>) -> Result<Self> {
        let webhook_url = get_trimmed(env, "TEAMS_WEBHOOK")
            .ok_or_else(|| ConfigError::MissingKey("TEAMS_WEBHOOK".to_string()))?;

        let smtp_port = parse_u64(env, "SMTP_PORT", 25)?;
        let smtp_port =
            u16::try_from(smtp_port).map_err(|_| ConfigError::InvalidNumber {
                key: "SMTP_PORT".to_string(),
                value: smtp_port.to_string(),
            })?;

        Ok(Self {
            region: get_trimmed(env, "AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            webhook_url,
            thresholds: Thresholds::from_map(env)?,
            metric_lookback_min: parse_u64(env, "METRIC_LOOKBACK_MIN", 15)?,
            metric_period_sec: parse_u64(env, "METRIC_PERIOD_SEC", 300)?,
            email: EmailSettings {
                enabled: is_truthy(env.get("ENABLE_MAIL_REPORT").map(String::as_str)),
                from: get_trimmed(env, "MAIL_FROM"),
                to: parse_recipients(env.get("MAIL_TO").map(String::as_str).unwrap_or("")),
                cc: parse_recipients(env.get("MAIL_CC").map(String::as_str).unwrap_or("")),
                bcc: parse_recipients(env.get("MAIL_BCC").map(String::as_str).unwrap_or("")),
                subject: get_trimmed(env, "MAIL_SUBJECT"),
                smtp_host: get_trimmed(env, "SMTP_HOST"),
                smtp_port,
                smtp_username: get_trimmed(env, "SMTP_USERNAME"),
                smtp_password: get_trimmed(env, "SMTP_PASSWORD"),
            },
        })
    }
}

fn get_trimmed(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "t" | "yes" | "y")
    )
}

/// Split an address list on commas, semicolons, and whitespace,
/// dropping blanks and de-duplicating case-insensitively while
/// preserving first-seen order.
pub fn parse_recipients(value: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for part in value.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        let addr = part.trim();
        if addr.is_empty() {
            continue;
        }
        if seen.insert(addr.to_lowercase()) {
            out.push(addr.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn webhook_is_required() {
        let err = Settings::from_map(&HashMap::new()).expect_err("webhook missing");
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "TEAMS_WEBHOOK"));
    }

    #[test]
    fn minimal_settings_use_defaults() {
        let s = Settings::from_map(&env(&[("TEAMS_WEBHOOK", "https://example.test/hook")]))
            .unwrap();
        assert_eq!(s.region, "us-east-1");
        assert_eq!(s.metric_lookback_min, 15);
        assert_eq!(s.metric_period_sec, 300);
        assert!(!s.email.enabled);
        assert_eq!(s.email.smtp_port, 25);
    }

    #[test]
    fn mail_toggle_accepts_truthy_spellings() {
        for v in ["1", "true", "T", "Yes", "y"] {
            let s = Settings::from_map(&env(&[
                ("TEAMS_WEBHOOK", "https://example.test/hook"),
                ("ENABLE_MAIL_REPORT", v),
            ]))
            .unwrap();
            assert!(s.email.enabled, "{v} should enable mail");
        }
        let s = Settings::from_map(&env(&[
            ("TEAMS_WEBHOOK", "https://example.test/hook"),
            ("ENABLE_MAIL_REPORT", "false"),
        ]))
        .unwrap();
        assert!(!s.email.enabled);
    }

    #[test]
    fn recipients_split_and_dedupe() {
        let got = parse_recipients("a@x.com, b@x.com; A@X.COM c@x.com\nb@x.com");
        assert_eq!(got, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn recipients_empty_input_is_empty() {
        assert!(parse_recipients("").is_empty());
        assert!(parse_recipients(" ;, ").is_empty());
    }

    #[test]
    fn email_sendable_requires_wiring() {
        let mut s = Settings::from_map(&env(&[
            ("TEAMS_WEBHOOK", "https://example.test/hook"),
            ("ENABLE_MAIL_REPORT", "true"),
            ("MAIL_FROM", "audit@example.test"),
            ("MAIL_TO", "ops@example.test"),
            ("SMTP_HOST", "smtp.example.test"),
        ]))
        .unwrap();
        assert!(s.email.is_sendable());

        s.email.to.clear();
        assert!(!s.email.is_sendable());
    }

    #[test]
    fn invalid_smtp_port_is_fatal() {
        let err = Settings::from_map(&env(&[
            ("TEAMS_WEBHOOK", "https://example.test/hook"),
            ("SMTP_PORT", "70000"),
        ]))
        .expect_err("port out of range");
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }
}
