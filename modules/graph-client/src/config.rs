//! Configuration for the Graph service client.

use std::time::Duration;

use graph_auth::MissingCredentialPolicy;
use graph_http::{HttpClientConfig, TransportSecurity};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GraphError;

/// Graph service client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphClientConfig {
    /// Root of the Graph REST API; relative paths are resolved against it.
    pub base_url: String,

    /// Per-request timeout.
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Maximum accepted response body in bytes.
    pub max_body_size: usize,

    /// Behaviour when no access token is available for a request.
    pub missing_credential: MissingCredentialPolicy,

    /// Permit plain `http://` base URLs. Mock servers only.
    pub allow_insecure_http: bool,

    /// Upper bound on `@odata.nextLink` pages followed by list calls.
    pub max_pages: usize,
}

pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("graph-client/", env!("CARGO_PKG_VERSION")).to_owned(),
            max_body_size: 10 * 1024 * 1024,
            missing_credential: MissingCredentialPolicy::default(),
            allow_insecure_http: false,
            max_pages: 10,
        }
    }
}

impl GraphClientConfig {
    /// Check the configuration and return the parsed base URL.
    ///
    /// The returned URL always ends with `/` so relative paths append to it.
    ///
    /// # Errors
    /// [`GraphError::Config`] for an unusable base URL, an empty user agent or
    /// a zero page limit.
    pub fn validate(&self) -> Result<Url, GraphError> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| GraphError::Config(format!("base_url '{}': {e}", self.base_url)))?;

        match base.scheme() {
            "https" => {}
            "http" => {
                if !self.allow_insecure_http {
                    return Err(GraphError::Config(
                        "base_url uses http:// but allow_insecure_http is false".into(),
                    ));
                }
            }
            other => {
                return Err(GraphError::Config(format!(
                    "base_url scheme '{other}' is not supported"
                )));
            }
        }
        if base.cannot_be_a_base() {
            return Err(GraphError::Config(format!(
                "base_url '{}' cannot be a base",
                self.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        if self.user_agent.trim().is_empty() {
            return Err(GraphError::Config("user_agent must not be empty".into()));
        }
        if self.max_pages == 0 {
            return Err(GraphError::Config("max_pages must be at least 1".into()));
        }
        Ok(base)
    }

    /// Transport settings derived from this configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.request_timeout,
            max_body_size: self.max_body_size,
            user_agent: self.user_agent.clone(),
            transport: if self.allow_insecure_http {
                TransportSecurity::AllowInsecureHttp
            } else {
                TransportSecurity::TlsOnly
            },
            ..HttpClientConfig::default()
        }
    }
}

/// `Duration` as a humantime string (`"30s"`, `"1m 30s"`).
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GraphClientConfig::default();
        assert_eq!(cfg.base_url, "https://graph.microsoft.com/v1.0/");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.missing_credential, MissingCredentialPolicy::Reject);
        assert_eq!(cfg.max_pages, 10);
        assert!(!cfg.allow_insecure_http);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: GraphClientConfig = serde_json::from_str(
            r#"{"request_timeout":"1m 30s","missing_credential":"send_unauthenticated"}"#,
        )
        .unwrap();
        assert_eq!(cfg.request_timeout, Duration::from_secs(90));
        assert_eq!(
            cfg.missing_credential,
            MissingCredentialPolicy::SendUnauthenticated
        );
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<GraphClientConfig>(r#"{"retries":3}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(serde_json::from_str::<GraphClientConfig>(r#"{"request_timeout":"soon"}"#).is_err());
    }

    #[test]
    fn duration_serializes_as_humantime() {
        let json = serde_json::to_value(GraphClientConfig::default()).unwrap();
        assert_eq!(json["request_timeout"], "30s");
        assert_eq!(json["missing_credential"], "reject");
    }

    #[test]
    fn validate_appends_trailing_slash() {
        let cfg = GraphClientConfig {
            base_url: "https://graph.microsoft.com/beta".into(),
            ..Default::default()
        };
        assert_eq!(
            cfg.validate().unwrap().as_str(),
            "https://graph.microsoft.com/beta/"
        );
    }

    #[test]
    fn validate_rejects_plain_http_unless_allowed() {
        let mut cfg = GraphClientConfig {
            base_url: "http://localhost:8080/v1.0/".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(GraphError::Config(_))));

        cfg.allow_insecure_http = true;
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.http_config().transport,
            TransportSecurity::AllowInsecureHttp
        );
    }

    #[test]
    fn validate_rejects_other_problems() {
        for cfg in [
            GraphClientConfig {
                base_url: "ftp://example.com/".into(),
                ..Default::default()
            },
            GraphClientConfig {
                base_url: "not a url".into(),
                ..Default::default()
            },
            GraphClientConfig {
                user_agent: "  ".into(),
                ..Default::default()
            },
            GraphClientConfig {
                max_pages: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(GraphError::Config(_))), "{cfg:?}");
        }
    }
}
