//! Sink selection
//!
//! Records go to the HTTP datastore when a sink URL is configured and
//! `--dry-run` was not given. Otherwise they are only logged through
//! [`LogSink`], which keeps nothing but a counter.

use airis_connectors::{
    http::{HttpConfig, HttpSink},
    LogSink, TelemetrySink,
};

use crate::Result;

/// Where the node delivers records
#[derive(Debug, Clone)]
pub enum SinkChoice {
    /// POST to the configured datastore
    Http(HttpConfig),
    /// Dry run requested; any configured URL is ignored
    DryRun,
    /// No sink URL configured
    Unconfigured,
}

impl SinkChoice {
    /// Pick the sink from the resolved HTTP settings and the dry-run flag
    pub fn select(http: Option<HttpConfig>, dry_run: bool) -> Self {
        match http {
            _ if dry_run => SinkChoice::DryRun,
            Some(http) => SinkChoice::Http(http),
            None => SinkChoice::Unconfigured,
        }
    }

    /// Why records are only logged; `None` for the HTTP sink
    pub fn log_only_reason(&self) -> Option<&'static str> {
        match self {
            SinkChoice::Http(_) => None,
            SinkChoice::DryRun => Some("Dry run requested"),
            SinkChoice::Unconfigured => Some("No sink URL configured"),
        }
    }

    /// Build the sink, logging where records will go
    pub fn build(self) -> Result<Box<dyn TelemetrySink>> {
        match self {
            SinkChoice::Http(config) => {
                let sink = HttpSink::new(config)?;
                log::info!("Sending telemetry to {}", sink.url());
                Ok(Box::new(sink))
            }
            other => {
                if let Some(reason) = other.log_only_reason() {
                    log::warn!("{}, records are only logged", reason);
                }
                Ok(Box::new(LogSink::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> HttpConfig {
        HttpConfig::new("https://project.supabase.co").service_key("anon-key")
    }

    #[test]
    fn dry_run_wins_over_configured_url() {
        let choice = SinkChoice::select(Some(http()), true);
        assert!(matches!(choice, SinkChoice::DryRun));
        assert_eq!(choice.log_only_reason(), Some("Dry run requested"));
        assert_eq!(choice.build().unwrap().name(), "log");
    }

    #[test]
    fn missing_url_is_reported_as_unconfigured() {
        let choice = SinkChoice::select(None, false);
        assert!(matches!(choice, SinkChoice::Unconfigured));
        assert_eq!(choice.log_only_reason(), Some("No sink URL configured"));
        assert_eq!(choice.build().unwrap().name(), "log");
    }

    #[test]
    fn configured_url_sends() {
        let choice = SinkChoice::select(Some(http()), false);
        assert_eq!(choice.log_only_reason(), None);

        let sink = choice.build().unwrap();
        assert!(sink.name().starts_with("https://project.supabase.co"));
    }
}
