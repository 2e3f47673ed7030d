//! Tracing setup and request correlation.
//!
//! Output is either compact human-readable lines or one JSON object per
//! event. HTTP and TLS internals are capped at `warn` regardless of the
//! configured level.

use http::{HeaderMap, HeaderValue};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Header carrying the request trace ID.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Library targets capped at `warn`.
pub const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls", "tower_http"];

/// Output encoding for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; everything else is pretty.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

fn filter_directives(level: &str, excluded_targets: &[String]) -> String {
    let quiet = QUIET_TARGETS
        .iter()
        .copied()
        .chain(excluded_targets.iter().map(String::as_str))
        .map(|target| format!("{target}=warn"));

    std::iter::once(level.to_string())
        .chain(quiet)
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the computed filter. Calling this twice is
/// harmless; the second install is ignored.
pub fn init_logging(level: &str, format: &str, excluded_targets: &[String]) {
    let directives = filter_directives(level, excluded_targets);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));
    let format = LogFormat::parse(format);

    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(level, ?format, filter = %directives, "Logging ready");
    }
}

/// Fresh random trace ID.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trace ID of one inbound request, tagged with the serving component.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub service: String,
}

impl RequestContext {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            trace_id: generate_trace_id(),
            service: service.into(),
        }
    }

    /// Adopt the caller's `X-Trace-Id` if it is non-blank text, otherwise mint one.
    pub fn from_headers(headers: &HeaderMap, service: impl Into<String>) -> Self {
        let incoming = headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match incoming {
            Some(trace_id) => Self {
                trace_id: trace_id.to_string(),
                service: service.into(),
            },
            None => Self::new(service),
        }
    }

    /// Write the trace ID into outgoing headers.
    pub fn to_headers(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.trace_id) {
            headers.insert(TRACE_ID_HEADER, value);
        }
    }
}

/// `info`-level span named `http_request` carrying the trace ID and any
/// extra fields.
#[macro_export]
macro_rules! request_span {
    ($trace_id:expr) => {
        tracing::info_span!("http_request", trace_id = %$trace_id)
    };
    ($trace_id:expr, $($field:tt)*) => {
        tracing::info_span!("http_request", trace_id = %$trace_id, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cap_quiet_and_excluded_targets() {
        let directives = filter_directives("debug", &["csv".to_string()]);
        let parts: Vec<&str> = directives.split(',').collect();

        assert_eq!(parts[0], "debug");
        assert!(parts.contains(&"reqwest=warn"));
        assert!(parts.contains(&"hyper=warn"));
        assert_eq!(parts.last(), Some(&"csv=warn"));
        assert_eq!(parts.len(), 1 + QUIET_TARGETS.len() + 1);
    }

    #[test]
    fn test_directives_are_valid_filters() {
        let directives = filter_directives("info", &[]);
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_trace_ids_are_unique_uuids() {
        let a = generate_trace_id();
        let b = generate_trace_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_incoming_trace_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("trace-abc"));

        let ctx = RequestContext::from_headers(&headers, "stockscope");
        assert_eq!(ctx.trace_id, "trace-abc");
        assert_eq!(ctx.service, "stockscope");
    }

    #[test]
    fn test_blank_trace_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("   "));

        let ctx = RequestContext::from_headers(&headers, "stockscope");
        assert!(uuid::Uuid::parse_str(&ctx.trace_id).is_ok());
    }

    #[test]
    fn test_trace_id_written_to_headers() {
        let ctx = RequestContext::new("stockscope");
        let mut headers = HeaderMap::new();
        ctx.to_headers(&mut headers);

        assert_eq!(headers[TRACE_ID_HEADER], ctx.trace_id.as_str());
    }
}
