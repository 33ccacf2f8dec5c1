//! Log output and process signals for the load generator binary.

use strum::EnumString;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset; the HTTP stack is held at `warn`.
pub const DEFAULT_FILTER: &str =
    "info,textstore_loadgen=info,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

/// Selects the output format: `json` (default) or `text`.
pub const LOG_FORMAT_ENV: &str = "LOADGEN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, for collection next to the target's logs.
    #[default]
    Json,
    /// Compact single-line text for interactive runs.
    Text,
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`]; unset or unrecognised values fall back to JSON.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// `RUST_LOG` when it parses, otherwise `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init_tracing(format: LogFormat) {
    let json = (format == LogFormat::Json).then(|| fmt::layer().json());
    let text = (format == LogFormat::Text).then(|| fmt::layer().compact());
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(json)
        .with(text)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
}

/// Cancel `run` on the first shutdown signal so virtual users stop claiming
/// iterations.
pub async fn cancel_on_signal(run: CancellationToken) {
    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received, finishing in-flight iterations");
            run.cancel();
        }
        _ = run.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_filter_is_valid() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("text", LogFormat::Text)]
    #[case("TEXT", LogFormat::Text)]
    fn test_log_format_parses(#[case] raw: &str, #[case] expected: LogFormat) {
        assert_eq!(raw.parse::<LogFormat>().unwrap(), expected);
    }

    #[test]
    fn test_log_format_from_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            assert_eq!(LogFormat::from_env(), LogFormat::Json);
            jail.set_env(LOG_FORMAT_ENV, "text");
            assert_eq!(LogFormat::from_env(), LogFormat::Text);
            jail.set_env(LOG_FORMAT_ENV, "yaml");
            assert_eq!(LogFormat::from_env(), LogFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_rust_log_overrides_default_filter() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            assert_eq!(env_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
            jail.set_env("RUST_LOG", "debug");
            assert_eq!(env_filter("warn").max_level_hint(), Some(LevelFilter::DEBUG));
            Ok(())
        });
    }

    #[tokio::test]
    async fn test_cancel_on_signal_returns_when_run_ends() {
        let run = CancellationToken::new();
        let waiter = tokio::spawn(cancel_on_signal(run.clone()));
        run.cancel();
        waiter.await.unwrap();
    }
}
