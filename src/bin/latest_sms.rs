use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

use sms_processor::config;
use sms_processor::error::ApiError;
use sms_processor::model::LatestMessage;
use sms_processor::store::StoreClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print the most recently processed message"
)]
struct Args {
    /// Optional YAML config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Re-query every N minutes instead of exiting after one read
    #[arg(long)]
    refresh_minutes: Option<u64>,
}

/// `None` for a single read; the period between reads otherwise.
fn refresh_period(minutes: Option<u64>) -> Result<Option<Duration>> {
    match minutes.filter(|m| *m > 0) {
        None => Ok(None),
        Some(m) => m
            .checked_mul(60)
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| anyhow!("--refresh-minutes {} is too large", m)),
    }
}

/// Error line shown to the user, with a hint when the procedure is missing or
/// not executable with the read key.
fn error_line(err: &ApiError) -> String {
    let msg = err.to_string();
    let hint = if msg.to_lowercase().contains("function get_latest_sms") {
        " (Bestaat de functie en heeft 'anon' EXECUTE?)"
    } else {
        ""
    };
    format!("Fout: {}{}", msg, hint)
}

fn print_latest(latest: Option<LatestMessage>) {
    let latest = latest.unwrap_or_default();
    println!("{}", latest.display_body());
    println!("Laatste update: {}", latest.display_timestamp());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load_viewer(args.config.as_deref())?;
    let store = StoreClient::from_config(&cfg)?;

    let Some(period) = refresh_period(args.refresh_minutes)? else {
        print_latest(store.latest_processed().await?);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        match store.latest_processed().await {
            Ok(latest) => print_latest(latest),
            Err(err) => {
                error!(?err, "failed to load latest message");
                println!("{}", error_line(&err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_period_from_minutes() {
        assert_eq!(refresh_period(None).unwrap(), None);
        assert_eq!(refresh_period(Some(0)).unwrap(), None);
        assert_eq!(
            refresh_period(Some(5)).unwrap(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn refresh_period_rejects_overflow() {
        let err = refresh_period(Some(u64::MAX)).unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(refresh_period(Some(u64::MAX / 60 + 1)).is_err());
        assert!(refresh_period(Some(u64::MAX / 60)).is_ok());
    }

    #[test]
    fn error_line_hints_at_missing_procedure() {
        let missing = ApiError::Status {
            service: "store",
            status: 404,
            body: "{\"code\":\"42883\",\"message\":\"function get_latest_sms() does not exist\"}".into(),
        };
        let line = error_line(&missing);
        assert!(line.starts_with("Fout: store returned 404"));
        assert!(line.ends_with(" (Bestaat de functie en heeft 'anon' EXECUTE?)"));

        let denied = ApiError::Status {
            service: "store",
            status: 401,
            body: "permission denied for Function get_latest_sms".into(),
        };
        assert!(error_line(&denied).contains("EXECUTE?"));

        let other = ApiError::Status {
            service: "store",
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(error_line(&other), "Fout: store returned 500: boom");
    }
}
