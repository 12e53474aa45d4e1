use clap::Args;
use movequote::error::AppError;
use movequote::workflows::wizard::GatewayError;
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "wizard service";

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Base URL of a running wizard service
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub(crate) url: String,
    /// Print the raw JSON payload instead of the summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let report = fetch_report(&args.url).await?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|err| GatewayError::Decode {
            service: SERVICE,
            message: err.to_string(),
        })?;
        println!("{rendered}");
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

async fn fetch_report(base_url: &str) -> Result<Value, GatewayError> {
    let url = format!("{}/api/v1/wizard/report", base_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|err| GatewayError::Transport {
            service: SERVICE,
            message: err.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| GatewayError::Transport {
            service: SERVICE,
            message: err.to_string(),
        })?;
    if !response.status().is_success() {
        return Err(GatewayError::Status {
            service: SERVICE,
            status: response.status().as_u16(),
        });
    }

    response.json().await.map_err(|err| GatewayError::Decode {
        service: SERVICE,
        message: err.to_string(),
    })
}

pub(crate) fn render_report(report: &Value) -> String {
    let count = |key: &str| report[key].as_u64().unwrap_or_default();
    let total = count("total_sessions");
    let bookings = count("bookings");
    let conversion = if total == 0 {
        0.0
    } else {
        bookings as f64 / total as f64 * 100.0
    };

    let mut out = String::from("Funnel report\n");
    out.push_str(&format!(
        "- {total} sessions | {bookings} bookings | {conversion:.0}% conversion | {} deposits\n",
        report["deposits_collected"].as_str().unwrap_or("$0")
    ));
    out.push_str(&format!(
        "- quotes requested {} | no vendors {} | failures {} | checkouts {}\n",
        count("quotes_requested"),
        count("no_vendor_sessions"),
        count("quote_failures"),
        count("checkouts_started")
    ));

    for entry in report["steps"].as_array().into_iter().flatten() {
        let sessions = entry["sessions"].as_u64().unwrap_or_default();
        if sessions > 0 {
            out.push_str(&format!(
                "  - {}: {sessions} session(s)\n",
                entry["step_label"].as_str().unwrap_or("?")
            ));
        }
    }
    for vendor in report["vendors"].as_array().into_iter().flatten() {
        out.push_str(&format!(
            "  - {} booked {} time(s), ${:.2} total\n",
            vendor["vendor_name"].as_str().unwrap_or("?"),
            vendor["bookings"].as_u64().unwrap_or_default(),
            vendor["booked_value"].as_f64().unwrap_or_default()
        ));
    }
    out
}
