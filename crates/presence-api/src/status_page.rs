use axum::{
    Json,
    extract::State,
    response::{Html, IntoResponse},
};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use tracing::{error, warn};

use presence_db::models::SampleRow;

use crate::error::ApiError;
use crate::state::AppState;

const RECENT_SAMPLES: u32 = 10;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// GET / — uptime and a glance at the latest samples.
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let uptime = Utc::now() - state.started_at;

    let db = state.db.clone();
    let (users, samples, recent) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        Ok((db.count_users()?, db.count_samples()?, db.recent_samples(RECENT_SAMPLES)?))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })?
    .map_err(ApiError::Internal)?;

    Ok(Html(render_home(uptime, users, samples, recent)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn render_home(uptime: TimeDelta, users: i64, samples: i64, recent: Vec<SampleRow>) -> String {
    let mut rows = String::new();
    for row in recent {
        let id = row.id;
        match row.into_sample() {
            Ok(sample) => {
                rows.push_str(&format!(
                    "<tr class=\"{status}\"><td><a href=\"/samples/{id}\">{id}</a></td>\
                     <td>{taken}</td><td>{elapsed:.3}s</td><td>{status}</td></tr>",
                    id = sample.id,
                    taken = format_timestamp(&sample.taken),
                    elapsed = sample.elapsed,
                    status = sample.status,
                ));
            }
            Err(e) => warn!("Skipping corrupt sample {} on status page: {:#}", id, e),
        }
    }

    format!(
        "<!doctype html>
<html>
<head><meta charset=\"utf-8\"><title>presence</title></head>
<body>
<h1>presence</h1>
<p>Uptime: {uptime}</p>
<p>Users: {users} &middot; Samples: {samples}</p>
<table>
<thead><tr><th>Sample</th><th>Taken (UTC)</th><th>Elapsed</th><th>Status</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</body>
</html>
",
        uptime = format_uptime(uptime),
    )
}

/// `H:MM:SS`, prefixed with `N days, ` once past a day.
fn format_uptime(uptime: TimeDelta) -> String {
    let total = uptime.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, seconds),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, seconds),
        n => format!("{} days, {}:{:02}:{:02}", n, hours, minutes, seconds),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(TimeDelta::seconds(12)), "0:00:12");
        assert_eq!(format_uptime(TimeDelta::seconds(3 * 3600 + 5 * 60 + 1)), "3:05:01");
        assert_eq!(format_uptime(TimeDelta::seconds(86_400 + 61)), "1 day, 0:01:01");
        assert_eq!(format_uptime(TimeDelta::seconds(2 * 86_400)), "2 days, 0:00:00");
        assert_eq!(format_uptime(TimeDelta::seconds(-5)), "0:00:00");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_render_home_lists_samples() {
        let recent = vec![SampleRow {
            id: 7,
            taken: "2024-01-02T03:04:05Z".to_string(),
            elapsed: 0.25,
            status: "w".to_string(),
        }];
        let html = render_home(TimeDelta::seconds(60), 3, 1, recent);
        assert!(html.contains("Uptime: 0:01:00"));
        assert!(html.contains("<a href=\"/samples/7\">7</a>"));
        assert!(html.contains("2024-01-02 03:04:05"));
        assert!(html.contains("<td>warning</td>"));
    }
}
