use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diqwest::WithDigestAuth;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::time;
use tracing::{debug, error, instrument, warn};

use crate::fetch_error::FetchError;

const MAX_RETRY_DELAY_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    #[serde(rename = "SiteID")]
    pub site_id: String,
    #[serde(rename = "SiteName")]
    pub site_name: String,
    #[serde(rename = "Channels", default)]
    pub channels: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    #[serde(rename = "Number", deserialize_with = "de_number_string")]
    pub number: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Units", default)]
    pub units: String,
}

/// Channel metadata: the first recorded sample split into date/time fields,
/// plus the epoch-millisecond timestamp of the last one.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDetails {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
    #[serde(rename = "endDate")]
    pub end_date: i64,
}

impl ChannelDetails {
    pub fn first_sample(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSample {
    pub ts: i64,
    pub v: f64,
}

/// Digest-authenticated client for the logger telemetry API.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    max_retries: usize,
}

impl Fetcher {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout_secs: u64,
        max_retries: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            max_retries,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_site(&self, site_id: &str) -> Result<SiteInfo, FetchError> {
        let url = format!("{}GetSite?siteId={}", self.base_url, site_id);
        let value = self.request_json(&url).await?;
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self))]
    pub async fn get_channel_details(
        &self,
        site_id: &str,
        channel_number: &str,
    ) -> Result<ChannelDetails, FetchError> {
        let url = format!(
            "{}GetChannelDetails?{{'streamId':'{}_{}'}}",
            self.base_url, site_id, channel_number
        );
        let value = self.request_json(&url).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch raw samples for one stream. Items missing `ts` or `v` are
    /// skipped with a warning rather than failing the whole request.
    #[instrument(skip(self))]
    pub async fn get_stream_data(
        &self,
        site_id: &str,
        channel_number: &str,
        start_epoch: i64,
        end_epoch: i64,
    ) -> Result<Vec<StreamSample>, FetchError> {
        let url = format!(
            "{}GetData?{{'streamId':'{}_{}','start': '{}','end': '{}'}}",
            self.base_url, site_id, channel_number, start_epoch, end_epoch
        );
        let value = self.request_json(&url).await?;
        let items: Vec<Value> = serde_json::from_value(value)?;

        let mut samples = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for item in &items {
            match (
                item.get("ts").and_then(Value::as_i64),
                item.get("v").and_then(Value::as_f64),
            ) {
                (Some(ts), Some(v)) => samples.push(StreamSample { ts, v }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                "Skipped {} malformed samples out of {} for stream {}_{}",
                skipped,
                items.len(),
                site_id,
                channel_number
            );
        }
        Ok(samples)
    }

    /// Send one GET through the retry policy: 403/404 fail immediately,
    /// 429 honors Retry-After (capped at 60 s), 5xx and transport errors
    /// back off exponentially until the retries are used up.
    async fn request_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(3))
            .with_max_delay(Duration::from_secs(MAX_RETRY_DELAY_SECS))
            .with_max_times(self.max_retries)
            .build();
        let mut attempt = 1usize;

        loop {
            debug!("Attempt {} for {}", attempt, url);
            let result = self
                .client
                .get(url)
                .send_with_digest_auth(&self.username, &self.password)
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!("Received response with status code {}", status.as_u16());

                    if status.is_success() {
                        return Ok(response.json::<Value>().await?);
                    } else if status == reqwest::StatusCode::FORBIDDEN {
                        error!("Forbidden: the user does not have the required roles or access");
                        return Err(FetchError::Forbidden);
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        error!("Not found: the requested logger ID does not exist");
                        return Err(FetchError::NotFound);
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let Some(backoff_delay) = backoff.next() else {
                            break;
                        };
                        let delay = retry_after_secs(&response)
                            .map(|s| Duration::from_secs(s.min(MAX_RETRY_DELAY_SECS)))
                            .unwrap_or(backoff_delay);
                        warn!("Too many requests: retrying after {:?}", delay);
                        time::sleep(delay).await;
                    } else if status.is_server_error() {
                        let Some(delay) = backoff.next() else {
                            break;
                        };
                        error!("Internal server error: retrying after {:?}", delay);
                        time::sleep(delay).await;
                    } else {
                        error!("Unexpected HTTP status code received: {}", status.as_u16());
                        return Err(FetchError::UnexpectedStatus(status.as_u16()));
                    }
                }
                Err(e) => match backoff.next() {
                    Some(delay) => {
                        warn!(
                            "API request error on attempt {}: {}; retrying after {:?}",
                            attempt, e, delay
                        );
                        time::sleep(delay).await;
                    }
                    None => {
                        error!("API request failed after {} attempts", attempt);
                        return Err(FetchError::Request(e));
                    }
                },
            }
            attempt += 1;
        }

        error!("API request failed after {} attempts", attempt);
        Err(FetchError::RetriesExhausted { attempts: attempt })
    }
}

fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Channel numbers arrive as either JSON strings or integers depending on
/// the API version.
fn de_number_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid channel number: {other}"
        ))),
    }
}

pub fn to_epoch_ms(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

pub fn from_epoch_ms(ms: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}
