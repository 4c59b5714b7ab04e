//! Firmware update over the robot's HTTP management server
//!
//! The firmware archive is POSTed to the robot's web server, which then
//! reports progress through a JSON status document until the update either
//! succeeds or fails. The robot reboots afterwards.

use std::path::Path;
use std::time::Duration;

use serde_json::Value as Json;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::FirmwareConfig;
use crate::{MecaError, Result};

/// State reported by the update status document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The server has no status to report yet
    Pending,
    /// Update running; latest log entry if any
    InProgress { log: Option<String> },
    Done { message: String },
    Failed { message: String },
}

/// Interpret one status response body
pub fn parse_update_status(body: &str) -> Result<UpdateStatus> {
    let body = body.trim();
    if body.is_empty() || body == "0" {
        return Ok(UpdateStatus::Pending);
    }

    let document: Json = serde_json::from_str(body)?;
    let status = document
        .get("STATUS")
        .ok_or_else(|| MecaError::Firmware("Status document has no STATUS".to_string()))?;
    let code = match status.get("Code") {
        Some(Json::Number(n)) => n.as_i64(),
        Some(Json::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| MecaError::Firmware(format!("Invalid status code in {}", status)))?;
    let message = status
        .get("MSG")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();

    match code {
        -1 => Ok(UpdateStatus::Failed { message }),
        0 => Ok(UpdateStatus::Done { message }),
        1 => {
            // LOG entries are keyed so that lexical order is chronological
            let log = document.get("LOG").and_then(Json::as_object).and_then(|entries| {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                keys.last()
                    .and_then(|key| entries.get(*key))
                    .and_then(Json::as_str)
                    .map(str::to_string)
            });
            Ok(UpdateStatus::InProgress { log })
        }
        other => Err(MecaError::Firmware(format!("Unknown update status code {}", other))),
    }
}

/// Text appended to the progress log since the previous poll
pub fn progress_delta<'a>(previous: &str, current: &'a str) -> &'a str {
    current.strip_prefix(previous).unwrap_or(current)
}

/// HTTP client for the robot's firmware update endpoint
pub struct FirmwareUpdater {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    reboot_wait: Duration,
}

impl FirmwareUpdater {
    pub fn new(host: &str, config: &FirmwareConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: format!("http://{}/", host),
            poll_interval: config.poll_interval(),
            reboot_wait: config.reboot_wait(),
        })
    }

    /// POST the firmware archive
    pub async fn upload(&self, firmware: Vec<u8>) -> Result<()> {
        info!("Uploading {} bytes of firmware to {}", firmware.len(), self.base_url);

        // The transfer itself can take far longer than a status request
        let response = self
            .client
            .post(&self.base_url)
            .timeout(Duration::from_secs(600))
            .header(reqwest::header::CONNECTION, "keep-alive")
            .header(reqwest::header::CONTENT_TYPE, "application/x-gzip")
            .body(firmware)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MecaError::Firmware(format!(
                "Firmware upload request failed with {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fetch and parse the update status document
    pub async fn poll_status(&self) -> Result<UpdateStatus> {
        let body = self
            .client
            .get(format!("{}?update", self.base_url))
            .send()
            .await?
            .text()
            .await?;
        debug!("Update status: {}", body);
        parse_update_status(&body)
    }

    /// Upload `path` and follow the update until the robot has rebooted
    ///
    /// `on_progress` receives each newly appended piece of the progress log.
    pub async fn update<F>(&self, path: &Path, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        let firmware = tokio::fs::read(path)
            .await
            .map_err(|e| MecaError::Firmware(format!("Failed to read {}: {}", path.display(), e)))?;
        self.upload(firmware).await?;

        let mut progress = String::new();
        loop {
            match self.poll_status().await? {
                UpdateStatus::Pending => {}
                UpdateStatus::InProgress { log: Some(log) } => {
                    let delta = progress_delta(&progress, &log);
                    if !delta.is_empty() {
                        on_progress(delta);
                    }
                    progress = log;
                }
                UpdateStatus::InProgress { log: None } => {}
                UpdateStatus::Done { message } => {
                    info!("Firmware update done: {}", message);
                    break;
                }
                UpdateStatus::Failed { message } => {
                    return Err(MecaError::Firmware(format!("Error while updating: {}", message)));
                }
            }
            sleep(self.poll_interval).await;
        }

        info!("Waiting {:?} for the robot to reboot", self.reboot_wait);
        sleep(self.reboot_wait).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_body_is_pending() {
        assert_eq!(parse_update_status("0").unwrap(), UpdateStatus::Pending);
        assert_eq!(parse_update_status("").unwrap(), UpdateStatus::Pending);
    }

    #[test]
    fn test_in_progress_takes_latest_log_entry() {
        let body = r#"{"STATUS": {"Code": 1, "MSG": "Updating"},
                       "LOG": {"0002": "Flashing ###", "0001": "Extracting"}}"#;
        assert_eq!(
            parse_update_status(body).unwrap(),
            UpdateStatus::InProgress { log: Some("Flashing ###".to_string()) }
        );
    }

    #[test]
    fn test_string_status_codes() {
        let done = r#"{"STATUS": {"Code": "0", "MSG": "Update done"}}"#;
        assert_eq!(
            parse_update_status(done).unwrap(),
            UpdateStatus::Done { message: "Update done".to_string() }
        );

        let failed = r#"{"STATUS": {"Code": "-1", "MSG": "Bad archive"}}"#;
        assert_eq!(
            parse_update_status(failed).unwrap(),
            UpdateStatus::Failed { message: "Bad archive".to_string() }
        );
    }

    #[test]
    fn test_invalid_documents() {
        assert!(parse_update_status("{\"LOG\": {}}").is_err());
        assert!(parse_update_status("{\"STATUS\": {\"Code\": 7}}").is_err());
        assert!(parse_update_status("not json").is_err());
    }

    #[test]
    fn test_progress_delta() {
        assert_eq!(progress_delta("", "##"), "##");
        assert_eq!(progress_delta("##", "#### 50%"), "## 50%");
        assert_eq!(progress_delta("unrelated", "fresh"), "fresh");
    }
}
