//! Resolving audio sources to encoded bytes for the software decoder.

use base64::Engine as _;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::playback::AudioSource;
use tracing::debug;

/// Read the encoded audio behind `source`.
///
/// Local paths are read from disk, data URIs decoded in place, and remote
/// URLs downloaded in full. Object URLs only exist inside a browser page and
/// are rejected.
pub async fn fetch_source_bytes(client: &reqwest::Client, source: &AudioSource) -> Result<Vec<u8>> {
    match source {
        AudioSource::LocalPath { path } => tokio::fs::read(path).await.map_err(BridgeError::Io),
        AudioSource::DataUri {
            base64, payload, ..
        } => decode_data_uri(*base64, payload),
        AudioSource::Remote { url } => {
            let response = client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| BridgeError::OperationFailed(format!("Failed to fetch audio: {}", e)))?;

            let bytes = response
                .bytes()
                .await
                .map_err(|e| BridgeError::OperationFailed(format!("Failed to read audio body: {}", e)))?;

            debug!(source = %source, bytes = bytes.len(), "Downloaded remote audio");
            Ok(bytes.to_vec())
        }
        AudioSource::ObjectUrl { .. } => Err(BridgeError::NotAvailable(
            "object URLs can only be resolved inside a browser".to_string(),
        )),
    }
}

fn decode_data_uri(base64: bool, payload: &str) -> Result<Vec<u8>> {
    if !base64 {
        return Ok(payload.as_bytes().to_vec());
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| BridgeError::UnsupportedSource(format!("Invalid base64 payload: {}", e)))
}
