//! gpsd location source adapter
//!
//! Speaks the gpsd JSON watch protocol over TCP: one `?WATCH` command,
//! then newline-delimited report objects. Only TPV reports with an actual
//! fix (mode >= 2) become raw fixes; everything else on the wire is
//! ignored. A malformed line is logged and skipped, never fatal to the
//! stream.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::application::ports::{LocationError, LocationSource, LocationSubscription};
use crate::domain::geo::RawFix;

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// One gpsd report line. Non-TPV classes carry none of the optional
/// fields and fall through the fix conversion.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    mode: Option<u8>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    #[serde(rename = "altMSL")]
    alt_msl: Option<f64>,
    speed: Option<f64>,
    track: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    epv: Option<f64>,
}

impl GpsdReport {
    /// Convert a TPV report with a usable fix into a raw fix.
    fn into_fix(self) -> Option<RawFix> {
        if self.class != "TPV" || self.mode.unwrap_or(0) < 2 {
            return None;
        }
        let (lat, lng) = (self.lat?, self.lon?);
        let accuracy = self.eph.or(match (self.epx, self.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (one, other) => one.or(other),
        });
        Some(RawFix {
            lat,
            lng,
            speed: self.speed,
            altitude: self.alt_msl.or(self.alt),
            accuracy,
            altitude_accuracy: self.epv,
            heading: self.track,
        })
    }
}

/// Location source backed by a gpsd daemon.
pub struct GpsdLocationSource {
    host: String,
    port: u16,
}

impl GpsdLocationSource {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl LocationSource for GpsdLocationSource {
    async fn subscribe(&self) -> Result<LocationSubscription, LocationError> {
        let address = format!("{}:{}", self.host, self.port);
        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|e| LocationError::ConnectFailed(format!("{address}: {e}")))?;

        stream
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| LocationError::ConnectFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        let feed = tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let report: GpsdReport = match serde_json::from_str(&line) {
                            Ok(report) => report,
                            Err(e) => {
                                warn!("skipping unparseable gpsd line: {e}");
                                continue;
                            }
                        };
                        if let Some(fix) = report.into_fix() {
                            if tx.send(fix).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("gpsd stream closed");
                        break;
                    }
                    Err(e) => {
                        warn!("gpsd read error, ending fix stream: {e}");
                        break;
                    }
                }
            }
        });

        Ok(LocationSubscription::new(rx, feed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<RawFix> {
        serde_json::from_str::<GpsdReport>(line).ok()?.into_fix()
    }

    #[test]
    fn tpv_with_fix_becomes_raw_fix() {
        let fix = parse(
            r#"{"class":"TPV","mode":3,"lat":40.785,"lon":-73.968,"altMSL":25.0,"speed":1.4,"track":182.0,"eph":4.5,"epv":9.0}"#,
        )
        .unwrap();
        assert_eq!(fix.lat, 40.785);
        assert_eq!(fix.lng, -73.968);
        assert_eq!(fix.accuracy, Some(4.5));
        assert_eq!(fix.altitude, Some(25.0));
        assert_eq!(fix.heading, Some(182.0));
    }

    #[test]
    fn tpv_without_fix_is_dropped() {
        assert!(parse(r#"{"class":"TPV","mode":1}"#).is_none());
        assert!(parse(r#"{"class":"TPV","mode":2,"lat":40.0}"#).is_none());
    }

    #[test]
    fn non_tpv_classes_are_dropped() {
        assert!(parse(r#"{"class":"VERSION","release":"3.25"}"#).is_none());
        assert!(parse(r#"{"class":"SKY"}"#).is_none());
    }

    #[test]
    fn accuracy_falls_back_to_epx_epy() {
        let fix = parse(
            r#"{"class":"TPV","mode":2,"lat":40.0,"lon":-73.9,"epx":3.0,"epy":7.0}"#,
        )
        .unwrap();
        assert_eq!(fix.accuracy, Some(7.0));
    }
}
