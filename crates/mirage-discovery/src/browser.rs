//! Client-side browsing for advertised mirage hosts. The core only resolves
//! the advertised [`MirageHostCapabilities`] and endpoint; actually
//! connecting is the client façade's job (spec.md §1 "the core consumes
//! resolved endpoints").

use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use mirage_core::{DeviceId, HardwareClass, HardwareIconHint, MirageHostCapabilities};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::advertiser::SERVICE_TYPE;
use crate::error::DiscoveryError;

/// A host resolved on the local network, with its parsed capabilities and
/// the address/port a client should dial.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHost {
    pub instance_name: String,
    pub address: IpAddr,
    pub control_port: u16,
    pub capabilities: MirageHostCapabilities,
}

/// Browses for mirage hosts on the local network. Owns the mDNS daemon for
/// the lifetime of the browse.
pub struct HostBrowser {
    daemon: Option<ServiceDaemon>,
}

impl HostBrowser {
    pub fn new() -> Self {
        Self { daemon: None }
    }

    /// Starts browsing; resolved hosts are delivered on the returned
    /// channel as they are found. Hosts whose TXT record is malformed are
    /// logged and skipped rather than surfaced as an error, matching
    /// spec.md §4.1's "unknown types MUST be ignored with a log, not a
    /// disconnect" posture for anything off the happy path.
    pub fn start_browsing(&mut self) -> Result<mpsc::Receiver<ResolvedHost>, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::DaemonFailed(e.to_string()))?;
        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| DiscoveryError::BrowseFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        let Some(address) = info.get_addresses().iter().next().copied() else {
                            continue;
                        };
                        let txt = info
                            .get_properties()
                            .iter()
                            .map(|p| (p.key().to_owned(), p.val_str().to_owned()))
                            .collect();
                        match parse_resolved(info.get_fullname(), address, info.get_port(), txt) {
                            Ok(host) => {
                                info!(instance = %host.instance_name, %address, "discovered mirage host");
                                let _ = tx.send(host).await;
                            }
                            Err(e) => {
                                debug!(fullname = %info.get_fullname(), error = %e, "ignoring malformed mirage host advertisement");
                            }
                        }
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => {
                        debug!(%fullname, "mirage host advertisement removed");
                    }
                    _ => {}
                }
            }
        });

        self.daemon = Some(daemon);
        Ok(rx)
    }

    pub fn stop(&mut self) {
        if let Some(daemon) = self.daemon.take() {
            let _ = daemon.shutdown();
        }
    }
}

impl Default for HostBrowser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_field<T: std::str::FromStr>(key: &'static str, val: &str) -> Result<T, DiscoveryError> {
    val.parse().map_err(|_| DiscoveryError::InvalidField(key, val.to_owned()))
}

fn parse_resolved(
    fullname: &str,
    address: IpAddr,
    control_port: u16,
    txt: std::collections::HashMap<String, String>,
) -> Result<ResolvedHost, DiscoveryError> {
    let get = |key: &'static str| txt.get(key).ok_or(DiscoveryError::MissingField(key));

    let max_streams = parse_field("maxStreams", get("maxStreams")?)?;
    let supports_hevc = parse_field("supportsHEVC", get("supportsHEVC")?)?;
    let supports_p3_color_space = parse_field("supportsP3ColorSpace", get("supportsP3ColorSpace")?)?;
    let max_frame_rate = parse_field("maxFrameRate", get("maxFrameRate")?)?;
    let protocol_version = parse_field("protocolVersion", get("protocolVersion")?)?;
    let device_id_str = get("deviceID")?;
    let device_id = uuid::Uuid::parse_str(device_id_str)
        .map(DeviceId)
        .map_err(|_| DiscoveryError::InvalidField("deviceID", device_id_str.clone()))?;
    let identity_key_id = get("identityKeyID")?.clone();
    let model_id = get("hardwareModelIdentifier")?.clone();
    let icon_hint = match get("hardwareIconHint")?.as_str() {
        "desktop" => HardwareIconHint::Desktop,
        "laptop" => HardwareIconHint::Laptop,
        "server" => HardwareIconHint::Server,
        _ => HardwareIconHint::Unknown,
    };
    let family = get("hardwareMachineFamily")?.clone();

    Ok(ResolvedHost {
        instance_name: fullname.to_owned(),
        address,
        control_port,
        capabilities: MirageHostCapabilities {
            max_streams,
            supports_hevc,
            supports_p3_color_space,
            max_frame_rate,
            protocol_version,
            device_id,
            identity_key_id,
            hardware_class: HardwareClass {
                family,
                icon_hint,
                model_id,
                color: None,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn sample_txt() -> std::collections::HashMap<String, String> {
        [
            ("maxStreams", "4"),
            ("supportsHEVC", "true"),
            ("supportsP3ColorSpace", "true"),
            ("maxFrameRate", "120"),
            ("protocolVersion", "2"),
            ("deviceID", "2f3b6f0e-9e8e-4f0a-9d3e-1c2b3a4d5e6f"),
            ("identityKeyID", "key-123"),
            ("hardwareModelIdentifier", "MacBookPro18,1"),
            ("hardwareIconHint", "laptop"),
            ("hardwareMachineFamily", "Mac15,6"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    #[test]
    fn parses_a_well_formed_txt_record() {
        let host = parse_resolved(
            "Mac mini._mirage._tcp.local.",
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            7032,
            sample_txt(),
        )
        .expect("well-formed record parses");
        assert_eq!(host.capabilities.max_streams, 4);
        assert!(host.capabilities.supports_hevc);
        assert_eq!(host.capabilities.hardware_class.icon_hint, HardwareIconHint::Laptop);
    }

    #[test]
    fn missing_field_is_reported_not_panicked() {
        let mut txt = sample_txt();
        txt.remove("maxStreams");
        let err = parse_resolved(
            "x._mirage._tcp.local.",
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            1,
            txt,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingField("maxStreams")));
    }
}
