//! mDNS advertisement of a host's [`MirageHostCapabilities`] (spec.md §6
//! "Capability advertisement").
//!
//! The TXT record carries exactly the fields spec.md names:
//! `maxStreams, supportsHEVC, supportsP3ColorSpace, maxFrameRate,
//! protocolVersion, deviceID, identityKeyID, hardwareModelIdentifier,
//! hardwareIconHint, hardwareMachineFamily`.

use std::collections::HashMap;
use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use mirage_core::MirageHostCapabilities;
use tracing::{info, warn};

use crate::error::DiscoveryError;

pub const SERVICE_TYPE: &str = "_mirage._tcp.local.";

/// Active mDNS advertisement of a host's capabilities. Drop or call
/// [`unregister`](Self::unregister) to stop advertising.
pub struct CapabilityAdvertiser {
    daemon: ServiceDaemon,
    fullname: String,
}

impl CapabilityAdvertiser {
    /// Registers `capabilities` on the local mDNS domain at `(host_ip,
    /// control_port)`. `instance_name` is the human-readable name shown in
    /// a client's device picker.
    pub fn register(
        instance_name: &str,
        host_ip: IpAddr,
        control_port: u16,
        capabilities: &MirageHostCapabilities,
    ) -> Result<Self, DiscoveryError> {
        let daemon =
            ServiceDaemon::new().map_err(|e| DiscoveryError::DaemonFailed(e.to_string()))?;

        let raw_host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "mirage-host".to_owned());
        let hostname = format!("{raw_host}.local.");

        let properties = txt_record_for(capabilities);

        let service = ServiceInfo::new(
            SERVICE_TYPE,
            instance_name,
            &hostname,
            host_ip,
            control_port,
            Some(properties),
        )
        .map_err(|e| DiscoveryError::RegisterFailed(e.to_string()))?;

        let fullname = service.get_fullname().to_owned();
        daemon
            .register(service)
            .map_err(|e| DiscoveryError::RegisterFailed(e.to_string()))?;

        info!(
            instance = instance_name,
            %host_ip,
            control_port,
            max_streams = capabilities.max_streams,
            "advertising mirage host capabilities"
        );

        Ok(Self { daemon, fullname })
    }

    pub fn unregister(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            warn!(fullname = %self.fullname, error = %e, "failed to unregister mDNS advertisement");
        } else {
            info!(fullname = %self.fullname, "mDNS advertisement removed");
        }
    }
}

fn txt_record_for(caps: &MirageHostCapabilities) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    properties.insert("maxStreams".to_owned(), caps.max_streams.to_string());
    properties.insert("supportsHEVC".to_owned(), caps.supports_hevc.to_string());
    properties.insert(
        "supportsP3ColorSpace".to_owned(),
        caps.supports_p3_color_space.to_string(),
    );
    properties.insert("maxFrameRate".to_owned(), caps.max_frame_rate.to_string());
    properties.insert(
        "protocolVersion".to_owned(),
        caps.protocol_version.to_string(),
    );
    properties.insert("deviceID".to_owned(), caps.device_id.to_string());
    properties.insert("identityKeyID".to_owned(), caps.identity_key_id.clone());
    properties.insert(
        "hardwareModelIdentifier".to_owned(),
        caps.hardware_class.model_id.clone(),
    );
    properties.insert(
        "hardwareIconHint".to_owned(),
        format!("{:?}", caps.hardware_class.icon_hint).to_lowercase(),
    );
    properties.insert(
        "hardwareMachineFamily".to_owned(),
        caps.hardware_class.family.clone(),
    );
    properties
}
