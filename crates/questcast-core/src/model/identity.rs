// ── Device identity ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Physical or logical link to the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Transport {
    Usb,
    Tcp,
}

/// Transport-qualified device address as reported by the bridge tool.
///
/// Two identities are equal iff transport and address string match
/// exactly; `192.168.1.10:5555` and `192.168.001.010:5555` are different
/// devices as far as adb is concerned, so no normalization happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum DeviceIdentity {
    /// USB-attached, opaque serial.
    Serial { serial: String },
    /// Wi-Fi-attached, `host:port`.
    HostPort { host: String, port: u16 },
}

impl DeviceIdentity {
    pub fn serial(serial: impl Into<String>) -> Self {
        Self::Serial {
            serial: serial.into(),
        }
    }

    pub fn host_port(host: impl Into<String>, port: u16) -> Self {
        Self::HostPort {
            host: host.into(),
            port,
        }
    }

    /// Classify an address string from the device listing. Anything that
    /// ends in `:<port>` after a non-empty host is TCP; the rest is a USB
    /// serial.
    pub fn from_address(address: &str) -> Self {
        if let Some((host, port)) = address.rsplit_once(':') {
            if !host.is_empty() {
                if let Ok(port) = port.parse::<u16>() {
                    return Self::host_port(host, port);
                }
            }
        }
        Self::serial(address)
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Serial { .. } => Transport::Usb,
            Self::HostPort { .. } => Transport::Tcp,
        }
    }

    pub fn is_tcp(&self) -> bool {
        self.transport() == Transport::Tcp
    }

    pub fn is_usb(&self) -> bool {
        self.transport() == Transport::Usb
    }

    /// The address string adb uses for `-s`.
    pub fn address(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { serial } => f.write_str(serial),
            Self::HostPort { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_serial_is_classified_as_usb() {
        let id = DeviceIdentity::from_address("1WMHH815K10347");
        assert_eq!(id, DeviceIdentity::serial("1WMHH815K10347"));
        assert_eq!(id.transport(), Transport::Usb);
    }

    #[test]
    fn host_port_is_classified_as_tcp() {
        let id = DeviceIdentity::from_address("192.168.1.10:5555");
        assert_eq!(id, DeviceIdentity::host_port("192.168.1.10", 5555));
        assert!(id.is_tcp());
        assert_eq!(id.address(), "192.168.1.10:5555");
    }

    #[test]
    fn malformed_port_stays_a_serial() {
        assert!(DeviceIdentity::from_address("host:notaport").is_usb());
        assert!(DeviceIdentity::from_address(":5555").is_usb());
        assert!(DeviceIdentity::from_address("host:99999").is_usb());
    }

    #[test]
    fn equality_is_exact_on_address_text() {
        assert_ne!(
            DeviceIdentity::from_address("192.168.1.10:5555"),
            DeviceIdentity::from_address("192.168.001.010:5555")
        );
        assert_ne!(
            DeviceIdentity::host_port("192.168.1.10", 5555),
            DeviceIdentity::host_port("192.168.1.10", 5556)
        );
    }
}
