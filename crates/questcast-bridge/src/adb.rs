// ── adb command vocabulary ──
//
// Thin typed wrappers over the handful of `adb` subcommands the launcher
// needs. Output interpretation that belongs to the device model (the
// device listing) stays textual here and is parsed by `questcast-core`.

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;
use crate::tool::Tool;

/// Default TCP port adbd listens on after `adb tcpip`.
pub const DEFAULT_WIRELESS_PORT: u16 = 5555;

/// Substrings in `adb connect` output that mean the connection did not
/// come up, even when the exit status is zero.
const CONNECT_FAILURE_MARKERS: &[&str] = &["failed", "cannot", "unable", "error"];

/// Handle to the adb executable with a per-call timeout.
#[derive(Debug, Clone)]
pub struct Adb {
    tool: Tool,
    timeout: Duration,
}

impl Adb {
    pub fn new(tool: Tool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Raw `adb devices` listing (header line included).
    pub async fn devices(&self) -> Result<String, Error> {
        Ok(self
            .tool
            .run_checked(&["devices"], self.timeout)
            .await?
            .stdout)
    }

    /// IPv4 address of the device's `wlan0` interface, read over USB.
    pub async fn wifi_address(&self, serial: &str) -> Result<Option<Ipv4Addr>, Error> {
        let output = self
            .tool
            .run_checked(
                &["-s", serial, "shell", "ip", "-f", "inet", "addr", "show", "wlan0"],
                self.timeout,
            )
            .await?;
        let address = parse_inet_address(&output.stdout);
        if address.is_none() {
            warn!(serial, "no IPv4 address on wlan0");
        }
        Ok(address)
    }

    /// Restart adbd on `serial` listening on `port`. Returns the port adb
    /// reports, or `port` when the output does not name one.
    pub async fn tcpip(&self, serial: &str, port: u16) -> Result<u16, Error> {
        let port_arg = port.to_string();
        let output = self
            .tool
            .run_checked(&["-s", serial, "tcpip", port_arg.as_str()], self.timeout)
            .await?;
        let text = output.combined();
        if contains_failure_marker(&text) {
            return Err(Error::Rejected {
                command: self.tool.command_line(&["-s", serial, "tcpip", port_arg.as_str()]),
                output: text,
            });
        }
        let bound = parse_tcpip_port(&text).unwrap_or(port);
        debug!(serial, bound, "tcpip listener enabled");
        Ok(bound)
    }

    /// `adb connect host:port`. Returns adb's message on success.
    pub async fn connect(&self, host: &str, port: u16) -> Result<String, Error> {
        let target = format!("{host}:{port}");
        let args = ["connect", target.as_str()];
        let output = self.tool.run_checked(&args, self.timeout).await?;
        let text = output.combined();
        if connect_succeeded(&text) {
            Ok(text)
        } else {
            Err(Error::Rejected {
                command: self.tool.command_line(&args),
                output: text,
            })
        }
    }

    pub async fn disconnect(&self, address: &str) -> Result<String, Error> {
        Ok(self
            .tool
            .run_checked(&["disconnect", address], self.timeout)
            .await?
            .combined())
    }

    /// Restart adbd in USB mode, optionally targeting one serial.
    pub async fn usb(&self, serial: Option<&str>) -> Result<String, Error> {
        let output = match serial {
            Some(s) => self.tool.run_checked(&["-s", s, "usb"], self.timeout).await?,
            None => self.tool.run_checked(&["usb"], self.timeout).await?,
        };
        Ok(output.combined())
    }

    /// First line of `adb version`.
    pub async fn version(&self) -> Result<String, Error> {
        let output = self.tool.run_checked(&["version"], self.timeout).await?;
        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_owned())
    }
}

fn contains_failure_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    CONNECT_FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}

/// `connected to 192.168.1.10:5555` and `already connected to ...` both
/// count as success.
pub fn connect_succeeded(text: &str) -> bool {
    text.to_ascii_lowercase().contains("connected to") && !contains_failure_marker(text)
}

/// Extract the port from `restarting in TCP mode port: 5555`.
pub fn parse_tcpip_port(text: &str) -> Option<u16> {
    let (_, tail) = text.rsplit_once("port:")?;
    tail.split_whitespace().next()?.parse().ok()
}

/// Find the first `inet a.b.c.d/nn` entry in `ip addr` output.
pub fn parse_inet_address(text: &str) -> Option<Ipv4Addr> {
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "inet" {
            let cidr = tokens.next()?;
            let addr = cidr.split('/').next()?;
            if let Ok(ip) = addr.parse() {
                return Some(ip);
            }
        }
    }
    None
}
