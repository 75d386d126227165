// ── Device bridge seam ──
//
// The poller and the wireless handoff talk to the device-bridge tool
// only through this trait. Production uses `questcast_bridge::Adb`;
// tests plug in scripted fakes.

use std::future::Future;
use std::net::Ipv4Addr;

use questcast_bridge::{Adb, Error};

/// The subset of device-bridge operations the state machine depends on.
pub trait DeviceBridge: Send + Sync + 'static {
    /// Raw device listing, header line included.
    fn list_devices(&self) -> impl Future<Output = Result<String, Error>> + Send;

    /// Wi-Fi IPv4 address of a USB-attached device.
    fn wifi_address(
        &self,
        serial: &str,
    ) -> impl Future<Output = Result<Option<Ipv4Addr>, Error>> + Send;

    /// Enable the TCP listener on `serial`; returns the bound port.
    fn enable_tcpip(&self, serial: &str, port: u16)
    -> impl Future<Output = Result<u16, Error>> + Send;

    /// Connect to `host:port`; returns the tool's message.
    fn connect(&self, host: &str, port: u16) -> impl Future<Output = Result<String, Error>> + Send;

    fn disconnect(&self, address: &str) -> impl Future<Output = Result<String, Error>> + Send;

    /// Switch adbd back to USB mode.
    fn usb(&self, serial: Option<&str>) -> impl Future<Output = Result<String, Error>> + Send;
}

impl DeviceBridge for Adb {
    async fn list_devices(&self) -> Result<String, Error> {
        self.devices().await
    }

    async fn wifi_address(&self, serial: &str) -> Result<Option<Ipv4Addr>, Error> {
        Adb::wifi_address(self, serial).await
    }

    async fn enable_tcpip(&self, serial: &str, port: u16) -> Result<u16, Error> {
        self.tcpip(serial, port).await
    }

    async fn connect(&self, host: &str, port: u16) -> Result<String, Error> {
        Adb::connect(self, host, port).await
    }

    async fn disconnect(&self, address: &str) -> Result<String, Error> {
        Adb::disconnect(self, address).await
    }

    async fn usb(&self, serial: Option<&str>) -> Result<String, Error> {
        Adb::usb(self, serial).await
    }
}
