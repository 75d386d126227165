// Scripted `DeviceBridge` for unit tests.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use questcast_bridge::Error;

use crate::bridge::DeviceBridge;

#[derive(Default)]
struct Script {
    listing: String,
    listing_errors: VecDeque<Error>,
    wifi: Option<Ipv4Addr>,
    tcpip: VecDeque<Result<u16, Error>>,
    connect: VecDeque<Result<String, Error>>,
    calls: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeBridge {
    script: Mutex<Script>,
}

#[allow(clippy::unwrap_used)]
impl FakeBridge {
    pub(crate) fn with_listing(listing: &str) -> Self {
        let bridge = Self::default();
        bridge.set_listing(listing);
        bridge
    }

    pub(crate) fn set_listing(&self, listing: &str) {
        self.script.lock().unwrap().listing = listing.to_owned();
    }

    /// Fail the next listing call; later calls fall back to the listing.
    pub(crate) fn push_listing_error(&self, err: Error) {
        self.script.lock().unwrap().listing_errors.push_back(err);
    }

    pub(crate) fn set_wifi(&self, ip: Ipv4Addr) {
        self.script.lock().unwrap().wifi = Some(ip);
    }

    pub(crate) fn push_tcpip(&self, result: Result<u16, Error>) {
        self.script.lock().unwrap().tcpip.push_back(result);
    }

    pub(crate) fn push_connect(&self, result: Result<String, Error>) {
        self.script.lock().unwrap().connect.push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.script.lock().unwrap().calls.push(call);
    }
}

#[allow(clippy::unwrap_used)]
impl DeviceBridge for FakeBridge {
    async fn list_devices(&self) -> Result<String, Error> {
        self.record("devices".into());
        let mut script = self.script.lock().unwrap();
        match script.listing_errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(script.listing.clone()),
        }
    }

    async fn wifi_address(&self, serial: &str) -> Result<Option<Ipv4Addr>, Error> {
        self.record(format!("wifi {serial}"));
        Ok(self.script.lock().unwrap().wifi)
    }

    async fn enable_tcpip(&self, serial: &str, port: u16) -> Result<u16, Error> {
        self.record(format!("tcpip {serial} {port}"));
        self.script
            .lock()
            .unwrap()
            .tcpip
            .pop_front()
            .unwrap_or(Ok(port))
    }

    async fn connect(&self, host: &str, port: u16) -> Result<String, Error> {
        self.record(format!("connect {host}:{port}"));
        self.script
            .lock()
            .unwrap()
            .connect
            .pop_front()
            .unwrap_or_else(|| Ok(format!("connected to {host}:{port}")))
    }

    async fn disconnect(&self, address: &str) -> Result<String, Error> {
        self.record(format!("disconnect {address}"));
        Ok(format!("disconnected {address}"))
    }

    async fn usb(&self, serial: Option<&str>) -> Result<String, Error> {
        self.record(format!("usb {}", serial.unwrap_or("-")));
        Ok("restarting in USB mode".into())
    }
}
