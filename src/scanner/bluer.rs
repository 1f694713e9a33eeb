//! BlueZ D-Bus radio for Mopeka scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{Advertisement, AdvertisementHandler, Radio, ScanError};
use crate::mopeka::{MOPEKA_MANUFACTURER_ID, MOPEKA_MANUFACTURER_ID_BYTES};
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::{StreamExt, pin_mut};
use log::{debug, info};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Radio backed by the default BlueZ adapter.
pub struct BluerRadio {
    // Keeps the D-Bus connection alive for the adapter
    _session: Session,
    adapter: Adapter,
}

impl BluerRadio {
    /// Connect to BlueZ and power on the default adapter.
    ///
    /// # Errors
    /// Returns `ScanError::AdapterUnavailable` if no adapter can be used. This
    /// is fatal for the caller; per-window errors are not.
    pub async fn new() -> Result<Self, ScanError> {
        let session = Session::new()
            .await
            .map_err(|e| ScanError::AdapterUnavailable(e.to_string()))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|e| ScanError::AdapterUnavailable(e.to_string()))?;
        adapter
            .set_powered(true)
            .await
            .map_err(|e| ScanError::AdapterUnavailable(e.to_string()))?;

        info!("Using Bluetooth adapter {}", adapter.name());

        Ok(Self {
            _session: session,
            adapter,
        })
    }

    async fn run_window(
        &self,
        window: Duration,
        on_advertisement: &mut AdvertisementHandler<'_>,
    ) -> Result<(), ScanError> {
        // Report every advertisement, not just the first per device
        let filter = DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        };
        self.adapter.set_discovery_filter(filter).await?;

        // Discovery stops when the stream is dropped at the end of the window
        let events = self.adapter.discover_devices_with_changes().await?;
        pin_mut!(events);

        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        let result = self.read_advertisement(address).await;
                        deliver(address, result, on_advertisement);
                    }
                    Some(_) => {}
                    None => {
                        // Discovery ended early; honour the window length anyway
                        (&mut deadline).await;
                        break;
                    }
                },
            }
        }

        Ok(())
    }

    /// Read the current advertisement data of a device, `None` if it carries
    /// no Mopeka manufacturer data.
    async fn read_advertisement(
        &self,
        address: Address,
    ) -> Result<Option<Advertisement>, ScanError> {
        let device = self.adapter.device(address)?;

        let Some(mut manufacturer_data) = device.manufacturer_data().await? else {
            return Ok(None);
        };
        // BlueZ strips the manufacturer ID, put it back in front of the payload
        let Some(data) = manufacturer_data.remove(&MOPEKA_MANUFACTURER_ID) else {
            return Ok(None);
        };

        let name = match device.name().await {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => {
                debug!("Failed to read name of {address}: {e}");
                String::new()
            }
        };
        let rssi = device.rssi().await.ok().flatten().unwrap_or_default();

        let mut payload = Vec::with_capacity(MOPEKA_MANUFACTURER_ID_BYTES.len() + data.len());
        payload.extend_from_slice(&MOPEKA_MANUFACTURER_ID_BYTES);
        payload.extend_from_slice(&data);

        Ok(Some(Advertisement {
            address: address.to_string(),
            name,
            rssi,
            manufacturer_data: payload,
        }))
    }
}

/// Hand one device's advertisement to the handler. A device that could not be
/// read is skipped so the rest of the window keeps going.
fn deliver(
    address: Address,
    result: Result<Option<Advertisement>, ScanError>,
    on_advertisement: &mut AdvertisementHandler<'_>,
) {
    match result {
        Ok(Some(advertisement)) => on_advertisement(advertisement),
        Ok(None) => {}
        Err(e) => debug!("Skipping {address}: {e}"),
    }
}

impl Radio for BluerRadio {
    fn scan_window<'a>(
        &'a self,
        window: Duration,
        on_advertisement: &'a mut AdvertisementHandler<'_>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + Send + 'a>> {
        Box::pin(self.run_window(window, on_advertisement))
    }
}
