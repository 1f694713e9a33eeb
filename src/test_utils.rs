use crate::mopeka::PAYLOAD_LEN;
use crate::reading::SensorReading;
use crate::scanner::{Advertisement, AdvertisementHandler, Radio, ScanError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

/// A stable address for unit tests.
pub const TEST_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// A plausible propane reading: 2.875 V, 20 °C, raw level 500, quality 3.
pub fn sample_payload() -> [u8; PAYLOAD_LEN] {
    [
        0x59, 0x00, // Manufacturer ID
        0x03, // Standard propane
        0x5C, // Battery: 92 / 32 = 2.875 V
        0x3C, // Temperature: 60 - 40 = 20 °C
        0xF4, 0xC1, // Level 0x01F4 = 500, read quality 3
        0xDD, 0xEE, 0xFF, // MAC address tail
        0x0A, 0xF6, // Accelerometer X, Y
    ]
}

pub fn reading_with(
    address: &str,
    observed_at: SystemTime,
    payload: [u8; PAYLOAD_LEN],
) -> SensorReading {
    SensorReading::new(
        address.to_string(),
        observed_at,
        "M1017".to_string(),
        -60,
        payload,
    )
}

pub fn advertisement(address: &str, manufacturer_data: &[u8]) -> Advertisement {
    Advertisement {
        address: address.to_string(),
        name: "M1017".to_string(),
        rssi: -60,
        manufacturer_data: manufacturer_data.to_vec(),
    }
}

/// Radio that replays the same advertisements in every window.
#[derive(Debug, Default)]
pub struct FakeRadio {
    advertisements: Vec<Advertisement>,
    fail: bool,
    active: AtomicUsize,
    /// Number of windows started so far
    pub windows: AtomicUsize,
    /// Highest number of windows that were open at the same time
    pub max_concurrent: AtomicUsize,
}

impl FakeRadio {
    pub fn new(advertisements: Vec<Advertisement>) -> Self {
        Self {
            advertisements,
            ..Default::default()
        }
    }

    /// A radio whose every window fails immediately.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl Radio for FakeRadio {
    fn scan_window<'a>(
        &'a self,
        window: Duration,
        on_advertisement: &'a mut AdvertisementHandler<'_>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail {
                self.windows.fetch_add(1, Ordering::SeqCst);
                return Err(ScanError::Bluetooth("adapter busy".to_string()));
            }

            let open = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(open, Ordering::SeqCst);

            for advertisement in &self.advertisements {
                on_advertisement(advertisement.clone());
            }
            self.windows.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(window).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
