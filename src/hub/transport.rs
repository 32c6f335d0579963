//! The bus adapter a [`super::SensorDriver`] reads/writes registers
//! through. Out of scope per spec.md §1 — the real implementation would
//! speak I2C or SPI to a physical bus; this crate only needs the seam.
use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn read(&self, device_addr: u8, register_addr: u8) -> Result<u8>;
    async fn write(&self, device_addr: u8, register_addr: u8, value: u8) -> Result<()>;
}

/// A deterministic in-memory transport used by tests and by the daemon
/// when run with `--simulated-hardware` on a host with no real bus.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    registers: std::sync::Mutex<std::collections::HashMap<(u8, u8), u8>>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, device_addr: u8, register_addr: u8, value: u8) {
        self.registers
            .lock()
            .unwrap()
            .insert((device_addr, register_addr), value);
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn read(&self, device_addr: u8, register_addr: u8) -> Result<u8> {
        Ok(*self
            .registers
            .lock()
            .unwrap()
            .get(&(device_addr, register_addr))
            .unwrap_or(&0))
    }

    async fn write(&self, device_addr: u8, register_addr: u8, value: u8) -> Result<()> {
        self.registers
            .lock()
            .unwrap()
            .insert((device_addr, register_addr), value);
        Ok(())
    }
}
