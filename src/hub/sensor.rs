//! The environmental sensor driver (temperature/humidity/pressure). Out
//! of scope per spec.md §1 — register-map decoding and fixed-point
//! compensation math belong to the real hardware driver, not this crate.
use async_trait::async_trait;

use crate::error::Result;
use crate::hub::transport::Transport;

#[async_trait]
pub trait SensorDriver: Send + Sync {
    async fn check_id(&self) -> Result<bool>;
    async fn get_temperature(&self) -> Result<f32>;
    async fn get_humidity(&self) -> Result<f32>;
    async fn get_pressure(&self) -> Result<f32>;
}

/// A driver bound to a real or simulated [`Transport`] at a fixed device
/// address. Readings are the raw transport bytes rescaled by a fixed
/// compensation constant — a stand-in for the real chip's register-map
/// math, which is out of scope here.
pub struct BoundSensor {
    transport: std::sync::Arc<dyn Transport>,
    device_addr: u8,
}

impl BoundSensor {
    pub fn new(transport: std::sync::Arc<dyn Transport>, device_addr: u8) -> Self {
        Self {
            transport,
            device_addr,
        }
    }
}

const REG_ID: u8 = 0x00;
const REG_TEMPERATURE: u8 = 0x01;
const REG_HUMIDITY: u8 = 0x02;
const REG_PRESSURE: u8 = 0x03;
const EXPECTED_ID: u8 = 0x42;

#[async_trait]
impl SensorDriver for BoundSensor {
    async fn check_id(&self) -> Result<bool> {
        let id = self.transport.read(self.device_addr, REG_ID).await?;
        Ok(id == EXPECTED_ID)
    }

    async fn get_temperature(&self) -> Result<f32> {
        let raw = self.transport.read(self.device_addr, REG_TEMPERATURE).await?;
        Ok(raw as f32 / 2.0 - 20.0)
    }

    async fn get_humidity(&self) -> Result<f32> {
        let raw = self.transport.read(self.device_addr, REG_HUMIDITY).await?;
        Ok(raw as f32 / 2.55)
    }

    async fn get_pressure(&self) -> Result<f32> {
        let raw = self.transport.read(self.device_addr, REG_PRESSURE).await?;
        Ok(80_000.0 + raw as f32 * 200.0)
    }
}

#[derive(Debug)]
pub struct SimulatedSensor {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self {
            temperature: 21.5,
            humidity: 45.0,
            pressure: 101_325.0,
        }
    }
}

#[async_trait]
impl SensorDriver for SimulatedSensor {
    async fn check_id(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get_temperature(&self) -> Result<f32> {
        Ok(self.temperature)
    }

    async fn get_humidity(&self) -> Result<f32> {
        Ok(self.humidity)
    }

    async fn get_pressure(&self) -> Result<f32> {
        Ok(self.pressure)
    }
}
