//! Digital output pin control. Out of scope per spec.md §1 — the real
//! implementation would mux a line through the SoC's GPIO character
//! device; this crate only needs `set`/`get`.
use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait GpioLine: Send + Sync {
    async fn set(&self, line: u32, state: bool) -> Result<()>;
    async fn get(&self, line: u32) -> Result<bool>;
}

/// An in-memory GPIO simulator used by tests and by the daemon when no
/// real GPIO character device is present.
#[derive(Debug, Default)]
pub struct SimulatedGpio {
    lines: std::sync::Mutex<std::collections::HashMap<u32, bool>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GpioLine for SimulatedGpio {
    async fn set(&self, line: u32, state: bool) -> Result<()> {
        self.lines.lock().unwrap().insert(line, state);
        Ok(())
    }

    async fn get(&self, line: u32) -> Result<bool> {
        Ok(*self.lines.lock().unwrap().get(&line).unwrap_or(&false))
    }
}
