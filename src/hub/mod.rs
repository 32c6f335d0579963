//! External collaborators the dispatcher's handlers call into: sensor
//! driver, GPIO lines, the I2C/SPI transport, and host statistics.
//!
//! None of the register-map math, bus framing, or virtual-file parsing
//! these modules wrap is the point of this repository (spec.md §1 places
//! them out of scope) — they exist as trait seams with a real
//! implementation where "real" is cheap (`stats`, which just reads
//! `/proc`) and a simulated one where it is not (no I2C/SPI bus is
//! attached to this repo or its test suite).
pub mod gpio;
pub mod sensor;
pub mod stats;
pub mod transport;

pub use gpio::GpioLine;
pub use sensor::SensorDriver;
pub use stats::HostStats;
pub use transport::Transport;
