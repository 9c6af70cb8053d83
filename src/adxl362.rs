use anyhow::Result;
use log::debug;
use num_enum::IntoPrimitive;

use crate::motion::{MotionSensor, Sensor, Status};

/// Command byte preceding a register write.
pub const CMD_WRITE: u8 = 0x0A;
/// Command byte preceding a register read.
pub const CMD_READ: u8 = 0x0B;

/// `INTMAP1` bit 7: the pin is driven low when asserted.
const INT_LOW: u8 = 0x80;

/// `POWER_CTL`: ultra-low-noise, autosleep, measurement mode.
const POWER_MEASURE: u8 = 0x26;
/// `POWER_CTL`: standby.
const POWER_STANDBY: u8 = 0x00;

/// ADXL362 register map (the subset this firmware touches).
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Register {
    Status = 0x0B,
    ThreshActL = 0x20,
    ThreshActH = 0x21,
    ThreshInactL = 0x23,
    ThreshInactH = 0x24,
    TimeInactL = 0x25,
    TimeInactH = 0x26,
    ActInactCtl = 0x27,
    IntMap1 = 0x2A,
    PowerCtl = 0x2D,
}

/// Wake-on-motion setup, written in order.
///
/// Activity above 150 mg wakes the sensor, 5 samples below 50 mg put it back
/// to sleep. INT1 is active low and fires on activity.
const WAKE_ON_MOTION: [(Register, u8); 9] = [
    (Register::ThreshActH, 0),
    (Register::ThreshActL, 150),
    (Register::ThreshInactH, 0),
    (Register::ThreshInactL, 50),
    (Register::TimeInactH, 0),
    (Register::TimeInactL, 5),
    (Register::ActInactCtl, 0xFF),
    (Register::IntMap1, INT_LOW | Status::ACT),
    (Register::PowerCtl, POWER_MEASURE),
];

/// Byte-level access to the sensor registers. The transport (SPI, bit-banged
/// or otherwise) lives behind this trait.
pub trait RegisterBus {
    /// # Errors
    /// Returns an error if the transfer fails.
    fn read_register(&mut self, address: u8) -> Result<u8>;

    /// # Errors
    /// Returns an error if the transfer fails.
    fn write_register(&mut self, address: u8, value: u8) -> Result<()>;
}

/// Analog Devices ADXL362 accelerometer used as a motion switch.
pub struct Adxl362<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> Adxl362<B> {
    #[must_use]
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// # Errors
    /// Returns an error if the transfer fails.
    pub fn read(&mut self, register: Register) -> Result<u8> {
        self.bus.read_register(register.into())
    }

    /// # Errors
    /// Returns an error if the transfer fails.
    pub fn write(&mut self, register: Register, value: u8) -> Result<()> {
        self.bus.write_register(register.into(), value)
    }

    /// Reads the status register.
    ///
    /// # Errors
    /// Returns an error if the transfer fails.
    pub fn status(&mut self) -> Result<Status> {
        self.read(Register::Status).map(Status::from)
    }
}

impl<B: RegisterBus> Sensor for Adxl362<B> {
    fn poll_status(&mut self) -> Result<Status> {
        self.status()
    }
}

impl<B: RegisterBus> MotionSensor for Adxl362<B> {
    fn configure(&mut self) -> Result<()> {
        debug!("Configuring ADXL362 for wake on motion");

        WAKE_ON_MOTION
            .iter()
            .try_for_each(|&(register, value)| self.write(register, value))
    }

    fn enable(&mut self) -> Result<()> {
        self.write(Register::PowerCtl, POWER_MEASURE)
    }

    fn disable(&mut self) -> Result<()> {
        self.write(Register::PowerCtl, POWER_STANDBY)
    }
}
