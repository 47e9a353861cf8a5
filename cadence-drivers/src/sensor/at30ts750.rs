//! AT30TS750A digital temperature sensor
//!
//! Board temperature over I2C. Configured for 12-bit resolution, giving
//! readings in 1/16 °C steps.

use cadence_hal::I2cBus;

/// Default address with A0..A2 tied low
pub const DEFAULT_ADDRESS: u8 = 0x48;

/// Register pointers
pub mod reg {
    pub const TEMPERATURE: u8 = 0x00;
    pub const CONFIG: u8 = 0x01;
}

/// Configuration value for 12-bit conversions
const CONFIG_12BIT: u8 = 0x60;

/// Sensor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor did not acknowledge
    Bus,
}

/// AT30TS750A on an I2C bus
pub struct At30ts750<B> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> At30ts750<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Select 12-bit resolution
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.bus
            .write(self.address, &[reg::CONFIG, CONFIG_12BIT])
            .map_err(|_| SensorError::Bus)
    }

    /// Temperature in 1/16 °C
    pub fn read_sixteenths(&mut self) -> Result<i16, SensorError> {
        self.bus
            .write(self.address, &[reg::TEMPERATURE])
            .map_err(|_| SensorError::Bus)?;
        let mut raw = [0u8; 2];
        self.bus
            .read(self.address, &mut raw)
            .map_err(|_| SensorError::Bus)?;
        Ok(Self::decode(raw))
    }

    /// Temperature in 0.1 °C, rounded toward zero
    pub fn read_celsius_x10(&mut self) -> Result<i16, SensorError> {
        let sixteenths = self.read_sixteenths()? as i32;
        Ok((sixteenths * 10 / 16) as i16)
    }

    /// Convert the two register bytes, left-justified two's complement
    pub fn decode(raw: [u8; 2]) -> i16 {
        i16::from_be_bytes(raw) >> 4
    }

    pub fn release(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct FakeSensor {
        temperature: [u8; 2],
        writes: Vec<Vec<u8>>,
    }

    impl I2cBus for FakeSensor {
        type Error = ();

        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), ()> {
            if address != DEFAULT_ADDRESS {
                return Err(());
            }
            self.writes.push(data.to_vec());
            Ok(())
        }

        fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), ()> {
            if address != DEFAULT_ADDRESS {
                return Err(());
            }
            buf.copy_from_slice(&self.temperature);
            Ok(())
        }
    }

    #[test]
    fn test_decode() {
        // 25.0625 °C
        assert_eq!(At30ts750::<FakeSensor>::decode([0x19, 0x10]), 401);
        // -0.5 °C
        assert_eq!(At30ts750::<FakeSensor>::decode([0xFF, 0x80]), -8);
    }

    #[test]
    fn test_read() {
        let bus = FakeSensor {
            temperature: [0x19, 0x80],
            writes: Vec::new(),
        };
        let mut sensor = At30ts750::new(bus, DEFAULT_ADDRESS);
        sensor.init().unwrap();
        assert_eq!(sensor.read_celsius_x10(), Ok(255));

        let bus = sensor.release();
        assert_eq!(bus.writes[0], vec![0x01u8, 0x60]);
        assert_eq!(bus.writes[1], vec![0x00u8]);
    }

    #[test]
    fn test_wrong_address() {
        let bus = FakeSensor {
            temperature: [0; 2],
            writes: Vec::new(),
        };
        let mut sensor = At30ts750::new(bus, 0x49);
        assert_eq!(sensor.read_sixteenths(), Err(SensorError::Bus));
    }
}
