//! Serial adapters for the RP2040 UARTs
//!
//! The motor link speaks a strict request/response protocol from inside the
//! controller task, so it wants blocking reads with a hard deadline rather
//! than an async stream. [`DeadlineSerial`] provides that on top of any
//! buffered `embedded-io` port by polling `read_ready` against an
//! `embassy-time` deadline.

use cadence_hal::uart::{DataBits, Parity, StopBits, UartConfig, UartRx, UartTx};
use embassy_rp::uart;
use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};

/// Serial transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// The peripheral reported a line error (overrun, framing, break)
    Line,
}

/// Map a HAL line configuration onto the embassy UART config
pub fn uart_config(config: &UartConfig) -> uart::Config {
    let mut out = uart::Config::default();
    out.baudrate = config.baudrate;
    out.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    out.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    out.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    out
}

/// Blocking serial port with deadline-bounded reads
pub struct DeadlineSerial<T> {
    port: T,
}

impl<T> DeadlineSerial<T>
where
    T: Read + ReadReady + Write,
{
    pub fn new(port: T) -> Self {
        Self { port }
    }

    /// Give back the wrapped port
    pub fn release(self) -> T {
        self.port
    }
}

impl<T> UartTx for DeadlineSerial<T>
where
    T: Read + ReadReady + Write,
{
    type Error = SerialError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(data).map_err(|_| SerialError::Line)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.port).map_err(|_| SerialError::Line)
    }
}

impl<T> UartRx for DeadlineSerial<T>
where
    T: Read + ReadReady + Write,
{
    type Error = SerialError;

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let mut filled = 0;

        while filled < buf.len() {
            let ready = self.port.read_ready().map_err(|_| SerialError::Line)?;
            if ready {
                // read_ready guarantees this returns without blocking
                let n = self
                    .port
                    .read(&mut buf[filled..])
                    .map_err(|_| SerialError::Line)?;
                filled += n;
            } else if Instant::now() >= deadline {
                break;
            }
        }

        Ok(filled)
    }
}
