pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at the hardware trait boundary.
pub type PinError = Box<dyn std::error::Error + Send + Sync>;

/// Level read from a digital input (float switch).
pub trait DigitalInput {
    /// Read the logic level of `pin`; `true` means high.
    fn read(&mut self, pin: u8) -> Result<bool, PinError>;
}

/// Digital output driving a valve relay or an LED.
pub trait DigitalOutput {
    /// Drive `pin` high (`true`) or low (`false`).
    fn write(&mut self, pin: u8, high: bool) -> Result<(), PinError>;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn read(&mut self, pin: u8) -> Result<bool, PinError> {
        (**self).read(pin)
    }
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for Box<T> {
    fn write(&mut self, pin: u8, high: bool) -> Result<(), PinError> {
        (**self).write(pin, high)
    }
}
