use core::convert::Infallible;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use embedded_io::{Read, ReadReady, Write};

use crate::settings::SettingsFlash;

/// Hardware watchdog seam. Armed once at boot, fed every loop iteration,
/// and re-armed to a millisecond deadline to force a reboot.
pub trait Watchdog {
    fn start(&mut self, deadline: Duration);
    fn feed(&mut self);
}

/// Board seam for the dialler.
///
/// The board support crate implements this once and keeps ownership of the
/// peripherals; the runner borrows them through the accessors. The alarm
/// inputs and the reset input are negative logic: electrically low means
/// activated. Boards wired the other way around can wrap their pins in
/// [`ReverseInputPin`].
pub trait DiallerConfig {
    type Serial: Read + ReadReady + Write;
    /// One contact input per index; `alarm_input` must accept every index
    /// in `0..`[`crate::settings::INPUT_COUNT`].
    type AlarmPin: InputPin;
    type ResetPin: InputPin;
    type LedPin: OutputPin;
    type Watchdog: Watchdog;
    type Flash: SettingsFlash;
    type Delay: DelayNs;

    fn serial(&mut self) -> &mut Self::Serial;
    fn alarm_input(&mut self, index: usize) -> &mut Self::AlarmPin;
    fn reset_input(&mut self) -> Option<&mut Self::ResetPin>;
    fn status_led(&mut self) -> Option<&mut Self::LedPin>;
    fn watchdog(&mut self) -> &mut Self::Watchdog;
    fn flash(&mut self) -> &mut Self::Flash;
    fn delay(&mut self) -> &mut Self::Delay;

    /// Validate a destination number arriving over SMS before it is stored.
    ///
    /// The default accepts everything; boards that want a national format
    /// check override this. A rejected number leaves the stored settings
    /// untouched and stages an error reply.
    fn validate_number(&self, number: &str) -> bool {
        let _ = number;
        true
    }
}

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct ReverseOutputPin<P: OutputPin<Error = Infallible>>(pub P);

impl<P: OutputPin<Error = Infallible>> ErrorType for ReverseOutputPin<P> {
    type Error = Infallible;
}

impl<P: OutputPin<Error = Infallible>> OutputPin for ReverseOutputPin<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        match state {
            PinState::Low => self.0.set_state(PinState::High),
            PinState::High => self.0.set_state(PinState::Low),
        }
    }
}

pub struct ReverseInputPin<P: InputPin<Error = Infallible>>(pub P);

impl<P: InputPin<Error = Infallible>> ErrorType for ReverseInputPin<P> {
    type Error = Infallible;
}

impl<P: InputPin<Error = Infallible>> InputPin for ReverseInputPin<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}
