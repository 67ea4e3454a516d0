//! Contact input scanning and the local reset-to-defaults input.
//!
//! The runner samples the pins and applies the negative logic (electrical
//! low is "activated") before handing levels in here; these types only keep
//! the debounce state and decide what the observations mean.

use embassy_time::Instant;

use crate::settings::INPUT_COUNT;
use crate::timing;

/// A contact input changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputEvent {
    pub index: usize,
    pub activated: bool,
}

/// Debounces the alarm inputs at the scan cadence.
///
/// One scan tick reports at most one notifiable event: a notification SMS
/// takes the dialogue, so remaining changed pins keep their old recorded
/// level and are picked up again on a later tick (the change is observed,
/// never lost). Changes on pins whose notifications are disabled only
/// update the recorded level.
pub struct InputScanner {
    last: [bool; INPUT_COUNT],
    last_scan: Option<Instant>,
}

impl InputScanner {
    /// `initial` is the activated level of each pin sampled at boot, so
    /// that a contact already closed at power-up does not fire.
    pub fn new(initial: [bool; INPUT_COUNT]) -> Self {
        Self {
            last: initial,
            last_scan: None,
        }
    }

    /// Run one scan if the cadence allows. `levels` are the current
    /// activated levels; `notify_enabled` selects which pins may report.
    pub fn poll(
        &mut self,
        now: Instant,
        levels: [bool; INPUT_COUNT],
        notify_enabled: [bool; INPUT_COUNT],
    ) -> Option<InputEvent> {
        if let Some(last) = self.last_scan {
            let due = now
                .checked_duration_since(last)
                .map_or(false, |age| age >= timing::scan_period());
            if !due {
                return None;
            }
        }
        self.last_scan = Some(now);

        for index in 0..INPUT_COUNT {
            if levels[index] == self.last[index] {
                continue;
            }
            self.last[index] = levels[index];
            if notify_enabled[index] {
                return Some(InputEvent {
                    index,
                    activated: levels[index],
                });
            }
        }
        None
    }
}

/// The dedicated reset-to-defaults input: fires after being held asserted
/// for the debounce time, then locks out for the cool-down.
pub struct ResetButton {
    asserted_since: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl ResetButton {
    pub const fn new() -> Self {
        Self {
            asserted_since: None,
            cooldown_until: None,
        }
    }

    /// Observe the input; returns `true` when the press fires.
    pub fn poll(&mut self, now: Instant, asserted: bool) -> bool {
        if !asserted {
            self.asserted_since = None;
            return false;
        }

        if let Some(until) = self.cooldown_until {
            if now < until {
                return false;
            }
            self.cooldown_until = None;
        }

        let since = *self.asserted_since.get_or_insert(now);
        let held = now
            .checked_duration_since(since)
            .map_or(false, |age| age >= timing::reset_debounce());
        if held {
            self.asserted_since = None;
            self.cooldown_until = Some(now + timing::reset_cooldown());
        }
        held
    }
}

impl Default for ResetButton {
    fn default() -> Self {
        Self::new()
    }
}
