//! The three recurring modem duties, each on its own wall-clock cadence.

use embassy_time::{Duration, Instant};

use crate::timing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Probe {
    /// `AT+CPSI?`; an offline verdict forces a reboot.
    ModemHealth,
    /// `AT+CREG?`; the reply is drained, the query keeps the session warm.
    Registration,
    /// `AT+CMGD=0,4`; empties the inbound SMS store.
    StoreCleanup,
}

const PROBES: [Probe; 3] = [Probe::ModemHealth, Probe::Registration, Probe::StoreCleanup];

/// Tracks when each duty last ran. The runner asks for due work only while
/// the dialogue is idle, and a probe's clock restarts when it is handed
/// out, whether or not the exchange then succeeds.
pub struct PeriodicSchedule {
    last: [Instant; 3],
}

impl PeriodicSchedule {
    /// Anchor all cadences at `now`; the first occurrence of each duty is
    /// one full interval after boot.
    pub fn new(now: Instant) -> Self {
        Self { last: [now; 3] }
    }

    fn interval(probe: Probe) -> Duration {
        match probe {
            Probe::ModemHealth => timing::health_interval(),
            Probe::Registration => timing::registration_interval(),
            Probe::StoreCleanup => timing::cleanup_interval(),
        }
    }

    /// Hand out at most one due probe, restarting its cadence.
    pub fn due(&mut self, now: Instant) -> Option<Probe> {
        for (index, probe) in PROBES.iter().enumerate() {
            let elapsed = now
                .checked_duration_since(self.last[index])
                .map_or(false, |age| age >= Self::interval(*probe));
            if elapsed {
                self.last[index] = now;
                return Some(*probe);
            }
        }
        None
    }
}
