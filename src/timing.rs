use embassy_time::Duration;

/// Sleep between control loop iterations.
pub fn loop_period() -> Duration {
    Duration::from_millis(10)
}

/// Deadline for any awaited modem response other than `OK`.
pub fn response_deadline() -> Duration {
    Duration::from_secs(9)
}

/// Deadline for an awaited `OK`. Generous, since the closing `OK` of a
/// multi-stage SMS send can trail the rest of the exchange by a long way.
pub fn ok_deadline() -> Duration {
    Duration::from_secs(60)
}

/// Watchdog deadline armed at boot and fed every loop iteration.
pub fn watchdog_deadline() -> Duration {
    Duration::from_secs(8)
}

/// Watchdog deadline armed to force an immediate reboot.
pub fn reboot_deadline() -> Duration {
    Duration::from_millis(1)
}

/// Pause between `AT+CMGS` and the message body, in place of waiting for
/// the `>` prompt.
pub fn sms_body_delay() -> Duration {
    Duration::from_millis(500)
}

/// Contact input scan cadence.
pub fn scan_period() -> Duration {
    Duration::from_secs(1)
}

/// How long the reset input must be held low before it fires.
pub fn reset_debounce() -> Duration {
    Duration::from_secs(1)
}

/// Lockout after the reset input fires.
pub fn reset_cooldown() -> Duration {
    Duration::from_secs(10)
}

/// Status LED toggle cadence.
pub fn led_period() -> Duration {
    Duration::from_secs(1)
}

/// Wait for the modem to boot after `AT+CRESET`.
pub fn modem_boot_time() -> Duration {
    Duration::from_secs(30)
}

/// Per-character timeout for the blocking line reads used during modem
/// bring-up, before the UART interrupt takes over.
pub fn boot_read_timeout() -> Duration {
    Duration::from_millis(300)
}

/// Deadline for each init script command to answer `OK` during bring-up.
pub fn boot_command_deadline() -> Duration {
    Duration::from_secs(5)
}

/// `AT+CPSI?` modem health probe interval.
pub fn health_interval() -> Duration {
    Duration::from_secs(4 * 7 * 24 * 60 * 60)
}

/// `AT+CREG?` network registration probe interval.
pub fn registration_interval() -> Duration {
    Duration::from_secs(8 * 60 * 60)
}

/// `AT+CMGD=0,4` inbound SMS store cleanup interval.
pub fn cleanup_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}
