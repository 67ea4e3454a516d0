//! The control loop: everything the dialler does happens here, one
//! cooperative iteration at a time.
//!
//! You must call [`Runner::init`] once (board peripherals ready, UART RX
//! interrupt not yet installed — `init` reads the port directly), install
//! the interrupt feeding the [`crate::ingress::RxSink`], then call
//! [`Runner::run`] in a background task.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use crate::command;
use crate::config::{DiallerConfig, Watchdog};
use crate::dialogue::Dialogue;
use crate::error::Error;
use crate::ingress::{LineReader, MAX_LINE_LEN};
use crate::inputs::{InputScanner, ResetButton};
use crate::response::{classify, Line, ResponseKind};
use crate::schedule::{PeriodicSchedule, Probe};
use crate::sequencer::{self, Action, Reply};
use crate::settings::{truncated, Settings, SettingsFlash, DEFAULT_PASSWORD, INPUT_COUNT, RECORD_LEN};
use crate::sms;
use crate::timing;

pub struct Runner<'a, C: DiallerConfig, const INGRESS_SIZE: usize> {
    config: C,
    rx: LineReader<'a, INGRESS_SIZE>,
    settings: Settings,
    dialogue: Dialogue,
    /// The single multi-stage action slot; `None` is idle.
    action: Option<Action>,
    scanner: InputScanner,
    reset_button: ResetButton,
    schedule: PeriodicSchedule,
    /// `+CMTI` arrived; read this store index when the dialogue frees up.
    pending_read: Option<u16>,
    /// `+CLCC` arrived; hang up when the dialogue frees up.
    pending_hangup: bool,
    /// Out-of-band SMS (reset notice) queued for a free dialogue.
    pending_notice: Option<Reply>,
    /// `+CMGR` header seen; the next payload line is the SMS body.
    awaiting_sms_body: bool,
    led_on: bool,
    led_toggled: Instant,
}

impl<'a, C: DiallerConfig, const INGRESS_SIZE: usize> Runner<'a, C, INGRESS_SIZE> {
    /// `now` anchors the periodic cadences until [`Runner::init`] re-anchors
    /// them after modem bring-up.
    pub fn new(mut config: C, rx: LineReader<'a, INGRESS_SIZE>, now: Instant) -> Self {
        let initial = sample_inputs(&mut config);
        Self {
            config,
            rx,
            settings: Settings::defaults(),
            dialogue: Dialogue::new(),
            action: None,
            scanner: InputScanner::new(initial),
            reset_button: ResetButton::new(),
            schedule: PeriodicSchedule::new(now),
            pending_read: None,
            pending_hangup: false,
            pending_notice: None,
            awaiting_sms_body: false,
            led_on: false,
            led_toggled: now,
        }
    }

    /// Bring the system up: load settings, power-cycle and script the
    /// modem, sample the contacts, arm the watchdog.
    ///
    /// Runs before the UART RX interrupt is installed and therefore reads
    /// the port directly, blocking with per-character timeouts.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.load_settings()?;

        info!("Power-cycling the modem");
        self.write_line(command::MODEM_RESET)?;
        self.drain_boot_chatter().await;
        Timer::after(timing::modem_boot_time()).await;
        self.drain_boot_chatter().await;

        for cmd in command::INIT_SCRIPT {
            self.write_line(cmd)?;
            if !self.await_boot_ok().await? {
                warn!("Init command got no OK: {}", cmd);
            }
        }

        // Contacts already closed at power-up must not fire.
        let initial = sample_inputs(&mut self.config);
        self.scanner = InputScanner::new(initial);

        let now = Instant::now();
        self.schedule = PeriodicSchedule::new(now);
        self.led_toggled = now;
        self.config.watchdog().start(timing::watchdog_deadline());
        info!("Dialler ready");
        Ok(())
    }

    /// Run forever at the loop cadence. A modem-offline verdict stops
    /// feeding the watchdog the long way round: the deadline is re-armed to
    /// a millisecond and the core spins into the reset.
    pub async fn run(mut self) -> ! {
        loop {
            if let Err(err) = self.step(Instant::now()) {
                match err {
                    Error::ModemOffline => self.reboot(),
                    err => warn!("Loop iteration failed: {:?}", err),
                }
            }
            Timer::after(timing::loop_period()).await;
        }
    }

    /// One loop iteration. All mutation happens here.
    pub fn step(&mut self, now: Instant) -> Result<(), Error> {
        self.config.watchdog().feed();

        // Lines strictly in arrival order, at most one per iteration.
        if let Some(raw) = self.rx.next_line() {
            match core::str::from_utf8(&raw) {
                Ok(text) => self.handle_line(text, now)?,
                Err(_) => warn!("Dropping non-UTF8 line"),
            }
        }

        // Work deferred for a free dialogue, one dispatch per iteration.
        if !self.dialogue.busy() {
            if self.pending_hangup {
                self.pending_hangup = false;
                info!("Inbound call, hanging up");
                self.send_command(command::HANG_UP, ResponseKind::Ok, now)?;
            } else if let Some(index) = self.pending_read.take() {
                self.send_command(&command::read_sms(index), ResponseKind::SmsRead, now)?;
                self.dialogue.expect(ResponseKind::Ok, now);
            } else if let Some(notice) = self.pending_notice.take() {
                self.send_sms(&notice, now)?;
            }
        }

        if !self.dialogue.busy() {
            if let Some(probe) = self.schedule.due(now) {
                self.dispatch_probe(probe, now)?;
            }
        }

        self.expire_timeouts(now);
        self.scan_inputs(now)?;
        self.poll_reset_input(now);
        self.blink_led(now);

        if self.settings.is_dirty() && !self.dialogue.busy() {
            self.persist()?;
        }

        Ok(())
    }

    fn handle_line(&mut self, text: &str, now: Instant) -> Result<(), Error> {
        match classify(text) {
            Line::Ignored => Ok(()),
            Line::Result(ResponseKind::Ok) => {
                if self.dialogue.clear(ResponseKind::Ok) {
                    self.advance_action(now)
                } else {
                    debug!("Discarding unexpected OK");
                    Ok(())
                }
            }
            Line::Result(_) => {
                warn!("Modem replied ERROR, abandoning the exchange");
                self.dialogue.clear_all();
                self.action = None;
                self.awaiting_sms_body = false;
                Ok(())
            }
            Line::Response(kind, line) => self.handle_response(kind, line, now),
            Line::Payload(text) => {
                self.handle_payload(text);
                Ok(())
            }
        }
    }

    fn handle_response(&mut self, kind: ResponseKind, line: &str, now: Instant) -> Result<(), Error> {
        match kind {
            // Unsolicited events first; they arrive busy or not.
            ResponseKind::SmsIndication => {
                match parse_sms_index(line) {
                    Some(index) => {
                        debug!("SMS stored at index {}", index);
                        self.pending_read = Some(index);
                    }
                    None => warn!("Unparseable +CMTI line"),
                }
                Ok(())
            }
            ResponseKind::CallList => {
                self.pending_hangup = true;
                Ok(())
            }
            _ if !self.dialogue.is_awaiting(kind) => {
                debug!("Discarding unexpected {:?}", kind);
                Ok(())
            }
            ResponseKind::SmsRead => {
                // Header only; the body follows as a payload line, so the
                // expectation stays open until then.
                self.awaiting_sms_body = true;
                Ok(())
            }
            ResponseKind::SignalQuality => {
                self.dialogue.clear(kind);
                if matches!(self.action, Some(Action::SignalQuery)) {
                    match sequencer::signal_reply(line) {
                        Some(reply) => self.action = Some(Action::SendOnOk(reply)),
                        None => {
                            warn!("Unparseable +CSQ line");
                            self.action = None;
                        }
                    }
                }
                Ok(())
            }
            ResponseKind::ServingCell => {
                self.dialogue.clear(kind);
                if !sequencer::is_online(line) {
                    return Err(Error::ModemOffline);
                }
                if let Some(reply) = sequencer::status_reply(line) {
                    self.action = Some(Action::SendOnOk(reply));
                }
                Ok(())
            }
            _ => {
                // Registration, storage and delete echoes are merely drained.
                self.dialogue.clear(kind);
                Ok(())
            }
        }
    }

    fn handle_payload(&mut self, text: &str) {
        if !(self.awaiting_sms_body && self.dialogue.is_awaiting(ResponseKind::SmsRead)) {
            debug!("Discarding free-form line");
            return;
        }
        self.awaiting_sms_body = false;
        self.dialogue.clear(ResponseKind::SmsRead);

        let outcome = sms::handle_message(text, &mut self.settings, |number| {
            self.config.validate_number(number)
        });
        match outcome {
            sms::Outcome::Ignored => debug!("Ignoring SMS with bad password"),
            sms::Outcome::SignalRequest => self.action = Some(Action::SignalQuery),
            sms::Outcome::Reply(reply) => self.action = Some(Action::SendOnOk(reply)),
        }
    }

    /// An awaited `OK` arrived; move the pending action along.
    fn advance_action(&mut self, now: Instant) -> Result<(), Error> {
        match self.action.take() {
            None => Ok(()),
            Some(Action::SignalQuery) => {
                self.send_command(command::SIGNAL_QUERY, ResponseKind::SignalQuality, now)?;
                self.dialogue.expect(ResponseKind::Ok, now);
                self.action = Some(Action::SignalQuery);
                Ok(())
            }
            Some(Action::SendOnOk(reply)) => self.send_sms(&reply, now),
            Some(Action::ConfirmSend) => {
                debug!("SMS accepted by the modem");
                Ok(())
            }
        }
    }

    fn dispatch_probe(&mut self, probe: Probe, now: Instant) -> Result<(), Error> {
        match probe {
            Probe::ModemHealth => {
                info!("Modem health probe");
                self.send_command(command::SERVING_CELL_QUERY, ResponseKind::ServingCell, now)?;
            }
            Probe::Registration => {
                self.send_command(command::REGISTRATION_QUERY, ResponseKind::Registration, now)?;
            }
            Probe::StoreCleanup => {
                self.send_command(command::DELETE_ALL_SMS, ResponseKind::SmsDelete, now)?;
            }
        }
        self.dialogue.expect(ResponseKind::Ok, now);
        Ok(())
    }

    fn expire_timeouts(&mut self, now: Instant) {
        let mut read_expired = false;
        self.dialogue.expire(now, |kind| {
            warn!("Timed out waiting for {:?}", kind);
            if kind == ResponseKind::SmsRead {
                read_expired = true;
            }
        });
        if read_expired {
            // The command SMS never fully arrived; abandon its action.
            self.action = None;
            self.awaiting_sms_body = false;
        }
        if !self.dialogue.busy() && self.action.is_some() {
            // Nothing in flight can advance this action any more.
            warn!("Dropping orphaned action");
            self.action = None;
        }
    }

    fn scan_inputs(&mut self, now: Instant) -> Result<(), Error> {
        if self.dialogue.busy() {
            return Ok(());
        }
        let levels = sample_inputs(&mut self.config);
        let enabled = core::array::from_fn(|i| self.settings.inputs[i].notify_enabled);
        if let Some(event) = self.scanner.poll(now, levels, enabled) {
            let input = &self.settings.inputs[event.index];
            let message = if event.activated {
                input.message_on_activate.clone()
            } else {
                input.message_on_deactivate.clone()
            };
            info!(
                "Input {} {}",
                event.index + 1,
                if event.activated { "activated" } else { "deactivated" }
            );
            self.send_sms(&message, now)?;
        }
        Ok(())
    }

    fn poll_reset_input(&mut self, now: Instant) {
        let asserted = self
            .config
            .reset_input()
            .map_or(false, |pin| pin.is_low().unwrap_or(false));
        if self.reset_button.poll(now, asserted) {
            info!("Reset input held, restoring the default password");
            self.settings.password = truncated(DEFAULT_PASSWORD);
            self.settings.mark_dirty();
            self.pending_notice = Some(truncated("Password reset to default"));
        }
    }

    fn blink_led(&mut self, now: Instant) {
        let due = now
            .checked_duration_since(self.led_toggled)
            .map_or(false, |age| age >= timing::led_period());
        if !due {
            return;
        }
        self.led_toggled = now;
        self.led_on = !self.led_on;
        if let Some(led) = self.config.status_led() {
            if self.led_on {
                led.set_high().ok();
            } else {
                led.set_low().ok();
            }
        }
    }

    fn load_settings(&mut self) -> Result<(), Error> {
        let mut record = [0u8; RECORD_LEN];
        self.config
            .flash()
            .read(&mut record)
            .map_err(|_| Error::Flash)?;
        match Settings::decode(&record) {
            Some(settings) => {
                info!("Settings loaded");
                self.settings = settings;
            }
            None => {
                warn!("Settings record invalid, falling back to defaults");
                self.settings = Settings::defaults();
                self.settings.mark_dirty();
            }
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), Error> {
        debug!("Persisting settings");
        let mut record = [0u8; RECORD_LEN];
        self.settings.encode(&mut record);
        // The flash controller cannot serve code from this bank while
        // erasing; the UART ISR must not preempt the erase+program pair.
        critical_section::with(|_| self.config.flash().write(&record)).map_err(|_| Error::Flash)?;
        self.settings.clear_dirty();
        Ok(())
    }

    /// Write one CR-terminated command and record the expected echo.
    fn send_command(&mut self, cmd: &str, expect: ResponseKind, now: Instant) -> Result<(), Error> {
        debug!("TX: {}", cmd);
        self.write_line(cmd)?;
        self.dialogue.expect(expect, now);
        Ok(())
    }

    /// The `AT+CMGS` dance: command, fixed pause in place of the `>`
    /// prompt, body, Ctrl-Z. Completion is `+CMGS` plus the closing `OK`.
    fn send_sms(&mut self, body: &str, now: Instant) -> Result<(), Error> {
        info!("Sending SMS: {}", body);
        self.send_command(&command::send_sms(&self.settings.destination), ResponseKind::SmsSent, now)?;
        self.config
            .delay()
            .delay_ms(timing::sms_body_delay().as_millis() as u32);
        let serial = self.config.serial();
        serial.write_all(body.as_bytes()).map_err(|_| Error::Serial)?;
        serial
            .write_all(&[command::BODY_TERMINATOR])
            .map_err(|_| Error::Serial)?;
        serial.flush().map_err(|_| Error::Serial)?;
        self.dialogue.expect(ResponseKind::Ok, now);
        self.action = Some(Action::ConfirmSend);
        Ok(())
    }

    fn write_line(&mut self, cmd: &str) -> Result<(), Error> {
        let serial = self.config.serial();
        serial.write_all(cmd.as_bytes()).map_err(|_| Error::Serial)?;
        serial.write_all(b"\r").map_err(|_| Error::Serial)?;
        serial.flush().map_err(|_| Error::Serial)
    }

    /// Swallow whatever the modem prints around a reset, reading until the
    /// port goes quiet for the per-character timeout.
    async fn drain_boot_chatter(&mut self) {
        let mut last = Instant::now();
        loop {
            match self.config.serial().read_ready() {
                Ok(true) => {
                    let mut byte = [0u8; 1];
                    if self.config.serial().read(&mut byte).is_err() {
                        return;
                    }
                    last = Instant::now();
                }
                _ => {
                    if Instant::now().checked_duration_since(last).map_or(
                        false,
                        |quiet| quiet >= timing::boot_read_timeout(),
                    ) {
                        return;
                    }
                    Timer::after(Duration::from_millis(2)).await;
                }
            }
        }
    }

    /// Read CRLF lines until `OK`/`ERROR` or the command deadline.
    async fn await_boot_ok(&mut self) -> Result<bool, Error> {
        let deadline = Instant::now() + timing::boot_command_deadline();
        let mut line: Vec<u8, MAX_LINE_LEN> = Vec::new();
        while Instant::now() < deadline {
            let ready = self
                .config
                .serial()
                .read_ready()
                .map_err(|_| Error::Serial)?;
            if !ready {
                Timer::after(Duration::from_millis(2)).await;
                continue;
            }
            let mut byte = [0u8; 1];
            let n = self
                .config
                .serial()
                .read(&mut byte)
                .map_err(|_| Error::Serial)?;
            if n == 0 {
                continue;
            }
            match byte[0] {
                b'\n' => {
                    let text = core::str::from_utf8(&line).unwrap_or("");
                    match classify(text) {
                        Line::Result(ResponseKind::Ok) => return Ok(true),
                        Line::Result(_) => return Ok(false),
                        _ => {}
                    }
                    line.clear();
                }
                b'\r' => {}
                byte => {
                    line.push(byte).ok();
                }
            }
        }
        Ok(false)
    }

    fn reboot(&mut self) -> ! {
        error!("Modem offline, forcing a watchdog reboot");
        self.config.watchdog().start(timing::reboot_deadline());
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Current activated level of each contact, negative logic applied.
fn sample_inputs<C: DiallerConfig>(config: &mut C) -> [bool; INPUT_COUNT] {
    let mut levels = [false; INPUT_COUNT];
    for (index, level) in levels.iter_mut().enumerate() {
        *level = config.alarm_input(index).is_low().unwrap_or(false);
    }
    levels
}

/// The store index sits after the final comma of a `+CMTI` line.
fn parse_sms_index(line: &str) -> Option<u16> {
    line.rsplit(',').next()?.trim().parse().ok()
}
