//! The exhaustive AT vocabulary the dialler speaks.
//!
//! Commands go out as a single CR-terminated line; the SMS body send is the
//! one exception, following `AT+CMGS` as raw text closed by Ctrl-Z.

use core::fmt::Write;

use heapless::String;

use crate::settings::NUMBER_LEN;

pub const ECHO_OFF: &str = "ATE0";
pub const DTR_IGNORE: &str = "AT&D0";
pub const VERBOSE_RESULTS: &str = "ATV1";
/// No GPRS event reports, no voice hangup control, no caller id
/// presentation, call status reported via `+CLCC`.
pub const EVENT_POLICY: &str = "AT+CGEREP=0,0;+CVHU=0;+CLIP=0;+CLCC=1";
/// LTE only, IRA character set, text-mode SMS, new-message `+CMTI`
/// indications.
pub const SMS_TEXT_MODE: &str = "AT+CNMP=2;+CSCS=\"IRA\";+CMGF=1;+CNMI=2,1";
pub const STORAGE_SIM: &str = "AT+CPMS=\"SM\",\"SM\",\"SM\"";
pub const STORAGE_MODEM: &str = "AT+CPMS=\"ME\",\"ME\",\"ME\"";
pub const DELETE_ALL_SMS: &str = "AT+CMGD=0,4";
pub const MODEM_RESET: &str = "AT+CRESET";
pub const SERVING_CELL_QUERY: &str = "AT+CPSI?";
pub const REGISTRATION_QUERY: &str = "AT+CREG?";
pub const SIGNAL_QUERY: &str = "AT+CSQ";
pub const HANG_UP: &str = "AT+CHUP";

/// Ends an SMS body after `AT+CMGS`.
pub const BODY_TERMINATOR: u8 = 0x1A;

/// Modem init script, run once during bring-up, in order.
pub const INIT_SCRIPT: &[&str] = &[
    ECHO_OFF,
    DTR_IGNORE,
    VERBOSE_RESULTS,
    EVENT_POLICY,
    SMS_TEXT_MODE,
    STORAGE_SIM,
    DELETE_ALL_SMS,
    STORAGE_MODEM,
    DELETE_ALL_SMS,
];

/// `AT+CMGR=<index>`: read the stored SMS at `index`.
pub fn read_sms(index: u16) -> String<16> {
    let mut cmd = String::new();
    write!(cmd, "AT+CMGR={}", index).ok();
    cmd
}

/// `AT+CMGS="<number>"`: open an SMS send to `number`.
pub fn send_sms(number: &str) -> String<{ NUMBER_LEN + 12 }> {
    let mut cmd = String::new();
    write!(cmd, "AT+CMGS=\"{}\"", number).ok();
    cmd
}
