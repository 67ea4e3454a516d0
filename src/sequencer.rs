//! Multi-stage actions: intents whose completion spans several modem
//! round-trips.
//!
//! At most one action is pending at a time, held in the runner as
//! `Option<Action>` (`None` is idle). Every variant carries only the data
//! its remaining stages need. A pending action advances when the modem's
//! `OK` closes the current exchange:
//!
//! - `SignalQuery` issues `AT+CSQ` and stays pending; the `+CSQ` reply
//!   converts it into `SendOnOk` with the formatted reading.
//! - `SendOnOk` sends its staged reply as an SMS and becomes `ConfirmSend`.
//! - `ConfirmSend` is waiting for `+CMGS` and the final `OK`; that `OK`
//!   completes the action.

use core::fmt::Write;

use heapless::String;

/// Staged reply capacity. A `Modem check:` reply embeds a full `+CPSI`
/// line: 200 bytes of line cap, minus the stripped `"+CPSI:"` prefix,
/// plus `"Modem check: "` is 207 bytes worst case.
pub const REPLY_LEN: usize = 224;

pub type Reply = String<REPLY_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `Signal?` flow: issue `AT+CSQ` once the `+CMGR` exchange closes.
    SignalQuery,
    /// A reply is staged; send it as an SMS on the next `OK`.
    SendOnOk(Reply),
    /// SMS body written; `+CMGS` and the closing `OK` still outstanding.
    ConfirmSend,
}

/// Format the `Signal?` reply from a `+CSQ: <rssi>,<ber>` line.
pub fn signal_reply(csq_line: &str) -> Option<Reply> {
    let values = csq_line.strip_prefix("+CSQ:")?.trim_start();
    let rssi = values.split(',').next()?.trim();
    if rssi.is_empty() {
        return None;
    }
    let mut reply = Reply::new();
    write!(reply, "Signal quality is {}", rssi).ok()?;
    Some(reply)
}

/// Format the periodic health report from a `+CPSI: <status>` line.
/// A status too long for the reply is truncated, not dropped.
pub fn status_reply(cpsi_line: &str) -> Option<Reply> {
    let status = cpsi_line.strip_prefix("+CPSI:")?.trim_start();
    let mut reply = Reply::new();
    reply.push_str("Modem check: ").ok()?;
    for c in status.chars() {
        if reply.push(c).is_err() {
            break;
        }
    }
    Some(reply)
}

/// Whether a `+CPSI` line reports the modem on the network.
pub fn is_online(cpsi_line: &str) -> bool {
    cpsi_line.contains("Online")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_reply_takes_the_rssi() {
        assert_eq!(
            signal_reply("+CSQ: 17,99").unwrap().as_str(),
            "Signal quality is 17"
        );
        assert_eq!(
            signal_reply("+CSQ: 31,0").unwrap().as_str(),
            "Signal quality is 31"
        );
    }

    #[test]
    fn malformed_csq_is_rejected() {
        assert!(signal_reply("+CSQ:").is_none());
        assert!(signal_reply("CSQ 17").is_none());
    }

    #[test]
    fn status_reply_carries_the_rest_of_the_line() {
        let reply = status_reply("+CPSI: LTE,Online,234-15,0x1A2B").unwrap();
        assert_eq!(reply.as_str(), "Modem check: LTE,Online,234-15,0x1A2B");
    }

    #[test]
    fn online_detection() {
        assert!(is_online("+CPSI: LTE,Online,234-15"));
        assert!(!is_online("+CPSI: NO SERVICE,Offline"));
        assert!(!is_online("+CPSI: GSM,No Service"));
    }

    #[test]
    fn overlong_status_is_truncated_not_dropped() {
        let mut line = std::string::String::from("+CPSI: LTE,Online");
        line.push_str(&",x".repeat(150));
        let reply = status_reply(&line).unwrap();
        assert_eq!(reply.len(), REPLY_LEN);
    }
}
