//! Classification of modem lines into a closed response vocabulary.

/// Everything the modem can say that the dialler reacts to.
///
/// `Ok`/`FinalError` are the final result codes; the rest are `+XXX`
/// information responses and unsolicited events. Anything else starting
/// with `+` classifies as [`ResponseKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseKind {
    /// Final result `OK`.
    Ok,
    /// Final result `ERROR`.
    FinalError,
    /// `+CPSI` serving cell status.
    ServingCell,
    /// `+CREG` network registration.
    Registration,
    /// `+CPMS` preferred message storage.
    Storage,
    /// `+CSQ` signal quality.
    SignalQuality,
    /// `+CMGD` message delete.
    SmsDelete,
    /// `+CMGS` message send confirmation.
    SmsSent,
    /// `+CMTI` new message indication.
    SmsIndication,
    /// `+CMGR` message read header.
    SmsRead,
    /// `+CLCC` current call list; only ever a sign of an inbound call.
    CallList,
    /// Any other `+XXX` line.
    Unknown,
}

impl ResponseKind {
    pub const COUNT: usize = 12;

    pub(crate) fn index(self) -> usize {
        match self {
            ResponseKind::Ok => 0,
            ResponseKind::FinalError => 1,
            ResponseKind::ServingCell => 2,
            ResponseKind::Registration => 3,
            ResponseKind::Storage => 4,
            ResponseKind::SignalQuality => 5,
            ResponseKind::SmsDelete => 6,
            ResponseKind::SmsSent => 7,
            ResponseKind::SmsIndication => 8,
            ResponseKind::SmsRead => 9,
            ResponseKind::CallList => 10,
            ResponseKind::Unknown => 11,
        }
    }
}

/// One classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A final result code, `OK` or `ERROR`.
    Result(ResponseKind),
    /// A `+XXX` response or event, with the full line.
    Response(ResponseKind, &'a str),
    /// A free-form line; only meaningful while a `+CMGR` read is open,
    /// where it carries the SMS body.
    Payload(&'a str),
    /// Empty line or the bare `>` send prompt.
    Ignored,
}

const PREFIXES: &[(&str, ResponseKind)] = &[
    ("+CPSI", ResponseKind::ServingCell),
    ("+CREG", ResponseKind::Registration),
    ("+CPMS", ResponseKind::Storage),
    ("+CSQ", ResponseKind::SignalQuality),
    ("+CMGD", ResponseKind::SmsDelete),
    ("+CMGS", ResponseKind::SmsSent),
    ("+CMTI", ResponseKind::SmsIndication),
    ("+CMGR", ResponseKind::SmsRead),
    ("+CLCC", ResponseKind::CallList),
];

/// Classify one framed line. The caller has already stripped CR/LF.
pub fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed == ">" {
        return Line::Ignored;
    }
    match trimmed {
        "OK" => return Line::Result(ResponseKind::Ok),
        "ERROR" => return Line::Result(ResponseKind::FinalError),
        _ => {}
    }
    if trimmed.starts_with('+') {
        for (prefix, kind) in PREFIXES {
            if trimmed.starts_with(prefix) {
                return Line::Response(*kind, trimmed);
            }
        }
        return Line::Response(ResponseKind::Unknown, trimmed);
    }
    Line::Payload(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_results_match_exactly() {
        assert_eq!(classify("OK"), Line::Result(ResponseKind::Ok));
        assert_eq!(classify("ERROR"), Line::Result(ResponseKind::FinalError));
        // Not exact matches: free-form payload.
        assert_eq!(classify("OKAY"), Line::Payload("OKAY"));
    }

    #[test]
    fn known_prefixes() {
        let cases = [
            ("+CPSI: LTE,Online,234-15", ResponseKind::ServingCell),
            ("+CREG: 0,1", ResponseKind::Registration),
            ("+CPMS: 0,50,0,50,0,50", ResponseKind::Storage),
            ("+CSQ: 17,99", ResponseKind::SignalQuality),
            ("+CMGD: (0-49)", ResponseKind::SmsDelete),
            ("+CMGS: 21", ResponseKind::SmsSent),
            ("+CMTI: \"SM\",3", ResponseKind::SmsIndication),
            ("+CMGR: \"REC UNREAD\",\"+447700900123\"", ResponseKind::SmsRead),
            ("+CLCC: 1,1,4,0,0,\"+447700900123\",145", ResponseKind::CallList),
        ];
        for (line, kind) in cases {
            assert_eq!(classify(line), Line::Response(kind, line));
        }
    }

    #[test]
    fn unrecognised_plus_lines() {
        assert_eq!(
            classify("+CPIN: READY"),
            Line::Response(ResponseKind::Unknown, "+CPIN: READY")
        );
    }

    #[test]
    fn prompt_and_blank_lines_ignored() {
        assert_eq!(classify(""), Line::Ignored);
        assert_eq!(classify("  "), Line::Ignored);
        assert_eq!(classify(">"), Line::Ignored);
        assert_eq!(classify(" > "), Line::Ignored);
    }

    #[test]
    fn anything_else_is_payload() {
        assert_eq!(
            classify("674358 Signal?"),
            Line::Payload("674358 Signal?")
        );
    }
}
