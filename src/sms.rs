//! The SMS command vocabulary: password gate, verb dispatch, settings
//! mutation and reply staging.
//!
//! Every command is `<password> <verb>[!<arg>...]`, case sensitive. A
//! wrong password is silently dropped; a correct password with a bad verb
//! or argument stages an error reply. The parser never touches the modem:
//! it mutates the settings and hands back what to do, and the sequencer
//! sends any staged reply after the `+CMGR` exchange closes.

use core::fmt::Write;

use crate::sequencer::Reply;
use crate::settings::{truncated, Settings, INPUT_COUNT, PASSWORD_LEN};

/// What an inbound message asks of the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Wrong password; no reaction at all.
    Ignored,
    /// `Signal?`: start the signal quality flow.
    SignalRequest,
    /// Stage this reply for sending once the current exchange closes.
    Reply(Reply),
}

fn reply(text: &str) -> Outcome {
    Outcome::Reply(truncated(text))
}

/// Handle one received SMS body against the current settings.
///
/// Mutations mark the settings dirty; the runner persists them when the
/// dialogue next goes idle.
pub fn handle_message(
    body: &str,
    settings: &mut Settings,
    validate_number: impl FnOnce(&str) -> bool,
) -> Outcome {
    let Some(rest) = body.strip_prefix(settings.password.as_str()) else {
        return Outcome::Ignored;
    };
    let Some(command) = rest.strip_prefix(' ') else {
        return Outcome::Ignored;
    };

    if command == "Signal?" {
        return Outcome::SignalRequest;
    }
    if let Some(number) = command.strip_prefix("TelephoneNumber!") {
        if !validate_number(number) {
            return reply("Error. Invalid telephone number");
        }
        settings.destination = truncated(number);
        settings.mark_dirty();
        return reply("Ok. Changed telephone number");
    }
    if let Some(password) = command.strip_prefix("Password!") {
        // A NUL would terminate the field early in the flash record and
        // invalidate the whole record at the next boot.
        if password.len() != PASSWORD_LEN || password.as_bytes().contains(&0) {
            return reply("Error. Invalid password (needs to be 6 characters)");
        }
        settings.password = truncated(password);
        settings.mark_dirty();
        return reply("Ok. Changed password");
    }
    if let Some(digit) = command.strip_prefix("SMSonInput!") {
        let Some(index) = input_index(digit) else {
            return reply("Error. Invalid input number");
        };
        let input = &mut settings.inputs[index];
        input.notify_enabled = !input.notify_enabled;
        settings.mark_dirty();
        let mut text = Reply::new();
        let state = if settings.inputs[index].notify_enabled {
            ""
        } else {
            "not "
        };
        write!(
            text,
            "Ok. Input {} will {}trigger SMS from now on",
            index + 1,
            state
        )
        .ok();
        return Outcome::Reply(text);
    }
    if let Some(args) = command.strip_prefix("MessageText!") {
        let mut parts = args.splitn(3, '!');
        let digit = parts.next().unwrap_or("");
        let (Some(mode), Some(text)) = (parts.next(), parts.next()) else {
            return reply("Invalid instruction");
        };
        let Some(index) = input_index(digit) else {
            return reply("Error. Invalid input number");
        };
        let message = truncated(text);
        match mode {
            "On" => settings.inputs[index].message_on_activate = message,
            "Off" => settings.inputs[index].message_on_deactivate = message,
            _ => return reply("Invalid instruction"),
        }
        settings.mark_dirty();
        return reply("Ok. Changed message text");
    }
    if command == "Defaults!" {
        settings.reset_to_defaults();
        settings.mark_dirty();
        return reply("Ok. Resetting settings to defaults");
    }

    reply("Invalid instruction")
}

/// Map a user-facing input digit (`1..=INPUT_COUNT`) to its index.
fn input_index(digit: &str) -> Option<usize> {
    let value: usize = digit.parse().ok()?;
    (1..=INPUT_COUNT).contains(&value).then(|| value - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_PASSWORD;

    fn run(body: &str, settings: &mut Settings) -> Outcome {
        handle_message(body, settings, |_| true)
    }

    fn reply_text(outcome: &Outcome) -> &str {
        match outcome {
            Outcome::Reply(text) => text.as_str(),
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[test]
    fn wrong_password_is_silently_ignored() {
        let mut settings = Settings::defaults();
        assert_eq!(run("123456 Signal?", &mut settings), Outcome::Ignored);
        assert_eq!(run("Signal?", &mut settings), Outcome::Ignored);
        // Password without the separating space.
        assert_eq!(run("674358Signal?", &mut settings), Outcome::Ignored);
        assert!(!settings.is_dirty());
    }

    #[test]
    fn signal_query_is_dispatched() {
        let mut settings = Settings::defaults();
        assert_eq!(run("674358 Signal?", &mut settings), Outcome::SignalRequest);
        assert!(!settings.is_dirty());
    }

    #[test]
    fn telephone_number_is_stored() {
        let mut settings = Settings::defaults();
        let outcome = run("674358 TelephoneNumber!+447700900123", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Changed telephone number");
        assert_eq!(settings.destination.as_str(), "+447700900123");
        assert!(settings.is_dirty());
    }

    #[test]
    fn rejected_number_leaves_settings_alone() {
        let mut settings = Settings::defaults();
        let outcome = handle_message("674358 TelephoneNumber!12345", &mut settings, |_| false);
        assert_eq!(reply_text(&outcome), "Error. Invalid telephone number");
        assert_eq!(settings.destination.as_str(), "+447700900000");
        assert!(!settings.is_dirty());
    }

    #[test]
    fn password_change_needs_exactly_six_characters() {
        let mut settings = Settings::defaults();

        let outcome = run("674358 Password!abcde", &mut settings);
        assert_eq!(
            reply_text(&outcome),
            "Error. Invalid password (needs to be 6 characters)"
        );
        let outcome = run("674358 Password!abcdefg", &mut settings);
        assert_eq!(
            reply_text(&outcome),
            "Error. Invalid password (needs to be 6 characters)"
        );
        // Six characters but with an embedded NUL: would corrupt the
        // stored record, so it is rejected too.
        let outcome = run("674358 Password!ab\0def", &mut settings);
        assert_eq!(
            reply_text(&outcome),
            "Error. Invalid password (needs to be 6 characters)"
        );
        assert_eq!(settings.password.as_str(), DEFAULT_PASSWORD);
        assert!(!settings.is_dirty());

        let outcome = run("674358 Password!abcdef", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Changed password");
        assert_eq!(settings.password.as_str(), "abcdef");
        assert!(settings.is_dirty());

        // The old password no longer opens the gate; the new one does.
        assert_eq!(run("674358 Signal?", &mut settings), Outcome::Ignored);
        assert_eq!(run("abcdef Signal?", &mut settings), Outcome::SignalRequest);
    }

    #[test]
    fn notification_toggle_round_trips() {
        let mut settings = Settings::defaults();

        let outcome = run("674358 SMSonInput!2", &mut settings);
        assert_eq!(
            reply_text(&outcome),
            "Ok. Input 2 will not trigger SMS from now on"
        );
        assert!(!settings.inputs[1].notify_enabled);

        let outcome = run("674358 SMSonInput!2", &mut settings);
        assert_eq!(
            reply_text(&outcome),
            "Ok. Input 2 will trigger SMS from now on"
        );
        assert!(settings.inputs[1].notify_enabled);
    }

    #[test]
    fn input_digit_out_of_range() {
        let mut settings = Settings::defaults();
        for bad in ["0", "4", "9", "x", ""] {
            let body = std::format!("674358 SMSonInput!{bad}");
            let outcome = run(&body, &mut settings);
            assert_eq!(reply_text(&outcome), "Error. Invalid input number");
        }
        assert!(!settings.is_dirty());
    }

    #[test]
    fn message_text_updates_the_right_slot() {
        let mut settings = Settings::defaults();

        let outcome = run("674358 MessageText!1!On!Door opened", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Changed message text");
        assert_eq!(
            settings.inputs[0].message_on_activate.as_str(),
            "Door opened"
        );

        let outcome = run("674358 MessageText!3!Off!Back to normal", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Changed message text");
        assert_eq!(
            settings.inputs[2].message_on_deactivate.as_str(),
            "Back to normal"
        );
        assert!(settings.is_dirty());
    }

    #[test]
    fn message_text_is_truncated_to_capacity() {
        let mut settings = Settings::defaults();
        let long = "x".repeat(80);
        let body = std::format!("674358 MessageText!1!On!{long}");
        run(&body, &mut settings);
        assert_eq!(settings.inputs[0].message_on_activate.len(), 49);
        assert_eq!(
            settings.inputs[0].message_on_activate.as_str(),
            &long[..49]
        );
    }

    #[test]
    fn message_text_keeps_exclamation_marks_in_the_text() {
        let mut settings = Settings::defaults();
        run("674358 MessageText!1!On!Help! Now!", &mut settings);
        assert_eq!(
            settings.inputs[0].message_on_activate.as_str(),
            "Help! Now!"
        );
    }

    #[test]
    fn malformed_message_text() {
        let mut settings = Settings::defaults();
        let outcome = run("674358 MessageText!1!Maybe!text", &mut settings);
        assert_eq!(reply_text(&outcome), "Invalid instruction");
        let outcome = run("674358 MessageText!1", &mut settings);
        assert_eq!(reply_text(&outcome), "Invalid instruction");
        assert!(!settings.is_dirty());
    }

    #[test]
    fn defaults_command_is_idempotent() {
        let mut settings = Settings::defaults();
        run("674358 Password!qwerty", &mut settings);
        run("qwerty TelephoneNumber!+3312345", &mut settings);

        let outcome = run("qwerty Defaults!", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Resetting settings to defaults");
        let after_first = settings.clone();

        let outcome = run("674358 Defaults!", &mut settings);
        assert_eq!(reply_text(&outcome), "Ok. Resetting settings to defaults");
        assert_eq!(settings, after_first);
        assert_eq!(settings.password.as_str(), DEFAULT_PASSWORD);
        assert_eq!(settings.destination.as_str(), "+447700900000");
    }

    #[test]
    fn unknown_verb_with_good_password() {
        let mut settings = Settings::defaults();
        let outcome = run("674358 Reboot!", &mut settings);
        assert_eq!(reply_text(&outcome), "Invalid instruction");
    }
}
