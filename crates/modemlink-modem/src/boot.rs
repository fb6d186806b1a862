//! Boot sequence: the fixed list of setup commands that put a modem into a
//! known state after the port is opened.
//!
//! The sequence is strictly ordered and aborts on the first failure:
//!
//! 1. `AT` -- probe that something AT-speaking is on the port
//! 2. `AT+CMGF=0` -- PDU mode; everything in this crate assumes it
//! 3. `AT+CMEE=1` -- numeric error codes instead of bare `ERROR`
//! 4. `ATE0` -- echo off, so responses are not polluted with our own bytes
//! 5. `AT+CPMS` -- select the preferred message storage

use modemlink_at::commands;
use modemlink_core::BootStep;

/// The ordered boot sequence for the given message storage area.
///
/// Each entry pairs the step identifier (used in [`Error::Boot`]
/// attribution) with the wire form of its command.
///
/// [`Error::Boot`]: modemlink_core::Error::Boot
pub fn sequence(storage: &str) -> Vec<(BootStep, String)> {
    vec![
        (BootStep::Probe, commands::attention()),
        (BootStep::PduMode, commands::set_message_format(false)),
        (BootStep::ErrorReporting, commands::set_error_reporting(1)),
        (BootStep::EchoOff, commands::set_echo(false)),
        (BootStep::Storage, commands::set_storage(storage)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_ordered_and_complete() {
        let steps = sequence("SM");
        let commands: Vec<&str> = steps.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(
            commands,
            [
                "AT\r",
                "AT+CMGF=0\r",
                "AT+CMEE=1\r",
                "ATE0\r",
                "AT+CPMS=\"SM\",\"SM\",\"SM\"\r",
            ]
        );

        let ids: Vec<BootStep> = steps.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            ids,
            [
                BootStep::Probe,
                BootStep::PduMode,
                BootStep::ErrorReporting,
                BootStep::EchoOff,
                BootStep::Storage,
            ]
        );
    }

    #[test]
    fn storage_area_is_applied_to_all_slots() {
        let steps = sequence("ME");
        let (_, storage_cmd) = steps.last().unwrap();
        assert_eq!(storage_cmd, "AT+CPMS=\"ME\",\"ME\",\"ME\"\r");
    }
}
