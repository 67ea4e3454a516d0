#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The modem serial port failed to accept or deliver bytes.
    Serial,
    /// The settings flash sector could not be read or programmed.
    Flash,
    /// An expected modem response never arrived.
    Timeout,
    /// A health probe reported the modem off the network; the caller is
    /// expected to force a reboot.
    ModemOffline,
}
