//! Deframing states

/// Frame receiver states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiverState {
    /// Hunting for the first magic byte
    #[default]
    Idle,
    /// Collecting the 8 header bytes
    ReceivingHeader,
    /// Collecting payload and trailer bytes
    ReceivingData,
    /// All bytes in, payload CRC not yet checked
    Processing,
    /// Payload verified and available until the next reset
    Complete,
    /// Frame rejected; cleared on the tick it was entered
    Error,
}

impl ReceiverState {
    /// Check if incoming bytes are consumed in this state
    pub fn accepts_bytes(&self) -> bool {
        matches!(
            self,
            ReceiverState::Idle | ReceiverState::ReceivingHeader | ReceiverState::ReceivingData
        )
    }

    /// Check if a frame is partially received
    ///
    /// Only these states are subject to the stall timeout.
    pub fn in_flight(&self) -> bool {
        !matches!(self, ReceiverState::Idle | ReceiverState::Complete)
    }
}
