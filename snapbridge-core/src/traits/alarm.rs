//! Alarm trigger trait

/// Trigger side of the pump/buzzer alarm
///
/// Implemented by the actuator sequencer; the forwarder only ever fires it.
pub trait Alarm {
    /// Start the alarm sequence
    ///
    /// Fire-and-forget: must not block, and is ignored while a sequence is
    /// already running or cooling down.
    fn activate(&mut self);

    /// Check if the alarm sequence is currently running
    fn is_active(&self) -> bool;
}
