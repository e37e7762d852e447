//! Alarm actuators
//!
//! The alarm drives a water pump through a relay module that toggles on a
//! short low pulse (a simulated button press), and a piezo buzzer on a PWM
//! channel.

mod sequencer;

pub use sequencer::{AlarmSequencer, AlarmState};

/// Length of the low pulse that toggles the pump relay
pub const RELAY_PULSE_MS: u32 = 100;

/// Buzzer tone frequency
pub const BUZZER_PWM_FREQ_HZ: u32 = 2000;

/// Buzzer duty cycle while sounding
pub const BUZZER_DUTY_PERCENT: u8 = 50;

/// Length of one alarm sequence
pub const ALARM_DURATION_MS: u32 = 5000;

/// Extra time after a sequence before the alarm can fire again
pub const ALARM_COOLDOWN_MS: u32 = 2000;

/// Pump toggles after the initial activation
pub const PUMP_TOGGLE_COUNT: u8 = 3;

/// Spacing between pump toggles
pub const PUMP_TOGGLE_DELAY_MS: u32 = 1500;

/// Beeps per burst (each beep is an on and an off toggle)
pub const BUZZER_BEEP_COUNT: u8 = 10;

/// Spacing between buzzer toggles
pub const BUZZER_BEEP_DELAY_MS: u32 = 150;

/// Length of the boot-time buzzer chirp
pub const SELF_TEST_CHIRP_MS: u32 = 200;
