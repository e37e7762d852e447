//! Alarm sequencing
//!
//! `activate()` starts the buzzer immediately. Everything else is timed
//! from the first `process()` tick after activation:
//!
//! ```text
//!  0 ms     initial pump pulse (skipped if the pump is already on)
//!  +1500    pump toggle 1
//!  +3000    pump toggle 2
//!  +4500    pump toggle 3
//!  5000     buzzer off, cooling down
//!  7000     idle, ready for the next trigger
//! ```
//!
//! The buzzer toggles every 150 ms while active.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use snapbridge_core::traits::{elapsed_ms, Alarm};

use super::{
    ALARM_COOLDOWN_MS, ALARM_DURATION_MS, BUZZER_BEEP_COUNT, BUZZER_BEEP_DELAY_MS,
    BUZZER_DUTY_PERCENT, PUMP_TOGGLE_COUNT, PUMP_TOGGLE_DELAY_MS, RELAY_PULSE_MS,
    SELF_TEST_CHIRP_MS,
};

/// Alarm states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    #[default]
    Idle,
    /// Sequence running
    Active,
    /// Sequence finished; new triggers are ignored until idle
    CoolingDown,
}

/// Pump relay and buzzer sequencer
///
/// The relay line is expected to be open-drain: `set_low` presses the
/// relay button, `set_high` releases the line. Pin errors are ignored;
/// the sequence keeps running on its own clock.
pub struct AlarmSequencer<P, B> {
    relay: P,
    buzzer: B,
    state: AlarmState,
    /// Sequence start, latched on the first tick after activation
    started_ms: Option<u32>,
    last_pump_ms: u32,
    last_buzzer_ms: u32,
    pulse_started_ms: Option<u32>,
    pump_on: bool,
    buzzer_on: bool,
    initial_pump_done: bool,
    pump_toggles: u8,
    buzzer_toggles: u8,
}

impl<P: OutputPin, B: SetDutyCycle> AlarmSequencer<P, B> {
    /// Take ownership of the outputs, releasing the relay and silencing
    /// the buzzer
    pub fn new(relay: P, buzzer: B) -> Self {
        let mut alarm = Self {
            relay,
            buzzer,
            state: AlarmState::Idle,
            started_ms: None,
            last_pump_ms: 0,
            last_buzzer_ms: 0,
            pulse_started_ms: None,
            pump_on: false,
            buzzer_on: false,
            initial_pump_done: false,
            pump_toggles: 0,
            buzzer_toggles: 0,
        };
        let _ = alarm.relay.set_high();
        alarm.set_buzzer(false);
        alarm
    }

    /// Chirp the buzzer once so the operator hears the alarm is wired
    pub fn self_test<D: DelayNs>(&mut self, delay: &mut D) {
        self.set_buzzer(true);
        delay.delay_ms(SELF_TEST_CHIRP_MS);
        self.set_buzzer(false);
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Pump state as tracked from the relay pulses
    pub fn pump_on(&self) -> bool {
        self.pump_on
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer_on
    }

    /// Advance the sequence
    ///
    /// Call periodically with the current time; finer ticks give more
    /// accurate relay pulses.
    pub fn process(&mut self, now_ms: u32) {
        if let Some(pulse_start) = self.pulse_started_ms {
            if elapsed_ms(now_ms, pulse_start) >= RELAY_PULSE_MS {
                let _ = self.relay.set_high();
                self.pulse_started_ms = None;
                self.pump_on = !self.pump_on;
            }
        }

        match self.state {
            AlarmState::Idle => {}
            AlarmState::Active => self.process_active(now_ms),
            AlarmState::CoolingDown => {
                let start = self.started_ms.unwrap_or(now_ms);
                if elapsed_ms(now_ms, start) > ALARM_DURATION_MS + ALARM_COOLDOWN_MS {
                    self.state = AlarmState::Idle;
                    self.started_ms = None;
                    self.pump_toggles = 0;
                    self.initial_pump_done = false;
                }
            }
        }
    }

    /// Release the relay, silence the buzzer and return to idle
    pub fn deinit(&mut self) {
        if self.pulse_started_ms.take().is_some() {
            let _ = self.relay.set_high();
        }
        self.set_buzzer(false);
        self.state = AlarmState::Idle;
        self.started_ms = None;
        self.pump_toggles = 0;
        self.initial_pump_done = false;
    }

    fn process_active(&mut self, now_ms: u32) {
        let start = match self.started_ms {
            Some(start) => start,
            None => {
                self.started_ms = Some(now_ms);
                self.last_pump_ms = now_ms;
                self.last_buzzer_ms = now_ms;
                now_ms
            }
        };

        if elapsed_ms(now_ms, start) > ALARM_DURATION_MS {
            self.state = AlarmState::CoolingDown;
            self.set_buzzer(false);
            return;
        }

        let pulsing = self.pulse_started_ms.is_some();
        if !self.initial_pump_done && !pulsing {
            if !self.pump_on {
                self.start_pulse(now_ms);
            }
            self.initial_pump_done = true;
            self.last_pump_ms = now_ms;
        }

        if self.initial_pump_done
            && self.pulse_started_ms.is_none()
            && elapsed_ms(now_ms, self.last_pump_ms) > PUMP_TOGGLE_DELAY_MS
        {
            if self.pump_toggles < PUMP_TOGGLE_COUNT {
                self.start_pulse(now_ms);
                self.pump_toggles += 1;
            }
            self.last_pump_ms = now_ms;
        }

        if elapsed_ms(now_ms, self.last_buzzer_ms) > BUZZER_BEEP_DELAY_MS {
            if self.buzzer_toggles < BUZZER_BEEP_COUNT * 2 {
                self.set_buzzer(!self.buzzer_on);
                self.buzzer_toggles += 1;
            } else {
                // Wrap for continuous beeping
                self.buzzer_toggles = 0;
            }
            self.last_buzzer_ms = now_ms;
        }
    }

    fn start_pulse(&mut self, now_ms: u32) {
        if self.pulse_started_ms.is_some() {
            return;
        }
        let _ = self.relay.set_low();
        self.pulse_started_ms = Some(now_ms);
    }

    fn set_buzzer(&mut self, on: bool) {
        let result = if on {
            self.buzzer.set_duty_cycle_percent(BUZZER_DUTY_PERCENT)
        } else {
            self.buzzer.set_duty_cycle_fully_off()
        };
        let _ = result;
        self.buzzer_on = on;
    }
}

impl<P: OutputPin, B: SetDutyCycle> Alarm for AlarmSequencer<P, B> {
    fn activate(&mut self) {
        if self.state != AlarmState::Idle {
            return;
        }
        self.state = AlarmState::Active;
        self.started_ms = None;
        self.pump_toggles = 0;
        self.buzzer_toggles = 0;
        self.set_buzzer(true);
    }

    fn is_active(&self) -> bool {
        self.state == AlarmState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::pwm::ErrorType as PwmErrorType;

    /// Mock relay line counting presses
    struct MockRelay {
        low: bool,
        presses: u32,
    }

    impl MockRelay {
        fn new() -> Self {
            Self {
                low: false,
                presses: 0,
            }
        }
    }

    impl PinErrorType for MockRelay {
        type Error = Infallible;
    }

    impl OutputPin for MockRelay {
        fn set_low(&mut self) -> Result<(), Infallible> {
            if !self.low {
                self.presses += 1;
            }
            self.low = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.low = false;
            Ok(())
        }
    }

    /// Mock PWM channel with a 0..=1000 range
    struct MockPwm {
        duty: u16,
    }

    impl PwmErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    struct NoDelay {
        waited_ms: u32,
    }

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waited_ms += ns / 1_000_000;
        }
    }

    fn alarm() -> AlarmSequencer<MockRelay, MockPwm> {
        AlarmSequencer::new(MockRelay::new(), MockPwm { duty: 700 })
    }

    /// Tick every 10 ms from `from` up to and including `to`
    fn run(alarm: &mut AlarmSequencer<MockRelay, MockPwm>, from: u32, to: u32) {
        let mut now = from;
        while now <= to {
            alarm.process(now);
            now += 10;
        }
    }

    #[test]
    fn test_new_is_quiet() {
        let alarm = alarm();
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(alarm.buzzer.duty, 0);
        assert!(!alarm.relay.low);
        assert!(!alarm.is_active());
    }

    #[test]
    fn test_self_test_chirps() {
        let mut alarm = alarm();
        let mut delay = NoDelay { waited_ms: 0 };
        alarm.self_test(&mut delay);
        assert_eq!(delay.waited_ms, SELF_TEST_CHIRP_MS);
        assert_eq!(alarm.buzzer.duty, 0);
    }

    #[test]
    fn test_activate_starts_buzzer() {
        let mut alarm = alarm();
        alarm.activate();
        assert!(alarm.is_active());
        assert_eq!(alarm.buzzer.duty, 500);
    }

    #[test]
    fn test_full_sequence() {
        let mut alarm = alarm();
        alarm.activate();

        // Initial pulse on the first tick, released after 100 ms
        alarm.process(1000);
        assert!(alarm.relay.low);
        run(&mut alarm, 1010, 1100);
        assert!(!alarm.relay.low);
        assert!(alarm.pump_on());

        run(&mut alarm, 1110, 5990);
        assert_eq!(alarm.relay.presses, 1 + u32::from(PUMP_TOGGLE_COUNT));
        // Initial pulse plus three toggles leaves the pump off
        assert!(!alarm.pump_on());
        assert!(alarm.is_active());

        alarm.process(6001);
        assert_eq!(alarm.state(), AlarmState::CoolingDown);
        assert!(!alarm.is_active());
        assert_eq!(alarm.buzzer.duty, 0);

        // Triggers are ignored while cooling down
        alarm.activate();
        assert_eq!(alarm.state(), AlarmState::CoolingDown);

        alarm.process(8000);
        assert_eq!(alarm.state(), AlarmState::CoolingDown);
        alarm.process(8001);
        assert_eq!(alarm.state(), AlarmState::Idle);

        alarm.activate();
        assert!(alarm.is_active());
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut alarm = alarm();
        alarm.activate();
        alarm.process(0);
        run(&mut alarm, 10, 2000);
        let presses = alarm.relay.presses;

        alarm.activate();
        alarm.process(2010);
        assert_eq!(alarm.relay.presses, presses);
        assert!(alarm.is_active());
    }

    #[test]
    fn test_buzzer_toggles() {
        let mut alarm = alarm();
        alarm.activate();
        alarm.process(0);
        assert!(alarm.buzzer_on());

        alarm.process(150);
        assert!(alarm.buzzer_on());
        alarm.process(151);
        assert!(!alarm.buzzer_on());
        alarm.process(302);
        assert!(alarm.buzzer_on());
    }

    #[test]
    fn test_deinit_releases_outputs() {
        let mut alarm = alarm();
        alarm.activate();
        alarm.process(0);
        assert!(alarm.relay.low);

        alarm.deinit();
        assert!(!alarm.relay.low);
        assert_eq!(alarm.buzzer.duty, 0);
        assert_eq!(alarm.state(), AlarmState::Idle);
    }
}
