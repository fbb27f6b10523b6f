//! Status LED blink patterns keyed on the device's network role.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// No fabric yet, waiting for BLE commissioning.
    Uncommissioned,
    Disabled,
    Detached,
    Child,
    Router,
    Leader,
    FactoryReset,
}

impl DeviceRole {
    /// Picks the role to display. A pending factory reset wins over
    /// everything, then a missing fabric. `thread_role` is only queried once
    /// the node is commissioned.
    pub fn resolve<F>(factory_reset: bool, commissioned: bool, thread_role: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        if factory_reset {
            Self::FactoryReset
        } else if !commissioned {
            Self::Uncommissioned
        } else {
            thread_role()
        }
    }

    /// `true` for the first role reported after the node joined a fabric.
    pub fn completes_commissioning(previous: Self, next: Self) -> bool {
        previous == Self::Uncommissioned
            && !matches!(next, Self::Uncommissioned | Self::FactoryReset)
    }

    pub fn pattern(self) -> Pattern {
        match self {
            Self::Uncommissioned => Pattern::Cycle(SLOW_BLINK),
            Self::Disabled => Pattern::Off,
            Self::Detached => Pattern::Cycle(FAST_BLINK),
            Self::Child => Pattern::Cycle(SINGLE_FLASH),
            Self::Router => Pattern::Cycle(DOUBLE_FLASH),
            Self::Leader => Pattern::On,
            Self::FactoryReset => Pattern::Cycle(STROBE),
        }
    }
}

const SLOW_BLINK: &[Phase] = &[Phase::on(500), Phase::off(500)];
const FAST_BLINK: &[Phase] = &[Phase::on(100), Phase::off(100)];
const SINGLE_FLASH: &[Phase] = &[Phase::on(100), Phase::off(1900)];
const DOUBLE_FLASH: &[Phase] = &[
    Phase::on(100),
    Phase::off(150),
    Phase::on(100),
    Phase::off(1650),
];
const STROBE: &[Phase] = &[Phase::on(50), Phase::off(50)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub lit: bool,
    pub ms: u32,
}

impl Phase {
    pub const fn on(ms: u32) -> Self {
        Self { lit: true, ms }
    }

    pub const fn off(ms: u32) -> Self {
        Self { lit: false, ms }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Off,
    On,
    Cycle(&'static [Phase]),
}

#[derive(Debug)]
pub struct Indicator {
    role: DeviceRole,
    phase: usize,
    phase_started_ms: u64,
}

impl Indicator {
    pub fn new(role: DeviceRole, now_ms: u64) -> Self {
        Self {
            role,
            phase: 0,
            phase_started_ms: now_ms,
        }
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// Returns `true` if the role changed and the pattern was restarted.
    pub fn set_role(&mut self, role: DeviceRole, now_ms: u64) -> bool {
        if role == self.role {
            return false;
        }

        self.role = role;
        self.phase = 0;
        self.phase_started_ms = now_ms;

        true
    }

    /// LED state at `now_ms`.
    pub fn level(&mut self, now_ms: u64) -> bool {
        let phases = match self.role.pattern() {
            Pattern::Off => return false,
            Pattern::On => return true,
            Pattern::Cycle(phases) => phases,
        };

        let period: u64 = phases.iter().map(|p| u64::from(p.ms)).sum();
        if period == 0 {
            return false;
        }

        let mut elapsed = now_ms.saturating_sub(self.phase_started_ms);

        // Skip whole periods after a long stall
        if elapsed >= period {
            let skipped = elapsed - elapsed % period;
            self.phase_started_ms += skipped;
            elapsed -= skipped;
        }

        loop {
            let ms = u64::from(phases[self.phase].ms);
            if elapsed < ms {
                return phases[self.phase].lit;
            }

            elapsed -= ms;
            self.phase_started_ms += ms;
            self.phase = (self.phase + 1) % phases.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(indicator: &mut Indicator, from: u64, to: u64, step: u64) -> Vec<bool> {
        (from..to)
            .step_by(step as usize)
            .map(|t| indicator.level(t))
            .collect()
    }

    #[test]
    fn test_resolve_precedence() {
        let router = || DeviceRole::Router;

        assert_eq!(DeviceRole::resolve(false, true, router), DeviceRole::Router);
        assert_eq!(
            DeviceRole::resolve(false, false, router),
            DeviceRole::Uncommissioned
        );
        assert_eq!(
            DeviceRole::resolve(true, true, router),
            DeviceRole::FactoryReset
        );
        assert_eq!(
            DeviceRole::resolve(true, false, router),
            DeviceRole::FactoryReset
        );
    }

    #[test]
    fn test_resolve_skips_thread_query_until_commissioned() {
        let queried = core::cell::Cell::new(false);
        let query = || {
            queried.set(true);
            DeviceRole::Child
        };

        DeviceRole::resolve(false, false, query);
        assert!(!queried.get());

        DeviceRole::resolve(true, true, query);
        assert!(!queried.get());

        assert_eq!(DeviceRole::resolve(false, true, query), DeviceRole::Child);
        assert!(queried.get());
    }

    #[test]
    fn test_commissioning_complete_transition() {
        use DeviceRole::*;

        assert!(DeviceRole::completes_commissioning(Uncommissioned, Detached));
        assert!(DeviceRole::completes_commissioning(Uncommissioned, Disabled));
        assert!(!DeviceRole::completes_commissioning(Uncommissioned, FactoryReset));
        assert!(!DeviceRole::completes_commissioning(Detached, Child));
        assert!(!DeviceRole::completes_commissioning(Router, Uncommissioned));
    }

    #[test]
    fn test_steady_patterns() {
        let mut indicator = Indicator::new(DeviceRole::Leader, 0);
        assert!(trace(&mut indicator, 0, 5000, 50).iter().all(|lit| *lit));

        indicator.set_role(DeviceRole::Disabled, 5000);
        assert!(trace(&mut indicator, 5000, 10000, 50).iter().all(|lit| !*lit));
    }

    #[test]
    fn test_uncommissioned_slow_blink() {
        let mut indicator = Indicator::new(DeviceRole::Uncommissioned, 1000);

        assert_eq!(
            trace(&mut indicator, 1000, 3000, 250),
            vec![true, true, false, false, true, true, false, false]
        );
    }

    #[test]
    fn test_router_double_flash() {
        let mut indicator = Indicator::new(DeviceRole::Router, 0);

        assert_eq!(
            trace(&mut indicator, 0, 400, 50),
            vec![true, true, false, false, false, true, true, false]
        );
        assert!(!indicator.level(1999));
        assert!(indicator.level(2000));
    }

    #[test]
    fn test_role_change_restarts_pattern() {
        let mut indicator = Indicator::new(DeviceRole::Child, 0);
        assert!(!indicator.level(700));

        assert!(indicator.set_role(DeviceRole::Detached, 700));
        assert!(indicator.level(700));
        assert!(!indicator.level(800));

        // Same role does not restart
        assert!(!indicator.set_role(DeviceRole::Detached, 850));
        assert!(indicator.level(900));
    }

    #[test]
    fn test_late_tick_skips_phases() {
        let mut indicator = Indicator::new(DeviceRole::Detached, 0);

        assert!(indicator.level(0));
        // 10_050 ms later: 50 full periods plus 50 ms into the "on" phase
        assert!(indicator.level(10_050));
        assert!(!indicator.level(10_150));
    }

    #[test]
    fn test_factory_reset_fast_blink() {
        let mut indicator = Indicator::new(DeviceRole::Leader, 0);
        indicator.set_role(DeviceRole::FactoryReset, 100);

        assert_eq!(
            trace(&mut indicator, 100, 300, 50),
            vec![true, false, true, false]
        );
    }
}
