//! Event Dispatcher / Face Scheduler
//!
//! [`Movement`] owns the board, the face registry and the settings, and turns the flags set by
//! interrupt trampolines into events for the active face. Between events it puts the watch to
//! sleep.
//!
//! Face 0 is the primary face. The watch returns to it after the timeout interval and before
//! going into low energy mode.

use crate::backup::{BackupStore, LOCATION_SLOT, SETTINGS_SLOT};
use crate::background;
use crate::board::Board;
use crate::chime::{Snapshot, SunTimes};
use crate::error::Fault;
use crate::event::{Button, Event, EventKind, Gesture};
use crate::face::{Face, FaceContext, Requests, SleepRequest, Switch};
use crate::irq::{InterruptFlags, Pending};
use crate::power::{Power, PowerControl, PowerMode};
use crate::settings::{Location, Settings};
use crate::wake::WakeSources;
use embedded_time::rate::Hertz;

/// Rate of the button hold timer
pub const FAST_TICK_HZ: u16 = 128;
/// Fast ticks before a hold becomes a long press (0.5 s)
pub const LONG_PRESS_TICKS: u16 = 64;
/// Fast ticks before a hold becomes a longer press (1.5 s)
pub const LONGER_PRESS_TICKS: u16 = 192;

/// Log `fault` and reset
///
/// Every [`Fault`] ends up here. Resetting rebuilds the kernel from the backup registers, which
/// is the same path the watch takes out of deep sleep.
pub fn fatal<P: PowerControl + ?Sized>(board: &mut P, fault: Fault) {
    error!("fatal: {}", fault);
    board.reset();
}

/// Kernel configuration
#[derive(Debug, Clone, Copy)]
pub struct Config {
    secondary_face: Option<usize>,
    settings: Settings,
    wake_callback: Option<fn()>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            secondary_face: None,
            settings: Settings::default(),
            wake_callback: None,
        }
    }

    /// Face a Mode long press on the primary face jumps to
    pub fn secondary_face(mut self, index: usize) -> Self {
        self.secondary_face = Some(index);
        self
    }

    /// Settings used when the backup register holds none
    pub fn default_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Called from the wake interrupt when the alarm button ends low energy mode. It should
    /// call [`InterruptFlags::wake`].
    pub fn wake_callback(mut self, callback: fn()) -> Self {
        self.wake_callback = Some(callback);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Movement<'a, B: Board, const N: usize> {
    board: B,
    faces: [&'a mut dyn Face; N],
    flags: &'a InterruptFlags,
    wake: &'a WakeSources,
    sun: &'a dyn SunTimes,
    config: Config,
    settings: Settings,
    power: Power,
    active: usize,
    tick_hz: u8,
    pending_tick_hz: Option<u8>,
    subsecond: u8,
    last_second: u8,
    timeout_left: u32,
    low_energy_left: Option<u32>,
    led_left: u8,
    /// Fast ticks each button has been held for
    held: [Option<u16>; 3],
    fast_tick_running: bool,
    can_sleep: bool,
}

impl<'a, B: Board, const N: usize> Movement<'a, B, N> {
    const HAS_FACES: () = assert!(N > 0, "at least one face is required");

    pub fn new(
        board: B,
        faces: [&'a mut dyn Face; N],
        flags: &'a InterruptFlags,
        wake: &'a WakeSources,
        sun: &'a dyn SunTimes,
        config: Config,
    ) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_FACES;

        Self {
            board,
            faces,
            flags,
            wake,
            sun,
            settings: config.settings,
            config,
            power: Power::new(),
            active: 0,
            tick_hz: 1,
            pending_tick_hz: None,
            subsecond: 0,
            last_second: 0,
            timeout_left: 0,
            low_energy_left: None,
            led_left: 0,
            held: [None; 3],
            fast_tick_running: false,
            can_sleep: true,
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn into_board(self) -> B {
        self.board
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn active_face(&self) -> usize {
        self.active
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power.mode()
    }

    pub fn tick_frequency(&self) -> u8 {
        self.tick_hz
    }

    pub fn subsecond(&self) -> u8 {
        self.subsecond
    }

    /// Rebuild everything from the backup registers and bring up face 0
    ///
    /// Runs on every start, whether from power on, a fault or deep sleep.
    pub fn boot(&mut self) -> Result<(), Fault> {
        let stored = self.board.load(SETTINGS_SLOT);
        self.settings = if stored == 0 {
            info!("no stored settings, using defaults");
            self.board.store(SETTINGS_SLOT, self.config.settings.bits());
            self.config.settings
        } else {
            info!("restored settings {=u32:#x}", stored);
            Settings::from_bits(stored)
        };

        for (index, face) in self.faces.iter_mut().enumerate() {
            face.setup(&mut self.settings, index);
        }

        // Whatever armed the wake sources before the reset is done with them
        let _ = self.board.take_wake_flags();
        self.wake.unbind_all(&mut self.board)?;

        self.board.set_tick_frequency(Hertz(1))?;
        self.tick_hz = 1;
        self.board.enable_minute_alarm()?;

        self.power = Power::new();
        self.held = [None; 3];
        self.last_second = self.board.now().second;
        self.subsecond = 0;
        self.reset_countdowns();

        self.active = 0;
        let ((), requests) = self.call(0, |face, ctx| face.activate(ctx));
        self.apply(requests, false)?;
        self.deliver(0, EventKind::Activate)
    }

    /// Make `index` the active face and send it `Activate`
    ///
    /// Out of range indices are ignored.
    pub fn move_to_face(&mut self, index: usize) -> Result<(), Fault> {
        if self.switch_to(index)? {
            self.deliver(self.active, EventKind::Activate)?;
        }
        Ok(())
    }

    pub fn move_to_next_face(&mut self) -> Result<(), Fault> {
        self.move_to_face((self.active + 1) % N)
    }

    /// Wait for and handle one round of interrupts
    pub fn step(&mut self) -> Result<(), Fault> {
        match self.power.mode() {
            // Only reachable where the reset returns, as it does off target
            PowerMode::DeepSleep | PowerMode::Backup => Ok(()),
            PowerMode::LowEnergy => self.low_energy_step(),
            PowerMode::Active | PowerMode::Idle => self.active_step(),
        }
    }

    pub fn run_forever(mut self) -> ! {
        if let Err(fault) = self.boot() {
            fatal(&mut self.board, fault);
        }

        loop {
            if let Err(fault) = self.step() {
                fatal(&mut self.board, fault);
            }
        }
    }

    fn awake(&self) -> bool {
        matches!(self.power.mode(), PowerMode::Active | PowerMode::Idle)
    }

    fn active_step(&mut self) -> Result<(), Fault> {
        if let Some(hz) = self.pending_tick_hz.take() {
            if hz != self.tick_hz {
                debug!("tick frequency {} Hz", hz);
                self.board.set_tick_frequency(Hertz(hz as u32))?;
                self.tick_hz = hz;
            }
        }

        if self.can_sleep {
            self.power.idle(&mut self.board, self.flags);
        }

        let pending = self.flags.take();

        self.on_buttons(&pending)?;

        if pending.minute && self.awake() {
            self.run_background()?;
        }

        if pending.ticks > 0 && self.awake() {
            self.on_ticks(pending.ticks)?;
        }

        Ok(())
    }

    fn low_energy_step(&mut self) -> Result<(), Fault> {
        self.power.idle(&mut self.board, self.flags);

        let pending = self.flags.take();

        if pending.minute {
            self.run_background()?;
            if self.power.mode() == PowerMode::LowEnergy {
                self.deliver(self.active, EventKind::LowEnergyUpdate)?;
            }
        }

        let woken = pending.wake || pending.pressed & Button::Alarm.mask() != 0;
        if woken && self.power.mode() == PowerMode::LowEnergy {
            self.leave_low_energy()?;
        }

        Ok(())
    }

    fn enter_low_energy(&mut self) -> Result<(), Fault> {
        if self.active != 0 {
            self.switch_to(0)?;
        }

        self.power
            .enter_low_energy(&mut self.board, self.wake, self.config.wake_callback)?;
        self.held = [None; 3];
        self.fast_tick_running = false;

        self.deliver(self.active, EventKind::LowEnergyUpdate)
    }

    fn leave_low_energy(&mut self) -> Result<(), Fault> {
        self.power
            .exit_low_energy(&mut self.board, self.wake, Hertz(self.tick_hz as u32))?;

        self.last_second = self.board.now().second;
        self.subsecond = 0;
        self.reset_countdowns();

        // Drop whatever piled up while asleep
        self.flags.take();

        self.deliver(self.active, EventKind::Activate)
    }

    fn on_buttons(&mut self, pending: &Pending) -> Result<(), Fault> {
        // Both edges in one pass: the level says which came last
        let bounced = pending.pressed & pending.released & pending.down;

        for button in Button::ALL {
            let mask = button.mask();
            if bounced & mask != 0 {
                self.on_release(button)?;
            }
            if pending.pressed & mask != 0 && self.awake() {
                self.held[button as usize] = Some(0);
                self.button_event(button, Gesture::Down)?;
            }
        }

        if pending.fast_ticks > 0 {
            for button in Button::ALL {
                let Some(before) = self.held[button as usize] else {
                    continue;
                };
                let after = before.saturating_add(pending.fast_ticks);
                self.held[button as usize] = Some(after);

                if before < LONG_PRESS_TICKS && after >= LONG_PRESS_TICKS && self.awake() {
                    self.button_event(button, Gesture::LongPress)?;
                }
                if before < LONGER_PRESS_TICKS && after >= LONGER_PRESS_TICKS && self.awake() {
                    self.button_event(button, Gesture::LongerPress)?;
                }
            }
        }

        for button in Button::ALL {
            if pending.released & !bounced & button.mask() != 0 {
                self.on_release(button)?;
            }
        }

        if !self.awake() {
            return Ok(());
        }

        let holding = self.held.iter().any(Option::is_some);
        if holding && !self.fast_tick_running {
            self.board.start_fast_tick()?;
            self.fast_tick_running = true;
        } else if !holding && self.fast_tick_running {
            self.board.stop_fast_tick()?;
            self.fast_tick_running = false;
        }

        Ok(())
    }

    fn on_release(&mut self, button: Button) -> Result<(), Fault> {
        // A release without a press started before boot
        let Some(held) = self.held[button as usize].take() else {
            return Ok(());
        };
        if !self.awake() {
            return Ok(());
        }

        let gesture = if held >= LONG_PRESS_TICKS {
            Gesture::LongUp
        } else {
            Gesture::Up
        };
        self.button_event(button, gesture)
    }

    fn button_event(&mut self, button: Button, gesture: Gesture) -> Result<(), Fault> {
        self.reset_countdowns();
        self.deliver(self.active, EventKind::Button(button, gesture))
    }

    fn on_ticks(&mut self, ticks: u8) -> Result<(), Fault> {
        let second = self.board.now().second;
        let elapsed = if second != self.last_second {
            let elapsed = (second + 60 - self.last_second) % 60;
            self.last_second = second;
            self.subsecond = 0;
            elapsed as u32
        } else {
            self.subsecond = self.subsecond.wrapping_add(ticks);
            0
        };

        self.deliver(self.active, EventKind::Tick)?;

        if elapsed > 0 && self.awake() {
            self.count_down(elapsed)?;
        }

        Ok(())
    }

    fn count_down(&mut self, seconds: u32) -> Result<(), Fault> {
        if self.led_left > 0 {
            self.led_left = self.led_left.saturating_sub(seconds.min(u8::MAX as u32) as u8);
            if self.led_left == 0 {
                self.board.set_led(0, 0);
            }
        }

        self.timeout_left = self.timeout_left.saturating_sub(seconds);
        if self.timeout_left == 0 {
            self.time_out()?;
        }

        if let Some(left) = self.low_energy_left {
            let left = left.saturating_sub(seconds);
            self.low_energy_left = Some(left);

            if left == 0 && self.can_sleep && self.awake() {
                self.enter_low_energy()?;
            }
        }

        Ok(())
    }

    fn time_out(&mut self) -> Result<(), Fault> {
        self.timeout_left = self.settings.timeout_seconds();

        let face = self.active;
        if face == 0 && !self.settings.to_always() {
            return Ok(());
        }

        debug!("timeout on face {}", face);
        self.deliver(face, EventKind::Timeout)?;

        if face != 0 && self.active == face && self.awake() {
            self.move_to_face(0)?;
        }

        Ok(())
    }

    fn run_background(&mut self) -> Result<(), Fault> {
        let snapshot = Snapshot {
            settings: &self.settings,
            now: self.board.now(),
            location: Location::from_bits(self.board.load(LOCATION_SLOT)),
            sun: self.sun,
        };
        let due = background::due(&self.faces, self.active, self.power.mode(), &snapshot);

        for index in due {
            debug!("background task for face {}", index);
            self.deliver(index, EventKind::BackgroundTask)?;

            if !self.awake() && self.power.mode() != PowerMode::LowEnergy {
                break;
            }
        }

        Ok(())
    }

    fn reset_countdowns(&mut self) {
        self.timeout_left = self.settings.timeout_seconds();
        self.low_energy_left = self.settings.low_energy_seconds();
    }

    /// Run `f` against face `index` with a fresh context
    fn call<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn Face, &mut FaceContext<'_>) -> R,
    ) -> (R, Requests) {
        let Self {
            board,
            faces,
            settings,
            sun,
            config,
            ..
        } = self;

        let mut ctx = FaceContext::new(settings, board, *sun, index, config.secondary_face);
        let result = f(&mut *faces[index], &mut ctx);
        (result, ctx.requests())
    }

    /// Hand `kind` to face `index`, following any face switches it causes with `Activate`
    fn deliver(&mut self, index: usize, kind: EventKind) -> Result<(), Fault> {
        let mut next = Some((index, kind));

        // A face may switch on activation, but a cycle of them must not spin forever
        for _ in 0..=N {
            let Some((index, kind)) = next.take() else {
                return Ok(());
            };

            let event = Event::new(kind, self.subsecond);
            let (can_sleep, requests) = self.call(index, |face, ctx| face.handle(event, ctx));
            if index == self.active {
                self.can_sleep = can_sleep;
            }

            if self.apply(requests, true)? {
                next = Some((self.active, EventKind::Activate));
            }
        }

        if next.is_some() {
            warn!("face switches did not settle");
        }
        Ok(())
    }

    /// Act on a face's requests. Returns whether the active face changed.
    fn apply(&mut self, requests: Requests, allow_switch: bool) -> Result<bool, Fault> {
        if requests.led {
            self.light_led();
        }

        // A jump in the clock isn't time passing
        if requests.clock_set {
            self.last_second = self.board.now().second;
        }

        if let Some(hz) = requests.tick_hz {
            self.pending_tick_hz = Some(hz);
        }

        if requests.wake && self.power.mode() == PowerMode::LowEnergy {
            self.leave_low_energy()?;
        }

        if let Some(request) = requests.sleep {
            self.sleep(request)?;
            return Ok(false);
        }

        match requests.switch {
            Some(switch) if allow_switch && self.awake() => {
                let target = match switch {
                    Switch::Next => (self.active + 1) % N,
                    // Already there
                    Switch::To(index) if index == self.active => return Ok(false),
                    Switch::To(index) => index,
                };
                self.switch_to(target)
            }
            _ => Ok(false),
        }
    }

    /// Resign the active face and activate `target`. Returns whether anything changed.
    fn switch_to(&mut self, target: usize) -> Result<bool, Fault> {
        if target >= N {
            warn!("no face {}", target);
            return Ok(false);
        }

        info!("face {} -> {}", self.active, target);

        let ((), resigned) = self.call(self.active, |face, ctx| face.resign(ctx));
        self.apply(resigned, false)?;

        self.active = target;
        // Every face starts at 1 Hz unless it asks otherwise while activating
        self.pending_tick_hz = Some(1);
        self.can_sleep = true;
        self.reset_countdowns();

        let ((), activated) = self.call(target, |face, ctx| face.activate(ctx));
        self.apply(activated, false)?;

        Ok(true)
    }

    fn light_led(&mut self) {
        let duration = self.settings.led_duration();
        if duration == 0 {
            return;
        }

        self.board
            .set_led(self.settings.led_red(), self.settings.led_green());
        self.led_left = duration;
    }

    fn sleep(&mut self, request: SleepRequest) -> Result<(), Fault> {
        self.led_left = 0;

        match request {
            SleepRequest::Deep(farewell) => {
                self.power
                    .enter_low_power(&mut self.board, self.wake, &self.settings, farewell)
            }
            SleepRequest::Backup => {
                self.power
                    .enter_lowest_power(&mut self.board, self.wake, &self.settings)
            }
        }
    }
}
