mod common;

use common::{click, events, hold, run_seconds, Call, Log, MockBoard, Probe};
use movement::backup::{BackupStore, SETTINGS_SLOT};
use movement::chime::NoSunTimes;
use movement::face::BEEP_TONE;
use movement::faces::{ClockFace, SetTimeFace};
use movement::irq::InterruptFlags;
use movement::movement::LONG_PRESS_TICKS;
use movement::power::PowerMode;
use movement::wake::{WakeInput, WakeSources};
use movement::{Button, Config, Face, Movement, Settings};

fn quiet_settings() -> Settings {
    let mut settings = Settings::default();
    settings.set_to_interval(0);
    settings.set_le_interval(0);
    settings
}

#[test]
fn first_boot_stores_defaults_and_activates_the_primary_face() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<3>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());

    movement.boot().unwrap();

    assert_eq!(movement.active_face(), 0);
    assert_eq!(movement.power_mode(), PowerMode::Active);
    assert_eq!(movement.board().load(SETTINGS_SLOT), Settings::default().bits());
    assert_eq!(events(&log), ["0 activate", "0 Activate"]);

    let calls = movement.board_mut().forget();
    assert!(calls.contains(&Call::Tick(1)));
    assert!(calls.contains(&Call::EnableMinuteAlarm));
}

#[test]
fn boot_restores_stored_settings() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let mut stored = Settings::default();
    stored.set_clock_mode_24h(true);
    stored.set_time_zone(17);

    let mut board = MockBoard::new();
    board.store(SETTINGS_SLOT, stored.bits());

    let log = Log::default();
    let mut probes = Probe::row::<2>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(board, faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());

    movement.boot().unwrap();

    assert_eq!(*movement.settings(), stored);
}

#[test]
fn cycling_through_every_face_comes_back_to_the_start() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<4>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();
    events(&log);

    for _ in 0..4 {
        movement.move_to_next_face().unwrap();
    }

    assert_eq!(movement.active_face(), 0);
    assert_eq!(
        events(&log)[..4],
        ["0 resign", "1 activate", "1 Activate", "1 resign"]
    );

    movement.move_to_face(9).unwrap();
    assert_eq!(movement.active_face(), 0);
    assert!(events(&log).is_empty());
}

#[test]
fn mode_button_beeps_and_moves_on() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<3>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();
    events(&log);
    movement.board_mut().forget();

    click(&mut movement, &FLAGS, Button::Mode);

    assert_eq!(movement.active_face(), 1);
    assert_eq!(
        events(&log),
        [
            "0 Button(Mode, Down)",
            "0 Button(Mode, Up)",
            "0 resign",
            "1 activate",
            "1 Activate",
        ]
    );
    assert!(movement
        .board_mut()
        .forget()
        .contains(&Call::Tone(Some(BEEP_TONE.0), 50)));
}

#[test]
fn long_press_on_the_primary_face_jumps_to_the_secondary() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<4>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new().secondary_face(2);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    events(&log);
    movement.board_mut().forget();

    hold(&mut movement, &FLAGS, Button::Mode, LONG_PRESS_TICKS);
    assert_eq!(movement.active_face(), 2);

    FLAGS.release(Button::Mode);
    movement.step().unwrap();

    assert_eq!(
        events(&log),
        [
            "0 Button(Mode, Down)",
            "0 Button(Mode, LongPress)",
            "0 resign",
            "2 activate",
            "2 Activate",
            "2 Button(Mode, LongUp)",
        ]
    );

    let calls = movement.board_mut().forget();
    let fast: Vec<_> = calls
        .iter()
        .filter(|call| matches!(call, Call::StartFastTick | Call::StopFastTick))
        .collect();
    assert_eq!(fast, [&Call::StartFastTick, &Call::StopFastTick]);

    // A long press anywhere else goes home
    hold(&mut movement, &FLAGS, Button::Mode, LONG_PRESS_TICKS);
    assert_eq!(movement.active_face(), 0);
}

#[test]
fn release_and_press_in_one_pass_starts_a_new_hold() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<2>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new().default_settings(quiet_settings());
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    events(&log);

    hold(&mut movement, &FLAGS, Button::Light, LONG_PRESS_TICKS);
    events(&log);
    movement.board_mut().forget();

    FLAGS.release(Button::Light);
    FLAGS.press(Button::Light);
    movement.step().unwrap();
    assert_eq!(
        events(&log),
        ["0 Button(Light, LongUp)", "0 Button(Light, Down)"]
    );
    assert!(!movement.board().calls.contains(&Call::StopFastTick));

    for _ in 0..LONG_PRESS_TICKS {
        FLAGS.fast_tick();
    }
    movement.step().unwrap();
    assert_eq!(events(&log), ["0 Button(Light, LongPress)"]);

    FLAGS.release(Button::Light);
    movement.step().unwrap();
    assert_eq!(events(&log), ["0 Button(Light, LongUp)"]);
    assert!(movement.board().calls.contains(&Call::StopFastTick));
}

#[test]
fn timeout_resigns_the_face_before_the_primary_activates() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<4>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new().default_settings(quiet_settings());
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    movement.move_to_face(3).unwrap();
    events(&log);

    run_seconds(&mut movement, &FLAGS, 59);
    assert_eq!(movement.active_face(), 3);
    assert!(events(&log).is_empty());

    run_seconds(&mut movement, &FLAGS, 1);
    assert_eq!(movement.active_face(), 0);
    assert_eq!(
        events(&log),
        ["3 Timeout", "3 resign", "0 activate", "0 Activate"]
    );

    // The primary face only hears about it with to_always
    run_seconds(&mut movement, &FLAGS, 120);
    assert!(events(&log).is_empty());
}

#[test]
fn to_always_tells_the_primary_face_without_switching() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let mut settings = quiet_settings();
    settings.set_to_always(true);

    let log = Log::default();
    let mut probes = Probe::row::<2>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new().default_settings(settings);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    events(&log);

    run_seconds(&mut movement, &FLAGS, 60);
    assert_eq!(movement.active_face(), 0);
    assert_eq!(events(&log), ["0 Timeout"]);

    run_seconds(&mut movement, &FLAGS, 60);
    assert_eq!(events(&log), ["0 Timeout"]);
}

#[test]
fn button_presses_restart_the_timeout() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<2>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new().default_settings(quiet_settings());
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    movement.move_to_face(1).unwrap();

    run_seconds(&mut movement, &FLAGS, 50);
    click(&mut movement, &FLAGS, Button::Alarm);
    run_seconds(&mut movement, &FLAGS, 50);

    assert_eq!(movement.active_face(), 1);
}

#[test]
fn light_button_lights_the_led_for_its_duration() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<2>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();
    movement.board_mut().forget();

    click(&mut movement, &FLAGS, Button::Light);
    let settings = *movement.settings();
    assert!(movement
        .board_mut()
        .forget()
        .contains(&Call::Led(settings.led_red(), settings.led_green())));

    run_seconds(&mut movement, &FLAGS, settings.led_duration() as u32);
    assert!(movement.board_mut().forget().contains(&Call::Led(0, 0)));
}

#[test]
fn background_tasks_in_active_mode_go_to_the_active_face_only() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<3>(&log);
    probes[0].wants_background = true;
    probes[2].wants_background = true;
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();
    events(&log);

    FLAGS.minute();
    movement.step().unwrap();
    assert_eq!(events(&log), ["0 BackgroundTask"]);

    movement.move_to_face(1).unwrap();
    events(&log);
    FLAGS.minute();
    movement.step().unwrap();
    assert!(events(&log).is_empty());
}

#[test]
fn low_energy_mode_after_inactivity_and_back_on_the_alarm_button() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let mut settings = Settings::default();
    settings.set_to_interval(3);
    settings.set_le_interval(1);
    let le_seconds = settings.low_energy_seconds().unwrap();

    let log = Log::default();
    let mut probes = Probe::row::<3>(&log);
    probes[0].wants_background = true;
    probes[2].wants_background = true;
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let config = Config::new()
        .default_settings(settings)
        .wake_callback(|| FLAGS.wake());
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, config);
    movement.boot().unwrap();
    movement.move_to_face(1).unwrap();
    events(&log);
    movement.board_mut().forget();

    run_seconds(&mut movement, &FLAGS, le_seconds - 1);
    assert_eq!(movement.power_mode(), PowerMode::Active);

    // Button presses restart the countdown
    click(&mut movement, &FLAGS, Button::Light);
    run_seconds(&mut movement, &FLAGS, le_seconds - 1);
    assert_eq!(movement.power_mode(), PowerMode::Active);
    events(&log);
    movement.board_mut().forget();

    run_seconds(&mut movement, &FLAGS, 1);
    assert_eq!(movement.power_mode(), PowerMode::LowEnergy);
    assert_eq!(movement.active_face(), 0);
    assert_eq!(
        events(&log),
        ["1 resign", "0 activate", "0 LowEnergyUpdate"]
    );
    assert!(movement.board().wake_armed(WakeInput::AlarmButton));
    assert!(WAKE.is_bound(WakeInput::AlarmButton));
    let calls = movement.board_mut().forget();
    assert!(calls.contains(&Call::DisableTick));

    // Ticks are ignored, minutes run every face's background task then update the display
    FLAGS.tick();
    movement.step().unwrap();
    assert!(events(&log).is_empty());

    FLAGS.minute();
    movement.step().unwrap();
    assert_eq!(
        events(&log),
        ["0 BackgroundTask", "2 BackgroundTask", "0 LowEnergyUpdate"]
    );

    movement.board_mut().wake_fired = WakeInput::AlarmButton.mask();
    WAKE.service(movement.board_mut());
    movement.step().unwrap();

    assert_eq!(movement.power_mode(), PowerMode::Active);
    assert_eq!(events(&log), ["0 Activate"]);
    assert!(!movement.board().wake_armed(WakeInput::AlarmButton));
    assert!(movement.board_mut().forget().contains(&Call::Tick(1)));
}

#[test]
fn tick_frequency_requests_apply_on_the_next_pass() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let mut clock = ClockFace::new();
    let mut set_time = SetTimeFace::new();
    let faces: [&mut dyn Face; 2] = [&mut clock, &mut set_time];
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();

    movement.move_to_face(1).unwrap();
    movement.board_mut().forget();
    movement.step().unwrap();
    assert_eq!(movement.tick_frequency(), 4);
    assert!(movement.board_mut().forget().contains(&Call::Tick(4)));

    movement.move_to_face(0).unwrap();
    movement.step().unwrap();
    assert_eq!(movement.tick_frequency(), 1);
}

#[test]
fn subsecond_counts_ticks_within_a_second() {
    static FLAGS: InterruptFlags = InterruptFlags::new();
    static WAKE: WakeSources = WakeSources::new();

    let log = Log::default();
    let mut probes = Probe::row::<1>(&log);
    let faces = probes.each_mut().map(|face| face as &mut dyn Face);
    let mut movement = Movement::new(MockBoard::new(), faces, &FLAGS, &WAKE, &NoSunTimes, Config::new());
    movement.boot().unwrap();

    for expected in 1..=3 {
        FLAGS.tick();
        movement.step().unwrap();
        assert_eq!(movement.subsecond(), expected);
    }

    run_seconds(&mut movement, &FLAGS, 1);
    assert_eq!(movement.subsecond(), 0);
}
