#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler

use movement::irq::InterruptFlags;
use movement::wake::WakeSources;

/// Set by the interrupt handlers, drained by the main loop
static FLAGS: InterruptFlags = InterruptFlags::new();
/// Wake source callbacks, dispatched from the RTC interrupt
static WAKE: WakeSources = WakeSources::new();

#[rtic::app(
    device = stm32l0xx_hal::pac,
    dispatchers = []
)]
mod app {
    use super::{FLAGS, WAKE};
    use movement::chime::NoSunTimes;
    use movement::faces::{ClockFace, SetTimeFace};
    use movement::stm32::{self, Stm32Board};
    use movement::{Config, Face, Movement};

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        board: Option<Stm32Board>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("init");

        let board = Stm32Board::configure(cx.device, cx.core.SCB);

        (
            Shared {},
            Local {
                board: Some(board),
            },
        )
    }

    #[idle(local = [
        board,
        clock: ClockFace = ClockFace::new(),
        set_time: SetTimeFace = SetTimeFace::new(),
    ])]
    fn idle(cx: idle::Context) -> ! {
        defmt::info!("idle");

        let Some(board) = cx.local.board.take() else {
            defmt::error!("board already taken");
            loop {
                cortex_m::asm::wfi();
            }
        };

        let faces: [&mut dyn Face; 2] = [cx.local.clock, cx.local.set_time];
        let config = Config::new()
            .secondary_face(1)
            .wake_callback(|| FLAGS.wake());

        Movement::new(board, faces, &FLAGS, &WAKE, &NoSunTimes, config).run_forever()
    }

    #[task(binds = RTC)]
    fn rtc(_: rtc::Context) {
        stm32::on_rtc_interrupt(&FLAGS, &WAKE);
    }

    // Light button
    #[task(binds = EXTI2_3)]
    fn exti2_3(_: exti2_3::Context) {
        stm32::on_button_interrupt(&FLAGS);
    }

    // Mode and alarm buttons
    #[task(binds = EXTI4_15)]
    fn exti4_15(_: exti4_15::Context) {
        stm32::on_button_interrupt(&FLAGS);
    }
}
