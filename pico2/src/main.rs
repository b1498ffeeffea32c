//! ECU dashboard firmware for Raspberry Pi Pico 2 (RP2350).
//!
//! Reads engine telemetry from an SLCAN adapter on UART0, falls back to
//! simulated telemetry when the bus is absent or quiet, and shows it on the
//! Pimoroni PIM715 Display Pack 2.8".
//!
//! # Button Controls
//!
//! - **A**: Toggle metric / imperial units
//! - **B**: Switch between simulation and the live bus
//! - **X**: Cycle bus speed (125k → 250k → 500k → 1M)
//! - **Y**: Cycle pages (Gauges → Diagnostics → Logs)
//!
//! # LEDs
//!
//! - Blue: heartbeat
//! - Green: live bus
//! - Red: a channel is in its critical band, or the bus stalled

#![no_std]
#![no_main]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod display;
mod flash;
mod log_buffer;

use defmt::info;
use ecu_dash_common::{ArbiterState, Dashboard};
use ecu_dash_pico2::button::ButtonState;
use ecu_dash_pico2::pages::Page;
use ecu_dash_pico2::screens::{DiagnosticsView, draw_diagnostics_page, draw_gauges_page, draw_logs_page};
use ecu_dash_pico2::serial_bus::SlcanBus;
use ecu_dash_pico2::storage::{FlashStore, Mount};
use ecu_dash_pico2::thresholds::any_critical;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::spi::Spi;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart, Config as UartConfig};
use embassy_time::{Duration, Instant, Ticker, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::display::SPI_BUFFER_LEN;
use crate::flash::{ConfigRegion, FLASH_SIZE};
use crate::log_buffer::LOG_BUFFER;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// Control loop period. Frames are drained every iteration.
const LOOP_PERIOD_MS: u64 = 10;

/// UART rate to the SLCAN adapter.
const SLCAN_BAUD: u32 = 921_600;

/// UART ring buffers; the receive side holds about 20 full frame lines.
const UART_RX_BUF: usize = 512;
const UART_TX_BUF: usize = 64;

// Program metadata for `picotool info`
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"ecu-dash"),
    embassy_rp::binary_info::rp_program_description!(c"ECU telemetry dashboard (SLCAN bus, PIM715 display)"),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

/// Milliseconds since boot; the clock for the bus driver and control loop.
fn now_ms() -> u64 { Instant::now().as_millis() }

#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_low(); // active-low
        Timer::after_millis(50).await;
        led.set_high();
        Timer::after_millis(950).await;
    }
}

/// Log the outcome of a source change.
fn log_state_change(
    from: ArbiterState,
    to: ArbiterState,
) {
    match to {
        ArbiterState::LiveBus if from == ArbiterState::LiveBusStalled => log_info!("bus recovered"),
        ArbiterState::LiveBus => log_info!("live bus"),
        ArbiterState::LiveBusStalled => log_warn!("bus stalled, showing last values"),
        ArbiterState::Simulation => log_info!("simulation"),
        ArbiterState::Uninitialized => {}
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ECU dashboard starting...");

    let p = embassy_rp::init(Default::default());

    // RGB LED (active-low: Low = ON)
    // PIM715: Red=26, Green=27, Blue=28
    let mut led_r = Output::new(p.PIN_26, Level::High);
    let mut led_g = Output::new(p.PIN_27, Level::High);
    let led_b = Output::new(p.PIN_28, Level::High);
    spawner.spawn(heartbeat_task(led_b)).unwrap();

    // Backlight stays dark until the panel has been cleared.
    let cs = Output::new(p.PIN_17, Level::High);
    let dc = Output::new(p.PIN_16, Level::Low);
    let mut backlight = Output::new(p.PIN_20, Level::Low);
    let spi = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, display::spi_config());
    static SPI_BUFFER: StaticCell<[u8; SPI_BUFFER_LEN]> = StaticCell::new();
    let mut display = display::bring_up(spi, cs, dc, &mut backlight, SPI_BUFFER.init([0; SPI_BUFFER_LEN]));
    log_info!("display initialized");

    // SLCAN adapter on UART0: TX=GPIO0, RX=GPIO1
    static UART_TX: StaticCell<[u8; UART_TX_BUF]> = StaticCell::new();
    static UART_RX: StaticCell<[u8; UART_RX_BUF]> = StaticCell::new();
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = SLCAN_BAUD;
    let uart = BufferedUart::new(
        p.UART0,
        p.PIN_0,
        p.PIN_1,
        Irqs,
        &mut UART_TX.init([0; UART_TX_BUF])[..],
        &mut UART_RX.init([0; UART_RX_BUF])[..],
        uart_config,
    );
    let bus = SlcanBus::new(uart, now_ms);

    // Configuration store on the last two flash sectors
    let flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let (store, mount) = FlashStore::mount(ConfigRegion::new(flash)).unwrap();
    match mount {
        Mount::Restored { slot, sequence } => log_info!("config image {} from slot {}", sequence, slot),
        Mount::Blank => log_warn!("no config image, using defaults"),
    }

    let mut dash = Dashboard::new(bus, store);
    let mut state = dash.start(now_ms());
    log_state_change(ArbiterState::Uninitialized, state);
    if state == ArbiterState::Simulation && !dash.config().simulation_mode {
        log_warn!("bus init failed at {}", dash.config().can_speed.name());
    }

    // Buttons (active-low with internal pull-up)
    // PIM715: A=12, B=13, X=14, Y=15
    let btn_a = Input::new(p.PIN_12, Pull::Up);
    let btn_b = Input::new(p.PIN_13, Pull::Up);
    let btn_x = Input::new(p.PIN_14, Pull::Up);
    let btn_y = Input::new(p.PIN_15, Pull::Up);
    let mut btn_a_state = ButtonState::new();
    let mut btn_b_state = ButtonState::new();
    let mut btn_x_state = ButtonState::new();
    let mut btn_y_state = ButtonState::new();

    let mut page = Page::default();
    let mut page_changed = true;
    let mut ticker = Ticker::every(Duration::from_millis(LOOP_PERIOD_MS));

    info!("Starting main loop...");

    loop {
        let now = now_ms();

        let next = dash.tick(now);
        if next != state {
            log_state_change(state, next);
            state = next;
            page_changed = true;
        }

        if btn_a_state.just_pressed(btn_a.is_low(), now) {
            let units = dash.config().unit_system.toggle();
            match dash.set_unit_system(units) {
                Ok(()) => log_info!("units: {}", units.name()),
                Err(err) => log_warn!("units not saved: {}", err),
            }
        }

        if btn_b_state.just_pressed(btn_b.is_low(), now) {
            if dash.state() == ArbiterState::Simulation {
                if let Err(err) = dash.select_live_bus(now) {
                    log_error!("live bus: {}", err);
                }
            } else if let Err(err) = dash.select_simulation() {
                log_warn!("simulation not saved: {}", err);
            }
        }

        if btn_x_state.just_pressed(btn_x.is_low(), now) {
            let speed = dash.config().can_speed.next();
            match dash.set_can_speed(speed, now) {
                Ok(()) => log_info!("bus speed {}", speed.name()),
                Err(err) => log_error!("bus speed {}: {}", speed.name(), err),
            }
        }

        if btn_y_state.just_pressed(btn_y.is_low(), now) {
            page = page.toggle();
            page_changed = true;
        }

        // Status LEDs (active-low)
        let live = state == ArbiterState::LiveBus;
        let alarm = state == ArbiterState::LiveBusStalled || any_critical(dash.telemetry());
        led_g.set_level(if live { Level::Low } else { Level::High });
        led_r.set_level(if alarm { Level::Low } else { Level::High });

        if dash.needs_refresh(now) || page_changed {
            page_changed = false;
            match page {
                Page::Gauges => draw_gauges_page(&mut display, dash.telemetry(), dash.units(), state),
                Page::Diagnostics => {
                    let view = DiagnosticsView {
                        state,
                        config: dash.config(),
                        stats: dash.stats(),
                        telemetry: dash.telemetry(),
                        now_ms: now,
                    };
                    draw_diagnostics_page(&mut display, &view);
                }
                Page::Logs => {
                    if let Ok(buffer) = LOG_BUFFER.try_lock() {
                        draw_logs_page(&mut display, &buffer, state);
                    }
                }
            }
        }

        ticker.next().await;
    }
}

