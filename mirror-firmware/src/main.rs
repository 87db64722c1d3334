//! Mirror - pixel matrix and actuator controller firmware
//!
//! Main firmware binary for RP2040 boards. A host streams framed pixel and
//! servo data over UART0; two WS2812 chains hang off SPI0 and SPI1 and the
//! servo boards share I2C0.
//!
//! Everything runs in one loop: pump the UART into the staging ring, run
//! one controller iteration, sleep for the configured loop delay.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, SPI0, SPI1, UART0};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embassy_time::{Delay, Instant, Timer};
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use mirror_core::config::{ControllerConfig, MAX_ACTUATOR_BANKS};
use mirror_core::Controller;
use mirror_drivers::pixel::{DualBank, Ws2812Spi, SPI_FREQUENCY_HZ};
use mirror_drivers::pwm::ServoBanks;
use mirror_hal::{RingRx, UartConfig};

use crate::serial::{pump, rp_uart_config, TxLink};

mod serial;

/// Staging ring size; larger than the backlog limit of the default rig
const RX_STAGING: usize = 8192;

/// First PCA9685 address; banks follow consecutively
const SERVO_BASE_ADDRESS: u8 = 0x40;

/// Interval between diagnostics reports
const REPORT_INTERVAL_MS: u32 = 5000;

/// controller.toml, validated and postcard-encoded by build.rs
static CONFIG_BLOB: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/controller.bin"));

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

type Pixels = DualBank<Ws2812Spi<Spi<'static, SPI0, Blocking>>, Ws2812Spi<Spi<'static, SPI1, Blocking>>>;
type Servos = ServoBanks<I2c<'static, I2C0, i2c::Blocking>>;
type Rig = Controller<Pixels, Servos>;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

static RX_RING: StaticCell<RingRx<RX_STAGING>> = StaticCell::new();
static CONTROLLER: StaticCell<Rig> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Mirror firmware starting...");

    let p = embassy_rp::init(Default::default());
    let config = load_config();

    // Host link
    let link = UartConfig::default();
    info!("Host link: {} baud, {} us per byte", link.baudrate, link.byte_time_us());
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 1024]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, rp_uart_config(&link));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, mut uart_rx) = uart.split();
    let mut tx = TxLink(tx);

    // Pixel banks: bank 0 on SPI0 (GPIO18/19), bank 1 on SPI1 (GPIO10/11)
    let spi0 = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, led_spi_config());
    let spi1 = Spi::new_blocking_txonly(p.SPI1, p.PIN_10, p.PIN_11, led_spi_config());
    let mut bank0 = Ws2812Spi::new(spi0);
    let mut bank1 = Ws2812Spi::new(spi1);
    bank0.set_brightness(config.matrix.brightness);
    bank1.set_brightness(config.matrix.brightness);
    let pixels = DualBank::new(bank0, bank1);

    // Servo banks on I2C0 (SCL GPIO5, SDA GPIO4)
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let bus = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);
    let addresses: Vec<u8, MAX_ACTUATOR_BANKS> = (0..config.actuators.bank_count() as u8)
        .map(|bank| SERVO_BASE_ADDRESS + bank)
        .collect();
    let mut servos = ServoBanks::new(bus, &addresses);
    if config.capabilities.actuators {
        if let Err(e) = servos.init(&mut Delay) {
            error!("servo bank init failed: {:?}", Debug2Format(&e));
        }
    }

    let controller = match Controller::new(config, pixels, servos) {
        Ok(controller) => CONTROLLER.init(controller),
        Err(e) => {
            error!("controller rejected configuration: {:?}", e);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };
    controller.start();

    let ring = RX_RING.init(RingRx::new());
    let loop_delay = controller.loop_delay_ms() as u64;
    let mut last_report = now_ms();

    info!("Entering control loop");

    loop {
        pump(&mut uart_rx, ring);
        let now = now_ms();
        let report = controller.poll(ring, &mut tx, now);
        if report.flushed.is_some() {
            debug!("iteration: {:?}", report);
        }

        if now.wrapping_sub(last_report) >= REPORT_INTERVAL_MS {
            last_report = now;
            info!("diagnostics: {:?}", controller.diagnostics());
            if ring.dropped() > 0 {
                warn!("staging ring dropped {} bytes", ring.dropped());
            }
        }

        Timer::after_millis(loop_delay).await;
    }
}

fn led_spi_config() -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = SPI_FREQUENCY_HZ;
    config
}

/// Milliseconds since boot, wrapping at `u32::MAX`
fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Decode the embedded configuration
///
/// Falls back to the built-in defaults if the blob does not decode or
/// validate, which only happens when build.rs and the firmware disagree on
/// the config layout.
fn load_config() -> ControllerConfig {
    match postcard::from_bytes::<ControllerConfig>(CONFIG_BLOB) {
        Ok(config) => match config.validate() {
            Ok(()) => {
                info!(
                    "Loaded configuration: {}x{} pixels, {} channels",
                    config.matrix.width, config.matrix.height, config.actuators.channel_count
                );
                config
            }
            Err(e) => {
                error!("Embedded configuration invalid: {:?}", e);
                ControllerConfig::default()
            }
        },
        Err(_) => {
            error!("Failed to decode embedded configuration, using defaults");
            ControllerConfig::default()
        }
    }
}
