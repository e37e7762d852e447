//! SnapBridge - Camera Snapshot Forwarder Firmware
//!
//! Runs on a Raspberry Pi Pico W. Receives framed JPEG snapshots from the
//! camera host over UART1, posts each one to the PC server over Wi-Fi and
//! sounds the pump/buzzer alarm when the server asks for it.

#![no_std]
#![no_main]

use core::net::Ipv4Addr;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::gpio::{Level, Output, OutputOpenDrain};
use embassy_rp::peripherals::{PIO0, UART1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::{Delay, Instant, Timer};
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use snapbridge_core::config::{
    BridgeConfig, MAX_IMAGE_SIZE, MAIN_LOOP_INTERVAL_MS, RX_RING_CAPACITY, SERVER_ADDR,
    SERVER_PORT,
};
use snapbridge_core::traits::{Alarm, Clock};
use snapbridge_core::{FrameReceiver, SerialInbox, SnapshotForwarder};
use snapbridge_drivers::alarm::{AlarmSequencer, BUZZER_PWM_FREQ_HZ};
use snapbridge_protocol::Endpoint;

use crate::clock::Uptime;
use crate::serial::UartGate;
use crate::transport::NetTransport;
use crate::wifi::WifiLink;

mod channels;
mod clock;
mod serial;
mod tasks;
mod transport;
mod wifi;

/// Wi-Fi credentials and server overrides, generated by build.rs
mod net_config {
    include!(concat!(env!("OUT_DIR"), "/net_config.rs"));
}

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

const TCP_RX_BUFFER_SIZE: usize = 1024;
const TCP_TX_BUFFER_SIZE: usize = 4096;

/// Mixed with the uptime tick count to seed the TCP/IP stack
const NET_SEED_SALT: u64 = 0x5eed_b41d_9e37_79b9;

// Byte queue shared with the UART task
static INBOX: StaticCell<SerialInbox<RX_RING_CAPACITY>> = StaticCell::new();

// Snapshot storage: one frame being received, one being uploaded
static FRAME_BUF: ConstStaticCell<[u8; MAX_IMAGE_SIZE]> = ConstStaticCell::new([0; MAX_IMAGE_SIZE]);
static UPLOAD_BUF: ConstStaticCell<[u8; MAX_IMAGE_SIZE]> =
    ConstStaticCell::new([0; MAX_IMAGE_SIZE]);

// UART driver buffers
static UART_TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

// Network
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
static TCP_RX_BUF: StaticCell<[u8; TCP_RX_BUFFER_SIZE]> = StaticCell::new();
static TCP_TX_BUF: StaticCell<[u8; TCP_TX_BUFFER_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SnapBridge firmware starting...");

    let p = embassy_rp::init(Default::default());

    let config = BridgeConfig::new().with_server(server_endpoint());
    info!("Configuration: {}", config);

    // Alarm outputs: relay button on GPIO12 (open drain), buzzer on GPIO14
    let relay = OutputOpenDrain::new(p.PIN_12, Level::High);

    let mut pwm_config = PwmConfig::default();
    pwm_config.top = buzzer_pwm_top();
    let pwm = Pwm::new_output_a(p.PWM_SLICE7, p.PIN_14, pwm_config);
    let (buzzer, _) = pwm.split();
    let Some(buzzer) = buzzer else {
        halt("buzzer PWM channel unavailable");
    };

    let mut alarm = AlarmSequencer::new(relay, buzzer);
    alarm.self_test(&mut Delay);
    info!("Alarm initialized");

    // Camera UART: TX=GPIO4, RX=GPIO5
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config.serial.baudrate;

    let tx_buf = UART_TX_BUF.init([0u8; 16]);
    let rx_buf = UART_RX_BUF.init([0u8; 1024]);

    let uart = Uart::new_blocking(p.UART1, p.PIN_4, p.PIN_5, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (_tx, rx) = uart.split();

    let inbox: &'static SerialInbox<RX_RING_CAPACITY> = INBOX.init(SerialInbox::new());
    spawner.spawn(tasks::uart_rx_task(rx, inbox)).unwrap();

    let mut receiver = FrameReceiver::new(
        UartGate::new(config.serial),
        config.serial,
        inbox,
        FRAME_BUF.take(),
    )
    .with_timeout(config.frame_timeout_ms);

    if let Err(e) = receiver.init() {
        error!("Frame receiver init failed: {:?}", e);
        halt("frame receiver");
    }
    info!("UART initialized for camera link");

    // CYW43 radio over PIO SPI
    let fw = include_bytes!(concat!(env!("OUT_DIR"), "/43439A0.bin"));
    let clm = include_bytes!(concat!(env!("OUT_DIR"), "/43439A0_clm.bin"));

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Radio initialized");

    let seed = NET_SEED_SALT ^ Instant::now().as_ticks();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();

    let mut link = WifiLink::new(control, stack);
    if let Err(e) = link.init().await {
        error!("Wi-Fi init failed: {:?}", e);
        halt("wifi");
    }

    let transport = NetTransport::new(
        stack,
        TCP_RX_BUF.init([0u8; TCP_RX_BUFFER_SIZE]),
        TCP_TX_BUF.init([0u8; TCP_TX_BUFFER_SIZE]),
    );
    let mut forwarder = SnapshotForwarder::new(transport, &config, UPLOAD_BUF.take());
    forwarder.init();

    info!("Bridge running, forwarding to {}", config.server);

    let mut timer = Uptime;

    loop {
        alarm.process(timer.now_ms());

        // The relay needs fine-grained ticks; frames wait in the ring
        if !alarm.is_active() && receiver.process_tick(timer.now_ms()) {
            if let Some(frame) = receiver.take_frame() {
                info!("Forwarding {} byte snapshot", frame.len());
                if let Err(e) = forwarder.send_async(frame, &mut alarm, &mut timer).await {
                    warn!("Snapshot dropped: {}", e);
                }
            }
            receiver.reset();
        }

        if !link.is_connected() {
            warn!("Wi-Fi link lost, reconnecting");
            receiver.deinit();
            forwarder.deinit();
            link.deinit().await;

            match link.recover(config.retry).await {
                Ok(attempts) => info!("Wi-Fi restored after {} attempts", attempts),
                Err(e) => {
                    error!("Wi-Fi recovery failed: {}, restarting", e);
                    cortex_m::peripheral::SCB::sys_reset();
                }
            }

            forwarder.init();
            if let Err(e) = receiver.init() {
                error!("Frame receiver re-init failed: {:?}", e);
                halt("frame receiver");
            }
        }

        Timer::after_millis(u64::from(MAIN_LOOP_INTERVAL_MS)).await;
    }
}

/// Server address and port, with build-time overrides applied
fn server_endpoint() -> Endpoint {
    let addr = match net_config::SERVER_IP_OVERRIDE {
        Some([a, b, c, d]) => Ipv4Addr::new(a, b, c, d),
        None => SERVER_ADDR,
    };
    let port = net_config::SERVER_PORT_OVERRIDE.unwrap_or(SERVER_PORT);
    Endpoint::new(addr, port)
}

/// PWM wrap value giving the buzzer frequency at divider 1
fn buzzer_pwm_top() -> u16 {
    let top = clk_sys_freq() / BUZZER_PWM_FREQ_HZ - 1;
    top.min(u32::from(u16::MAX)) as u16
}

/// Park the core after a fatal init error
fn halt(what: &str) -> ! {
    error!("Fatal: {} failed, halting", what);
    loop {
        cortex_m::asm::wfi();
    }
}
