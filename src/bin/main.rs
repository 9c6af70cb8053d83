use anyhow::{anyhow, Result};
use esp_idf_hal::{
    gpio::{AnyInputPin, Input, InterruptType, PinDriver, Pull},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
    prelude::*,
    spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
};
use esp_idf_svc::{
    log::EspLogger,
    sys::{
        esp, esp_light_sleep_start, esp_sleep_enable_gpio_wakeup,
        gpio_int_type_t_GPIO_INTR_LOW_LEVEL, gpio_wakeup_enable,
    },
};
use log::info;
use std::sync::{Arc, Mutex};

use derby_lights::{
    adxl362::{Adxl362, RegisterBus, CMD_READ, CMD_WRITE},
    button::{Button, ButtonActivity},
    car::Car,
    clock::{Ticker, Timeout},
    config::Config,
    light::{Headlights, Taillights},
    logic::{StateMachine, Trigger},
    message::{Dispatcher, Level},
    motion::MotionMonitor,
    power::{Sleeper, WakeGate},
    scheduler::Scheduler,
    thread,
};

const PWM_FREQ_KHZ: u32 = 5;
const SPI_BAUD_MHZ: u32 = 1;

/// ADXL362 over a hardware SPI device.
struct SpiBus<'d> {
    device: SpiDeviceDriver<'d, SpiDriver<'d>>,
}

impl RegisterBus for SpiBus<'_> {
    fn read_register(&mut self, address: u8) -> Result<u8> {
        let mut frame = [CMD_READ, address, 0];
        self.device
            .transfer_in_place(&mut frame)
            .map_err(|e| anyhow!("SPI read error: {:?}", e))?;

        Ok(frame[2])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<()> {
        self.device
            .write(&[CMD_WRITE, address, value])
            .map_err(|e| anyhow!("SPI write error: {:?}", e))
    }
}

/// Light sleep, woken by the motion sensor or the button pulling its line
/// low.
struct LightSleep<'d> {
    wake: PinDriver<'d, AnyInputPin, Input>,
    gate: WakeGate,
}

impl<'d> LightSleep<'d> {
    fn new(
        wake: PinDriver<'d, AnyInputPin, Input>,
        button: i32,
        gate: WakeGate,
    ) -> Result<Self> {
        let mut wake = wake;
        wake.set_interrupt_type(InterruptType::LowLevel)?;
        let isr_gate = gate.clone();
        // SAFETY: the callback only touches an atomic flag.
        unsafe { wake.subscribe(move || isr_gate.on_wake())? };

        for pin in [wake.pin(), button] {
            esp!(unsafe {
                gpio_wakeup_enable(pin, gpio_int_type_t_GPIO_INTR_LOW_LEVEL)
            })?;
        }
        esp!(unsafe { esp_sleep_enable_gpio_wakeup() })?;

        Ok(Self { wake, gate })
    }
}

impl Sleeper for LightSleep<'_> {
    fn sleep(&mut self) -> Result<()> {
        if self.gate.is_armed() {
            self.wake.enable_interrupt()?;
        }

        esp!(unsafe { esp_light_sleep_start() })?;

        Ok(())
    }
}

fn run() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly.
    esp_idf_hal::sys::link_patches();

    EspLogger::initialize_default();

    let config = Config::from_env()?;
    info!("Starting with {:?}", config);

    let peripherals = Peripherals::take()?;
    let Peripherals {
        pins, ledc, spi2, ..
    } = peripherals;

    let dispatcher = Dispatcher::new()?;
    let brakes = Level::new(true);
    let activity = ButtonActivity::default();
    let gate = WakeGate::default();

    let mut button_pin = PinDriver::input(pins.gpio9)?;
    button_pin.set_pull(Pull::Up)?;
    let button_gpio = button_pin.pin();
    let button = Button::new(
        dispatcher.notifier()?,
        &Trigger::ButtonClick,
        &Trigger::ButtonLongPress,
        button_pin,
        activity.clone(),
        &config,
    );

    let spi = SpiDriver::new(
        spi2,
        pins.gpio6,
        pins.gpio7,
        Some(pins.gpio2),
        &SpiDriverConfig::new(),
    )?;
    let device = SpiDeviceDriver::new(
        spi,
        Some(pins.gpio10),
        &SpiConfig::new().baudrate(SPI_BAUD_MHZ.MHz().into()),
    )?;
    let sensor = Arc::new(Mutex::new(Adxl362::new(SpiBus { device })));
    let motion = MotionMonitor::new(
        Arc::clone(&sensor),
        dispatcher.notifier()?,
        &Trigger::Error,
        brakes.clone(),
    );

    let pwm_timer = LedcTimerDriver::new(
        ledc.timer0,
        &TimerConfig::new()
            .frequency(PWM_FREQ_KHZ.kHz().into())
            .resolution(Resolution::Bits8),
    )?;
    let left = LedcDriver::new(ledc.channel0, &pwm_timer, pins.gpio3)?;
    let right = LedcDriver::new(ledc.channel1, &pwm_timer, pins.gpio4)?;
    let headlights = Headlights::new(PinDriver::output(pins.gpio5)?)?;

    let wake = PinDriver::input(AnyInputPin::from(pins.gpio1))?;
    let sleeper = LightSleep::new(wake, button_gpio, gate.clone())?;

    let car = Car::new(
        headlights,
        Taillights::new(left, right),
        sensor,
        sleeper,
        gate,
        activity,
        Timeout::new(config.error_hold()),
    );

    let mut scheduler = Scheduler::new(
        button,
        motion,
        StateMachine::new(car),
        dispatcher,
        brakes,
        Ticker::new(config.sample_period()),
    )?;

    scheduler.run()
}

fn main() {
    thread::main(run)
}
