//! Full stack against the real `Car` actuator and mock pins.

use crate::mock_hw::{MockButtonPin, MockOutputPin, MockPwm, MockSensor, MockSleeper};

use derby_lights::{
    button::{Button, ButtonActivity},
    car::Car,
    clock::{Ticker, Timeout},
    config::Config,
    light::{Brightness, Headlights, Taillights},
    logic::{StateId, StateMachine, Trigger},
    message::{Dispatcher, Level},
    motion::{MotionMonitor, Status},
    power::WakeGate,
    scheduler::Scheduler,
};
use std::{
    cell::Cell,
    rc::Rc,
    sync::{Arc, Mutex},
    time::Duration,
};

type TestCar = Car<MockOutputPin, MockPwm, MockPwm, Arc<Mutex<MockSensor>>, MockSleeper>;

type Rig = Scheduler<
    Button<MockButtonPin, Trigger>,
    MotionMonitor<Arc<Mutex<MockSensor>>, Trigger>,
    TestCar,
>;

fn rig() -> (Rig, Rc<Cell<bool>>, Arc<Mutex<MockSensor>>) {
    let config = Config::default();
    let dispatcher = Dispatcher::new().unwrap();
    let brakes = Level::new(true);
    let activity = ButtonActivity::default();
    let pressed = Rc::new(Cell::new(false));
    let sensor = Arc::new(Mutex::new(MockSensor::with_status(Status::AWAKE)));

    let button = Button::new(
        dispatcher.notifier().unwrap(),
        &Trigger::ButtonClick,
        &Trigger::ButtonLongPress,
        MockButtonPin {
            pressed: Rc::clone(&pressed),
        },
        activity.clone(),
        &config,
    );
    let motion = MotionMonitor::new(
        Arc::clone(&sensor),
        dispatcher.notifier().unwrap(),
        &Trigger::Error,
        brakes.clone(),
    );
    let car = Car::new(
        Headlights::new(MockOutputPin::default()).unwrap(),
        Taillights::new(MockPwm::default(), MockPwm::default()),
        Arc::clone(&sensor),
        MockSleeper::default(),
        WakeGate::default(),
        activity,
        Timeout::new(Duration::ZERO),
    );
    let scheduler = Scheduler::new(
        button,
        motion,
        StateMachine::new(car),
        dispatcher,
        brakes,
        Ticker::new(config.sample_period()),
    )
    .unwrap();

    (scheduler, pressed, sensor)
}

fn hold(scheduler: &mut Rig, pressed: &Cell<bool>, level: bool, cycles: usize) {
    pressed.set(level);
    for _ in 0..cycles {
        scheduler.cycle();
    }
}

fn car(scheduler: &Rig) -> &TestCar {
    scheduler.machine().actuator()
}

#[test]
fn click_lights_the_car_and_powers_the_sensor() {
    let (mut scheduler, pressed, sensor) = rig();
    assert!(!car(&scheduler).headlights().is_on());

    hold(&mut scheduler, &pressed, true, 20);
    hold(&mut scheduler, &pressed, false, 16);

    assert!(car(&scheduler).headlights().is_on());
    assert_eq!(car(&scheduler).taillights().brightness(), Brightness::Dim);
    assert!(sensor.lock().unwrap().powered());
    assert_eq!(
        sensor.lock().unwrap().calls,
        vec!["configure", "enable"]
    );
}

#[test]
fn settling_car_shows_brake_lights() {
    let (mut scheduler, pressed, sensor) = rig();
    hold(&mut scheduler, &pressed, true, 20);
    hold(&mut scheduler, &pressed, false, 16);

    sensor.lock().unwrap().status = Some(Status::INACT);
    hold(&mut scheduler, &pressed, false, 2);
    assert_eq!(car(&scheduler).taillights().brightness(), Brightness::Bright);
    assert!(scheduler.machine().is_state_active(StateId::BrakesOn));
}

#[test]
fn long_press_turns_everything_off() {
    let (mut scheduler, pressed, sensor) = rig();
    hold(&mut scheduler, &pressed, true, 20);
    hold(&mut scheduler, &pressed, false, 16);

    hold(&mut scheduler, &pressed, true, 1100);
    hold(&mut scheduler, &pressed, false, 16);

    assert!(scheduler.machine().is_state_active(StateId::Idle));
    assert!(!car(&scheduler).headlights().is_on());
    assert_eq!(car(&scheduler).taillights().brightness(), Brightness::Off);
    assert!(!sensor.lock().unwrap().powered());
}

#[test]
fn never_sleeps_in_the_middle_of_a_press() {
    let (mut scheduler, pressed, _) = rig();
    hold(&mut scheduler, &pressed, false, 3);
    let naps = car(&scheduler).sleeper().naps;
    assert_eq!(naps, 3);

    hold(&mut scheduler, &pressed, true, 20);
    assert_eq!(car(&scheduler).sleeper().naps, naps);

    // Only the last release sample leaves a clean history.
    hold(&mut scheduler, &pressed, false, 16);
    assert_eq!(car(&scheduler).sleeper().naps, naps + 1);
}

#[test]
fn fault_shows_the_attention_pattern() {
    let (mut scheduler, pressed, sensor) = rig();
    hold(&mut scheduler, &pressed, true, 20);
    hold(&mut scheduler, &pressed, false, 16);

    sensor.lock().unwrap().status = Some(Status::ERR_USER_REGS);
    hold(&mut scheduler, &pressed, false, 1);

    assert!(scheduler.machine().is_state_active(StateId::Error));
    assert!(car(&scheduler).headlights().is_on());
    assert_eq!(car(&scheduler).taillights().brightness(), Brightness::Full);
    assert_eq!(
        sensor.lock().unwrap().calls,
        vec!["configure", "enable", "disable", "configure"]
    );

    hold(&mut scheduler, &pressed, false, 1);
    assert!(scheduler.machine().is_state_active(StateId::Idle));
}
