//! Scheduler → button / motion monitor → state machine → actuator.
//!
//! Inputs are driven one sample per cycle through mock pins and a scripted
//! sensor; the actuator records every call.

use crate::mock_hw::{ActuatorCall, MockActuator, MockButtonPin, MockSensor};

use derby_lights::{
    button::{Button, ButtonActivity},
    clock::Ticker,
    config::Config,
    logic::{HeadlightMode, StateId, StateMachine, Trigger},
    message::{Dispatcher, Level},
    motion::{MotionMonitor, Status},
    scheduler::Scheduler,
};
use std::{
    cell::Cell,
    rc::Rc,
    sync::{Arc, Mutex},
};

type Rig = Scheduler<
    Button<MockButtonPin, Trigger>,
    MotionMonitor<Arc<Mutex<MockSensor>>, Trigger>,
    MockActuator,
>;

struct Bench {
    scheduler: Rig,
    pressed: Rc<Cell<bool>>,
    sensor: Arc<Mutex<MockSensor>>,
}

impl Bench {
    fn new() -> Self {
        let config = Config::default();
        let dispatcher = Dispatcher::new().unwrap();
        let brakes = Level::default();
        let pressed = Rc::new(Cell::new(false));
        let sensor = Arc::new(Mutex::new(MockSensor::with_status(Status::AWAKE)));

        let button = Button::new(
            dispatcher.notifier().unwrap(),
            &Trigger::ButtonClick,
            &Trigger::ButtonLongPress,
            MockButtonPin {
                pressed: Rc::clone(&pressed),
            },
            ButtonActivity::default(),
            &config,
        );
        let motion = MotionMonitor::new(
            Arc::clone(&sensor),
            dispatcher.notifier().unwrap(),
            &Trigger::Error,
            brakes.clone(),
        );
        let scheduler = Scheduler::new(
            button,
            motion,
            StateMachine::new(MockActuator::default()),
            dispatcher,
            brakes,
            Ticker::new(config.sample_period()),
        )
        .unwrap();

        Self {
            scheduler,
            pressed,
            sensor,
        }
    }

    fn hold(&mut self, pressed: bool, cycles: usize) {
        self.pressed.set(pressed);
        for _ in 0..cycles {
            self.scheduler.cycle();
        }
    }

    fn click(&mut self) {
        self.hold(true, 20);
        self.hold(false, 16);
    }

    fn long_press(&mut self) {
        self.hold(true, 1100);
        self.hold(false, 16);
    }

    fn set_status(&self, status: Option<u8>) {
        self.sensor.lock().unwrap().status = status;
    }

    fn calls(&mut self) -> Vec<ActuatorCall> {
        self.scheduler.machine_mut().actuator_mut().take()
    }

    fn is(&self, id: StateId) -> bool {
        self.scheduler.machine().is_state_active(id)
    }
}

#[test]
fn idle_requests_sleep_every_cycle() {
    let mut bench = Bench::new();
    assert!(bench.is(StateId::Idle));

    bench.hold(false, 5);
    assert_eq!(bench.scheduler.machine().actuator().sleep_requests(), 5);
    assert!(bench.calls().is_empty());
    assert_eq!(bench.scheduler.cycles(), 5);
}

#[test]
fn click_starts_the_car() {
    let mut bench = Bench::new();
    bench.click();

    assert_eq!(
        bench.calls(),
        vec![
            ActuatorCall::StartCar,
            ActuatorCall::HeadlightsOn,
            ActuatorCall::TaillightsDim,
        ]
    );
    assert!(bench.is(StateId::HeadlightsOn));
    assert!(bench.is(StateId::BrakesOff));
}

#[test]
fn bouncy_press_is_a_single_click() {
    let mut bench = Bench::new();
    for _ in 0..4 {
        bench.hold(true, 2);
        bench.hold(false, 1);
    }
    bench.click();

    assert_eq!(bench.calls()[0], ActuatorCall::StartCar);
    assert!(bench.is(StateId::Running));
    assert!(bench.is(StateId::HeadlightsOn));
}

#[test]
fn brake_lights_follow_motion() {
    let mut bench = Bench::new();
    bench.click();
    bench.calls();

    bench.set_status(Some(Status::INACT));
    bench.hold(false, 4);
    assert_eq!(bench.calls(), vec![ActuatorCall::TaillightsBright]);
    assert!(bench.is(StateId::BrakesOn));

    bench.set_status(Some(Status::AWAKE | Status::ACT));
    bench.hold(false, 4);
    assert_eq!(bench.calls(), vec![ActuatorCall::TaillightsDim]);
    assert!(bench.is(StateId::BrakesOff));
}

#[test]
fn long_press_stops_and_history_survives() {
    let mut bench = Bench::new();
    bench.click();
    bench.click();
    assert!(bench.is(StateId::HeadlightsOff));
    bench.calls();

    bench.long_press();
    assert_eq!(bench.calls(), vec![ActuatorCall::StopCar]);
    assert!(bench.is(StateId::Idle));
    assert_eq!(bench.scheduler.machine().history(), Some(HeadlightMode::Off));

    bench.click();
    assert_eq!(
        bench.calls(),
        vec![
            ActuatorCall::StartCar,
            ActuatorCall::HeadlightsOff,
            ActuatorCall::TaillightsDim,
        ]
    );
}

#[test]
fn long_press_in_idle_does_nothing() {
    let mut bench = Bench::new();
    bench.long_press();

    assert!(bench.calls().is_empty());
    assert!(bench.is(StateId::Idle));
}

#[test]
fn sensor_fault_recovers_through_error() {
    let mut bench = Bench::new();
    bench.click();
    bench.calls();

    bench.set_status(Some(Status::ERR_USER_REGS));
    bench.hold(false, 1);
    assert_eq!(
        bench.calls(),
        vec![ActuatorCall::StopCar, ActuatorCall::HandleError]
    );
    assert!(bench.is(StateId::Error));

    // Back to Idle with no further input, and the fault is ignored there.
    bench.hold(false, 3);
    assert!(bench.is(StateId::Idle));
    assert!(bench.calls().is_empty());

    bench.set_status(Some(Status::AWAKE));
    bench.click();
    assert!(bench.is(StateId::Running));
}

#[test]
fn unreadable_sensor_counts_as_fault() {
    let mut bench = Bench::new();
    bench.click();
    bench.calls();

    bench.set_status(None);
    bench.hold(false, 1);
    assert_eq!(
        bench.calls(),
        vec![ActuatorCall::StopCar, ActuatorCall::HandleError]
    );
}

#[test]
fn single_shot_events_never_outlive_a_cycle() {
    let mut bench = Bench::new();
    bench.click();
    bench.set_status(Some(Status::ERR_USER_REGS));
    bench.hold(false, 1);

    let events = bench.scheduler.machine().events();
    assert!(!events.click && !events.long_press && !events.error);
}
