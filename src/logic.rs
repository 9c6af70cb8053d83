use anyhow::Result;
use log::{error, info};
use std::{collections::HashSet, fmt};

use crate::{
    infra::{trace_func, Actuator},
    trigger_enum,
};

trigger_enum! {
    #[derive(Debug, Eq, Hash, PartialEq)]
    pub enum Trigger {
        Error = 1 << 0,
        ButtonClick = 1 << 1,
        ButtonLongPress = 1 << 2,
    }
}

/// Headlight region of `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadlightMode {
    On,
    Off,
}

impl HeadlightMode {
    /// Mode a fresh boot enters with no history.
    pub const DEFAULT: Self = Self::On;

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    fn entry(self) -> Effect {
        match self {
            Self::On => Effect::HeadlightsOn,
            Self::Off => Effect::HeadlightsOff,
        }
    }
}

/// Tail light region of `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaillightMode {
    BrakesOn,
    BrakesOff,
}

impl TaillightMode {
    fn entry(self) -> Effect {
        match self {
            Self::BrakesOn => Effect::TaillightsBright,
            Self::BrakesOff => Effect::TaillightsDim,
        }
    }
}

/// Top-level state. `Running` carries both of its orthogonal regions, so a
/// region can only be set while the car runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running(HeadlightMode, TaillightMode),
    Error,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Running(headlights, taillights) => {
                write!(f, "Running(Headlights{:?}, {:?})", headlights, taillights)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

/// Every state that can be queried with `StateMachine::is_state_active`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateId {
    Idle,
    Running,
    HeadlightsOn,
    HeadlightsOff,
    BrakesOn,
    BrakesOff,
    Error,
}

/// Inputs visible to one step.
///
/// `error`, `click` and `long_press` are single-shot and cleared after every
/// step. `brakes_on` is a level and keeps its value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Events {
    pub error: bool,
    pub click: bool,
    pub long_press: bool,
    pub brakes_on: bool,
}

impl Events {
    pub fn clear(&mut self) {
        self.error = false;
        self.click = false;
        self.long_press = false;
    }
}

/// An actuator call requested by a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    StartCar,
    StopCar,
    HeadlightsOn,
    HeadlightsOff,
    TaillightsBright,
    TaillightsDim,
    WaitForInterrupt,
    HandleError,
}

impl Effect {
    /// Performs the call on `actuator`.
    ///
    /// # Errors
    /// Returns whatever the actuator returns.
    pub fn apply<A: Actuator>(self, actuator: &mut A) -> Result<()> {
        match self {
            Effect::StartCar => actuator.start_car(),
            Effect::StopCar => actuator.stop_car(),
            Effect::HeadlightsOn => actuator.headlights_on(),
            Effect::HeadlightsOff => actuator.headlights_off(),
            Effect::TaillightsBright => actuator.taillights_bright(),
            Effect::TaillightsDim => actuator.taillights_dim(),
            Effect::WaitForInterrupt => actuator.wait_for_interrupt(),
            Effect::HandleError => actuator.handle_error(),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Effect::StartCar => "start_car",
            Effect::StopCar => "stop_car",
            Effect::HeadlightsOn => "headlights_on",
            Effect::HeadlightsOff => "headlights_off",
            Effect::TaillightsBright => "taillights_bright",
            Effect::TaillightsDim => "taillights_dim",
            Effect::WaitForInterrupt => "wait_for_interrupt",
            Effect::HandleError => "handle_error",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one pure transition: the new configuration and history, and
/// the actuator calls to make, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub state: Option<State>,
    pub history: Option<HeadlightMode>,
    pub effects: Vec<Effect>,
}

impl Step {
    fn start(state: Option<State>, history: Option<HeadlightMode>) -> Self {
        Self {
            state,
            history,
            effects: Vec::new(),
        }
    }

    fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Enters `Running`: start the car, restore the headlights from history,
    /// tail lights always start with the brakes off.
    fn enter_running(&mut self) {
        self.emit(Effect::StartCar);

        let headlights = self.history.unwrap_or(HeadlightMode::DEFAULT);
        self.emit(headlights.entry());

        let taillights = TaillightMode::BrakesOff;
        self.emit(taillights.entry());

        self.state = Some(State::Running(headlights, taillights));
    }

    /// Leaves `Running`: headlights first (recording history), then tail
    /// lights, then the car itself.
    fn exit_running(&mut self, headlights: HeadlightMode) {
        self.history = Some(headlights);
        self.emit(Effect::StopCar);
        self.state = None;
    }

    fn react_idle(&mut self, events: &Events) {
        if events.click {
            self.enter_running();
        } else {
            self.emit(Effect::WaitForInterrupt);
        }
    }

    fn react_running(
        &mut self,
        headlights: HeadlightMode,
        taillights: TaillightMode,
        events: &Events,
    ) {
        if events.long_press {
            self.exit_running(headlights);
            self.state = Some(State::Idle);
            return;
        }

        if events.error {
            self.exit_running(headlights);
            self.state = Some(State::Error);
            self.emit(Effect::HandleError);
            return;
        }

        self.emit(Effect::WaitForInterrupt);

        // Region 0.
        let headlights = if events.click {
            self.history = Some(headlights);
            let next = headlights.toggled();
            self.emit(next.entry());
            next
        } else {
            headlights
        };

        // Region 1, level triggered.
        let next = match (taillights, events.brakes_on) {
            (TaillightMode::BrakesOff, true) => TaillightMode::BrakesOn,
            (TaillightMode::BrakesOn, false) => TaillightMode::BrakesOff,
            (unchanged, _) => unchanged,
        };
        if next != taillights {
            self.emit(next.entry());
        }

        self.state = Some(State::Running(headlights, next));
    }
}

/// One run-to-completion step.
///
/// Region 0 is resolved first. When it leaves `Running` the tail light region
/// is exited as part of that exit, and when it enters `Running` the freshly
/// entered tail light region waits for the next step before reacting.
///
/// # Arguments
/// * `state` - The active configuration, `None` before `enter`.
/// * `history` - The last headlight mode recorded on exit, if any.
/// * `events` - Inputs visible to this step.
///
/// # Returns
/// The next configuration and history, and the effects to dispatch.
#[must_use]
pub fn step(
    state: Option<State>,
    history: Option<HeadlightMode>,
    events: &Events,
) -> Step {
    let mut next = Step::start(state, history);

    match state {
        None => {}
        Some(State::Idle) => next.react_idle(events),
        Some(State::Running(headlights, taillights)) => {
            next.react_running(headlights, taillights, events);
        }
        Some(State::Error) => next.state = Some(State::Idle),
    }

    next
}

/// Default entry: an unset machine starts in `Idle`.
#[must_use]
pub fn enter(state: Option<State>, history: Option<HeadlightMode>) -> Step {
    let mut next = Step::start(state, history);
    if state.is_none() {
        next.state = Some(State::Idle);
    }

    next
}

/// Exits whatever is active and leaves the machine unset.
#[must_use]
pub fn exit(state: Option<State>, history: Option<HeadlightMode>) -> Step {
    let mut next = Step::start(state, history);
    match state {
        Some(State::Running(headlights, _)) => next.exit_running(headlights),
        _ => next.state = None,
    }

    next
}

/// The lighting state machine bound to an actuator.
///
/// # Type Parameters
/// * `A` - The actuator effects are dispatched to.
pub struct StateMachine<A: Actuator> {
    actuator: A,
    state: Option<State>,
    history: Option<HeadlightMode>,
    events: Events,
}

impl<A: Actuator> StateMachine<A> {
    /// Creates a new `StateMachine` with every slot unset.
    #[must_use]
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            state: None,
            history: None,
            events: Events::default(),
        }
    }

    /// Commits `next` and dispatches its effects.
    ///
    /// Every effect is attempted; the first failure is returned once all of
    /// them have run.
    fn commit(&mut self, next: Step) -> Result<()> {
        if next.state != self.state {
            info!("{:?} -> {:?}", self.state, next.state);
        }
        self.state = next.state;
        self.history = next.history;

        let mut result = Ok(());
        for effect in next.effects {
            if let Err(e) = effect.apply(&mut self.actuator) {
                error!("{} failed: {:#}", effect, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Enters the default state.
    ///
    /// # Errors
    /// Returns the first actuator error.
    pub fn enter(&mut self) -> Result<()> {
        trace_func!();

        self.commit(enter(self.state, self.history))
    }

    /// Exits the active configuration.
    ///
    /// # Errors
    /// Returns the first actuator error.
    pub fn exit(&mut self) -> Result<()> {
        trace_func!();

        self.commit(exit(self.state, self.history))
    }

    /// Runs one step, then clears the single-shot events whatever happened.
    ///
    /// # Errors
    /// Returns the first actuator error. The new state is committed anyway.
    pub fn run_cycle(&mut self) -> Result<()> {
        let next = step(self.state, self.history, &self.events);
        self.events.clear();

        self.commit(next)
    }

    /// Raises the events matching the collected triggers.
    ///
    /// # Arguments
    /// * `triggers` - A set of triggers to handle.
    pub fn handle_triggers(&mut self, triggers: &HashSet<&'static Trigger>) {
        for trigger in triggers {
            match trigger {
                Trigger::Error => self.raise_error(),
                Trigger::ButtonClick => self.raise_click(),
                Trigger::ButtonLongPress => self.raise_long_press(),
            }
        }
    }

    pub fn raise_click(&mut self) {
        self.events.click = true;
    }

    pub fn raise_long_press(&mut self) {
        self.events.long_press = true;
    }

    pub fn raise_error(&mut self) {
        self.events.error = true;
    }

    pub fn set_brakes_on(&mut self, brakes_on: bool) {
        self.events.brakes_on = brakes_on;
    }

    #[must_use]
    pub fn brakes_on(&self) -> bool {
        self.events.brakes_on
    }

    #[must_use]
    pub fn events(&self) -> &Events {
        &self.events
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// The machine has no final state.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_final(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_state_active(&self, id: StateId) -> bool {
        matches!(
            (id, self.state),
            (StateId::Idle, Some(State::Idle))
                | (StateId::Running, Some(State::Running(..)))
                | (StateId::HeadlightsOn, Some(State::Running(HeadlightMode::On, _)))
                | (StateId::HeadlightsOff, Some(State::Running(HeadlightMode::Off, _)))
                | (StateId::BrakesOn, Some(State::Running(_, TaillightMode::BrakesOn)))
                | (StateId::BrakesOff, Some(State::Running(_, TaillightMode::BrakesOff)))
                | (StateId::Error, Some(State::Error))
        )
    }

    #[must_use]
    pub fn state(&self) -> Option<State> {
        self.state
    }

    /// Active leaf per region: `[region 0, region 1]`. Region 1 is only set
    /// while region 0 is inside `Running`.
    #[must_use]
    pub fn configuration(&self) -> [Option<StateId>; 2] {
        match self.state {
            None => [None, None],
            Some(State::Idle) => [Some(StateId::Idle), None],
            Some(State::Error) => [Some(StateId::Error), None],
            Some(State::Running(headlights, taillights)) => [
                Some(match headlights {
                    HeadlightMode::On => StateId::HeadlightsOn,
                    HeadlightMode::Off => StateId::HeadlightsOff,
                }),
                Some(match taillights {
                    TaillightMode::BrakesOn => StateId::BrakesOn,
                    TaillightMode::BrakesOff => StateId::BrakesOff,
                }),
            ],
        }
    }

    #[must_use]
    pub fn history(&self) -> Option<HeadlightMode> {
        self.history
    }

    #[must_use]
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }
}
