//! Fixed-step driver that ties the clock, the simulation and AI together.

use std::time::Duration;

use crate::clock::TickClock;
use crate::command::CommandKind;
use crate::components::{EntityId, PlayerId};
use crate::simulation::{Simulation, TickEvents};

/// Hook for computer players.
///
/// Controllers read the simulation and answer with orders. Orders go
/// through the scheduler like player input, so they honour the input delay.
pub trait AiController {
    /// Player the controller issues orders for.
    fn player(&self) -> PlayerId;

    /// Decide on orders. Called every `ai_update_interval_ticks` ticks,
    /// after the tick's entity steps.
    fn update(&mut self, sim: &Simulation) -> Vec<(Vec<EntityId>, CommandKind)>;
}

/// Owns a [`TickClock`], a [`Simulation`] and any AI controllers.
pub struct GameLoop {
    clock: TickClock,
    sim: Simulation,
    controllers: Vec<Box<dyn AiController>>,
}

impl GameLoop {
    /// Loop at the simulation's configured tick rate.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        Self {
            clock: TickClock::new(sim.config().ticks_per_second),
            sim,
            controllers: Vec::new(),
        }
    }

    /// Register a controller.
    pub fn add_controller(&mut self, controller: Box<dyn AiController>) {
        self.controllers.push(controller);
    }

    /// Feed wall-clock time and run every tick it covers.
    pub fn update(&mut self, elapsed: Duration) -> Vec<TickEvents> {
        let Self {
            clock,
            sim,
            controllers,
        } = self;
        let mut events = Vec::new();
        clock.advance(elapsed, |_, _| events.push(run_tick(sim, controllers)));
        events
    }

    /// Run exactly one tick, ignoring the clock.
    pub fn step(&mut self) -> TickEvents {
        run_tick(&mut self.sim, &mut self.controllers)
    }

    /// Presentation interpolation factor for the pending tick.
    #[must_use]
    pub fn interpolation_factor(&self) -> f32 {
        self.clock.interpolation_factor()
    }

    /// The simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable simulation, for player input and setup.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// The clock.
    #[must_use]
    pub const fn clock(&self) -> &TickClock {
        &self.clock
    }
}

fn run_tick(sim: &mut Simulation, controllers: &mut [Box<dyn AiController>]) -> TickEvents {
    let events = sim.tick();
    let interval = sim.config().ai_update_interval_ticks.max(1);
    if events.tick % interval == 0 {
        for controller in controllers.iter_mut() {
            let player = controller.player();
            for (actors, kind) in controller.update(sim) {
                sim.issue(player, actors, kind);
            }
        }
    }
    events
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("clock", &self.clock)
            .field("tick", &self.sim.tick_count())
            .field("controllers", &self.controllers.len())
            .finish()
    }
}
