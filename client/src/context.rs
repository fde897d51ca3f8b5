use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use trailmap_shared::Feature;

use crate::config::ClientConfig;
use crate::net::Backend;
use crate::state::UiState;
use crate::surface::MapSurface;
use crate::ui::UiSink;

/// The single writer of a set of layer groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadKey {
    Trails,
    Towns,
    Pois,
    Rivers,
    Results,
    Nearby,
    RiverTrails,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub key: LoadKey,
    pub generation: u64,
}

/// Per-key load counters. Starting a load supersedes every earlier load of
/// the same key, whose results must then be dropped.
#[derive(Default)]
pub struct Generations {
    current: RefCell<HashMap<LoadKey, u64>>,
}

impl Generations {
    pub fn begin(&self, key: LoadKey) -> LoadTicket {
        let mut current = self.current.borrow_mut();
        let generation = current.entry(key).or_insert(0);
        *generation += 1;
        LoadTicket {
            key,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.current.borrow().get(&ticket.key).copied() == Some(ticket.generation)
    }
}

#[async_trait(?Send)]
pub trait Pacer {
    async fn pause(&self, ms: u32);
}

pub struct TimerPacer;

#[async_trait(?Send)]
impl Pacer for TimerPacer {
    async fn pause(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

#[derive(Default)]
pub struct NoPause {
    pauses: Cell<usize>,
}

impl NoPause {
    pub fn pauses(&self) -> usize {
        self.pauses.get()
    }
}

#[async_trait(?Send)]
impl Pacer for NoPause {
    async fn pause(&self, _ms: u32) {
        self.pauses.set(self.pauses.get() + 1);
    }
}

pub struct MapContext {
    pub config: ClientConfig,
    pub surface: Rc<dyn MapSurface>,
    pub backend: Rc<dyn Backend>,
    pub pacer: Rc<dyn Pacer>,
    pub ui: Rc<dyn UiSink>,
    pub state: RefCell<UiState>,
    generations: Generations,
    trails: RefCell<Vec<Feature>>,
}

impl MapContext {
    pub fn new(
        config: ClientConfig,
        surface: Rc<dyn MapSurface>,
        backend: Rc<dyn Backend>,
        pacer: Rc<dyn Pacer>,
        ui: Rc<dyn UiSink>,
    ) -> Self {
        Self {
            config,
            surface,
            backend,
            pacer,
            ui,
            state: RefCell::new(UiState::default()),
            generations: Generations::default(),
            trails: RefCell::new(Vec::new()),
        }
    }

    pub fn begin(&self, key: LoadKey) -> LoadTicket {
        self.generations.begin(key)
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.generations.is_current(ticket)
    }

    pub fn cached_trails(&self) -> Vec<Feature> {
        self.trails.borrow().clone()
    }

    pub fn cache_trails(&self, trails: &[Feature]) {
        *self.trails.borrow_mut() = trails.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ticket_supersedes_earlier() {
        let generations = Generations::default();
        let first = generations.begin(LoadKey::Trails);
        assert!(generations.is_current(&first));
        let second = generations.begin(LoadKey::Trails);
        assert!(!generations.is_current(&first));
        assert!(generations.is_current(&second));
    }

    #[test]
    fn keys_are_independent() {
        let generations = Generations::default();
        let trails = generations.begin(LoadKey::Trails);
        let _towns = generations.begin(LoadKey::Towns);
        assert!(generations.is_current(&trails));
    }
}
