#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use trailmap_client::config::ClientConfig;
use trailmap_client::context::{MapContext, NoPause, Pacer};
use trailmap_client::net::{Backend, FetchError};
use trailmap_client::surface::{FitPadding, LayerKind, MapSurface, Primitive};
use trailmap_client::ui::{Slot, Tone, UiSink};
use trailmap_shared::proximity::NearbyTrail;
use trailmap_shared::{Bounds, LngLat, PlaceList};

#[derive(Default)]
pub struct RecordingSurface {
    layers: RefCell<HashMap<LayerKind, Vec<Primitive>>>,
    pub fits: RefCell<Vec<(Bounds, FitPadding)>>,
    pub popups: RefCell<Vec<(LngLat, String)>>,
    pub hidden: RefCell<HashSet<LayerKind>>,
    /// Simulates icon markers that never make it onto the map.
    pub reject_markers: Cell<bool>,
}

impl RecordingSurface {
    pub fn primitives(&self, kind: LayerKind) -> Vec<Primitive> {
        self.layers.borrow().get(&kind).cloned().unwrap_or_default()
    }
}

impl MapSurface for RecordingSurface {
    fn clear(&self, kind: LayerKind) {
        self.layers.borrow_mut().remove(&kind);
    }

    fn add(&self, kind: LayerKind, primitive: &Primitive) -> bool {
        if self.reject_markers.get() && matches!(primitive, Primitive::Marker { .. }) {
            return false;
        }
        self.layers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(primitive.clone());
        true
    }

    fn count(&self, kind: LayerKind) -> usize {
        self.layers.borrow().get(&kind).map_or(0, Vec::len)
    }

    fn fit_bounds(&self, bounds: &Bounds, padding: FitPadding) {
        self.fits.borrow_mut().push((*bounds, padding));
    }

    fn set_visible(&self, kind: LayerKind, visible: bool) {
        if visible {
            self.hidden.borrow_mut().remove(&kind);
        } else {
            self.hidden.borrow_mut().insert(kind);
        }
    }

    fn open_popup(&self, at: LngLat, html: &str) {
        self.popups.borrow_mut().push((at, html.to_string()));
    }
}

pub enum Reply {
    Json(Value),
    Fail(FetchError),
    /// Resolved later by the test through the paired sender.
    Pending(oneshot::Receiver<Result<Value, FetchError>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sent {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// Replies are queued per URL and consumed in order. Unscripted URLs get 404.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    pub sent: RefCell<Vec<Sent>>,
}

impl ScriptedBackend {
    pub fn json(&self, url: &str, value: Value) -> &Self {
        self.push(url, Reply::Json(value))
    }

    pub fn fail(&self, url: &str, error: FetchError) -> &Self {
        self.push(url, Reply::Fail(error))
    }

    pub fn pending(&self, url: &str) -> oneshot::Sender<Result<Value, FetchError>> {
        let (tx, rx) = oneshot::channel();
        self.push(url, Reply::Pending(rx));
        tx
    }

    fn push(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn sent_to(&self, url: &str) -> Vec<Sent> {
        self.sent
            .borrow()
            .iter()
            .filter(|sent| sent.url == url)
            .cloned()
            .collect()
    }

    async fn answer(&self, method: &'static str, url: &str, body: Option<Value>) -> Result<Value, FetchError> {
        self.sent.borrow_mut().push(Sent {
            method,
            url: url.to_string(),
            body,
        });
        let reply = self
            .replies
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Pending(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("reply dropped".into()))),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait(?Send)]
impl Backend for ScriptedBackend {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.answer("GET", url, None).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FetchError> {
        self.answer("POST", url, Some(body.clone())).await
    }
}

#[derive(Default)]
pub struct RecordingUi {
    pub banners: RefCell<Vec<(Tone, String)>>,
    pub texts: RefCell<HashMap<Slot, String>>,
    pub places: RefCell<Option<PlaceList>>,
    pub nearby: RefCell<Option<(LngLat, Vec<NearbyTrail>)>>,
    pub loading: Cell<bool>,
}

impl RecordingUi {
    pub fn text(&self, slot: Slot) -> Option<String> {
        self.texts.borrow().get(&slot).cloned()
    }

    pub fn last_banner(&self) -> Option<(Tone, String)> {
        self.banners.borrow().last().cloned()
    }
}

impl UiSink for RecordingUi {
    fn banner(&self, tone: Tone, message: &str) {
        self.banners.borrow_mut().push((tone, message.to_string()));
    }

    fn set_loading(&self, loading: bool) {
        self.loading.set(loading);
    }

    fn set_text(&self, slot: Slot, text: &str) {
        self.texts.borrow_mut().insert(slot, text.to_string());
    }

    fn show_places(&self, places: &PlaceList) {
        *self.places.borrow_mut() = Some(places.clone());
    }

    fn clear_places(&self) {
        *self.places.borrow_mut() = None;
    }

    fn show_nearby(&self, search_point: LngLat, trails: &[NearbyTrail]) {
        *self.nearby.borrow_mut() = Some((search_point, trails.to_vec()));
    }

    fn clear_nearby(&self) {
        *self.nearby.borrow_mut() = None;
    }
}

/// Hands control back to the runtime so a concurrently joined future can
/// run between render batches.
#[derive(Default)]
pub struct YieldNow;

#[async_trait(?Send)]
impl Pacer for YieldNow {
    async fn pause(&self, _ms: u32) {
        tokio::task::yield_now().await;
    }
}

pub struct Harness<P = NoPause> {
    pub ctx: MapContext,
    pub surface: Rc<RecordingSurface>,
    pub backend: Rc<ScriptedBackend>,
    pub pacer: Rc<P>,
    pub ui: Rc<RecordingUi>,
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_base: String::new(),
        ..ClientConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: ClientConfig) -> Harness {
    harness_with_pacer(config, Rc::new(NoPause::default()))
}

pub fn harness_with_pacer<P: Pacer + 'static>(config: ClientConfig, pacer: Rc<P>) -> Harness<P> {
    let surface = Rc::new(RecordingSurface::default());
    let backend = Rc::new(ScriptedBackend::default());
    let ui = Rc::new(RecordingUi::default());
    let ctx = MapContext::new(
        config,
        surface.clone(),
        backend.clone(),
        pacer.clone(),
        ui.clone(),
    );
    Harness {
        ctx,
        surface,
        backend,
        pacer,
        ui,
    }
}

pub fn lat_lng(lat: f64, lng: f64) -> LngLat {
    LngLat::from_lat_lng(lat, lng).unwrap()
}
