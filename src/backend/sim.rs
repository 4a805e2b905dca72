use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::backend::device::{
    BackendError, CaptureError, DeviceBackend, DeviceCommand, RawScreen, ScreenSource,
    ScrollDirection, SwipeDirection,
};
use crate::hash::codec::GrayImage;
use crate::model::ui_tree::UiNode;

/// Synthetic screenshot dimensions for simulated screens.
const SIM_WIDTH: u32 = 108;
const SIM_HEIGHT: u32 = 192;

// ============================================================================
// Simulated app definition (YAML-loadable)
// ============================================================================

/// A screen of the simulated app: a name and its UI tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimScreenSpec {
    pub name: String,
    pub ui_tree: UiNode,
}

/// A transition edge: performing an action whose trigger matches on `from`
/// lands on `to`. Triggers are matched as substrings of the command's
/// element identifier/text, or against gesture names (`back`, `scroll_down`,
/// `scroll_up`, `swipe_left`, `swipe_right`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEdgeSpec {
    pub from: String,
    pub trigger: String,
    pub to: String,
}

/// Whole simulated app: screen graph plus the starting screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimAppSpec {
    pub name: String,
    pub start: String,
    pub screens: Vec<SimScreenSpec>,
    pub edges: Vec<SimEdgeSpec>,
}

impl SimAppSpec {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

// ============================================================================
// Simulated device
// ============================================================================

/// In-process stand-in for a real device connection: serves screen captures
/// and applies primitive commands to a scripted screen graph. Used by the
/// demo CLI and the integration tests; failures can be injected to exercise
/// the resilience layer.
pub struct SimulatedDevice {
    screens: Vec<SimScreenSpec>,
    edges: Vec<SimEdgeSpec>,
    current: usize,
    back_stack: Vec<usize>,
    fail_plan: VecDeque<BackendError>,
    pub executed_commands: u32,
}

impl SimulatedDevice {
    pub fn new(spec: SimAppSpec) -> Result<Self, String> {
        let current = spec
            .screens
            .iter()
            .position(|s| s.name == spec.start)
            .ok_or_else(|| format!("start screen '{}' not defined", spec.start))?;
        for edge in &spec.edges {
            if !spec.screens.iter().any(|s| s.name == edge.to) {
                return Err(format!("edge target screen '{}' not defined", edge.to));
            }
        }
        Ok(Self {
            screens: spec.screens,
            edges: spec.edges,
            current,
            back_stack: Vec::new(),
            fail_plan: VecDeque::new(),
            executed_commands: 0,
        })
    }

    /// Queue backend errors to be returned by upcoming `execute` calls.
    pub fn inject_failures(&mut self, failures: impl IntoIterator<Item = BackendError>) {
        self.fail_plan.extend(failures);
    }

    pub fn current_screen_name(&self) -> &str {
        &self.screens[self.current].name
    }

    /// Wrap in a shared handle usable as both `ScreenSource` and
    /// `DeviceBackend` (the crawl loop is single-threaded, so a `RefCell`
    /// suffices).
    pub fn shared(self) -> SharedDevice {
        Rc::new(RefCell::new(self))
    }

    fn trigger_of(command: &DeviceCommand) -> Option<String> {
        match command {
            DeviceCommand::TapElement(h)
            | DeviceCommand::LongPressElement(h)
            | DeviceCommand::InputText { target: h, .. } => h
                .resource_id
                .clone()
                .or_else(|| h.content_desc.clone())
                .or_else(|| h.text.clone()),
            DeviceCommand::TapPoint { .. } | DeviceCommand::InputAtPoint { .. } => None,
            DeviceCommand::Scroll(ScrollDirection::Down) => Some("scroll_down".into()),
            DeviceCommand::Scroll(ScrollDirection::Up) => Some("scroll_up".into()),
            DeviceCommand::Swipe(SwipeDirection::Left) => Some("swipe_left".into()),
            DeviceCommand::Swipe(SwipeDirection::Right) => Some("swipe_right".into()),
            DeviceCommand::Back => Some("back".into()),
        }
    }

    fn apply(&mut self, command: &DeviceCommand) {
        if matches!(command, DeviceCommand::Back) && !self.back_stack.is_empty() {
            // Back prefers the navigation stack over explicit edges.
            if let Some(prev) = self.back_stack.pop() {
                self.current = prev;
                return;
            }
        }

        let Some(trigger) = Self::trigger_of(command) else {
            return;
        };
        let from = self.screens[self.current].name.clone();
        let edge = self
            .edges
            .iter()
            .find(|e| e.from == from && (trigger.contains(&e.trigger) || e.trigger == trigger));
        if let Some(edge) = edge {
            let to = self
                .screens
                .iter()
                .position(|s| s.name == edge.to)
                .unwrap_or(self.current);
            if to != self.current {
                self.back_stack.push(self.current);
                self.current = to;
            }
        }
        // No matching edge: the action lands but nothing changes (no-op).
    }
}

/// Deterministic synthetic screenshot: each screen name renders to a
/// distinct banded pattern, so perceptual hashes differ between screens but
/// are identical across visits.
fn render_screen_image(name: &str) -> GrayImage {
    let seed: u32 = name.bytes().fold(2166136261u32, |acc, b| {
        (acc ^ u32::from(b)).wrapping_mul(16777619)
    });
    let mut pixels = Vec::with_capacity((SIM_WIDTH * SIM_HEIGHT) as usize);
    for y in 0..SIM_HEIGHT {
        for x in 0..SIM_WIDTH {
            let band = (y / 24).wrapping_add(x / 36);
            let v = seed
                .wrapping_mul(band.wrapping_add(1))
                .wrapping_add(band * 97);
            pixels.push((v >> 8) as u8);
        }
    }
    GrayImage::new(SIM_WIDTH, SIM_HEIGHT, pixels)
}

pub type SharedDevice = Rc<RefCell<SimulatedDevice>>;

/// `ScreenSource` view of a shared simulated device.
pub struct SimScreenSource(pub SharedDevice);

impl ScreenSource for SimScreenSource {
    fn capture(&mut self) -> Result<RawScreen, CaptureError> {
        let device = self.0.borrow();
        let screen = &device.screens[device.current];
        let ui_tree_json = serde_json::to_string(&screen.ui_tree)
            .map_err(|e| CaptureError { message: e.to_string() })?;
        Ok(RawScreen {
            ui_tree_json,
            image: render_screen_image(&screen.name),
        })
    }
}

/// `DeviceBackend` view of a shared simulated device.
pub struct SimBackend(pub SharedDevice);

impl DeviceBackend for SimBackend {
    fn execute(&mut self, command: &DeviceCommand) -> Result<(), BackendError> {
        let mut device = self.0.borrow_mut();
        if let Some(err) = device.fail_plan.pop_front() {
            return Err(err);
        }
        device.executed_commands += 1;
        device.apply(command);
        Ok(())
    }
}

// ============================================================================
// Scripted backend (test support)
// ============================================================================

/// Backend that replays a queue of results and counts invocations. The
/// counter stays observable after the backend is boxed into the executor;
/// the resilience tests assert call counts against it.
#[derive(Default)]
pub struct ScriptedBackend {
    pub results: VecDeque<Result<(), BackendError>>,
    calls: Rc<std::cell::Cell<u32>>,
}

impl ScriptedBackend {
    pub fn new(results: impl IntoIterator<Item = Result<(), BackendError>>) -> Self {
        Self {
            results: results.into_iter().collect(),
            calls: Rc::new(std::cell::Cell::new(0)),
        }
    }

    pub fn call_counter(&self) -> Rc<std::cell::Cell<u32>> {
        Rc::clone(&self.calls)
    }
}

impl DeviceBackend for ScriptedBackend {
    fn execute(&mut self, _command: &DeviceCommand) -> Result<(), BackendError> {
        self.calls.set(self.calls.get() + 1);
        self.results.pop_front().unwrap_or(Ok(()))
    }
}
