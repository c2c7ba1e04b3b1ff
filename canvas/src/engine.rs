use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point};
use crate::consts::{CARD_PALETTE, MIN_CARD_HEIGHT, MIN_CARD_WIDTH};
use crate::doc::{ChangeEvent, DocStore, PendingWrite, WriteToken};
use crate::element::{Element, ElementId, ElementKind, ElementPatch, ModelError, Payload};
use crate::hit::{self, HitPart};
use crate::input::{Button, InputState, Interaction, Key, Modifiers, Tool, WheelDelta};
use crate::render;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// An element was created optimistically under a temporary id.
    ElementCreated { id: ElementId, token: WriteToken },
    /// An element's payload was changed optimistically.
    ElementUpdated { id: ElementId, token: WriteToken },
    /// An element was removed locally.
    ElementDeleted { id: ElementId, token: WriteToken },
    /// A local edit failed validation and was not applied.
    Rejected(ModelError),
    /// The host should open its text editor on this element.
    EditTextRequested { id: ElementId, text: String },
    /// The selection changed.
    SelectionChanged(Option<ElementId>),
    /// The armed tool changed (toolbar highlight).
    ToolChanged(Option<Tool>),
    /// A gesture started; route all pointer events to the canvas until released.
    CapturePointer,
    /// The gesture ended; release pointer capture.
    ReleasePointer,
    SetCursor(&'static str),
    RenderNeeded,
}

/// Core engine state — all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: Interaction,
    /// User recorded as the owner of elements created by this client.
    pub owner_id: String,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            ui: Interaction::default(),
            owner_id: String::new(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose created elements are owned by `owner_id`.
    #[must_use]
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self { owner_id: owner_id.into(), ..Self::default() }
    }

    // --- Data inputs ---

    /// Apply a remote change event. A removal of the element under the
    /// current gesture, edit, or selection ends that interaction.
    pub fn apply_remote(&mut self, event: ChangeEvent) -> Vec<Action> {
        let removed = match &event {
            ChangeEvent::Removed(id) => Some(id.clone()),
            _ => None,
        };
        if !self.doc.apply_remote(event) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(id) = removed {
            self.forget(&id, &mut actions);
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Rekey a confirmed create from its temporary id to the durable id.
    pub fn confirm_created(&mut self, temp: &ElementId, durable: &ElementId) -> Vec<Action> {
        if !self.doc.confirm_created(temp, durable) {
            return Vec::new();
        }
        let rekey = |id: &mut ElementId| {
            if id == temp {
                *id = durable.clone();
            }
        };
        let mut actions = Vec::new();
        if let Some(sel) = self.ui.selected_id.as_mut() {
            if sel == temp {
                *sel = durable.clone();
                actions.push(Action::SelectionChanged(Some(durable.clone())));
            }
        }
        if let Some(from) = self.ui.connect_from.as_mut() {
            rekey(from);
        }
        match &mut self.ui.state {
            InputState::Dragging { id, .. } | InputState::Resizing { id } | InputState::EditingText { id } => rekey(id),
            _ => {}
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Drain writes queued by local edits, in issue order.
    pub fn take_pending(&mut self) -> Vec<PendingWrite> {
        self.doc.take_pending()
    }

    // --- Toolbar commands ---

    /// Arm a toolbar tool. Ends any gesture in progress and drops a pending
    /// connection source.
    ///
    /// Ignored while a text edit is open: the host's editor commits or
    /// cancels on focus loss before the toolbar click lands.
    pub fn select_tool(&mut self, tool: Tool) -> Vec<Action> {
        if matches!(self.ui.state, InputState::EditingText { .. }) {
            return Vec::new();
        }
        let mut actions = Vec::new();
        self.end_gesture(&mut actions);
        self.ui.connect_from = None;
        self.ui.state = InputState::ToolArmed(tool);
        actions.push(Action::ToolChanged(Some(tool)));
        actions.push(Action::SetCursor(idle_cursor(Some(tool))));
        actions
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.camera.zoom_in();
        vec![Action::RenderNeeded]
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.camera.zoom_out();
        vec![Action::RenderNeeded]
    }

    /// Delete the selected element and clear the selection.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(id) = self.ui.selected_id.clone() else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        match self.doc.delete(&id) {
            Ok(token) => actions.push(Action::ElementDeleted { id: id.clone(), token }),
            Err(e) => actions.push(Action::Rejected(e)),
        }
        self.forget(&id, &mut actions);
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if self.ui.state.is_gesture() || matches!(self.ui.state, InputState::EditingText { .. }) {
            return Vec::new();
        }

        let armed = self.ui.state.armed_tool();
        let wants_pan = button == Button::Middle
            || (button == Button::Primary && modifiers.alt)
            || armed == Some(Tool::Pan);
        if wants_pan {
            return self.start_pan(screen_pt, armed);
        }
        if button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen_pt);
        let hit = hit::hit_test(world, &self.doc, self.ui.selected_id.as_ref());

        if armed == Some(Tool::Connection) {
            return self.connect_click(hit.map(|h| h.element_id));
        }

        let Some(hit) = hit else {
            return match armed {
                Some(tool) if tool.is_placement() => self.place(tool, world),
                _ => self.set_selection(None),
            };
        };

        let mut actions = self.set_selection(Some(hit.element_id.clone()));
        match hit.part {
            HitPart::ResizeHandle => {
                self.ui.state = InputState::Resizing { id: hit.element_id };
                self.capture(&mut actions);
            }
            HitPart::Swatch(i) => {
                let color = CARD_PALETTE[i].1;
                self.mutate(&hit.element_id, &ElementPatch::color(color), &mut actions);
            }
            HitPart::Body => {
                let origin = self.element(&hit.element_id).and_then(|el| el.payload.position());
                let draggable = matches!(hit.kind, ElementKind::Card | ElementKind::Text);
                if let (true, Some(origin)) = (draggable, origin) {
                    self.ui.state = InputState::Dragging { id: hit.element_id, anchor_offset: world.sub(origin) };
                    self.capture(&mut actions);
                }
            }
        }
        actions
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();
        match self.ui.state.clone() {
            InputState::Panning { anchor, .. } => {
                self.camera.pan_to(screen_pt, anchor);
                actions.push(Action::RenderNeeded);
            }
            InputState::Dragging { id, anchor_offset } => {
                let origin = world.sub(anchor_offset);
                self.mutate(&id, &ElementPatch::position(origin.x, origin.y), &mut actions);
            }
            InputState::Resizing { id } => {
                let Some(origin) = self.element(&id).and_then(|el| el.payload.position()) else {
                    self.end_gesture(&mut actions);
                    return actions;
                };
                let width = (world.x - origin.x).max(MIN_CARD_WIDTH);
                let height = (world.y - origin.y).max(MIN_CARD_HEIGHT);
                self.mutate(&id, &ElementPatch::size(width, height), &mut actions);
            }
            _ => {}
        }
        actions
    }

    pub fn on_pointer_up(&mut self, _screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        self.end_gesture(&mut actions);
        actions
    }

    /// The pointer left the canvas: ends the gesture as pointer-up would.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.end_gesture(&mut actions);
        actions
    }

    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        let selecting = matches!(self.ui.state, InputState::Idle | InputState::ToolArmed(Tool::Select));
        if !selecting {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen_pt);
        let Some(hit) = hit::hit_test(world, &self.doc, self.ui.selected_id.as_ref()) else {
            return Vec::new();
        };
        if hit.part != HitPart::Body || !matches!(hit.kind, ElementKind::Card | ElementKind::Text) {
            return Vec::new();
        }
        let text = self
            .element(&hit.element_id)
            .and_then(|el| el.payload.text())
            .unwrap_or_default()
            .to_owned();

        let mut actions = self.set_selection(Some(hit.element_id.clone()));
        self.ui.state = InputState::EditingText { id: hit.element_id.clone() };
        actions.push(Action::EditTextRequested { id: hit.element_id, text });
        actions
    }

    pub fn on_wheel(&mut self, _screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.ctrl || modifiers.meta {
            if delta.dy < 0.0 {
                self.camera.zoom_in();
            } else if delta.dy > 0.0 {
                self.camera.zoom_out();
            }
        } else {
            self.camera.pan_by(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        let editing = matches!(self.ui.state, InputState::EditingText { .. });
        match key.0.as_str() {
            "Delete" | "Backspace" if !editing => self.delete_selected(),
            "Escape" if editing => self.cancel_edit(),
            "Escape" => {
                self.ui.connect_from = None;
                self.set_selection(None)
            }
            _ => Vec::new(),
        }
    }

    // --- Text editing ---

    /// Commit the host editor's text (focus loss). Writes only if the text
    /// differs from the element's current text, then returns to `Select`.
    pub fn commit_text(&mut self, text: &str) -> Vec<Action> {
        let InputState::EditingText { id } = self.ui.state.clone() else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        let current = self.element(&id).and_then(|el| el.payload.text()).map(str::to_owned);
        if current.is_some_and(|c| c != text) {
            self.mutate(&id, &ElementPatch::text(text), &mut actions);
        }
        self.ui.state = InputState::ToolArmed(Tool::Select);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Close the editor without writing.
    pub fn cancel_edit(&mut self) -> Vec<Action> {
        if !matches!(self.ui.state, InputState::EditingText { .. }) {
            return Vec::new();
        }
        self.ui.state = InputState::ToolArmed(Tool::Select);
        vec![Action::RenderNeeded]
    }

    /// Tear down the view: release any capture and drop all interaction state.
    pub fn teardown(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.ui.pointer_captured {
            self.ui.pointer_captured = false;
            actions.push(Action::ReleasePointer);
        }
        self.ui = Interaction::default();
        actions
    }

    // --- Queries ---

    /// The currently selected element, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&ElementId> {
        self.ui.selected_id.as_ref()
    }

    /// The current camera state.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// The controller's current mode.
    #[must_use]
    pub fn mode(&self) -> &InputState {
        &self.ui.state
    }

    /// An immutable copy of the whole interaction state.
    #[must_use]
    pub fn snapshot(&self) -> Interaction {
        self.ui.clone()
    }

    /// Look up an element by ID.
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.doc.get(id)
    }

    // --- Internals ---

    fn place(&mut self, tool: Tool, world: Point) -> Vec<Action> {
        let payload = if tool == Tool::Card { Payload::default_card(world) } else { Payload::default_text(world) };
        match self.doc.create(payload, &self.owner_id) {
            Ok((id, token)) => {
                let mut actions = vec![Action::ElementCreated { id: id.clone(), token }];
                actions.extend(self.set_selection(Some(id)));
                actions.extend(self.select_tool(Tool::Select));
                actions.push(Action::RenderNeeded);
                actions
            }
            Err(e) => vec![Action::Rejected(e)],
        }
    }

    fn connect_click(&mut self, target: Option<ElementId>) -> Vec<Action> {
        let Some(target) = target else {
            self.ui.connect_from = None;
            return self.set_selection(None);
        };
        let Some(from) = self.ui.connect_from.clone() else {
            self.ui.connect_from = Some(target.clone());
            return self.set_selection(Some(target));
        };
        if from == target {
            return Vec::new();
        }

        self.ui.connect_from = None;
        match self.doc.create(Payload::connection(from, target), &self.owner_id) {
            Ok((id, token)) => {
                let mut actions = vec![Action::ElementCreated { id, token }];
                actions.extend(self.set_selection(None));
                actions.extend(self.select_tool(Tool::Select));
                actions.push(Action::RenderNeeded);
                actions
            }
            Err(e) => vec![Action::Rejected(e)],
        }
    }

    fn start_pan(&mut self, screen_pt: Point, resume: Option<Tool>) -> Vec<Action> {
        let anchor = screen_pt.sub(self.camera.pan());
        self.ui.state = InputState::Panning { anchor, resume };
        let mut actions = Vec::new();
        self.capture(&mut actions);
        actions.push(Action::SetCursor("grabbing"));
        actions
    }

    /// Finish whatever gesture is active. The last mutation stands.
    fn end_gesture(&mut self, actions: &mut Vec<Action>) {
        let next = match &self.ui.state {
            InputState::Dragging { .. } | InputState::Resizing { .. } => Some(InputState::ToolArmed(Tool::Select)),
            InputState::Panning { resume, .. } => {
                actions.push(Action::SetCursor(idle_cursor(*resume)));
                Some(resume.map_or(InputState::Idle, InputState::ToolArmed))
            }
            _ => None,
        };
        if let Some(next) = next {
            self.ui.state = next;
        }
        if self.ui.pointer_captured {
            self.ui.pointer_captured = false;
            actions.push(Action::ReleasePointer);
        }
    }

    fn capture(&mut self, actions: &mut Vec<Action>) {
        if !self.ui.pointer_captured {
            self.ui.pointer_captured = true;
            actions.push(Action::CapturePointer);
        }
    }

    fn mutate(&mut self, id: &ElementId, patch: &ElementPatch, actions: &mut Vec<Action>) {
        match self.doc.mutate_local(id, patch) {
            Ok(token) => {
                actions.push(Action::ElementUpdated { id: id.clone(), token });
                actions.push(Action::RenderNeeded);
            }
            Err(ModelError::NotFound(missing)) => {
                self.forget(&missing, actions);
                actions.push(Action::Rejected(ModelError::NotFound(missing)));
            }
            Err(e) => actions.push(Action::Rejected(e)),
        }
    }

    /// Drop every reference the interaction holds to an element that is gone.
    fn forget(&mut self, id: &ElementId, actions: &mut Vec<Action>) {
        if self.ui.state.target() == Some(id) {
            if matches!(self.ui.state, InputState::EditingText { .. }) {
                self.ui.state = InputState::ToolArmed(Tool::Select);
            } else {
                self.end_gesture(actions);
            }
        }
        if self.ui.connect_from.as_ref() == Some(id) {
            self.ui.connect_from = None;
        }
        if self.ui.selected_id.as_ref() == Some(id) {
            self.ui.selected_id = None;
            actions.push(Action::SelectionChanged(None));
        }
    }

    fn set_selection(&mut self, id: Option<ElementId>) -> Vec<Action> {
        if self.ui.selected_id == id {
            return Vec::new();
        }
        self.ui.selected_id = id.clone();
        vec![Action::SelectionChanged(id), Action::RenderNeeded]
    }
}

fn idle_cursor(tool: Option<Tool>) -> &'static str {
    if tool == Some(Tool::Pan) { "grab" } else { "crosshair" }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pointer_id: Option<i32>,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, owner_id: &str) -> Self {
        Self { canvas, pointer_id: None, core: EngineCore::for_owner(owner_id) }
    }

    // --- Viewport ---

    /// Update viewport dimensions and device pixel ratio, resizing the backing store.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.viewport_width = width_css;
        self.core.viewport_height = height_css;
        self.core.dpr = dpr;
        self.canvas.set_width(backing_px(width_css, dpr));
        self.canvas.set_height(backing_px(height_css, dpr));
    }

    // --- Input events ---

    /// # Errors
    ///
    /// Returns `Err` if the browser refuses pointer capture.
    pub fn on_pointer_down(
        &mut self,
        pointer_id: i32,
        screen_pt: Point,
        button: Button,
        modifiers: Modifiers,
    ) -> Result<Vec<Action>, JsValue> {
        self.pointer_id = Some(pointer_id);
        let actions = self.core.on_pointer_down(screen_pt, button, modifiers);
        self.apply_capture(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if releasing pointer capture fails.
    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_move(screen_pt, modifiers);
        self.apply_capture(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if releasing pointer capture fails.
    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_up(screen_pt, button, modifiers);
        self.apply_capture(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if releasing pointer capture fails.
    pub fn on_pointer_leave(&mut self) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_leave();
        self.apply_capture(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if releasing pointer capture fails.
    pub fn teardown(&mut self) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.teardown();
        self.apply_capture(&actions)?;
        Ok(actions)
    }

    fn apply_capture(&mut self, actions: &[Action]) -> Result<(), JsValue> {
        let Some(pointer_id) = self.pointer_id else {
            return Ok(());
        };
        for action in actions {
            match action {
                Action::CapturePointer => self.canvas.set_pointer_capture(pointer_id)?,
                Action::ReleasePointer => {
                    if self.canvas.has_pointer_capture(pointer_id) {
                        self.canvas.release_pointer_capture(pointer_id)?;
                    }
                    self.pointer_id = None;
                }
                _ => {}
            }
        }
        Ok(())
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        render::draw(
            &ctx,
            &self.core.doc,
            &self.core.camera,
            &self.core.ui,
            self.core.viewport_width,
            self.core.viewport_height,
            self.core.dpr,
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn backing_px(css: f64, dpr: f64) -> u32 {
    (css * dpr).round().max(0.0) as u32
}
