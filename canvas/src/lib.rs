//! Canvas engine for the collaborative whiteboard.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It holds the
//! local element cache, turns raw DOM input into element mutations, keeps the
//! pan/zoom camera, hit-tests elements, and renders the scene. The host layer
//! wires DOM events to the engine and forwards the queued writes to the sync
//! bridge.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | Element ids, variant payloads, patches, and validation |
//! | [`doc`] | Local element cache and outbox of optimistic writes |
//! | [`geometry`] | Bounding boxes and connection curves |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Tools, input event types, and the interaction state |
//! | [`hit`] | Hit-testing against elements and card handles |
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`render`] | Scene rendering to a 2D canvas context |
//! | [`consts`] | Shared numeric constants and defaults |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod element;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod render;
