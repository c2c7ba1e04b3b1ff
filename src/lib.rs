//! Teamboard: sync layer and relay for the collaborative whiteboard canvas.
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | Remote store contract, in-process store, websocket client |
//! | [`sync`] | Per-view bridge between the canvas and a remote store |
//! | [`session`] | One whiteboard view: engine plus bridge |
//! | [`routes`] | Axum relay: board websocket, board creation, health |
//! | [`frame`] / [`wire`] | Relay message envelope and element encoding |
//! | [`config`] | Environment configuration |

pub mod config;
pub mod frame;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
pub mod wire;
