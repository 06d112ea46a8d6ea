//! Slateboard Core Library
//!
//! Platform-agnostic core data structures and logic for the Slateboard
//! collaborative whiteboard: the element model, the two editing sessions
//! (collaborative board and modal sketch editor), history, persistence and
//! the polling collaboration channel.

pub mod board;
pub mod camera;
pub mod collab;
pub mod element;
pub mod history;
pub mod input;
pub mod presence;
pub mod providers;
pub mod sketch;
pub mod storage;
pub mod timer;
pub mod tools;

pub use board::{BoardSession, TextPrompt};
pub use camera::{Camera, CenteredCamera};
pub use collab::{CollabClient, HttpRelay, InMemoryRelay, Relay, RelayMessage, SyncResponse};
pub use element::{Element, ElementId, ShapeData, decode_elements, decode_elements_json};
pub use history::History;
pub use input::{InputState, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use presence::{Presence, PresenceMap};
pub use providers::{CanvasDirectory, CanvasInfo, Identity, InMemoryLayerStore, LayerError, LayerStore};
pub use sketch::{CloseDecision, SketchSession};
pub use storage::{AutosaveManager, FileStorage, MemoryStorage, Storage, StorageError};
pub use tools::{BoardTool, SketchTool};
