//! External collaborator boundaries.
//!
//! The surrounding workspace application owns canvas CRUD, layer persistence
//! and authentication; the core only consumes them through these interfaces.

use crate::element::{Element, ElementId};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Canvas metadata as resolved by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasInfo {
    pub id: String,
    pub title: String,
}

/// Resolves canvas metadata by identifier.
pub trait CanvasDirectory {
    fn canvas_info(&self, canvas_id: &str) -> Option<CanvasInfo>;
}

/// Caller identity, resolved by the host application before a session opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

/// Layer store errors.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Layer not found: {0}")]
    NotFound(ElementId),
    #[error("Layer store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent element CRUD for the collaborative board.
///
/// `create_layer` assigns the element its identity; the returned element is
/// what the session keeps. All calls are best-effort from the session's
/// perspective: failures are logged, the optimistic local state stands.
pub trait LayerStore {
    fn create_layer(&mut self, canvas_id: &str, element: Element) -> Result<Element, LayerError>;
    fn update_layer(&mut self, id: ElementId, element: &Element) -> Result<(), LayerError>;
    fn delete_layer(&mut self, id: ElementId) -> Result<(), LayerError>;
    fn bring_to_front(&mut self, id: ElementId) -> Result<(), LayerError>;
}

/// In-memory layer store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryLayerStore {
    layers: HashMap<ElementId, Element>,
    next_z: i64,
}

impl InMemoryLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.layers.get(&id)
    }
}

impl LayerStore for InMemoryLayerStore {
    fn create_layer(&mut self, _canvas_id: &str, mut element: Element) -> Result<Element, LayerError> {
        let id = Uuid::new_v4();
        element.id = Some(id);
        self.next_z = self.next_z.max(element.z_index);
        self.layers.insert(id, element.clone());
        Ok(element)
    }

    fn update_layer(&mut self, id: ElementId, element: &Element) -> Result<(), LayerError> {
        match self.layers.get_mut(&id) {
            Some(stored) => {
                *stored = element.clone();
                stored.id = Some(id);
                Ok(())
            }
            None => Err(LayerError::NotFound(id)),
        }
    }

    fn delete_layer(&mut self, id: ElementId) -> Result<(), LayerError> {
        self.layers.remove(&id);
        Ok(())
    }

    fn bring_to_front(&mut self, id: ElementId) -> Result<(), LayerError> {
        self.next_z += 1;
        match self.layers.get_mut(&id) {
            Some(stored) => {
                stored.z_index = self.next_z;
                Ok(())
            }
            None => Err(LayerError::NotFound(id)),
        }
    }
}
