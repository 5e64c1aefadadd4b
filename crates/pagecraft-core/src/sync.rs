//! Transport messages and outbound debouncing.
//!
//! Framing and connection management belong to the host; this module only
//! defines the JSON messages exchanged with the backend and batches local
//! edits so a shape produces at most one update per quiet period.

use crate::animation::AnimationConfig;
use crate::scheduler::Debounce;
use crate::shapes::{FontStyle, FontWeight, Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partial shape update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapePatch {
    pub id: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationConfig>,
}

impl ShapePatch {
    /// Full geometry plus, for text, the complete style. `None` for unsaved shapes.
    pub fn from_shape(shape: &Shape) -> Option<Self> {
        let base = shape.base();
        let mut patch = ShapePatch {
            id: base.id?,
            x: Some(base.x),
            y: Some(base.y),
            width: Some(base.width),
            height: Some(base.height),
            rotate: Some(base.rotation()),
            ..Default::default()
        };
        if let Shape::Text(text) = shape {
            patch.text = Some(text.text.clone());
            patch.font_size = Some(text.font_size);
            patch.font_family = Some(text.font_family.clone());
            patch.font_weight = Some(text.font_weight);
            patch.font_style = Some(text.font_style);
            patch.color = Some(text.color.clone());
            patch.opacity = Some(text.opacity);
        }
        Some(patch)
    }

    /// Apply to a shape. Text fields are ignored for images.
    pub fn apply(&self, shape: &mut Shape) {
        let base = shape.base_mut();
        if let Some(x) = self.x {
            base.x = x;
        }
        if let Some(y) = self.y {
            base.y = y;
        }
        if let Some(width) = self.width {
            base.width = width;
        }
        if let Some(height) = self.height {
            base.height = height;
        }
        if let Some(rotate) = self.rotate {
            base.set_rotation(rotate);
        }
        if let Some(animation) = self.animation {
            base.animation = animation;
            base.animation_start_ms = None;
        }
        base.normalize();

        let Shape::Text(text) = shape else {
            return;
        };
        if let Some(value) = &self.text {
            text.text = value.clone();
        }
        if let Some(value) = self.font_size {
            text.font_size = value;
        }
        if let Some(value) = &self.font_family {
            text.font_family = value.clone();
        }
        if let Some(value) = self.font_weight {
            text.font_weight = value;
        }
        if let Some(value) = self.font_style {
            text.font_style = value;
        }
        if let Some(value) = &self.color {
            text.color = value.clone();
        }
        if let Some(value) = self.opacity {
            text.opacity = value;
        }
    }
}

/// Messages sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    UpdateShape {
        page_id: String,
        #[serde(flatten)]
        patch: ShapePatch,
    },
    CreateShape {
        page_id: String,
        shape: Shape,
    },
    DeleteShape {
        page_id: String,
        id: ShapeId,
    },
    /// Replace a page's shapes wholesale.
    SyncPage {
        page_id: String,
        shapes: Vec<Shape>,
    },
}

/// Messages received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ShapeUpdated {
        page_id: String,
        #[serde(flatten)]
        patch: ShapePatch,
    },
    ShapeCreated {
        page_id: String,
        shape: Shape,
    },
    ShapeDeleted {
        page_id: String,
        id: ShapeId,
    },
    Error {
        message: String,
    },
}

/// Outbound messages waiting for their quiet period.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    delay_ms: f64,
    updates: BTreeMap<ShapeId, Debounce<(String, ShapePatch)>>,
    immediate: Vec<ClientMessage>,
}

impl OutboundQueue {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            updates: BTreeMap::new(),
            immediate: Vec::new(),
        }
    }

    /// Queue an update; a newer update for the same shape replaces it and
    /// restarts the quiet period.
    pub fn push_update(&mut self, page_id: &str, patch: ShapePatch, now_ms: f64) {
        let delay = self.delay_ms;
        self.updates
            .entry(patch.id)
            .or_insert_with(|| Debounce::new(delay))
            .schedule((page_id.to_string(), patch), now_ms);
    }

    /// Queue a message to go out on the next poll. Deleting a shape drops
    /// its pending update.
    pub fn push_immediate(&mut self, message: ClientMessage) {
        if let ClientMessage::DeleteShape { id, .. } = &message {
            self.updates.remove(id);
        }
        self.immediate.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.updates.values().all(|d| !d.is_pending())
    }

    /// Earliest time a queued message becomes due. Immediate messages are
    /// due at `now_ms`.
    pub fn next_deadline(&self, now_ms: f64) -> Option<f64> {
        if !self.immediate.is_empty() {
            return Some(now_ms);
        }
        self.updates
            .values()
            .filter_map(Debounce::deadline)
            .min_by(f64::total_cmp)
    }

    /// Messages due at `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> Vec<ClientMessage> {
        let mut out = std::mem::take(&mut self.immediate);
        for debounce in self.updates.values_mut() {
            if let Some((page_id, patch)) = debounce.poll(now_ms) {
                out.push(ClientMessage::UpdateShape { page_id, patch });
            }
        }
        self.updates.retain(|_, d| d.is_pending());
        out
    }

    /// Everything still queued, regardless of deadlines.
    pub fn flush(&mut self) -> Vec<ClientMessage> {
        let mut out = std::mem::take(&mut self.immediate);
        for (_, mut debounce) in std::mem::take(&mut self.updates) {
            if let Some((page_id, patch)) = debounce.cancel() {
                out.push(ClientMessage::UpdateShape { page_id, patch });
            }
        }
        out
    }
}
