//! Cursor selection from hover, session and mode.

use crate::geometry::{self, Corner};
use crate::hover::HoverTarget;
use crate::shapes::ShapeBase;
use crate::transform::TransformSession;
use serde::{Deserialize, Serialize};

/// Cursor shapes the host knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorIcon {
    #[default]
    Default,
    Pointer,
    Grab,
    Grabbing,
    Text,
    NwseResize,
    NeswResize,
    NsResize,
    EwResize,
}

impl CursorIcon {
    /// CSS cursor keyword.
    pub fn as_css(&self) -> &'static str {
        match self {
            CursorIcon::Default => "default",
            CursorIcon::Pointer => "pointer",
            CursorIcon::Grab => "grab",
            CursorIcon::Grabbing => "grabbing",
            CursorIcon::Text => "text",
            CursorIcon::NwseResize => "nwse-resize",
            CursorIcon::NeswResize => "nesw-resize",
            CursorIcon::NsResize => "ns-resize",
            CursorIcon::EwResize => "ew-resize",
        }
    }
}

/// Resize cursor for a corner of `base`, accounting for its rotation.
///
/// Unrotated shapes get diagonal cursors. Rotated shapes bucket the corner's
/// direction from the center into the nearest of N/E/S/W.
pub fn resize_cursor(base: &ShapeBase, corner: Corner) -> CursorIcon {
    let rotation = base.rotation();
    if rotation == 0.0 {
        return if corner.is_main_diagonal() {
            CursorIcon::NwseResize
        } else {
            CursorIcon::NeswResize
        };
    }

    let world = base.to_world(corner.point_on(base.bounds()));
    let Some(angle) = geometry::angle_to_center(world, base.center()) else {
        return CursorIcon::NwseResize;
    };
    // 0 = east, 90 = south (y down).
    match angle {
        a if (45.0..135.0).contains(&a) => CursorIcon::NsResize,
        a if (135.0..225.0).contains(&a) => CursorIcon::EwResize,
        a if (225.0..315.0).contains(&a) => CursorIcon::NsResize,
        _ => CursorIcon::EwResize,
    }
}

/// Everything that influences the cursor.
#[derive(Debug, Clone, Copy)]
pub struct CursorInputs<'a> {
    pub hover: HoverTarget,
    pub session: Option<&'a TransformSession>,
    /// The selected shape, used for handle cursors.
    pub selected: Option<&'a ShapeBase>,
    pub pan_mode: bool,
    pub pointer_down: bool,
    /// Pointer is over the shape whose text is being edited.
    pub over_text_edit: bool,
}

pub fn cursor_for(inputs: &CursorInputs<'_>) -> CursorIcon {
    if inputs.pan_mode {
        return if inputs.pointer_down {
            CursorIcon::Grabbing
        } else {
            CursorIcon::Grab
        };
    }

    match inputs.session {
        Some(TransformSession::Rotate(_)) | Some(TransformSession::Drag(_)) => {
            return CursorIcon::Grabbing;
        }
        Some(TransformSession::Resize(session)) => {
            return inputs
                .selected
                .map(|base| resize_cursor(base, session.corner))
                .unwrap_or_else(|| resize_cursor(&session.start, session.corner));
        }
        None => {}
    }

    if inputs.over_text_edit {
        return CursorIcon::Text;
    }

    match inputs.hover {
        HoverTarget::RotateHandle => CursorIcon::Grab,
        HoverTarget::ResizeHandle(corner) => match inputs.selected {
            Some(base) => resize_cursor(base, corner),
            None => CursorIcon::Default,
        },
        HoverTarget::Body(_) => CursorIcon::Pointer,
        HoverTarget::None => CursorIcon::Default,
    }
}
