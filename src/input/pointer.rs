//! Pointer driver seam and screen regions
//!
//! Frames are captured from a window region, so coordinates picked inside a
//! frame must be shifted by the region origin before they reach the pointer.

use serde::{Deserialize, Serialize};

use super::InputError;

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Host pointer injection
pub trait PointerDriver {
    /// Move the pointer to absolute screen coordinates
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    /// Press and release a button at the current position
    fn click(&mut self, button: MouseButton) -> Result<(), InputError>;

    /// Current pointer position
    fn position(&self) -> Result<(i32, i32), InputError>;
}

/// A pointer operation as issued to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    MoveTo { x: i32, y: i32 },
    Click(MouseButton),
}

/// Driver that records actions instead of injecting them.
///
/// Used for dry runs and tests. With `fail_after(n)` every action after the
/// first `n` fails with [`InputError::Injection`].
#[derive(Debug, Clone, Default)]
pub struct RecordingPointer {
    position: (i32, i32),
    actions: Vec<PointerAction>,
    fail_after: Option<usize>,
}

impl RecordingPointer {
    /// Start at `position`
    pub fn new(position: (i32, i32)) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Fail every action after the first `count`
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Everything issued so far, in order
    pub fn actions(&self) -> &[PointerAction] {
        &self.actions
    }

    /// Move targets, in order
    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.actions
            .iter()
            .filter_map(|action| match *action {
                PointerAction::MoveTo { x, y } => Some((x, y)),
                PointerAction::Click(_) => None,
            })
            .collect()
    }

    /// Buttons clicked, in order
    pub fn clicks(&self) -> Vec<MouseButton> {
        self.actions
            .iter()
            .filter_map(|action| match *action {
                PointerAction::Click(button) => Some(button),
                PointerAction::MoveTo { .. } => None,
            })
            .collect()
    }

    fn record(&mut self, action: PointerAction) -> Result<(), InputError> {
        if self.fail_after.is_some_and(|limit| self.actions.len() >= limit) {
            return Err(InputError::Injection(format!(
                "refused {:?} after {} actions",
                action,
                self.actions.len()
            )));
        }
        self.actions.push(action);
        Ok(())
    }
}

impl PointerDriver for RecordingPointer {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.record(PointerAction::MoveTo { x, y })?;
        self.position = (x, y);
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<(), InputError> {
        self.record(PointerAction::Click(button))
    }

    fn position(&self) -> Result<(i32, i32), InputError> {
        Ok(self.position)
    }
}

/// A rectangular screen area, e.g. the captured game window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRegion {
    /// Create a region
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Translate region-local coordinates to screen coordinates
    pub fn to_screen(&self, (x, y): (u32, u32)) -> (i32, i32) {
        (self.x + x as i32, self.y + y as i32)
    }

    /// Whether a screen point lies inside the region
    pub fn contains(&self, (x, y): (i32, i32)) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }

    /// Pull a screen point inside the region
    pub fn clamp(&self, (x, y): (i32, i32)) -> (i32, i32) {
        let max_x = self.x + (self.width as i32 - 1).max(0);
        let max_y = self.y + (self.height as i32 - 1).max(0);
        (x.clamp(self.x, max_x), y.clamp(self.y, max_y))
    }
}
