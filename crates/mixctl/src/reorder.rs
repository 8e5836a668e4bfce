//! Two-phase playlist move.
//!
//! Native drag and drop needs one gesture; touch devices get a tap-based
//! fallback where "move" arms the source row and the next popup toggle on
//! another row is taken as the drop target.

use mixctl_proto::protocol::CommandCode;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMove {
    #[default]
    Idle,
    Armed(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub source: u32,
    pub target: u32,
}

impl MoveRequest {
    pub fn code(&self) -> CommandCode {
        CommandCode::MOVE
    }

    pub fn arg(&self) -> String {
        format!("{}/{}", self.source, self.target)
    }
}

/// What a popup toggle means while the reorder protocol is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Not armed: the toggle is an ordinary popup toggle.
    Passthrough,
    /// Armed but the target is unusable; the queue should be refreshed.
    Aborted,
    Move(MoveRequest),
}

#[derive(Debug, Default)]
pub struct ReorderProtocol {
    state: DragMove,
}

impl ReorderProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragMove {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DragMove::Armed(_))
    }

    /// Arms the tap fallback with `source` as the row to move.  Re-arming
    /// replaces the previous source.
    pub fn arm(&mut self, source: u32) {
        debug!("reorder: armed with {}", source);
        self.state = DragMove::Armed(source);
    }

    /// Interprets a popup toggle on the row `target`.  `None` means the row
    /// has no stable position, like the current title or a search hit.
    pub fn tap(&mut self, target: Option<u32>) -> TapOutcome {
        let DragMove::Armed(source) = self.state else {
            return TapOutcome::Passthrough;
        };
        self.state = DragMove::Idle;
        match target {
            Some(target) if target != source => {
                debug!("reorder: move {} → {}", source, target);
                TapOutcome::Move(MoveRequest { source, target })
            }
            _ => {
                debug!("reorder: move of {} aborted", source);
                TapOutcome::Aborted
            }
        }
    }

    /// Native drop of `source` onto `target`.  Leaves the tap state alone.
    pub fn drop_native(&self, source: u32, target: u32, is_stream: bool) -> Option<MoveRequest> {
        if is_stream || source == target {
            return None;
        }
        Some(MoveRequest { source, target })
    }
}
