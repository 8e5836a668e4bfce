//! User intents: everything the view can ask the core to do.

use mixctl_proto::protocol::{CommandCode, UpdateMask};

use crate::popup::PopupId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command { code: CommandCode, arg: String },
    /// Answer to the pending confirmation prompt.
    Confirm(bool),
    Refresh(UpdateMask),
    /// Tap on a row.  Doubles as the drop target while a move is armed.
    TogglePopup(PopupId),
    OpenPopup(PopupId),
    ClosePopup(PopupId),
    Select { popup: PopupId, choice: usize },
    /// Native drag and drop of one queue row onto another, by title key.
    DragDrop { source: u32, target: u32 },
    /// Answer to the disconnect prompt.  `true` reloads from scratch.
    Retry(bool),
    AddShortcut(i32),
    RemoveShortcut(i32),
    /// `0` is the current title.
    Download(u32),
}

impl Intent {
    pub fn command(code: CommandCode, arg: impl Into<String>) -> Self {
        Intent::Command {
            code,
            arg: arg.into(),
        }
    }
}
