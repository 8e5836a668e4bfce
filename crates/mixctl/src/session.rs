//! Negotiated session state.  Only the status poller writes to it.

use mixctl_proto::protocol::{Catalog, StatusResponse};
use tracing::info;

/// Client id before the server assigned one.
pub const UNASSIGNED: i64 = -1;

#[derive(Debug, Clone)]
pub struct Session {
    pub protocol_version: i32,
    pub client_id: i64,
    /// `0` none, `>0` profile, `<0` channel.
    pub active_id: i32,
    pub is_stream: bool,
    pub fav_play: bool,
    pub fav_play_current: bool,
    /// Last profile/channel catalog received.
    pub catalog: Option<Catalog>,
}

/// Which boolean mode flags flipped in one reconcile.  `None` means unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeChange {
    pub stream: Option<bool>,
    pub fav_play: Option<bool>,
    pub fav_play_current: Option<bool>,
}

impl ModeChange {
    pub fn is_empty(&self) -> bool {
        self.stream.is_none() && self.fav_play.is_none() && self.fav_play_current.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub modes: ModeChange,
    /// `(old, new)` when the active profile/channel changed.
    pub active: Option<(i32, i32)>,
    /// `(old, new)` when the server handed out a new client id.
    pub client_id: Option<(i64, i64)>,
}

fn flip(slot: &mut bool, value: bool) -> Option<bool> {
    if *slot == value {
        None
    } else {
        *slot = value;
        Some(value)
    }
}

impl Session {
    pub fn new(protocol_version: i32) -> Self {
        Self {
            protocol_version,
            client_id: UNASSIGNED,
            active_id: 0,
            is_stream: false,
            fav_play: false,
            fav_play_current: false,
            catalog: None,
        }
    }

    pub fn reconcile(&mut self, resp: &StatusResponse) -> Reconciled {
        let modes = ModeChange {
            stream: flip(&mut self.is_stream, resp.is_stream()),
            fav_play: flip(&mut self.fav_play, resp.fav_play),
            fav_play_current: flip(&mut self.fav_play_current, resp.fav_play_current),
        };

        let active = if resp.active != self.active_id {
            let old = std::mem::replace(&mut self.active_id, resp.active);
            Some((old, resp.active))
        } else {
            None
        };

        // Only a positive id is authoritative.
        let client_id = if resp.client_id > 0 && resp.client_id != self.client_id {
            info!("session: client id {} → {}", self.client_id, resp.client_id);
            let old = std::mem::replace(&mut self.client_id, resp.client_id);
            Some((old, resp.client_id))
        } else {
            None
        };

        Reconciled {
            modes,
            active,
            client_id,
        }
    }

    /// Display name of the active profile or channel, if the catalog knows it.
    pub fn active_name(&self) -> Option<&str> {
        self.catalog.as_ref()?.name_of(self.active_id)
    }
}
