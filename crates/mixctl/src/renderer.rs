//! The view side of the client.
//!
//! The core hands a [`ViewRenderer`] decoded, validated data and never asks
//! anything back.  Only the five payload callbacks are mandatory; the rest
//! default to doing nothing so a minimal view stays small.

use mixctl_proto::protocol::{
    Catalog, MarkLists, PlayerState, SearchResults, ServerMessage, StatusResponse, Title,
};

use crate::poller::DisconnectReason;
use crate::popup::{Menu, PopupId};
use crate::session::{ModeChange, Session};

/// One rendered row.  Rows without a popup are display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub popup: Option<PopupId>,
    pub label: String,
}

impl Row {
    pub fn plain(label: impl Into<String>) -> Self {
        Self {
            popup: None,
            label: label.into(),
        }
    }

    pub fn from_menu(id: &PopupId, menu: &Menu) -> Self {
        Self {
            popup: Some(id.clone()),
            label: menu.label.clone(),
        }
    }
}

/// Sent on every successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerUpdate {
    pub current: Option<Title>,
    pub prev: Option<Title>,
    pub next: Option<Title>,
    /// Percent, `-1` when the player has no mixer control.
    pub volume: i32,
    pub percent: u32,
    pub playtime_sec: u64,
    pub remtime_sec: u64,
    pub state: PlayerState,
    pub active_id: i32,
    pub active_name: Option<String>,
    pub is_stream: bool,
    pub fav_play: bool,
}

impl PlayerUpdate {
    pub fn new(resp: &StatusResponse, session: &Session) -> Self {
        Self {
            current: resp.current.clone(),
            prev: resp.prev.first().cloned(),
            next: resp.next.first().cloned(),
            volume: resp.volume,
            percent: resp.percent,
            playtime_sec: resp.playtime_sec,
            remtime_sec: resp.remtime_sec,
            state: resp.player_state(),
            active_id: session.active_id,
            active_name: session.active_name().map(str::to_string),
            is_stream: session.is_stream,
            fav_play: session.fav_play,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullUpdate {
    pub prev: Vec<Title>,
    pub current: Option<Title>,
    pub next: Vec<Title>,
    /// Display order: previous titles oldest first, current, upcoming.
    pub rows: Vec<Row>,
    pub is_stream: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchUpdate {
    pub results: SearchResults,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListsUpdate {
    pub lists: MarkLists,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub catalog: Catalog,
    pub active_id: i32,
    pub fav_play: bool,
    pub shortcuts: Vec<i32>,
    pub rows: Vec<Row>,
}

impl ConfigUpdate {
    pub fn active_label(&self) -> String {
        match self.catalog.name_of(self.active_id) {
            Some(name) if self.active_id > 0 && self.fav_play => {
                format!("Playing favplay {}", name)
            }
            Some(name) if self.active_id > 0 => format!("Playing profile {}", name),
            Some(name) => format!("Tuned in to {}", name),
            None => "No active profile/channel".to_string(),
        }
    }
}

/// Local, transient user feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The daemon answered 503.
    ServerBusy,
    /// A command was refused before reaching the network.
    Rejected(String),
    Warning(String),
    Info(String),
}

pub trait ViewRenderer: Send {
    fn player(&mut self, update: &PlayerUpdate);

    fn titles(&mut self, update: &FullUpdate);

    fn search(&mut self, update: &SearchUpdate);

    fn lists(&mut self, update: &ListsUpdate);

    fn config(&mut self, update: &ConfigUpdate);

    /// Only called when a flag actually flipped.
    fn mode_changed(&mut self, _change: &ModeChange) {}

    /// A guarded command is outstanding.
    fn busy(&mut self, _busy: bool) {}

    fn notice(&mut self, _notice: &Notice) {}

    fn message(&mut self, _message: &ServerMessage) {}

    /// Answer with `Intent::Confirm`.
    fn confirm(&mut self, _prompt: &str) {}

    fn connected(&mut self) {}

    /// Answer with `Intent::Retry` when `retry_offered`.
    fn disconnected(&mut self, _reason: &DisconnectReason, _retry_offered: bool) {}

    fn popup_opened(&mut self, _id: &PopupId, _menu: &Menu) {}

    fn popup_closed(&mut self, _id: &PopupId) {}

    fn row_hidden(&mut self, _id: &PopupId) {}

    fn move_armed(&mut self, _source: u32) {}

    fn move_finished(&mut self, _moved: bool) {}

    /// Fire-and-forget navigation, e.g. a title download.
    fn navigate(&mut self, _url: &str) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every callback as a short line, in call order.
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub events: Vec<String>,
        pub players: Vec<PlayerUpdate>,
        pub titles: Vec<FullUpdate>,
        pub searches: Vec<SearchUpdate>,
        pub configs: Vec<ConfigUpdate>,
    }

    impl Recorder {
        pub fn count(&self, prefix: &str) -> usize {
            self.events.iter().filter(|e| e.starts_with(prefix)).count()
        }

        pub fn last(&self) -> Option<&str> {
            self.events.last().map(String::as_str)
        }
    }

    impl ViewRenderer for Recorder {
        fn player(&mut self, update: &PlayerUpdate) {
            self.events.push("player".into());
            self.players.push(update.clone());
        }

        fn titles(&mut self, update: &FullUpdate) {
            self.events.push("titles".into());
            self.titles.push(update.clone());
        }

        fn search(&mut self, update: &SearchUpdate) {
            self.events.push("search".into());
            self.searches.push(update.clone());
        }

        fn lists(&mut self, _update: &ListsUpdate) {
            self.events.push("lists".into());
        }

        fn config(&mut self, update: &ConfigUpdate) {
            self.events.push("config".into());
            self.configs.push(update.clone());
        }

        fn mode_changed(&mut self, change: &ModeChange) {
            self.events.push(format!("mode {:?}", change.stream));
        }

        fn busy(&mut self, busy: bool) {
            self.events.push(format!("busy {}", busy));
        }

        fn notice(&mut self, notice: &Notice) {
            self.events.push(format!("notice {:?}", notice));
        }

        fn message(&mut self, message: &ServerMessage) {
            self.events.push(format!("message {:?}", message));
        }

        fn confirm(&mut self, prompt: &str) {
            self.events.push(format!("confirm {}", prompt));
        }

        fn connected(&mut self) {
            self.events.push("connected".into());
        }

        fn disconnected(&mut self, reason: &DisconnectReason, retry_offered: bool) {
            self.events
                .push(format!("disconnected {} retry={}", reason, retry_offered));
        }

        fn popup_opened(&mut self, id: &PopupId, _menu: &Menu) {
            self.events.push(format!("open {}", id));
        }

        fn popup_closed(&mut self, id: &PopupId) {
            self.events.push(format!("close {}", id));
        }

        fn row_hidden(&mut self, id: &PopupId) {
            self.events.push(format!("hide {}", id));
        }

        fn move_armed(&mut self, source: u32) {
            self.events.push(format!("armed {}", source));
        }

        fn move_finished(&mut self, moved: bool) {
            self.events.push(format!("moved {}", moved));
        }

        fn navigate(&mut self, url: &str) {
            self.events.push(format!("navigate {}", url));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(active_id: i32, fav_play: bool) -> ConfigUpdate {
        ConfigUpdate {
            catalog: Catalog {
                profile: vec!["mixed".into()],
                sname: vec!["fm4".into()],
                debug: 0,
            },
            active_id,
            fav_play,
            shortcuts: vec![],
            rows: vec![],
        }
    }

    #[test]
    fn active_label_variants() {
        assert_eq!(update(1, false).active_label(), "Playing profile mixed");
        assert_eq!(update(1, true).active_label(), "Playing favplay mixed");
        assert_eq!(update(-1, true).active_label(), "Tuned in to fm4");
        assert_eq!(update(0, false).active_label(), "No active profile/channel");
        assert_eq!(update(7, false).active_label(), "No active profile/channel");
    }
}
