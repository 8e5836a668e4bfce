//! Contextual menus: at most one open at a time, choices bound to explicit
//! actions instead of view state.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use mixctl_proto::protocol::CommandCode;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopupId(String);

impl PopupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Letter prefix and row number: `q10` is `("q", Some(10))`.
    fn split(&self) -> (&str, Option<u64>) {
        let digits = self.0.find(|c: char| c.is_ascii_digit()).unwrap_or(self.0.len());
        let (prefix, number) = self.0.split_at(digits);
        (prefix, number.parse().ok())
    }
}

/// Orders by prefix, then numerically by row, so `q2` sorts before `q10`.
impl Ord for PopupId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.split()
            .cmp(&other.split())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for PopupId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PopupId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Row family a menu belongs to.  A render of one family replaces all of
/// its menus at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuScope {
    Queue,
    Search,
    Lists,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceAction {
    Command { code: CommandCode, arg: String },
    /// Arm the tap-based move with this title key.
    Move(u32),
    AddShortcut(i32),
    RemoveShortcut(i32),
    Download(u32),
}

impl ChoiceAction {
    pub fn command(code: CommandCode, arg: impl Into<String>) -> Self {
        ChoiceAction::Command {
            code,
            arg: arg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub action: ChoiceAction,
}

impl Choice {
    pub fn new(label: impl Into<String>, action: ChoiceAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub label: String,
    pub choices: Vec<Choice>,
    /// Stable playlist position of the row, used as a move target.
    pub position: Option<u32>,
    pub scope: MenuScope,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PopupError {
    #[error("unknown popup '{0}'")]
    UnknownPopup(PopupId),
    #[error("popup '{popup}' has no choice {index}")]
    UnknownChoice { popup: PopupId, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Opened { closed: Option<PopupId> },
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub action: ChoiceAction,
    /// Hide the originating row right away instead of waiting for a poll.
    pub hide_row: bool,
}

#[derive(Debug, Default)]
pub struct PopupCoordinator {
    open: Option<PopupId>,
    menus: HashMap<PopupId, Menu>,
    hidden: HashSet<PopupId>,
}

impl PopupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_id(&self) -> Option<&PopupId> {
        self.open.as_ref()
    }

    pub fn menu(&self, id: &PopupId) -> Option<&Menu> {
        self.menus.get(id)
    }

    /// Registered menus of one scope, ordered by id.
    pub fn menus_in(&self, scope: MenuScope) -> Vec<(&PopupId, &Menu)> {
        let mut menus: Vec<_> = self
            .menus
            .iter()
            .filter(|(_, m)| m.scope == scope)
            .collect();
        menus.sort_by(|a, b| a.0.cmp(b.0));
        menus
    }

    /// Opens `id`, closing whatever else was open.  Returns the closed id.
    pub fn open(&mut self, id: &PopupId) -> Result<Option<PopupId>, PopupError> {
        if !self.menus.contains_key(id) || self.hidden.contains(id) {
            return Err(PopupError::UnknownPopup(id.clone()));
        }
        if self.open.as_ref() == Some(id) {
            return Ok(None);
        }
        let closed = self.open.replace(id.clone());
        debug!("popup: open {} (closed {:?})", id, closed);
        Ok(closed)
    }

    /// Closes `id` only if it is the open one.
    pub fn close(&mut self, id: &PopupId) -> bool {
        if self.open.as_ref() == Some(id) {
            self.open = None;
            true
        } else {
            false
        }
    }

    pub fn toggle(&mut self, id: &PopupId) -> Result<Toggle, PopupError> {
        if self.close(id) {
            return Ok(Toggle::Closed);
        }
        let closed = self.open(id)?;
        Ok(Toggle::Opened { closed })
    }

    /// Picks choice `index` of popup `id` and closes it.  Selecting from a
    /// popup that is not open is allowed; the row may have been re-rendered
    /// under the user.
    pub fn select(&mut self, id: &PopupId, index: usize) -> Result<Selection, PopupError> {
        let menu = self
            .menus
            .get(id)
            .ok_or_else(|| PopupError::UnknownPopup(id.clone()))?;
        let choice = menu
            .choices
            .get(index)
            .ok_or_else(|| PopupError::UnknownChoice {
                popup: id.clone(),
                index,
            })?;
        let action = choice.action.clone();
        let hide_row = matches!(action, ChoiceAction::Command { .. });

        self.close(id);
        if hide_row {
            self.hidden.insert(id.clone());
        }
        Ok(Selection { action, hide_row })
    }

    /// Replaces all menus of `scope`.  Returns the open popup if it vanished
    /// with the old rows.
    pub fn rebind(
        &mut self,
        scope: MenuScope,
        menus: impl IntoIterator<Item = (PopupId, Menu)>,
    ) -> Option<PopupId> {
        let stale: Vec<PopupId> = self
            .menus
            .iter()
            .filter(|(_, m)| m.scope == scope)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.menus.remove(id);
            self.hidden.remove(id);
        }
        for (id, mut menu) in menus {
            menu.scope = scope;
            self.menus.insert(id, menu);
        }

        match &self.open {
            Some(id) if !self.menus.contains_key(id) => self.open.take(),
            _ => None,
        }
    }

    /// Position of a row, `None` for unknown rows or rows without one.
    pub fn position(&self, id: &PopupId) -> Option<u32> {
        self.menus.get(id)?.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(position: Option<u32>) -> Menu {
        Menu {
            label: "row".into(),
            choices: vec![
                Choice::new("fav", ChoiceAction::command(CommandCode(0x1009), "5")),
                Choice::new("move", ChoiceAction::Move(5)),
            ],
            position,
            scope: MenuScope::Queue,
        }
    }

    fn coordinator() -> PopupCoordinator {
        let mut p = PopupCoordinator::new();
        p.rebind(
            MenuScope::Queue,
            [("a".into(), menu(Some(1))), ("b".into(), menu(Some(2)))],
        );
        p
    }

    #[test]
    fn opening_b_closes_a() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        let b = PopupId::new("b");
        assert_eq!(p.open(&a).unwrap(), None);
        assert_eq!(p.open(&b).unwrap(), Some(a.clone()));
        assert_eq!(p.open_id(), Some(&b));
    }

    #[test]
    fn close_ignores_other_ids() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        p.open(&a).unwrap();
        assert!(!p.close(&PopupId::new("b")));
        assert_eq!(p.open_id(), Some(&a));
        assert!(p.close(&a));
        assert_eq!(p.open_id(), None);
    }

    #[test]
    fn toggle_flips() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        assert_eq!(p.toggle(&a).unwrap(), Toggle::Opened { closed: None });
        assert_eq!(p.toggle(&a).unwrap(), Toggle::Closed);
        assert!(matches!(
            p.toggle(&PopupId::new("zz")),
            Err(PopupError::UnknownPopup(_))
        ));
    }

    #[test]
    fn command_choice_closes_and_hides() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        p.open(&a).unwrap();
        let sel = p.select(&a, 0).unwrap();
        assert!(sel.hide_row);
        assert_eq!(
            sel.action,
            ChoiceAction::command(CommandCode(0x1009), "5")
        );
        assert_eq!(p.open_id(), None);
        assert!(p.open(&a).is_err());
    }

    #[test]
    fn local_choice_keeps_row() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        let sel = p.select(&a, 1).unwrap();
        assert!(!sel.hide_row);
        assert!(p.open(&a).is_ok());
        assert_eq!(
            p.select(&a, 9),
            Err(PopupError::UnknownChoice {
                popup: a.clone(),
                index: 9
            })
        );
    }

    #[test]
    fn rebind_drops_vanished_open_popup() {
        let mut p = coordinator();
        let b = PopupId::new("b");
        p.open(&b).unwrap();
        let closed = p.rebind(MenuScope::Queue, [("a".into(), menu(None))]);
        assert_eq!(closed, Some(b));
        assert_eq!(p.open_id(), None);
        assert_eq!(p.position(&PopupId::new("a")), None);
    }

    #[test]
    fn rebind_keeps_other_scopes() {
        let mut p = coordinator();
        let a = PopupId::new("a");
        p.open(&a).unwrap();
        let mut search = menu(None);
        search.scope = MenuScope::Search;
        assert_eq!(p.rebind(MenuScope::Search, [("s".into(), search)]), None);
        assert_eq!(p.open_id(), Some(&a));
        assert_eq!(p.menus_in(MenuScope::Queue).len(), 2);
        assert_eq!(p.menus_in(MenuScope::Search).len(), 1);
    }

    #[test]
    fn rows_order_numerically() {
        let mut p = PopupCoordinator::new();
        p.rebind(
            MenuScope::Queue,
            ["q10", "q2", "q1", "q9"].map(|id| (PopupId::new(id), menu(None))),
        );
        let ids: Vec<&str> = p
            .menus_in(MenuScope::Queue)
            .into_iter()
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(ids, ["q1", "q2", "q9", "q10"]);
        assert!(PopupId::new("ch3") < PopupId::new("pro1"));
        assert!(PopupId::new("sc") < PopupId::new("sc1"));
    }
}
