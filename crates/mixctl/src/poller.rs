//! Status polling state machine.
//!
//! ```text
//!  Configuring ──config ok──▶ Polling ──failure──▶ Disconnected
//!                                 ▲                     │
//!                                 └──── user retry ─────┘  (new runtime)
//! ```
//!
//! Requests are built by [`StatusPoller::next_request`] and their replies fed
//! back through [`StatusPoller::complete`], in whatever order they arrive.
//! The poller is the only component that declares the client disconnected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mixctl_proto::codec::{self, DecodeError, WireRequest};
use mixctl_proto::protocol::{CommandCode, ServerMessage, StatusResponse, UpdateMask};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{policy, CommandDispatcher, PendingCommand};
use crate::menus;
use crate::popup::{Menu, MenuScope, PopupCoordinator, PopupId};
use crate::renderer::{
    ConfigUpdate, FullUpdate, ListsUpdate, Notice, PlayerUpdate, Row, SearchUpdate, ViewRenderer,
};
use crate::session::Session;
use crate::transport::Reply;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectReason {
    #[error("connection lost: {detail}")]
    Transport { detail: String },
    #[error("protocol mismatch: client speaks version {expected}, server sent {found}")]
    ProtocolMismatch { expected: i32, found: i32 },
    #[error("unexpected reply {status} {context}")]
    UnexpectedStatus { status: u16, context: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl DisconnectReason {
    /// A protocol mismatch will not go away by reconnecting.
    pub fn offers_retry(&self) -> bool {
        !matches!(self, DisconnectReason::ProtocolMismatch { .. })
    }
}

impl From<DecodeError> for DisconnectReason {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::VersionMismatch { expected, found } => {
                DisconnectReason::ProtocolMismatch { expected, found }
            }
            DecodeError::Malformed(detail) => DisconnectReason::Malformed(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    Configuring,
    Polling,
    Disconnected(DisconnectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollKind {
    Config,
    /// Status request carrying the mask taken when it was built.
    Status(UpdateMask),
    /// The queued command, sent in place of a status request.
    Queued(PendingCommand),
}

/// One outstanding poll exchange.
#[derive(Debug)]
pub struct PollRequest {
    kind: PollKind,
    epoch: u64,
    wire: WireRequest,
}

impl PollRequest {
    pub fn kind(&self) -> &PollKind {
        &self.kind
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn wire(&self) -> &WireRequest {
        &self.wire
    }
}

/// Non-reentrant section around "apply a reply to the view".
#[derive(Debug, Clone, Default)]
pub struct ApplyGate(Arc<AtomicBool>);

#[must_use]
#[derive(Debug)]
pub struct ApplyGuard(Arc<AtomicBool>);

impl ApplyGate {
    pub fn try_enter(&self) -> Option<ApplyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ApplyGuard(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for ApplyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a reply may touch besides the poller itself.
pub struct ApplyContext<'a> {
    pub session: &'a mut Session,
    pub popups: &'a mut PopupCoordinator,
    pub shortcuts: &'a [i32],
    pub renderer: &'a mut dyn ViewRenderer,
}

/// What a completed poll exchange amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Configured,
    /// Player status plus these update types were rendered.
    Rendered(UpdateMask),
    /// Apply already in progress; the types were put back into the mask.
    Deferred(UpdateMask),
    NothingNew,
    ServerBusy,
    QueuedAccepted(CommandCode),
    /// Entered Disconnected with this exchange.
    Failed(DisconnectReason),
    /// Reply from an older runtime, or arriving while disconnected.
    Ignored,
}

#[derive(Debug)]
pub struct StatusPoller {
    state: PollerState,
    mask: UpdateMask,
    expected_version: i32,
    epoch: u64,
    config_outstanding: bool,
    gate: ApplyGate,
}

impl StatusPoller {
    pub fn new(expected_version: i32, epoch: u64) -> Self {
        Self {
            state: PollerState::Configuring,
            mask: UpdateMask::FULL,
            expected_version,
            epoch,
            config_outstanding: false,
            gate: ApplyGate::default(),
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.state, PollerState::Disconnected(_))
    }

    pub fn mask(&self) -> UpdateMask {
        self.mask
    }

    #[cfg(test)]
    pub(crate) fn gate(&self) -> &ApplyGate {
        &self.gate
    }

    /// Ask for update types on the next status request.
    pub fn request(&mut self, mask: UpdateMask) {
        self.mask |= mask;
    }

    /// Builds the request for this tick, if any.
    pub fn next_request(
        &mut self,
        dispatcher: &mut CommandDispatcher,
        session: &Session,
    ) -> Option<PollRequest> {
        let kind = match self.state {
            PollerState::Disconnected(_) => return None,
            PollerState::Configuring if self.config_outstanding => return None,
            PollerState::Configuring => {
                self.config_outstanding = true;
                PollKind::Config
            }
            PollerState::Polling => match dispatcher.take_queued() {
                Some(cmd) => PollKind::Queued(cmd),
                None => PollKind::Status(std::mem::take(&mut self.mask)),
            },
        };

        let client_id = session.client_id;
        let wire = match &kind {
            PollKind::Config => WireRequest::Config { client_id },
            PollKind::Status(mask) => WireRequest::Status {
                mask: *mask,
                client_id,
            },
            PollKind::Queued(cmd) => WireRequest::Command {
                code: cmd.code,
                arg: cmd.arg.clone(),
                client_id,
            },
        };
        Some(PollRequest {
            kind,
            epoch: self.epoch,
            wire,
        })
    }

    /// Enters Disconnected.  Only the first failure is reported.
    pub fn fail(&mut self, reason: DisconnectReason, renderer: &mut dyn ViewRenderer) -> PollEvent {
        if self.is_disconnected() {
            debug!("poller: already disconnected, dropping {}", reason);
            return PollEvent::Ignored;
        }
        error!("poller: disconnected: {}", reason);
        renderer.disconnected(&reason, reason.offers_retry());
        self.state = PollerState::Disconnected(reason.clone());
        PollEvent::Failed(reason)
    }

    pub fn complete(
        &mut self,
        request: PollRequest,
        reply: &Reply,
        cx: &mut ApplyContext<'_>,
    ) -> PollEvent {
        if request.epoch != self.epoch {
            debug!("poller: discarding reply from epoch {}", request.epoch);
            return PollEvent::Ignored;
        }
        if self.is_disconnected() {
            if let PollKind::Config = request.kind {
                self.config_outstanding = false;
            }
            return PollEvent::Ignored;
        }

        match request.kind {
            PollKind::Config => self.complete_config(reply, cx),
            PollKind::Status(mask) => self.complete_status(mask, reply, cx),
            PollKind::Queued(cmd) => self.complete_queued(cmd, reply, cx),
        }
    }

    fn complete_config(&mut self, reply: &Reply, cx: &mut ApplyContext<'_>) -> PollEvent {
        self.config_outstanding = false;
        match reply.status {
            200 => match codec::decode_config(&reply.body, self.expected_version) {
                Ok(catalog) => {
                    info!(
                        "poller: configured with {} profiles, {} channels",
                        catalog.profile.len(),
                        catalog.sname.len()
                    );
                    cx.session.catalog = Some(catalog);
                    self.state = PollerState::Polling;
                    cx.renderer.connected();
                    self.render_config(cx);
                    PollEvent::Configured
                }
                Err(e) => self.fail(e.into(), cx.renderer),
            },
            204 => PollEvent::NothingNew,
            503 => {
                cx.renderer.notice(&Notice::ServerBusy);
                PollEvent::ServerBusy
            }
            0 => self.fail(
                DisconnectReason::Transport {
                    detail: reply.body.clone(),
                },
                cx.renderer,
            ),
            status => self.fail(
                DisconnectReason::UnexpectedStatus {
                    status,
                    context: "fetching configuration".into(),
                },
                cx.renderer,
            ),
        }
    }

    fn complete_status(
        &mut self,
        requested: UpdateMask,
        reply: &Reply,
        cx: &mut ApplyContext<'_>,
    ) -> PollEvent {
        match reply.status {
            200 => match codec::decode(&reply.body, self.expected_version) {
                Ok(resp) => self.apply(resp, cx),
                Err(e) => self.fail(e.into(), cx.renderer),
            },
            204 => {
                self.restore(requested);
                PollEvent::NothingNew
            }
            503 => {
                self.restore(requested);
                cx.renderer.notice(&Notice::ServerBusy);
                PollEvent::ServerBusy
            }
            0 => {
                self.restore(requested);
                self.fail(
                    DisconnectReason::Transport {
                        detail: reply.body.clone(),
                    },
                    cx.renderer,
                )
            }
            status => self.fail(
                DisconnectReason::UnexpectedStatus {
                    status,
                    context: "polling status".into(),
                },
                cx.renderer,
            ),
        }
    }

    fn complete_queued(
        &mut self,
        cmd: PendingCommand,
        reply: &Reply,
        cx: &mut ApplyContext<'_>,
    ) -> PollEvent {
        match reply.status {
            204 => {
                info!("poller: {} accepted", cmd.code.name());
                self.request(policy(cmd.code).refresh);
                PollEvent::QueuedAccepted(cmd.code)
            }
            // Some daemons answer a queued command with a full status.
            200 => {
                self.request(policy(cmd.code).refresh);
                match codec::decode(&reply.body, self.expected_version) {
                    Ok(resp) => self.apply(resp, cx),
                    Err(e) => self.fail(e.into(), cx.renderer),
                }
            }
            503 => {
                warn!("poller: server busy, {} dropped", cmd.code.name());
                cx.renderer.notice(&Notice::ServerBusy);
                PollEvent::ServerBusy
            }
            0 => self.fail(
                DisconnectReason::Transport {
                    detail: reply.body.clone(),
                },
                cx.renderer,
            ),
            status => self.fail(
                DisconnectReason::UnexpectedStatus {
                    status,
                    context: format!("after sending 0x{}", cmd.code),
                },
                cx.renderer,
            ),
        }
    }

    fn restore(&mut self, requested: UpdateMask) {
        if !requested.is_stat() {
            debug!("poller: restoring mask {}", requested);
            self.mask |= requested;
        }
    }

    fn apply(&mut self, resp: StatusResponse, cx: &mut ApplyContext<'_>) -> PollEvent {
        let types = resp.type_mask;
        let gate = self.gate.clone();
        let Some(_guard) = gate.try_enter() else {
            debug!("poller: apply in progress, deferring {}", types);
            self.mask |= types;
            return PollEvent::Deferred(types);
        };

        let changes = cx.session.reconcile(&resp);
        if !changes.modes.is_empty() {
            cx.renderer.mode_changed(&changes.modes);
            // Queue menus differ between stream and library mode.
            if changes.modes.stream.is_some() && !types.contains(UpdateMask::TITLES) {
                self.mask |= UpdateMask::TITLES;
            }
        }
        if let Some((old, new)) = changes.active {
            info!("poller: active {} → {}", old, new);
            if old != 0 && !types.contains(UpdateMask::CONFIG) {
                self.mask |= UpdateMask::CONFIG;
            }
        }

        cx.renderer.player(&PlayerUpdate::new(&resp, cx.session));
        if let Some(message) = ServerMessage::parse(&resp.message) {
            match &message {
                ServerMessage::Alert(text) => warn!("poller: server alert: {}", text),
                other => debug!("poller: server message: {:?}", other),
            }
            cx.renderer.message(&message);
        }

        if types.contains(UpdateMask::TITLES) {
            let is_stream = cx.session.is_stream;
            let queue = menus::queue(&resp.prev, resp.current.as_ref(), &resp.next, is_stream);
            self.rebind(MenuScope::Queue, queue, cx);
            let rows = if is_stream {
                resp.prev
                    .iter()
                    .rev()
                    .chain(resp.current.iter())
                    .chain(resp.next.iter())
                    .map(|t| Row::plain(t.display()))
                    .collect()
            } else {
                registered_rows(MenuScope::Queue, cx)
            };
            cx.renderer.titles(&FullUpdate {
                prev: resp.prev.clone(),
                current: resp.current.clone(),
                next: resp.next.clone(),
                rows,
                is_stream,
            });
        }

        if types.contains(UpdateMask::RESULT) {
            let found = menus::search(&resp.results, cx.session.fav_play);
            self.rebind(MenuScope::Search, found, cx);
            let rows = registered_rows(MenuScope::Search, cx);
            cx.renderer.search(&SearchUpdate {
                results: resp.results.clone(),
                rows,
            });
        }

        if types.contains(UpdateMask::LISTS) {
            let entries = menus::lists(&resp.lists);
            let rows = entries
                .iter()
                .map(|(id, m)| Row::from_menu(id, m))
                .chain(resp.lists.dbllist.iter().map(|d| Row::plain(d.as_str())))
                .collect();
            self.rebind(MenuScope::Lists, entries, cx);
            cx.renderer.lists(&ListsUpdate {
                lists: resp.lists.clone(),
                rows,
            });
        }

        if types.contains(UpdateMask::CONFIG) {
            cx.session.catalog = Some(resp.catalog.clone());
            self.render_config(cx);
        }

        PollEvent::Rendered(types)
    }

    fn rebind(
        &self,
        scope: MenuScope,
        menus: Vec<(PopupId, Menu)>,
        cx: &mut ApplyContext<'_>,
    ) {
        if let Some(closed) = cx.popups.rebind(scope, menus) {
            cx.renderer.popup_closed(&closed);
        }
    }

    /// Renders the cached catalog with the current active id and shortcuts.
    pub fn render_config(&self, cx: &mut ApplyContext<'_>) {
        let Some(catalog) = cx.session.catalog.clone() else {
            return;
        };
        let entries = menus::catalog(&catalog, cx.session.active_id, cx.shortcuts);
        let rows = entries.iter().map(|(id, m)| Row::from_menu(id, m)).collect();
        self.rebind(MenuScope::Catalog, entries, cx);
        cx.renderer.config(&ConfigUpdate {
            catalog,
            active_id: cx.session.active_id,
            fav_play: cx.session.fav_play,
            shortcuts: cx.shortcuts.to_vec(),
            rows,
        });
    }
}

/// Rows of `scope` as registered, in display order.
fn registered_rows(scope: MenuScope, cx: &ApplyContext<'_>) -> Vec<Row> {
    cx.popups
        .menus_in(scope)
        .into_iter()
        .map(|(id, m)| Row::from_menu(id, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatch;
    use crate::renderer::testing::Recorder;
    use mixctl_proto::protocol::Range;

    struct Fixture {
        poller: StatusPoller,
        dispatcher: CommandDispatcher,
        session: Session,
        popups: PopupCoordinator,
        renderer: Recorder,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                poller: StatusPoller::new(7, 0),
                dispatcher: CommandDispatcher::new(0),
                session: Session::new(7),
                popups: PopupCoordinator::new(),
                renderer: Recorder::default(),
            }
        }

        fn polling() -> Self {
            let mut f = Self::new();
            let req = f.next().unwrap();
            let ev = f.complete(req, Reply::ok(r#"{"version":7,"profile":["mixed"],"sname":[]}"#));
            assert_eq!(ev, PollEvent::Configured);
            f
        }

        fn next(&mut self) -> Option<PollRequest> {
            self.poller.next_request(&mut self.dispatcher, &self.session)
        }

        fn complete(&mut self, req: PollRequest, reply: Reply) -> PollEvent {
            let mut cx = ApplyContext {
                session: &mut self.session,
                popups: &mut self.popups,
                shortcuts: &[],
                renderer: &mut self.renderer,
            };
            self.poller.complete(req, &reply, &mut cx)
        }
    }

    fn status(types: u8) -> Reply {
        Reply::ok(format!(
            r#"{{"version":7,"type":{},"current":{{"key":3,"artist":"A","title":"B"}},
                "prev":[],"next":[{{"key":4,"title":"C"}}],"titles":[{{"key":9,"title":"Hit"}}],
                "artists":[],"albums":[],"albart":[],"dnplist":[],"favlist":[],"dbllist":[],
                "profile":["mixed"],"sname":[],"clientid":5}}"#,
            types
        ))
    }

    #[test]
    fn configuring_keeps_one_request_outstanding() {
        let mut f = Fixture::new();
        let req = f.next().unwrap();
        assert_eq!(req.kind(), &PollKind::Config);
        assert!(f.next().is_none());
        assert_eq!(f.complete(req, Reply::busy()), PollEvent::ServerBusy);
        assert_eq!(f.poller.state(), &PollerState::Configuring);
        // The next tick retries.
        assert_eq!(f.next().unwrap().kind(), &PollKind::Config);
    }

    #[test]
    fn config_moves_to_polling_and_renders_catalog() {
        let f = Fixture::polling();
        assert_eq!(f.poller.state(), &PollerState::Polling);
        assert_eq!(f.renderer.count("config"), 1);
        assert_eq!(f.session.catalog.as_ref().unwrap().profile, ["mixed"]);
    }

    #[test]
    fn first_status_asks_for_everything_then_stat() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        assert_eq!(req.kind(), &PollKind::Status(UpdateMask::FULL));
        assert!(f.poller.mask().is_stat());
        assert_eq!(f.next().unwrap().kind(), &PollKind::Status(UpdateMask::STAT));
    }

    #[test]
    fn render_order_player_first() {
        let mut f = Fixture::polling();
        f.renderer.events.clear();
        let req = f.next().unwrap();
        let ev = f.complete(req, status(1 | 2 | 4 | 8));
        assert_eq!(ev, PollEvent::Rendered(UpdateMask::from_bits(15)));
        let renders: Vec<&str> = f
            .renderer
            .events
            .iter()
            .map(String::as_str)
            .filter(|e| ["player", "titles", "search", "lists", "config"].contains(e))
            .collect();
        assert_eq!(renders, ["player", "titles", "search", "lists", "config"]);
        assert_eq!(f.session.client_id, 5);
    }

    #[test]
    fn transport_failure_restores_mask_and_fails_once() {
        let mut f = Fixture::polling();
        let a = f.next().unwrap();
        let b = f.next().unwrap();
        let first = f.complete(a, Reply::transport_failure("reset"));
        assert!(matches!(first, PollEvent::Failed(DisconnectReason::Transport { .. })));
        assert_eq!(f.poller.mask(), UpdateMask::FULL);
        assert_eq!(f.complete(b, Reply::transport_failure("reset")), PollEvent::Ignored);
        assert_eq!(f.renderer.count("disconnected"), 1);
        assert!(f.next().is_none());
    }

    #[test]
    fn version_mismatch_is_fatal_without_retry() {
        let mut f = Fixture::polling();
        let reqs: Vec<_> = (0..3).map(|_| f.next().unwrap()).collect();
        let mut failed = 0;
        for req in reqs {
            if let PollEvent::Failed(reason) =
                f.complete(req, Reply::ok(r#"{"version":6,"type":0}"#))
            {
                assert_eq!(
                    reason,
                    DisconnectReason::ProtocolMismatch {
                        expected: 7,
                        found: 6
                    }
                );
                assert!(!reason.offers_retry());
                failed += 1;
            }
        }
        assert_eq!(failed, 1);
        assert_eq!(
            f.renderer.last(),
            Some("disconnected protocol mismatch: client speaks version 7, server sent 6 retry=false")
        );
    }

    #[test]
    fn busy_status_restores_mask() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        assert_eq!(f.complete(req, Reply::busy()), PollEvent::ServerBusy);
        assert_eq!(f.poller.mask(), UpdateMask::FULL);
        assert_eq!(f.poller.state(), &PollerState::Polling);
    }

    #[test]
    fn queued_command_replaces_status_once() {
        let mut f = Fixture::polling();
        f.session.client_id = 5;
        let search = CommandCode::SEARCH.with(Range::Title);
        assert!(matches!(
            f.dispatcher.dispatch(search, "abba", &f.session).unwrap(),
            Dispatch::Queued
        ));
        let req = f.next().unwrap();
        assert!(matches!(req.kind(), PollKind::Queued(cmd) if cmd.code == search));
        assert_eq!(
            req.wire(),
            &WireRequest::Command {
                code: search,
                arg: "abba".into(),
                client_id: 5
            }
        );
        // The mask was not consumed by the queued request.
        assert_eq!(f.poller.mask(), UpdateMask::FULL);
        assert_eq!(f.complete(req, Reply::no_content()), PollEvent::QueuedAccepted(search));
        assert!(f.dispatcher.queued().is_none());
        let next = f.next().unwrap();
        assert_eq!(
            next.kind(),
            &PollKind::Status(UpdateMask::FULL | UpdateMask::RESULT)
        );
    }

    #[test]
    fn overlapping_polls_both_render_in_receipt_order() {
        let mut f = Fixture::polling();
        let t0 = f.next().unwrap();
        f.poller.request(UpdateMask::RESULT);
        let t500 = f.next().unwrap();
        assert_eq!(t500.kind(), &PollKind::Status(UpdateMask::RESULT));
        f.renderer.events.clear();

        assert_eq!(f.complete(t0, status(1)), PollEvent::Rendered(UpdateMask::TITLES));
        assert_eq!(f.complete(t500, status(2)), PollEvent::Rendered(UpdateMask::RESULT));
        let renders: Vec<&str> = f
            .renderer
            .events
            .iter()
            .map(String::as_str)
            .filter(|e| ["player", "titles", "search"].contains(e))
            .collect();
        assert_eq!(renders, ["player", "titles", "player", "search"]);
    }

    #[test]
    fn busy_gate_defers_instead_of_rendering() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        f.renderer.events.clear();
        let gate = f.poller.gate().clone();
        let held = gate.try_enter().unwrap();

        let ev = f.complete(req, status(2));
        assert_eq!(ev, PollEvent::Deferred(UpdateMask::RESULT));
        assert_eq!(f.renderer.count("search"), 0);
        assert!(f.poller.mask().contains(UpdateMask::RESULT));

        drop(held);
        assert!(!gate.is_busy());
        let again = f.next().unwrap();
        assert_eq!(f.complete(again, status(2)), PollEvent::Rendered(UpdateMask::RESULT));
        assert_eq!(f.renderer.count("search"), 1);
    }

    #[test]
    fn active_change_without_config_requests_config() {
        let mut f = Fixture::polling();
        f.session.active_id = 2;
        let req = f.next().unwrap();
        f.complete(
            req,
            Reply::ok(r#"{"version":7,"type":0,"active":-1}"#),
        );
        assert!(f.poller.mask().contains(UpdateMask::CONFIG));
    }

    #[test]
    fn stale_epoch_is_ignored() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        f.poller = StatusPoller::new(7, 1);
        assert_eq!(f.complete(req, status(1)), PollEvent::Ignored);
        assert_eq!(f.renderer.count("titles"), 0);
    }

    #[test]
    fn server_messages_are_classified() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        f.complete(
            req,
            Reply::ok(r#"{"version":7,"type":0,"msg":"ACT:Scanning"}"#),
        );
        assert_eq!(f.renderer.count("message Activity"), 1);
    }

    #[test]
    fn unexpected_status_disconnects_with_retry() {
        let mut f = Fixture::polling();
        let req = f.next().unwrap();
        let ev = f.complete(
            req,
            Reply {
                status: 500,
                body: String::new(),
            },
        );
        assert!(matches!(
            ev,
            PollEvent::Failed(DisconnectReason::UnexpectedStatus { status: 500, .. })
        ));
        assert!(f.renderer.last().unwrap().ends_with("retry=true"));
    }
}
