//! ClientCore: single owner of all mutable client state.
//!
//! Intents, poll ticks and transport completions are handled one at a time by
//! synchronous handlers.  Handlers never touch the network; they queue
//! [`Outgoing`] exchanges in an outbox which `run` drains into spawned
//! transport tasks.  Completions come back through a channel in whatever
//! order the network delivers them.
//!
//! A user-confirmed reconnect throws the whole [`ClientRuntime`] away and
//! builds a fresh one under a new epoch.  Exchanges still in flight from the
//! old runtime complete normally and are discarded on arrival.

use std::sync::Arc;
use std::time::Duration;

use mixctl_proto::codec::{self, Generation, HttpRequest};
use mixctl_proto::protocol::{CommandCode, UpdateMask};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::dispatcher::{CommandDispatcher, Dispatch, DispatchError, InFlight, Outcome};
use crate::intent::Intent;
use crate::poller::{ApplyContext, PollRequest, StatusPoller};
use crate::popup::{ChoiceAction, PopupCoordinator, PopupId, Toggle};
use crate::prefs::{self, PreferenceStore};
use crate::renderer::{Notice, ViewRenderer};
use crate::reorder::{MoveRequest, ReorderProtocol, TapOutcome};
use crate::session::Session;
use crate::transport::{Reply, Transport};

/// Per-connection state.  Rebuilt from scratch on reconnect.
#[derive(Debug)]
pub struct ClientRuntime {
    pub epoch: u64,
    pub session: Session,
    pub dispatcher: CommandDispatcher,
    pub poller: StatusPoller,
    pub popups: PopupCoordinator,
    pub reorder: ReorderProtocol,
}

impl ClientRuntime {
    pub fn new(expected_version: i32, epoch: u64) -> Self {
        Self {
            epoch,
            session: Session::new(expected_version),
            dispatcher: CommandDispatcher::new(epoch),
            poller: StatusPoller::new(expected_version, epoch),
            popups: PopupCoordinator::new(),
            reorder: ReorderProtocol::new(),
        }
    }
}

/// An exchange waiting to be put on the wire.
#[derive(Debug)]
pub enum Outgoing {
    Poll(PollRequest),
    Command(InFlight),
}

impl Outgoing {
    pub fn http(&self, generation: Generation) -> HttpRequest {
        match self {
            Outgoing::Poll(req) => codec::encode(req.wire(), generation),
            Outgoing::Command(flight) => codec::encode(&flight.wire(), generation),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoreOptions {
    pub base_url: String,
    pub generation: Generation,
    pub expected_version: i32,
}

pub struct ClientCore<R, P> {
    options: CoreOptions,
    runtime: ClientRuntime,
    renderer: R,
    prefs: P,
    shortcuts: Vec<i32>,
    outbox: Vec<Outgoing>,
}

impl<R: ViewRenderer, P: PreferenceStore> ClientCore<R, P> {
    pub fn new(options: CoreOptions, renderer: R, prefs: P) -> Self {
        let shortcuts = prefs::shortcuts(&prefs);
        Self {
            runtime: ClientRuntime::new(options.expected_version, 0),
            options,
            renderer,
            prefs,
            shortcuts,
            outbox: Vec::new(),
        }
    }

    pub fn runtime(&self) -> &ClientRuntime {
        &self.runtime
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    pub fn shortcuts(&self) -> &[i32] {
        &self.shortcuts
    }

    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    // ── intents ──────────────────────────────────────────────────────────────

    pub fn handle_intent(&mut self, intent: Intent) {
        if self.runtime.poller.is_disconnected() && !matches!(intent, Intent::Retry(_)) {
            debug!("core: offline, ignoring {:?}", intent);
            self.renderer
                .notice(&Notice::Rejected(DispatchError::Offline.to_string()));
            return;
        }

        match intent {
            Intent::Command { code, arg } => self.dispatch(code, arg),
            Intent::Confirm(accepted) => {
                let result = self.runtime.dispatcher.confirm(accepted);
                self.after_dispatch(result);
            }
            Intent::Refresh(mask) => self.runtime.poller.request(mask),
            Intent::TogglePopup(id) => self.toggle_popup(id),
            Intent::OpenPopup(id) => match self.runtime.popups.open(&id) {
                Ok(closed) => {
                    if let Some(closed) = closed {
                        self.renderer.popup_closed(&closed);
                    }
                    self.announce_open(&id);
                }
                Err(e) => warn!("core: {}", e),
            },
            Intent::ClosePopup(id) => {
                if self.runtime.popups.close(&id) {
                    self.renderer.popup_closed(&id);
                }
            }
            Intent::Select { popup, choice } => self.select(popup, choice),
            Intent::DragDrop { source, target } => {
                let is_stream = self.runtime.session.is_stream;
                match self.runtime.reorder.drop_native(source, target, is_stream) {
                    Some(request) => self.send_move(request),
                    None => debug!("core: drop of {} on {} ignored", source, target),
                }
            }
            Intent::Retry(true) if self.runtime.poller.is_disconnected() => self.reload(),
            Intent::Retry(true) => debug!("core: still connected, ignoring retry"),
            Intent::Retry(false) => {
                info!("core: reconnect declined");
                self.renderer
                    .notice(&Notice::Info("staying disconnected".into()));
            }
            Intent::AddShortcut(id) => self.add_shortcut(id),
            Intent::RemoveShortcut(id) => self.remove_shortcut(id),
            Intent::Download(key) => self.download(key),
        }
    }

    fn dispatch(&mut self, code: CommandCode, arg: String) {
        let result = self
            .runtime
            .dispatcher
            .dispatch(code, arg, &self.runtime.session);
        self.after_dispatch(result);
    }

    fn after_dispatch(&mut self, result: Result<Dispatch, DispatchError>) {
        match result {
            Ok(Dispatch::Send(flight)) => {
                if flight.is_guarded() {
                    self.renderer.busy(true);
                }
                self.outbox.push(Outgoing::Command(flight));
            }
            Ok(Dispatch::Queued) => {}
            Ok(Dispatch::Suppressed(reason)) => debug!("core: suppressed ({:?})", reason),
            Ok(Dispatch::NeedsConfirmation(prompt)) => self.renderer.confirm(&prompt),
            Err(e) => {
                info!("core: command rejected: {}", e);
                self.renderer.notice(&Notice::Rejected(e.to_string()));
            }
        }
    }

    fn send_move(&mut self, request: MoveRequest) {
        self.dispatch(request.code(), request.arg());
    }

    fn toggle_popup(&mut self, id: PopupId) {
        let target = self.runtime.popups.position(&id);
        match self.runtime.reorder.tap(target) {
            TapOutcome::Move(request) => {
                self.send_move(request);
                return;
            }
            TapOutcome::Aborted => {
                self.runtime.poller.request(UpdateMask::TITLES);
                self.renderer.move_finished(false);
                return;
            }
            TapOutcome::Passthrough => {}
        }

        match self.runtime.popups.toggle(&id) {
            Ok(Toggle::Opened { closed }) => {
                if let Some(closed) = closed {
                    self.renderer.popup_closed(&closed);
                }
                self.announce_open(&id);
            }
            Ok(Toggle::Closed) => self.renderer.popup_closed(&id),
            Err(e) => warn!("core: {}", e),
        }
    }

    fn announce_open(&mut self, id: &PopupId) {
        if let Some(menu) = self.runtime.popups.menu(id) {
            self.renderer.popup_opened(id, menu);
        }
    }

    fn select(&mut self, popup: PopupId, choice: usize) {
        let was_open = self.runtime.popups.open_id() == Some(&popup);
        let selection = match self.runtime.popups.select(&popup, choice) {
            Ok(s) => s,
            Err(e) => {
                warn!("core: {}", e);
                self.renderer.notice(&Notice::Warning(e.to_string()));
                return;
            }
        };

        match selection.action {
            ChoiceAction::Command { code, arg } => self.dispatch(code, arg),
            ChoiceAction::Move(source) => {
                self.runtime.reorder.arm(source);
                self.renderer.move_armed(source);
            }
            ChoiceAction::AddShortcut(id) => self.add_shortcut(id),
            ChoiceAction::RemoveShortcut(id) => self.remove_shortcut(id),
            ChoiceAction::Download(key) => self.download(key),
        }
        if was_open {
            self.renderer.popup_closed(&popup);
        }
        if selection.hide_row {
            self.renderer.row_hidden(&popup);
        }
    }

    fn add_shortcut(&mut self, id: i32) {
        if id == 0 || self.shortcuts.contains(&id) {
            return;
        }
        self.shortcuts.push(id);
        self.persist_shortcuts();
    }

    fn remove_shortcut(&mut self, id: i32) {
        let before = self.shortcuts.len();
        self.shortcuts.retain(|&s| s != id);
        if self.shortcuts.len() == before {
            self.renderer
                .notice(&Notice::Info(format!("{} is not a shortcut", id)));
            return;
        }
        self.persist_shortcuts();
    }

    fn persist_shortcuts(&mut self) {
        if let Err(e) = prefs::save_shortcuts(&mut self.prefs, &self.shortcuts) {
            warn!("core: saving shortcuts failed: {}", e);
            self.renderer.notice(&Notice::Warning(e.to_string()));
        }
        self.runtime.poller.request(UpdateMask::CONFIG);
    }

    fn download(&mut self, key: u32) {
        let url = format!("{}{}", self.options.base_url, codec::title_target(key));
        self.renderer.navigate(&url);
        self.runtime.poller.request(UpdateMask::TITLES);
    }

    fn reload(&mut self) {
        let epoch = self.runtime.epoch + 1;
        let was_busy = self.runtime.dispatcher.is_busy();
        info!("core: reconnecting, epoch {}", epoch);
        self.runtime = ClientRuntime::new(self.options.expected_version, epoch);
        self.shortcuts = prefs::shortcuts(&self.prefs);
        if was_busy {
            self.renderer.busy(false);
        }
    }

    // ── ticks and completions ────────────────────────────────────────────────

    pub fn handle_tick(&mut self) {
        let rt = &mut self.runtime;
        if let Some(request) = rt.poller.next_request(&mut rt.dispatcher, &rt.session) {
            self.outbox.push(Outgoing::Poll(request));
        }
    }

    pub fn handle_poll_reply(&mut self, request: PollRequest, reply: Reply) {
        if request.epoch() != self.runtime.epoch {
            debug!("core: stale poll reply from epoch {}", request.epoch());
            return;
        }
        let rt = &mut self.runtime;
        let mut cx = ApplyContext {
            session: &mut rt.session,
            popups: &mut rt.popups,
            shortcuts: &self.shortcuts,
            renderer: &mut self.renderer,
        };
        let event = rt.poller.complete(request, &reply, &mut cx);
        debug!("core: poll → {:?}", event);
    }

    pub fn handle_command_reply(&mut self, flight: InFlight, reply: Reply) {
        let completion = self.runtime.dispatcher.complete(flight, &reply);
        if completion.busy_cleared {
            self.renderer.busy(false);
        }
        let is_move = completion.code.is(CommandCode::MOVE);

        match completion.outcome {
            Outcome::Accepted { refresh } => {
                self.runtime.poller.request(refresh);
                if is_move {
                    self.renderer.move_finished(true);
                }
            }
            Outcome::UnexpectedBody { refresh, .. } => {
                self.renderer.notice(&Notice::Warning(format!(
                    "unexpected reply to {}",
                    completion.code.name()
                )));
                self.runtime.poller.request(refresh);
            }
            Outcome::ServerBusy => {
                self.renderer.notice(&Notice::ServerBusy);
                if is_move {
                    self.renderer.move_finished(false);
                }
            }
            Outcome::Escalate(reason) => {
                self.runtime.poller.fail(reason, &mut self.renderer);
            }
            Outcome::Stale => debug!("core: stale reply to {}", completion.code.name()),
        }
    }

    // ── event loop ───────────────────────────────────────────────────────────

    /// Runs until the intent channel closes, then hands the core back.
    pub async fn run<T: Transport>(
        mut self,
        transport: Arc<T>,
        mut intents: mpsc::Receiver<Intent>,
        poll_interval: Duration,
    ) -> Self {
        info!("core: starting event loop");
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(Outgoing, Reply)>();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => {
                        info!("core: intent channel closed, stopping");
                        break;
                    }
                },
                _ = ticker.tick() => self.handle_tick(),
                Some((out, reply)) = done_rx.recv() => match out {
                    Outgoing::Poll(request) => self.handle_poll_reply(request, reply),
                    Outgoing::Command(flight) => self.handle_command_reply(flight, reply),
                },
            }

            for out in self.drain_outbox() {
                let request = out.http(self.options.generation);
                let transport = Arc::clone(&transport);
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let reply = transport.exchange(request).await;
                    let _ = done_tx.send((out, reply));
                });
            }
        }
        self
    }
}
