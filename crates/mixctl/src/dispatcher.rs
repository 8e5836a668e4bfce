//! Command dispatch: routing policy, the single-flight guard and the queued
//! command slot.
//!
//! The dispatcher never touches the network.  `dispatch` decides what should
//! happen to a command and hands back an [`InFlight`] ticket when something
//! has to be sent; the caller transmits it and returns the ticket together
//! with the reply to [`CommandDispatcher::complete`].  The ticket is not
//! `Clone`, and `complete` consumes it, so each guard is cleared exactly once
//! no matter which reply branch fires.

use mixctl_proto::codec::WireRequest;
use mixctl_proto::protocol::{CommandCode, UpdateMask};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::poller::DisconnectReason;
use crate::session::Session;
use crate::transport::Reply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Result is visible in the command's own reply.
    OneShot,
    /// Result only shows up in a later status reply; travels with the poller.
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub code: CommandCode,
    pub arg: String,
    pub kind: CommandKind,
}

/// Static routing rules for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub kind: CommandKind,
    /// Subject to the single-flight guard.
    pub guarded: bool,
    /// Meaningless while tuned to a stream.
    pub library_only: bool,
    pub needs_confirmation: bool,
    /// Update types to request once the daemon accepted the command.
    pub refresh: UpdateMask,
}

pub fn policy(code: CommandCode) -> Policy {
    let one_shot = Policy {
        kind: CommandKind::OneShot,
        guarded: true,
        library_only: false,
        needs_confirmation: false,
        refresh: UpdateMask::STAT,
    };
    let queued = Policy {
        kind: CommandKind::Queued,
        guarded: false,
        ..one_shot
    };

    match code.base() {
        CommandCode::VOLUME_UP | CommandCode::VOLUME_DOWN | CommandCode::MUTE => Policy {
            guarded: false,
            ..one_shot
        },
        CommandCode::PREV | CommandCode::NEXT | CommandCode::REPLAY => Policy {
            library_only: true,
            ..one_shot
        },
        CommandCode::PROFILE | CommandCode::NEW_PROFILE | CommandCode::PATH => Policy {
            refresh: UpdateMask::FULL,
            ..one_shot
        },
        CommandCode::REMOVE_PROFILE => Policy {
            needs_confirmation: true,
            refresh: UpdateMask::FULL,
            ..one_shot
        },
        CommandCode::MOVE | CommandCode::REMOVE | CommandCode::INSERT | CommandCode::APPEND => {
            Policy {
                refresh: UpdateMask::TITLES,
                ..one_shot
            }
        }
        CommandCode::DEL_DNP | CommandCode::DEL_FAV => Policy {
            refresh: UpdateMask::LISTS,
            ..one_shot
        },
        CommandCode::SEARCH => Policy {
            refresh: UpdateMask::RESULT,
            ..queued
        },
        CommandCode::DB_CLEAN | CommandCode::DB_INFO => queued,
        CommandCode::QUIT | CommandCode::DOUBLETS => Policy {
            needs_confirmation: true,
            ..queued
        },
        _ => one_shot,
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The queued slot already holds a command.
    #[error("busy, {pending} is still waiting to be sent")]
    QueueBusy { pending: CommandCode },
    #[error("not connected")]
    Offline,
    #[error("{code} needs at least {min} characters")]
    ArgumentTooShort { code: CommandCode, min: usize },
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("nothing to confirm")]
    NothingToConfirm,
    /// An earlier prompt is still unanswered.
    #[error("answer the pending {pending} prompt first")]
    ConfirmationPending { pending: CommandCode },
}

/// Why a command was dropped without contacting the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppressed {
    /// Another guarded command is still outstanding.
    Collision { outstanding: CommandCode },
    StreamMode,
    Cancelled,
}

#[derive(Debug)]
pub enum Dispatch {
    /// Transmit the ticket now and hand the reply to `complete`.
    Send(InFlight),
    /// Parked in the queued slot; goes out with the next poll cycle.
    Queued,
    Suppressed(Suppressed),
    /// Ask the user; answer with `confirm`.
    NeedsConfirmation(String),
}

/// Ticket for a transmitted one-shot command.
#[derive(Debug)]
pub struct InFlight {
    code: CommandCode,
    arg: String,
    guarded: bool,
    epoch: u64,
}

impl InFlight {
    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// One-shots go out anonymously; the reply carries no session data.
    pub fn wire(&self) -> WireRequest {
        WireRequest::Command {
            code: self.code,
            arg: self.arg.clone(),
            client_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 204, with the update types the command wants refreshed.
    Accepted { refresh: UpdateMask },
    /// 200 with a body on a one-shot endpoint.  Treated as accepted.
    UnexpectedBody { body: String, refresh: UpdateMask },
    /// 503.
    ServerBusy,
    /// Transport failure or an unknown status; only the poller may act on it.
    Escalate(DisconnectReason),
    /// Reply to a ticket from a previous runtime epoch.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub code: CommandCode,
    pub outcome: Outcome,
    /// The busy indicator must be switched off.
    pub busy_cleared: bool,
}

#[derive(Debug, Default)]
pub struct CommandDispatcher {
    epoch: u64,
    in_flight: Option<CommandCode>,
    queued: Option<PendingCommand>,
    awaiting_confirmation: Option<PendingCommand>,
}

impl CommandDispatcher {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Guarded command currently outstanding.
    pub fn in_flight(&self) -> Option<CommandCode> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn queued(&self) -> Option<&PendingCommand> {
        self.queued.as_ref()
    }

    pub fn awaiting_confirmation(&self) -> Option<&PendingCommand> {
        self.awaiting_confirmation.as_ref()
    }

    pub fn dispatch(
        &mut self,
        code: CommandCode,
        arg: impl Into<String>,
        session: &Session,
    ) -> Result<Dispatch, DispatchError> {
        let rules = policy(code);
        let mut arg = arg.into();

        if rules.library_only && session.is_stream {
            debug!("dispatcher: {} dropped in stream mode", code.name());
            return Ok(Dispatch::Suppressed(Suppressed::StreamMode));
        }

        if code.is(CommandCode::SEARCH) && arg.trim().chars().count() < 2 {
            return Err(DispatchError::ArgumentTooShort { code, min: 2 });
        }
        if code.is(CommandCode::PATH) {
            arg = normalize_stream_url(&arg).ok_or(DispatchError::InvalidAddress(arg))?;
        }

        let command = PendingCommand {
            code,
            arg,
            kind: rules.kind,
        };

        if rules.needs_confirmation {
            if let Some(waiting) = &self.awaiting_confirmation {
                return Err(DispatchError::ConfirmationPending {
                    pending: waiting.code,
                });
            }
            if let (CommandKind::Queued, Some(pending)) = (rules.kind, &self.queued) {
                return Err(DispatchError::QueueBusy {
                    pending: pending.code,
                });
            }
            let prompt = confirmation_prompt(&command, session);
            info!("dispatcher: {} awaits confirmation", code.name());
            self.awaiting_confirmation = Some(command);
            return Ok(Dispatch::NeedsConfirmation(prompt));
        }

        self.route(command)
    }

    /// Answer to a pending confirmation.  Declining is a silent no-op.
    pub fn confirm(&mut self, accepted: bool) -> Result<Dispatch, DispatchError> {
        let command = self
            .awaiting_confirmation
            .take()
            .ok_or(DispatchError::NothingToConfirm)?;
        if !accepted {
            debug!("dispatcher: {} cancelled", command.code.name());
            return Ok(Dispatch::Suppressed(Suppressed::Cancelled));
        }
        self.route(command)
    }

    fn route(&mut self, command: PendingCommand) -> Result<Dispatch, DispatchError> {
        let rules = policy(command.code);
        match command.kind {
            CommandKind::Queued => {
                if let Some(pending) = &self.queued {
                    return Err(DispatchError::QueueBusy {
                        pending: pending.code,
                    });
                }
                info!(
                    "dispatcher: queued {} ({:?})",
                    command.code.name(),
                    command.arg
                );
                self.queued = Some(command);
                Ok(Dispatch::Queued)
            }
            CommandKind::OneShot => {
                if rules.guarded {
                    if let Some(outstanding) = self.in_flight {
                        debug!(
                            "dispatcher: {} swallowed, {} still in flight",
                            command.code.name(),
                            outstanding.name()
                        );
                        return Ok(Dispatch::Suppressed(Suppressed::Collision { outstanding }));
                    }
                    self.in_flight = Some(command.code);
                    debug!("dispatcher: guard set by {}", command.code.name());
                }
                Ok(Dispatch::Send(InFlight {
                    code: command.code,
                    arg: command.arg,
                    guarded: rules.guarded,
                    epoch: self.epoch,
                }))
            }
        }
    }

    /// Interpret the reply to a transmitted one-shot command.
    pub fn complete(&mut self, flight: InFlight, reply: &Reply) -> Completion {
        let code = flight.code;
        if flight.epoch != self.epoch {
            debug!(
                "dispatcher: discarding reply to {} from epoch {}",
                code.name(),
                flight.epoch
            );
            return Completion {
                code,
                outcome: Outcome::Stale,
                busy_cleared: false,
            };
        }

        let busy_cleared = if flight.guarded {
            self.in_flight = None;
            debug!("dispatcher: guard cleared by {} ({})", code.name(), reply.status);
            true
        } else {
            false
        };

        let refresh = policy(code).refresh;
        let outcome = match reply.status {
            204 => Outcome::Accepted { refresh },
            200 => {
                warn!(
                    "dispatcher: one-shot {} returned unexpected data: {}",
                    code, reply.body
                );
                Outcome::UnexpectedBody {
                    body: reply.body.clone(),
                    refresh,
                }
            }
            503 => Outcome::ServerBusy,
            0 => Outcome::Escalate(DisconnectReason::Transport {
                detail: reply.body.clone(),
            }),
            status => Outcome::Escalate(DisconnectReason::UnexpectedStatus {
                status,
                context: format!("after sending 0x{}", code),
            }),
        };

        Completion {
            code,
            outcome,
            busy_cleared,
        }
    }

    /// Hand the queued command to the poller.  Consumes it.
    pub fn take_queued(&mut self) -> Option<PendingCommand> {
        self.queued.take()
    }
}

fn confirmation_prompt(command: &PendingCommand, session: &Session) -> String {
    match command.code.base() {
        CommandCode::REMOVE_PROFILE => {
            let name = command
                .arg
                .parse::<i32>()
                .ok()
                .and_then(|id| session.catalog.as_ref()?.name_of(id))
                .unwrap_or(&command.arg);
            format!("Remove {}?", name)
        }
        CommandCode::QUIT => "Stop the mixplay server?".to_string(),
        CommandCode::DOUBLETS => "Mark all doublets as do-not-play?".to_string(),
        _ => format!("Really {}?", command.code.name()),
    }
}

/// Normalizes a stream address for the play-URL command: adds a missing
/// scheme and rejects anything that looks like a page rather than a stream.
pub fn normalize_stream_url(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let lower = input.to_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };
    let forbidden = ['?', '&', ' ', ',', '!'];
    if url.ends_with('/') || url.contains(&forbidden[..]) || !url.contains('.') {
        return None;
    }
    Some(url)
}
