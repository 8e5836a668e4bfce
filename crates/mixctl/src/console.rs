//! Line-oriented console view: parses stdin commands into intents and prints
//! renderer callbacks to stdout.

use chrono::Local;
use mixctl::intent::Intent;
use mixctl::poller::DisconnectReason;
use mixctl::popup::{Menu, PopupId};
use mixctl::renderer::{
    ConfigUpdate, FullUpdate, ListsUpdate, Notice, PlayerUpdate, Row, SearchUpdate, ViewRenderer,
};
use mixctl::session::ModeChange;
use mixctl_proto::protocol::{format_clock, CommandCode, PlayerState, Range, ServerMessage, UpdateMask};

pub const HELP: &str = "\
play stop prev next replay fav dnp vol+ vol- mute ff rew favplay
search <term> | profile <id> | rmprofile <id> | url <address>
dbinfo clean doublets shutdown | cmd <hex> [arg]
popup|open|close <row> | select <row> <n> | drag <src> <dst>
yes no retry giveup | refresh [mask] | shortcut|unshortcut <id>
download [key] | help | quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Intent(Intent),
    Help,
    Quit,
    Empty,
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {}", what))?;
    word.parse()
        .map_err(|_| format!("'{}' is not a valid {}", word, what))
}

fn command(code: CommandCode, arg: &str) -> Result<Input, String> {
    Ok(Input::Intent(Intent::command(code, arg)))
}

pub fn parse(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    match word {
        "" => Ok(Input::Empty),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        "play" => command(CommandCode::PLAY, ""),
        "stop" => command(CommandCode::STOP, ""),
        "prev" => command(CommandCode::PREV, ""),
        "next" => command(CommandCode::NEXT, ""),
        "replay" => command(CommandCode::REPLAY, ""),
        "fav" => command(CommandCode::FAV.with(Range::Display), ""),
        "dnp" => command(CommandCode::DNP.with(Range::Display), ""),
        "vol+" => command(CommandCode::VOLUME_UP, ""),
        "vol-" => command(CommandCode::VOLUME_DOWN, ""),
        "mute" => command(CommandCode::MUTE, ""),
        "ff" => command(CommandCode::SEEK_FORWARD, ""),
        "rew" => command(CommandCode::SEEK_BACK, ""),
        "favplay" => command(CommandCode::FAV_PLAY, ""),
        "dbinfo" => command(CommandCode::DB_INFO, ""),
        "clean" => command(CommandCode::DB_CLEAN, ""),
        "doublets" => command(CommandCode::DOUBLETS, ""),
        "shutdown" => command(CommandCode::QUIT, ""),
        "search" => command(
            CommandCode::SEARCH
                .with(Range::Title)
                .with(Range::Artist)
                .with(Range::Album),
            rest,
        ),
        "url" => command(CommandCode::PATH, rest),
        "profile" => {
            let id: i32 = number(args.next(), "profile id")?;
            command(CommandCode::PROFILE, &id.to_string())
        }
        "rmprofile" => {
            let id: i32 = number(args.next(), "profile id")?;
            command(CommandCode::REMOVE_PROFILE, &id.to_string())
        }
        "cmd" => {
            let hex = args.next().ok_or("missing command code")?;
            let code = u16::from_str_radix(hex.trim_start_matches("0x"), 16)
                .map_err(|_| format!("'{}' is not a hex command code", hex))?;
            let arg = rest.split_once(' ').map(|(_, a)| a.trim()).unwrap_or("");
            command(CommandCode(code), arg)
        }
        "popup" | "open" | "close" => {
            let id = PopupId::new(args.next().ok_or("missing row")?);
            Ok(Input::Intent(match word {
                "popup" => Intent::TogglePopup(id),
                "open" => Intent::OpenPopup(id),
                _ => Intent::ClosePopup(id),
            }))
        }
        "select" => {
            let popup = PopupId::new(args.next().ok_or("missing row")?);
            let choice = number(args.next(), "choice")?;
            Ok(Input::Intent(Intent::Select { popup, choice }))
        }
        "drag" => {
            let source = number(args.next(), "source key")?;
            let target = number(args.next(), "target key")?;
            Ok(Input::Intent(Intent::DragDrop { source, target }))
        }
        "yes" => Ok(Input::Intent(Intent::Confirm(true))),
        "no" => Ok(Input::Intent(Intent::Confirm(false))),
        "retry" => Ok(Input::Intent(Intent::Retry(true))),
        "giveup" => Ok(Input::Intent(Intent::Retry(false))),
        "refresh" => {
            let mask = match args.next() {
                Some(bits) => UpdateMask::from_bits(number(Some(bits), "mask")?),
                None => UpdateMask::FULL,
            };
            Ok(Input::Intent(Intent::Refresh(mask)))
        }
        "shortcut" => Ok(Input::Intent(Intent::AddShortcut(number(
            args.next(),
            "shortcut id",
        )?))),
        "unshortcut" => Ok(Input::Intent(Intent::RemoveShortcut(number(
            args.next(),
            "shortcut id",
        )?))),
        "download" => {
            let key = match args.next() {
                Some(k) => number(Some(k), "title key")?,
                None => 0,
            };
            Ok(Input::Intent(Intent::Download(key)))
        }
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}

/// Prints to stdout.  The player line is only repeated when it changes.
pub struct ConsoleRenderer {
    small: bool,
    last_player: String,
}

impl ConsoleRenderer {
    pub fn new(small: bool) -> Self {
        Self {
            small,
            last_player: String::new(),
        }
    }

    fn say(&self, text: &str) {
        println!("[{}] {}", Local::now().format("%H:%M:%S"), text);
    }

    fn rows(&self, heading: &str, rows: &[Row]) {
        println!("── {} ──", heading);
        for row in rows {
            match &row.popup {
                Some(id) => println!("  {:>5}  {}", id, row.label),
                None => println!("         {}", row.label),
            }
        }
    }
}

impl ViewRenderer for ConsoleRenderer {
    fn player(&mut self, update: &PlayerUpdate) {
        let title = update
            .current
            .as_ref()
            .map(|t| t.display())
            .unwrap_or_else(|| "-".into());
        let state = match update.state {
            PlayerState::Playing => "▶",
            PlayerState::Paused => "⏸",
            PlayerState::Idle => "■",
            PlayerState::Busy(_) => "…",
        };
        let volume = match update.volume {
            -1 => "n/a".to_string(),
            0 => "muted".to_string(),
            v => format!("{}%", v),
        };
        let line = if update.is_stream {
            format!("{} {}  vol {}", state, title, volume)
        } else {
            format!(
                "{} {}  {}/{}  vol {}",
                state,
                title,
                format_clock(update.playtime_sec),
                format_clock(update.playtime_sec + update.remtime_sec),
                volume
            )
        };
        if line != self.last_player {
            self.say(&line);
            self.last_player = line;
        }
    }

    fn titles(&mut self, update: &FullUpdate) {
        let rows: Vec<Row> = if self.small {
            update.rows.iter().rev().take(5).rev().cloned().collect()
        } else {
            update.rows.clone()
        };
        self.rows(if update.is_stream { "stream" } else { "queue" }, &rows);
    }

    fn search(&mut self, update: &SearchUpdate) {
        if update.rows.is_empty() {
            self.say(&format!(
                "found {} artists and {} albums",
                update.results.artists.len(),
                update.results.albums.len()
            ));
            return;
        }
        self.rows("search", &update.rows);
    }

    fn lists(&mut self, update: &ListsUpdate) {
        if update.rows.is_empty() {
            self.say("no dnp, favourite or doublet entries yet");
            return;
        }
        self.rows("lists", &update.rows);
    }

    fn config(&mut self, update: &ConfigUpdate) {
        self.say(&update.active_label());
        if !self.small {
            self.rows("profiles and channels", &update.rows);
        }
    }

    fn mode_changed(&mut self, change: &ModeChange) {
        if let Some(stream) = change.stream {
            self.say(if stream { "stream mode" } else { "library mode" });
        }
        if let Some(fav_play) = change.fav_play {
            self.say(if fav_play { "favplay on" } else { "favplay off" });
        }
    }

    fn notice(&mut self, notice: &Notice) {
        match notice {
            Notice::ServerBusy => self.say("server busy, try again"),
            Notice::Rejected(why) => self.say(&format!("refused: {}", why)),
            Notice::Warning(what) => self.say(&format!("warning: {}", what)),
            Notice::Info(what) => self.say(what),
        }
    }

    fn message(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Alert(text) => self.say(&format!("ALERT {}", text)),
            ServerMessage::Activity(text) => self.say(&format!("… {}", text)),
            ServerMessage::Info(text) => self.say(text),
        }
    }

    fn confirm(&mut self, prompt: &str) {
        self.say(&format!("{} [yes/no]", prompt));
    }

    fn connected(&mut self) {
        self.say("connected");
    }

    fn disconnected(&mut self, reason: &DisconnectReason, retry_offered: bool) {
        self.last_player.clear();
        if retry_offered {
            self.say(&format!("{}, reconnect? [retry/giveup]", reason));
        } else {
            self.say(&reason.to_string());
        }
    }

    fn popup_opened(&mut self, id: &PopupId, menu: &Menu) {
        let choices: Vec<String> = menu
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}:{}", i, c.label))
            .collect();
        self.say(&format!("{} {}  [{}]", id, menu.label, choices.join(" ")));
    }

    fn move_armed(&mut self, source: u32) {
        self.say(&format!("moving {}, pick a target row", source));
    }

    fn move_finished(&mut self, moved: bool) {
        if !moved {
            self.say("move cancelled");
        }
    }

    fn navigate(&mut self, url: &str) {
        self.say(&format!("download: {}", url));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(line: &str) -> Intent {
        match parse(line) {
            Ok(Input::Intent(i)) => i,
            other => panic!("{:?} for {:?}", other, line),
        }
    }

    #[test]
    fn simple_commands() {
        assert_eq!(intent("play"), Intent::command(CommandCode::PLAY, ""));
        assert_eq!(intent("fav"), Intent::command(CommandCode(0x0809), ""));
        assert_eq!(intent("shutdown"), Intent::command(CommandCode::QUIT, ""));
        assert_eq!(parse("  "), Ok(Input::Empty));
        assert_eq!(parse("quit"), Ok(Input::Quit));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            intent("search  daft punk "),
            Intent::command(CommandCode(0x0713), "daft punk")
        );
        assert_eq!(intent("profile 3"), Intent::command(CommandCode::PROFILE, "3"));
        assert_eq!(
            intent("cmd 0x1a a=Nickelback Band"),
            Intent::command(CommandCode::DEL_DNP, "a=Nickelback Band")
        );
        assert_eq!(
            intent("drag 4 9"),
            Intent::DragDrop {
                source: 4,
                target: 9
            }
        );
        assert_eq!(
            intent("select q3 1"),
            Intent::Select {
                popup: PopupId::new("q3"),
                choice: 1
            }
        );
        assert_eq!(intent("refresh 2"), Intent::Refresh(UpdateMask::RESULT));
        assert_eq!(intent("download"), Intent::Download(0));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse("profile x").is_err());
        assert!(parse("select q3").is_err());
        assert!(parse("cmd zz").is_err());
        assert!(parse("dance").is_err());
    }
}
