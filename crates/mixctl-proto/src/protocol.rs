use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Protocol version this client speaks.  Every JSON reply carries a
/// `version` field; anything else is refused before other fields are read.
pub const PROTOCOL_VERSION: i32 = 7;

/// A command understood by the mixplay daemon.
///
/// The low byte selects the command, the high byte carries range qualifiers
/// (title/artist/album/...) for fav, dnp and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandCode(pub u16);

impl CommandCode {
    pub const PLAY: Self = Self(0x00);
    pub const STOP: Self = Self(0x01);
    pub const PREV: Self = Self(0x02);
    pub const NEXT: Self = Self(0x03);
    pub const START: Self = Self(0x04);
    pub const REPLAY: Self = Self(0x05);
    pub const PROFILE: Self = Self(0x06);
    pub const QUIT: Self = Self(0x07);
    pub const DB_CLEAN: Self = Self(0x08);
    pub const FAV: Self = Self(0x09);
    pub const DNP: Self = Self(0x0a);
    pub const DOUBLETS: Self = Self(0x0b);
    pub const INSERT: Self = Self(0x0c);
    pub const VOLUME_UP: Self = Self(0x0d);
    pub const VOLUME_DOWN: Self = Self(0x0e);
    pub const SEEK_FORWARD: Self = Self(0x0f);
    pub const SEEK_BACK: Self = Self(0x10);
    pub const MOVE: Self = Self(0x11);
    pub const DB_INFO: Self = Self(0x12);
    pub const SEARCH: Self = Self(0x13);
    pub const APPEND: Self = Self(0x14);
    pub const SET_VOLUME: Self = Self(0x15);
    pub const NEW_PROFILE: Self = Self(0x16);
    pub const PATH: Self = Self(0x17);
    pub const REMOVE_PROFILE: Self = Self(0x18);
    pub const EDIT: Self = Self(0x19);
    pub const DEL_DNP: Self = Self(0x1a);
    pub const DEL_FAV: Self = Self(0x1b);
    pub const REMOVE: Self = Self(0x1c);
    pub const MUTE: Self = Self(0x1d);
    pub const FAV_PLAY: Self = Self(0x1e);

    /// Command without its range qualifier.
    pub fn base(self) -> Self {
        Self(self.0 & 0x00ff)
    }

    pub fn with(self, range: Range) -> Self {
        Self(self.0 | range as u16)
    }

    pub fn is(self, other: Self) -> bool {
        self.base() == other.base()
    }

    /// Human readable name, used in logs and prompts.
    pub fn name(self) -> &'static str {
        match self.base() {
            Self::PLAY => "play",
            Self::STOP => "stop",
            Self::PREV => "prev",
            Self::NEXT => "next",
            Self::START => "start",
            Self::REPLAY => "replay",
            Self::PROFILE => "profile",
            Self::QUIT => "quit",
            Self::DB_CLEAN => "dbclean",
            Self::FAV => "fav",
            Self::DNP => "dnp",
            Self::DOUBLETS => "doublets",
            Self::INSERT => "insert",
            Self::VOLUME_UP => "ivol",
            Self::VOLUME_DOWN => "dvol",
            Self::SEEK_FORWARD => "fskip",
            Self::SEEK_BACK => "bskip",
            Self::MOVE => "move",
            Self::DB_INFO => "dbinfo",
            Self::SEARCH => "search",
            Self::APPEND => "append",
            Self::SET_VOLUME => "setvol",
            Self::NEW_PROFILE => "newprof",
            Self::PATH => "path",
            Self::REMOVE_PROFILE => "remprof",
            Self::EDIT => "edit",
            Self::DEL_DNP => "deldnp",
            Self::DEL_FAV => "delfav",
            Self::REMOVE => "remove",
            Self::MUTE => "mute",
            Self::FAV_PLAY => "favplay",
            _ => "unknown",
        }
    }
}

impl fmt::Display for CommandCode {
    /// Four hex digits, zero padded, as the daemon expects them on the wire.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// Range qualifiers for fav, dnp and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Range {
    Title = 0x0100,
    Artist = 0x0200,
    Album = 0x0400,
    Display = 0x0800,
    Genre = 0x1000,
    Fuzzy = 0x2000,
}

/// Set of payload categories, both requested by the client and announced by
/// the server in the `type` field of a status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateMask(u8);

impl UpdateMask {
    /// Player status only.
    pub const STAT: Self = Self(0);
    pub const TITLES: Self = Self(1);
    pub const RESULT: Self = Self(2);
    pub const LISTS: Self = Self(4);
    pub const CONFIG: Self = Self(8);
    /// Everything a fresh view needs.
    pub const FULL: Self = Self(1 | 4 | 8);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_stat(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for UpdateMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for UpdateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_stat() {
            return write!(f, "STAT");
        }
        let names = [
            (Self::TITLES, "TITLES"),
            (Self::RESULT, "RESULT"),
            (Self::LISTS, "LISTS"),
            (Self::CONFIG, "CONFIG"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Title flag bits.
pub const TITLE_FAV: u32 = 0x01;
pub const TITLE_DNP: u32 = 0x02;

/// `mpmode` bit set while the player is tuned to a stream.
pub const MODE_STREAM: u32 = 0x01;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Title {
    #[serde(default)]
    pub key: u32,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub playcount: u32,
    #[serde(default)]
    pub skipcount: u32,
}

impl Title {
    pub fn is_favourite(&self) -> bool {
        self.flags & TITLE_FAV != 0
    }

    pub fn is_denied(&self) -> bool {
        self.flags & TITLE_DNP != 0
    }

    /// `artist - title`, or just the title for streams without an artist.
    pub fn display(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

/// Search results, present when the reply type includes RESULT.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchResults {
    #[serde(default)]
    pub titles: Vec<Title>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub albums: Vec<String>,
    /// Album artists, parallel to `albums`.
    #[serde(default)]
    pub albart: Vec<String>,
    /// Search ran against the do-not-play list rather than the active titles.
    #[serde(rename = "searchDNP", default, deserialize_with = "lenient_bool")]
    pub search_dnp: bool,
}

/// Deny / favourite / doublet lists, present when the type includes LISTS.
/// Entries are patterns like `a=Artist` or `t*part of title`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MarkLists {
    #[serde(default)]
    pub dnplist: Vec<String>,
    #[serde(default)]
    pub favlist: Vec<String>,
    #[serde(default)]
    pub dbllist: Vec<String>,
}

/// Profile and channel catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    pub profile: Vec<String>,
    /// Channel (stream) names.
    #[serde(default)]
    pub sname: Vec<String>,
    #[serde(default)]
    pub debug: u32,
}

impl Catalog {
    /// Name of an active id: `>0` is a profile, `<0` a channel, `0` nothing.
    pub fn name_of(&self, id: i32) -> Option<&str> {
        if id > 0 {
            self.profile.get(id as usize - 1).map(String::as_str)
        } else if id < 0 {
            self.sname
                .get(id.unsigned_abs() as usize - 1)
                .map(String::as_str)
        } else {
            None
        }
    }
}

/// One reply of the status endpoint.  Sub-payloads are only meaningful when
/// the matching bit is set in `type_mask`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatusResponse {
    pub version: i32,
    #[serde(rename = "type", default)]
    pub type_mask: UpdateMask,
    #[serde(default)]
    pub current: Option<Title>,
    #[serde(default)]
    pub prev: Vec<Title>,
    #[serde(default)]
    pub next: Vec<Title>,
    /// Volume in percent, `0` is muted and `-1` means no mixer control.
    #[serde(default)]
    pub volume: i32,
    #[serde(default)]
    pub percent: u32,
    #[serde(rename = "playtime", default, deserialize_with = "lenient_seconds")]
    pub playtime_sec: u64,
    #[serde(rename = "remtime", default, deserialize_with = "lenient_seconds")]
    pub remtime_sec: u64,
    #[serde(default)]
    pub active: i32,
    #[serde(rename = "mpmode", default)]
    pub mode: u32,
    #[serde(rename = "mpfavplay", default, deserialize_with = "lenient_bool")]
    pub fav_play: bool,
    /// Favplay is limited to the current queue instead of the whole profile.
    #[serde(rename = "fpcurrent", default, deserialize_with = "lenient_bool")]
    pub fav_play_current: bool,
    #[serde(rename = "clientid", default)]
    pub client_id: i64,
    #[serde(rename = "msg", default)]
    pub message: String,
    #[serde(rename = "status", default)]
    pub player_status: u32,
    #[serde(flatten)]
    pub results: SearchResults,
    #[serde(flatten)]
    pub lists: MarkLists,
    #[serde(flatten)]
    pub catalog: Catalog,
}

impl StatusResponse {
    pub fn is_stream(&self) -> bool {
        self.mode & MODE_STREAM != 0
    }

    pub fn player_state(&self) -> PlayerState {
        PlayerState::from_code(self.player_status)
    }
}

/// Player state as reported in the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Idle,
    /// Any other code: the player is busy with a long running command.
    Busy(u32),
}

impl PlayerState {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x00 => PlayerState::Playing,
            0x20 => PlayerState::Paused,
            0x22 => PlayerState::Idle,
            other => PlayerState::Busy(other),
        }
    }
}

/// Server message from the `msg` field, classified by prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `ALERT:` prefix, needs user acknowledgement.
    Alert(String),
    /// `ACT:` prefix, a long running activity banner.
    Activity(String),
    Info(String),
}

impl ServerMessage {
    pub fn parse(msg: &str) -> Option<Self> {
        if msg.is_empty() {
            None
        } else if let Some(rest) = msg.strip_prefix("ALERT:") {
            Some(ServerMessage::Alert(rest.to_string()))
        } else if let Some(rest) = msg.strip_prefix("ACT:") {
            Some(ServerMessage::Activity(rest.to_string()))
        } else {
            Some(ServerMessage::Info(msg.to_string()))
        }
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` integers older daemons send.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        serde_json::Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("expected bool, got {}", other))),
    }
}

/// Play times arrive as seconds, numeric strings, or `mm:ss` / `hh:mm:ss`.
/// Placeholders like `--:--` read as zero.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
        serde_json::Value::String(s) => Ok(parse_clock(&s).unwrap_or(0)),
        serde_json::Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("expected seconds, got {}", other))),
    }
}

fn parse_clock(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(0);
    }
    s.split(':').try_fold(0u64, |acc, part| {
        let v = part.trim().parse::<u64>().ok()?;
        acc.checked_mul(60)?.checked_add(v)
    })
}

/// Formats seconds the way the daemon does: `m:ss` or `h:mm:ss`.
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
