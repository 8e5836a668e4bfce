//! Wire encoding for the mixplay control surface.
//!
//! Two request generations exist side by side on the daemon:
//!
//! ```text
//!  Path          GET  /mpctrl/cmd/<code>?<arg>      GET /mpctrl/status?<mask>
//!  JsonEnvelope  POST /mpctrl/cmd?{"cmd":..}       GET /mpctrl/status?{"cmd":<mask>,..}
//! ```
//!
//! Replies are JSON in both cases and always carry a `version` field, which
//! is checked before anything else in the body is trusted.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{Catalog, CommandCode, StatusResponse, UpdateMask};

/// Characters left readable in query strings.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/')
    .remove(b':');

/// Request shape understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Command code in the path, argument as raw query.
    Path,
    /// JSON envelope in the query string.
    #[default]
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireRequest {
    Command {
        code: CommandCode,
        arg: String,
        client_id: i64,
    },
    Status {
        mask: UpdateMask,
        client_id: i64,
    },
    Config {
        client_id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully encoded request: method plus path and query, relative to the
/// daemon's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub target: String,
}

#[derive(Serialize)]
struct CommandEnvelope<'a> {
    cmd: u16,
    arg: &'a str,
    clientid: i64,
}

#[derive(Serialize)]
struct StatusEnvelope {
    cmd: u8,
    clientid: i64,
}

pub fn encode(request: &WireRequest, generation: Generation) -> HttpRequest {
    match (generation, request) {
        (Generation::Path, WireRequest::Command { code, arg, .. }) => {
            let mut target = format!("/mpctrl/cmd/{}", code);
            if !arg.is_empty() {
                target.push('?');
                target.extend(utf8_percent_encode(arg, QUERY));
            }
            HttpRequest {
                method: HttpMethod::Get,
                target,
            }
        }
        (Generation::Path, WireRequest::Status { mask, .. }) => HttpRequest {
            method: HttpMethod::Get,
            target: if mask.is_stat() {
                "/mpctrl/status".to_string()
            } else {
                format!("/mpctrl/status?{}", mask.bits())
            },
        },
        (Generation::Path, WireRequest::Config { .. }) => HttpRequest {
            method: HttpMethod::Get,
            target: "/mpctrl/config".to_string(),
        },
        (
            Generation::Json,
            WireRequest::Command {
                code,
                arg,
                client_id,
            },
        ) => {
            let envelope = CommandEnvelope {
                cmd: code.0,
                arg,
                clientid: *client_id,
            };
            HttpRequest {
                method: HttpMethod::Post,
                target: format!("/mpctrl/cmd?{}", query_json(&envelope)),
            }
        }
        (Generation::Json, WireRequest::Status { mask, client_id }) => {
            status_envelope(mask.bits(), *client_id)
        }
        (Generation::Json, WireRequest::Config { client_id }) => {
            status_envelope(UpdateMask::CONFIG.bits(), *client_id)
        }
    }
}

fn status_envelope(cmd: u8, clientid: i64) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        target: format!(
            "/mpctrl/status?{}",
            query_json(&StatusEnvelope { cmd, clientid })
        ),
    }
}

fn query_json<T: Serialize>(value: &T) -> String {
    // Serializing plain structs of integers and strings cannot fail.
    let json = serde_json::to_string(value).unwrap_or_default();
    utf8_percent_encode(&json, QUERY).to_string()
}

/// Download target for a title, `0` meaning the current one.
pub fn title_target(key: u32) -> String {
    format!("/mpctrl/title/{}", key)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("protocol version mismatch: expected {expected}, server sent {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

#[derive(Deserialize)]
struct VersionProbe {
    version: i32,
}

/// Old daemons nest the catalog under `config`, newer ones send it flat.
#[derive(Deserialize)]
struct ConfigReply {
    #[serde(default)]
    config: Option<Catalog>,
    #[serde(flatten)]
    flat: Catalog,
}

fn check_version(body: &str, expected: i32) -> Result<(), DecodeError> {
    let probe: VersionProbe =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if probe.version != expected {
        return Err(DecodeError::VersionMismatch {
            expected,
            found: probe.version,
        });
    }
    Ok(())
}

pub fn decode(body: &str, expected_version: i32) -> Result<StatusResponse, DecodeError> {
    check_version(body, expected_version)?;
    serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))
}

pub fn decode_config(body: &str, expected_version: i32) -> Result<Catalog, DecodeError> {
    check_version(body, expected_version)?;
    let reply: ConfigReply =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Ok(reply.config.unwrap_or(reply.flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Range;
    use percent_encoding::percent_decode_str;

    fn unquote(target: &str) -> String {
        let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
        percent_decode_str(query).decode_utf8_lossy().into_owned()
    }

    #[test]
    fn path_generation_pads_code() {
        let req = WireRequest::Command {
            code: CommandCode::FAV.with(Range::Display),
            arg: "12".into(),
            client_id: 3,
        };
        let http = encode(&req, Generation::Path);
        assert_eq!(http.method, HttpMethod::Get);
        assert_eq!(http.target, "/mpctrl/cmd/0809?12");
    }

    #[test]
    fn path_generation_omits_empty_arg_and_escapes() {
        let play = WireRequest::Command {
            code: CommandCode::PLAY,
            arg: String::new(),
            client_id: -1,
        };
        assert_eq!(encode(&play, Generation::Path).target, "/mpctrl/cmd/0000");

        let search = WireRequest::Command {
            code: CommandCode::SEARCH.with(Range::Title),
            arg: "rock & roll#1".into(),
            client_id: -1,
        };
        let target = encode(&search, Generation::Path).target;
        assert!(target.starts_with("/mpctrl/cmd/0113?"));
        assert!(!target.contains(' ') && !target.contains('#'));
        assert_eq!(unquote(&target), "rock & roll#1");
    }

    #[test]
    fn json_generation_wraps_envelope() {
        let req = WireRequest::Command {
            code: CommandCode::MOVE,
            arg: "12/40".into(),
            client_id: 0,
        };
        let http = encode(&req, Generation::Json);
        assert_eq!(http.method, HttpMethod::Post);
        assert!(http.target.starts_with("/mpctrl/cmd?"));
        let json: serde_json::Value = serde_json::from_str(&unquote(&http.target)).unwrap();
        assert_eq!(json["cmd"], 0x11);
        assert_eq!(json["arg"], "12/40");
        assert_eq!(json["clientid"], 0);
    }

    #[test]
    fn status_and_config_targets() {
        let stat = WireRequest::Status {
            mask: UpdateMask::STAT,
            client_id: 5,
        };
        assert_eq!(encode(&stat, Generation::Path).target, "/mpctrl/status");
        let full = WireRequest::Status {
            mask: UpdateMask::FULL,
            client_id: 5,
        };
        assert_eq!(encode(&full, Generation::Path).target, "/mpctrl/status?13");

        let json: serde_json::Value =
            serde_json::from_str(&unquote(&encode(&full, Generation::Json).target)).unwrap();
        assert_eq!(json["cmd"], 13);
        assert_eq!(json["clientid"], 5);

        let config = WireRequest::Config { client_id: -1 };
        assert_eq!(encode(&config, Generation::Path).target, "/mpctrl/config");
        let json: serde_json::Value =
            serde_json::from_str(&unquote(&encode(&config, Generation::Json).target)).unwrap();
        assert_eq!(json["cmd"], 8);
        assert_eq!(json["clientid"], -1);
    }

    #[test]
    fn decode_checks_version_first() {
        // `current` is garbage, but the version check must win.
        let body = r#"{"version": 6, "current": 17}"#;
        assert_eq!(
            decode(body, 7),
            Err(DecodeError::VersionMismatch {
                expected: 7,
                found: 6
            })
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode("<html>", 7), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("{}", 7), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn decode_config_accepts_both_layouts() {
        let nested = r#"{"version":7,"type":8,"config":{"profile":["a","b"],"sname":["s"]}}"#;
        let flat = r#"{"version":7,"type":8,"profile":["a","b"],"sname":["s"]}"#;
        let a = decode_config(nested, 7).unwrap();
        let b = decode_config(flat, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.profile.len(), 2);
    }

    #[test]
    fn download_target() {
        assert_eq!(title_target(0), "/mpctrl/title/0");
    }
}
