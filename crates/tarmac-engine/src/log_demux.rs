// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structured log demultiplexing for the runtime child.
//!
//! The runtime multiplexes every tenant's output onto its own stdout and
//! stderr. Lines it wants attributed carry a marker-framed JSON envelope:
//!
//! ```text
//! __TARMAC_LOG_BEGIN__{"type":"worker","id":"<uuid>","name":"blog"}__TARMAC_LOG_END__ <message>
//! ```
//!
//! Classification is total: framed lines with a valid envelope attribute to
//! the named tenant worker or the embedded router, framed lines with an
//! undecodable envelope become a runtime-attributed error, and everything
//! else is the runtime's own output.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, error, info, warn};

/// Marker opening a framed line.
pub const LOG_BEGIN: &str = "__TARMAC_LOG_BEGIN__";
/// Marker closing the envelope, followed by the message.
pub const LOG_END: &str = "__TARMAC_LOG_END__";

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    name: String,
}

/// Where one output line came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// A tenant worker, identified by the envelope.
    Worker {
        /// Worker id from the envelope.
        id: String,
        /// Worker name from the envelope.
        name: String,
        /// Message after the closing marker.
        message: String,
    },
    /// The runtime's embedded router component.
    Router {
        /// Router id from the envelope.
        id: String,
        /// Router name from the envelope.
        name: String,
        /// Message after the closing marker.
        message: String,
    },
    /// The runtime process itself.
    Runtime {
        /// The raw line.
        message: String,
    },
    /// A framed line whose envelope failed to decode.
    BadEnvelope {
        /// The raw line, kept whole for diagnosis.
        message: String,
    },
}

/// Attribute one line of runtime output.
pub fn classify(line: &str) -> Attribution {
    let Some(framed) = line.strip_prefix(LOG_BEGIN) else {
        return Attribution::Runtime {
            message: line.to_string(),
        };
    };
    let Some(end) = framed.find(LOG_END) else {
        return Attribution::Runtime {
            message: line.to_string(),
        };
    };
    let rest = &framed[end + LOG_END.len()..];
    let message = rest.strip_prefix(' ').unwrap_or(rest).to_string();
    match serde_json::from_str::<Envelope>(&framed[..end]) {
        Ok(env) => match env.kind.as_str() {
            "worker" => Attribution::Worker {
                id: env.id,
                name: env.name,
                message,
            },
            "router" => Attribution::Router {
                id: env.id,
                name: env.name,
                message,
            },
            _ => Attribution::BadEnvelope {
                message: line.to_string(),
            },
        },
        Err(_) => Attribution::BadEnvelope {
            message: line.to_string(),
        },
    }
}

/// Re-emit one attributed line as a tracing event.
///
/// `stderr` only affects runtime-attributed lines; framed tenant output has
/// no level of its own and is emitted at info.
pub fn emit(worker_id: usize, stderr: bool, line: Attribution) {
    match line {
        Attribution::Worker { id, name, message } => {
            info!(worker = worker_id, project_id = %id, project = %name, "{message}");
        }
        Attribution::Router { id, name, message } => {
            info!(worker = worker_id, project_id = %id, project = %name, source = "router", "{message}");
        }
        Attribution::Runtime { message } => {
            if stderr {
                warn!(worker = worker_id, source = "runtime", "{message}");
            } else {
                info!(worker = worker_id, source = "runtime", "{message}");
            }
        }
        Attribution::BadEnvelope { message } => {
            error!(worker = worker_id, source = "runtime", "Undecodable log envelope: {message}");
        }
    }
}

/// Drain one runtime output stream, attributing and re-emitting every line.
///
/// Returns when the stream closes, which happens when the child exits.
pub async fn pump<R>(reader: R, worker_id: usize, stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => emit(worker_id, stderr, classify(&line)),
            Ok(None) => break,
            Err(e) => {
                debug!(worker = worker_id, "Runtime log stream closed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(envelope: &str, message: &str) -> String {
        format!("{LOG_BEGIN}{envelope}{LOG_END} {message}")
    }

    #[test]
    fn worker_lines_carry_tenant_identity() {
        let line = framed(
            r#"{"type":"worker","id":"w-1","name":"blog"}"#,
            "request served",
        );
        assert_eq!(
            classify(&line),
            Attribution::Worker {
                id: "w-1".to_string(),
                name: "blog".to_string(),
                message: "request served".to_string(),
            }
        );
    }

    #[test]
    fn router_lines_are_distinguished_from_workers() {
        let line = framed(r#"{"type":"router","id":"r-0","name":"router"}"#, "no route");
        assert_eq!(
            classify(&line),
            Attribution::Router {
                id: "r-0".to_string(),
                name: "router".to_string(),
                message: "no route".to_string(),
            }
        );
    }

    #[test]
    fn unframed_lines_attribute_to_the_runtime() {
        assert_eq!(
            classify("listening on engine.sock"),
            Attribution::Runtime {
                message: "listening on engine.sock".to_string(),
            }
        );
    }

    #[test]
    fn begin_without_end_attributes_to_the_runtime() {
        let line = format!("{LOG_BEGIN}{{\"type\":\"worker\"");
        assert_eq!(
            classify(&line),
            Attribution::Runtime { message: line },
        );
    }

    #[test]
    fn missing_field_is_a_bad_envelope() {
        let line = framed(r#"{"type":"worker","id":"w-1"}"#, "hello");
        assert!(matches!(classify(&line), Attribution::BadEnvelope { .. }));
    }

    #[test]
    fn wrong_field_type_is_a_bad_envelope() {
        let line = framed(r#"{"type":"worker","id":7,"name":"blog"}"#, "hello");
        assert!(matches!(classify(&line), Attribution::BadEnvelope { .. }));
    }

    #[test]
    fn unknown_type_tag_is_a_bad_envelope() {
        let line = framed(r#"{"type":"gateway","id":"g-1","name":"g"}"#, "hello");
        assert!(matches!(classify(&line), Attribution::BadEnvelope { .. }));
    }

    #[test]
    fn extra_envelope_fields_are_tolerated() {
        let line = framed(
            r#"{"type":"worker","id":"w-1","name":"blog","level":"warn"}"#,
            "slow request",
        );
        assert!(matches!(classify(&line), Attribution::Worker { .. }));
    }

    #[test]
    fn message_survives_verbatim_after_the_marker() {
        let line = format!(
            "{LOG_BEGIN}{}{LOG_END}   spaced   out  ",
            r#"{"type":"worker","id":"w","name":"n"}"#
        );
        match classify(&line) {
            Attribution::Worker { message, .. } => {
                assert_eq!(message, "  spaced   out  ");
            }
            other => panic!("unexpected attribution: {other:?}"),
        }
    }

    #[test]
    fn empty_message_is_allowed() {
        let line = format!(
            "{LOG_BEGIN}{}{LOG_END}",
            r#"{"type":"worker","id":"w","name":"n"}"#
        );
        match classify(&line) {
            Attribution::Worker { message, .. } => assert_eq!(message, ""),
            other => panic!("unexpected attribution: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pump_drains_a_stream_to_completion() {
        let input = format!(
            "{}\nplain runtime line\n",
            framed(r#"{"type":"worker","id":"w","name":"n"}"#, "one")
        );
        pump(input.as_bytes(), 0, false).await;
    }
}
