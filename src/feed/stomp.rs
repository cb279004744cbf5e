use std::time::Duration;

use crate::feed::FeedError;

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    /// Frame command, e.g. `MESSAGE`.
    pub command: String,
    /// Headers in wire order; repeated names keep the first value.
    pub headers: Vec<(String, String)>,
    /// Frame body without the terminating NUL.
    pub body: String,
}

impl StompFrame {
    /// Frame with no headers or body.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to wire format, including the trailing NUL.
    pub fn encode(&self) -> String {
        let raw_headers = escapes_disabled(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 32);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if raw_headers {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            } else {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame, without its trailing NUL.
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        let (head, body) = match raw.find("\n\n") {
            Some(split) => (&raw[..split], &raw[split + 2..]),
            None => match raw.find("\r\n\r\n") {
                Some(split) => (&raw[..split], &raw[split + 4..]),
                None => (raw, ""),
            },
        };

        let mut lines = head.lines();
        let command = lines
            .next()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .ok_or_else(|| FeedError::Protocol("frame without command".into()))?
            .to_string();
        let raw_headers = escapes_disabled(&command);

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FeedError::Protocol(format!("malformed header line `{line}`")))?;
            if raw_headers {
                headers.push((name.to_string(), value.to_string()));
            } else {
                headers.push((unescape(name)?, unescape(value)?));
            }
        }

        Ok(Self {
            command,
            headers,
            body: body.to_string(),
        })
    }
}

/// Parse every frame in a transport message. Bare end-of-lines are heart-beats and are skipped.
pub fn parse_frames(text: &str) -> Result<Vec<StompFrame>, FeedError> {
    text.split('\0')
        .map(|chunk| chunk.trim_start_matches(['\r', '\n']))
        .filter(|chunk| !chunk.is_empty())
        .map(StompFrame::parse)
        .collect()
}

// CONNECT and CONNECTED frames carry headers verbatim.
fn escapes_disabled(command: &str) -> bool {
    matches!(command, "CONNECT" | "CONNECTED")
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, FeedError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(FeedError::Protocol(format!(
                    "undefined header escape `\\{}`",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

/// Heart-beat intervals agreed with the broker; `None` means disabled in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartBeat {
    /// How often the client must send something.
    pub outgoing: Option<Duration>,
    /// How often the broker promised to send something.
    pub incoming: Option<Duration>,
}

impl HeartBeat {
    /// Negotiate from the client's `cx,cy` request and the broker's `heart-beat` header.
    pub fn negotiate(requested: Duration, broker_header: Option<&str>) -> Self {
        let requested = requested.as_millis() as u64;
        let (sx, sy) = broker_header
            .and_then(|header| {
                let (sx, sy) = header.split_once(',')?;
                Some((sx.trim().parse::<u64>().ok()?, sy.trim().parse::<u64>().ok()?))
            })
            .unwrap_or((0, 0));

        let pick = |ours: u64, theirs: u64| {
            (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
        };

        Self {
            outgoing: pick(requested, sy),
            incoming: pick(requested, sx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_subscribe_frame() {
        let frame = StompFrame::new("SUBSCRIBE")
            .with_header("id", "sub-0")
            .with_header("destination", "/topic/games/g1");
        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\nid:sub-0\ndestination:/topic/games/g1\n\n\0"
        );
    }

    #[test]
    fn header_values_are_escaped_outside_connect() {
        let frame = StompFrame::new("SEND").with_header("note", "a:b\nc");
        assert!(frame.encode().contains("note:a\\cb\\nc\n"));

        let connect = StompFrame::new("CONNECT").with_header("host", "h:1");
        assert!(connect.encode().contains("host:h:1\n"));
    }

    #[test]
    fn parses_message_between_heartbeats() {
        let text = "\n\nMESSAGE\r\ndestination:/topic/games/g1\r\nsubscription:sub-0\r\n\r\n{\"type\":\"TEAM_STAT_UPDATE\"}\0\n";
        let frames = parse_frames(text).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, "MESSAGE");
        assert_eq!(frames[0].header("subscription"), Some("sub-0"));
        assert_eq!(frames[0].body, "{\"type\":\"TEAM_STAT_UPDATE\"}");
    }

    #[test]
    fn heartbeat_only_message_yields_nothing() {
        assert!(parse_frames("\n").unwrap().is_empty());
        assert!(parse_frames("\r\n").unwrap().is_empty());
    }

    #[test]
    fn first_repeated_header_wins() {
        let frame = StompFrame::parse("MESSAGE\nfoo:1\nfoo:2\n\n").unwrap();
        assert_eq!(frame.header("foo"), Some("1"));
    }

    #[test]
    fn undefined_escape_is_rejected() {
        assert!(matches!(
            StompFrame::parse("MESSAGE\nfoo:a\\tb\n\n"),
            Err(FeedError::Protocol(_))
        ));
    }

    #[test]
    fn heartbeat_negotiation_takes_the_slower_side() {
        let beat = HeartBeat::negotiate(Duration::from_millis(4_000), Some("10000,0"));
        assert_eq!(beat.incoming, Some(Duration::from_millis(10_000)));
        assert_eq!(beat.outgoing, None);

        let beat = HeartBeat::negotiate(Duration::from_millis(4_000), None);
        assert_eq!(beat, HeartBeat { outgoing: None, incoming: None });
    }
}
