//! Log-format pattern compiler.
//!
//! Translates an Apache-style pattern (`%a`, `%s`, `%{X-Real-IP}i`, ...) into a
//! [`CompiledTemplate`]: an ordered list of literal segments and typed
//! placeholders. Compilation happens once, when the logger is built.
//!
//! # Directives
//! | Directive      | Placeholder key            | Output                                  |
//! |----------------|----------------------------|-----------------------------------------|
//! | `%a`           | `RemoteIP`                 | client IP                               |
//! | `%A`           | `LocalIP`                  | server IP                               |
//! | `%b`           | `BytesSent\|-`             | bytes sent, `-` when zero               |
//! | `%B`           | `BytesSent\|0`             | bytes sent                              |
//! | `%H`           | `Proto`                    | protocol, e.g. `HTTP/1.1`               |
//! | `%m`           | `Method`                   | request method                          |
//! | `%q`           | `QueryString`              | query string, keys sorted               |
//! | `%r`           | `Method` ` ` `RequestURI`  | method and request URI                  |
//! | `%s`           | `StatusCode`               | final status                            |
//! | `%t`           | `ReceivedAt\|<default>`    | receive time                            |
//! | `%U`           | `URLPath`                  | URL path                                |
//! | `%D`           | `Latency\|-`               | latency in milliseconds                 |
//! | `%T`           | `Latency\|s`               | latency in seconds, 3 decimals          |
//! | `%F`           | `FirstByteTime\|-`         | time to first byte in ms, or `-`        |
//! | `%{FMT}t`      | `ReceivedAt\|FMT`          | receive time, strftime format           |
//! | `%{Name}i`     | `RequestHeader\|name`      | request header, or `-`                  |
//! | `%{Name}o`     | `ResponseHeader\|name`     | response header, or `-`                 |
//!
//! Raw placeholders `${Key}` are accepted for any key above plus
//! `AM-Trace-ID` and `Content-Length`.

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderName;
use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

/// Time format used by the bare `%t` directive.
pub const DEFAULT_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Human-readable, Apache-combined-like pattern.
pub const DEFAULT_PATTERN: &str = concat!(
    r#"%{%Y-%m-%dT%H:%M:%S%.3f%z}t "%{CF-Ray}i" "${AM-Trace-ID}" "#,
    r#"%a %A %{Host}i "%r" %s - %T "%{X-Real-IP}i" "%{X-Forwarded-For}i" "#,
    r#"%{Content-Length}i - %{Content-Length}o %b"#,
);

/// One JSON object per line, same field set as [`DEFAULT_PATTERN`].
pub const JSON_PATTERN: &str = concat!(
    r#"{"message": "AccessLogger %r %s [${AM-Trace-ID}]","#,
    r#""@timestamp":"%{%Y-%m-%dT%H:%M:%S%.3f%z}t","#,
    r#""category":"http_access_log","#,
    r#""context_cloudflare_ray":"%{CF-Ray}i","#,
    r#""context_trace_id":"${AM-Trace-ID}","#,
    r#""remote_addr":"%a","#,
    r#""server_addr":"%A","#,
    r#""host":"%{Host}i","#,
    r#""request":"%r","#,
    r#""status":"%s","#,
    r#""first_byte_commit_time":"%F ms","#,
    r#""request_time":%D,"#,
    r#""http_x_real_ip":"%{X-Real-IP}i","#,
    r#""http_x_forwarded_for":"%{X-Forwarded-For}i","#,
    r#""content_length":"${Content-Length}","#,
    r#""body_bytes_sent":"%B bytes"}"#,
);

/// Errors raised while compiling a pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    /// `%{` or `${` without a closing brace.
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    /// `%{}t`, `%{}i`, `%{}o` or `${}`.
    #[error("empty placeholder at byte {0}")]
    Empty(usize),

    /// The braces of a `%{...}t` directive do not hold a valid strftime format.
    #[error("invalid time format {0:?}")]
    InvalidTimeFormat(String),

    /// The braces of a header directive do not hold a valid header name.
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
}

/// Resolution key of a compiled placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    TraceId,
    ContentLength,
    RemoteIp,
    LocalIp,
    /// `%b`: byte count, `-` when nothing was sent.
    BytesSent,
    /// `%B`: byte count, `0` when nothing was sent.
    BytesSentOrZero,
    Proto,
    Method,
    QueryString,
    RequestUri,
    UrlPath,
    StatusCode,
    LatencyMillis,
    LatencySeconds,
    FirstByte,
    /// Receive time rendered with a strftime format.
    ReceivedAt(String),
    /// Request header, name already lower-cased.
    RequestHeader(HeaderName),
    /// Response header, name already lower-cased.
    ResponseHeader(HeaderName),
    /// Key not in the vocabulary; renders empty.
    Unknown(String),
}

impl Placeholder {
    /// Parse a placeholder key such as `StatusCode` or `RequestHeader|x-real-ip`.
    pub fn parse(key: &str) -> Result<Self, PatternError> {
        let placeholder = match key {
            "AM-Trace-ID" => Self::TraceId,
            "Content-Length" => Self::ContentLength,
            "RemoteIP" => Self::RemoteIp,
            "LocalIP" => Self::LocalIp,
            "BytesSent|-" => Self::BytesSent,
            "BytesSent|0" => Self::BytesSentOrZero,
            "Proto" => Self::Proto,
            "Method" => Self::Method,
            "QueryString" => Self::QueryString,
            "RequestURI" => Self::RequestUri,
            "URLPath" => Self::UrlPath,
            "StatusCode" => Self::StatusCode,
            "Latency|-" => Self::LatencyMillis,
            "Latency|s" => Self::LatencySeconds,
            "FirstByteTime|-" => Self::FirstByte,
            _ => match key.split_once('|') {
                Some(("ReceivedAt", format)) => Self::received_at(format)?,
                Some(("RequestHeader", name)) => Self::RequestHeader(header_name(name)?),
                Some(("ResponseHeader", name)) => Self::ResponseHeader(header_name(name)?),
                _ => Self::Unknown(key.to_string()),
            },
        };
        Ok(placeholder)
    }

    fn received_at(format: &str) -> Result<Self, PatternError> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(PatternError::InvalidTimeFormat(format.to_string()));
        }
        Ok(Self::ReceivedAt(format.to_string()))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraceId => f.write_str("AM-Trace-ID"),
            Self::ContentLength => f.write_str("Content-Length"),
            Self::RemoteIp => f.write_str("RemoteIP"),
            Self::LocalIp => f.write_str("LocalIP"),
            Self::BytesSent => f.write_str("BytesSent|-"),
            Self::BytesSentOrZero => f.write_str("BytesSent|0"),
            Self::Proto => f.write_str("Proto"),
            Self::Method => f.write_str("Method"),
            Self::QueryString => f.write_str("QueryString"),
            Self::RequestUri => f.write_str("RequestURI"),
            Self::UrlPath => f.write_str("URLPath"),
            Self::StatusCode => f.write_str("StatusCode"),
            Self::LatencyMillis => f.write_str("Latency|-"),
            Self::LatencySeconds => f.write_str("Latency|s"),
            Self::FirstByte => f.write_str("FirstByteTime|-"),
            Self::ReceivedAt(format) => write!(f, "ReceivedAt|{format}"),
            Self::RequestHeader(name) => write!(f, "RequestHeader|{name}"),
            Self::ResponseHeader(name) => write!(f, "ResponseHeader|{name}"),
            Self::Unknown(key) => f.write_str(key),
        }
    }
}

fn header_name(name: &str) -> Result<HeaderName, PatternError> {
    HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
        .map_err(|_| PatternError::InvalidHeaderName(name.to_string()))
}

/// A piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(Box<str>),
    Field(Placeholder),
}

/// Compiled, immutable form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
    request_headers: bool,
    response_headers: bool,
}

impl CompiledTemplate {
    /// Compile a pattern string.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let mut builder = SegmentBuilder::default();
        let bytes = pattern.as_bytes();
        let mut literal_start = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            let rest = &pattern[pos..];
            let consumed = match bytes[pos] {
                b'$' if rest.starts_with("${") => {
                    let (key, len) = braced(rest, pos)?;
                    builder.literal(&pattern[literal_start..pos]);
                    builder.field(Placeholder::parse(key)?);
                    Some(len)
                }
                b'%' => {
                    let before = &pattern[literal_start..pos];
                    compile_directive(rest, pos, before, &mut builder)?
                }
                _ => None,
            };
            match consumed {
                Some(len) => {
                    pos += len;
                    literal_start = pos;
                }
                None => pos += rest.chars().next().map_or(1, char::len_utf8),
            }
        }
        builder.literal(&pattern[literal_start..]);

        let segments = builder.segments;
        let request_headers = segments
            .iter()
            .any(|s| matches!(s, Segment::Field(Placeholder::RequestHeader(_))));
        let response_headers = segments
            .iter()
            .any(|s| matches!(s, Segment::Field(Placeholder::ResponseHeader(_))));

        Ok(Self {
            segments,
            request_headers,
            response_headers,
        })
    }

    /// Literal and placeholder segments, in output order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any placeholder reads request headers.
    pub fn uses_request_headers(&self) -> bool {
        self.request_headers
    }

    /// Whether any placeholder reads response headers.
    pub fn uses_response_headers(&self) -> bool {
        self.response_headers
    }

    /// Placeholders only, in output order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(placeholder) => Some(placeholder),
            Segment::Literal(_) => None,
        })
    }
}

impl FromStr for CompiledTemplate {
    type Err = PatternError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Self::compile(pattern)
    }
}

impl fmt::Display for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Field(placeholder) => write!(f, "${{{placeholder}}}")?,
            }
        }
        Ok(())
    }
}

/// Compile the `%` directive at the start of `rest`.
///
/// Returns the number of bytes consumed, or `None` when the `%` is literal.
fn compile_directive(
    rest: &str,
    pos: usize,
    before: &str,
    builder: &mut SegmentBuilder,
) -> Result<Option<usize>, PatternError> {
    let Some(directive) = rest[1..].chars().next() else {
        return Ok(None);
    };

    if directive == '{' {
        let (param, len) = braced(rest, pos)?;
        let placeholder = match rest[len..].chars().next() {
            Some('t') => Placeholder::received_at(param)?,
            Some('i') => Placeholder::RequestHeader(header_name(param)?),
            Some('o') => Placeholder::ResponseHeader(header_name(param)?),
            // Not a parameterised directive: keep `%{...}` as text.
            _ => return Ok(None),
        };
        builder.literal(before);
        builder.field(placeholder);
        return Ok(Some(len + 1));
    }

    let fields: &[Placeholder] = match directive {
        'a' => &[Placeholder::RemoteIp],
        'A' => &[Placeholder::LocalIp],
        'b' => &[Placeholder::BytesSent],
        'B' => &[Placeholder::BytesSentOrZero],
        'H' => &[Placeholder::Proto],
        'm' => &[Placeholder::Method],
        'q' => &[Placeholder::QueryString],
        'r' => &[Placeholder::Method, Placeholder::RequestUri],
        's' => &[Placeholder::StatusCode],
        'U' => &[Placeholder::UrlPath],
        'D' => &[Placeholder::LatencyMillis],
        'T' => &[Placeholder::LatencySeconds],
        'F' => &[Placeholder::FirstByte],
        't' => {
            builder.literal(before);
            builder.field(Placeholder::ReceivedAt(DEFAULT_TIME_FORMAT.to_string()));
            return Ok(Some(2));
        }
        _ => return Ok(None),
    };

    builder.literal(before);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            builder.literal(" ");
        }
        builder.field(field.clone());
    }
    Ok(Some(2))
}

/// Split `?{inner}...` at the start of `text`, where `?` is a one-byte sigil.
///
/// Returns the inner text and the length consumed including sigil and braces.
fn braced(text: &str, pos: usize) -> Result<(&str, usize), PatternError> {
    let body = &text[2..];
    let end = body.find('}').ok_or(PatternError::Unterminated(pos))?;
    if end == 0 {
        return Err(PatternError::Empty(pos));
    }
    Ok((&body[..end], end + 3))
}

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
}

impl SegmentBuilder {
    fn literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            let mut merged = String::with_capacity(last.len() + text.len());
            merged.push_str(last);
            merged.push_str(text);
            *last = merged.into_boxed_str();
        } else {
            self.segments.push(Segment::Literal(text.into()));
        }
    }

    fn field(&mut self, placeholder: Placeholder) {
        self.segments.push(Segment::Field(placeholder));
    }
}
