//! Template evaluation: placeholders resolved against a [`LogItem`].

use std::fmt::Write as _;

use axum::http::{HeaderMap, HeaderName};
use bytes::{BufMut, BytesMut};
use thiserror::Error;

use super::item::LogItem;
use super::pattern::{CompiledTemplate, Placeholder, Segment};

const DASH: &[u8] = b"-";

/// A placeholder could not be written into the line buffer.
#[derive(Debug, Error)]
#[error("failed to render placeholder `{placeholder}`")]
pub struct RenderError {
    pub placeholder: String,
}

impl CompiledTemplate {
    /// Render one line, including its trailing newline, into `buf`.
    ///
    /// `buf` is appended to; callers hand in a cleared buffer.
    pub fn render(
        &self,
        item: &LogItem<'_>,
        local_ip: &str,
        buf: &mut BytesMut,
    ) -> Result<(), RenderError> {
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => buf.put_slice(text.as_bytes()),
                Segment::Field(placeholder) => {
                    resolve(placeholder, item, local_ip, buf).map_err(|_| RenderError {
                        placeholder: placeholder.to_string(),
                    })?
                }
            }
        }
        buf.put_u8(b'\n');
        Ok(())
    }
}

fn resolve(
    placeholder: &Placeholder,
    item: &LogItem<'_>,
    local_ip: &str,
    buf: &mut BytesMut,
) -> std::fmt::Result {
    let mut numbers = itoa::Buffer::new();
    match placeholder {
        Placeholder::TraceId => buf.put_slice(item.trace_id.as_bytes()),
        Placeholder::ContentLength => {
            buf.put_slice(numbers.format(item.content_length).as_bytes())
        }
        Placeholder::RemoteIp => buf.put_slice(item.remote_addr.as_bytes()),
        Placeholder::LocalIp => buf.put_slice(local_ip.as_bytes()),
        Placeholder::BytesSent if item.bytes_sent == 0 => buf.put_slice(DASH),
        Placeholder::BytesSent | Placeholder::BytesSentOrZero => {
            buf.put_slice(numbers.format(item.bytes_sent).as_bytes())
        }
        Placeholder::Proto => write!(buf, "{:?}", item.version)?,
        Placeholder::Method => buf.put_slice(item.method.as_str().as_bytes()),
        Placeholder::QueryString => write_query(item, buf),
        Placeholder::RequestUri => buf.put_slice(item.request_uri().as_bytes()),
        Placeholder::UrlPath => buf.put_slice(item.uri.path().as_bytes()),
        Placeholder::StatusCode => buf.put_slice(item.status.as_str().as_bytes()),
        Placeholder::LatencyMillis => {
            buf.put_slice(numbers.format(item.latency.as_millis()).as_bytes())
        }
        Placeholder::LatencySeconds => write!(buf, "{:.3}", item.latency.as_secs_f64())?,
        Placeholder::FirstByte => match item.time_to_first_byte_ms() {
            Some(ms) => buf.put_slice(numbers.format(ms).as_bytes()),
            None => buf.put_slice(DASH),
        },
        Placeholder::ReceivedAt(format) => write!(buf, "{}", item.received_at.format(format))?,
        Placeholder::RequestHeader(name) => write_header(item.request_headers, name, buf),
        Placeholder::ResponseHeader(name) => write_header(item.response_headers, name, buf),
        Placeholder::Unknown(_) => {}
    }
    Ok(())
}

fn write_header(headers: &HeaderMap, name: &HeaderName, buf: &mut BytesMut) {
    match headers.get(name).map(|value| value.as_bytes()) {
        Some(value) if !value.is_empty() => buf.put_slice(value),
        _ => buf.put_slice(DASH),
    }
}

/// Query parameters re-encoded with keys in sorted order.
fn write_query(item: &LogItem<'_>, buf: &mut BytesMut) {
    let Some(query) = item.uri.query() else {
        return;
    };
    let mut pairs: Vec<_> = url::form_urlencoded::parse(query.as_bytes()).collect();
    // Stable: values keep their order within a key.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    buf.put_slice(encoded.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::item::fixtures::Fixture;
    use crate::access_log::pattern::JSON_PATTERN;
    use axum::http::{HeaderValue, StatusCode};
    use std::time::Duration;

    fn render(pattern: &str, item: &LogItem<'_>) -> String {
        let template = CompiledTemplate::compile(pattern).unwrap();
        let mut buf = BytesMut::new();
        template.render(item, "192.168.1.10", &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn test_status_request_latency() {
        let fixture = Fixture::get("/ping");
        assert_eq!(render("%s %r %D", &fixture.item()), "200 GET /ping 12\n");
    }

    #[test]
    fn test_bytes_sent_dash_only_on_zero() {
        let fixture = Fixture::get("/ping");
        let mut item = fixture.item();
        assert_eq!(render("%b|%B", &item), "-|0\n");

        item.bytes_sent = 1024;
        assert_eq!(render("%b|%B", &item), "1024|1024\n");
    }

    #[test]
    fn test_latency_formats() {
        let fixture = Fixture::get("/ping");
        let mut item = fixture.item();
        item.latency = Duration::from_micros(1_234_567);
        assert_eq!(render("%D %T", &item), "1234 1.235\n");

        item.latency = Duration::ZERO;
        assert_eq!(render("%D %T", &item), "0 0.000\n");
    }

    #[test]
    fn test_first_byte_time() {
        let fixture = Fixture::get("/ping");
        let mut item = fixture.item();
        assert_eq!(render("%F", &item), "-\n");

        item.first_byte_time = Some(item.received_at + chrono::Duration::milliseconds(7));
        assert_eq!(render("%F", &item), "7\n");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut fixture = Fixture::get("/ping");
        fixture
            .request_headers
            .insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        fixture
            .response_headers
            .insert("content-type", HeaderValue::from_static("text/plain"));

        let line = render("%{X-Real-IP}i %{X-Forwarded-For}i %{Content-Type}o", &fixture.item());
        assert_eq!(line, "1.2.3.4 - text/plain\n");
    }

    #[test]
    fn test_request_fields() {
        let fixture = Fixture::get("/search?page=2&q=rust&a=1");
        let mut item = fixture.item();
        item.status = StatusCode::NOT_FOUND;
        item.content_length = 17;
        item.trace_id = "abc/1;o=1";

        let line = render("%a %A %H %m %U %q %s ${Content-Length} ${AM-Trace-ID} ${Nope}.", &item);
        assert_eq!(
            line,
            "10.0.0.7 192.168.1.10 HTTP/1.1 GET /search a=1&page=2&q=rust 404 17 abc/1;o=1 .\n"
        );
    }

    #[test]
    fn test_received_at_formats() {
        let fixture = Fixture::get("/ping");
        assert_eq!(render("%{%s}t", &fixture.item()), "1700000000\n");

        let line = render("%t", &fixture.item());
        let expected = fixture.received_at.format("%d/%b/%Y:%H:%M:%S %z").to_string();
        assert_eq!(line, format!("{expected}\n"));
    }

    #[test]
    fn test_json_pattern_renders_valid_json() {
        let mut fixture = Fixture::get("/ping");
        fixture
            .request_headers
            .insert("host", HeaderValue::from_static("example.com"));
        let mut item = fixture.item();
        item.bytes_sent = 5;
        item.first_byte_time = Some(item.received_at + chrono::Duration::milliseconds(3));

        let line = render(JSON_PATTERN, &item);
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["request"], "GET /ping");
        assert_eq!(value["status"], "200");
        assert_eq!(value["request_time"], 12);
        assert_eq!(value["host"], "example.com");
        assert_eq!(value["first_byte_commit_time"], "3 ms");
        assert_eq!(value["body_bytes_sent"], "5 bytes");
        assert_eq!(value["server_addr"], "192.168.1.10");
        assert_eq!(value["http_x_real_ip"], "-");
    }
}
