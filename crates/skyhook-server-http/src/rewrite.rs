//! HTTP head parsing and the header rewrite middleware
//!
//! The ingress rewrites exactly one request head on the way in (adding
//! `X-Forwarded-For`) and one response head on the way out (adding the
//! gateway fingerprint). Everything after the first exchange is treated as
//! opaque, so upgraded connections (websockets, raw streaming) pass through
//! untouched.

/// Methods accepted on the public ingress.
pub const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "TRACE", "CONNECT",
];

/// Header the response middleware stamps onto the first origin response.
pub const FINGERPRINT_HEADER: &str = "X-Tunnel-Fingerprint";

const CRLF: &str = "\r\n";

/// Position one past the CRLFCRLF terminator of an HTTP head, if present.
pub fn head_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Whether the first line of `head` is a recognizable HTTP/1.x request
/// line.
pub fn is_request_head(head: &str) -> bool {
    let line = match head.split(CRLF).next() {
        Some(line) => line,
        None => return false,
    };
    let mut parts = line.split_whitespace();
    let method_ok = parts.next().is_some_and(|m| HTTP_METHODS.contains(&m));
    let target_ok = parts.next().is_some();
    let version_ok = parts.next().is_some_and(|v| v.starts_with("HTTP/"));
    method_ok && target_ok && version_ok
}

/// Whether `line` is an HTTP status line (`HTTP/x.y NNN reason`).
pub fn is_status_line(line: &str) -> bool {
    let mut parts = line.splitn(3, ' ');

    let version_ok = parts.next().is_some_and(|v| {
        let v = v.as_bytes();
        v.len() == 8
            && v.starts_with(b"HTTP/")
            && v[5].is_ascii_digit()
            && v[6] == b'.'
            && v[7].is_ascii_digit()
    });
    let status_ok = parts
        .next()
        .is_some_and(|s| s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()));
    let reason_ok = parts.next().is_some_and(|r| !r.is_empty());

    version_ok && status_ok && reason_ok
}

/// Host header value, without any port suffix.
pub fn host_header(head: &str) -> Option<String> {
    head.split(CRLF)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("host") {
                let value = value.trim();
                Some(value.split(':').next().unwrap_or(value).to_string())
            } else {
                None
            }
        })
}

/// Leftmost label of a host name: the tunnel slug.
pub fn slug_of_host(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

/// Start middleware: insert or extend `X-Forwarded-For` with the public
/// peer address, preserving any upstream chain.
pub fn append_forwarded_for(head: &str, peer_ip: &str) -> String {
    let trimmed = head.strip_suffix("\r\n\r\n").unwrap_or(head);
    let mut out = String::with_capacity(head.len() + 32);
    let mut extended = false;

    for (index, line) in trimmed.split(CRLF).enumerate() {
        if index > 0 && !extended {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("x-forwarded-for") {
                    out.push_str(name);
                    out.push(':');
                    out.push_str(value);
                    out.push_str(", ");
                    out.push_str(peer_ip);
                    out.push_str(CRLF);
                    extended = true;
                    continue;
                }
            }
        }
        out.push_str(line);
        out.push_str(CRLF);
    }

    if !extended {
        out.push_str("X-Forwarded-For: ");
        out.push_str(peer_ip);
        out.push_str(CRLF);
    }
    out.push_str(CRLF);
    out
}

/// Response middleware: a one-shot transform over the first
/// CRLFCRLF-terminated prefix of the origin's byte stream.
///
/// Once the head has been emitted (or the prefix turns out not to be an
/// HTTP status line) every later chunk passes through unchanged.
pub struct ResponseRewriter {
    fingerprint: String,
    pending: Vec<u8>,
    emitted: bool,
    limit: usize,
}

impl ResponseRewriter {
    pub fn new(fingerprint: impl Into<String>, limit: usize) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            pending: Vec::new(),
            emitted: false,
            limit,
        }
    }

    /// Feed origin bytes in; get the bytes to forward out.
    pub fn transform(&mut self, chunk: &[u8]) -> Vec<u8> {
        if self.emitted {
            return chunk.to_vec();
        }

        self.pending.extend_from_slice(chunk);

        if let Some(end) = head_end(&self.pending) {
            self.emitted = true;
            let rest = self.pending.split_off(end);
            let head_bytes = std::mem::take(&mut self.pending);
            let head = String::from_utf8_lossy(&head_bytes).into_owned();

            let mut out = if head.split(CRLF).next().is_some_and(is_status_line) {
                self.stamp(&head).into_bytes()
            } else {
                // not an HTTP response; forward verbatim
                head_bytes
            };
            out.extend_from_slice(&rest);
            return out;
        }

        if self.pending.len() > self.limit {
            // no head within the ceiling; give up on rewriting
            self.emitted = true;
            return std::mem::take(&mut self.pending);
        }

        Vec::new()
    }

    /// Flush whatever is buffered when the origin closes before completing
    /// a head.
    pub fn finish(&mut self) -> Vec<u8> {
        self.emitted = true;
        std::mem::take(&mut self.pending)
    }

    fn stamp(&self, head: &str) -> String {
        let trimmed = head.strip_suffix("\r\n\r\n").unwrap_or(head);
        let mut out = String::with_capacity(head.len() + 48);
        for line in trimmed.split(CRLF) {
            out.push_str(line);
            out.push_str(CRLF);
        }
        out.push_str(FINGERPRINT_HEADER);
        out.push_str(": ");
        out.push_str(&self.fingerprint);
        out.push_str(CRLF);
        out.push_str(CRLF);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = "GET /path HTTP/1.1\r\nHost: abc.example.com\r\nUser-Agent: curl\r\n\r\n";

    #[test]
    fn test_head_end() {
        assert_eq!(head_end(HEAD.as_bytes()), Some(HEAD.len()));
        assert_eq!(head_end(b"GET / HTTP/1.1\r\nHost: x"), None);
        assert_eq!(head_end(b""), None);
    }

    #[test]
    fn test_request_head_validation() {
        assert!(is_request_head(HEAD));
        assert!(is_request_head("POST /submit HTTP/1.0\r\n\r\n"));
        assert!(is_request_head("CONNECT host:443 HTTP/1.1\r\n\r\n"));

        assert!(!is_request_head("FETCH / HTTP/1.1\r\n\r\n"));
        assert!(!is_request_head("GET HTTP/1.1\r\n\r\n"));
        assert!(!is_request_head("\x16\x03\x01\x02\x00"));
    }

    #[test]
    fn test_status_line_validation() {
        assert!(is_status_line("HTTP/1.1 200 OK"));
        assert!(is_status_line("HTTP/1.0 404 Not Found"));
        assert!(is_status_line("HTTP/2.0 502 Bad Gateway"));

        assert!(!is_status_line("HTTP/1.1 200"));
        assert!(!is_status_line("HTTP/1.1 20 OK"));
        assert!(!is_status_line("ICY 200 OK"));
        assert!(!is_status_line("GET / HTTP/1.1"));
    }

    #[test]
    fn test_host_and_slug_extraction() {
        assert_eq!(host_header(HEAD).unwrap(), "abc.example.com");
        assert_eq!(
            host_header("GET / HTTP/1.1\r\nhost: a.b.c:8443\r\n\r\n").unwrap(),
            "a.b.c"
        );
        assert!(host_header("GET / HTTP/1.1\r\nUser-Agent: x\r\n\r\n").is_none());

        assert_eq!(slug_of_host("abc.example.com"), "abc");
        assert_eq!(slug_of_host("ping.example.com"), "ping");
    }

    #[test]
    fn test_forwarded_for_inserted() {
        let out = append_forwarded_for(HEAD, "203.0.113.7");
        assert!(out.contains("X-Forwarded-For: 203.0.113.7\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
        assert!(out.starts_with("GET /path HTTP/1.1\r\n"));
        // other headers intact
        assert!(out.contains("Host: abc.example.com\r\n"));
        assert!(out.contains("User-Agent: curl\r\n"));
        // exactly one blank line
        assert_eq!(out.matches("\r\n\r\n").count(), 1);
    }

    #[test]
    fn test_forwarded_for_appends_to_chain() {
        let head =
            "GET / HTTP/1.1\r\nHost: a.example.com\r\nX-Forwarded-For: 198.51.100.9\r\n\r\n";
        let out = append_forwarded_for(head, "203.0.113.7");
        assert!(out.contains("X-Forwarded-For: 198.51.100.9, 203.0.113.7\r\n"));
        // only one occurrence
        assert_eq!(out.matches("X-Forwarded-For").count(), 1);
    }

    #[test]
    fn test_response_rewriter_stamps_first_head() {
        let mut rewriter = ResponseRewriter::new("skyhook/0.1.0", 32 * 1024);
        let out = rewriter.transform(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("X-Tunnel-Fingerprint: skyhook/0.1.0\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
        assert_eq!(text.matches("X-Tunnel-Fingerprint").count(), 1);

        // later chunks pass through untouched
        let raw = rewriter.transform(b"\x00\x81binary frame");
        assert_eq!(raw, b"\x00\x81binary frame");
    }

    #[test]
    fn test_response_rewriter_split_head() {
        let mut rewriter = ResponseRewriter::new("skyhook/0.1.0", 32 * 1024);
        assert!(rewriter.transform(b"HTTP/1.1 200 OK\r\nConte").is_empty());
        let out = rewriter.transform(b"nt-Length: 0\r\n\r\n");
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.contains("X-Tunnel-Fingerprint"));
    }

    #[test]
    fn test_response_rewriter_passes_non_http_through() {
        let mut rewriter = ResponseRewriter::new("skyhook/0.1.0", 32 * 1024);
        let out = rewriter.transform(b"SSH-2.0-banner\r\n\r\nmore");
        assert_eq!(out, b"SSH-2.0-banner\r\n\r\nmore");
        assert_eq!(rewriter.transform(b"tail"), b"tail");
    }

    #[test]
    fn test_response_rewriter_finish_flushes() {
        let mut rewriter = ResponseRewriter::new("skyhook/0.1.0", 32 * 1024);
        assert!(rewriter
            .transform(b"partial head without terminator")
            .is_empty());
        assert_eq!(rewriter.finish(), b"partial head without terminator");
    }
}
