//! Test doubles for the two external services: a stub `yt-dlp` script and a
//! tiny HTTP responder standing in for the JSON APIs.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

pub(crate) const STUB_VIDEO_JSON: &str = r#"{
  "id": "dQw4w9WgXcQ",
  "title": "Never Gonna Give You Up #80s",
  "description": "The official video #RickAstley #music",
  "like_count": 18000000,
  "view_count": 1500000000,
  "comment_count": 2300000,
  "upload_date": "20091025",
  "timestamp": 1256453853,
  "duration": 212.0,
  "uploader": "Rick Astley",
  "channel_id": "UCuAXFkgsw1L7xaCfnd5JJOw",
  "categories": ["Music"],
  "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
}"#;

/// Writes an executable fake `yt-dlp` into `dir`. It answers based on the
/// last argument (the URL):
/// - contains `playlist`: a playlist listing
/// - contains `broken`: exits non-zero
/// - contains `garbage`: prints non-JSON
/// - contains `sleepy`: hangs for 5 seconds
/// - contains `sparse`: a video with nothing but an id
/// - anything else: [`STUB_VIDEO_JSON`]
///
/// `--get-url` prints a stream URL unless the URL contains `nostream`.
/// Every invocation appends its arguments to `calls.log` next to the script.
pub(crate) fn install_ytdlp_stub(dir: &Path) -> PathBuf {
    let script_path = dir.join("yt-dlp");
    let script = format!(
        r#"#!/usr/bin/env bash
set -uo pipefail
echo "$*" >> "$(dirname "$0")/calls.log"
url="${{@: -1}}"
if [[ " $* " == *" --version "* ]]; then
    echo "2025.01.01"
    exit 0
fi
if [[ " $* " == *" --get-url "* ]]; then
    if [[ "$url" == *nostream* ]]; then
        echo "ERROR: no suitable format" >&2
        exit 1
    fi
    echo "https://rr1.googlevideo.com/videoplayback?id=dQw4w9WgXcQ"
    exit 0
fi
case "$url" in
    *playlist*)
        echo '{{"_type":"playlist","id":"PL1234567890","entries":[{{"id":"aaaaaaaaaaa"}}]}}'
        ;;
    *broken*)
        echo "ERROR: Sign in to confirm you're not a bot" >&2
        exit 1
        ;;
    *garbage*)
        echo "this is not json"
        ;;
    *sleepy*)
        sleep 5
        ;;
    *sparse*)
        echo '{{"id":"sparse00000","title":null,"view_count":null}}'
        ;;
    *)
        cat <<'JSON'
{STUB_VIDEO_JSON}
JSON
        ;;
esac
exit 0
"#
    );
    fs::write(&script_path, script).expect("write yt-dlp stub");
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&script_path)
            .expect("stub metadata")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms).expect("chmod yt-dlp stub");
    }
    script_path
}

pub(crate) fn stub_calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .map(|log| log.lines().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Minimal HTTP/1.1 responder bound to an ephemeral local port. The handler
/// receives the request target (path plus query) and returns status + body.
pub(crate) struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub(crate) fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(match stream.try_clone() {
                    Ok(clone) => clone,
                    Err(_) => continue,
                });
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" || header == "\n" => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
                let target = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_owned();
                seen.lock().push(target.clone());

                let (status, body) = handler(&target);
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { base_url, requests }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// A base URL nothing listens on, for connection-refused paths.
pub(crate) fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
