#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use shacl_mill::{CorpusStore, DocumentEntry, MillError};

/// Store wrapper that counts writes per object name.
pub struct CountingStore<S> {
    pub inner: S,
    pub writes: Mutex<Vec<(String, String)>>,
}

impl<S: CorpusStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes_to(&self, bucket: &str, name: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(b, n)| b == bucket && n == name)
            .count()
    }
}

impl<S: CorpusStore> CorpusStore for CountingStore<S> {
    fn list_documents(&self, bucket: &str) -> Result<Vec<DocumentEntry>, MillError> {
        self.inner.list_documents(bucket)
    }

    fn put_object(&self, bucket: &str, name: &str, content: &[u8]) -> Result<(), MillError> {
        self.writes
            .lock()
            .unwrap()
            .push((bucket.to_string(), name.to_string()));
        self.inner.put_object(bucket, name, content)
    }

    fn get_object(&self, bucket: &str, name: &str) -> Result<Option<Vec<u8>>, MillError> {
        self.inner.get_object(bucket, name)
    }
}

/// Serve a single request with `status` and `payload`.
pub fn spawn_one_shot_http(status: u16, payload: Vec<u8>) -> (String, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        respond(&mut stream, status, &payload);
        request
    });
    (format!("http://{addr}"), handle)
}

/// Fake SHACL upload service.
///
/// Answers `<document> <shape> .\n` for each upload. Uploads whose data graph
/// id contains `stall` are held for `stall` before answering; ids containing
/// `reject` get a 500.
pub struct MockValidationService {
    pub url: String,
    pub requests: Arc<AtomicUsize>,
    handle: thread::JoinHandle<()>,
}

impl MockValidationService {
    pub fn spawn(expected_requests: usize, stall: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let counter = counter.clone();
                thread::spawn(move || {
                    let request = read_request(&mut stream);
                    counter.fetch_add(1, Ordering::SeqCst);
                    let document = form_field(&request, "datagraph").unwrap_or_default();
                    let shape = form_field(&request, "shapegraph").unwrap_or_default();
                    if document.contains("stall") {
                        thread::sleep(stall);
                    }
                    if document.contains("reject") {
                        respond(&mut stream, 500, b"validator failure");
                        return;
                    }
                    let body = format!("<{document}> <{shape}> .\n");
                    respond(&mut stream, 200, body.as_bytes());
                });
            }
        });
        Self {
            url: format!("http://{addr}/uploader"),
            requests,
            handle,
        }
    }

    pub fn join(self) {
        self.handle.join().unwrap();
    }
}

fn respond(stream: &mut TcpStream, status: u16, payload: &[u8]) {
    let headers = format!(
        "HTTP/1.1 {status} Status\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    let _ = stream.write_all(headers.as_bytes());
    let _ = stream.write_all(payload);
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).unwrap_or(0);
        if read == 0 {
            return request;
        }
        request.extend_from_slice(&chunk[..read]);
        if let Some(header_end) = find(&request, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                return request;
            }
        }
    }
}

/// Value of the text field `name` in a multipart request.
pub fn form_field(request: &[u8], name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"\r\n\r\n");
    let start = find(request, marker.as_bytes())? + marker.len();
    let len = find(&request[start..], b"\r\n")?;
    Some(String::from_utf8_lossy(&request[start..start + len]).to_string())
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
