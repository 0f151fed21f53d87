//! In-process stand-in for the PlantCare firmware's HTTP server

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How the mock answers `/power/{index}` requests
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Keep the last PUT value per path, clamped to `max` if set
    Store { max: Option<i64> },
    /// Answer every request with HTTP 500
    ServerError,
    /// Answer 200 with a fixed body
    Body(String),
    /// Accept the connection and never answer within `Duration`
    Hang(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Default)]
struct Shared {
    levels: HashMap<String, i64>,
    requests: Vec<Recorded>,
}

pub struct MockDevice {
    host: String,
    behavior: Arc<Mutex<Behavior>>,
    shared: Arc<Mutex<Shared>>,
}

impl MockDevice {
    pub fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        let behavior = Arc::new(Mutex::new(behavior));
        let shared = Arc::new(Mutex::new(Shared::default()));

        let (b, s) = (behavior.clone(), shared.clone());
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let (b, s) = (b.clone(), s.clone());
                thread::spawn(move || {
                    let _ = handle(stream, &b, &s);
                });
            }
        });

        Self {
            host,
            behavior,
            shared,
        }
    }

    pub fn storing() -> Self {
        Self::start(Behavior::Store { max: None })
    }

    /// `127.0.0.1:{port}`, usable as a PlantCare host
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn level(&self, index: u32) -> Option<i64> {
        self.shared
            .lock()
            .unwrap()
            .levels
            .get(&format!("/power/{}", index))
            .copied()
    }

    pub fn preset(&self, index: u32, level: i64) {
        self.shared
            .lock()
            .unwrap()
            .levels
            .insert(format!("/power/{}", index), level);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.lock().unwrap().requests.clone()
    }
}

/// Host with nothing listening on it
pub fn closed_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn handle(
    stream: TcpStream,
    behavior: &Mutex<Behavior>,
    shared: &Mutex<Shared>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    let body = String::from_utf8_lossy(&body).to_string();

    let behavior = behavior.lock().unwrap().clone();
    let (status, reply) = {
        let mut shared = shared.lock().unwrap();
        shared.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body: body.clone(),
        });

        match behavior {
            Behavior::Store { max } => {
                if method == "PUT" {
                    let mut level: i64 = body.trim().parse().unwrap_or(0);
                    if let Some(max) = max {
                        level = level.clamp(0, max);
                    }
                    shared.levels.insert(path.clone(), level);
                }
                let level = shared.levels.get(&path).copied().unwrap_or(0);
                ("200 OK", level.to_string())
            }
            Behavior::ServerError => ("500 Internal Server Error", "oops".to_string()),
            Behavior::Body(text) => ("200 OK", text),
            Behavior::Hang(duration) => {
                drop(shared);
                thread::sleep(duration);
                return Ok(());
            }
        }
    };

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    )?;
    stream.flush()
}
