//! Minimal RESP2 server for driving `RedisStore` without a Redis install.
//!
//! Understands the commands the store issues (plus the connection setup
//! commands the client sends), keeps its data across connections, and can
//! drop every open connection on demand.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use trialog_core::{RedisStore, StoreConfig};

#[derive(Debug, Clone)]
enum Value {
    List(Vec<String>),
    Scalar(String),
}

type Data = Arc<Mutex<HashMap<String, Value>>>;
type CommandLog = Arc<Mutex<Vec<Vec<String>>>>;

pub struct FakeRedis {
    addr: SocketAddr,
    data: Data,
    commands: CommandLog,
    drops: watch::Sender<u64>,
}

impl FakeRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let data: Data = Arc::default();
        let commands: CommandLog = Arc::default();
        let (drops, drop_rx) = watch::channel(0u64);

        let (accept_data, accept_log) = (Arc::clone(&data), Arc::clone(&commands));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                // Only drops requested after this connection opened apply to it.
                let mut drops = drop_rx.clone();
                drops.borrow_and_update();
                tokio::spawn(serve(
                    socket,
                    Arc::clone(&accept_data),
                    Arc::clone(&accept_log),
                    drops,
                ));
            }
        });

        Self {
            addr,
            data,
            commands,
            drops,
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}/0", self.addr)
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            url: Some(self.url()),
            ..StoreConfig::default()
        }
    }

    pub async fn connect(&self) -> RedisStore {
        RedisStore::connect(&self.config()).await.unwrap()
    }

    /// Closes every connection open right now. New connections are still
    /// accepted.
    pub fn drop_connections(&self) {
        self.drops.send_modify(|generation| *generation += 1);
    }

    /// Every command received so far, in arrival order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        match self.data.lock().unwrap().get(key) {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

async fn serve(socket: TcpStream, data: Data, log: CommandLog, mut drops: watch::Receiver<u64>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut queued: Option<Vec<Vec<String>>> = None;

    loop {
        let request = tokio::select! {
            request = read_command(&mut reader) => request,
            _ = drops.changed() => return,
        };
        let Some(args) = request else { return };
        log.lock().unwrap().push(args.clone());

        let name = args[0].to_ascii_uppercase();
        let reply = if name == "MULTI" {
            queued = Some(Vec::new());
            "+OK\r\n".to_string()
        } else if name == "EXEC"
            && let Some(commands) = queued.take()
        {
            let mut reply = format!("*{}\r\n", commands.len());
            for command in &commands {
                reply.push_str(&execute(command, &data));
            }
            reply
        } else if let Some(commands) = queued.as_mut() {
            commands.push(args);
            "+QUEUED\r\n".to_string()
        } else {
            execute(&args, &data)
        };

        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Option<Vec<String>> {
    let count: usize = read_header(reader, '*').await?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len: usize = read_header(reader, '$').await?;
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await.ok()?;
        buf.truncate(len);
        args.push(String::from_utf8(buf).ok()?);
    }
    (!args.is_empty()).then_some(args)
}

async fn read_header(reader: &mut BufReader<OwnedReadHalf>, marker: char) -> Option<usize> {
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    line.trim_end().strip_prefix(marker)?.parse().ok()
}

fn execute(args: &[String], data: &Data) -> String {
    let mut data = data.lock().unwrap();
    let name = args[0].to_ascii_uppercase();
    match (name.as_str(), &args[1..]) {
        ("PING", _) => "+PONG\r\n".to_string(),
        ("CLIENT" | "SELECT", _) => "+OK\r\n".to_string(),
        ("FLUSHDB", _) => {
            data.clear();
            "+OK\r\n".to_string()
        }
        ("RPUSH", [key, values @ ..]) => {
            match data
                .entry(key.clone())
                .or_insert_with(|| Value::List(Vec::new()))
            {
                Value::List(items) => {
                    items.extend(values.iter().cloned());
                    format!(":{}\r\n", items.len())
                }
                Value::Scalar(_) => wrong_type(),
            }
        }
        ("LLEN", [key]) => match data.get(key) {
            None => ":0\r\n".to_string(),
            Some(Value::List(items)) => format!(":{}\r\n", items.len()),
            Some(Value::Scalar(_)) => wrong_type(),
        },
        ("LRANGE", [key, start, stop]) => match data.get(key) {
            None => "*0\r\n".to_string(),
            Some(Value::List(items)) => {
                let (Ok(start), Ok(stop)) = (start.parse::<i64>(), stop.parse::<i64>()) else {
                    return "-ERR value is not an integer or out of range\r\n".to_string();
                };
                array(lrange(items, start, stop).iter().map(|s| Some(s.as_str())))
            }
            Some(Value::Scalar(_)) => wrong_type(),
        },
        ("SET", [key, value]) => {
            data.insert(key.clone(), Value::Scalar(value.clone()));
            "+OK\r\n".to_string()
        }
        ("GET", [key]) => match data.get(key) {
            None => "$-1\r\n".to_string(),
            Some(Value::Scalar(value)) => bulk(value),
            Some(Value::List(_)) => wrong_type(),
        },
        ("MGET", keys) => array(keys.iter().map(|key| match data.get(key) {
            Some(Value::Scalar(value)) => Some(value.as_str()),
            _ => None,
        })),
        ("KEYS", [pattern]) => {
            let pattern: Vec<char> = pattern.chars().collect();
            let mut keys: Vec<&str> = data
                .keys()
                .filter(|key| glob(&pattern, &key.chars().collect::<Vec<_>>()))
                .map(String::as_str)
                .collect();
            keys.sort_unstable();
            array(keys.into_iter().map(Some))
        }
        _ => format!("-ERR unknown command '{}'\r\n", args[0]),
    }
}

/// LRANGE index semantics: negative indices count from the tail and both
/// ends are clamped to the list.
fn lrange(items: &[String], start: i64, stop: i64) -> &[String] {
    let len = items.len() as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return &[];
    }
    &items[start as usize..=stop as usize]
}

/// Glob match supporting `*`, `?` and backslash escapes.
fn glob(pattern: &[char], text: &[char]) -> bool {
    match pattern {
        [] => text.is_empty(),
        ['*', rest @ ..] => (0..=text.len()).any(|skip| glob(rest, &text[skip..])),
        ['?', rest @ ..] => !text.is_empty() && glob(rest, &text[1..]),
        ['\\', literal, rest @ ..] | [literal, rest @ ..] => {
            text.first() == Some(literal) && glob(rest, &text[1..])
        }
    }
}

fn bulk(value: &str) -> String {
    format!("${}\r\n{value}\r\n", value.len())
}

fn array<'a>(values: impl ExactSizeIterator<Item = Option<&'a str>>) -> String {
    let mut reply = format!("*{}\r\n", values.len());
    for value in values {
        match value {
            Some(value) => reply.push_str(&bulk(value)),
            None => reply.push_str("$-1\r\n"),
        }
    }
    reply
}

fn wrong_type() -> String {
    "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".to_string()
}
