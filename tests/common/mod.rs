//! Scripted in-memory botwire server for integration tests.
//!
//! `FakeServer::transport()` hands the bot a [`Transport`] whose every
//! `connect()` opens a `tokio::io::duplex` pipe and runs one server
//! connection on the far end, using the crate's own codec and crypto.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use botwire::bot::LoginSolver;
use botwire::codec::crypto::{EphemeralKeys, PublicKey, SessionKey};
use botwire::codec::{read_frame, write_frame, FrameCodec};
use botwire::contact::{FriendInfo, GroupInfo, GroupSettings, GroupSnapshot, MemberInfo, Roster};
use botwire::protocol::{LoginOutcome, ProtocolMessage, PushNotice};
use botwire::transport::BoxedStream;
use botwire::{Bot, BotConfiguration, BotError, MemberPermission, Transport};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::sync::{mpsc, oneshot};

pub const BOT_UIN: u64 = 10_001;
pub const GROUP_ID: u64 = 500;
pub const FRIEND_ID: u64 = 20_001;
pub const MEMBER_ID: u64 = 30_001;
pub const ADMIN_ID: u64 = 30_002;

/// Friend whose messages the server answers late.
pub const SLOW_FRIEND_ID: u64 = 20_002;

/// Server behaviour knobs.
#[derive(Debug, Clone)]
pub struct Script {
    pub captcha_rounds: u32,
    pub captcha_answer: String,
    pub wrong_password: bool,
    pub refuse_connections: bool,
    /// Connections with an index below this never answer heartbeats.
    pub silent_heartbeat_connections: usize,
    /// Connections with an index below this hang up on `RosterRequest`.
    pub drop_on_roster_connections: usize,
    /// Sent once, right behind the next roster reply.
    pub push_after_roster: Option<PushNotice>,
    pub roster: Roster,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            captcha_rounds: 0,
            captcha_answer: "4821".to_string(),
            wrong_password: false,
            refuse_connections: false,
            silent_heartbeat_connections: 0,
            drop_on_roster_connections: 0,
            push_after_roster: None,
            roster: default_roster(),
        }
    }
}

pub fn member(id: u64, nick: &str, permission: MemberPermission) -> MemberInfo {
    MemberInfo {
        id,
        nick: nick.to_string(),
        card: String::new(),
        special_title: String::new(),
        permission,
        muted_until: None,
    }
}

pub fn group(id: u64, name: &str, bot_permission: MemberPermission) -> GroupSnapshot {
    GroupSnapshot {
        info: GroupInfo {
            id,
            name: name.to_string(),
            owner_id: ADMIN_ID,
            announcement: String::new(),
            settings: GroupSettings::default(),
            bot_permission,
            bot_muted_until: None,
        },
        members: vec![
            member(MEMBER_ID, "alice", MemberPermission::Member),
            member(ADMIN_ID, "root", MemberPermission::Owner),
        ],
    }
}

pub fn default_roster() -> Roster {
    Roster {
        nick: "testbot".to_string(),
        friends: vec![
            FriendInfo {
                id: FRIEND_ID,
                nick: "bob".to_string(),
                remark: String::new(),
            },
            FriendInfo {
                id: SLOW_FRIEND_ID,
                nick: "carol".to_string(),
                remark: String::new(),
            },
        ],
        groups: vec![group(GROUP_ID, "Old", MemberPermission::Administrator)],
    }
}

#[derive(Default)]
struct Live {
    pushes: Option<mpsc::UnboundedSender<(PushNotice, bool)>>,
    kill: Option<oneshot::Sender<()>>,
}

struct Shared {
    script: Mutex<Script>,
    connections: AtomicUsize,
    logins: AtomicUsize,
    captcha_answers: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProtocolMessage>>,
    live: Mutex<Live>,
    next_message_id: AtomicU32,
}

/// Handle to the scripted server.
#[derive(Clone)]
pub struct FakeServer {
    shared: Arc<Shared>,
}

impl FakeServer {
    pub fn new(script: Script) -> Self {
        Self {
            shared: Arc::new(Shared {
                script: Mutex::new(script),
                connections: AtomicUsize::new(0),
                logins: AtomicUsize::new(0),
                captcha_answers: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                live: Mutex::new(Live::default()),
                next_message_id: AtomicU32::new(1),
            }),
        }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(FakeTransport {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Connections opened so far.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Successful logins so far.
    pub fn logins(&self) -> usize {
        self.shared.logins.load(Ordering::SeqCst)
    }

    pub fn captcha_answers(&self) -> Vec<String> {
        self.shared.captcha_answers.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ProtocolMessage> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn update_script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.script.lock().unwrap());
    }

    /// Push a notice on the current connection.
    pub fn push(&self, notice: PushNotice) {
        self.push_frame(notice, true);
    }

    /// Push a notice in a plaintext frame, bypassing the session key.
    pub fn push_plain(&self, notice: PushNotice) {
        self.push_frame(notice, false);
    }

    fn push_frame(&self, notice: PushNotice, sealed: bool) {
        let live = self.shared.live.lock().unwrap();
        live.pushes
            .as_ref()
            .expect("no live connection")
            .send((notice, sealed))
            .expect("connection gone");
    }

    /// Close the current connection from the server side.
    pub fn drop_connection(&self) {
        if let Some(kill) = self.shared.live.lock().unwrap().kill.take() {
            let _ = kill.send(());
        }
    }
}

struct FakeTransport {
    shared: Arc<Shared>,
}

impl Transport for FakeTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = botwire::Result<BoxedStream>> + Send + '_>> {
        Box::pin(async move {
            if self.shared.script.lock().unwrap().refuse_connections {
                return Err(BotError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused by script",
                )));
            }
            let index = self.shared.connections.fetch_add(1, Ordering::SeqCst);
            let (client, server) = tokio::io::duplex(256 * 1024);
            tokio::spawn(serve(Arc::clone(&self.shared), server, index));
            Ok(Box::new(client) as BoxedStream)
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }

    fn remote_addr(&self) -> String {
        "memory".to_string()
    }
}

async fn send<S: AsyncWrite + Unpin>(
    stream: &mut S,
    seq: u32,
    message: &ProtocolMessage,
    key: Option<&SessionKey>,
) {
    let frame = FrameCodec::default()
        .encode(seq, &message.to_bytes().unwrap(), key)
        .unwrap();
    let _ = write_frame(stream, &frame).await;
}

async fn recv<S: AsyncRead + Unpin>(
    stream: &mut S,
    key: Option<&SessionKey>,
) -> Option<(u32, ProtocolMessage)> {
    let bytes = read_frame(stream).await.ok()??;
    let frame = FrameCodec::default().decode(&bytes, key).ok()?;
    Some((frame.sequence, ProtocolMessage::from_bytes(&frame.payload).ok()?))
}

async fn serve(shared: Arc<Shared>, mut stream: DuplexStream, index: usize) {
    let script = shared.script.lock().unwrap().clone();

    let Some((seq, ProtocolMessage::Hello { uin, public_key })) = recv(&mut stream, None).await
    else {
        return;
    };
    let keys = EphemeralKeys::generate();
    let server_public = keys.public_key();
    let client_public = PublicKey::try_from(public_key.as_slice()).unwrap();
    let key = SessionKey::derive(&keys.agree(&client_public).unwrap(), uin).unwrap();
    send(
        &mut stream,
        seq,
        &ProtocolMessage::ServerHello {
            public_key: server_public.to_vec(),
        },
        None,
    )
    .await;

    let Some((mut seq, ProtocolMessage::Login { .. })) = recv(&mut stream, Some(&key)).await else {
        return;
    };
    if script.wrong_password {
        let outcome = LoginOutcome::WrongPassword;
        send(&mut stream, seq, &ProtocolMessage::LoginResult { outcome }, Some(&key)).await;
        return;
    }

    for round in 0..script.captcha_rounds {
        let outcome = LoginOutcome::CaptchaRequired {
            captcha_id: format!("c{round}"),
            image: vec![0x89, b'P', b'N', b'G', round as u8],
        };
        send(&mut stream, seq, &ProtocolMessage::LoginResult { outcome }, Some(&key)).await;
        let Some((next, ProtocolMessage::SubmitCaptcha { answer, .. })) =
            recv(&mut stream, Some(&key)).await
        else {
            return;
        };
        shared.captcha_answers.lock().unwrap().push(answer.clone());
        if answer != script.captcha_answer {
            let outcome = LoginOutcome::Rejected {
                reason: "bad captcha".to_string(),
            };
            send(&mut stream, next, &ProtocolMessage::LoginResult { outcome }, Some(&key)).await;
            return;
        }
        seq = next;
    }

    let outcome = LoginOutcome::Success {
        nick: script.roster.nick.clone(),
    };
    send(&mut stream, seq, &ProtocolMessage::LoginResult { outcome }, Some(&key)).await;
    shared.logins.fetch_add(1, Ordering::SeqCst);

    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let (kill_tx, mut kill_rx) = oneshot::channel();
    {
        let mut live = shared.live.lock().unwrap();
        live.pushes = Some(push_tx);
        live.kill = Some(kill_tx);
    }

    let (mut reader, mut writer) = tokio::io::split(stream);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outgoing>();
    let writer_key = key.clone();
    let writer_task = tokio::spawn(async move {
        while let Some((seq, message, sealed)) = out_rx.recv().await {
            let key = sealed.then_some(&writer_key);
            send(&mut writer, seq, &message, key).await;
        }
    });
    let (req_tx, mut req_rx) = mpsc::unbounded_channel();
    let reader_key = key.clone();
    let reader_task = tokio::spawn(async move {
        while let Some(request) = recv(&mut reader, Some(&reader_key)).await {
            if req_tx.send(request).is_err() {
                break;
            }
        }
    });

    let silent_heartbeat = index < script.silent_heartbeat_connections;
    let drop_on_roster = index < script.drop_on_roster_connections;
    loop {
        tokio::select! {
            incoming = req_rx.recv() => {
                let Some((seq, request)) = incoming else { break };
                shared.requests.lock().unwrap().push(request.clone());
                if drop_on_roster && request == ProtocolMessage::RosterRequest {
                    break;
                }
                if let Some(reply) = answer(&shared, &out_tx, seq, request, silent_heartbeat) {
                    let _ = out_tx.send((seq, reply, true));
                }
            },
            Some((notice, sealed)) = push_rx.recv() => {
                let _ = out_tx.send((0, ProtocolMessage::Push { notice }, sealed));
            },
            _ = &mut kill_rx => break,
        }
    }
    reader_task.abort();
    writer_task.abort();
}

/// Outbound frame: sequence, message, and whether to seal it.
type Outgoing = (u32, ProtocolMessage, bool);

fn answer(
    shared: &Shared,
    out_tx: &mpsc::UnboundedSender<Outgoing>,
    seq: u32,
    request: ProtocolMessage,
    silent_heartbeat: bool,
) -> Option<ProtocolMessage> {
    let reply = match request {
        ProtocolMessage::Heartbeat if silent_heartbeat => return None,
        ProtocolMessage::Heartbeat => ProtocolMessage::HeartbeatAck,
        ProtocolMessage::RosterRequest => {
            let mut script = shared.script.lock().unwrap();
            let roster = ProtocolMessage::Roster {
                roster: script.roster.clone(),
            };
            let Some(notice) = script.push_after_roster.take() else {
                return Some(roster);
            };
            let _ = out_tx.send((seq, roster, true));
            let _ = out_tx.send((0, ProtocolMessage::Push { notice }, true));
            return None;
        },
        ProtocolMessage::SendFriendMessage { friend_id, .. } => {
            let receipt = ProtocolMessage::Receipt {
                message_id: shared.next_message_id.fetch_add(1, Ordering::SeqCst),
                time: 1_700_000_000,
            };
            if friend_id == SLOW_FRIEND_ID {
                let out = out_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    let _ = out.send((seq, receipt, true));
                });
                return None;
            }
            receipt
        },
        ProtocolMessage::SendGroupMessage { .. } => ProtocolMessage::Receipt {
            message_id: shared.next_message_id.fetch_add(1, Ordering::SeqCst),
            time: 1_700_000_000,
        },
        ProtocolMessage::UploadImageRequest { .. } => ProtocolMessage::UploadTicket {
            image_id: "img-1.png".to_string(),
            upload_url: None,
        },
        ProtocolMessage::QueryImageUrl { image_id } => ProtocolMessage::ImageUrl {
            url: format!("http://media.invalid/{image_id}"),
        },
        ProtocolMessage::Recall { .. }
        | ProtocolMessage::SetGroupName { .. }
        | ProtocolMessage::MuteMember { .. }
        | ProtocolMessage::KickMember { .. } => ProtocolMessage::Ack,
        other => ProtocolMessage::Error {
            code: 400,
            message: format!("unsupported {}", other.kind()),
        },
    };
    Some(reply)
}

/// Solver answering every captcha with a fixed string.
pub struct FixedSolver(pub String);

impl LoginSolver for FixedSolver {
    fn solve_captcha<'a>(
        &'a self,
        _uin: u64,
        _image: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move { Some(self.0.clone()) })
    }
}

/// Fast timings so reconnect and heartbeat tests finish quickly.
pub fn fast_config() -> BotConfiguration {
    let mut config = BotConfiguration::default();
    let net = &mut config.network;
    net.request_timeout_ms = 300;
    net.max_send_retries = 1;
    net.retry_backoff_ms = 20;
    net.heartbeat_interval_ms = 100;
    net.heartbeat_timeout_ms = 50;
    net.heartbeat_miss_threshold = 2;
    net.reconnect_max_attempts = 3;
    net.reconnect_backoff_base_ms = 20;
    net.reconnect_backoff_max_ms = 100;
    net.login_timeout_ms = 2_000;
    config
}

/// Bot wired to `server`. Each test must use its own `uin`.
pub fn bot(server: &FakeServer, uin: u64, config: BotConfiguration) -> Bot {
    Bot::builder(uin, "hunter2")
        .config(config)
        .transport(server.transport())
        .login_solver(Arc::new(FixedSolver("4821".to_string())))
        .build()
        .unwrap()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
