//! Connection lifecycle, request correlation and push dispatch.
//!
//! One [`NetworkSession`] per bot. It owns at most one live connection at a
//! time; each connection runs a reader, a writer and (once online) a
//! heartbeat task. Connections carry a generation number so that a task of
//! an old connection can never tear down its successor.
//!
//! ```text
//!             login()
//! Disconnected ──────> Connecting ──> Authenticating ──> Online
//!                          ^                               │ drop / heartbeat misses
//!                          └────── Reconnecting <──────────┘
//!
//! any state ── close() / force offline / exhaustion / login failure ──> Closed
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument, Span};

use super::backoff::Backoff;
use super::handshake::{Credentials, Handshake};
use super::pending::PendingRequests;
use super::push::{self, PushOutcome};
use crate::bot::{LoginSolver, WeakBot};
use crate::codec::crypto::SessionKey;
use crate::codec::{read_frame, write_frame, FrameCodec};
use crate::config::NetworkConfig;
use crate::error::{BotError, LoginError, Result};
use crate::event::{BotEvent, BotOfflineEvent, BotOnlineEvent, BotReloginEvent};
use crate::protocol::{ProtocolMessage, PushNotice};
use crate::transport::{BoxedStream, Transport};

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Never logged in.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Key agreement and login in progress.
    Authenticating,
    /// Logged in; requests flow.
    Online,
    /// Connection lost; waiting to retry.
    Reconnecting,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Online => "online",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called (or the bot was dropped).
    Active {
        /// Caller-supplied cause.
        cause: Option<String>,
    },
    /// The server kicked the session.
    Force {
        /// Notice title.
        title: String,
        /// Notice body.
        message: String,
    },
    /// Automatic reconnection gave up.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// Login (initial or during reconnect) failed for good.
    LoginFailed(LoginError),
}

impl CloseReason {
    /// `Ok` for a requested close, the matching error otherwise.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Active { .. } => Ok(()),
            Self::Force { title, message } => Err(BotError::ForcedOffline { title, message }),
            Self::Exhausted { attempts } => Err(BotError::ReconnectExhausted { attempts }),
            Self::LoginFailed(err) => Err(BotError::Login(err)),
        }
    }
}

struct Outbound {
    sequence: u32,
    payload: Vec<u8>,
}

struct Connection {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    fn abort(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Why one transmission did not produce a reply.
#[derive(Debug)]
enum Attempt {
    TimedOut,
    Lost,
    Fatal(BotError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Authenticated, encrypted connection to the server for one bot.
pub struct NetworkSession {
    bot: WeakBot,
    credentials: Credentials,
    config: NetworkConfig,
    codec: FrameCodec,
    transport: Arc<dyn Transport>,
    solver: Arc<dyn LoginSolver>,
    span: Span,

    state: watch::Sender<SessionState>,
    pending: PendingRequests,
    sequence: AtomicU32,
    generation: AtomicU64,
    connection: Mutex<Option<Connection>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    login_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    close_reason: Mutex<Option<CloseReason>>,
    resync_in_flight: AtomicBool,
}

impl NetworkSession {
    pub(crate) fn new(
        bot: WeakBot,
        credentials: Credentials,
        config: NetworkConfig,
        codec: FrameCodec,
        transport: Arc<dyn Transport>,
        solver: Arc<dyn LoginSolver>,
    ) -> Self {
        let span = tracing::info_span!("bot", uin = credentials.uin);
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            bot,
            credentials,
            config,
            codec,
            transport,
            solver,
            span,
            state,
            pending: PendingRequests::default(),
            sequence: AtomicU32::new(1),
            generation: AtomicU64::new(0),
            connection: Mutex::new(None),
            reconnect_task: Mutex::new(None),
            login_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            close_reason: Mutex::new(None),
            resync_in_flight: AtomicBool::new(false),
        }
    }

    /// Account uin.
    pub fn uin(&self) -> u64 {
        self.credentials.uin
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether requests can currently flow.
    pub fn is_online(&self) -> bool {
        self.state() == SessionState::Online
    }

    /// Whether the session reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Why the session closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        lock(&self.close_reason).clone()
    }

    /// Requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn set_state(&self, next: SessionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == SessionState::Closed || *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = %next, "Session state changed");
        }
    }

    async fn wait_for_state(&self, mut accept: impl FnMut(&SessionState) -> bool) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| accept(s)).await;
    }

    async fn wait_closed(&self) {
        self.wait_for_state(|s| *s == SessionState::Closed).await;
    }

    fn emit(&self, event: BotEvent) {
        if let Some(bot) = self.bot.upgrade() {
            bot.events().broadcast(&event);
        }
    }

    /// Connect, authenticate and fetch the roster.
    ///
    /// Any failure closes the session with that failure as its reason.
    pub async fn login(self: &Arc<Self>) -> Result<()> {
        if self.is_closed() {
            return Err(BotError::SessionClosed);
        }
        let _guard = self.login_lock.lock().await;
        if let Some(task) = lock(&self.reconnect_task).take() {
            task.abort();
        }

        let deadline = self.config.login_timeout();
        let result = tokio::select! {
            r = tokio::time::timeout(deadline, self.establish()) => {
                r.unwrap_or_else(|_| Err(LoginError::Timeout(deadline).into()))
            },
            () = self.wait_closed() => Err(BotError::SessionClosed),
        };

        match result {
            Ok(()) => {
                self.emit(BotEvent::Online(BotOnlineEvent {
                    bot_uin: self.uin(),
                }));
                Ok(())
            },
            Err(BotError::SessionClosed) => Err(BotError::SessionClosed),
            Err(err) => {
                error!(error = %err, "Login failed");
                let reason = match &err {
                    BotError::Login(login) => login.clone(),
                    other => LoginError::Protocol(other.to_string()),
                };
                self.close_with(CloseReason::LoginFailed(reason));
                Err(err)
            },
        }
    }

    async fn establish(self: &Arc<Self>) -> Result<()> {
        self.teardown();
        self.set_state(SessionState::Connecting);
        info!(
            transport = self.transport.name(),
            addr = %self.transport.remote_addr(),
            "Connecting"
        );

        let mut stream = self
            .transport
            .connect()
            .await
            .map_err(|e| LoginError::Network(e.to_string()))?;

        self.set_state(SessionState::Authenticating);
        let established = Handshake {
            credentials: &self.credentials,
            codec: &self.codec,
            sequence: &self.sequence,
            solver: self.solver.as_ref(),
            max_captcha_rounds: self.config.max_captcha_rounds,
        }
        .perform(&mut stream)
        .await?;

        let generation = self.start_connection(stream, established.key)?;
        self.resync().await.map_err(|e| match e {
            BotError::Login(login) => login,
            other => LoginError::Protocol(format!("roster fetch failed: {other}")),
        })?;

        {
            // Same lock as connection_lost, so a drop lands either before or after Online.
            let slot = lock(&self.connection);
            if !matches!(slot.as_ref(), Some(conn) if conn.generation == generation) {
                return Err(LoginError::Network("connection lost during login".to_string()).into());
            }
            self.set_state(SessionState::Online);
        }
        self.spawn_heartbeat(generation);
        info!(
            generation,
            nick = %established.nick,
            captcha_rounds = established.captcha_rounds,
            "Online"
        );
        Ok(())
    }

    fn start_connection(self: &Arc<Self>, stream: BoxedStream, key: SessionKey) -> Result<u64> {
        let (reader, writer) = tokio::io::split(stream);
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let writer_task = tokio::spawn(
            Arc::clone(self)
                .run_writer(writer, rx, key.clone(), generation)
                .instrument(self.span.clone()),
        );
        let reader_task = tokio::spawn(
            Arc::clone(self)
                .run_reader(reader, key, generation)
                .instrument(self.span.clone()),
        );

        let mut slot = lock(&self.connection);
        if self.is_closed() {
            writer_task.abort();
            reader_task.abort();
            return Err(BotError::SessionClosed);
        }
        if let Some(old) = slot.replace(Connection {
            generation,
            outbound: tx,
            tasks: vec![writer_task, reader_task],
        }) {
            old.abort();
        }
        Ok(generation)
    }

    /// Drop the current connection, failing its requests with `NotOnline`.
    fn teardown(&self) {
        if let Some(conn) = lock(&self.connection).take() {
            conn.abort();
        }
        let failed = self.pending.fail_all(|| BotError::NotOnline);
        if failed > 0 {
            debug!(failed, "Failed requests of torn-down connection");
        }
    }

    async fn run_reader(
        self: Arc<Self>,
        mut reader: ReadHalf<BoxedStream>,
        key: SessionKey,
        generation: u64,
    ) {
        loop {
            let bytes = match read_frame(&mut reader).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    self.connection_lost(generation, "connection closed by server".to_string());
                    return;
                },
                Err(e) => {
                    self.connection_lost(generation, format!("read failed: {e}"));
                    return;
                },
            };

            let frame = match self.codec.decode(&bytes, Some(&key)) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, len = bytes.len(), "Dropping undecodable frame");
                    continue;
                },
            };
            let message = match ProtocolMessage::from_bytes(&frame.payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(seq = frame.sequence, error = %e, "Dropping unparseable frame");
                    continue;
                },
            };

            match message {
                ProtocolMessage::Push { notice } => self.handle_push(notice),
                ProtocolMessage::Roster { roster } => {
                    // Applied before the next frame so later pushes land on top of it.
                    if let Some(bot) = self.bot.upgrade() {
                        bot.directory().resync(roster.clone());
                    }
                    let reply = ProtocolMessage::Roster { roster };
                    if !self.pending.resolve(frame.sequence, Ok(reply)) {
                        debug!(seq = frame.sequence, "Unsolicited roster applied");
                    }
                },
                reply => {
                    let kind = reply.kind();
                    if !self.pending.resolve(frame.sequence, Ok(reply)) {
                        debug!(seq = frame.sequence, kind, "Reply without a pending request");
                    }
                },
            }
        }
    }

    async fn run_writer(
        self: Arc<Self>,
        mut writer: WriteHalf<BoxedStream>,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        key: SessionKey,
        generation: u64,
    ) {
        while let Some(Outbound { sequence, payload }) = outbound.recv().await {
            let frame = match self.codec.encode(sequence, &payload, Some(&key)) {
                Ok(frame) => frame,
                Err(e) => {
                    self.pending.resolve(sequence, Err(e));
                    continue;
                },
            };
            if let Err(e) = write_frame(&mut writer, &frame).await {
                self.connection_lost(generation, format!("write failed: {e}"));
                return;
            }
        }
    }

    fn handle_push(self: &Arc<Self>, notice: PushNotice) {
        let Some(bot) = self.bot.upgrade() else {
            return;
        };
        match push::apply(&bot, notice) {
            Ok(PushOutcome::Applied) => {},
            Ok(PushOutcome::ForceOffline { title, message }) => {
                warn!(title = %title, message = %message, "Forced offline by server");
                self.emit(BotEvent::Offline(BotOfflineEvent::Force {
                    bot_uin: self.uin(),
                    title: title.clone(),
                    message: message.clone(),
                }));
                self.close_with(CloseReason::Force { title, message });
            },
            Err(BotError::NoSuchContact { kind, id }) => {
                warn!(%kind, id, "Push names an unknown contact, resyncing roster");
                self.spawn_resync();
            },
            Err(e) => warn!(error = %e, "Failed to apply push"),
        }
    }

    fn spawn_resync(self: &Arc<Self>) {
        if self.resync_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(self);
        tokio::spawn(
            async move {
                if let Err(e) = session.resync().await {
                    warn!(error = %e, "Roster resync failed");
                }
                session.resync_in_flight.store(false, Ordering::SeqCst);
            }
            .instrument(self.span.clone()),
        );
    }

    /// Replace the directory with a fresh roster from the server.
    ///
    /// The reader applies the roster as it arrives; this returns once it has.
    pub async fn resync(&self) -> Result<()> {
        match self.send(ProtocolMessage::RosterRequest).await? {
            ProtocolMessage::Roster { roster } => {
                debug!(
                    friends = roster.friends.len(),
                    groups = roster.groups.len(),
                    "Roster synchronized"
                );
                Ok(())
            },
            other => Err(BotError::Protocol(format!(
                "expected roster, got {}",
                other.kind()
            ))),
        }
    }

    fn spawn_heartbeat(self: &Arc<Self>, generation: u64) {
        let task = tokio::spawn(
            Arc::clone(self)
                .run_heartbeat(generation)
                .instrument(self.span.clone()),
        );
        match lock(&self.connection).as_mut() {
            Some(conn) if conn.generation == generation => conn.tasks.push(task),
            _ => task.abort(),
        }
    }

    async fn run_heartbeat(self: Arc<Self>, generation: u64) {
        let period = self.config.heartbeat_interval();
        let threshold = self.config.heartbeat_miss_threshold;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut misses = 0u32;

        loop {
            ticker.tick().await;
            let payload = match ProtocolMessage::Heartbeat.to_bytes() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(error = %e, "Cannot encode heartbeat");
                    return;
                },
            };
            match self
                .transmit(&payload, self.config.heartbeat_timeout())
                .await
            {
                Ok(_) => {
                    if misses > 0 {
                        debug!(misses, "Heartbeat recovered");
                    }
                    misses = 0;
                },
                Err(Attempt::Fatal(_)) => return,
                Err(failure) => {
                    misses = misses.saturating_add(1);
                    warn!(misses, threshold, ?failure, "Heartbeat missed");
                    if misses >= threshold {
                        self.connection_lost(generation, format!("{misses} heartbeats missed"));
                        return;
                    }
                },
            }
        }
    }

    fn connection_lost(self: &Arc<Self>, generation: u64, cause: String) {
        if self.is_closed() {
            return;
        }
        let conn = {
            let mut slot = lock(&self.connection);
            match slot.as_ref() {
                Some(conn) if conn.generation == generation => slot.take(),
                _ => return,
            }
        };
        warn!(generation, cause = %cause, "Connection dropped");

        if self.state() != SessionState::Online {
            // Still logging in: fail the attempt, its owner decides what follows.
            let failed = self
                .pending
                .fail_all(|| LoginError::Network(cause.clone()).into());
            debug!(failed, "Failed requests of login connection");
            if let Some(conn) = conn {
                conn.abort();
            }
            return;
        }

        let failed = self.pending.fail_all(|| BotError::NotOnline);
        self.set_state(SessionState::Reconnecting);
        self.emit(BotEvent::Offline(BotOfflineEvent::Dropped {
            bot_uin: self.uin(),
            cause: cause.clone(),
        }));
        debug!(failed, "Failed requests of dropped connection");

        let session = Arc::clone(self);
        let handle = tokio::spawn(
            async move { session.reconnect_loop(cause).await }.instrument(self.span.clone()),
        );
        if let Some(old) = lock(&self.reconnect_task).replace(handle) {
            old.abort();
        }
        // Aborts the calling task too; nothing below may await.
        if let Some(conn) = conn {
            conn.abort();
        }
    }

    async fn reconnect_loop(self: Arc<Self>, cause: String) {
        let mut backoff = Backoff::new(
            self.config.reconnect_backoff_base_ms,
            self.config.reconnect_backoff_max_ms,
        );
        let max_attempts = self.config.reconnect_max_attempts;
        let deadline = self.config.login_timeout();
        let mut last_cause = cause;
        let mut attempt = 0u32;

        while attempt < max_attempts {
            attempt = attempt.saturating_add(1);
            let delay = backoff.next_delay();
            info!(
                delay_ms = delay.as_millis() as u64,
                attempt, max_attempts, "Reconnecting after backoff"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {},
                () = self.wait_closed() => return,
            }

            self.emit(BotEvent::Relogin(BotReloginEvent {
                bot_uin: self.uin(),
                attempt,
                cause: last_cause.clone(),
            }));

            let result = tokio::select! {
                r = tokio::time::timeout(deadline, self.establish()) => {
                    r.unwrap_or_else(|_| Err(LoginError::Timeout(deadline).into()))
                },
                () = self.wait_closed() => return,
            };

            match result {
                Ok(()) => {
                    info!(attempt, "Reconnected");
                    self.emit(BotEvent::Online(BotOnlineEvent {
                        bot_uin: self.uin(),
                    }));
                    return;
                },
                Err(BotError::Login(err)) if err.is_credential_failure() => {
                    error!(error = %err, "Fatal login failure, not reconnecting");
                    self.close_with(CloseReason::LoginFailed(err));
                    return;
                },
                Err(err) => {
                    warn!(attempt, error = %err, "Reconnect attempt failed");
                    self.teardown();
                    self.set_state(SessionState::Reconnecting);
                    last_cause = err.to_string();
                },
            }
        }

        error!(attempts = attempt, "Reconnect attempts exhausted");
        self.close_with(CloseReason::Exhausted { attempts: attempt });
    }

    /// Send a request and wait for its correlated reply.
    ///
    /// Each attempt uses a fresh sequence id and waits `request_timeout`;
    /// failed attempts are retried `max_send_retries` times with linear
    /// backoff. An `Error` reply becomes [`BotError::Remote`].
    pub async fn send(&self, request: ProtocolMessage) -> Result<ProtocolMessage> {
        let payload = request.to_bytes()?;
        let attempts = self.config.max_send_retries.saturating_add(1);

        for attempt in 1..=attempts {
            match self.transmit(&payload, self.config.request_timeout()).await {
                Ok(ProtocolMessage::Error { code, message }) => {
                    return Err(BotError::Remote { code, message });
                },
                Ok(reply) => return Ok(reply),
                Err(Attempt::Fatal(err)) => return Err(err),
                Err(failure) => {
                    debug!(kind = request.kind(), attempt, ?failure, "Request attempt failed");
                    if attempt < attempts {
                        let delay = self.config.retry_backoff() * attempt;
                        tokio::select! {
                            () = tokio::time::sleep(delay) => {},
                            () = self.wait_closed() => return Err(BotError::SessionClosed),
                        }
                    }
                },
            }
        }

        warn!(kind = request.kind(), attempts, "Request delivery timed out");
        Err(BotError::DeliveryTimeout { attempts })
    }

    async fn transmit(
        &self,
        payload: &[u8],
        timeout: Duration,
    ) -> std::result::Result<ProtocolMessage, Attempt> {
        if self.is_closed() {
            return Err(Attempt::Fatal(BotError::SessionClosed));
        }

        let outbound = lock(&self.connection)
            .as_ref()
            .map(|conn| conn.outbound.clone());
        let Some(outbound) = outbound else {
            if self.state() == SessionState::Disconnected {
                return Err(Attempt::Fatal(BotError::NotOnline));
            }
            let _ = tokio::time::timeout(
                timeout,
                self.wait_for_state(|s| matches!(s, SessionState::Online | SessionState::Closed)),
            )
            .await;
            return Err(Attempt::Lost);
        };

        let sequence = self.next_sequence();
        let reply = self.pending.register(sequence);
        if outbound
            .send(Outbound {
                sequence,
                payload: payload.to_vec(),
            })
            .is_err()
        {
            self.pending.remove(sequence);
            return Err(Attempt::Lost);
        }

        tokio::select! {
            r = tokio::time::timeout(timeout, reply) => match r {
                Ok(Ok(Ok(message))) => Ok(message),
                Ok(Ok(Err(BotError::NotOnline))) | Ok(Err(_)) => Err(Attempt::Lost),
                Ok(Ok(Err(err))) => Err(Attempt::Fatal(err)),
                Err(_) => {
                    self.pending.remove(sequence);
                    Err(Attempt::TimedOut)
                },
            },
            () = self.wait_closed() => {
                self.pending.remove(sequence);
                Err(Attempt::Fatal(BotError::SessionClosed))
            },
        }
    }

    /// Close for good. Idempotent; only the first call has any effect.
    pub fn close(&self, cause: Option<String>) {
        self.close_with(CloseReason::Active { cause });
    }

    fn close_with(&self, reason: CloseReason) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.reconnect_task).take() {
            task.abort();
        }
        if let Some(conn) = lock(&self.connection).take() {
            conn.abort();
        }
        let failed = self.pending.fail_all(|| BotError::SessionClosed);
        *lock(&self.close_reason) = Some(reason.clone());
        self.state.send_replace(SessionState::Closed);
        info!(?reason, failed_requests = failed, "Session closed");

        if let CloseReason::Active { cause } = reason {
            self.emit(BotEvent::Offline(BotOfflineEvent::Active {
                bot_uin: self.uin(),
                cause,
            }));
        }
    }

    /// Wait until the session is closed, then report why.
    pub async fn join(&self) -> Result<()> {
        self.wait_closed().await;
        self.close_reason()
            .map_or(Ok(()), CloseReason::into_result)
    }
}

impl std::fmt::Debug for NetworkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSession")
            .field("uin", &self.uin())
            .field("state", &self.state())
            .field("transport", &self.transport.name())
            .finish_non_exhaustive()
    }
}
