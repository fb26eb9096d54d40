//! The per-connection protocol state machine.
//!
//! A connection moves through three phases:
//!
//! ```text
//! Unidentified ──Get ID──→ Idle ──Create/Join──→ InRoom
//!                           ▲                      │
//!                           └──────Leave Room──────┘
//! ```
//!
//! `Leave Game`, a closed socket, a transport error and an idle timeout
//! all end the connection from any phase.
//!
//! Requests are handled one at a time. Multi-step requests send a
//! [`Prompt`] and read the answer from the same connection before
//! touching shared state, so the lobby lock is never held across a
//! read. Every reply and push goes through the connection's
//! [`Outbox`]; the lock is only held while enqueueing.

use std::sync::Arc;

use roomcast_protocol::{
    PlayerId, Position, ProtocolError, Prompt, Reply, Request, RoomId,
    WorldSeed,
};
use roomcast_room::RoomError;
use roomcast_session::Outbox;
use roomcast_transport::{Connection, ConnectionId, TransportError};

use crate::server::{Lobby, ServerState};
use crate::RoomcastError;

/// Where a connection stands in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// No `Get ID` yet.
    Unidentified,
    /// Identified, not in a room.
    Idle(PlayerId),
    /// Identified and a member of the room.
    InRoom(PlayerId, RoomId),
}

impl Phase {
    fn room(self) -> Option<RoomId> {
        match self {
            Self::InRoom(_, room_id) => Some(room_id),
            Self::Unidentified | Self::Idle(_) => None,
        }
    }
}

/// What the read loop should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Close,
}

/// Cleanup obligation for an identified connection.
///
/// Released explicitly on every normal exit path. If the owning task
/// panics or is cancelled first, `Drop` spawns the same cleanup.
struct Registration {
    player_id: PlayerId,
    state: Arc<ServerState>,
    armed: bool,
}

impl Registration {
    async fn release(mut self) {
        release_player(&self.state, self.player_id).await;
        self.armed = false;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_player(&state, player_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(%player_id, "no runtime to release session");
            }
        }
    }
}

/// Removes a player from its room (notifying whoever is left) and from
/// the registry.
///
/// Idempotent: a player that is already gone is ignored.
pub(crate) async fn release_player(state: &ServerState, player_id: PlayerId) {
    let mut guard = state.lobby.lock().await;
    let Lobby {
        registry,
        directory,
    } = &mut *guard;
    if !registry.contains(player_id) {
        return;
    }

    match directory.leave_room(registry, player_id) {
        Ok(room_id) if directory.contains(room_id) => {
            let left = Reply::PlayerLeft { player_id, room_id }.encode();
            if let Err(e) = directory.broadcast(registry, room_id, &left) {
                tracing::error!(%player_id, %room_id, error = %e, "leave notice failed");
            }
        }
        Ok(_) | Err(RoomError::NotInRoom(_)) => {}
        Err(e) => {
            tracing::error!(%player_id, error = %e, "leave during cleanup failed");
        }
    }

    if let Err(e) = registry.unregister(player_id) {
        tracing::error!(%player_id, error = %e, "unregister failed");
    }
}

/// Maps an expected room error to the reply the client sees.
///
/// `None` means the error is a broken invariant, not a refusal.
fn refusal(err: &RoomError) -> Option<Reply> {
    match *err {
        RoomError::NotFound(room_id) => Some(Reply::RoomNotFound(room_id)),
        RoomError::Full(room_id) => Some(Reply::RoomFull(room_id)),
        RoomError::AlreadyInRoom(_, room_id)
        | RoomError::AlreadyMember(_, room_id) => {
            Some(Reply::AlreadyInRoom(room_id))
        }
        RoomError::NotInRoom(_) => Some(Reply::NotInRoom),
        RoomError::NotMember(player_id, room_id) => {
            Some(Reply::NotMemberOf { player_id, room_id })
        }
        RoomError::Session(_) | RoomError::Invariant(_) => None,
    }
}

/// Drives one connection through the protocol.
pub(crate) struct ConnectionEngine<C> {
    conn_id: ConnectionId,
    conn: Arc<C>,
    outbox: Outbox,
    state: Arc<ServerState>,
    registration: Option<Registration>,
}

impl<C> ConnectionEngine<C>
where
    C: Connection<Error = TransportError>,
{
    pub(crate) fn new(
        conn: Arc<C>,
        outbox: Outbox,
        state: Arc<ServerState>,
    ) -> Self {
        Self {
            conn_id: conn.id(),
            conn,
            outbox,
            state,
            registration: None,
        }
    }

    /// Reads and handles requests until the connection ends.
    ///
    /// Returns `Ok` on a clean close, idle timeout or `Leave Game`, and
    /// the transport error otherwise. Does not release the identity;
    /// call [`release`](Self::release) afterwards.
    pub(crate) async fn run(&mut self) -> Result<(), RoomcastError> {
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(());
            };
            match self.dispatch(Request::decode(&line)).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => return Ok(()),
                Err(e) => self.recover(e)?,
            }
        }
    }

    /// Leaves the room and unregisters. Safe to call more than once.
    pub(crate) async fn release(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.release().await;
        }
    }

    async fn phase(&self) -> Result<Phase, RoomcastError> {
        let Some(registration) = &self.registration else {
            return Ok(Phase::Unidentified);
        };
        let player_id = registration.player_id;
        let lobby = self.state.lobby.lock().await;
        Ok(match lobby.registry.room_of(player_id)? {
            Some(room_id) => Phase::InRoom(player_id, room_id),
            None => Phase::Idle(player_id),
        })
    }

    async fn dispatch(&mut self, request: Request) -> Result<Flow, RoomcastError> {
        let phase = self.phase().await?;
        tracing::debug!(conn_id = %self.conn_id, ?phase, ?request, "request");

        let player_id = match phase {
            Phase::Unidentified if request == Request::Handshake => {
                self.handshake().await;
                return Ok(Flow::Continue);
            }
            Phase::Unidentified => {
                if request == Request::ChangeSeed {
                    // The seed frame is already on its way; don't read it
                    // as the next request.
                    let seed = self.read_answer().await?;
                    tracing::debug!(conn_id = %self.conn_id, %seed, "seed dropped, no identity");
                }
                self.reply(&Reply::NotIdentified);
                return Ok(Flow::Continue);
            }
            Phase::Idle(player_id) | Phase::InRoom(player_id, _) => player_id,
        };
        let room = phase.room();

        match request {
            Request::Handshake => self.reply(&Reply::Identity(player_id)),
            Request::ListRooms => self.list_rooms().await,
            Request::CreateRoom => self.create_room(player_id).await?,
            Request::JoinRoom => self.join_room(player_id).await?,
            Request::LeaveRoom => self.leave_room(player_id).await?,
            Request::ExitGame => return self.exit_game(player_id).await,
            Request::ListPlayers { raw } => self.list_players(raw).await?,
            Request::MoveTo => self.move_to(player_id, room).await?,
            Request::StartGame => {
                let room_id = self.ask_room_id().await?;
                let seed = WorldSeed::new(self.prompt(Prompt::WorldSeed).await?)?;
                self.store_seed(player_id, room, room_id, seed, Reply::StartGame)
                    .await?;
            }
            Request::ChangeSeed => {
                // The client sends the new seed right after the token,
                // before being asked for the room.
                let answer = self.read_answer().await?;
                let room_id = self.ask_room_id().await?;
                let seed = WorldSeed::new(answer)?;
                self.store_seed(player_id, room, room_id, seed, Reply::ChangeSeed)
                    .await?;
            }
            Request::RoomSeed => self.room_seed().await?,
            Request::SetNick => self.set_nick(player_id, room).await?,
            Request::Chat {
                player_id: tagged,
                text,
            } => self.chat(player_id, tagged, room, text).await?,
            Request::MalformedChat(line) => {
                tracing::warn!(%player_id, %line, "unparseable chat line ignored");
            }
            Request::Unknown(line) => match room {
                Some(_) => self.reply(&Reply::Unrecognized),
                None if line.starts_with('/') => {
                    tracing::debug!(%player_id, %line, "stray command swallowed");
                }
                None => self.reply(&Reply::NotInRoom),
            },
        }
        Ok(Flow::Continue)
    }

    /// Turns a failed request into a reply. Transport errors pass
    /// through and end the connection.
    fn recover(&self, err: RoomcastError) -> Result<(), RoomcastError> {
        if matches!(err, RoomcastError::Transport(_)) {
            return Err(err);
        }
        let reply = match &err {
            RoomcastError::Protocol(e) => Reply::Invalid(e.to_string()),
            RoomcastError::Room(e) => match refusal(e) {
                Some(reply) => reply,
                None => {
                    tracing::error!(conn_id = %self.conn_id, error = %e, "request aborted");
                    Reply::RequestFailed
                }
            },
            other => {
                tracing::error!(conn_id = %self.conn_id, error = %other, "request aborted");
                Reply::RequestFailed
            }
        };
        tracing::debug!(conn_id = %self.conn_id, error = %err, "request refused");
        self.reply(&reply);
        Ok(())
    }

    // --- requests -------------------------------------------------------

    async fn handshake(&mut self) {
        let player_id = self
            .state
            .lobby
            .lock()
            .await
            .registry
            .register(self.outbox.clone());
        self.registration = Some(Registration {
            player_id,
            state: Arc::clone(&self.state),
            armed: true,
        });
        tracing::info!(conn_id = %self.conn_id, %player_id, "player identified");
        self.reply(&Reply::Identity(player_id));
    }

    async fn list_rooms(&self) {
        let rooms = self.state.lobby.lock().await.directory.list_rooms();
        self.reply(&Reply::Rooms(rooms));
    }

    async fn create_room(&self, player_id: PlayerId) -> Result<(), RoomcastError> {
        if !self.confirm_identity(player_id).await? {
            return Ok(());
        }
        let mut guard = self.state.lobby.lock().await;
        let Lobby {
            registry,
            directory,
        } = &mut *guard;
        if let Some(current) = registry.room_of(player_id)? {
            return Err(RoomError::AlreadyInRoom(player_id, current).into());
        }

        let room_id = directory.create_room(self.state.config.room.max_players);
        if let Err(e) = directory.join_room(registry, room_id, player_id) {
            directory.discard_if_empty(room_id);
            return Err(e.into());
        }
        self.reply(&Reply::Welcome(room_id));
        Ok(())
    }

    async fn join_room(&self, player_id: PlayerId) -> Result<(), RoomcastError> {
        let room_id = self.ask_room_id().await?;
        if !self.confirm_identity(player_id).await? {
            return Ok(());
        }
        let mut guard = self.state.lobby.lock().await;
        let Lobby {
            registry,
            directory,
        } = &mut *guard;
        directory.join_room(registry, room_id, player_id)?;

        let joined = Reply::PlayerJoined { player_id, room_id }.encode();
        directory.broadcast(registry, room_id, &joined)?;
        self.reply(&Reply::Added { player_id, room_id });

        // Late joiners get the world the room is already playing in.
        if let Some(seed) = directory.get(room_id)?.seed() {
            self.reply(&Reply::StartGame);
            self.reply(&Reply::Seed(seed.clone()));
        }
        Ok(())
    }

    async fn leave_room(&self, player_id: PlayerId) -> Result<(), RoomcastError> {
        if !self.confirm_identity(player_id).await? {
            return Ok(());
        }
        let mut guard = self.state.lobby.lock().await;
        let Lobby {
            registry,
            directory,
        } = &mut *guard;
        let room_id = directory.leave_room(registry, player_id)?;
        if directory.contains(room_id) {
            let left = Reply::PlayerLeft { player_id, room_id }.encode();
            directory.broadcast(registry, room_id, &left)?;
        }
        self.reply(&Reply::OutOfRoom { player_id, room_id });
        Ok(())
    }

    async fn exit_game(&mut self, player_id: PlayerId) -> Result<Flow, RoomcastError> {
        if !self.confirm_identity(player_id).await? {
            return Ok(Flow::Continue);
        }
        self.release().await;
        tracing::info!(conn_id = %self.conn_id, %player_id, "player exited");
        self.reply(&Reply::Removed(player_id));
        Ok(Flow::Close)
    }

    async fn list_players(&self, raw: bool) -> Result<(), RoomcastError> {
        let room_id = self.ask_room_id().await?;
        let members = self.state.lobby.lock().await.directory.list_members(room_id)?;
        if raw {
            self.reply(&Reply::PlayersRaw(members));
        } else {
            self.reply(&Reply::Players { room_id, members });
        }
        Ok(())
    }

    async fn move_to(
        &self,
        player_id: PlayerId,
        room: Option<RoomId>,
    ) -> Result<(), RoomcastError> {
        let position = Position::parse(&self.prompt(Prompt::Position).await?)?;
        if !self.check_claim(player_id, position.player_id) {
            return Ok(());
        }
        let room_id = room.ok_or(RoomError::NotInRoom(player_id))?;
        let lobby = self.state.lobby.lock().await;
        lobby.directory.broadcast(
            &lobby.registry,
            room_id,
            &Reply::Moved(position).encode(),
        )?;
        Ok(())
    }

    /// Stores a seed in the requester's own room and announces it as
    /// `marker` followed by the seed.
    async fn store_seed(
        &self,
        player_id: PlayerId,
        room: Option<RoomId>,
        room_id: RoomId,
        seed: WorldSeed,
        marker: Reply,
    ) -> Result<(), RoomcastError> {
        let current = room.ok_or(RoomError::NotInRoom(player_id))?;
        let mut guard = self.state.lobby.lock().await;
        let Lobby {
            registry,
            directory,
        } = &mut *guard;
        let target = directory.get_mut(room_id)?;
        if current != room_id {
            return Err(RoomError::NotMember(player_id, room_id).into());
        }
        target.set_seed(seed.clone());
        tracing::info!(%room_id, %player_id, %seed, "world seed stored");

        directory.broadcast(registry, room_id, &marker.encode())?;
        directory.broadcast(registry, room_id, &Reply::Seed(seed).encode())?;
        Ok(())
    }

    async fn room_seed(&self) -> Result<(), RoomcastError> {
        let room_id = self.ask_room_id().await?;
        let lobby = self.state.lobby.lock().await;
        match lobby.directory.get(room_id)?.seed() {
            Some(seed) => self.reply(&Reply::Seed(seed.clone())),
            None => self.reply(&Reply::NoSeed(room_id)),
        }
        Ok(())
    }

    async fn set_nick(
        &self,
        player_id: PlayerId,
        room: Option<RoomId>,
    ) -> Result<(), RoomcastError> {
        let answer = self.prompt(Prompt::Nickname).await?;
        let name = answer.trim();
        if name.is_empty() {
            return Err(ProtocolError::InvalidMessage {
                field: "nickname",
                value: answer,
            }
            .into());
        }
        let room_id = room.ok_or(RoomError::NotInRoom(player_id))?;

        let mut guard = self.state.lobby.lock().await;
        let Lobby {
            registry,
            directory,
        } = &mut *guard;
        directory.get_mut(room_id)?.rename_member(player_id, name)?;
        registry.rename(player_id, name)?;
        tracing::info!(%player_id, %room_id, name, "nickname set");
        self.reply(&Reply::NickSet(name.to_string()));
        Ok(())
    }

    async fn chat(
        &self,
        player_id: PlayerId,
        tagged: PlayerId,
        room: Option<RoomId>,
        text: String,
    ) -> Result<(), RoomcastError> {
        if !self.check_claim(player_id, tagged) {
            return Ok(());
        }
        match room {
            Some(room_id) => {
                let lobby = self.state.lobby.lock().await;
                lobby.directory.broadcast(
                    &lobby.registry,
                    room_id,
                    &Reply::Chat(text).encode(),
                )?;
            }
            None if text.starts_with('/') => {
                tracing::debug!(%player_id, %text, "stray command swallowed");
            }
            None => self.reply(&Reply::NotInRoom),
        }
        Ok(())
    }

    // --- prompts and I/O ------------------------------------------------

    /// Asks for the requester's identity and checks it is its own.
    async fn confirm_identity(&self, player_id: PlayerId) -> Result<bool, RoomcastError> {
        let claimed = PlayerId::parse(&self.prompt(Prompt::PlayerId).await?)?;
        Ok(self.check_claim(player_id, claimed))
    }

    fn check_claim(&self, player_id: PlayerId, claimed: PlayerId) -> bool {
        if claimed == player_id {
            return true;
        }
        tracing::warn!(
            conn_id = %self.conn_id,
            %player_id,
            %claimed,
            "identity mismatch"
        );
        self.reply(&Reply::IdentityMismatch(claimed));
        false
    }

    async fn ask_room_id(&self) -> Result<RoomId, RoomcastError> {
        Ok(RoomId::parse(&self.prompt(Prompt::RoomId).await?)?)
    }

    async fn prompt(&self, prompt: Prompt) -> Result<String, RoomcastError> {
        self.send(prompt.as_str().to_string());
        self.read_answer().await
    }

    /// Reads the answer to a prompt. A close here is an error: the
    /// request was left half done.
    async fn read_answer(&self) -> Result<String, RoomcastError> {
        match self.read_line().await? {
            Some(line) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            None => Err(TransportError::ConnectionClosed(format!(
                "{} closed mid-request",
                self.conn_id
            ))
            .into()),
        }
    }

    /// Reads one line. An idle timeout reads as a clean close.
    async fn read_line(&self) -> Result<Option<String>, TransportError> {
        let Some(limit) = self.state.config.idle_timeout() else {
            return self.conn.recv().await;
        };
        match tokio::time::timeout(limit, self.conn.recv()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::info!(conn_id = %self.conn_id, "connection timed out");
                Ok(None)
            }
        }
    }

    fn reply(&self, reply: &Reply) {
        self.send(reply.encode());
    }

    fn send(&self, text: String) {
        if self.outbox.send(text).is_err() {
            tracing::debug!(conn_id = %self.conn_id, "writer gone, reply dropped");
        }
    }
}
