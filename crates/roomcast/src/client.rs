//! A client for talking to a Roomcast server.
//!
//! The server answers some requests with prompts and pushes room traffic
//! at any time, so the client never waits for "the" reply. After each
//! request it answers prompts as they come and collects everything else
//! until the server has been quiet for the drain window.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomcast_protocol::{
    chat_line, PlayerId, Position, Prompt, ProtocolError, RoomId, PLAYER_TAG,
};
use roomcast_transport::TransportError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::RoomcastError;

/// How long the client waits for more messages after a request.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(500);

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Answers to the prompts a request may trigger.
///
/// `player_id` falls back to the client's own identity.
#[derive(Debug, Clone, Default)]
pub struct Answers {
    /// For `Enter Player ID`.
    pub player_id: Option<PlayerId>,
    /// For `Enter Room ID`.
    pub room_id: Option<RoomId>,
    /// For `Enter World Seed`.
    pub seed: Option<String>,
    /// For `Enter Position`, as `<id>,<x>,<y>`.
    pub position: Option<String>,
    /// For `Enter Nickname`.
    pub nickname: Option<String>,
}

impl Answers {
    /// Answers for requests that only ask for a room.
    pub fn room(room_id: RoomId) -> Self {
        Self {
            room_id: Some(room_id),
            ..Self::default()
        }
    }

    fn answer(&self, prompt: Prompt, own: Option<PlayerId>) -> Option<String> {
        match prompt {
            Prompt::PlayerId => self.player_id.or(own).map(|id| id.0.to_string()),
            Prompt::RoomId => self.room_id.map(|id| id.0.to_string()),
            Prompt::WorldSeed => self.seed.clone(),
            Prompt::Position => self.position.clone(),
            Prompt::Nickname => self.nickname.clone(),
        }
    }
}

/// A connected client.
///
/// Room traffic that happens to spell a prompt token (a chat line
/// reading `Enter Room ID`, say) is taken for a prompt.
pub struct RoomcastClient {
    ws: ClientStream,
    player_id: Option<PlayerId>,
    drain_window: Duration,
}

impl RoomcastClient {
    /// Connects to a server, e.g. `ws://127.0.0.1:8001`.
    pub async fn connect(url: &str) -> Result<Self, RoomcastError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;
        tracing::debug!(url, "connected");
        Ok(Self {
            ws,
            player_id: None,
            drain_window: DEFAULT_DRAIN_WINDOW,
        })
    }

    /// Sets how long to keep reading after a request.
    pub fn with_drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// The identity from the last handshake, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Sends one raw text frame.
    pub async fn send(&mut self, text: &str) -> Result<(), RoomcastError> {
        self.ws
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })?;
        Ok(())
    }

    /// Waits for the next text frame. `None` once the server closed.
    pub async fn recv(&mut self) -> Result<Option<String>, RoomcastError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    )
                    .into());
                }
            }
        }
    }

    /// Asks for an identity and remembers it.
    pub async fn handshake(&mut self) -> Result<PlayerId, RoomcastError> {
        self.send("Get ID").await?;
        while let Some(text) = self.recv().await? {
            if let Some(id) = text.strip_prefix(PLAYER_TAG) {
                let player_id = PlayerId::parse(id)?;
                self.player_id = Some(player_id);
                return Ok(player_id);
            }
            tracing::debug!(%text, "skipped while waiting for identity");
        }
        Err(TransportError::ConnectionClosed("closed during handshake".into()).into())
    }

    /// Sends a request token, answers its prompts, and returns the
    /// other messages received before the drain window ran out.
    pub async fn request(
        &mut self,
        token: &str,
        answers: &Answers,
    ) -> Result<Vec<String>, RoomcastError> {
        self.send(token).await?;
        self.collect(answers).await
    }

    /// Collects pushed messages until the server goes quiet.
    pub async fn drain(&mut self) -> Result<Vec<String>, RoomcastError> {
        self.collect(&Answers::default()).await
    }

    async fn collect(&mut self, answers: &Answers) -> Result<Vec<String>, RoomcastError> {
        let mut received = Vec::new();
        loop {
            let text = match tokio::time::timeout(self.drain_window, self.recv()).await {
                Ok(Ok(Some(text))) => text,
                Ok(Ok(None)) | Err(_) => break,
                Ok(Err(e)) => return Err(e),
            };
            match Prompt::parse(&text) {
                Some(prompt) => {
                    let Some(answer) = answers.answer(prompt, self.player_id) else {
                        return Err(ProtocolError::InvalidMessage {
                            field: "prompt",
                            value: text,
                        }
                        .into());
                    };
                    self.send(&answer).await?;
                }
                None => received.push(text),
            }
        }
        Ok(received)
    }

    fn own_id(&self) -> Result<PlayerId, RoomcastError> {
        self.player_id.ok_or_else(|| {
            ProtocolError::InvalidMessage {
                field: "player ID",
                value: "none assigned yet".into(),
            }
            .into()
        })
    }

    // --- requests -------------------------------------------------------

    /// `See rooms`.
    pub async fn see_rooms(&mut self) -> Result<Vec<String>, RoomcastError> {
        self.request("See rooms", &Answers::default()).await
    }

    /// `Create Room`.
    pub async fn create_room(&mut self) -> Result<Vec<String>, RoomcastError> {
        self.request("Create Room", &Answers::default()).await
    }

    /// `Join Room`.
    pub async fn join_room(&mut self, room_id: RoomId) -> Result<Vec<String>, RoomcastError> {
        self.request("Join Room", &Answers::room(room_id)).await
    }

    /// `Leave Room`.
    pub async fn leave_room(&mut self) -> Result<Vec<String>, RoomcastError> {
        self.request("Leave Room", &Answers::default()).await
    }

    /// `Leave Game`. The server closes the connection afterwards.
    pub async fn leave_game(&mut self) -> Result<Vec<String>, RoomcastError> {
        self.request("Leave Game", &Answers::default()).await
    }

    /// `List Players`, or `List PlayersRaw` when `raw` is set.
    pub async fn list_players(
        &mut self,
        room_id: RoomId,
        raw: bool,
    ) -> Result<Vec<String>, RoomcastError> {
        let token = if raw { "List PlayersRaw" } else { "List Players" };
        self.request(token, &Answers::room(room_id)).await
    }

    /// `MoveTo` with this client's identity.
    pub async fn move_to(&mut self, x: f64, y: f64) -> Result<Vec<String>, RoomcastError> {
        let position = Position::new(self.own_id()?, x, y);
        let answers = Answers {
            position: Some(position.to_string()),
            ..Answers::default()
        };
        self.request("MoveTo", &answers).await
    }

    /// `Start Game`.
    pub async fn start_game(
        &mut self,
        room_id: RoomId,
        seed: &str,
    ) -> Result<Vec<String>, RoomcastError> {
        let answers = Answers {
            room_id: Some(room_id),
            seed: Some(seed.to_string()),
            ..Answers::default()
        };
        self.request("Start Game", &answers).await
    }

    /// `Change Seed`. The seed goes out right behind the token.
    pub async fn change_seed(
        &mut self,
        room_id: RoomId,
        seed: &str,
    ) -> Result<Vec<String>, RoomcastError> {
        self.send("Change Seed").await?;
        self.send(seed).await?;
        self.collect(&Answers::room(room_id)).await
    }

    /// `Room Seed`.
    pub async fn room_seed(&mut self, room_id: RoomId) -> Result<Vec<String>, RoomcastError> {
        self.request("Room Seed", &Answers::room(room_id)).await
    }

    /// `Set Nick`.
    pub async fn set_nick(&mut self, name: &str) -> Result<Vec<String>, RoomcastError> {
        let answers = Answers {
            nickname: Some(name.to_string()),
            ..Answers::default()
        };
        self.request("Set Nick", &answers).await
    }

    /// Sends a chat line tagged with this client's identity.
    pub async fn chat(&mut self, text: &str) -> Result<Vec<String>, RoomcastError> {
        let line = chat_line(self.own_id()?, text);
        self.request(&line, &Answers::default()).await
    }

    /// Closes the connection without `Leave Game`.
    pub async fn close(mut self) -> Result<(), RoomcastError> {
        self.ws.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })?;
        Ok(())
    }
}
