mod broadcast;
pub mod clock;
pub mod events;
pub mod registry;
pub mod room;
pub mod session;

pub use clock::{load_game, GameClock};
pub use events::{ClientEvent, ErrorMessage, Handshake, QuestionPayload, ServerEvent};
pub use registry::{CreateRoomRequest, JoinRoomRequest, RoomRegistry, MAX_ROOMS};
pub use room::{
    GamePhase, Player, PlayerId, PlayerSender, Room, RoomListing, RoomSummary, SessionId,
    MAX_PLAYERS_PER_ROOM,
};
pub use session::{Flow, Session, SessionState};
