use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::quiz_websocket;
use crate::error::QuizError;
use crate::game::{CreateRoomRequest, ErrorMessage, JoinRoomRequest, RoomRegistry};

/// Largest accepted JSON request body
const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Every route the server exposes: JSON API, WebSocket, static files and pages
pub fn quiz_routes(
    registry: Arc<RoomRegistry>,
    static_dir: impl Into<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let static_dir = static_dir.into();

    api_routes(registry.clone())
        .or(quiz_websocket_route(registry))
        .or(health_check())
        .or(static_files(static_dir.clone()))
        .or(pages(static_dir))
        .recover(handle_rejection)
        .with(warp::log::custom(|info| {
            tracing::info!(
                method = %info.method(),
                path = %info.path(),
                status = info.status().as_u16(),
                elapsed_ms = info.elapsed().as_millis() as u64,
                "HTTP request"
            );
        }))
}

pub fn api_routes(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let create = warp::path!("api" / "createroom")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .and_then(create_room);

    let join = warp::path!("api" / "joinroom")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_registry(registry.clone()))
        .and_then(join_room);

    let room = warp::path!("api" / "room" / String)
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .and_then(get_room);

    let rooms = warp::path!("api" / "rooms")
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .and_then(list_rooms);

    let single_player = warp::path!("api" / "singleplayer")
        .and(warp::get())
        .and(warp::header::optional::<String>("x-num-questions"))
        .and(warp::header::optional::<String>("game-type"))
        .and(with_registry(registry))
        .and_then(single_player_questions);

    create.or(join).or(room).or(rooms).or(single_player)
}

pub fn quiz_websocket_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_registry(registry))
        .map(|ws: warp::ws::Ws, registry: Arc<RoomRegistry>| {
            ws.on_upgrade(move |websocket| quiz_websocket::handle_quiz_websocket(websocket, registry))
        })
}

pub fn health_check() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Flag Quiz Server",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

fn static_files(static_dir: PathBuf) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("static").and(warp::fs::dir(static_dir.join("static")))
}

fn pages(static_dir: PathBuf) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::fs::file(static_dir.join("index.html")));

    index
        .or(page("admin", static_dir.join("admin.html")))
        .unify()
        .or(page("joinroom", static_dir.join("game.joinroom.html")))
        .unify()
        .or(page("createroom", static_dir.join("game.createroom.html")))
        .unify()
        .or(page("room", static_dir.join("game.room.html")))
        .unify()
        .or(page("play", static_dir.join("game.singleplayer.html")))
        .unify()
        .or(page("map", static_dir.join("worldmap.html")))
        .unify()
}

fn page(
    name: &'static str,
    file: PathBuf,
) -> impl Filter<Extract = (warp::fs::File,), Error = Rejection> + Clone {
    warp::path(name)
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::fs::file(file))
}

async fn create_room(
    request: CreateRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, Infallible> {
    match registry.create(&request).await {
        Ok(room) => Ok(json_reply(&room.summary().await, StatusCode::OK)),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn join_room(
    request: JoinRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, Infallible> {
    match registry.check_join(&request).await {
        Ok(summary) => Ok(json_reply(&summary, StatusCode::OK)),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn get_room(code: String, registry: Arc<RoomRegistry>) -> Result<Response, Infallible> {
    match registry.get(&code).await {
        Ok(room) => Ok(json_reply(&room.summary().await, StatusCode::OK)),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn list_rooms(registry: Arc<RoomRegistry>) -> Result<Response, Infallible> {
    let rooms = registry.list().await;
    if rooms.is_empty() {
        return Ok(json_reply(
            &ErrorMessage::new("No room found"),
            StatusCode::NOT_FOUND,
        ));
    }
    Ok(json_reply(
        &serde_json::json!({ "rooms": rooms }),
        StatusCode::OK,
    ))
}

/// Full question list, answers included, for client-side single player games
async fn single_player_questions(
    num_questions: Option<String>,
    game_type: Option<String>,
    registry: Arc<RoomRegistry>,
) -> Result<Response, Infallible> {
    let count = match num_questions
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
    {
        Some(count) if count > 0 => count,
        _ => {
            return Ok(error_reply(&QuizError::validation(
                "Invalid number of questions",
            )))
        }
    };

    let mode = game_type.unwrap_or_default();
    match registry.questions().generate(count, &mode) {
        Ok(questions) => Ok(json_reply(&questions, StatusCode::OK)),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Rejection> {
    if let Some(e) = err.find::<BodyDeserializeError>() {
        tracing::debug!(error = %e, "Rejected request body");
        return Ok(json_reply(
            &ErrorMessage::new("Invalid JSON format"),
            StatusCode::BAD_REQUEST,
        ));
    }
    Err(err)
}

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn error_reply(err: &QuizError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
    json_reply(&ErrorMessage::new(err.to_string()), status)
}

fn with_registry(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = (Arc<RoomRegistry>,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameClock;
    use crate::questions::sample_bank;
    use serde_json::{json, Value};

    fn registry() -> Arc<RoomRegistry> {
        RoomRegistry::new(Arc::new(sample_bank(40)), GameClock::default())
    }

    fn body<B: AsRef<[u8]>>(response: &warp::http::Response<B>) -> Value {
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    async fn create(registry: &Arc<RoomRegistry>) -> Value {
        let response = warp::test::request()
            .method("POST")
            .path("/api/createroom")
            .json(&json!({
                "timeLimit": 5,
                "numQuestions": 10,
                "gameType": "MCQ",
                "hostUsername": "host"
            }))
            .reply(&api_routes(registry.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body(&response)
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = warp::test::request()
            .path("/health")
            .reply(&health_check())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body(&response);
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_create_room_route() {
        let registry = registry();
        let room = create(&registry).await;
        assert_eq!(room["host"], "host");
        assert_eq!(room["numQuestions"], 10);
        assert_eq!(room["players"], json!([]));
        assert!(registry.room_exists(room["code"].as_str().unwrap()).await);
    }

    #[tokio::test]
    async fn test_create_room_errors() {
        let registry = registry();
        let routes = api_routes(registry.clone()).recover(handle_rejection);

        let response = warp::test::request()
            .method("POST")
            .path("/api/createroom")
            .json(&json!({"timeLimit": 1, "numQuestions": 10, "gameType": "MCQ", "hostUsername": "h"}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = warp::test::request()
            .method("POST")
            .path("/api/createroom")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&response), json!({"error": "Invalid JSON format"}));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_room_route() {
        let registry = registry();
        let room = create(&registry).await;
        let code = room["code"].as_str().unwrap();
        let routes = api_routes(registry.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/api/joinroom")
            .json(&json!({"username": "alice", "roomID": code}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["code"], code);

        let response = warp::test::request()
            .method("POST")
            .path("/api/joinroom")
            .json(&json!({"username": "alice", "roomID": "nope"}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"error": "Room not found"}));

        let response = warp::test::request()
            .method("POST")
            .path("/api/joinroom")
            .json(&json!({"username": "al", "roomID": code}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_room_lookup_and_listing() {
        let registry = registry();
        let routes = api_routes(registry.clone());

        let response = warp::test::request().path("/api/rooms").reply(&routes).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"error": "No room found"}));

        let room = create(&registry).await;
        let code = room["code"].as_str().unwrap();

        let response = warp::test::request()
            .path(&format!("/api/room/{}", code))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["start"], false);

        let response = warp::test::request().path("/api/rooms").reply(&routes).await;
        assert_eq!(response.status(), StatusCode::OK);
        let listing = body(&response);
        assert_eq!(listing["rooms"][0]["code"], code);
        assert_eq!(listing["rooms"][0]["gameStarted"], false);

        let response = warp::test::request().path("/api/room/9x9x").reply(&routes).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_single_player_questions() {
        let routes = api_routes(registry());

        let response = warp::test::request()
            .path("/api/singleplayer")
            .header("X-Num-Questions", "5")
            .header("game-type", "MCQ")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let questions = body(&response);
        assert_eq!(questions.as_array().unwrap().len(), 5);
        assert!(questions[0]["answer"].is_string());
        assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);

        for bad in ["0", "-3", "ten"] {
            let response = warp::test::request()
                .path("/api/singleplayer")
                .header("X-Num-Questions", bad)
                .reply(&routes)
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", bad);
        }

        let response = warp::test::request()
            .path("/api/singleplayer")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
