// Flag Quiz CLI
// Talks to a running quiz server over HTTP and WebSocket for manual testing

use clap::{Parser, Subcommand};
use colored::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Parser)]
#[command(name = "quiz-cli")]
#[command(about = "Flag Quiz server CLI", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// List live rooms
    Rooms,

    /// Show one room
    Room {
        /// Room code
        code: String,
    },

    /// Create a multiplayer room
    Create {
        /// Host username
        #[arg(long)]
        host: String,

        /// Time limit in minutes (3-10)
        #[arg(short, long, default_value_t = 5)]
        time_limit: i64,

        /// Number of questions (10-25)
        #[arg(short, long, default_value_t = 10)]
        questions: i64,

        /// Game mode (MCQ or MAP)
        #[arg(short, long, default_value = "MCQ")]
        mode: String,
    },

    /// Join a room and print every event until the server closes
    Join {
        /// Room code
        #[arg(short, long)]
        room: String,

        /// Username (4-20 characters)
        #[arg(short, long)]
        username: String,

        /// Start the game after joining
        #[arg(short, long)]
        load: bool,
    },

    /// Join a room, start the game and answer every question with the first option
    Play {
        /// Room code
        #[arg(short, long)]
        room: String,

        /// Username (4-20 characters)
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Rooms => {
            list_rooms(&cli.server).await;
        }
        Commands::Room { code } => {
            show_room(&cli.server, code).await;
        }
        Commands::Create {
            host,
            time_limit,
            questions,
            mode,
        } => {
            create_room(&cli.server, host, *time_limit, *questions, mode).await;
        }
        Commands::Join {
            room,
            username,
            load,
        } => {
            join_room(&cli.server, room, username, *load).await;
        }
        Commands::Play { room, username } => {
            play(&cli.server, room, username).await;
        }
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn list_rooms(server: &str) {
    let url = format!("http://{}/api/rooms", server);

    let Some(body) = get_json(&url).await else {
        return;
    };

    let rooms = body["rooms"].as_array().cloned().unwrap_or_default();
    println!("{} {} live room(s)", "✓".green(), rooms.len());
    for room in &rooms {
        print_room(room);
    }
}

async fn show_room(server: &str, code: &str) {
    let url = format!("http://{}/api/room/{}", server, urlencoding::encode(code));

    if let Some(room) = get_json(&url).await {
        print_room(&room);
    }
}

async fn create_room(server: &str, host: &str, time_limit: i64, questions: i64, mode: &str) {
    println!("{}", "Creating room...".cyan());

    let body = json!({
        "timeLimit": time_limit,
        "numQuestions": questions,
        "gameType": mode,
        "hostUsername": host,
    });

    let url = format!("http://{}/api/createroom", server);
    let Some(room) = post_json(&url, &body).await else {
        return;
    };

    let code = room["code"].as_str().unwrap_or("unknown");
    println!("{} Room created successfully!", "✓".green());
    println!("\n{}", "═".repeat(50).green());
    println!("{} {}", "Room code:".bold(), code.green().bold());
    println!("{}", "═".repeat(50).green());
    println!(
        "Join with: quiz-cli join --room {} --username <name>",
        code.cyan()
    );
}

async fn join_room(server: &str, room: &str, username: &str, load: bool) {
    let Some((mut write, mut read)) = connect_and_join(server, room, username).await else {
        return;
    };

    if load && send_event(&mut write, json!({"event": "loadgame"})).await.is_none() {
        return;
    }

    println!("{}", "Listening for events (Ctrl+C to leave)...".yellow());
    while let Some(event) = next_event(&mut read, Duration::from_secs(30)).await {
        print_event(&event);
    }
}

async fn play(server: &str, room: &str, username: &str) {
    let url = format!("http://{}/api/joinroom", server);
    let Some(summary) = post_json(&url, &json!({"username": username, "roomID": room})).await
    else {
        return;
    };
    let total = summary["numQuestions"].as_i64().unwrap_or(0);

    let Some((mut write, mut read)) = connect_and_join(server, room, username).await else {
        return;
    };
    if send_event(&mut write, json!({"event": "loadgame"})).await.is_none() {
        return;
    }

    let mut index = 0;
    let mut score = 0;
    while let Some(event) = next_event(&mut read, Duration::from_secs(30)).await {
        match event["event"].as_str().unwrap_or_default() {
            "countdown" => println!("{} {}", "⏱".yellow(), event["data"]),
            "gameStarted" => {
                println!("{} Game started", "✓".green());
                if request_question(&mut write, index).await.is_none() {
                    return;
                }
            }
            "new_question" => {
                let answer = event["data"]["options"][0]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_string();
                println!(
                    "{} Q{} {} -> {}",
                    "?".cyan(),
                    index + 1,
                    event["data"]["flag_url"].as_str().unwrap_or_default(),
                    answer
                );
                let message = json!({
                    "event": "validate_answer",
                    "data": {"question_index": index, "answer": answer},
                });
                if send_event(&mut write, message).await.is_none() {
                    return;
                }
            }
            "answer_result" => {
                let correct = event["data"]["correct_answer"] == event["data"]["chosen_answer"];
                if correct {
                    score += 1;
                    println!("  {} correct", "✓".green());
                } else {
                    println!(
                        "  {} wrong, it was {}",
                        "✗".red(),
                        event["data"]["correct_answer"].as_str().unwrap_or_default()
                    );
                }

                index += 1;
                if index < total {
                    if request_question(&mut write, index).await.is_none() {
                        return;
                    }
                } else {
                    println!("{} Finished with {}/{}", "✓".green().bold(), score, total);
                }
            }
            "time_over" => {
                println!("{} Time over", "✗".yellow());
            }
            _ => print_event(&event),
        }
    }
}

async fn connect_and_join(
    server: &str,
    room: &str,
    username: &str,
) -> Option<(SplitSink<WsStream, Message>, SplitStream<WsStream>)> {
    let url = format!("ws://{}/ws", server);
    println!("{} Connecting to {}", "→".cyan(), url);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            return None;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    send_event(&mut write, json!({"username": username, "roomID": room})).await?;

    // The first frame is either our own playerJoined or an error
    let first = next_event(&mut read, Duration::from_secs(5)).await?;
    if let Some(error) = first["error"].as_str() {
        println!("{} Join rejected: {}", "✗".red(), error);
        return None;
    }

    println!("{} Joined room {} as {}", "✓".green(), room.green().bold(), username.bold());
    print_event(&first);
    Some((write, read))
}

async fn request_question(write: &mut SplitSink<WsStream, Message>, index: i64) -> Option<()> {
    let message = json!({"event": "get_new_question", "data": {"question_number": index}});
    send_event(write, message).await
}

async fn send_event(write: &mut SplitSink<WsStream, Message>, message: Value) -> Option<()> {
    match write.send(Message::Text(message.to_string())).await {
        Ok(()) => Some(()),
        Err(e) => {
            println!("{} Failed to send message: {}", "✗".red(), e);
            None
        }
    }
}

/// Next JSON text frame; `None` once the connection is gone
async fn next_event(read: &mut SplitStream<WsStream>, wait: Duration) -> Option<Value> {
    loop {
        match timeout(wait, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => return Some(value),
                Err(_) => println!("{} {}", "◀".yellow(), text),
            },
            Ok(Some(Ok(Message::Close(_)))) => {
                println!("{} Server closed the connection", "✗".yellow());
                return None;
            }
            Ok(Some(Ok(_))) => {
                // Ignore other message types (Binary, Ping, Pong, Frame)
                continue;
            }
            Ok(Some(Err(e))) => {
                println!("{} Connection error: {}", "✗".red(), e);
                return None;
            }
            Ok(None) => {
                println!("{} Connection closed", "✗".yellow());
                return None;
            }
            Err(_) => {
                // Timeout - just continue listening
                continue;
            }
        }
    }
}

async fn get_json(url: &str) -> Option<Value> {
    let client = reqwest::Client::new();
    read_response(client.get(url).send().await).await
}

async fn post_json(url: &str, body: &Value) -> Option<Value> {
    let client = reqwest::Client::new();
    read_response(client.post(url).json(body).send().await).await
}

async fn read_response(result: reqwest::Result<reqwest::Response>) -> Option<Value> {
    let resp = match result {
        Ok(resp) => resp,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return None;
        }
    };

    let status = resp.status();
    let body = match resp.json::<Value>().await {
        Ok(body) => body,
        Err(e) => {
            println!("{} Invalid response ({}): {}", "✗".red(), status, e);
            return None;
        }
    };

    if !status.is_success() {
        println!(
            "{} {} {}",
            "✗".red(),
            status,
            body["error"].as_str().unwrap_or("request failed")
        );
        return None;
    }
    Some(body)
}

fn print_room(room: &Value) {
    let players: Vec<&str> = room["players"]
        .as_array()
        .map(|players| {
            players
                .iter()
                .filter_map(|p| p["username"].as_str())
                .collect()
        })
        .unwrap_or_default();

    println!(
        "  {} host={} mode={} questions={} time={}m started={} players=[{}]",
        room["code"].as_str().unwrap_or("?").green().bold(),
        room["host"].as_str().unwrap_or("?"),
        room["gamemode"].as_str().unwrap_or("?"),
        room["numQuestions"],
        room["timeLimit"],
        room["start"],
        players.join(", ")
    );
}

fn print_event(event: &Value) {
    if let Some(error) = event["error"].as_str() {
        println!("{} {}", "✗".red(), error);
        return;
    }

    let name = event["event"].as_str().unwrap_or("unknown");
    match event.get("data") {
        Some(data) => println!("{} {} {}", "◀".green(), name.bold(), data),
        None => println!("{} {}", "◀".green(), name.bold()),
    }
}
