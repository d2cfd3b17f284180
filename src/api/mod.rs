pub mod quiz_routes;
pub mod quiz_websocket;
