use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Extension};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use markdown_preview_core::{DocumentEvent, PreviewSession};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

type Error = Box<dyn std::error::Error + Send + Sync>;

/// Message sent by the preview page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Full content of the input control after an edit.
    Input(String),
    /// The clear button was pressed.
    Clear,
}

/// Message pushed to the preview page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Replace the preview region with the given html.
    UpdateContent(String),
    /// Replace the input control content, e.g. after the file changed on disk.
    SetInput(String),
    /// Empty the input control and focus it.
    ClearInput,
}

#[derive(Clone)]
struct PreviewPage(Arc<String>);

async fn page_handler(Extension(page): Extension<PreviewPage>) -> impl IntoResponse {
    Html(page.0.as_str().to_owned())
}

/// The handler for the HTTP request (this gets called when the HTTP GET lands at the start
/// of websocket negotiation). After this completes, the actual switching from HTTP to
/// websocket protocol will occur.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(session): Extension<Arc<PreviewSession>>,
) -> impl IntoResponse {
    tracing::debug!(%addr, "Preview client connected");
    ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, session).await;
        tracing::debug!(%addr, "Preview client disconnected");
    })
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, WsMessage>,
    msg: &ServerMessage,
) -> Result<(), Error> {
    let text = serde_json::to_string(msg)?;
    sender.send(WsMessage::Text(text)).await?;
    Ok(())
}

async fn handle_client_text(session: &PreviewSession, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Input(markdown)) => session.input(markdown),
        Ok(ClientMessage::Clear) => {
            session.clear().await;
        }
        Err(err) => tracing::warn!(%err, "Ignoring malformed client message"),
    }
}

async fn handle_websocket(socket: WebSocket, session: Arc<PreviewSession>) {
    let (mut sender, mut receiver) = socket.split();
    let mut previews = session.subscribe();
    let mut document_events = session.subscribe_document_events();

    // Bring a new page up to date.
    let mut greeting = Vec::with_capacity(2);
    let document = session.document();
    if !document.is_empty() {
        greeting.push(ServerMessage::SetInput(document));
    }
    greeting.push(ServerMessage::UpdateContent(
        previews.borrow_and_update().html.clone(),
    ));
    for msg in &greeting {
        if send_message(&mut sender, msg).await.is_err() {
            return;
        }
    }

    loop {
        let outgoing = tokio::select! {
            res = previews.changed() => {
                if res.is_err() {
                    break;
                }
                let html = previews.borrow_and_update().html.clone();
                ServerMessage::UpdateContent(html)
            }
            res = document_events.changed() => {
                if res.is_err() {
                    break;
                }
                let event = document_events.borrow_and_update().clone();
                match event {
                    Some(DocumentEvent::Replaced(text)) => ServerMessage::SetInput(text),
                    Some(DocumentEvent::Cleared) => ServerMessage::ClearInput,
                    None => continue,
                }
            }
            maybe_msg = receiver.next() => {
                match maybe_msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_text(&session, &text).await;
                        continue;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        tracing::debug!(%err, "Websocket receive error");
                        break;
                    }
                }
            }
        };

        if let Err(err) = send_message(&mut sender, &outgoing).await {
            tracing::debug!(%err, "Failed to push to preview client");
            break;
        }
    }

    let _ = sender.send(WsMessage::Close(None)).await;
}

/// Routes of the preview: the page itself on `/`, the live channel on `/ws`.
pub fn router(session: Arc<PreviewSession>, page: String) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/ws", get(ws_handler))
        .layer(Extension(session))
        .layer(Extension(PreviewPage(Arc::new(page))))
}

/// Serve `page` and the live preview of `session` until the server fails.
pub async fn serve(
    listener: tokio::net::TcpListener,
    session: Arc<PreviewSession>,
    page: String,
    open_browser: bool,
) -> Result<(), Error> {
    let addr = listener.local_addr()?;
    let browse_addr = if addr.ip().is_unspecified() {
        SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
    } else {
        addr
    };
    let url = format!("http://{browse_addr}");

    if open_browser {
        if let Err(err) = webbrowser::open(&url) {
            tracing::warn!(%err, %url, "Failed to open the browser");
        }
    }

    tracing::info!(%url, "Serving live preview");

    axum::serve(
        listener,
        router(session, page).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
