use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::accept_async;

use super::*;

/// Relay stand-in that answers every write with `done`, except that upgrade
/// requests for `stalled` are accepted at the TCP level and never answered.
async fn spawn_relay_with_stalled_board(stalled: Uuid) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            let mut head = [0u8; 512];
            let n = stream.peek(&mut head).await.unwrap_or(0);
            if String::from_utf8_lossy(&head[..n]).contains(&stalled.to_string()) {
                held.push(stream);
                continue;
            }
            tokio::spawn(async move {
                let mut socket = accept_async(stream).await.expect("handshake");
                while let Some(Ok(Message::Text(text))) = socket.next().await {
                    let req: Frame = serde_json::from_str(text.as_str()).expect("frame");
                    let reply = serde_json::to_string(&req.done()).expect("json");
                    if socket.send(Message::Text(reply.into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn stalled_connect_does_not_block_other_boards() {
    let stalled = Uuid::new_v4();
    let healthy = Uuid::new_v4();
    let store = Arc::new(WsStore::new(spawn_relay_with_stalled_board(stalled).await, &Config::default()));

    let hung = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete_element(stalled, &ElementId::new("x")).await })
    };
    sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_millis(500), store.delete_element(healthy, &ElementId::new("y")))
        .await
        .expect("write to another board waited on the stalled connect")
        .expect("delete");
    assert!(!hung.is_finished());
    hung.abort();
}

#[tokio::test]
async fn writer_socket_is_reused_per_board() {
    let board = Uuid::new_v4();
    let store = WsStore::new(spawn_relay_with_stalled_board(Uuid::new_v4()).await, &Config::default());

    store.delete_element(board, &ElementId::new("a")).await.expect("first");
    let first = store.live_writer(board).await.expect("writer registered");
    store.delete_element(board, &ElementId::new("b")).await.expect("second");
    let second = store.live_writer(board).await.expect("writer registered");
    assert!(first.same_channel(&second));
}
