//! Stdin admin console, grounded on `utils/console.py` + `console_admin.py`:
//! read lines on a blocking thread, ignore anything not starting with `/`,
//! dispatch the rest onto the same core operations the HTTP admin surface
//! and the packet handler use.

use std::io::BufRead;

use protocol::{ChatMessage, ClientBoundPacket};

use crate::security::BanType;
use crate::state::ServerState;

pub async fn run(state: ServerState) {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(16);
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = rx.recv().await {
        let line = line.trim();
        if !line.starts_with('/') {
            continue;
        }
        dispatch(&state, &line[1..]).await;
    }
}

async fn dispatch(state: &ServerState, command: &str) {
    let mut parts = command.split_whitespace();
    let Some(name) = parts.next() else { return };
    let args: Vec<&str> = parts.collect();

    match name {
        "list" => {
            let rooms = state.rooms().lock().await;
            for room in rooms.all() {
                println!("{} host={:?} players={}", room.id, room.host, room.users.len());
            }
        }
        "room" => {
            let Some(room_id) = args.first() else {
                println!("usage: /room <id>");
                return;
            };
            let rooms = state.rooms().lock().await;
            match rooms.get(*room_id) {
                Some(room) => println!(
                    "{} host={:?} locked={} live={} players={:?}",
                    room.id,
                    room.host,
                    room.locked,
                    room.live,
                    room.user_profiles().into_iter().map(|p| p.username).collect::<Vec<_>>()
                ),
                None => println!("no such room: {room_id}"),
            }
        }
        "kick" => {
            let Some(user_id) = args.first().and_then(|s| s.parse::<i32>().ok()) else {
                println!("usage: /kick <userId>");
                return;
            };
            let online = state.online().lock().await;
            match online.get(&user_id) {
                Some(conn) => conn.close().await,
                None => println!("user {user_id} is not online"),
            }
        }
        "ban" => {
            let Some(target) = args.first() else {
                println!("usage: /ban <userId> [reason]");
                return;
            };
            let reason = args[1..].join(" ");
            state
                .security()
                .lock()
                .await
                .add_ban(BanType::Id, *target, None, reason)
                .await;
            println!("banned {target}");
        }
        "unban" => {
            let Some(target) = args.first() else {
                println!("usage: /unban <userId>");
                return;
            };
            let removed = state.security().lock().await.remove_ban(BanType::Id, target).await;
            println!("{}", if removed { "unbanned" } else { "no such ban" });
        }
        "broadcast" => {
            let text = args.join(" ");
            let online = state.online().lock().await;
            for conn in online.values() {
                conn.send(&ClientBoundPacket::Message(ChatMessage::system(text.clone())));
            }
        }
        "lock" => {
            let Some(room_id) = args.first() else {
                println!("usage: /lock <roomId>");
                return;
            };
            match state.rooms().lock().await.toggle_lock(room_id) {
                Ok(locked) => println!("{room_id} locked={locked}"),
                Err(_) => println!("no such room: {room_id}"),
            }
        }
        "close" => {
            let Some(room_id) = args.first() else {
                println!("usage: /close <roomId>");
                return;
            };
            let mut rooms = state.rooms().lock().await;
            if let Some(room) = rooms.get(*room_id) {
                for conn in room.connections() {
                    conn.send(&ClientBoundPacket::Message(ChatMessage::system(
                        "this room has been closed by an administrator",
                    )));
                }
                rooms.destroy_room(room_id);
            } else {
                println!("no such room: {room_id}");
            }
        }
        "op" => {
            let Some(user_id) = args.first() else {
                println!("usage: /op <userId>");
                return;
            };
            state.security().lock().await.op(*user_id).await;
        }
        "deop" => {
            let Some(user_id) = args.first() else {
                println!("usage: /deop <userId>");
                return;
            };
            state.security().lock().await.deop(user_id).await;
        }
        "reload" => {
            let mut security = state.security().lock().await;
            *security = crate::security::SecurityStore::load(state.config().security_store_path.clone()).await;
            println!("security store reloaded");
        }
        other => println!("unknown command: /{other}"),
    }
}
