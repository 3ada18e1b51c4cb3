use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use fieldhost::config::Config;
use fieldhost::field::memory::{MemoryDirectory, MemoryInventory, StaticCatalog};
use fieldhost::field::services::{FixedRandom, Services};
use fieldhost::protocol::{encode_frame, Framer, Header, Outbound, PacketWriter};
use fieldhost::server::FieldServer;

fn services() -> Services {
    let catalog = Arc::new(StaticCatalog::default());
    Services {
        inventory: Arc::new(MemoryInventory::default()),
        catalog: catalog.clone(),
        effects: catalog,
        random: Arc::new(FixedRandom(0)),
        characters: Arc::new(MemoryDirectory::auto_create(100)),
    }
}

fn packet(header: Header, body: impl FnOnce(&mut PacketWriter)) -> Vec<u8> {
    let mut w = PacketWriter::with_opcode(header.opcode());
    body(&mut w);
    encode_frame(&w.into_vec())
}

async fn start(cfg: Config) -> (Arc<FieldServer>, std::net::SocketAddr, oneshot::Sender<()>) {
    let server = Arc::new(FieldServer::with_services(cfg, services()).expect("server"));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (stop, stopped) = oneshot::channel::<()>();
    let task = Arc::clone(&server);
    tokio::spawn(async move {
        task.serve(listener, async {
            let _ = stopped.await;
        })
        .await
        .expect("serve");
    });
    (server, addr, stop)
}

async fn read_frame(stream: &mut TcpStream, framer: &mut Framer) -> Vec<u8> {
    let mut buf = [0u8; 256];
    loop {
        if let Some(frame) = framer.next_frame() {
            return frame;
        }
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("reply in time")
            .expect("read");
        assert!(n > 0, "connection closed before a reply arrived");
        framer.push(&buf[..n]);
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn framed_request_gets_framed_reply() {
    let (server, addr, stop) = start(Config::default()).await;
    let mut client = TcpStream::connect(addr).await.expect("connect");

    // login and an unlock request in a single write
    let mut bytes = packet(Header::MigrateIn, |w| w.encode4(7));
    bytes.extend(packet(Header::UserDestroyPetItemRequest, |_| {}));
    client.write_all(&bytes).await.expect("write");

    let mut framer = Framer::default();
    let reply = read_frame(&mut client, &mut framer).await;
    assert_eq!(reply, Outbound::EnableActions.encode());

    wait_until(|| server.world().online() == 1).await;
    drop(client);
    wait_until(|| server.world().online() == 0 && server.active_sessions() == 0).await;
    let _ = stop.send(());
}

#[tokio::test]
async fn split_frames_are_reassembled() {
    let (_server, addr, stop) = start(Config::default()).await;
    let mut client = TcpStream::connect(addr).await.expect("connect");

    let mut bytes = packet(Header::MigrateIn, |w| w.encode4(8));
    bytes.extend(packet(Header::UserDestroyPetItemRequest, |_| {}));
    for chunk in bytes.chunks(3) {
        client.write_all(chunk).await.expect("write");
        client.flush().await.expect("flush");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut framer = Framer::default();
    assert_eq!(
        read_frame(&mut client, &mut framer).await,
        Outbound::EnableActions.encode()
    );
    let _ = stop.send(());
}

#[tokio::test]
async fn garbage_does_not_kill_the_connection() {
    let (_server, addr, stop) = start(Config::default()).await;
    let mut client = TcpStream::connect(addr).await.expect("connect");

    let mut bytes = encode_frame(&[0x01]); // shorter than an opcode
    bytes.extend(encode_frame(&[0xFF, 0x7F, 1, 2, 3])); // unknown opcode
    bytes.extend(packet(Header::MigrateIn, |w| w.encode4(9)));
    bytes.extend(packet(Header::UserDestroyPetItemRequest, |_| {}));
    client.write_all(&bytes).await.expect("write");

    let mut framer = Framer::default();
    assert_eq!(
        read_frame(&mut client, &mut framer).await,
        Outbound::EnableActions.encode()
    );
    let _ = stop.send(());
}

#[tokio::test]
async fn sessions_beyond_the_limit_are_refused() {
    let mut cfg = Config::default();
    cfg.server.max_sessions = 1;
    let (server, addr, stop) = start(cfg).await;

    let _first = TcpStream::connect(addr).await.expect("connect");
    wait_until(|| server.active_sessions() == 1).await;

    let mut second = TcpStream::connect(addr).await.expect("connect");
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .expect("refusal in time");
    // closed (or reset) without a single byte
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(server.active_sessions(), 1);
    let _ = stop.send(());
}
