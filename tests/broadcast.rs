//! Driver integration over loopback TCP: one message relayed to every peer.

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use wsframe::{
    connection::{ConnectionDriver, DriverConfig, accept_upgrade},
    frame::Frame,
    handshake::generate_key,
    message::{Chunk, Message},
    parser::{FrameParser, ParserConfig, Role},
    session::{ConnectionId, ConnectionTable, Handler, Outbox, Session, SessionConfig},
};
use wsframe_testing::client_frame;

type Peers = Arc<ConnectionTable<mpsc::UnboundedSender<Frame>>>;

struct Relay {
    peers: Peers,
}

impl Handler for Relay {
    fn on_message(&mut self, _id: ConnectionId, mut message: Message, _outbox: &mut Outbox<'_>) {
        if let Ok(Chunk::Data(payload)) = message.body_mut().try_next_chunk() {
            self.peers.for_each(|_, peer| {
                let _ = peer.send(Frame::binary(payload.clone()));
            });
        }
    }
}

async fn spawn_server(peers: Peers, clients: usize, shutdown: CancellationToken) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        for _ in 0..clients {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let peers = Arc::clone(&peers);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let config = DriverConfig::default();
                let (_, leftover) = accept_upgrade(&mut stream, config.handshake_timeout())
                    .await
                    .expect("upgrade");
                let (tx, rx) = mpsc::unbounded_channel();
                let id = peers.insert(tx);
                let handler = Relay {
                    peers: Arc::clone(&peers),
                };
                let session = Session::new(id, SessionConfig::default(), handler);
                ConnectionDriver::new(stream, session, shutdown, config)
                    .with_leftover(leftover)
                    .with_outbound(rx)
                    .run()
                    .await;
                peers.remove(&id);
            });
        }
    });
    addr
}

async fn connect(addr: std::net::SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let request = format!(
        "GET /room HTTP/1.1\r\nHost: test\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        generate_key()
    );
    stream.write_all(request.as_bytes()).await.expect("request");
    let mut head = Vec::new();
    let mut byte = [0_u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.expect("response");
        head.push(byte[0]);
    }
    assert!(head.starts_with(b"HTTP/1.1 101"));
    stream
}

async fn read_frame(stream: &mut TcpStream) -> Frame {
    let mut parser = FrameParser::new(ParserConfig::for_role(Role::Client));
    let mut buf = [0_u8; 256];
    loop {
        if let Some(frame) = parser.next_frame().expect("valid server output") {
            return frame;
        }
        let n = timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("read timed out")
            .expect("read");
        assert_ne!(n, 0, "server closed early");
        parser.feed(&buf[..n]);
    }
}

#[tokio::test]
async fn message_from_one_client_reaches_all() {
    let peers: Peers = Arc::new(ConnectionTable::new());
    let shutdown = CancellationToken::new();
    let addr = spawn_server(Arc::clone(&peers), 2, shutdown.clone()).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    timeout(Duration::from_secs(5), async {
        while peers.len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("both peers registered");

    alice
        .write_all(&client_frame(Frame::binary(&b"hello room"[..])))
        .await
        .expect("send");

    let expected = Frame::binary(&b"hello room"[..]);
    assert_eq!(read_frame(&mut alice).await, expected);
    assert_eq!(read_frame(&mut bob).await, expected);

    shutdown.cancel();
    timeout(Duration::from_secs(5), async {
        while !peers.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("drivers exit on shutdown");
}
