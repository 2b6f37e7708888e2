use ringlet::net::UdpSocket;
use ringlet::runtime::Runtime;

fn runtime() -> Option<Runtime> {
    match Runtime::new() {
        Ok(rt) => Some(rt),
        Err(err) => {
            eprintln!("skipping test, io_uring unavailable: {}", err);
            None
        }
    }
}

#[test]
fn send_to_and_recv() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap();

        let n = sender.send_to(b"ping", target).await.unwrap();
        assert_eq!(n, 4);

        let mut buf = [0u8; 16];
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
    });
}

#[test]
fn connected_send_and_recv() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.connect(receiver.local_addr().unwrap()).await.unwrap();
        let n = sender.send(b"pong").await.unwrap();
        assert_eq!(n, 4);

        let mut buf = [0u8; 16];
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"pong");
    });
}

#[test]
fn broadcast_round_trip() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_broadcast(true).unwrap();
        assert!(socket.broadcast().unwrap());
        socket.set_broadcast(false).unwrap();
        assert!(!socket.broadcast().unwrap());
    });
}
