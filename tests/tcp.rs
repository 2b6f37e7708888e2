use std::io;
use std::net::Shutdown;
use std::time::Duration;

use futures_util::io::AsyncReadExt;
use futures_util::stream::StreamExt;

use ringlet::net::{TcpListener, TcpStream};
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
fn echo_roundtrip() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = ringlet::spawn_local(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut echoed = [0u8; 5];
        client.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"hello");
        server.await;
    });
}

#[test]
fn write_all_transfers_whole_buffer() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let payload: Vec<u8> = (0..1 << 20).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let server = ringlet::spawn_local(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut data = Vec::new();
            stream.read_to_end(&mut data).await.unwrap();
            data
        });

        let client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&payload).await.unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let data = server.await;
        assert_eq!(data.len(), expected.len());
        assert_eq!(data, expected);
    });
}

#[test]
fn vectored_write_gathers_in_list_order() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = ringlet::spawn_local(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 10];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let client = TcpStream::connect(addr).await.unwrap();
        let n = client
            .write_vectored([&b"abc"[..], &b"defgh"[..], &b"ij"[..]])
            .await
            .unwrap();
        assert_eq!(n, 10);

        assert_eq!(&server.await, b"abcdefghij");
    });
}

#[test]
fn vectored_read_fills_in_list_order() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, _) = listener.accept().await.unwrap();
        server_stream.write_all(b"abcdef").await.unwrap();

        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        let n = client
            .read_vectored([&mut first[..], &mut second[..]])
            .await
            .unwrap();
        assert_eq!(n, 6);
        assert_eq!(&first, b"abcd");
        assert_eq!(&second[..2], b"ef");
    });
}

#[test]
fn connect_to_closed_port_fails() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let err = TcpStream::connect("127.0.0.1:1").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    });
}

#[test]
fn addresses_are_consistent() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, peer) = listener.accept().await.unwrap();

        assert_eq!(peer, client.local_addr().unwrap());
        assert_eq!(client.peer_addr().unwrap(), addr);
        assert_eq!(server_stream.local_addr().unwrap(), addr);
    });
}

#[test]
fn shutdown_write_reaches_peer_as_eof() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (mut server_stream, _) = listener.accept().await.unwrap();

        client.write_all(b"bye").await.unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut data = Vec::new();
        server_stream.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"bye");
    });
}

#[test]
fn incoming_yields_connections() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = ringlet::spawn_local(async move {
            let mut incoming = listener.incoming();
            let stream = incoming.next().await.unwrap().unwrap();
            stream.write_all(b"hi").await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hi");
        server.await;
    });
}

#[test]
fn async_close_consumes_the_stream() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, _) = listener.accept().await.unwrap();

        client.close().await.unwrap();
        server_stream.close().await.unwrap();
    });
}

#[test]
fn stream_option_passthroughs() {
    let Some(rt) = runtime() else { return };
    rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        listener.set_ttl(64).unwrap();
        assert_eq!(listener.ttl().unwrap(), 64);

        let client = TcpStream::connect(addr).await.unwrap();
        client.set_linger(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.linger().unwrap(), Some(Duration::from_secs(5)));
        client.set_linger(None).unwrap();
        assert_eq!(client.linger().unwrap(), None);

        client.set_nodelay(true).unwrap();
        assert!(client.nodelay().unwrap());

        client.set_keepalive(true).unwrap();
        assert!(client.keepalive().unwrap());
    });
}
