use std::io;

use futures_util::io::AsyncReadExt;

use ringlet::net::TcpStream;

fn main() -> io::Result<()> {
    ringlet::block_on(async {
        let mut stream = TcpStream::connect("127.0.0.1:8080").await.unwrap();
        stream.write_all(b"hello").await.unwrap();

        let mut buf = vec![0; 5];
        match stream.read_exact(&mut buf).await {
            Ok(_) => println!("read bytes: {:?}", buf),
            Err(e) => println!("read fail: {}", e),
        }
    });
    Ok(())
}
