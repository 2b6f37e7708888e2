use std::io;

use futures_util::io::AsyncReadExt;

use ringlet::net::TcpListener;
use ringlet::runtime::Runtime;

fn main() -> io::Result<()> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:8080").unwrap();

        println!("server start listen on 127.0.0.1:8080");
        loop {
            let (mut stream, addr) = listener.accept().await.unwrap();
            println!("accept stream from addr: {:?}", addr);

            ringlet::spawn_local(async move {
                let mut buf = vec![0; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Err(e) = stream.write_all(&buf[..n]).await {
                                println!("write fail: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            println!("read fail: {}", e);
                            break;
                        }
                    }
                }
            })
            .detach();
        }
    });
    Ok(())
}
