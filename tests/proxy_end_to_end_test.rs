//! End-to-end proxying over real TCP sockets: echo traffic through the
//! proxy, authentication outcomes, unsupported commands, concurrency, and
//! cancellation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

use sockspipe::{Client, Error, ReplyCode, Server};

/// Echo server on a random local port.
async fn spawn_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

/// Proxy server on a random local port.
async fn spawn_proxy(server: Server) -> (Arc<Server>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(server);
    let acceptor = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = acceptor.serve(listener).await;
    });
    (server, addr)
}

fn auth_server() -> Server {
    let mut users = HashMap::new();
    users.insert("abc".to_string(), "12345678".to_string());
    Server::with_auth(users)
}

#[tokio::test]
async fn echo_through_proxy() {
    let echo_addr = spawn_echo().await;
    let (_server, proxy_addr) = spawn_proxy(Server::new()).await;

    let client = Client::new(proxy_addr.to_string());
    let mut stream = client
        .dial("tcp", &echo_addr.to_string())
        .await
        .expect("dial through proxy");

    stream.write_all(b"0123456789").await.unwrap();
    let mut buf = [0u8; 10];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("echo within deadline")
        .unwrap();
    assert_eq!(&buf, b"0123456789");
}

#[tokio::test]
async fn echo_through_proxy_with_auth() {
    let echo_addr = spawn_echo().await;
    let (_server, proxy_addr) = spawn_proxy(auth_server()).await;

    let client = Client::with_auth(proxy_addr.to_string(), "abc", "12345678").unwrap();
    let mut stream = client.dial("tcp", &echo_addr.to_string()).await.unwrap();

    stream.write_all(b"hello auth").await.unwrap();
    let mut buf = [0u8; 10];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello auth");
}

#[tokio::test]
async fn wrong_password_fails_auth() {
    let echo_addr = spawn_echo().await;
    let (_server, proxy_addr) = spawn_proxy(auth_server()).await;

    let client = Client::with_auth(proxy_addr.to_string(), "abc", "not-the-password").unwrap();
    let err = client
        .dial("tcp", &echo_addr.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

#[tokio::test]
async fn udp_network_gets_command_not_supported() {
    let (_server, proxy_addr) = spawn_proxy(Server::new()).await;

    let client = Client::new(proxy_addr.to_string());
    let err = client.dial("udp", "127.0.0.1:53").await.unwrap_err();
    assert!(matches!(err, Error::Reply(ReplyCode::CommandNotSupported)));
}

#[tokio::test]
async fn refused_target_maps_to_reply_code() {
    let (_server, proxy_addr) = spawn_proxy(Server::new()).await;

    // Bind then drop to get a port with nothing listening.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let client = Client::new(proxy_addr.to_string());
    let err = client
        .dial("tcp", &dead_addr.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Reply(ReplyCode::ConnectionRefused)));
}

#[tokio::test]
async fn concurrent_clients_are_independent() {
    let echo_addr = spawn_echo().await;
    let (_server, proxy_addr) = spawn_proxy(Server::new()).await;

    // One client that will fail (dead target) alongside several that echo.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let failing = {
        let proxy = proxy_addr.to_string();
        tokio::spawn(async move {
            Client::new(proxy)
                .dial("tcp", &dead_addr.to_string())
                .await
                .err()
        })
    };

    let mut workers = Vec::new();
    for i in 0..8u8 {
        let proxy = proxy_addr.to_string();
        let target = echo_addr.to_string();
        workers.push(tokio::spawn(async move {
            let mut stream = Client::new(proxy).dial("tcp", &target).await.unwrap();
            let payload = [i; 32];
            stream.write_all(&payload).await.unwrap();
            let mut buf = [0u8; 32];
            stream.read_exact(&mut buf).await.unwrap();
            buf == payload
        }));
    }

    assert!(failing.await.unwrap().is_some());
    for worker in workers {
        assert!(timeout(Duration::from_secs(5), worker).await.unwrap().unwrap());
    }
}

#[tokio::test]
async fn shutdown_cancels_relay_in_progress() {
    let echo_addr = spawn_echo().await;
    let (server, proxy_addr) = spawn_proxy(Server::new()).await;

    let client = Client::new(proxy_addr.to_string());
    let mut stream = client.dial("tcp", &echo_addr.to_string()).await.unwrap();

    // Prove the relay is live, then cancel it mid-flight.
    stream.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await.unwrap();

    server.shutdown();

    // The proxy drops its side promptly; the client sees EOF.
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("close within deadline")
        .unwrap();
    assert_eq!(n, 0);

    // New connections are no longer accepted once the acceptor stopped.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let late = Client::new(proxy_addr.to_string());
    assert!(late.dial("tcp", &echo_addr.to_string()).await.is_err());
}
