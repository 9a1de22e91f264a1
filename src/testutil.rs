//! Loopback servers for tests: a TCP DNS responder, an HTTP origin and
//! a SOCKS5 proxy that records the credentials it is offered.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::dns::{DnsQuery, DnsRecord, DnsResponse};
use crate::transport::tcp::{read_dns_message, write_dns_message};

/// What the mock DNS server answers with.
#[derive(Debug, Clone)]
pub enum DnsAnswer {
    /// A records for the queried name.
    Addresses(Vec<Ipv4Addr>),
    /// Arbitrary records, returned as-is.
    Records(Vec<DnsRecord>),
    /// A valid response carrying the wrong transaction ID.
    WrongId,
    /// Accept the connection and never reply.
    Silent,
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub async fn spawn_dns_server(answer: DnsAnswer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(answer_dns(stream, answer.clone()));
        }
    });

    addr
}

async fn answer_dns(mut stream: TcpStream, answer: DnsAnswer) {
    let Ok(message) = read_dns_message(&mut stream).await else {
        return;
    };
    let Some(query) = DnsQuery::parse(&message) else {
        return;
    };

    let response = match answer {
        DnsAnswer::Addresses(addrs) => {
            let records = addrs
                .into_iter()
                .map(|addr| DnsRecord::a(&query.domain, addr, 300))
                .collect();
            DnsResponse::for_query(&query, records)
        }
        DnsAnswer::Records(records) => DnsResponse::for_query(&query, records),
        DnsAnswer::WrongId => {
            let mut response = DnsResponse::for_query(
                &query,
                vec![DnsRecord::a(&query.domain, Ipv4Addr::LOCALHOST, 300)],
            );
            response.id = query.id.wrapping_add(1);
            response
        }
        DnsAnswer::Silent => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return;
        }
    };

    let _ = write_dns_message(&mut stream, &response.to_bytes()).await;
}

/// Host headers seen by a mock origin, in arrival order.
pub type SeenHosts = Arc<Mutex<Vec<String>>>;

/// Serve `body` to every `GET /`, recording the Host header.
pub async fn spawn_http_origin(body: &'static str) -> (SocketAddr, SeenHosts) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SeenHosts = Arc::default();

    let hosts = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_http(stream, body, hosts.clone()));
        }
    });

    (addr, seen)
}

async fn serve_http(mut stream: TcpStream, body: &'static str, hosts: SeenHosts) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    if let Some(host) = request.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case("host").then(|| value.trim().to_string())
    }) {
        hosts.lock().unwrap().push(host);
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Username/password pairs offered to a mock proxy.
pub type SeenCredentials = Arc<Mutex<Vec<(String, String)>>>;

/// A SOCKS5 proxy requiring username/password auth that relays to the
/// requested IPv4 target.
pub async fn spawn_socks5_proxy() -> (SocketAddr, SeenCredentials) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SeenCredentials = Arc::default();

    let credentials = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let credentials = credentials.clone();
            tokio::spawn(async move {
                let _ = relay_socks5(stream, credentials).await;
            });
        }
    });

    (addr, seen)
}

async fn relay_socks5(mut client: TcpStream, credentials: SeenCredentials) -> std::io::Result<()> {
    // Greeting: version, method count, methods. Always pick username/password.
    let mut head = [0u8; 2];
    client.read_exact(&mut head).await?;
    let mut methods = vec![0u8; head[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[0x05, 0x02]).await?;

    // RFC 1929 sub-negotiation.
    let mut version = [0u8; 1];
    client.read_exact(&mut version).await?;
    let username = read_short_string(&mut client).await?;
    let password = read_short_string(&mut client).await?;
    credentials.lock().unwrap().push((username, password));
    client.write_all(&[0x01, 0x00]).await?;

    // CONNECT request with an IPv4 target.
    let mut request = [0u8; 4];
    client.read_exact(&mut request).await?;
    if request[3] != 0x01 {
        client.write_all(&[0x05, 0x08, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;
        return Ok(());
    }
    let mut target = [0u8; 6];
    client.read_exact(&mut target).await?;
    let ip = Ipv4Addr::new(target[0], target[1], target[2], target[3]);
    let port = u16::from_be_bytes([target[4], target[5]]);

    let mut upstream = match TcpStream::connect((ip, port)).await {
        Ok(stream) => stream,
        Err(_) => {
            client.write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;
            return Ok(());
        }
    };
    client.write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;

    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}

async fn read_short_string(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut len = [0u8; 1];
    stream.read_exact(&mut len).await?;
    let mut value = vec![0u8; len[0] as usize];
    stream.read_exact(&mut value).await?;
    Ok(String::from_utf8_lossy(&value).into_owned())
}
