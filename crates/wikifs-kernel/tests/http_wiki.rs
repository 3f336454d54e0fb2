//! `HttpTransport` against a loopback wiki speaking just enough HTTP/1.1.

use parking_lot::Mutex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wikifs_kernel::remote::mock::edit_page_html;
use wikifs_kernel::remote::{HttpTransport, SiteClient, TransportOptions, login};
use wikifs_kernel::{Credentials, PathFs, Site, WikiTree};

const SESSION: &str = "wikidb_session=s1; wikidbUserName=Mathieu; wikidbUserID=42";

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    headers: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeWiki {
    pages: HashMap<String, String>,
    seen: Vec<Seen>,
}

type Shared = Arc<Mutex<FakeWiki>>;

async fn serve(wiki: Shared) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let wiki = wiki.clone();
            tokio::spawn(async move {
                let _ = handle(stream, wiki).await;
            });
        }
    });
    port
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn pairs(encoded: &str) -> HashMap<String, String> {
    Url::parse(&format!("http://wiki.invalid/?{encoded}"))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

async fn handle(mut stream: TcpStream, wiki: Shared) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    let seen = Seen {
        method,
        query: pairs(target.split_once('?').map(|(_, q)| q).unwrap_or_default()),
        form: pairs(&body),
        headers,
    };
    let response = respond(&wiki, &seen);
    wiki.lock().seen.push(seen);

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn respond(wiki: &Shared, seen: &Seen) -> String {
    let title = seen.query.get("title").cloned().unwrap_or_default();
    match (seen.method.as_str(), seen.query.get("action").map(String::as_str)) {
        ("GET", Some("edit")) => {
            let source = wiki.lock().pages.get(&title).cloned().unwrap_or_default();
            http_response(
                "200 OK",
                &[],
                &edit_page_html(&source, "20240101000000", "20240101000001", "tok+\\"),
            )
        }
        ("POST", Some("submit")) if title == "Special:Userlogin" => http_response(
            "302 Found",
            &[
                "Set-Cookie: wikidb_session=s1; path=/; HttpOnly",
                "Set-Cookie: wikidbUserName=Mathieu; path=/",
                "Set-Cookie: wikidbUserID=42; path=/",
                "Set-Cookie: wikidbToken=t0k; path=/",
                "Location: /w/index.php?title=Special:Userlogin&action=done",
            ],
            "",
        ),
        ("POST", Some("submit")) => {
            let body = seen.form.get("wpTextbox1").cloned().unwrap_or_default();
            wiki.lock().pages.insert(title.clone(), body);
            http_response(
                "302 Found",
                &[&format!("Location: /w/index.php?title={title}")],
                "",
            )
        }
        _ => http_response("404 Not Found", &[], ""),
    }
}

fn http_response(status: &str, headers: &[&str], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for header in headers {
        out.push_str(header);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn options() -> TransportOptions {
    TransportOptions {
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        proxy: None,
    }
}

#[tokio::test]
async fn test_login_over_http() {
    let wiki = Shared::default();
    let port = serve(wiki.clone()).await;

    let site = Site::new("wiki", "127.0.0.1", "/w/index.php")
        .with_port(port)
        .with_login(Credentials::new("Mathieu", "s3cret & more"))
        .with_basic_auth(Credentials::new("gate", "keeper"));
    let transport = HttpTransport::new(&site, &options()).unwrap();
    assert_eq!(
        transport.endpoint().as_str(),
        format!("http://127.0.0.1:{port}/w/index.php")
    );

    let cookie = login(&site, &transport).await;
    assert_eq!(cookie.as_deref(), Some(SESSION));

    // The redirect is not followed.
    let seen = wiki.lock().seen.clone();
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.query["title"], "Special:Userlogin");
    assert_eq!(request.query["returnto"], "Special:Userlogin");
    assert_eq!(request.form["wpName"], "Mathieu");
    assert_eq!(request.form["wpPassword"], "s3cret & more");
    assert_eq!(request.form["wpRemember"], "1");
    assert!(request.headers["authorization"].starts_with("Basic "));
    assert!(request.headers["user-agent"].starts_with("wikifs/"));
}

#[tokio::test]
async fn test_edit_round_trip_over_http() {
    let wiki = Shared::default();
    wiki.lock()
        .pages
        .insert("Japon".into(), "Tokyo & <Kyoto>".into());
    let port = serve(wiki.clone()).await;

    let site = Site::new("wiki", "127.0.0.1", "/w/index.php")
        .with_port(port)
        .with_cookie(Some(SESSION.to_string()));
    let transport = Arc::new(HttpTransport::new(&site, &options()).unwrap());
    let tree = WikiTree::new(
        Default::default(),
        [Arc::new(SiteClient::new(site, transport, Duration::from_secs(300)))],
    );

    assert!(tree.is_file("/wiki/Japon.mw").await);
    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Tokyo & <Kyoto>");

    tree.write("/wiki/Japon.mw", "Nara + Osaka\n").await.unwrap();
    assert_eq!(wiki.lock().pages["Japon"], "Nara + Osaka\n");
    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Nara + Osaka");

    let seen = wiki.lock().seen.clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|r| r.headers.get("cookie").map(String::as_str) == Some(SESSION)));

    let submit = &seen[1];
    assert_eq!(submit.method, "POST");
    assert_eq!(submit.query["action"], "submit");
    assert_eq!(submit.form["wpEdittime"], "20240101000000");
    assert_eq!(submit.form["wpStarttime"], "20240101000001");
    assert_eq!(submit.form["wpEditToken"], "tok+\\");
    assert_eq!(submit.form["wpSummary"], " ");
    assert_eq!(submit.form["wpSave"], "1");
}

#[tokio::test]
async fn test_missing_document_over_http() {
    let wiki = Shared::default();
    let port = serve(wiki.clone()).await;

    let site = Site::new("wiki", "127.0.0.1", "/w/index.php").with_port(port);
    let transport = Arc::new(HttpTransport::new(&site, &options()).unwrap());
    let tree = WikiTree::new(
        Default::default(),
        [Arc::new(SiteClient::new(site, transport, Duration::from_secs(300)))],
    );

    assert!(!tree.is_file("/wiki/Nulle.mw").await);
    assert!(tree.list("/wiki").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_wiki_is_an_error() {
    // Grab a free port, then close it.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let site = Site::new("wiki", "127.0.0.1", "/w/index.php").with_port(port);
    let transport = Arc::new(HttpTransport::new(&site, &options()).unwrap());
    let tree = WikiTree::new(
        Default::default(),
        [Arc::new(SiteClient::new(site, transport, Duration::from_secs(300)))],
    );

    assert!(tree.read("/wiki/Japon.mw").await.is_err());
}
