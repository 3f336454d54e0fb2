//! Whole-tree behaviour over scripted wikis.

use std::sync::Arc;
use std::time::Duration;

use wikifs_kernel::remote::mock::MockTransport;
use wikifs_kernel::remote::{SiteClient, WikiResponse, login};
use wikifs_kernel::{Config, Credentials, FsError, PathFs, Site, WikiTree};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn client(site: Site, transport: &Arc<MockTransport>, ttl: Duration) -> Arc<SiteClient> {
    Arc::new(SiteClient::new(site, transport.clone(), ttl))
}

fn login_response() -> WikiResponse {
    WikiResponse::new(302, "")
        .with_set_cookie("wikidb_session=abc; path=/; HttpOnly")
        .with_set_cookie("wikidbUserName=Mathieu; path=/")
        .with_set_cookie("wikidbUserID=42; path=/")
        .with_set_cookie("wikidbToken=deadbeef; path=/")
}

#[tokio::test]
async fn test_sites_are_independent() {
    init_tracing();
    let fr = Arc::new(MockTransport::new().with_page("Japon", "Pays d'Asie"));
    let en = Arc::new(MockTransport::new().with_page("Japan", "Country in Asia"));
    let tree = WikiTree::new(
        Default::default(),
        [
            client(Site::new("wiki-fr", "fr.example.org", "/w/index.php"), &fr, Duration::from_secs(300)),
            client(Site::new("wiki-en", "en.example.org", "/w/index.php"), &en, Duration::from_secs(300)),
        ],
    );

    assert_eq!(tree.list("/").await.unwrap(), vec!["wiki-en", "wiki-fr"]);
    assert_eq!(tree.read("/wiki-fr/Japon.mw").await.unwrap(), "Pays d'Asie");
    assert!(!tree.is_file("/wiki-en/Japon.mw").await);
    assert_eq!(tree.read("/wiki-en/Japan.mw").await.unwrap(), "Country in Asia");

    assert_eq!(fr.fetch_count("Japon"), 1);
    assert_eq!(en.fetch_count("Japon"), 1);
    assert_eq!(fr.fetch_count("Japan"), 0);
}

#[tokio::test]
async fn test_login_cookie_rides_on_every_request() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
    transport.set_login_response(login_response());

    let site = Site::new("wiki", "wiki.example.org", "/w/index.php")
        .with_login(Credentials::new("Mathieu", "secret"));
    let cookie = login(&site, transport.as_ref()).await;
    assert!(cookie.is_some());
    let site = site.with_cookie(cookie);

    let tree = WikiTree::new(
        Default::default(),
        [client(site, &transport, Duration::from_secs(300))],
    );
    tree.read("/wiki/Japon.mw").await.unwrap();
    tree.write("/wiki/Japon.mw", "Kyoto").await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests[1..] {
        assert_eq!(
            request.cookie.as_deref(),
            Some("wikidb_session=abc; wikidbUserName=Mathieu; wikidbUserID=42")
        );
    }
}

#[tokio::test]
async fn test_failed_login_keeps_mount_anonymous() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
    let site = Site::new("wiki", "wiki.example.org", "/w/index.php")
        .with_login(Credentials::new("Mathieu", "wrong"));

    let cookie = login(&site, transport.as_ref()).await;
    assert!(cookie.is_none());

    let tree = WikiTree::new(
        Default::default(),
        [client(site.with_cookie(cookie), &transport, Duration::from_secs(300))],
    );
    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Tokyo");
    assert!(transport.requests().last().unwrap().cookie.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_tree_reads_follow_cache_ttl() {
    let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
    let tree = WikiTree::new(
        Default::default(),
        [client(
            Site::new("wiki", "wiki.example.org", "/w/index.php"),
            &transport,
            Duration::from_secs(30),
        )],
    );

    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Tokyo");
    transport.set_page("Japon", "Kyoto");

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(tree.size("/wiki/Japon.mw").await.unwrap(), 5);
    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Tokyo");

    tokio::time::advance(Duration::from_secs(20)).await;
    assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Kyoto");
    assert_eq!(transport.fetch_count("Japon"), 2);
}

#[tokio::test]
async fn test_editor_save_sequence() {
    init_tracing();
    let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
    let tree = WikiTree::new(
        Default::default(),
        [client(
            Site::new("wiki", "wiki.example.org", "/w/index.php"),
            &transport,
            Duration::from_secs(300),
        )],
    );

    // What vim does on `:w` with backups enabled.
    assert!(tree.is_file("/wiki/Japon.mw").await);
    tree.write("/wiki/.Japon.mw.swp", "b0VIM 9.0").await.unwrap();
    let original = tree.read("/wiki/Japon.mw").await.unwrap();
    tree.write("/wiki/Japon.mw~", &original).await.unwrap();
    tree.write("/wiki/Japon.mw", "Tokyo, capitale").await.unwrap();
    tree.delete("/wiki/Japon.mw~").await.unwrap();
    tree.delete("/wiki/.Japon.mw.swp").await.unwrap();

    assert_eq!(tree.list("/wiki").await.unwrap(), vec!["Japon.mw"]);
    assert_eq!(transport.page("Japon").as_deref(), Some("Tokyo, capitale"));
    assert_eq!(transport.submit_count("Japon"), 1);
    assert!(matches!(
        tree.write("/wiki/4913", "x").await,
        Err(FsError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_tree_from_config() {
    let config = Config::parse(
        r#"
        [general]
        document-suffix = ".wiki"

        [[sites]]
        dirname = "local"
        host = "localhost"
        basename = "/index.php"
        cookie = "session=preset"
        "#,
    )
    .unwrap();
    let transport = Arc::new(MockTransport::new().with_page("Accueil", "Bienvenue"));

    let clients = config
        .sites
        .iter()
        .map(|site| client(site.to_site(), &transport, config.general.cache_ttl()));
    let tree = WikiTree::new(config.general.name_policy(), clients);

    assert!(!tree.is_file("/local/Accueil.mw").await);
    assert_eq!(tree.read("/local/Accueil.wiki").await.unwrap(), "Bienvenue");
    assert_eq!(
        transport.requests()[0].cookie.as_deref(),
        Some("session=preset")
    );
}
