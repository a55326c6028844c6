use requester::{Builder, Cookie, ProxySettings};

#[test]
fn test_version() {
    assert!(!requester::VERSION.is_empty());
}

#[test]
fn test_logging_init_is_repeatable() {
    requester::logging::init();
    requester::logging::init();
    log::info!("logging initialised twice");
}

#[test]
fn test_builder_round_trip() {
    let requester = Builder::new()
        .with_default_header("User-Agent", "requester-tests")
        .with_cookie(Cookie::new("example.com", "sid", "abc123"))
        .with_proxy(ProxySettings::new("proxy.local", 8080))
        .build();

    assert!(requester.has_cookie("https://example.com/", "sid"));
    assert_eq!(
        requester.proxy().map(|p| p.url()),
        Some("http://proxy.local:8080".to_string())
    );
}
