//! Integration tests for the scan loop
//!
//! These tests use wiremock to create mock HTTP servers and run full scan
//! cycles end-to-end against them, with every pacing pause disabled.

use immo_scout::config::{CategoryEntry, Config, DelayWindow, PacingConfig};
use immo_scout::output::PauseTarget;
use immo_scout::{ListingKind, Region, ScanEvent, ScanHandle, ScanScheduler};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_DETAIL: &str = r#"<html><body>
    <div data-testid="ad-detail-ad-title"><h1>Sonnige 3-Zimmer Wohnung</h1></div>
    <div data-testid="ad-detail-ad-price"><span>€ 300.000</span></div>
    <div data-testid="ad-detail-ad-properties">Zimmer 3, Wohnfläche ca. 75 m²</div>
    <div data-testid="ad-detail-ad-location">1020 Wien, Leopoldstadt</div>
    <div data-testid="ad-detail-ad-description"><p>Privatverkauf direkt vom Eigentümer.</p></div>
    <p>Telefon: 0664 1234567</p>
</body></html>"#;

const AGENT_DETAIL: &str = r#"<html><body>
    <div data-testid="ad-detail-ad-title"><h1>Exklusive Dachgeschosswohnung</h1></div>
    <div data-testid="ad-detail-ad-price"><span>€ 890.000</span></div>
    <div data-testid="ad-detail-ad-description"><p>Ihr Immobilienbüro, Provision 3% zzgl. USt.</p></div>
</body></html>"#;

/// Creates a test configuration with one category served by the mock server
fn create_test_config(server: &MockServer, category: &str) -> Config {
    let mut config = Config::default();
    config.site.origin = server.uri();
    config.site.detail_referer = None;
    config.pacing = PacingConfig::immediate();
    config.scanner.pages_per_category = 1;
    config.categories = vec![category_entry(server, category)];
    config
}

fn category_entry(server: &MockServer, name: &str) -> CategoryEntry {
    CategoryEntry {
        name: name.to_string(),
        search_url: format!("{}/search/{}?rows=25", server.uri(), name),
    }
}

fn search_page(ids: &[&str]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<div class="result-item"><a href="/iad/immobilien/d/{}">{}</a></div>"#, id, id))
        .collect();
    format!("<html><body>{}</body></html>", links)
}

async fn mount_search(server: &MockServer, category: &str, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/search/{}", category)))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/iad/immobilien/d/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Runs the loop until the first cycle completes and returns every event
async fn run_one_cycle(scheduler: &ScanScheduler) -> Vec<ScanEvent> {
    let handle: ScanHandle = scheduler.handle();
    let events = Mutex::new(Vec::new());
    let reporter = |event: &ScanEvent| {
        if matches!(event, ScanEvent::CycleComplete { .. }) {
            handle.stop();
        }
        events.lock().unwrap().push(event.clone());
    };

    scheduler.start(&reporter).await.expect("scan loop should start");
    events.into_inner().unwrap()
}

#[tokio::test]
async fn test_full_cycle_keeps_only_private_listings() {
    // Start a mock server
    let server = MockServer::start().await;

    mount_search(&server, "eigentumswohnung-wien", "1", search_page(&["privat-1", "makler-2"])).await;
    mount_detail(&server, "privat-1", PRIVATE_DETAIL).await;
    mount_detail(&server, "makler-2", AGENT_DETAIL).await;

    let scheduler = ScanScheduler::new(create_test_config(&server, "eigentumswohnung-wien"))
        .expect("Failed to create scheduler");
    let events = run_one_cycle(&scheduler).await;

    // Only the private offer is kept
    let listings = scheduler.recent(10);
    assert_eq!(listings.len(), 1);

    let listing = &listings[0];
    assert_eq!(listing.title, "Sonnige 3-Zimmer Wohnung");
    assert_eq!(listing.price, 300_000);
    assert_eq!(listing.area, 75);
    assert_eq!(listing.price_per_area, 4000);
    assert_eq!(listing.location, "1020 Wien, Leopoldstadt");
    assert_eq!(listing.phone_number.as_deref(), Some("06641234567"));
    assert_eq!(listing.kind, ListingKind::Apartment);
    assert_eq!(listing.region, Region::Vienna);
    assert_eq!(
        listing.url.as_str(),
        format!("{}/iad/immobilien/d/privat-1", server.uri())
    );

    // Run state reflects one finished cycle
    let status = scheduler.status();
    assert!(!status.is_running);
    assert_eq!(status.current_cycle, 1);
    assert_eq!(status.total_found, 1);

    assert!(events.contains(&ScanEvent::PageScanned {
        category: "eigentumswohnung-wien".to_string(),
        page: 1,
        listings: 1,
    }));
    assert!(events.contains(&ScanEvent::CycleComplete { cycle: 1, listings: 1 }));
    assert_eq!(events.last(), Some(&ScanEvent::Stopped { cycles: 1 }));
    assert!(!events.iter().any(|e| e.is_error()));
}

#[tokio::test]
async fn test_server_error_on_first_page_continues_with_second() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/grundstueck-wien"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_search(&server, "grundstueck-wien", "2", search_page(&["grund-7"])).await;
    mount_detail(&server, "grund-7", PRIVATE_DETAIL).await;

    let mut config = create_test_config(&server, "grundstueck-wien");
    config.scanner.pages_per_category = 2;
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");
    let events = run_one_cycle(&scheduler).await;

    // Exactly one error, for page 1
    let errors: Vec<_> = events.iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        ScanEvent::FetchFailed { reason, .. } if reason == "HTTP 500"
    ));

    // Page 2 was still scanned
    assert!(events.contains(&ScanEvent::PageScanned {
        category: "grundstueck-wien".to_string(),
        page: 2,
        listings: 1,
    }));

    let listings = scheduler.recent(10);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].kind, ListingKind::Land);
}

#[tokio::test]
async fn test_rate_limit_backs_off() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/grundstueck-niederoesterreich"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "grundstueck-niederoesterreich");
    config.pacing.rate_limit_backoff_secs = 1;
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");

    let started = Instant::now();
    let events = run_one_cycle(&scheduler).await;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::RateLimited { backoff, .. } if *backoff == Duration::from_secs(1)
    )));
    assert!(events.contains(&ScanEvent::PageScanned {
        category: "grundstueck-niederoesterreich".to_string(),
        page: 1,
        listings: 0,
    }));
    assert!(scheduler.recent(10).is_empty());
}

#[tokio::test]
async fn test_duplicate_links_visited_once() {
    let server = MockServer::start().await;

    mount_search(
        &server,
        "eigentumswohnung-wien",
        "1",
        format!(
            r#"<html><body>
            <a href="/iad/immobilien/d/AAA">A</a>
            <a href="/iad/immobilien/d/AAA?x=1">A again</a>
            <a href="{}/iad/immobilien/d/AAA/">A absolute</a>
            </body></html>"#,
            server.uri()
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/iad/immobilien/d/AAA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRIVATE_DETAIL))
        .expect(1)
        .mount(&server)
        .await;

    let scheduler = ScanScheduler::new(create_test_config(&server, "eigentumswohnung-wien"))
        .expect("Failed to create scheduler");
    run_one_cycle(&scheduler).await;

    assert_eq!(scheduler.status().total_found, 1);
}

#[tokio::test]
async fn test_detail_requests_carry_referer() {
    let server = MockServer::start().await;
    let referer = format!("{}/iad/immobilien/", server.uri());

    mount_search(&server, "grundstueck-wien", "1", search_page(&["ref-1"])).await;
    Mock::given(method("GET"))
        .and(path("/iad/immobilien/d/ref-1"))
        .and(header("referer", referer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRIVATE_DETAIL))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "grundstueck-wien");
    config.site.detail_referer = Some(referer.clone());
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");
    run_one_cycle(&scheduler).await;

    assert_eq!(scheduler.recent(10).len(), 1);
}

#[tokio::test]
async fn test_every_category_scanned_each_cycle() {
    let server = MockServer::start().await;

    let names = [
        "eigentumswohnung-wien",
        "eigentumswohnung-niederoesterreich",
        "grundstueck-wien",
        "grundstueck-niederoesterreich",
    ];
    for name in names {
        mount_search(&server, name, "1", search_page(&[])).await;
    }

    let mut config = create_test_config(&server, names[0]);
    config.categories = names.iter().map(|n| category_entry(&server, n)).collect();
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");
    let events = run_one_cycle(&scheduler).await;

    let mut scanned: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::CategoryStarted { category } => Some(category.as_str()),
            _ => None,
        })
        .collect();
    scanned.sort_unstable();

    let mut expected = names.to_vec();
    expected.sort_unstable();
    assert_eq!(scanned, expected);

    let category_pauses = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Pause { target: PauseTarget::NextCategory, .. }))
        .count();
    assert_eq!(category_pauses, 4);
}

#[tokio::test]
async fn test_result_buffer_keeps_newest() {
    let server = MockServer::start().await;

    mount_search(&server, "grundstueck-wien", "1", search_page(&["p-1", "p-2", "p-3"])).await;
    for id in ["p-1", "p-2", "p-3"] {
        mount_detail(&server, id, PRIVATE_DETAIL).await;
    }

    let mut config = create_test_config(&server, "grundstueck-wien");
    config.scanner.result_capacity = 2;
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");
    run_one_cycle(&scheduler).await;

    let status = scheduler.status();
    assert_eq!(status.total_found, 3);
    assert_eq!(status.buffered, 2);

    // Oldest first; p-1 was evicted
    let kept: Vec<String> = scheduler
        .recent(10)
        .iter()
        .map(|l| l.url.path().to_string())
        .collect();
    assert_eq!(kept, vec!["/iad/immobilien/d/p-2", "/iad/immobilien/d/p-3"]);

    let latest = scheduler.recent(1);
    assert_eq!(latest[0].url.path(), "/iad/immobilien/d/p-3");
}

#[tokio::test]
async fn test_stop_interrupts_cycle_pause() {
    let server = MockServer::start().await;
    mount_search(&server, "grundstueck-wien", "1", search_page(&[])).await;

    let mut config = create_test_config(&server, "grundstueck-wien");
    config.pacing.cycle_delay = DelayWindow::new(600, 600);
    let scheduler = ScanScheduler::new(config).expect("Failed to create scheduler");
    let handle = scheduler.handle();

    let events = Mutex::new(Vec::new());
    let reporter = |event: &ScanEvent| events.lock().unwrap().push(event.clone());

    let control = async {
        // Wait until the loop sits in the long pause after cycle 1
        loop {
            let pausing = events.lock().unwrap().iter().any(|e| {
                matches!(e, ScanEvent::Pause { target: PauseTarget::NextCycle, .. })
            });
            if pausing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.status().is_running);
        handle.stop();
        assert!(!handle.status().is_running);
    };

    let started = Instant::now();
    let (result, ()) = tokio::join!(scheduler.start(&reporter), control);
    result.expect("scan loop should start");

    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(!scheduler.status().is_running);
    assert_eq!(
        events.into_inner().unwrap().last(),
        Some(&ScanEvent::Stopped { cycles: 1 })
    );
}
