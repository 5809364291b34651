// Integration tests for the sourcekit runtime
//
// These drive complete workflows over the in-memory host: building
// capability kits, config self-healing, fallback selection, record
// assembly with keyword filtering, and user-facing failure reporting.

use std::rc::Rc;

use serde_json::json;
use sourcekit::{
    ConfigDocument, ExtractRequest, ExtractionKit, Kit, KitBuilder, MemoryHost, Record,
};

const LISTING_PAGE: &str = r#"
<html>
  <body>
    <ul class="shelf">
      <li class="entry">
        <img class="cover" src="/covers/1.jpg">
        <span class="title">Iron Crown</span>
        <span class="author">A. North</span>
        <span class="genre">fantasy</span>
        <span class="chapters">412 chapters</span>
        <span class="updated">Chapter 412: The Pass</span>
        <p class="blurb">A smith inherits a broken kingdom.</p>
        <a class="more" href="/book/1">details</a>
      </li>
      <li class="entry">
        <img class="cover" src="/covers/2.jpg">
        <span class="title">Advertising Harbor</span>
        <span class="author">B. South</span>
        <span class="genre">slice of life</span>
        <span class="chapters">88 chapters</span>
        <span class="updated">Chapter 88: Closing Time</span>
        <p class="blurb">Dockside storefronts and their keepers.</p>
        <a class="more" href="http://mirror.example/book/2">details</a>
      </li>
      <li class="entry">
        <img class="cover" src="/covers/3.jpg">
        <span class="title">Paper Oracle</span>
        <span class="author">C. West</span>
        <span class="genre">mystery</span>
        <span class="chapters">203 chapters</span>
        <span class="updated">Chapter 203: Inkfall</span>
        <p class="blurb">A librarian reads futures in margins.</p>
        <a class="more" href="/book/3">details</a>
      </li>
    </ul>
  </body>
</html>
"#;

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn shelf_host() -> Rc<MemoryHost> {
    let host = Rc::new(MemoryHost::with_tag("demo shelf"));
    host.set_base_url("http://shelf.example/");
    host.add_response("http://shelf.example/latest", LISTING_PAGE);
    host
}

fn shelf_defaults() -> ConfigDocument {
    ConfigDocument {
        base_url: "http://shelf.example/".to_string(),
        ..ConfigDocument::default()
    }
}

fn extraction_kit(host: Rc<MemoryHost>, defaults: ConfigDocument) -> ExtractionKit<MemoryHost> {
    let kit = KitBuilder::new(host)
        .defaults(defaults)
        .build(Some("extraction"))
        .expect("extraction kit should build");
    match kit {
        Kit::Extraction(kit) => kit,
        _ => panic!("expected the extraction level"),
    }
}

fn listing_request() -> ExtractRequest<sourcekit::HtmlContent> {
    ExtractRequest {
        listing_url: Some("http://shelf.example/latest".to_string()),
        record_selectors: vec![".no-such-list".to_string(), "li.entry".to_string()],
        name_selectors: vec![".headline".to_string(), ".title".to_string()],
        author_selectors: vec![".author".to_string()],
        category_selectors: vec![".genre".to_string()],
        length_selectors: vec![".chapters".to_string()],
        latest_entry_selectors: vec![".updated".to_string()],
        summary_selectors: vec![".blurb".to_string()],
        cover_url_selectors: vec!["img.cover@src".to_string()],
        detail_url_selectors: vec!["a.more@href".to_string()],
        ..ExtractRequest::default()
    }
}

#[test]
fn test_full_listing_extraction() -> anyhow::Result<()> {
    init_tracing();
    let host = shelf_host();
    let kit = extraction_kit(host.clone(), shelf_defaults());

    let records = kit.extract_records(listing_request())?;

    assert_eq!(records.len(), 3);
    let first = &records[0];
    assert_eq!(first.name, "Iron Crown");
    assert_eq!(first.author, "A. North");
    assert_eq!(first.category, "fantasy");
    assert_eq!(first.length, "412 chapters");
    assert_eq!(first.latest_entry, "Chapter 412: The Pass");
    assert_eq!(first.summary, "A smith inherits a broken kingdom.");
    assert_eq!(first.cover_url, "/covers/1.jpg");
    assert_eq!(first.detail_url, "/book/1");

    // the fetch attempt was logged with the resolved URL
    assert!(
        host.logs()
            .iter()
            .any(|line| line.contains("requesting http://shelf.example/latest"))
    );
    Ok(())
}

#[test]
fn test_keyword_filter_is_config_driven() -> anyhow::Result<()> {
    init_tracing();
    let host = shelf_host();
    let kit = extraction_kit(host, shelf_defaults());

    // the filter list lives in the shared store and is read live
    kit.general()
        .set_keyword_filter_list(&["advertis".to_string()])?;
    let records = kit.extract_records(listing_request())?;

    let names: Vec<&str> = records.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, vec!["Iron Crown", "Paper Oracle"]);

    // disabling the flag restores the full list without reconfiguring
    kit.general().set_filter_enabled(false)?;
    assert_eq!(kit.extract_records(listing_request())?.len(), 3);
    Ok(())
}

#[test]
fn test_config_self_heals_and_survives_external_writers() -> anyhow::Result<()> {
    init_tracing();
    let host = shelf_host();
    host.seed_store("][ definitely not json");
    let kit = extraction_kit(host.clone(), shelf_defaults());

    // corrupt data silently resets to the declared defaults
    assert_eq!(kit.general().base_url(), "http://shelf.example/");
    assert!(
        host.logs()
            .contains(&"config store reset to defaults".to_string())
    );

    // an external writer replaces the document between reads
    let mut edited = kit.general().read_config();
    edited.session_id = 77;
    host.seed_store(serde_json::to_string(&edited)?);
    assert_eq!(kit.general().session_id(), 77);
    Ok(())
}

#[test]
fn test_exhausted_selectors_reach_the_user() {
    init_tracing();
    let host = shelf_host();
    let kit = extraction_kit(host.clone(), shelf_defaults());

    let mut request = listing_request();
    request.record_selectors = vec![".gone".to_string(), ".also-gone".to_string()];

    let err = kit.extract_records(request).unwrap_err();
    assert_eq!(err.kind(), "WrappedError");

    // the diagnostic browser launch happened before the failure
    assert_eq!(
        host.opened_pages(),
        vec![("http://shelf.example/".to_string(), "demo shelf".to_string())]
    );

    // the terminal boundary long-toasted the flattened chain
    let report = host.long_toasts().pop().expect("a report was emitted");
    assert!(report.contains("EmptySelectionError"));
    assert!(report.contains("http://shelf.example/"));
    assert!(report.contains("<= "));
}

#[test]
fn test_manual_check_disabled_still_fails_cleanly() {
    init_tracing();
    let host = shelf_host();
    let defaults = ConfigDocument {
        manual_check_enabled: false,
        ..shelf_defaults()
    };
    let kit = extraction_kit(host.clone(), defaults);

    let mut request = listing_request();
    request.record_selectors = vec![".gone".to_string()];

    assert!(kit.extract_records(request).is_err());
    assert!(host.opened_pages().is_empty());
}

#[test]
fn test_session_flow_over_the_shared_store() -> anyhow::Result<()> {
    init_tracing();
    let host = shelf_host();
    host.set_form_value("username", "reader42");

    let kit = KitBuilder::new(host.clone())
        .defaults(shelf_defaults())
        .login_fields(vec!["username".to_string(), "password".to_string()])
        .build(Some("session"))?;
    let Kit::Session(session) = kit else {
        panic!("expected the session level");
    };

    // live form value, then persisted credential
    let typed = session.current_login_input("username")?;
    assert_eq!(typed, "reader42");
    session.set_login_field("username", json!(typed))?;
    assert_eq!(session.login_field("username")?, json!("reader42"));

    // an extraction kit over the same host sees the same document
    let extraction = extraction_kit(host, shelf_defaults());
    assert_eq!(
        extraction.general().session_field("username").unwrap_err().kind(),
        "ValidationError"
    );
    Ok(())
}

#[test]
fn test_records_serialize_with_the_persisted_field_names() -> anyhow::Result<()> {
    let record = Record {
        name: "Iron Crown".to_string(),
        detail_url: "/book/1".to_string(),
        ..Record::default()
    };
    let serialized = serde_json::to_string(&record)?;
    assert!(serialized.contains("\"detailUrl\":\"/book/1\""));
    assert!(serialized.contains("\"latestEntry\":\"\""));
    Ok(())
}
