//! Mock-server tests for the RESTCONF client, subscriber, and dispatcher.
//!
//! wiremock simulates the RESTCONF server and webhook targets. The
//! cancellation test uses a raw TCP fixture instead, because it needs a
//! connection that stays open after delivering an event.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yanghook_core::{
    Encoding, Error, Filter, ServerUrl, Stream, StreamList, Webhook, error::DecodeError,
};
use yanghook_restconf::{
    ClientOptions, Handler, HandlerRegistry, RestconfClient, Subscriber, SubscriberSet,
    attach_webhooks, dispatch,
};

fn server_url(server: &MockServer) -> ServerUrl {
    ServerUrl::new(server.uri()).unwrap()
}

fn client(server: &MockServer) -> RestconfClient {
    RestconfClient::new(server_url(server), ClientOptions::default()).unwrap()
}

const HOST_META: &str = r#"<XRD xmlns="http://docs.oasis-open.org/ns/xri/xrd-1.0">
  <Link rel="restconf" href="/restconf"/>
</XRD>"#;

fn streams_body(base: &str) -> String {
    format!(
        r#"<streams xmlns="urn:ietf:params:xml:ns:yang:ietf-restconf-monitoring">
  <stream>
    <name>NETCONF</name>
    <description>default NETCONF event stream</description>
    <replay-support>false</replay-support>
    <access>
      <encoding>xml</encoding>
      <location>{base}/restconf/streams/NETCONF/xml</location>
    </access>
    <access>
      <encoding>json</encoding>
      <location>{base}/restconf/streams/NETCONF/json</location>
    </access>
  </stream>
  <stream>
    <name>ncs-events</name>
    <description>NCS events</description>
    <replay-support>true</replay-support>
    <access>
      <encoding>xml</encoding>
      <location>{base}/restconf/streams/ncs-events/xml</location>
    </access>
  </stream>
</streams>"#
    )
}

// ============================================================================
// Discovery and inventory
// ============================================================================

#[tokio::test]
async fn test_discover_root() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/host-meta"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(HOST_META, "application/xrd+xml"),
        )
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.discover_root().await.unwrap();
    assert_eq!(client.root(), "/restconf");
}

#[tokio::test]
async fn test_discover_root_rejects_html() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/host-meta"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>login</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let mut client = client(&server);
    let err = client.discover_root().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_stream_list_parses_and_rebases() {
    let server = MockServer::start().await;

    // Locations advertise localhost; they must be rebased onto the server
    Mock::given(method("GET"))
        .and(path(
            "/restconf/data/ietf-restconf-monitoring:restconf-state/streams",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            streams_body("http://localhost:8080"),
            "application/yang-data+xml",
        ))
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_root("/restconf");
    let list = client.stream_list().await.unwrap();

    assert_eq!(list.count(), 2);
    let netconf = &list.streams[0];
    assert_eq!(netconf.name, "NETCONF");
    assert!(!netconf.replay_support);
    assert_eq!(netconf.access.len(), 2);
    assert_eq!(netconf.access[0].encoding, Encoding::Xml);
    assert!(
        netconf.access[0]
            .location
            .as_str()
            .starts_with(&server.uri())
    );

    let ncs = &list.streams[1];
    assert!(ncs.replay_support);
    assert_eq!(ncs.xml_access().count(), 1);
}

#[tokio::test]
async fn test_server_state_fetch() {
    let server = MockServer::start().await;

    let body = r#"<ncs-state xmlns="http://tail-f.com/yang/ncs-monitoring">
  <version>5.4.1</version>
  <loaded-data-models>
    <data-model><name>tailf-ncs</name><prefix>ncs</prefix></data-model>
  </loaded-data-models>
  <internal>
    <cdb>
      <datastore><name>running</name><filename>/cdb/A.cdb</filename></datastore>
    </cdb>
  </internal>
</ncs-state>"#;
    Mock::given(method("GET"))
        .and(path("/restconf/data/tailf-ncs-monitoring:ncs-state"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/yang-data+xml"))
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_root("/restconf");
    let state = client.server_state().await.unwrap();
    assert_eq!(state.version, "5.4.1");
    assert_eq!(state.models.len(), 1);
    assert_eq!(state.models[0].prefix, "ncs");
    assert_eq!(state.datastores.len(), 1);
    assert_eq!(state.datastores[0].name, "running");
}

// ============================================================================
// Subscriber lifecycle
// ============================================================================

fn subscriber_for(server_uri: &str, name: &str, handler: Handler, hooks: Vec<Webhook>) -> Subscriber {
    let mut stream = Stream {
        name: name.to_string(),
        ..Default::default()
    };
    let mut list = StreamList {
        streams: vec![stream.clone()],
    };
    attach_webhooks(&mut list, hooks);
    stream = list.streams.remove(0);

    Subscriber {
        stream: Arc::new(stream),
        access: Url::parse(&format!("{}/restconf/streams/{}/xml", server_uri, name)).unwrap(),
        handler,
    }
}

const SESSION_START: &str = "<notification xmlns=\"urn:ietf:params:xml:ns:netconf:notification:1.0\">\n\
<eventTime>2021-01-01T00:00:00+00:00</eventTime>\n\
<netconf-session-start xmlns=\"urn:ietf:params:xml:ns:yang:ietf-netconf-notifications\">\n\
<username>admin</username><session-id>31</session-id><source-host>10.0.0.9</source-host>\n\
</netconf-session-start>\n\
</notification>\n";

const CONFIG_CHANGE: &str = "<notification xmlns=\"urn:ietf:params:xml:ns:netconf:notification:1.0\">\n\
<eventTime>2021-01-01T00:00:05+00:00</eventTime>\n\
<netconf-config-change xmlns=\"urn:ietf:params:xml:ns:yang:ietf-netconf-notifications\">\n\
<changed-by><username>admin</username><source-host>10.0.0.9</source-host></changed-by>\n\
<datastore>running</datastore>\n\
<edit><target>/ncs:devices/ncs:device[ncs:name='ce0']/config</target><operation>merge</operation></edit>\n\
</netconf-config-change>\n\
</notification>\n";

#[tokio::test]
async fn test_subscriber_reports_count_and_error_on_stream_end() {
    let server = MockServer::start().await;

    let body = format!("{}{}", SESSION_START, CONFIG_CHANGE);
    Mock::given(method("GET"))
        .and(path("/restconf/streams/NETCONF/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let subscriber = subscriber_for(&server.uri(), "NETCONF", Handler::ConfigChange, vec![]);
    let (_cancel_tx, cancel) = broadcast::channel(1);

    let (events, result) = subscriber.run(client(&server), cancel).await;
    assert_eq!(events, 2);
    match result {
        Err(Error::Decode(DecodeError::ChannelClosed)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_subscriber_connect_failure_is_immediate() {
    // Bind then drop to find a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let uri = format!("http://127.0.0.1:{}", port);
    let subscriber = subscriber_for(&uri, "NETCONF", Handler::ConfigChange, vec![]);
    let restconf =
        RestconfClient::new(ServerUrl::new(&uri).unwrap(), ClientOptions::default()).unwrap();
    let (_cancel_tx, cancel) = broadcast::channel(1);

    let (events, result) = subscriber.run(restconf, cancel).await;
    assert_eq!(events, 0);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_subscriber_cancellation_is_clean() {
    // Raw SSE fixture: serve one chunked event, then hold the
    // connection open until the client goes away.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let event: String = SESSION_START
            .lines()
            .map(|line| format!("data: {}\n", line))
            .collect::<String>()
            + "\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
            event.len(),
            event
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let uri = format!("http://127.0.0.1:{}", port);
    let subscriber = subscriber_for(&uri, "NETCONF", Handler::ConfigChange, vec![]);
    let restconf =
        RestconfClient::new(ServerUrl::new(&uri).unwrap(), ClientOptions::default()).unwrap();

    let (cancel_tx, cancel) = broadcast::channel(1);
    let task = tokio::spawn(subscriber.run(restconf, cancel));

    // Let the event arrive before cancelling
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel_tx.send(()).unwrap();

    let (events, result) = task.await.unwrap();
    assert_eq!(events, 1);
    assert!(result.is_ok());
}

// ============================================================================
// Webhook dispatch
// ============================================================================

fn hook(url: &str, token: Option<&str>, filter: Option<Filter>) -> Webhook {
    let mut hook = Webhook {
        stream: "NETCONF".to_string(),
        url: url.to_string(),
        token: token.map(str::to_string),
        disable: false,
        filter,
        target: None,
    };
    hook.validate().unwrap();
    hook
}

#[tokio::test]
async fn test_fire_posts_json_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .and(header("token", "secret"))
        .and(body_string_contains("netconf-session-start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobs": { "deploy": { "triggered": true } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hook = hook(&format!("{}/hook", server.uri()), Some("secret"), None);
    let body = serde_json::to_vec(&serde_json::json!({
        "stream": "NETCONF",
        "eventname": "netconf-session-start",
        "event": "<event><x/></event>"
    }))
    .unwrap();

    let http = reqwest::Client::new();
    dispatch::fire(&http, &hook, "NETCONF", body, Duration::from_secs(3)).await;
}

#[tokio::test]
async fn test_fire_handles_not_found_and_garbage_responses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such pipeline"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    for path in ["missing", "garbage"] {
        let hook = hook(&format!("{}/{}", server.uri(), path), None, None);
        dispatch::fire(&http, &hook, "NETCONF", b"{}".to_vec(), Duration::from_secs(3)).await;
    }
}

// ============================================================================
// End-to-end: subscribe, classify, filter, fire
// ============================================================================

#[tokio::test]
async fn test_pipeline_fires_only_matching_webhooks() {
    let stream_server = MockServer::start().await;
    let hook_server = MockServer::start().await;

    let body = format!("{}{}", SESSION_START, CONFIG_CHANGE);
    Mock::given(method("GET"))
        .and(path("/restconf/streams/NETCONF/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&stream_server)
        .await;

    // Only the config-change event may trigger this hook
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("netconf-config-change"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hook_server)
        .await;

    let filter = Filter {
        event: Some("netconf-config-change".to_string()),
        nodes: vec![],
    };
    let hooks = vec![Webhook {
        stream: "NETCONF".to_string(),
        url: format!("{}/hook", hook_server.uri()),
        token: None,
        disable: false,
        filter: Some(filter),
        target: None,
    }];

    let subscriber = subscriber_for(
        &stream_server.uri(),
        "NETCONF",
        Handler::ConfigChange,
        hooks,
    );
    let (_cancel_tx, cancel) = broadcast::channel(1);
    let (events, _) = subscriber.run(client(&stream_server), cancel).await;
    assert_eq!(events, 2);

    // Fires are fire-and-forget; give them a moment before verification
    tokio::time::sleep(Duration::from_millis(500)).await;
}

// ============================================================================
// Manager end-to-end
// ============================================================================

#[tokio::test]
async fn test_manager_runs_all_subscribers_to_completion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/restconf/data/ietf-restconf-monitoring:restconf-state/streams",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            streams_body(&server.uri()),
            "application/yang-data+xml",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restconf/streams/NETCONF/xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SESSION_START, "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restconf/streams/ncs-events/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/event-stream"))
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_root("/restconf");
    let list = client.stream_list().await.unwrap();

    let set = SubscriberSet::build(&[], list, &HandlerRegistry::default()).unwrap();
    assert_eq!(set.len(), 2);

    // Both stream bodies end, so the overall wait completes on its own
    set.run(&client).await;
}
