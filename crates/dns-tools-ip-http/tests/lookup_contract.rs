//! Contract Test: HTTP address lookup
//!
//! Runs the source against a local mock server.

use dns_tools_core::ErrorKind;
use dns_tools_core::traits::AddressSource;
use dns_tools_ip_http::{HttpAddressSource, IpVersion};
use std::net::IpAddr;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_answering(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

fn source(server: &MockServer, version: IpVersion) -> HttpAddressSource {
    HttpAddressSource::new(format!("{}/ip", server.uri()), version).expect("valid url")
}

#[tokio::test]
async fn plain_text_answer_is_parsed() {
    let server = server_answering(ResponseTemplate::new(200).set_body_string("203.0.113.7\n")).await;

    let ip = source(&server, IpVersion::V4).current().await.expect("lookup succeeds");
    assert_eq!(ip, IpAddr::from([203, 0, 113, 7]));
}

#[tokio::test]
async fn every_call_hits_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7"))
        .expect(2)
        .mount(&server)
        .await;

    let source = source(&server, IpVersion::V4);
    source.current().await.expect("first lookup");
    source.current().await.expect("second lookup");
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = server_answering(ResponseTemplate::new(503)).await;

    let err = source(&server, IpVersion::V4)
        .current()
        .await
        .expect_err("503 is a failed lookup");
    assert_eq!(err.kind(), ErrorKind::TransientLookup);
}

#[tokio::test]
async fn garbage_body_is_transient() {
    let server = server_answering(ResponseTemplate::new(200).set_body_string("<html></html>")).await;

    let err = source(&server, IpVersion::Both)
        .current()
        .await
        .expect_err("unparsable body is a failed lookup");
    assert_eq!(err.kind(), ErrorKind::TransientLookup);
}

#[tokio::test]
async fn wrong_family_is_rejected() {
    let server = server_answering(ResponseTemplate::new(200).set_body_string("2001:db8::1\n")).await;

    assert!(source(&server, IpVersion::V4).current().await.is_err());
    assert_eq!(
        source(&server, IpVersion::V6).current().await.expect("IPv6 accepted"),
        "2001:db8::1".parse::<IpAddr>().unwrap()
    );
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = server_answering(
        ResponseTemplate::new(200)
            .set_body_string("203.0.113.7")
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let source = HttpAddressSource::with_timeout(
        format!("{}/ip", server.uri()),
        IpVersion::V4,
        Duration::from_millis(50),
    )
    .expect("valid url");

    let err = source.current().await.expect_err("request times out");
    assert_eq!(err.kind(), ErrorKind::TransientLookup);
}
