//! End-to-end tests driving a small application through the client.
//!
//! The application mirrors what a typical suite stands up:
//!
//! 1. `/name` - fixed JSON body
//! 2. `/header` - content negotiation on the request `Content-Type`
//! 3. `/body/user`, `/xml_body/user` - the same user as JSON and XML
//! 4. `/response/statusCode/{code}` - answers with the requested status
//! 5. `/response/headers?header=..&value=..` - echoes a header back

use bytes::Bytes;
use chrono::NaiveDate;
use htest::consts::{header, mime};
use htest::{
    Client, ClientConfig, FailureKind, LogConfig, MockRouter, Recorder, RouteParams,
    STATUS_TABLE,
};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use serde::Deserialize;
use std::collections::HashMap;

const USER_DATA: &str = r#"{
	"id": 1,
	"name": "hexi"
}"#;

const USER_DATA_XML: &str = r#"
<?xml version="1.0" encoding="UTF-8"?>
<user>
	<id>1</id>
	<name>hexi</name>
</user>
"#;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

fn respond(
    status: StatusCode,
    content_type: Option<&str>,
    body: &'static str,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Full::new(Bytes::from_static(body.as_bytes()))).unwrap()
}

fn app() -> MockRouter {
    MockRouter::new()
        .get("/name", |_req: Request<Full<Bytes>>| async {
            respond(StatusCode::OK, Some(mime::APPLICATION_JSON), r#"{"name": "hexi"}"#)
        })
        .get("/header", |req: Request<Full<Bytes>>| async move {
            let content_type = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if content_type == mime::APPLICATION_JSON {
                respond(StatusCode::OK, Some(mime::APPLICATION_JSON), r#"{"result": "JSON"}"#)
            } else {
                respond(StatusCode::BAD_REQUEST, None, "")
            }
        })
        .get("/body/user", |_req: Request<Full<Bytes>>| async {
            respond(StatusCode::OK, Some(mime::APPLICATION_JSON), USER_DATA)
        })
        .get("/xml_body/user", |_req: Request<Full<Bytes>>| async {
            respond(StatusCode::OK, Some(mime::APPLICATION_XML), USER_DATA_XML)
        })
        .get(
            "/response/statusCode/{code}",
            |req: Request<Full<Bytes>>| async move {
                let code = req
                    .extensions()
                    .get::<RouteParams>()
                    .and_then(|p| p.get("code"))
                    .and_then(|c| c.parse::<u16>().ok())
                    .and_then(|c| StatusCode::from_u16(c).ok())
                    .unwrap_or(StatusCode::BAD_REQUEST);
                respond(code, None, "")
            },
        )
        .get("/response/headers", |req: Request<Full<Bytes>>| async move {
            let query: HashMap<String, String> =
                serde_urlencoded::from_str(req.uri().query().unwrap_or_default()).unwrap();
            Response::builder()
                .header(query["header"].as_str(), query["value"].as_str())
                .body(Full::new(Bytes::new()))
                .unwrap()
        })
}

fn client() -> (Client, Recorder) {
    let recorder = Recorder::new();
    (Client::with_reporter(recorder.clone()).to(app()), recorder)
}

#[tokio::test]
async fn test_name_handler() {
    let (client, recorder) = client();

    client
        .get("/name")
        .send()
        .await
        .status_ok()
        .json()
        .string("name", "hexi")
        .exist("name")
        .not_exist("stuid");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_unexpected_status_is_single_failure() {
    let (client, recorder) = client();

    client.get("/response/statusCode/400").send().await.status_ok();

    let failures = recorder.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Status);
    assert!(failures[0].message.contains("200"));
    assert!(failures[0].message.contains("400"));
}

#[tokio::test]
async fn test_request_header() {
    let (client, recorder) = client();

    client
        .get("/header")
        .header(header::CONTENT_TYPE, mime::APPLICATION_FORM)
        .send()
        .await
        .status_bad_request();

    client
        .get("/header")
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON)
        .send()
        .await
        .status_ok()
        .json()
        .string("result", "JSON");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_request_headers_batch() {
    let (client, recorder) = client();

    let mut bad = HashMap::new();
    bad.insert(header::CONTENT_TYPE, mime::APPLICATION_FORM);
    client.get("/header").headers(bad).send().await.status_bad_request();

    let mut good = HashMap::new();
    good.insert(header::CONTENT_TYPE, mime::APPLICATION_JSON);
    client
        .get("/header")
        .headers(good)
        .send()
        .await
        .status_ok()
        .json()
        .string("result", "JSON");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_body_accessors() {
    let (client, recorder) = client();

    let response = client.get("/body/user").send().await;
    response.status_ok().expect(USER_DATA);
    assert_eq!(response.string(), USER_DATA);
    assert_eq!(response.bytes(), Bytes::from_static(USER_DATA.as_bytes()));

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_bind_by_content_type() {
    let (client, recorder) = client();
    let expected = User {
        id: 1,
        name: "hexi".to_string(),
    };

    let mut from_json = User::default();
    client
        .get("/body/user")
        .send()
        .await
        .status_ok()
        .bind(&mut from_json);
    assert_eq!(from_json, expected);

    let mut from_xml = User::default();
    client
        .get("/xml_body/user")
        .send()
        .await
        .status_ok()
        .bind(&mut from_xml);
    assert_eq!(from_xml, expected);

    let mut via_views = User::default();
    client.get("/body/user").send().await.json().bind(&mut via_views);
    assert_eq!(via_views, expected);

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_xml_body() {
    let (client, recorder) = client();

    let response = client.get("/xml_body/user").send().await;
    let xml = response.status_ok().xml();
    xml.exist("user.name")
        .not_exist("user.stuid")
        .string("user.name", "hexi")
        .uint("user.id", 1);
    xml.json().not_empty().string("user.name", "hexi");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_status_table() {
    let (client, recorder) = client();

    for (name, code) in STATUS_TABLE {
        let response = client
            .get(format!("/response/statusCode/{}", code.as_u16()))
            .send()
            .await;
        response.status_is(*code).code(code.as_u16());
        assert!(recorder.is_empty(), "{name}: {:?}", recorder.failures());
    }

    client
        .get("/response/statusCode/100")
        .send()
        .await
        .status_continue()
        .status_line("100 Continue");
    client
        .get("/response/statusCode/418")
        .send()
        .await
        .status_teapot();
    client
        .get("/response/statusCode/511")
        .send()
        .await
        .status_network_authentication_required();

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_response_headers() {
    let (client, recorder) = client();

    let url = format!(
        "/response/headers?{}",
        serde_urlencoded::to_string([
            ("header", header::CONTENT_TYPE),
            ("value", mime::APPLICATION_JSON),
        ])
        .unwrap()
    );
    client
        .get(url)
        .send()
        .await
        .headers(header::CONTENT_TYPE, mime::APPLICATION_JSON)
        .header_content_type(mime::APPLICATION_JSON);

    client
        .get("/response/headers?header=X-Request-ID&value=abc")
        .send()
        .await
        .header_x_request_id("abc")
        .header_x_request_id("xyz")
        .header_location("/somewhere");

    let failures = recorder.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.kind == FailureKind::Header));
    assert!(failures[1].message.contains("<missing>"));
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (client, recorder) = client();

    client.get("/nope").send().await.status_not_found();
    client
        .post("/name", "{}")
        .send()
        .await
        .status_method_not_allowed()
        .header_allow("GET");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn test_client_from_config() {
    let config = ClientConfig::from_toml_str(
        r#"
        time_layout = "%d/%m/%Y %H:%M"

        [default_headers]
        Content-Type = "application/json"
        "#,
    )
    .unwrap();
    assert_eq!(config.log, LogConfig::default());

    let recorder = Recorder::new();
    let client = Client::from_config(&config, std::sync::Arc::new(recorder.clone()))
        .unwrap()
        .to(app())
        .with_default_header("X-Suite", "integration");

    client
        .get("/header")
        .send()
        .await
        .status_ok()
        .json()
        .string("result", "JSON");

    let when = NaiveDate::from_ymd_opt(2018, 2, 22)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let view = htest::Response::new(
        StatusCode::OK,
        http::HeaderMap::new(),
        Bytes::from_static(br#"{"time": "22/02/2018 09:30"}"#),
        std::sync::Arc::new(recorder.clone()),
    )
    .json();
    view.time("time", when, Some("%d/%m/%Y %H:%M"));

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[test]
fn test_blocking_send() {
    let (client, recorder) = client();

    client
        .get("/name")
        .send_blocking()
        .status_ok()
        .header_content_type(mime::APPLICATION_JSON)
        .json()
        .string("name", "hexi");

    assert!(recorder.is_empty(), "{:?}", recorder.failures());
}

#[test]
fn test_default_client_passes_clean_chain() {
    let client = Client::new().to(app());
    client
        .get("/body/user")
        .send_blocking()
        .status_ok()
        .json()
        .int("id", 1)
        .string("name", "hexi");
}

#[test]
#[should_panic(expected = "assertion(s) failed")]
fn test_default_client_panics_on_soft_failure() {
    let client = Client::new().to(app());
    client.get("/name").send_blocking().status_created();
}
