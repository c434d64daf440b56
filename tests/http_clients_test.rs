// tests/http_clients_test.rs

// Exercises the NAS, copilot and webhook clients against a local tiny_http server.

use std::io::Read;
use std::thread::JoinHandle;
use std::time::Duration;

use mediafresh::copilot::CopilotClient;
use mediafresh::error::RemoteApiError;
use mediafresh::notify::{Notification, Notifier, WebhookNotifier};
use mediafresh::refresh::{refresh_category, TokioSleeper};
use mediafresh::zspace::{MediaIndexApi, Session, ZspaceClient};

const COOKIE: &str = "token=tok; device_id=dev-1; device=Chrome; version=2.1; _l=zh_CN; nas_id=nas-9";
const RESCAN_FORM: &str =
    "classification_id=7&device_id=dev-1&token=tok&device=Chrome&plat=web&_l=zh_CN&version=2.1&nasid=nas-9";

#[derive(Debug)]
struct SeenRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl SeenRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

// Answers each incoming request with the next canned (status, body) pair.
fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<SeenRequest>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in replies {
            let mut request = server.recv().unwrap();
            let mut content = String::new();
            request.as_reader().read_to_string(&mut content).unwrap();
            seen.push(SeenRequest {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_string()))
                    .collect(),
                body: content,
            });
            let header: tiny_http::Header = "Content-Type: application/json".parse().unwrap();
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            request.respond(response).unwrap();
        }
        seen
    });
    (format!("http://{}", addr), handle)
}

fn session() -> Session {
    Session::from_cookie(COOKIE).unwrap()
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

#[tokio::test]
async fn test_list_classifications_sends_cookie_and_nonce() {
    let (host, server) = serve(vec![(
        200,
        r#"{"code": "200", "msg": "ok", "data": [{"name": "Movies", "id": 1}, {"name": "Shows", "id": "2"}]}"#,
    )]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();

    let list = client.list_classifications(&session()).await.unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0].name, "Movies");
    assert_eq!(list[0].id, "1");
    assert_eq!(list[1].id, "2");

    let seen = server.join().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path(), "/zvideo/classification/list");
    assert!(seen[0].url.contains("rnd="));
    assert!(seen[0].url.contains("webagent=v2"));
    assert_eq!(seen[0].header("cookie"), Some(COOKIE));
}

#[tokio::test]
async fn test_list_classifications_rejects_error_code() {
    let (host, server) = serve(vec![(200, r#"{"code": "N100001", "msg": "token expired"}"#)]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();

    let err = client.list_classifications(&session()).await.unwrap_err();

    match err {
        RemoteApiError::Status { code, message } => {
            assert_eq!(code, "N100001");
            assert_eq!(message, "token expired");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.join().unwrap();
}

#[tokio::test]
async fn test_list_classifications_requires_a_list() {
    let (host, server) = serve(vec![(200, r#"{"code": "200", "data": {"name": "Movies"}}"#)]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();

    let err = client.list_classifications(&session()).await.unwrap_err();

    assert!(matches!(err, RemoteApiError::MissingData(_)));
    server.join().unwrap();
}

#[tokio::test]
async fn test_rescan_and_status_send_session_form() {
    let (host, server) = serve(vec![
        (200, r#"{"code": "200", "data": {"task_id": "t-1"}}"#),
        (200, r#"{"code": "200", "data": {"task_status": 4}}"#),
    ]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();
    let session = session();

    let task_id = client.submit_rescan(&session, "7").await.unwrap();
    let reply = client.rescan_status(&session, "7", &task_id).await.unwrap();

    assert_eq!(task_id, "t-1");
    assert_eq!(reply.code, "200");
    assert_eq!(reply.task_status, Some(4));
    assert!(reply.is_in_progress());

    let seen = server.join().unwrap();
    assert_eq!(seen[0].path(), "/zvideo/classification/rescan");
    assert_eq!(seen[0].body, RESCAN_FORM);
    assert_eq!(
        seen[0].header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(seen[1].path(), "/zvideo/classification/rescan/result");
    assert_eq!(seen[1].body, format!("{}&task_id=t-1", RESCAN_FORM));
    assert_eq!(seen[1].header("cookie"), Some(COOKIE));
}

#[tokio::test]
async fn test_rescan_without_task_id_fails() {
    let (host, server) = serve(vec![(200, r#"{"code": "200", "data": {}}"#)]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();

    let err = client.submit_rescan(&session(), "7").await.unwrap_err();

    assert!(matches!(err, RemoteApiError::MissingData("task_id")));
    server.join().unwrap();
}

#[tokio::test]
async fn test_refresh_category_over_http() {
    let (host, server) = serve(vec![
        (200, r#"{"code": "200", "data": {"task_id": 99}}"#),
        (200, r#"{"code": "N120024", "data": {"task_status": 4}}"#),
        (200, r#"{"code": "200", "data": {"task_status": "2"}}"#),
    ]);
    let client = ZspaceClient::new(&host, timeout()).unwrap();

    let outcome = refresh_category(
        &client,
        &TokioSleeper,
        &session(),
        "Movies",
        "7",
        Duration::from_millis(10),
    )
    .await
    .unwrap();

    assert_eq!(outcome.task_id, "99");
    assert_eq!(outcome.waits, 1);
    assert_eq!(outcome.final_reply.task_status, Some(2));
    assert!(outcome.message().starts_with("Classification: Movies refreshed\n"));
    assert_eq!(server.join().unwrap().len(), 3);
}

#[tokio::test]
async fn test_copilot_login_then_list() {
    let (host, server) = serve(vec![
        (200, r#"{"code": 201, "msg": "ok", "data": {"jwt": "jwt-abc"}}"#),
        (
            200,
            r#"{"code": 0, "data": [{"id": "c1", "name": "jellyfin", "image": "jellyfin/jellyfin", "status": "running"}]}"#,
        ),
    ]);
    let client = CopilotClient::new(&host, "s3cret", timeout()).unwrap();

    let jwt = client.authenticate().await.unwrap();
    let containers = client.list_containers(&jwt).await.unwrap();

    assert_eq!(jwt, "jwt-abc");
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].name, "jellyfin");
    assert_eq!(containers[0].status.as_deref(), Some("running"));

    let seen = server.join().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path(), "/api/auth");
    assert_eq!(seen[0].body, "secretKey=s3cret");
    assert_eq!(seen[1].method, "GET");
    assert_eq!(seen[1].path(), "/api/containers");
    assert_eq!(seen[1].header("authorization"), Some("jwt-abc"));
}

#[tokio::test]
async fn test_copilot_rejected_key() {
    let (host, server) = serve(vec![(200, r#"{"code": 401, "msg": "bad key"}"#)]);
    let client = CopilotClient::new(&host, "wrong", timeout()).unwrap();

    let err = client.authenticate().await.unwrap_err();

    assert!(matches!(err, RemoteApiError::Status { ref code, .. } if code == "401"));
    server.join().unwrap();
}

#[tokio::test]
async fn test_webhook_posts_json() {
    let (host, server) = serve(vec![(200, "{}")]);
    let notifier = WebhookNotifier::new(format!("{}/hook", host), timeout()).unwrap();

    notifier
        .send(Notification::new("[Media refresh]", "done").to(None, Some("42".into())))
        .await
        .unwrap();

    let seen = server.join().unwrap();
    assert_eq!(seen[0].path(), "/hook");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["title"], "[Media refresh]");
    assert_eq!(body["text"], "done");
    assert_eq!(body["user"], "42");
    assert!(body.get("channel").is_none());
}

#[tokio::test]
async fn test_webhook_error_status() {
    let (host, server) = serve(vec![(503, "{}")]);
    let notifier = WebhookNotifier::new(host, timeout()).unwrap();

    let err = notifier.send(Notification::new("t", "x")).await.unwrap_err();

    assert!(matches!(err, RemoteApiError::Status { ref code, .. } if code == "503"));
    server.join().unwrap();
}
