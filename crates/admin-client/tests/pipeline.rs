mod common;

use admin_client::{
    AdminConsole, ApiError, ApiRequest, ClientConfig, ClientEvent, NoticeLevel, RecordingNavigator,
};
use common::{Harness, NoAuthorization, api_path, biz, ok};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn bearer_header_and_envelope_unwrapping() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path(api_path("notices/page")))
        .and(header("authorization", "Bearer A1"))
        .and(query_param("pageNum", "1"))
        .respond_with(ok(json!({"list": [{"id": 7}], "total": 1})))
        .expect(1)
        .mount(&h.server)
        .await;

    let page: Value = h
        .console
        .client()
        .send(ApiRequest::get("/notices/page").query("pageNum", 1))
        .await
        .unwrap();
    assert_eq!(page, json!({"list": [{"id": 7}], "total": 1}));
}

#[tokio::test]
async fn no_auth_calls_omit_authorization() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path(api_path("auth/captcha")))
        .and(NoAuthorization)
        .respond_with(ok(json!({
            "captchaKey": "k1",
            "captchaBase64": "data:image/png;base64,AAAA"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let captcha = h.console.client().captcha().await.unwrap();
    assert_eq!(captcha.captcha_key, "k1");
}

#[tokio::test]
async fn json_bodies_are_sent() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("POST"))
        .and(path(api_path("notices")))
        .and(body_json(json!({"title": "Maintenance"})))
        .respond_with(ok(json!(42)))
        .expect(1)
        .mount(&h.server)
        .await;

    let id: u64 = h
        .console
        .client()
        .post("notices", &json!({"title": "Maintenance"}))
        .await
        .unwrap();
    assert_eq!(id, 42);
}

#[tokio::test]
async fn business_error_is_typed_and_notified() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");
    let mut events = h.console.events().subscribe();

    Mock::given(method("DELETE"))
        .and(path(api_path("roles/3")))
        .respond_with(biz("B0001", "Role is still assigned"))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.console.client().delete("roles/3").await.unwrap_err();
    assert_eq!(err, ApiError::business("B0001", "Role is still assigned"));
    assert_eq!(
        events.try_recv().unwrap(),
        ClientEvent::Notice {
            level: NoticeLevel::Error,
            message: "Role is still assigned".into()
        }
    );
}

#[tokio::test]
async fn silent_requests_publish_no_notice() {
    let h = Harness::start().await;
    let mut events = h.console.events().subscribe();

    Mock::given(method("GET"))
        .and(path(api_path("configs/theme")))
        .respond_with(biz("B0001", "boom"))
        .mount(&h.server)
        .await;

    let result: Result<Value, _> = h
        .console
        .client()
        .send(ApiRequest::get("configs/theme").silent())
        .await;
    assert!(result.is_err());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn captcha_codes_map_to_captcha_error() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path(api_path("auth/login")))
        .respond_with(biz("A0240", "Captcha is wrong"))
        .mount(&h.server)
        .await;

    let err = h
        .console
        .client()
        .login(&admin_client::LoginForm::new("admin", "secret").captcha("k1", "0000"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Captcha { ref code, .. } if code == "A0240"));
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn bare_http_errors_carry_status_without_redirect() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path(api_path("users/me")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("menus/routes")))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&h.server)
        .await;

    let err = h.console.client().current_user().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(h.console.tokens().is_logged_in());
    assert!(h.navigator.history().is_empty());

    let err = h.console.client().get::<Value>("menus/routes").await.unwrap_err();
    assert_eq!(err, ApiError::http(502, "upstream unavailable"));
}

#[tokio::test]
async fn non_envelope_success_is_a_decode_error() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path(api_path("health")))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&h.server)
        .await;

    let err = h.console.client().get::<Value>("health").await.unwrap_err();
    assert_eq!(err.code(), "DECODE_ERROR");
}

#[tokio::test]
async fn network_failure_is_not_retried() {
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:9/api/v1");
    let console = AdminConsole::with_storage(
        config,
        admin_client::Storage::in_memory(),
        RecordingNavigator::shared("/"),
    )
    .unwrap();

    let err = console.client().get::<Value>("users/me").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn blob_responses_are_returned_untouched() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path(api_path("users/export")))
        .and(header("authorization", "Bearer A1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    "attachment; filename*=UTF-8''%E7%94%A8%E6%88%B7.xlsx",
                )
                .set_body_raw(vec![0x50, 0x4b, 0x03, 0x04], "application/vnd.ms-excel"),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let blob = h
        .console
        .client()
        .send_blob(ApiRequest::get("users/export"))
        .await
        .unwrap();
    assert_eq!(blob.status, 200);
    assert_eq!(blob.bytes, vec![0x50, 0x4b, 0x03, 0x04]);
    assert_eq!(blob.file_name.as_deref(), Some("用户.xlsx"));
    assert_eq!(blob.content_type.as_deref(), Some("application/vnd.ms-excel"));
}

#[tokio::test]
async fn blob_errors_still_classify_envelope() {
    let h = Harness::start().await;
    h.sign_in("A1", "R1");

    Mock::given(method("GET"))
        .and(path(api_path("users/export")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "B0002",
            "msg": "Too many rows"
        })))
        .mount(&h.server)
        .await;

    let err = h
        .console
        .client()
        .send_blob(ApiRequest::get("users/export"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::business("B0002", "Too many rows"));
}
