//! End-to-end admission behaviour over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use conversion_gate::UnconfiguredBackend;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;

mod common;

use common::{
    file_part, start_gate, test_config, RecordingBackend, SlowBackend, API_KEY, PDF, PNG,
};

async fn code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["code"].as_str().unwrap_or_default().to_string()
}

async fn post_form(server: &common::TestServer, path: &str, form: Form) -> reqwest::Response {
    reqwest::Client::new()
        .post(server.url(path))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let server = start_gate(test_config(), Arc::new(UnconfiguredBackend)).await;

    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_key_is_unauthorized_and_backend_untouched() {
    let backend = RecordingBackend::with_pages(3);
    let server = start_gate(test_config(), backend.clone()).await;

    let res = reqwest::Client::new()
        .post(server.url("/pdf/info"))
        .multipart(Form::new().part("file", file_part("a.pdf", PDF)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(code(res).await, "unauthorized");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_split_with_valid_range() {
    let backend = RecordingBackend::with_pages(10);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("report.pdf", PDF))
        .text("pages", "5,1-3,2");
    let res = reqwest::Client::new()
        .post(server.url("/pdf/split"))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/pdf");
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename*=UTF-8''report-split.pdf"
    );
    assert_eq!(res.text().await.unwrap(), "pages:[5, 1, 2, 3]");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_out_of_bounds_range_never_reaches_conversion() {
    let backend = RecordingBackend::with_pages(10);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("report.pdf", PDF))
        .text("pages", "1-12");
    let res = reqwest::Client::new()
        .post(server.url("/pdf/split"))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "out_of_bounds");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_renamed_image_is_bad_signature() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let res = reqwest::Client::new()
        .post(server.url("/pdf/info"))
        .header("X-API-Key", API_KEY)
        .multipart(Form::new().part("file", file_part("fake.pdf", PNG)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "bad_signature");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_too_many_files_rejects_whole_batch() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let mut form = Form::new();
    for i in 0..21 {
        form = form.part("files", file_part(&format!("part{i}.pdf"), PDF));
    }
    let res = reqwest::Client::new()
        .post(server.url("/pdf/merge"))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "too_many_files");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_merge_two_documents() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("files", file_part("a.pdf", PDF))
        .part("files", file_part("b.pdf", PDF));
    let res = reqwest::Client::new()
        .post(server.url("/pdf/merge"))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "merged:2");
}

#[tokio::test]
async fn test_single_file_merge_is_too_few() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let res = reqwest::Client::new()
        .post(server.url("/pdf/merge"))
        .header("X-API-Key", API_KEY)
        .multipart(Form::new().part("files", file_part("a.pdf", PDF)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "too_few_files");
}

#[tokio::test]
async fn test_traversal_filename_is_sanitized_in_download_name() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let res = reqwest::Client::new()
        .post(server.url("/pdf/extract-pages"))
        .header("X-API-Key", API_KEY)
        .multipart(
            Form::new()
                .percent_encode_noop()
                .part("file", file_part("../../etc/passwd.pdf", PDF)),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename*=UTF-8''passwd-extracted.bin"
    );
}

#[tokio::test]
async fn test_lockout_after_ten_failures() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;
    let client = reqwest::Client::new();

    for _ in 0..10 {
        let res = client
            .post(server.url("/pdf/info"))
            .header("X-API-Key", "guess")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client
        .post(server.url("/pdf/info"))
        .header("X-API-Key", API_KEY)
        .multipart(Form::new().part("file", file_part("a.pdf", PDF)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let retry: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=300).contains(&retry));
    assert_eq!(code(res).await, "locked");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let mut config = test_config();
    config.rate_limit.max_requests = 5;
    let server = start_gate(config, RecordingBackend::with_pages(1)).await;
    let client = reqwest::Client::new();

    for _ in 0..5 {
        let res = client
            .post(server.url("/pdf/info"))
            .header("X-API-Key", API_KEY)
            .multipart(Form::new().part("file", file_part("a.pdf", PDF)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .post(server.url("/pdf/info"))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry));
    assert_eq!(code(res).await, "rate_limited");
}

#[tokio::test]
async fn test_unconfigured_backend_is_unavailable() {
    let server = start_gate(test_config(), Arc::new(UnconfiguredBackend)).await;

    let res = reqwest::Client::new()
        .post(server.url("/image/convert"))
        .header("X-API-Key", API_KEY)
        .multipart(
            Form::new()
                .part("file", file_part("pic.png", PNG))
                .text("format", "webp"),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(code(res).await, "backend_unavailable");
}

#[tokio::test]
async fn test_cut_requires_end_after_start() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let video = Part::bytes(&b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00"[..]).file_name("clip.mp4");
    let form = Form::new()
        .part("file", video)
        .text("start", "10")
        .text("end", "5");
    let res = reqwest::Client::new()
        .post(server.url("/video/cut"))
        .header("X-API-Key", API_KEY)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_transcription_language() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let audio = Part::bytes(&b"ID3\x04\x00\x00\x00\x00\x00\x00"[..]).file_name("memo.mp3");
    let res = reqwest::Client::new()
        .post(server.url("/audio/transcribe"))
        .header("X-API-Key", API_KEY)
        .multipart(Form::new().part("file", audio).text("language", "xx"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
}

#[tokio::test]
async fn test_add_password_requires_user_password() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("a.pdf", PDF))
        .text("owner_password", "owner-only");
    let res = post_form(&server, "/pdf/add-password", form).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_add_password_passes_both_passwords() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let form = Form::new()
        .part("file", file_part("contract.pdf", PDF))
        .text("user_password", "open-sesame")
        .text("owner_password", "master");
    let res = post_form(&server, "/pdf/add-password", form).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename*=UTF-8''contract-protected.pdf"
    );
    assert_eq!(res.text().await.unwrap(), "user:open-sesame owner:master");
}

#[tokio::test]
async fn test_overlong_password_is_rejected() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("a.pdf", PDF))
        .text("user_password", "x".repeat(128));
    let res = post_form(&server, "/pdf/add-password", form).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "invalid_field");
    assert!(!body.to_string().contains("xxxx"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_remove_password_requires_password() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("a.pdf", PDF))
        .text("password", "   ");
    let res = post_form(&server, "/pdf/remove-password", form).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_ofx_defaults_and_unknown_account_type() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let res = post_form(
        &server,
        "/pdf/convert-to-ofx",
        Form::new().part("file", file_part("extrato.pdf", PDF)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename*=UTF-8''extrato-statement.ofx"
    );
    assert_eq!(res.text().await.unwrap(), "0000/0000000000/CHECKING");

    let form = Form::new()
        .part("file", file_part("extrato.pdf", PDF))
        .text("account_type", "BROKERAGE");
    let res = post_form(&server, "/pdf/convert-to-ofx", form).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_ofx_account_fields_are_checked() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    let form = Form::new()
        .part("file", file_part("extrato.pdf", PDF))
        .text("bank_id", "0341")
        .text("account_id", "12345-6")
        .text("account_type", "CreditCard");
    let res = post_form(&server, "/pdf/convert-to-ofx", form).await;
    assert_eq!(res.text().await.unwrap(), "0341/12345-6/CREDITCARD");

    let form = Form::new()
        .part("file", file_part("extrato.pdf", PDF))
        .text("account_id", "<OFX>injected</OFX>");
    let res = post_form(&server, "/pdf/convert-to-ofx", form).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(code(res).await, "invalid_field");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_extract_text_is_inline_json() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(4)).await;

    let res = post_form(
        &server,
        "/pdf/extract-text",
        Form::new().part("file", file_part("notes.pdf", PDF)),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(!res.headers().contains_key("content-disposition"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["filename"], "notes.pdf");
    assert_eq!(body["total_pages"], 4);
}

#[tokio::test]
async fn test_compress_defaults_to_download() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let res = post_form(
        &server,
        "/image/compress",
        Form::new().part("file", file_part("pic.png", PNG)),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename*=UTF-8''pic-compressed.jpg"
    );
    assert_eq!(res.text().await.unwrap(), "quality:70");
}

#[tokio::test]
async fn test_compress_field_rejections() {
    let backend = RecordingBackend::with_pages(1);
    let server = start_gate(test_config(), backend.clone()).await;

    for (field, value) in [
        ("response_type", "xml"),
        ("quality", "0"),
        ("quality", "101"),
        ("max_dimension", "0"),
    ] {
        let form = Form::new()
            .part("file", file_part("pic.png", PNG))
            .text(field, value);
        let res = post_form(&server, "/image/compress", form).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{field}={value}");
        assert_eq!(code(res).await, "invalid_field");
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_compress_json_and_info_report_metrics() {
    let server = start_gate(test_config(), RecordingBackend::with_pages(1)).await;

    let form = Form::new()
        .part("file", file_part("pic.png", PNG))
        .text("response_type", "json")
        .text("max_dimension", "800");
    let res = post_form(&server, "/image/compress", form).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["include_file"], true);
    assert_eq!(body["max_dimension"], 800);

    let form = Form::new()
        .part("file", file_part("pic.png", PNG))
        .text("quality", "40");
    let res = post_form(&server, "/image/compress/info", form).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["include_file"], false);
    assert_eq!(body["quality"], 40);
    assert_eq!(body["max_dimension"], Value::Null);

    let form = Form::new()
        .part("file", file_part("pic.png", PNG))
        .text("include_file", "perhaps");
    let res = post_form(&server, "/image/compress/info", form).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_timed_out_conversion_finishes_in_background() {
    let mut config = test_config();
    config.timeouts.request_secs = 1;
    let backend = SlowBackend::new(Duration::from_millis(1500));
    let server = start_gate(config, backend.clone()).await;

    let res = post_form(
        &server,
        "/pdf/extract-pages",
        Form::new().part("file", file_part("big.pdf", PDF)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(backend.finished(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(backend.finished(), 1);
}
