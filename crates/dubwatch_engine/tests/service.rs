use std::time::Duration;

use dubwatch_core::{JobId, JobRequest, JobStatus, Stage, VoiceGender};
use dubwatch_engine::{
    JobService, PushFrame, ReqwestJobService, ServiceError, ServiceSettings, MAX_LINE_BYTES,
};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> ReqwestJobService {
    let settings = ServiceSettings {
        base_url: Url::parse(&server.uri()).unwrap(),
        request_timeout: Duration::from_millis(500),
        ..ServiceSettings::default()
    };
    ReqwestJobService::new(settings).unwrap()
}

#[tokio::test]
async fn submit_posts_form_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dub"))
        .and(body_json(serde_json::json!({
            "url": "https://youtu.be/abc",
            "lang": "fr",
            "gender": "male",
            "gpu": true,
            "subtitle": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "abc123",
            "message": "Dubbing job started!"
        })))
        .mount(&server)
        .await;

    let request = JobRequest {
        target_lang: "fr".to_string(),
        voice_gender: VoiceGender::Male,
        use_gpu: true,
        ..JobRequest::new("https://youtu.be/abc")
    };
    let job_id = service_for(&server).submit(&request).await.expect("submit ok");
    assert_eq!(job_id, JobId::from("abc123"));
}

#[tokio::test]
async fn submit_surfaces_service_rejection_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dub"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "error": "Invalid YouTube URL" })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .submit(&JobRequest::new("https://youtu.be/abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(ref text) if text == "Invalid YouTube URL"));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn fetch_state_decodes_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "running",
            "progress": 50,
            "stage": "translate",
            "message": "Translating text...",
            "output_file": null,
            "error": null
        })))
        .mount(&server)
        .await;

    let snapshot = service_for(&server)
        .fetch_state(&"abc123".into())
        .await
        .expect("fetch ok");
    assert_eq!(snapshot.job_id, JobId::from("abc123"));
    assert_eq!(snapshot.status, JobStatus::Running);
    assert_eq!(snapshot.stage, Some(Stage::Translate));
    assert_eq!(snapshot.progress, 50);
}

#[tokio::test]
async fn fetch_state_distinguishes_not_found_from_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "Job not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/job/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let gone = service.fetch_state(&"gone".into()).await.unwrap_err();
    assert!(matches!(gone, ServiceError::NotFound(_)));
    assert!(!gone.is_recoverable());

    let broken = service.fetch_state(&"broken".into()).await.unwrap_err();
    assert!(matches!(broken, ServiceError::Transport(_)));
    assert!(broken.is_recoverable());
}

#[tokio::test]
async fn fetch_state_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({ "status": "queued" })),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .fetch_state(&"slow".into())
        .await
        .unwrap_err();
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn subscribe_yields_snapshots_and_malformed_frames() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"status\":\"queued\",\"progress\":0,\"stage\":\"queued\"}\n\n",
        "data: not json\n\n",
        "data: {\"status\":\"running\",\"progress\":5,\"stage\":\"download\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let frames: Vec<_> = service_for(&server)
        .subscribe(&"abc123".into())
        .await
        .expect("subscribe ok")
        .collect()
        .await;

    assert_eq!(frames.len(), 3);
    match &frames[0] {
        Ok(PushFrame::Snapshot(snapshot)) => {
            assert_eq!(snapshot.status, JobStatus::Queued);
            assert_eq!(snapshot.stage, None);
        }
        other => panic!("unexpected frame {other:?}"),
    }
    assert!(matches!(frames[1], Ok(PushFrame::Malformed(_))));
    match &frames[2] {
        Ok(PushFrame::Snapshot(snapshot)) => assert_eq!(snapshot.stage, Some(Stage::Download)),
        other => panic!("unexpected frame {other:?}"),
    }
}

#[tokio::test]
async fn languages_are_sorted_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "languages": [
                { "code": "es", "name": "Spanish", "native_name": "Español" },
                { "code": "de", "name": "German", "native_name": "Deutsch" }
            ],
            "count": 2
        })))
        .mount(&server)
        .await;

    let languages = service_for(&server).languages().await.expect("languages");
    let codes: Vec<_> = languages.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, vec!["de", "es"]);
}

#[tokio::test]
async fn health_report_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "healthy": true,
            "details": "All dependencies OK",
            "cuda_available": false,
            "gpu_name": null
        })))
        .mount(&server)
        .await;

    let report = service_for(&server).health().await.expect("health");
    assert!(report.healthy);
    assert_eq!(report.gpu_name, None);
}

#[tokio::test]
async fn download_writes_artifact_under_attachment_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=final_es.mp4")
                .set_body_raw(b"mp4bytes".to_vec(), "video/mp4"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/download/pending"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "File not ready" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let service = service_for(&server);
    let written = service
        .download_artifact(&"abc123".into(), dir.path())
        .await
        .expect("download");
    assert_eq!(written, dir.path().join("final_es.mp4"));
    assert_eq!(std::fs::read(&written).unwrap(), b"mp4bytes");

    let err = service
        .download_artifact(&"pending".into(), dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(ref text) if text == "File not ready"));
}

#[tokio::test]
async fn download_streams_large_artifact_to_disk() {
    let server = MockServer::start().await;
    let artifact: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/api/download/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(artifact.clone(), "video/mp4"))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let written = service_for(&server)
        .download_artifact(&"big".into(), dir.path())
        .await
        .expect("download");
    assert_eq!(written, dir.path().join("dubbed_big.mp4"));
    assert!(std::fs::read(&written).unwrap() == artifact);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn subscribe_turns_oversized_line_into_malformed_frame() {
    let server = MockServer::start().await;
    let mut body = b"data: ".to_vec();
    body.extend(vec![b'x'; MAX_LINE_BYTES + 16]);
    body.extend_from_slice(b"\n\ndata: {\"status\":\"running\",\"progress\":5,\"stage\":\"download\"}\n\n");
    Mock::given(method("GET"))
        .and(path("/api/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let frames: Vec<_> = service_for(&server)
        .subscribe(&"abc123".into())
        .await
        .expect("subscribe ok")
        .collect()
        .await;

    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[0], Ok(PushFrame::Malformed(_))));
    assert!(matches!(&frames[1], Ok(PushFrame::Snapshot(s)) if s.progress == 5));
}
