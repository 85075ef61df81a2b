use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bcesign_bos::{AuthorizationToken, PostPolicy, RequestSigner, StaticCredentialProvider};
use bcesign_core::hash::{base64_decode, base64_md5};
use bcesign_core::{Context, HttpSend, Signer};
use bcesign_upload::*;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE, ETAG};
use http::{Method, Request, Response, StatusCode};
use pretty_assertions::assert_eq;
use test_case::test_case;
use tokio::sync::Semaphore;

const AK: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SK: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const MIB: u64 = 1024 * 1024;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Failure injected into the next response for a part.
#[derive(Debug, Clone, Copy)]
enum Failure {
    Network,
    Status(u16),
    BadEtag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    signed: bool,
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<Recorded>,
    uploads: HashMap<String, BTreeMap<u32, Bytes>>,
    objects: HashMap<String, Bytes>,
    forms: Vec<(String, Bytes)>,
    next_upload: u32,
    /// Keyed by part number, `0` stands for initiate.
    failures: HashMap<u32, VecDeque<Failure>>,
}

/// An in-memory BOS that understands the multipart and post object calls.
#[derive(Debug, Clone, Default)]
struct MockBos {
    state: Arc<Mutex<State>>,
    /// Part uploads wait for a permit when set.
    put_gate: Option<Arc<Semaphore>>,
}

impl MockBos {
    fn stalled() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mock = Self {
            put_gate: Some(gate.clone()),
            ..Default::default()
        };
        (mock, gate)
    }

    fn fail(&self, part_number: u32, failures: &[Failure]) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(part_number)
            .or_default()
            .extend(failures);
    }

    fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    fn count(&self, method: Method) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }

    fn object(&self, path: &str) -> Option<Bytes> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }

    fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    fn take_failure(&self, part_number: u32) -> Option<Failure> {
        self.state
            .lock()
            .unwrap()
            .failures
            .get_mut(&part_number)
            .and_then(|v| v.pop_front())
    }
}

fn hex_md5(content: &[u8]) -> String {
    hex::encode(base64_decode(&base64_md5(content)).unwrap())
}

fn json(status: u16, value: serde_json::Value) -> bcesign_core::Result<Response<Bytes>> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header("x-bce-request-id", "mock-request-id")
        .body(Bytes::from(value.to_string()))?)
}

fn error(status: u16, code: &str) -> bcesign_core::Result<Response<Bytes>> {
    json(
        status,
        serde_json::json!({"code": code, "message": "injected failure", "requestId": "mock-request-id"}),
    )
}

fn inject(failure: Failure) -> Option<bcesign_core::Result<Response<Bytes>>> {
    match failure {
        Failure::Network => Some(Err(bcesign_core::Error::transport("connection reset"))),
        Failure::Status(code) => Some(error(code, "InjectedError")),
        Failure::BadEtag => None,
    }
}

#[async_trait]
impl HttpSend for MockBos {
    async fn http_send(&self, req: Request<Bytes>) -> bcesign_core::Result<Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();
        let query_str = parts.uri.query().unwrap_or_default().to_string();
        let query: HashMap<&str, &str> = query_str
            .split('&')
            .filter(|v| !v.is_empty())
            .map(|kv| kv.split_once('=').unwrap_or((kv, "")))
            .collect();

        let signed = match parts.headers.get(AUTHORIZATION) {
            Some(v) => {
                let token: AuthorizationToken = v.to_str()?.parse()?;
                assert_eq!(AK, token.access_key_id);
                true
            }
            None => false,
        };
        self.state.lock().unwrap().requests.push(Recorded {
            method: parts.method.clone(),
            path: path.clone(),
            query: query_str.clone(),
            signed,
        });

        match (&parts.method, query.get("uploadId"), query.get("partNumber")) {
            (&Method::POST, None, None) if query.contains_key("uploads") => {
                if let Some(resp) = self.take_failure(0).and_then(inject) {
                    return resp;
                }
                let mut state = self.state.lock().unwrap();
                state.next_upload += 1;
                let upload_id = format!("upload-{}", state.next_upload);
                state.uploads.insert(upload_id.clone(), BTreeMap::new());
                json(
                    200,
                    serde_json::json!({"bucket": "bucket", "key": path, "uploadId": upload_id}),
                )
            }
            (&Method::PUT, Some(upload_id), Some(part_number)) => {
                let part_number: u32 = part_number.parse().unwrap();
                if let Some(gate) = &self.put_gate {
                    let _permit = gate.acquire().await.unwrap();
                }
                let failure = self.take_failure(part_number);
                if let Some(resp) = failure.and_then(inject) {
                    return resp;
                }

                let md5 = parts.headers.get("content-md5").unwrap().to_str()?;
                if md5 != base64_md5(&body) {
                    return error(400, "BadDigest");
                }
                let etag = match failure {
                    Some(Failure::BadEtag) => "0".repeat(32),
                    _ => hex_md5(&body),
                };

                let mut state = self.state.lock().unwrap();
                let Some(upload) = state.uploads.get_mut(*upload_id) else {
                    return error(404, "NoSuchUpload");
                };
                upload.insert(part_number, body);
                Ok(Response::builder()
                    .status(200)
                    .header(ETAG, format!("\"{etag}\""))
                    .body(Bytes::new())?)
            }
            (&Method::POST, Some(upload_id), None) => {
                let request: serde_json::Value = serde_json::from_slice(&body).unwrap();
                let mut state = self.state.lock().unwrap();
                let Some(upload) = state.uploads.remove(*upload_id) else {
                    return error(404, "NoSuchUpload");
                };

                let mut object = Vec::new();
                for part in request["parts"].as_array().unwrap() {
                    let number = part["partNumber"].as_u64().unwrap() as u32;
                    let content = &upload[&number];
                    assert_eq!(hex_md5(content), part["eTag"].as_str().unwrap());
                    object.extend_from_slice(content);
                }
                state.objects.insert(path.clone(), Bytes::from(object));
                json(
                    200,
                    serde_json::json!({
                        "location": format!("http://bj.bcebos.com{path}"),
                        "bucket": "bucket",
                        "key": path,
                        "eTag": "\"multipart-etag\"",
                    }),
                )
            }
            (&Method::DELETE, Some(upload_id), None) => {
                let mut state = self.state.lock().unwrap();
                match state.uploads.remove(*upload_id) {
                    Some(_) => Ok(Response::builder().status(200).body(Bytes::new())?),
                    None => error(404, "NoSuchUpload"),
                }
            }
            (&Method::POST, None, None) => {
                let content_type = parts.headers[CONTENT_TYPE].to_str()?.to_string();
                self.state.lock().unwrap().forms.push((content_type, body));
                Ok(Response::builder()
                    .status(204)
                    .header(ETAG, "\"form-etag\"")
                    .body(Bytes::new())?)
            }
            _ => error(405, "MethodNotAllowed"),
        }
    }
}

fn fast_config() -> UploadConfig {
    UploadConfig::default().with_retry(
        RetryConfig::default()
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5)),
    )
}

fn small_parts(part_size: u64) -> UploadConfig {
    fast_config()
        .with_part_size(part_size)
        .with_min_part_size(1)
}

fn uploader(mock: &MockBos, config: UploadConfig) -> Uploader {
    let ctx = Context::new().with_http_send(mock.clone());
    let signer = Signer::new(
        ctx.clone(),
        StaticCredentialProvider::new(AK, SK),
        RequestSigner::new(),
    );
    Uploader::new(ctx, signer, "http://bj.bcebos.com", config).unwrap()
}

fn payload(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}

#[test_case(5 * MIB as usize + 1, 2; "one byte over a part")]
#[test_case(28, 1; "small payload")]
#[test_case(0, 1; "empty payload")]
#[tokio::test]
async fn test_upload_assembles_object(len: usize, parts: usize) -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, fast_config().with_part_size(5 * MIB));
    let content = payload(len);

    let upload = uploader
        .upload("bucket", "dir/object.bin", &BytesSource::new(content.clone()))
        .await?;

    assert_eq!(parts, upload.parts);
    assert_eq!(len as u64, upload.size);
    assert_eq!("multipart-etag", upload.etag);
    assert_eq!(Some(content), mock.object("/bucket/dir/object.bin"));
    assert_eq!(1 + parts + 1, mock.requests().len());
    assert!(mock.requests().iter().all(|r| r.signed));
    assert_eq!(0, mock.count(Method::DELETE));
    Ok(())
}

#[tokio::test]
async fn test_upload_with_concurrency() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(7).with_concurrency(4));
    let content = payload(100);

    let upload = uploader
        .upload("bucket", "object", &BytesSource::new(content.clone()))
        .await?;

    assert_eq!(15, upload.parts);
    assert_eq!(Some(content), mock.object("/bucket/object"));
    assert_eq!(15, mock.count(Method::PUT));
    Ok(())
}

#[tokio::test]
async fn test_session_steps() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(10));
    let source = BytesSource::new(payload(25));

    let mut session = uploader.session("bucket", "object");
    assert_eq!(UploadState::Idle, session.state());

    let upload_id = session.initiate().await?.to_string();
    assert_eq!("upload-1", upload_id);
    assert_eq!(UploadState::UploadingParts, session.state());

    let plan = plan_parts(25, 10, 1)?;
    session.upload_parts(&plan, &source).await?;
    assert_eq!(3, session.parts().len());
    assert_eq!(5, session.parts()[&3].size);
    assert!(session
        .tasks()
        .values()
        .all(|t| t.state == PartState::Uploaded && t.attempts == 1 && t.content_md5.is_some()));

    let upload = session.complete().await?;
    assert_eq!(UploadState::Completed, session.state());
    assert_eq!(upload_id, upload.upload_id);
    assert_eq!(25, upload.size);

    let err = session.abort().await.unwrap_err();
    assert_eq!(ErrorKind::RequestInvalid, err.kind());
    assert_eq!(0, mock.count(Method::DELETE));
    Ok(())
}

#[tokio::test]
async fn test_complete_rejects_gapped_part_list() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(10));
    let source = BytesSource::new(payload(30));

    let mut session = uploader.session("bucket", "object");
    session.initiate().await?;
    session
        .upload_parts(&plan_parts(30, 10, 1)?, &source)
        .await?;
    let sent = mock.requests().len();

    let etag = |n: u32| session.parts()[&n].etag.clone();
    let gapped = vec![
        CompletedPart {
            part_number: 1,
            etag: etag(1),
        },
        CompletedPart {
            part_number: 3,
            etag: etag(3),
        },
    ];
    let wrong_etag = vec![
        CompletedPart {
            part_number: 1,
            etag: etag(2),
        },
        CompletedPart {
            part_number: 2,
            etag: etag(2),
        },
    ];
    let mut unknown_part: Vec<CompletedPart> = (1..=3)
        .map(|n| CompletedPart {
            part_number: n,
            etag: etag(n),
        })
        .collect();
    unknown_part.push(CompletedPart {
        part_number: 4,
        etag: "deadbeef".to_string(),
    });
    let err = session.complete_with(&gapped).await.unwrap_err();
    assert_eq!(ErrorKind::RequestInvalid, err.kind());

    let err = session.complete_with(&wrong_etag).await.unwrap_err();
    assert_eq!(ErrorKind::RequestInvalid, err.kind());

    let err = session.complete_with(&unknown_part).await.unwrap_err();
    assert_eq!(ErrorKind::RequestInvalid, err.kind());
    assert_eq!(Some((4, 4)), err.part());
    assert_eq!(None, err.abort_outcome());

    assert_eq!(sent, mock.requests().len());
    assert_eq!(UploadState::UploadingParts, session.state());

    session.complete().await?;
    assert_eq!(Some(payload(30)), mock.object("/bucket/object"));
    Ok(())
}

#[tokio::test]
async fn test_cancel_from_progress_listener() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(4).with_concurrency(1));
    let source = BytesSource::new(payload(20));

    let mut session = uploader.session("bucket", "object");
    let handle = session.cancel_handle();
    session.progress().attach(move |p: Progress| {
        if p.transferred >= 8 {
            handle.cancel();
        }
    });

    let err = session.run(&source).await.unwrap_err();
    assert_eq!(ErrorKind::Cancelled, err.kind());
    assert_eq!(Some(&AbortOutcome::Aborted), err.abort_outcome());
    assert_eq!(UploadState::Aborted, session.state());
    assert_eq!(2, session.parts().len());

    assert_eq!(2, mock.count(Method::PUT));
    assert_eq!(1, mock.count(Method::DELETE));
    assert_eq!(0, mock.uploads());
    assert_eq!(None, mock.object("/bucket/object"));

    // Aborting again is a no-op.
    session.abort().await?;
    assert_eq!(1, mock.count(Method::DELETE));
    Ok(())
}

/// Wait until the mock has seen `count` requests with `method`.
async fn wait_for_requests(mock: &MockBos, method: Method, count: usize) {
    while mock.count(method.clone()) < count {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn test_cancel_while_parts_in_flight() -> Result<()> {
    init();
    let (mock, gate) = MockBos::stalled();
    let uploader = uploader(&mock, small_parts(4).with_concurrency(3));
    let source = BytesSource::new(payload(40));

    let mut session = uploader.session("bucket", "object");
    let handle = session.cancel_handle();
    let canceller = {
        let mock = mock.clone();
        tokio::spawn(async move {
            wait_for_requests(&mock, Method::PUT, 3).await;
            handle.cancel();
            // Give the coordinator a chance to observe the cancel first.
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.add_permits(16);
        })
    };

    let err = tokio::time::timeout(Duration::from_secs(10), session.run(&source))
        .await
        .expect("cancelled upload must finish")
        .unwrap_err();
    canceller.await.expect("canceller must not panic");

    assert_eq!(ErrorKind::Cancelled, err.kind());
    assert_eq!(Some(&AbortOutcome::Aborted), err.abort_outcome());
    assert_eq!(UploadState::Aborted, session.state());

    // The three stalled parts finished, nothing else was dispatched.
    assert_eq!(3, session.parts().len());
    assert!((1..=3).all(|n| session.tasks()[&n].state == PartState::Uploaded));
    assert_eq!(3, mock.count(Method::PUT));
    assert_eq!(1, mock.count(Method::DELETE));
    assert_eq!(0, mock.uploads());
    Ok(())
}

#[tokio::test]
async fn test_cancel_during_retry_backoff() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(1, &[Failure::Status(503); 3]);
    let config = small_parts(10).with_concurrency(1).with_retry(
        RetryConfig::default()
            .with_initial_delay(Duration::from_secs(30))
            .with_max_delay(Duration::from_secs(30)),
    );
    let uploader = uploader(&mock, config);

    let mut session = uploader.session("bucket", "object");
    let handle = session.cancel_handle();
    let canceller = {
        let mock = mock.clone();
        tokio::spawn(async move {
            wait_for_requests(&mock, Method::PUT, 1).await;
            handle.cancel();
        })
    };

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(&BytesSource::new(payload(15))),
    )
    .await
    .expect("cancel must interrupt the backoff")
    .unwrap_err();
    canceller.await.expect("canceller must not panic");

    assert_eq!(ErrorKind::Cancelled, err.kind());
    assert_eq!(1, mock.count(Method::PUT));
    assert_eq!(1, mock.count(Method::DELETE));
    Ok(())
}

#[tokio::test]
async fn test_etag_mismatch_retried_once() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(2, &[Failure::BadEtag]);
    let uploader = uploader(&mock, small_parts(10));
    let source = BytesSource::new(payload(30));

    let mut session = uploader.session("bucket", "object");
    let upload = session.run(&source).await?;

    assert_eq!(3, upload.parts);
    assert_eq!(2, session.tasks()[&2].attempts);
    assert_eq!(4, mock.count(Method::PUT));
    Ok(())
}

#[tokio::test]
async fn test_etag_mismatch_twice_aborts() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(2, &[Failure::BadEtag, Failure::BadEtag]);
    let uploader = uploader(&mock, small_parts(10));
    let source = BytesSource::new(payload(30));

    let mut session = uploader.session("bucket", "object");
    let err = session.run(&source).await.unwrap_err();

    assert_eq!(ErrorKind::Integrity, err.kind());
    assert_eq!(Some((2, 3)), err.part());
    assert_eq!(Some(UploadState::UploadingParts), err.state());
    assert_eq!(Some(&AbortOutcome::Aborted), err.abort_outcome());
    assert_eq!(PartState::Failed, session.tasks()[&2].state);
    assert_eq!(1, mock.count(Method::DELETE));
    assert_eq!(None, mock.object("/bucket/object"));
    Ok(())
}

#[test_case(Failure::Network; "network")]
#[test_case(Failure::Status(500); "internal error")]
#[test_case(Failure::Status(503); "service unavailable")]
#[test_case(Failure::Status(429); "throttled")]
#[tokio::test]
async fn test_transient_failure_retried(failure: Failure) -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(0, &[failure]);
    mock.fail(1, &[failure, failure]);
    let uploader = uploader(&mock, small_parts(10));

    let mut session = uploader.session("bucket", "object");
    session.run(&BytesSource::new(payload(15))).await?;

    assert_eq!(3, session.tasks()[&1].attempts);
    assert_eq!(1, session.tasks()[&2].attempts);
    assert_eq!(Some(payload(15)), mock.object("/bucket/object"));
    Ok(())
}

#[tokio::test]
async fn test_retries_exhausted() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(1, &[Failure::Status(500); 3]);
    let uploader = uploader(&mock, small_parts(10));

    let mut session = uploader.session("bucket", "object");
    let err = session.run(&BytesSource::new(payload(15))).await.unwrap_err();

    assert_eq!(ErrorKind::Protocol, err.kind());
    assert_eq!(Some(StatusCode::INTERNAL_SERVER_ERROR), err.status());
    assert_eq!(3, session.tasks()[&1].attempts);
    assert_eq!(1, mock.count(Method::DELETE));
    Ok(())
}

#[tokio::test]
async fn test_client_error_not_retried() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(2, &[Failure::Status(403)]);
    let uploader = uploader(&mock, small_parts(10).with_concurrency(1));

    let mut session = uploader.session("bucket", "object");
    let err = session.run(&BytesSource::new(payload(30))).await.unwrap_err();

    assert_eq!(ErrorKind::Protocol, err.kind());
    assert_eq!(Some(StatusCode::FORBIDDEN), err.status());
    assert_eq!(Some("InjectedError"), err.context("code"));
    assert_eq!(Some("mock-request-id"), err.context("request_id"));
    assert_eq!(Some((2, 3)), err.part());
    assert_eq!(Some(&AbortOutcome::Aborted), err.abort_outcome());

    // Part 3 is never dispatched once part 2 failed.
    assert_eq!(2, mock.count(Method::PUT));
    assert_eq!(1, session.tasks()[&2].attempts);
    assert_eq!(PartState::Pending, session.tasks()[&3].state);
    assert_eq!(1, mock.count(Method::DELETE));
    assert!(err.to_string().starts_with("failed during part 2 of 3 upload: "));
    assert!(err.to_string().ends_with("; upload aborted"));
    Ok(())
}

#[tokio::test]
async fn test_initiate_failure_skips_abort() -> Result<()> {
    init();
    let mock = MockBos::default();
    mock.fail(0, &[Failure::Status(403)]);
    let uploader = uploader(&mock, fast_config());

    let mut session = uploader.session("bucket", "object");
    let err = session.run(&BytesSource::new(payload(10))).await.unwrap_err();

    assert_eq!(ErrorKind::Protocol, err.kind());
    assert_eq!(Some(UploadState::Initiating), err.state());
    assert_eq!(Some(&AbortOutcome::Skipped), err.abort_outcome());
    assert_eq!(UploadState::Aborted, session.state());
    assert_eq!(1, mock.requests().len());
    Ok(())
}

#[tokio::test]
async fn test_progress_is_monotonic() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(3).with_concurrency(3));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut session = uploader.session("bucket", "object");
    let recorder = seen.clone();
    let id = session
        .progress()
        .attach(move |p: Progress| recorder.lock().unwrap().push(p));

    session.run(&BytesSource::new(payload(31))).await?;

    let seen = seen.lock().unwrap().clone();
    assert!(seen.windows(2).all(|w| w[0].transferred < w[1].transferred));
    assert_eq!(
        Some(&Progress {
            transferred: 31,
            total: 31
        }),
        seen.last()
    );
    assert_eq!(31, session.progress().current().transferred);
    assert!(session.progress().detach(id));
    Ok(())
}

#[tokio::test]
async fn test_upload_file_source() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, small_parts(1000));

    let content = payload(4096 + 17);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&content).unwrap();
    file.flush().unwrap();

    let source = FileSource::open(file.path()).await?;
    let upload = uploader.upload("bucket", "file.bin", &source).await?;

    assert_eq!(5, upload.parts);
    assert_eq!(Some(content), mock.object("/bucket/file.bin"));
    Ok(())
}

#[tokio::test]
async fn test_post_object() -> Result<()> {
    init();
    let mock = MockBos::default();
    let uploader = uploader(&mock, fast_config());

    let policy = PostPolicy::new(Utc::now() + ChronoDuration::hours(1))
        .with_bucket("bucket")
        .with_key("photo.jpg");
    let output = uploader
        .post_object("bucket", "photo.jpg", &policy, Bytes::from_static(b"jpeg bytes"))
        .await?;
    assert_eq!("form-etag", output.etag);

    let requests = mock.requests();
    assert_eq!(1, requests.len());
    assert_eq!("/bucket", requests[0].path);
    assert!(!requests[0].signed);

    let (content_type, body) = mock.state.lock().unwrap().forms[0].clone();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();

    let names: Vec<&str> = body
        .split(&format!("--{boundary}"))
        .filter_map(|part| part.split("name=\"").nth(1))
        .filter_map(|rest| rest.split('"').next())
        .collect();
    assert_eq!(vec!["accessKey", "policy", "signature", "key", "file"], names);
    assert!(body.contains(&format!("\r\n\r\n{AK}\r\n")));
    assert!(body.contains("\r\n\r\njpeg bytes\r\n"));
    assert!(body.ends_with(&format!("--{boundary}--")));
    Ok(())
}
