//! Full `clone` and `inspect` runs against a canned local Graph responder.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::thread;

use assert_cmd::prelude::*;
use tempfile::TempDir;

/// Serve `responses` in order, one connection each, and return the request
/// lines seen.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end().to_ascii_lowercase();
                if line.is_empty() {
                    break;
                }
                if let Some(value) = line.strip_prefix("content-length:") {
                    content_length = value.trim().parse().expect("length");
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).expect("body");

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .expect("respond");
            stream.flush().expect("flush");
            seen.push(request_line.trim_end().to_string());
        }
        seen
    });
    (base, handle)
}

/// `planclone <args..> --graph-base-url <base>` with a token and a clean home.
fn planclone(home: &Path, base: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("planclone"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("PLANCLONE_ACCESS_TOKEN", "test-token")
        .env_remove("RUST_LOG")
        .args(args)
        .arg("--graph-base-url")
        .arg(base);
    cmd
}

const CLONE: [&str; 7] = [
    "clone",
    "--source-plan",
    "p-1",
    "--owner",
    "group-1",
    "--title",
    "Copy",
];

const ME: (u16, &str) = (200, r#"{"id":"u-1","displayName":"Tester"}"#);
const PLAN: (u16, &str) = (200, r#"{"id":"p-1","title":"Source plan"}"#);
const TASKS: (u16, &str) = (
    200,
    r#"{"value":[{"id":"t-1","title":"Draft","orderHint":"85","bucketId":"b-1"}]}"#,
);
const DETAIL: (u16, &str) = (200, r#"{"id":"t-1","@odata.etag":"W/\"1\""}"#);
const BUCKET: (u16, &str) = (200, r#"{"id":"b-1","name":"Todo","orderHint":"85"}"#);

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn clone_prints_result_record() {
    let home = TempDir::new().expect("home");
    let (base, server) = serve(vec![
        ME,
        PLAN,
        TASKS,
        DETAIL,
        BUCKET,
        (201, r#"{"id":"new-1","title":"Copy"}"#),
        (201, r#"{"id":"nb-1","name":"Todo","orderHint":" !"}"#),
        (201, r#"{"id":"nt-1","title":"Draft","bucketId":"nb-1"}"#),
    ]);

    let output = planclone(home.path(), &base, &CLONE)
        .args(["--json", "--task-interval-ms", "0"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let record = json_stdout(&output);
    assert_eq!(record["SourcePlanTitle"], "Source plan");
    assert_eq!(record["NewPlanId"], "new-1");
    assert_eq!(
        record["NewPlanUrl"],
        "https://tasks.office.com/Home/PlanViews/new-1"
    );
    assert_eq!(record["TasksCreated"], 1);
    assert_eq!(record["BucketsCreated"], 1);
    assert_eq!(record["Status"], "Completed");
    assert!(record.get("RecordedWrites").is_none());

    let seen = server.join().expect("server");
    assert_eq!(
        seen,
        [
            "GET /me HTTP/1.1",
            "GET /planner/plans/p-1 HTTP/1.1",
            "GET /planner/plans/p-1/tasks HTTP/1.1",
            "GET /planner/tasks/t-1/details HTTP/1.1",
            "GET /planner/buckets/b-1 HTTP/1.1",
            "POST /planner/plans HTTP/1.1",
            "POST /planner/buckets HTTP/1.1",
            "POST /planner/tasks HTTP/1.1",
        ]
    );
}

#[test]
fn dry_run_reads_but_never_writes() {
    let home = TempDir::new().expect("home");
    let (base, server) = serve(vec![ME, PLAN, TASKS, DETAIL, BUCKET]);

    let output = planclone(home.path(), &base, &CLONE)
        .args(["--json", "--dry-run"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let record = json_stdout(&output);
    assert_eq!(record["Status"], "DryRun");
    assert_eq!(record["NewPlanId"], "dry-run-plan");
    assert_eq!(record["TasksCreated"], 1);
    let writes = record["RecordedWrites"].as_array().expect("writes");
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0]["Kind"], "CreatePlan");
    assert_eq!(writes[0]["Owner"], "group-1");

    let seen = server.join().expect("server");
    assert!(seen.iter().all(|line| line.starts_with("GET ")));
}

#[test]
fn bucket_creation_failure_prints_no_record() {
    let home = TempDir::new().expect("home");
    let (base, server) = serve(vec![
        ME,
        PLAN,
        TASKS,
        DETAIL,
        BUCKET,
        (201, r#"{"id":"new-1","title":"Copy"}"#),
        (400, r#"{"error":{"code":"BadRequest"}}"#),
    ]);

    let output = planclone(home.path(), &base, &CLONE)
        .arg("--json")
        .output()
        .expect("run");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to create bucket 'Todo'"), "{stderr}");
    assert!(stderr.contains("incomplete"), "{stderr}");
    server.join().expect("server");
}

#[test]
fn inspect_emits_ordered_report() {
    let home = TempDir::new().expect("home");
    let (base, server) = serve(vec![ME, PLAN, TASKS, DETAIL, BUCKET]);

    let output = planclone(home.path(), &base, &["inspect", "p-1", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = json_stdout(&output);
    assert_eq!(report["Title"], "Source plan");
    assert_eq!(report["Buckets"][0]["Name"], "Todo");
    assert_eq!(report["Buckets"][0]["Tasks"][0]["Title"], "Draft");
    server.join().expect("server");
}
