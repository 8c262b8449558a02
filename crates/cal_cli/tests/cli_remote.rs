use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("calcli-{nanos}-{file_name}"))
}

fn calcli(store_path: &PathBuf, api_url: &str) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_calcli"));
    command
        .env("CALCLI_STORE_PATH", store_path)
        .env("CALCLI_CONFIG_PATH", temp_path("no-config.json"))
        .env("CALCLI_DISABLE_NOTIFICATIONS", "1")
        .env("CALCLI_SILENT_ALARM", "1")
        .env("CALCLI_API_URL", api_url);
    command
}

fn seed_store(store_path: &PathBuf) {
    let content = serde_json::json!({
        "schema_version": 1,
        "schedules": [
            {
                "id": "sched-local",
                "task_name": "Local Standup",
                "start_time": "2026-06-15T09:00:00Z",
                "end_time": "2026-06-15T10:00:00Z",
                "status": "Not Started",
                "mode": "Online",
                "reminder_minutes": 10,
                "created_at": "2026-06-01T00:00:00Z"
            }
        ]
    });
    std::fs::write(store_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn remote_record() -> serde_json::Value {
    serde_json::json!({
        "id": "remote-42",
        "task_name": "Budget Review",
        "start_time": "2026-06-15T14:00:00Z",
        "end_time": "2026-06-15T15:00:00Z",
        "status": "Not Started",
        "mode": "Online",
        "reminder_minutes": 10,
        "created_at": "2026-06-01T00:00:00Z"
    })
}

/// Minimal canned HTTP service: answers GET/PUT/DELETE for the
/// `remote-42` record and logs every request line it sees.
fn spawn_stub_service() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));
    let thread_log = Arc::clone(&log);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            handle_request(stream, &thread_log);
        }
    });

    (base_url, log)
}

fn handle_request(stream: TcpStream, log: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() || header.trim().is_empty() {
            break;
        }
        if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    log.lock().unwrap().push(format!("{method} {path}"));

    let (status, payload) = match (method.as_str(), path.as_str()) {
        ("GET", "/schedules/remote-42/") => ("200 OK", remote_record().to_string()),
        // echo the submitted record back, the way the service responds
        // to a successful update
        ("PUT", "/schedules/remote-42/") => {
            ("200 OK", String::from_utf8_lossy(&body).into_owned())
        }
        ("DELETE", "/schedules/remote-42/") => ("200 OK", "{}".to_string()),
        _ => ("404 Not Found", "{}".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
}

/// A loopback URL nothing listens on; connections are refused at once.
fn dead_remote_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

#[test]
fn edit_updates_remote_record_without_touching_local_store() {
    let store_path = temp_path("remote-edit.json");
    let (base_url, log) = spawn_stub_service();

    let output = calcli(&store_path, &base_url)
        .args(["--json", "edit", "remote-42", "--reminder", "30"])
        .output()
        .expect("failed to run edit command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).expect("json output");
    assert_eq!(parsed["id"], "remote-42");
    assert_eq!(parsed["reminder_minutes"], 30);
    assert!(parsed["updated_at"].is_string());

    let requests = log.lock().unwrap().clone();
    assert!(requests.contains(&"GET /schedules/remote-42/".to_string()), "saw: {requests:?}");
    assert!(requests.contains(&"PUT /schedules/remote-42/".to_string()), "saw: {requests:?}");
    assert!(!store_path.exists(), "remote edit must not create a local store");
}

#[test]
fn delete_contacts_remote_before_local() {
    let store_path = temp_path("remote-delete.json");
    let (base_url, log) = spawn_stub_service();

    let output = calcli(&store_path, &base_url)
        .args(["delete", "remote-42"])
        .output()
        .expect("failed to run delete command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let requests = log.lock().unwrap().clone();
    assert!(requests.contains(&"DELETE /schedules/remote-42/".to_string()), "saw: {requests:?}");
}

#[test]
fn show_reads_remote_record() {
    let store_path = temp_path("remote-show.json");
    let (base_url, _log) = spawn_stub_service();

    let output = calcli(&store_path, &base_url)
        .args(["--json", "show", "remote-42"])
        .output()
        .expect("failed to run show command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).expect("json output");
    assert_eq!(parsed["id"], "remote-42");
    assert_eq!(parsed["task_name"], "Budget Review");
}

#[test]
fn add_falls_back_to_local_store_when_remote_is_down() {
    let store_path = temp_path("fallback-add.json");

    let output = calcli(&store_path, &dead_remote_url())
        .args(["--json", "add", "Budget Review", "--start", "2026-06-15 09:00"])
        .output()
        .expect("failed to run add command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).expect("stored json");
    std::fs::remove_file(&store_path).ok();
    assert_eq!(stored["schedules"][0]["task_name"], "Budget Review");
}

#[test]
fn list_falls_back_to_local_store_when_remote_is_down() {
    let store_path = temp_path("fallback-list.json");
    seed_store(&store_path);

    let output = calcli(&store_path, &dead_remote_url())
        .args(["--json", "list", "--year", "2026", "--month", "6"])
        .output()
        .expect("failed to run list command");

    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).expect("json output");
    assert_eq!(parsed[0]["id"], "sched-local");
}

#[test]
fn edit_falls_back_to_local_store_when_remote_is_down() {
    let store_path = temp_path("fallback-edit.json");
    seed_store(&store_path);

    let output = calcli(&store_path, &dead_remote_url())
        .args(["--json", "edit", "sched-local", "--reminder", "30"])
        .output()
        .expect("failed to run edit command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).expect("stored json");
    std::fs::remove_file(&store_path).ok();
    assert_eq!(stored["schedules"][0]["reminder_minutes"], 30);
}
