use bus_poller::fetch::BasicClient;
use bus_poller::model::{BusPosition, Route};
use bus_poller::parser::parse_live_buses;
use bus_poller::poll::{BusPollTask, PollOutcome};
use bus_poller::registry::ListenerRegistry;
use bus_poller::scheduler::PollScheduler;
use bus_poller::source::{LiveBusSource, TransitDataSource};
use bus_poller::stats::FleetStats;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const FIXTURE: &[u8] = include_bytes!("fixtures/live_buses_mss.json");

/// Serves `responses` in order, one per connection, then stops accepting.
/// Returns the base URL and the request lines that were received.
fn serve(responses: Vec<(u16, &'static [u8])>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let request = String::from_utf8_lossy(&buf);
            if let Some(line) = request.lines().next() {
                seen.lock().unwrap().push(line.to_string());
            }

            let head = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
            let _ = stream.flush();
        }
    });

    (format!("http://{addr}/api"), requests)
}

#[test]
fn test_parse_fixture() {
    let buses = parse_live_buses(FIXTURE).expect("Failed to parse fixture");
    assert_eq!(buses.len(), 2);

    let stats = FleetStats::from_positions(&Route::new("MSS"), &buses);
    assert_eq!(stats.total_passengers, 43);
    assert_eq!(stats.max_passengers, 31);
}

#[test]
fn test_live_source_fetches_route() {
    let (base_url, requests) = serve(vec![(200, FIXTURE)]);
    let source = LiveBusSource::new(BasicClient::new(), base_url);

    let buses = source.fetch_bus_positions(&Route::new("MSS")).unwrap();

    assert_eq!(buses.len(), 2);
    assert_eq!(buses[0].id, "B1");
    assert_eq!(buses[1].passengers, 31);
    assert_eq!(
        requests.lock().unwrap().as_slice(),
        ["GET /api/buses?routeShortName=MSS HTTP/1.1"]
    );
}

#[test]
fn test_live_source_reports_status() {
    let (base_url, _) = serve(vec![(503, b"down for maintenance".as_slice())]);
    let source = LiveBusSource::new(BasicClient::new(), base_url);

    let err = source.fetch_bus_positions(&Route::new("MSS")).unwrap_err();
    assert_eq!(err.as_label(), "http_status");
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("down for maintenance"));
}

#[test]
fn test_live_source_reports_bad_payload() {
    let (base_url, _) = serve(vec![(200, b"<html>oops</html>".as_slice())]);
    let source = LiveBusSource::new(BasicClient::new(), base_url);

    let err = source.fetch_bus_positions(&Route::new("MSS")).unwrap_err();
    assert_eq!(err.as_label(), "payload");
}

#[test]
fn test_scheduled_polls_skip_failures() {
    let (base_url, requests) = serve(vec![(200, FIXTURE), (500, b"boom".as_slice()), (200, FIXTURE)]);
    let source = LiveBusSource::new(BasicClient::new(), base_url);
    let registry = Arc::new(ListenerRegistry::new());
    let task = Arc::new(BusPollTask::new(Route::new("MSS"), source, Arc::clone(&registry)));

    let received: Arc<Mutex<Vec<Vec<BusPosition>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    task.add_listener(Arc::new(move |buses: &[BusPosition]| {
        sink.lock().unwrap().push(buses.to_vec());
    }));

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&outcomes);
    let job_task = Arc::clone(&task);
    PollScheduler::new(Duration::from_millis(10))
        .with_max_runs(3)
        .start(move || record.lock().unwrap().push(job_task.run()))
        .unwrap()
        .wait();

    task.await_completion();

    assert_eq!(
        outcomes.lock().unwrap().as_slice(),
        [
            PollOutcome::Delivered { buses: 2, listeners: 1 },
            PollOutcome::Failed,
            PollOutcome::Delivered { buses: 2, listeners: 1 },
        ]
    );
    assert_eq!(received.lock().unwrap().len(), 2);
    assert_eq!(requests.lock().unwrap().len(), 3);
    assert!(!task.is_polling());
}
