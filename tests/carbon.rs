extern crate env_logger;
extern crate tk_graphite;
extern crate tokio;

use std::time::{Duration, UNIX_EPOCH};

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

use tk_graphite::{Carbon, Config};


fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn delivers_and_flushes_on_drop() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (carbon, init) = Carbon::new(&Config::new().done());
    let task = tokio::spawn(init.connect_to("127.0.0.1", port));

    let (mut sock, _) = listener.accept().await.unwrap();

    // metrics are dropped until the client notices the connection,
    // so ping until something arrives
    let ts = UNIX_EPOCH + Duration::from_secs(1500000000);
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while received.is_empty() {
        carbon.add_value_at("test.ping", 1, ts).unwrap();
        if let Ok(res) = timeout(Duration::from_millis(50),
                                 sock.read(&mut buf)).await
        {
            let bytes = res.unwrap();
            received.extend_from_slice(&buf[..bytes]);
        }
    }

    carbon.add_value_at("test.gauge", 42, ts).unwrap();
    carbon.add_value_at("test.ratio", 0.25, ts).unwrap();
    carbon.add_line("test.raw  -3   1500000001\r").unwrap();
    drop(carbon);

    timeout(Duration::from_secs(5), sock.read_to_end(&mut received))
        .await.unwrap().unwrap();
    let data = String::from_utf8(received).unwrap();
    let lines: Vec<_> = data.lines()
        .filter(|line| *line != "test.ping 1 1500000000")
        .collect();
    assert_eq!(lines, vec![
        "test.gauge 42 1500000000",
        "test.ratio 0.25 1500000000",
        "test.raw -3 1500000001",
    ]);
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn finishes_without_connection() {
    init_logging();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let cfg = Config::new().reconnect_delay(Duration::from_millis(50)).done();
    let (carbon, init) = Carbon::new(&cfg);
    let task = tokio::spawn(init.connect_to("127.0.0.1", port));
    carbon.add_value("dropped", 1).unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(format!("{:?}", carbon), "Carbon(0/10000)");
    drop(carbon);
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}
