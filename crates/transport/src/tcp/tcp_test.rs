use super::*;
use sluice_protocol::{Bytes, Event, PartitionKey};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

fn event(text: &str) -> Event {
    let mut event = Event::new(text, 0);
    event.set_serialized(Bytes::copy_from_slice(text.as_bytes()));
    event
}

// =============================================================================
// Config tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = TcpConfig::new("localhost:7070");

    assert_eq!(config.target, "localhost:7070");
    assert_eq!(config.connection_timeout, Duration::from_secs(10));
    assert_eq!(config.write_timeout, Duration::from_secs(5));
    assert_eq!(config.retry_attempts, 3);
    assert_eq!(config.retry_interval, Duration::from_secs(1));
}

#[test]
fn test_config_builders() {
    let config = TcpConfig::new("localhost:7070")
        .with_connection_timeout(Duration::from_secs(30))
        .with_write_timeout(Duration::from_secs(10))
        .with_retry_attempts(0)
        .with_retry_interval(Duration::from_millis(500));

    assert_eq!(config.connection_timeout, Duration::from_secs(30));
    assert_eq!(config.write_timeout, Duration::from_secs(10));
    assert_eq!(config.retry_attempts, 1);
    assert_eq!(config.retry_interval, Duration::from_millis(500));
}

#[test]
fn test_config_from_options() {
    let transport = TransportConfig::new("tcp")
        .with_option("target", "10.0.0.1:7070")
        .with_option("connection_timeout_ms", 250)
        .with_option("retry_attempts", 5)
        .with_option("retry_interval_ms", 10);

    let config = TcpConfig::from_options(&transport).unwrap();
    assert_eq!(config.target, "10.0.0.1:7070");
    assert_eq!(config.connection_timeout, Duration::from_millis(250));
    assert_eq!(config.write_timeout, Duration::from_secs(5));
    assert_eq!(config.retry_attempts, 5);
    assert_eq!(config.retry_interval, Duration::from_millis(10));
}

#[test]
fn test_config_requires_target() {
    let err = TcpConfig::from_options(&TransportConfig::new("tcp")).unwrap_err();
    assert!(matches!(err, TransportError::Config(_)));
}

#[test]
fn test_config_rejects_negative() {
    let transport = TransportConfig::new("tcp")
        .with_option("target", "localhost:1")
        .with_option("write_timeout_ms", -1);
    assert!(TcpConfig::from_options(&transport).is_err());
}

// =============================================================================
// Send tests
// =============================================================================

#[tokio::test]
async fn test_send_frame() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("failed to get addr");

    let server_handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("failed to accept");

        let mut len_buf = [0u8; 4];
        socket
            .read_exact(&mut len_buf)
            .await
            .expect("failed to read length");
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut frame = vec![0u8; len];
        socket
            .read_exact(&mut frame)
            .await
            .expect("failed to read frame");
        frame
    });

    let factory = TcpTransportFactory::new(
        TcpConfig::new(addr.to_string()),
        BufferConfig::default(),
        1,
    );
    let mut buffer = factory.new_buffer().unwrap();
    buffer.add(&event("foo")).unwrap();
    buffer.add(&event("bar")).unwrap();
    buffer.close();

    let mut transport = factory.new_instance().unwrap();
    transport
        .send(buffer.as_ref(), &PartitionKey::empty())
        .await
        .expect("send failed");

    let frame = server_handle.await.expect("server task failed");
    assert_eq!(frame, b"foo\nbar\n");
}

#[tokio::test]
async fn test_send_retries_exhausted() {
    // Bind then drop to get a port with nothing listening
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = TcpConfig::new(addr.to_string())
        .with_connection_timeout(Duration::from_millis(200))
        .with_retry_attempts(2)
        .with_retry_interval(Duration::from_millis(1));
    let factory = TcpTransportFactory::new(config, BufferConfig::default(), 1);

    let mut buffer = factory.new_buffer().unwrap();
    buffer.add(&event("lost")).unwrap();
    buffer.close();

    let mut transport = factory.new_instance().unwrap();
    let err = transport
        .send(buffer.as_ref(), &PartitionKey::empty())
        .await
        .unwrap_err();

    match err {
        TransportError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}
