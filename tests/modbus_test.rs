use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use spotreg::export::{ExportSettings, Exporter};
use spotreg::modbus::ModbusServer;
use spotreg::observability::Metrics;
use spotreg::registers::{AddressMap, AddressRange};
use spotreg::store::{MemoryStore, PriceRecord};

fn read_request(tid: u16, function: u8, start: u16, quantity: u16) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&tid.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 6, 1, function]);
    frame.extend_from_slice(&start.to_be_bytes());
    frame.extend_from_slice(&quantity.to_be_bytes());
    frame
}

async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await.unwrap();
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut pdu = vec![0u8; length - 1];
    stream.read_exact(&mut pdu).await.unwrap();
    let mut frame = header.to_vec();
    frame.extend_from_slice(&pdu);
    frame
}

#[tokio::test]
async fn test_read_registers_over_tcp() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store
        .put_price(PriceRecord {
            date: now.date_naive(),
            hour: 0,
            price: 85.5,
            source: "test".to_string(),
            created_at: now,
        })
        .unwrap();

    let map = Arc::new(AddressMap::new(AddressMap::standard(30), AddressRange::default()).unwrap());
    let exporter = Arc::new(Exporter::new(map, store, ExportSettings::default()));
    exporter.refresh(now).await.unwrap();

    let metrics = Arc::new(Metrics::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = ModbusServer::new(exporter, metrics.clone());
    let task = tokio::spawn(server.serve(listener, shutdown_rx));

    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Holding registers 1000-1001
    stream.write_all(&read_request(0x0A0B, 0x03, 1000, 2)).await.unwrap();
    let frame = read_frame(&mut stream).await;
    assert_eq!(
        frame,
        vec![0x0A, 0x0B, 0, 0, 0, 7, 1, 0x03, 4, 0, 85, 0, 0]
    );

    // Input registers read the same table
    stream.write_all(&read_request(2, 0x04, 1100, 1)).await.unwrap();
    let frame = read_frame(&mut stream).await;
    assert_eq!(frame, vec![0, 2, 0, 0, 0, 5, 1, 0x04, 2, 0, 8]);

    // Past the end of the address range
    stream.write_all(&read_request(3, 0x03, 9999, 2)).await.unwrap();
    let frame = read_frame(&mut stream).await;
    assert_eq!(frame, vec![0, 3, 0, 0, 0, 3, 1, 0x83, 0x02]);

    // Writes are refused
    stream.write_all(&read_request(4, 0x06, 1000, 1)).await.unwrap();
    let frame = read_frame(&mut stream).await;
    assert_eq!(frame, vec![0, 4, 0, 0, 0, 3, 1, 0x86, 0x01]);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.modbus_requests, 4);
    assert_eq!(snapshot.modbus_exceptions, 2);

    drop(stream);
    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}
