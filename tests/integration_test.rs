use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use solbus::client::{connect, spawn_tcp_client_task};
use solbus::decode::DecodeLevel;
use solbus::error::{AduParseError, RequestError};
use solbus::exception::ExceptionCode;
use solbus::retry::doubling_retry_strategy;
use solbus::schema::{inverter, RegisterSpace, RegisterValue};
use solbus::types::{AddressRange, Indexed, RequestParam, UnitId};

const UNIT_ID: UnitId = UnitId::new(0x2A);

fn param() -> RequestParam {
    RequestParam::new(UNIT_ID, Duration::from_secs(5))
}

fn fast_retry() -> Box<dyn solbus::retry::RetryStrategy> {
    doubling_retry_strategy(Duration::from_millis(10), Duration::from_millis(10))
}

async fn listen() -> (TcpListener, SocketAddr) {
    // errors after the first initialization are expected
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::INFO)
        .try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

struct RawRequest {
    tx_id: u16,
    unit_id: u8,
    pdu: Vec<u8>,
}

async fn read_request(socket: &mut TcpStream) -> Option<RawRequest> {
    let mut header = [0u8; 7];
    socket.read_exact(&mut header).await.ok()?;

    let tx_id = u16::from_be_bytes([header[0], header[1]]);
    assert_eq!(&header[2..4], &[0x00, 0x00], "bad protocol id");
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    let unit_id = header[6];

    let mut pdu = vec![0u8; length - 1];
    socket.read_exact(&mut pdu).await.ok()?;

    Some(RawRequest { tx_id, unit_id, pdu })
}

fn frame(tx_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(7 + pdu.len());
    out.extend(tx_id.to_be_bytes());
    out.extend([0x00, 0x00]);
    out.extend(((pdu.len() + 1) as u16).to_be_bytes());
    out.push(unit_id);
    out.extend_from_slice(pdu);
    out
}

/// reply to a register read with each word set to `start + offset`
fn echo_addresses_response(request: &RawRequest) -> Vec<u8> {
    let function = request.pdu[0];
    let start = u16::from_be_bytes([request.pdu[1], request.pdu[2]]);
    let count = u16::from_be_bytes([request.pdu[3], request.pdu[4]]);

    let mut pdu = vec![function, (count * 2) as u8];
    for i in 0..count {
        pdu.extend((start + i).to_be_bytes());
    }
    frame(request.tx_id, request.unit_id, &pdu)
}

#[tokio::test]
async fn reads_input_registers() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        loop {
            let request = match read_request(&mut socket).await {
                Some(x) => x,
                None => return,
            };
            let response = echo_addresses_response(&request);
            socket.write_all(&response).await.unwrap();
        }
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let result = channel
        .read_input_registers(param(), AddressRange::try_from(7, 3).unwrap())
        .await
        .unwrap();

    assert_eq!(
        result,
        vec![Indexed::new(7, 7), Indexed::new(8, 8), Indexed::new(9, 9)]
    );
}

#[tokio::test]
async fn surfaces_device_exception() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await.unwrap();
        // illegal data address exception for function 0x03
        let response = frame(request.tx_id, request.unit_id, &[0x83, 0x02]);
        socket.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(0, 1).unwrap())
        .await;

    assert_eq!(
        result,
        Err(RequestError::Exception(ExceptionCode::IllegalDataAddress))
    );
}

#[tokio::test]
async fn retransmits_with_fresh_tx_ids_then_times_out() {
    let (listener, addr) = listen().await;
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // read requests but never respond
        while let Some(request) = read_request(&mut socket).await {
            seen_tx.send((request.tx_id, request.pdu)).unwrap();
        }
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let param = RequestParam::new(UNIT_ID, Duration::from_millis(50)).with_max_retries(2);
    let range = AddressRange::try_from(0, 1).unwrap();

    let result = channel.read_holding_registers(param, range).await;
    assert_eq!(result, Err(RequestError::ResponseTimeout));

    // total attempts = max_retries + 1, every attempt byte-identical under a fresh tx id
    let mut attempts = Vec::new();
    for _ in 0..3 {
        attempts.push(seen_rx.recv().await.unwrap());
    }
    assert!(seen_rx.try_recv().is_err());

    let (first_tx, first_pdu) = &attempts[0];
    for (tx_id, pdu) in &attempts[1..] {
        assert_ne!(tx_id, first_tx);
        assert_eq!(pdu, first_pdu);
    }
    assert_ne!(attempts[1].0, attempts[2].0);
}

#[tokio::test]
async fn resolves_pipelined_requests_answered_out_of_order() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let first = read_request(&mut socket).await.unwrap();
        let second = read_request(&mut socket).await.unwrap();

        // answer in reverse arrival order
        let response = echo_addresses_response(&second);
        socket.write_all(&response).await.unwrap();
        let response = echo_addresses_response(&first);
        socket.write_all(&response).await.unwrap();
    });

    let channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let mut first_channel = channel.clone();
    let first = tokio::spawn(async move {
        first_channel
            .read_holding_registers(param(), AddressRange::try_from(100, 1).unwrap())
            .await
    });
    let mut second_channel = channel;
    let second = tokio::spawn(async move {
        second_channel
            .read_holding_registers(param(), AddressRange::try_from(200, 1).unwrap())
            .await
    });

    // each response lands on the request with the matching tx id
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first, vec![Indexed::new(100, 100)]);
    assert_eq!(second, vec![Indexed::new(200, 200)]);
}

#[tokio::test]
async fn discards_frame_with_unknown_tx_id() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await.unwrap();

        // a spurious frame under a tx id nothing is waiting on
        let spurious = frame(request.tx_id.wrapping_add(17), request.unit_id, &[0x03, 0x02, 0xCA, 0xFE]);
        socket.write_all(&spurious).await.unwrap();

        let response = echo_addresses_response(&request);
        socket.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(3, 1).unwrap())
        .await
        .unwrap();

    assert_eq!(result, vec![Indexed::new(3, 3)]);
}

#[tokio::test]
async fn broadcasts_connection_loss_and_reconnects() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        // first connection: read one request and hang up without replying
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await.unwrap();
        drop(socket);

        // second connection: behave normally
        let (mut socket, _) = listener.accept().await.unwrap();
        while let Some(request) = read_request(&mut socket).await {
            let response = echo_addresses_response(&request);
            socket.write_all(&response).await.unwrap();
        }
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());
    let range = AddressRange::try_from(5, 1).unwrap();

    let result = channel.read_holding_registers(param(), range).await;
    assert!(matches!(result, Err(RequestError::Io(_))), "{result:?}");

    // wait out the reconnect delay
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = channel.read_holding_registers(param(), range).await.unwrap();
    assert_eq!(result, vec![Indexed::new(5, 5)]);
}

#[tokio::test]
async fn discards_partial_frame_from_a_dead_connection() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        // first connection: send a few bytes of the response header and hang up
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await.unwrap();
        let response = echo_addresses_response(&request);
        socket.write_all(&response[..3]).await.unwrap();
        drop(socket);

        // second connection: behave normally
        let (mut socket, _) = listener.accept().await.unwrap();
        while let Some(request) = read_request(&mut socket).await {
            let response = echo_addresses_response(&request);
            socket.write_all(&response).await.unwrap();
        }
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());
    let range = AddressRange::try_from(0, 1).unwrap();

    let result = channel.read_holding_registers(param(), range).await;
    assert!(matches!(result, Err(RequestError::Io(_))), "{result:?}");

    tokio::time::sleep(Duration::from_millis(50)).await;

    // the stale bytes must not prefix the new connection's stream
    let result = channel.read_holding_registers(param(), range).await.unwrap();
    assert_eq!(result, vec![Indexed::new(0, 0)]);
}

#[tokio::test]
async fn abandoned_request_does_not_disturb_the_session() {
    let (listener, addr) = listen().await;
    let (both_seen_tx, both_seen_rx) = tokio::sync::oneshot::channel();
    let (respond_tx, respond_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let first = read_request(&mut socket).await.unwrap();
        let second = read_request(&mut socket).await.unwrap();
        both_seen_tx.send(()).unwrap();

        // wait until the caller has abandoned one of the requests, then
        // answer both of them anyway
        respond_rx.await.unwrap();
        let response = echo_addresses_response(&first);
        socket.write_all(&response).await.unwrap();
        let response = echo_addresses_response(&second);
        socket.write_all(&response).await.unwrap();

        while let Some(request) = read_request(&mut socket).await {
            let response = echo_addresses_response(&request);
            socket.write_all(&response).await.unwrap();
        }
    });

    let channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let mut abandoned_channel = channel.clone();
    let abandoned = tokio::spawn(async move {
        abandoned_channel
            .read_holding_registers(param(), AddressRange::try_from(100, 1).unwrap())
            .await
    });
    let mut kept_channel = channel.clone();
    let kept = tokio::spawn(async move {
        kept_channel
            .read_holding_registers(param(), AddressRange::try_from(200, 1).unwrap())
            .await
    });

    // both requests are on the wire, drop one caller before any response
    both_seen_rx.await.unwrap();
    abandoned.abort();
    respond_tx.send(()).unwrap();

    // the surviving request and a fresh one both complete normally
    let kept = kept.await.unwrap().unwrap();
    assert_eq!(kept, vec![Indexed::new(200, 200)]);

    let mut channel = channel;
    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(7, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(result, vec![Indexed::new(7, 7)]);
}

#[tokio::test]
async fn fails_fast_while_disconnected() {
    // bind then immediately drop to get an address nothing is listening on
    let (listener, addr) = listen().await;
    drop(listener);

    let retry = doubling_retry_strategy(Duration::from_secs(10), Duration::from_secs(10));
    let mut channel = spawn_tcp_client_task(addr, 16, retry, DecodeLevel::default());

    // give the task time to fail its first connect attempt
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = channel
        .read_holding_registers(param(), AddressRange::try_from(0, 1).unwrap())
        .await;
    assert_eq!(result, Err(RequestError::NoConnection));
}

#[tokio::test]
async fn writes_single_register_and_validates_echo() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // echo the first write verbatim
        let request = read_request(&mut socket).await.unwrap();
        assert_eq!(request.pdu, vec![0x06, 0x00, 0x74, 0x00, 0x55]);
        let response = frame(request.tx_id, request.unit_id, &request.pdu);
        socket.write_all(&response).await.unwrap();

        // corrupt the echoed value of the second write
        let request = read_request(&mut socket).await.unwrap();
        let mut pdu = request.pdu.clone();
        pdu[4] ^= 0x01;
        let response = frame(request.tx_id, request.unit_id, &pdu);
        socket.write_all(&response).await.unwrap();
    });

    let mut channel = spawn_tcp_client_task(addr, 16, fast_retry(), DecodeLevel::default());

    let value = Indexed::new(0x0074, 0x0055);
    assert_eq!(
        channel.write_single_register(param(), value).await,
        Ok(value)
    );

    assert_eq!(
        channel.write_single_register(param(), value).await,
        Err(RequestError::BadResponse(AduParseError::ReplyEchoMismatch))
    );
}

#[tokio::test]
async fn facade_decodes_schema_fields_from_one_read() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await.unwrap();

        // read input registers 0..14
        assert_eq!(request.pdu, vec![0x04, 0x00, 0x00, 0x00, 0x0E]);

        let words: [u16; 14] = [1, 2305, 2310, 3500, 3490, 2367, 0, 100, 5, 6, 7, 0, 0, 4990];
        let mut pdu = vec![0x04, 28];
        for word in words {
            pdu.extend(word.to_be_bytes());
        }
        let response = frame(request.tx_id, request.unit_id, &pdu);
        socket.write_all(&response).await.unwrap();
    });

    let mut connection = connect(addr, inverter::schema(), 16, fast_retry(), DecodeLevel::default());

    let state = connection
        .read_registers(
            param(),
            RegisterSpace::Input,
            AddressRange::try_from(0, 14).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(state.get("inverter_status"), Some(&RegisterValue::Unsigned(1)));
    assert_eq!(state.get("v_pv1"), Some(&RegisterValue::Scaled(230.5)));
    assert_eq!(state.get("v_ac1"), Some(&RegisterValue::Scaled(236.7)));
    assert_eq!(
        state.get("e_battery_throughput_total"),
        Some(&RegisterValue::Scaled(10.0))
    );
    assert_eq!(state.get("f_ac1"), Some(&RegisterValue::Scaled(49.9)));
    // not contained in the read range
    assert_eq!(state.get("temp_inverter_heatsink"), None);
}

#[tokio::test]
async fn facade_writes_through_the_schema() {
    let (listener, addr) = listen().await;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await.unwrap();

        // charge_target_soc is holding register 116
        assert_eq!(request.pdu, vec![0x06, 0x00, 0x74, 0x00, 0x55]);
        let response = frame(request.tx_id, request.unit_id, &request.pdu);
        socket.write_all(&response).await.unwrap();
    });

    let mut connection = connect(addr, inverter::schema(), 16, fast_retry(), DecodeLevel::default());

    connection
        .write_register(param(), "charge_target_soc", &RegisterValue::Unsigned(0x55))
        .await
        .unwrap();

    // read-only fields are rejected before anything hits the wire
    let result = connection
        .write_register(param(), "v_ac1", &RegisterValue::Scaled(230.0))
        .await;
    assert_eq!(
        result,
        Err(RequestError::BadValue(solbus::error::ValueError::NotWritable))
    );
}
