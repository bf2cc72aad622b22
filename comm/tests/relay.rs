use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use comm::{Communicator, RelayTransport, RequestList};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

async fn start_relay() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let pool = relay_server::db::init_pool("sqlite::memory:").await.unwrap();
    let storage = Arc::new(relay_server::storage::Storage::new(pool));
    let server = relay_server::grpc::create_server(storage);

    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(server)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    sleep(Duration::from_millis(100)).await;
    (addr, handle)
}

async fn connect_all(addr: SocketAddr, size: usize, session: &str) -> Vec<Communicator> {
    let mut ranks = Vec::new();
    for rank in 0..size {
        let transport = RelayTransport::connect(addr.to_string(), rank, session)
            .await
            .unwrap();
        ranks.push(Communicator::new(rank, size, Arc::new(transport)).unwrap());
    }
    ranks
}

#[tokio::test]
async fn test_point_to_point_over_relay() {
    let (addr, _relay) = start_relay().await;
    let ranks = connect_all(addr, 2, "p2p").await;

    ranks[0].send(&"first".to_string(), 1, 1).await.unwrap();
    ranks[0].send(&"second".to_string(), 1, 1).await.unwrap();

    let first: String = ranks[1].recv(0, 1).await.unwrap();
    let second: String = ranks[1].recv(0, 1).await.unwrap();
    assert_eq!(first, "first");
    assert_eq!(second, "second");
}

#[tokio::test]
async fn test_nonblocking_exchange_over_relay() {
    let (addr, _relay) = start_relay().await;
    let ranks = connect_all(addr, 3, "nonblocking").await;

    let receives: RequestList<u64> = [1, 2]
        .into_iter()
        .map(|worker| ranks[0].irecv::<u64>(worker, 2).unwrap())
        .collect();
    ranks[2].isend(&20u64, 0, 2).unwrap().wait().await.unwrap();
    ranks[1].isend(&10u64, 0, 2).unwrap().wait().await.unwrap();

    let replies = timeout(Duration::from_secs(5), receives.wait_all())
        .await
        .expect("replies did not arrive")
        .unwrap();
    assert_eq!(replies, vec![10, 20]);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (addr, _relay) = start_relay().await;
    let old_run = connect_all(addr, 2, "old").await;
    let new_run = connect_all(addr, 2, "new").await;

    old_run[0].send(&1u64, 1, 0).await.unwrap();
    new_run[0].send(&2u64, 1, 0).await.unwrap();

    let value: u64 = new_run[1].recv(0, 0).await.unwrap();
    assert_eq!(value, 2);
}

#[tokio::test]
async fn test_all_gather_over_relay() {
    let (addr, _relay) = start_relay().await;
    let ranks = connect_all(addr, 3, "collective").await;

    let handles: Vec<_> = ranks
        .into_iter()
        .map(|world| {
            tokio::spawn(async move {
                let value = world.rank() as u64 * 3;
                world.all_gather(&value).await
            })
        })
        .collect();

    for handle in handles {
        let view = timeout(Duration::from_secs(5), handle)
            .await
            .expect("all-gather stalled")
            .unwrap()
            .unwrap();
        assert_eq!(view, vec![0, 3, 6]);
    }
}

#[tokio::test]
async fn test_reused_session_is_refused_on_connect() {
    let (addr, _relay) = start_relay().await;
    let first_run = connect_all(addr, 2, "reused").await;
    first_run[0].send(&1u64, 1, 0).await.unwrap();
    drop(first_run);

    let again = RelayTransport::connect(addr.to_string(), 1, "reused").await;
    match again {
        Err(comm::Error::Status(status)) => {
            assert_eq!(status.code(), tonic::Code::AlreadyExists)
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("second run joined a used session"),
    }
}
