use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use comm::RelayTransport;
use matrix_mul::{Error, Matrix, MatrixSource, Outcome, RunConfig, Strategy, run_strategy};
use tokio::net::TcpListener;
use tokio::time::sleep;

async fn start_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let pool = relay_server::db::init_pool("sqlite::memory:").await.unwrap();
    let storage = Arc::new(relay_server::storage::Storage::new(pool));
    let server = relay_server::grpc::create_server(storage);

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(server)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    sleep(Duration::from_millis(100)).await;
    addr
}

async fn run_ranks(
    addr: SocketAddr,
    config: RunConfig,
    size: usize,
    session: &str,
) -> Vec<Result<Outcome, Error>> {
    let config = Arc::new(config);
    let mut handles = Vec::new();
    for rank in 0..size {
        let config = Arc::clone(&config);
        let session = session.to_string();
        handles.push(tokio::spawn(async move {
            let world = RelayTransport::communicator(addr.to_string(), rank, size, session).await?;
            run_strategy(&config, &world).await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

async fn run_over_relay(addr: SocketAddr, config: RunConfig, size: usize, session: &str) -> Matrix {
    let outcomes = run_ranks(addr, config, size, session).await;
    let root = outcomes.into_iter().next().unwrap().unwrap();
    assert_eq!(root.report.as_ref().unwrap().verified, Some(true));
    root.product.unwrap()
}

fn explicit(a: Vec<Vec<i64>>, b: Vec<Vec<i64>>) -> MatrixSource {
    MatrixSource::explicit(Matrix::from_rows(a).unwrap(), Matrix::from_rows(b).unwrap())
}

#[tokio::test]
async fn test_blocking_strategy_over_relay() {
    let addr = start_relay().await;
    let config = RunConfig::new(
        Strategy::Blocking,
        2,
        MatrixSource::explicit(
            Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap(),
            Matrix::from_rows(vec![vec![5, 6], vec![7, 8]]).unwrap(),
        ),
    );

    let product = run_over_relay(addr, config, 3, "blocking-run").await;
    assert_eq!(product.to_rows(), vec![vec![19, 22], vec![43, 50]]);
}

#[tokio::test]
async fn test_one_to_all_and_non_blocking_share_one_relay() {
    let addr = start_relay().await;
    let source = MatrixSource::random(9, 50);

    let one_to_all = RunConfig::new(Strategy::OneToAll, 6, source.clone());
    let non_blocking = RunConfig::new(Strategy::NonBlocking, 6, source);

    let (first, second) = tokio::join!(
        run_over_relay(addr, one_to_all, 3, "one-to-all"),
        run_over_relay(addr, non_blocking, 4, "non-blocking"),
    );
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_second_run_cannot_reuse_a_session() {
    let addr = start_relay().await;
    let first = RunConfig::new(
        Strategy::Blocking,
        2,
        explicit(vec![vec![1, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]),
    );
    let second = RunConfig::new(
        Strategy::Blocking,
        2,
        explicit(vec![vec![1, 0], vec![0, 1]], vec![vec![9, 9], vec![9, 9]]),
    );

    let product = run_over_relay(addr, first, 3, "shared").await;
    assert_eq!(product.to_rows(), vec![vec![19, 22], vec![43, 50]]);

    // Every rank is turned away before it can match the first run's envelopes.
    for outcome in run_ranks(addr, second.clone(), 3, "shared").await {
        match outcome {
            Err(Error::Comm(comm::Error::Status(status))) => {
                assert_eq!(status.code(), tonic::Code::AlreadyExists)
            }
            other => panic!("reused session was accepted: {other:?}"),
        }
    }

    let product = run_over_relay(addr, second, 3, "fresh").await;
    assert_eq!(product.to_rows(), vec![vec![9, 9], vec![9, 9]]);
}
