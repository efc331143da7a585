use std::time::Duration;

use atom_engine::Atom;
use atom_engine::Error;
use atom_engine::WatchSpec;
use serde_json::json;
use tokio::sync::watch;

use crate::commons::test_settings;
use crate::commons::FixtureTransport;

#[tokio::test]
async fn test_run_processes_events_until_shutdown() {
    let atom = Atom::new(test_settings(), FixtureTransport::new().shared());
    atom.watch(WatchSpec::new(["a"]).callback(|atom| {
        atom.set("b", "seen").unwrap();
    }))
    .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runner = {
        let atom = atom.clone();
        tokio::spawn(async move { atom.run(shutdown_rx).await })
    };

    atom.set("a", 1).unwrap();
    for _ in 0..50 {
        if atom.get("b").is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(atom.get("b"), Some(json!("seen")));

    // The loop is owned by the runner
    assert!(matches!(atom.run_until_idle().await, Err(Error::EventLoopBusy)));

    shutdown_tx.send(()).unwrap();
    runner.await.unwrap().unwrap();
    atom.run_until_idle().await.unwrap();
}

#[test]
fn test_metrics_render_in_text_format() {
    let text = atom_engine::metrics::gather_text();
    assert!(text.contains("atom_flushes"));
}
