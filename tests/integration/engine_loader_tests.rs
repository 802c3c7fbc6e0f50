/*!
 * Integration tests for the engine loader lifecycle
 */

use parking_lot::Mutex;
use std::sync::Arc;

use scriptum::engine::MediaEngine;
use scriptum::engine::mock::MockEngine;
use scriptum::errors::EngineError;
use scriptum::progress::EngineProgressFn;
use crate::common;

#[tokio::test]
async fn test_ensure_loaded_calledTwice_shouldLoadOnce() {
    let engine = Arc::new(MockEngine::new());
    let loader = common::mock_loader(Arc::clone(&engine));

    let first = loader.ensure_loaded(None).await.unwrap();
    let second = loader.ensure_loaded(None).await.unwrap();

    assert_eq!(engine.load_calls(), 1);
    assert!(first.same_engine(&second));
    assert!(loader.is_ready());
}

#[tokio::test]
async fn test_ensure_loaded_afterFailure_shouldRetry() {
    let engine = Arc::new(MockEngine::new().failing_loads(1));
    let loader = common::mock_loader(Arc::clone(&engine));

    let first = loader.ensure_loaded(None).await;
    assert!(matches!(first, Err(EngineError::AssetLoad(_))));
    assert!(!loader.is_ready());

    let second = loader.ensure_loaded(None).await;
    assert!(second.is_ok());
    assert!(loader.is_ready());
    assert_eq!(engine.load_calls(), 2);
    assert_eq!(engine.log_observers().len(), 1);
}

#[tokio::test]
async fn test_ensure_loaded_concurrently_shouldShareOneLoad() {
    let engine = Arc::new(MockEngine::new());
    let loader = common::mock_loader(Arc::clone(&engine));

    let (a, b) = tokio::join!(loader.ensure_loaded(None), loader.ensure_loaded(None));

    assert!(a.unwrap().same_engine(&b.unwrap()));
    assert_eq!(engine.load_calls(), 1);
}

#[tokio::test]
async fn test_ensure_loaded_withProgress_shouldForwardEngineProgress() {
    let engine = Arc::new(MockEngine::new());
    let loader = common::mock_loader(Arc::clone(&engine));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let on_progress = move |percent: u8| sink.lock().push(percent);

    loader
        .ensure_loaded(Some(&on_progress as &EngineProgressFn<'_>))
        .await
        .unwrap();
    // Already loaded: no progress at all
    loader
        .ensure_loaded(Some(&on_progress as &EngineProgressFn<'_>))
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![50, 100]);
}

#[tokio::test]
async fn test_loaded_engine_shouldKeepOnlyPermanentObserver() {
    let engine = Arc::new(MockEngine::new());
    let loader = common::mock_loader(Arc::clone(&engine));

    let handle = loader.ensure_loaded(None).await.unwrap();

    assert_eq!(handle.engine().log_observers().len(), 1);
}
