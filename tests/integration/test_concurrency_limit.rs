use async_trait::async_trait;
use genbooth::services::image_gen::{
    ConcurrencyLimiter, GenerationError, GenerationRequest, GeneratorConfig, ImageGenerator, ProxyRequest,
    RetryConfig, Transport, TransportError,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Holds every call for a fixed time and records how many overlap
#[derive(Default)]
struct SlowTransport {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl SlowTransport {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, request: &ProxyRequest) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(genbooth::services::image_gen::RequestPart::Text { text }) =
            request.contents.parts.last()
        {
            self.order.lock().unwrap().push(text.clone());
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        Ok(json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "data": "AAAA", "mimeType": "image/png" } }] },
                "finishReason": "STOP"
            }]
        })
        .to_string())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

fn generator(transport: Arc<SlowTransport>, limiter: ConcurrencyLimiter) -> ImageGenerator {
    let config = GeneratorConfig::default().with_retry(RetryConfig::immediate(1));
    ImageGenerator::with_transport(config, transport, limiter).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_at_most_two_calls_in_flight() {
    let transport = Arc::new(SlowTransport::default());
    let generator = generator(transport.clone(), ConcurrencyLimiter::new(2));

    let handles: Vec<_> = (0..7)
        .map(|i| {
            let generator = generator.clone();
            tokio::spawn(async move { generator.generate_prompt(format!("p{i}"), None).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    assert_eq!(transport.calls(), 7);
    assert_eq!(transport.peak(), 2);
    assert_eq!(generator.limiter().in_flight(), 0);
    assert_eq!(generator.limiter().available(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_calls_admitted_in_arrival_order() {
    let transport = Arc::new(SlowTransport::default());
    let generator = generator(transport.clone(), ConcurrencyLimiter::new(2));

    let mut handles = Vec::new();
    for i in 0..5 {
        let generator = generator.clone();
        handles.push(tokio::spawn(async move {
            generator.generate_prompt(format!("p{i}"), None).await
        }));
        // Let each task reach the limiter before spawning the next
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let order = transport.order.lock().unwrap().clone();
    assert_eq!(order, vec!["p0", "p1", "p2", "p3", "p4"]);
}

#[tokio::test(start_paused = true)]
async fn test_generators_sharing_limiter_share_slots() {
    let transport = Arc::new(SlowTransport::default());
    let limiter = ConcurrencyLimiter::new(2);
    let a = generator(transport.clone(), limiter.clone());
    let b = generator(transport.clone(), limiter);

    let mut handles = Vec::new();
    for i in 0..3 {
        let a = a.clone();
        let b = b.clone();
        handles.push(tokio::spawn(async move { a.generate_prompt(format!("a{i}"), None).await }));
        handles.push(tokio::spawn(async move { b.generate_prompt(format!("b{i}"), None).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.calls(), 6);
    assert_eq!(transport.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_separate_limiters_are_independent() {
    let transport = Arc::new(SlowTransport::default());
    let a = generator(transport.clone(), ConcurrencyLimiter::new(2));
    let b = generator(transport.clone(), ConcurrencyLimiter::new(2));

    let mut handles = Vec::new();
    for i in 0..2 {
        let a = a.clone();
        let b = b.clone();
        handles.push(tokio::spawn(async move { a.generate_prompt(format!("a{i}"), None).await }));
        handles.push(tokio::spawn(async move { b.generate_prompt(format!("b{i}"), None).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.peak(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_call_cancelled_while_queued_never_reaches_transport() {
    let transport = Arc::new(SlowTransport::default());
    let generator = generator(transport.clone(), ConcurrencyLimiter::new(1));

    let busy = {
        let generator = generator.clone();
        tokio::spawn(async move { generator.generate_prompt("first", None).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let cancel = CancellationToken::new();
    let queued = {
        let generator = generator.clone();
        let request = GenerationRequest::new("m", "second").with_cancellation(cancel.clone());
        tokio::spawn(async move { generator.generate(request).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    cancel.cancel();

    assert!(busy.await.unwrap().unwrap().is_some());
    assert!(queued.await.unwrap().unwrap().is_none());
    assert_eq!(transport.calls(), 1);
    assert_eq!(generator.limiter().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slot_released_after_failure() {
    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _request: &ProxyRequest) -> Result<String, TransportError> {
            Ok(json!({ "candidates": [] }).to_string())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    let limiter = ConcurrencyLimiter::new(2);
    let generator = ImageGenerator::with_transport(
        GeneratorConfig::default(),
        Arc::new(FailingTransport),
        limiter.clone(),
    )
    .unwrap();

    for _ in 0..4 {
        assert!(generator.generate_prompt("x", None).await.is_err());
    }
    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(limiter.available(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_closed_limiter_turns_away_queued_calls() {
    let transport = Arc::new(SlowTransport::default());
    let generator = generator(transport.clone(), ConcurrencyLimiter::new(1));

    let busy = {
        let generator = generator.clone();
        tokio::spawn(async move { generator.generate_prompt("first", None).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let queued = {
        let generator = generator.clone();
        tokio::spawn(async move { generator.generate_prompt("second", None).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    generator.limiter().close();

    assert!(busy.await.unwrap().unwrap().is_some());
    assert!(matches!(
        queued.await.unwrap(),
        Err(GenerationError::LimiterClosed)
    ));
    assert!(matches!(
        generator.generate_prompt("third", None).await,
        Err(GenerationError::LimiterClosed)
    ));
    assert_eq!(transport.calls(), 1);
    assert_eq!(generator.limiter().in_flight(), 0);
}
