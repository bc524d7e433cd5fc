//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for timeouts and cancellation.

mod common;

use common::{open_pair, EventLog};
use nanomessage::codec::MessageInfo;
use nanomessage::{handler_fn, BoxError, NanomessageError, Reply, RequestOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn slow_echo(delay: Duration) -> impl nanomessage::MessageHandler<String> {
    handler_fn(move |data: String, _info: MessageInfo| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, BoxError>(Reply::Data(data))
    })
}

#[tokio::test(start_paused = true)]
async fn test_request_times_out() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_secs(10)));
    alice.set_request_timeout(Some(Duration::from_millis(100)));

    let started = Instant::now();
    let error = alice.request("slow".to_string()).await.unwrap_err();

    assert!(error.is_timeout());
    assert!(matches!(error, NanomessageError::Timeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(alice.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_response_is_dropped() {
    let (alice, bob) = open_pair::<String>().await;
    let alice_events = EventLog::attach(&alice);
    bob.set_message_handler(slow_echo(Duration::from_millis(200)));

    let error = alice
        .request_with(
            "late".to_string(),
            RequestOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(error.is_timeout());

    // The response arrives for an id nobody waits for anymore.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(alice.pending_requests(), 0);
    assert_eq!(alice_events.count("decode-error"), 0);

    bob.set_message_handler(slow_echo(Duration::ZERO));
    assert_eq!(alice.request("again".to_string()).await.unwrap(), "again");
}

#[tokio::test(start_paused = true)]
async fn test_per_request_timeout_overrides_default() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_millis(300)));
    alice.set_request_timeout(Some(Duration::from_millis(100)));

    let response = alice
        .request_with(
            "patient".to_string(),
            RequestOptions::new().with_timeout(Duration::from_secs(1)),
        )
        .await;
    assert_eq!(response.unwrap(), "patient");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_covers_queue_wait() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_secs(10)));
    alice.set_concurrency(nanomessage::Concurrency {
        incoming: 0,
        outgoing: 1,
    });
    alice.set_request_timeout(Some(Duration::from_millis(100)));

    let started = Instant::now();
    let first = alice.request("first".to_string());
    let second = alice.request("second".to_string());
    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap_err().is_timeout());
    assert!(second.unwrap_err().is_timeout());
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_wins_over_later_timeout() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_secs(10)));

    let pending = alice
        .start_request(
            "cancel me".to_string(),
            RequestOptions::new().with_timeout(Duration::from_millis(100)),
        )
        .unwrap();
    let canceller = pending.canceller();
    let id = pending.id();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(canceller.cancel_with("changed my mind"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let error = pending.response().await.unwrap_err();
    assert_eq!(
        error,
        NanomessageError::Cancel {
            id,
            reason: Some("changed my mind".to_string())
        }
    );
    assert!(!canceller.cancel());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_wins_over_later_cancel() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_secs(10)));

    let pending = alice
        .start_request(
            "time me out".to_string(),
            RequestOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .unwrap();
    let canceller = pending.canceller();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!canceller.cancel());
    assert!(pending.response().await.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_token_cancels_request_and_notifies() {
    let (alice, bob) = open_pair::<String>().await;
    bob.set_message_handler(slow_echo(Duration::from_secs(10)));
    let notified = Arc::new(AtomicUsize::new(0));

    let token = CancellationToken::new();
    let counter = notified.clone();
    let request = alice.request_with(
        "watch the token".to_string(),
        RequestOptions::new()
            .with_signal(token.clone())
            .with_on_cancel(move |_id| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
    );

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(request, canceller);

    assert!(result.unwrap_err().is_cancel());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(alice.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_token_fails_immediately() {
    let (alice, bob) = open_pair::<String>().await;
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();
    bob.set_message_handler(handler_fn(move |data: String, _info: MessageInfo| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(Reply::Data(data))
        }
    }));

    let token = CancellationToken::new();
    token.cancel();

    let error = alice
        .request_with(
            "never sent".to_string(),
            RequestOptions::new().with_signal(token),
        )
        .await
        .unwrap_err();
    assert!(error.is_cancel());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_response_never_reaches_a_newer_request() {
    let (alice, bob) = open_pair::<String>().await;
    let alice_events = EventLog::attach(&alice);
    bob.set_message_handler(handler_fn(|data: String, _info: MessageInfo| async move {
        if data == "slow" {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok::<_, BoxError>(Reply::Data(format!("{data} answered")))
    }));

    let error = alice
        .request_with(
            "slow".to_string(),
            RequestOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(error.is_timeout());

    // Still outstanding when the late answer to "slow" arrives.
    let pending = alice
        .start_request("waiting".to_string(), RequestOptions::default())
        .unwrap();
    assert_ne!(pending.id(), 1);
    bob.set_message_handler(handler_fn(|data: String, _info: MessageInfo| async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok::<_, BoxError>(Reply::Data(format!("{data} answered")))
    }));

    // The late response to "slow" arrives meanwhile and gives id 1 back.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let after = alice
        .start_request("after".to_string(), RequestOptions::default())
        .unwrap();
    assert_eq!(after.id(), 1);

    assert_eq!(pending.response().await.unwrap(), "waiting answered");
    assert_eq!(after.response().await.unwrap(), "after answered");
    assert_eq!(alice.pending_requests(), 0);
    assert_eq!(alice_events.created_ids(), vec![1, 2, 1]);
}
