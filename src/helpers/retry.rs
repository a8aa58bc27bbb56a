// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

/// Exponential backoff between two attempts
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(30),
        }
    }
}

/// Run `operation` until it succeeds, `retryable` rejects its error, or the next
/// attempt would start after `deadline`. The last error is returned.
pub async fn retry_until<T, E, F, Fut, R>(
    deadline: Instant,
    backoff: Backoff,
    retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = backoff.initial;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let jitter = rand::thread_rng().gen_range(0.8..1.2);
                let wait = delay.mul_f64(jitter);
                if !retryable(&err) || Instant::now() + wait >= deadline {
                    return Err(err);
                }
                debug!(attempt, error = %err, "retrying in {wait:?}");
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(backoff.max);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: Backoff = Backoff {
        initial: Duration::from_millis(1),
        max: Duration::from_millis(4),
    };

    #[tokio::test]
    async fn succeeds_after_failures() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<usize, String> = retry_until(
            Instant::now() + Duration::from_secs(5),
            FAST,
            |_| true,
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(format!("attempt {n}"))
                } else {
                    Ok(n)
                }
            },
        )
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn stops_on_permanent_error() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), String> = retry_until(
            Instant::now() + Duration::from_secs(5),
            FAST,
            |err: &String| err != "fatal",
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_owned())
            },
        )
        .await;
        assert_eq!(result, Err("fatal".to_owned()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_at_deadline() {
        let result: Result<(), String> = retry_until(
            Instant::now() + Duration::from_millis(20),
            FAST,
            |_| true,
            || async { Err("still failing".to_owned()) },
        )
        .await;
        assert_eq!(result, Err("still failing".to_owned()));
    }
}
