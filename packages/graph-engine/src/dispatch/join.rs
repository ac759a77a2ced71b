//! Sibling join used for every selection set and list

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::LocalBoxFuture;

enum Entry<'a, T> {
    Running(LocalBoxFuture<'a, T>),
    Done(Option<T>),
}

/// Future that polls every unfinished sibling on each poll
///
/// All siblings therefore reach their first suspension point in the same
/// wave, which is what lets their loads share one batch. An output for
/// which `stop` holds ends the join at once; the siblings still running are
/// dropped unpolled.
pub(crate) struct JoinWave<'a, T> {
    entries: Vec<Entry<'a, T>>,
    stop: fn(&T) -> bool,
}

// Outputs are moved out by value and never pinned.
impl<T> Unpin for JoinWave<'_, T> {}

pub(crate) fn join_wave<'a, T>(
    futures: Vec<LocalBoxFuture<'a, T>>,
    stop: fn(&T) -> bool,
) -> JoinWave<'a, T> {
    JoinWave {
        entries: futures.into_iter().map(Entry::Running).collect(),
        stop,
    }
}

impl<T> Future for JoinWave<'_, T> {
    /// Every output in input order, or the output that stopped the join
    type Output = Result<Vec<T>, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let stop = this.stop;
        let mut all_done = true;
        let mut stopped = None;
        for entry in this.entries.iter_mut() {
            if let Entry::Running(future) = entry {
                match future.as_mut().poll(cx) {
                    Poll::Ready(output) if stop(&output) => {
                        stopped = Some(output);
                        break;
                    }
                    Poll::Ready(output) => *entry = Entry::Done(Some(output)),
                    Poll::Pending => all_done = false,
                }
            }
        }
        if let Some(output) = stopped {
            this.entries.clear();
            return Poll::Ready(Err(output));
        }
        if !all_done {
            return Poll::Pending;
        }

        let outputs = this
            .entries
            .iter_mut()
            .filter_map(|entry| match entry {
                Entry::Done(output) => output.take(),
                Entry::Running(_) => None,
            })
            .collect();
        Poll::Ready(Ok(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_outputs_follow_input_order() {
        let futures = vec![
            async { 1 }.boxed_local(),
            async {
                tokio::task::yield_now().await;
                2
            }
            .boxed_local(),
            async { 3 }.boxed_local(),
        ];
        assert_eq!(join_wave(futures, |_| false).await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_every_sibling_starts_before_first_poll_returns() {
        let started = RefCell::new(Vec::new());
        let futures: Vec<_> = (0..64)
            .map(|i| {
                let started = &started;
                async move {
                    started.borrow_mut().push(i);
                    std::future::pending::<()>().await;
                }
                .boxed_local()
            })
            .collect();

        let mut join = join_wave(futures, |_| false);
        assert!(futures_util::poll!(&mut join).is_pending());
        assert_eq!(started.borrow().len(), 64);
    }

    #[tokio::test]
    async fn test_empty_join_is_ready() {
        let none: Vec<LocalBoxFuture<'_, u8>> = Vec::new();
        assert_eq!(join_wave(none, |_| false).await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_stop_output_drops_running_siblings() {
        let polled = RefCell::new(Vec::new());
        let futures: Vec<LocalBoxFuture<'_, i32>> = vec![
            async {
                polled.borrow_mut().push("slow");
                std::future::pending::<()>().await;
                1
            }
            .boxed_local(),
            async { -1 }.boxed_local(),
            async {
                polled.borrow_mut().push("after");
                3
            }
            .boxed_local(),
        ];

        let mut join = join_wave(futures, |n| *n < 0);
        assert_eq!(futures_util::poll!(&mut join), Poll::Ready(Err(-1)));
        assert_eq!(*polled.borrow(), vec!["slow"]);
    }
}
