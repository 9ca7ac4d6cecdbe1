//! Cumulative partial-text stream contracts and in-memory stream utilities.
//!
//! ```rust
//! use abackend::{BoxedPartialStream, VecPartialStream};
//!
//! let stream = VecPartialStream::new(vec![Ok("Cast".into()), Ok("Cast near".into())]);
//! let _boxed: BoxedPartialStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::BackendError;

/// Backend streaming contract.
///
/// Invariants for consumers:
/// - Every item is the full reply generated so far, never a fragment.
/// - Item lengths never decrease.
/// - The last `Ok` item is the complete reply.
/// - Once the stream yields `None` or an `Err`, it must not yield additional items.
/// - Dropping the stream before it ends is the only cancellation signal.
pub trait PartialTextStream: Stream<Item = Result<String, BackendError>> + Send {}

impl<T> PartialTextStream for T where T: Stream<Item = Result<String, BackendError>> + Send {}

pub type BoxedPartialStream<'a> = Pin<Box<dyn PartialTextStream + 'a>>;

#[derive(Debug)]
pub struct VecPartialStream {
    partials: VecDeque<Result<String, BackendError>>,
}

impl VecPartialStream {
    pub fn new(partials: Vec<Result<String, BackendError>>) -> Self {
        Self {
            partials: partials.into(),
        }
    }

    /// Builds a cumulative stream from delta fragments.
    pub fn from_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut text = String::new();
        let mut partials = VecDeque::new();
        for delta in deltas {
            let delta = delta.into();
            if delta.is_empty() {
                continue;
            }
            text.push_str(&delta);
            partials.push_back(Ok(text.clone()));
        }

        Self { partials }
    }
}

impl Stream for VecPartialStream {
    type Item = Result<String, BackendError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<String, BackendError>>> {
        Poll::Ready(self.partials.pop_front())
    }
}

/// Adapts a stream of delta fragments into a stream of cumulative partials.
///
/// Empty deltas are skipped. The first error ends the stream.
pub fn accumulate_deltas<S>(deltas: S) -> CumulativeText<S>
where
    S: Stream<Item = Result<String, BackendError>>,
{
    CumulativeText {
        deltas,
        text: String::new(),
        finished: false,
    }
}

pub struct CumulativeText<S> {
    deltas: S,
    text: String,
    finished: bool,
}

impl<S> Stream for CumulativeText<S>
where
    S: Stream<Item = Result<String, BackendError>> + Unpin,
{
    type Item = Result<String, BackendError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut this.deltas).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(Some(Ok(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    this.text.push_str(&delta);
                    return Poll::Ready(Some(Ok(this.text.clone())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::{VecPartialStream, accumulate_deltas};
    use crate::{BackendError, BackendErrorKind};

    #[tokio::test]
    async fn accumulate_deltas_grows_and_skips_empty_fragments() {
        let deltas = VecPartialStream::new(vec![
            Ok("Try ".to_string()),
            Ok(String::new()),
            Ok("a spinner".to_string()),
        ]);

        let partials = accumulate_deltas(deltas)
            .map(|item| item.expect("partial"))
            .collect::<Vec<_>>()
            .await;

        assert_eq!(partials, vec!["Try ".to_string(), "Try a spinner".to_string()]);
    }

    #[tokio::test]
    async fn accumulate_deltas_stops_after_first_error() {
        let deltas = VecPartialStream::new(vec![
            Ok("Use".to_string()),
            Err(BackendError::generation("decoder crashed")),
            Ok(" more".to_string()),
        ]);

        let items = accumulate_deltas(deltas).collect::<Vec<_>>().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref(), Ok("Use"));
        assert_eq!(
            items[1].as_ref().expect_err("error item").kind,
            BackendErrorKind::Generation
        );
    }

    #[tokio::test]
    async fn from_deltas_produces_cumulative_partials() {
        let partials = VecPartialStream::from_deltas(["Mack", "", "erel"])
            .map(|item| item.expect("partial"))
            .collect::<Vec<_>>()
            .await;

        assert_eq!(partials, vec!["Mack".to_string(), "Mackerel".to_string()]);
    }
}
