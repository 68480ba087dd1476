//! Ready-made [`Computation`] implementations.

use anyhow::anyhow;

use crate::process::{Computation, Outputs, Step};

/// Resolves on the first poll.
pub fn ready<T>(outputs: Outputs<T>) -> Immediate<T> {
    Immediate {
        outputs: Some(outputs),
    }
}

/// Stays pending for `polls` polls, then resolves.
pub fn delayed<T>(polls: usize, outputs: Outputs<T>) -> Delayed<T> {
    Delayed {
        remaining: polls,
        outputs: Some(outputs),
    }
}

/// Drives the computation with a closure, one call per poll.
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step<T>>,
{
    FromFn(f)
}

/// See [`ready`].
#[derive(Debug)]
pub struct Immediate<T> {
    outputs: Option<Outputs<T>>,
}

impl<T> Computation<T> for Immediate<T> {
    fn poll(&mut self) -> anyhow::Result<Step<T>> {
        self.outputs
            .take()
            .map(Step::Ready)
            .ok_or_else(|| anyhow!("computation polled after completion"))
    }
}

/// See [`delayed`].
#[derive(Debug)]
pub struct Delayed<T> {
    remaining: usize,
    outputs: Option<Outputs<T>>,
}

impl<T> Computation<T> for Delayed<T> {
    fn poll(&mut self) -> anyhow::Result<Step<T>> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(Step::Pending);
        }
        self.outputs
            .take()
            .map(Step::Ready)
            .ok_or_else(|| anyhow!("computation polled after completion"))
    }
}

/// See [`from_fn`].
pub struct FromFn<F>(F);

impl<T, F> Computation<T> for FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step<T>>,
{
    fn poll(&mut self) -> anyhow::Result<Step<T>> {
        (self.0)()
    }
}

#[cfg(feature = "async-process")]
pub use self::future::{from_future, FutureComputation};

#[cfg(feature = "async-process")]
mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll, Wake, Waker};

    use crate::process::{Computation, Outputs, Step};

    /// Polls a future once per tick.
    ///
    /// The engine never sleeps, so the future is driven with a waker that does
    /// nothing; progress happens only when the graph is ticked.
    pub fn from_future<T, F>(future: F) -> FutureComputation<T>
    where
        F: Future<Output = anyhow::Result<Outputs<T>>> + 'static,
    {
        FutureComputation {
            future: Some(Box::pin(future)),
            waker: Waker::from(Arc::new(NoopWake)),
        }
    }

    struct NoopWake;

    impl Wake for NoopWake {
        fn wake(self: Arc<Self>) {}
    }

    /// See [`from_future`].
    pub struct FutureComputation<T> {
        future: Option<Pin<Box<dyn Future<Output = anyhow::Result<Outputs<T>>>>>>,
        waker: Waker,
    }

    impl<T> Computation<T> for FutureComputation<T> {
        fn poll(&mut self) -> anyhow::Result<Step<T>> {
            let Some(future) = self.future.as_mut() else {
                anyhow::bail!("computation polled after completion");
            };
            let mut cx = Context::from_waker(&self.waker);
            match future.as_mut().poll(&mut cx) {
                Poll::Pending => Ok(Step::Pending),
                Poll::Ready(result) => {
                    self.future = None;
                    result.map(Step::Ready)
                }
            }
        }
    }
}
