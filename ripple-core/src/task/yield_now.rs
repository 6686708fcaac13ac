use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Suspension point for async Reactive and Observer bodies.
///
/// The first poll wakes the task and returns `Pending`, handing control
/// back to the coordinator, which resumes every other ready task before
/// this one. Outside a coordinator it simply yields to the host executor.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
