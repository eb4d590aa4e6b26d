use std::future::Future;

use anyhow::Result;
use tokio::signal::unix::{self, SignalKind};

pub const TERMINATION_SIGNALS: [libc::c_int; 5] = [
    libc::SIGINT,
    libc::SIGTERM,
    libc::SIGQUIT,
    libc::SIGABRT,
    libc::SIGTSTP,
];

/// Drives `f` to completion unless one of [`TERMINATION_SIGNALS`] arrives first.
pub async fn run_or_terminate<F>(f: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let run_fut = tokio::spawn(f);
    let stop_fut = any_signal(TERMINATION_SIGNALS.map(SignalKind::from_raw))?;
    tokio::select! {
        res = run_fut => res?,
        signal = stop_fut => {
            tracing::info!(signal = signal.as_raw_value(), "received termination signal");
            Ok(())
        }
    }
}

/// Resolves with the first signal received out of `signals`.
pub fn any_signal<I>(signals: I) -> Result<impl Future<Output = SignalKind>>
where
    I: IntoIterator<Item = SignalKind>,
{
    let mut streams = Vec::new();
    for kind in signals {
        streams.push((kind, unix::signal(kind)?));
    }

    Ok(async move {
        let waiters = streams.iter_mut().map(|(kind, stream)| {
            let kind = *kind;
            Box::pin(async move {
                stream.recv().await;
                kind
            })
        });
        futures_util::future::select_all(waiters).await.0
    })
}
