/// Download generator: streams `effective` bytes of random filler to a
/// consumer, one 64 KiB chunk at a time.
///
/// ```text
/// [StdRng] --chunk--> [ChunkSink] --> response body
///    ^                     |
///    +---- drained() <-----+  (only when write() reported saturation)
/// ```
///
/// Randomness keeps compressing middleboxes from inflating the measured
/// throughput.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::mpsc;

use crate::error::{SinkError, TransferError};
use crate::logging::TransferLogger;
use crate::session::{Finish, TerminalState, TransferSession};

/// Size of each generated chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks a [`ChannelSink`] buffers before it reports saturation.
pub const SINK_DEPTH: usize = 4;

/// Flow-controlled consumer of download chunks.
pub trait ChunkSink: Send {
    /// Hand over one chunk. `Ok(true)` means the consumer can take more
    /// right away, `Ok(false)` means its buffer is now saturated and the
    /// producer must wait for [`drained`](Self::drained).
    fn write(&mut self, chunk: Bytes) -> Result<bool, SinkError>;

    /// Resolves once the consumer has room again.
    fn drained(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Resolves once everything written has been taken by the consumer.
    fn finish(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// [`ChunkSink`] backed by a bounded channel whose receiving half is the
/// response body. Dropping the body closes the channel, which the sink
/// reports as [`SinkError::Disconnected`].
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

/// Create a sink and the body stream that drains it.
pub fn channel_sink(
    depth: usize,
) -> (ChannelSink, impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static) {
    let (tx, mut rx) = mpsc::channel::<Bytes>(depth.max(1));
    let body = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok(chunk);
        }
    };
    (ChannelSink { tx }, body)
}

impl ChunkSink for ChannelSink {
    fn write(&mut self, chunk: Bytes) -> Result<bool, SinkError> {
        match self.tx.try_send(chunk) {
            Ok(()) => Ok(self.tx.capacity() > 0),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkError::Disconnected),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(SinkError::Write("chunk offered to a saturated sink".into()))
            }
        }
    }

    async fn drained(&mut self) -> Result<(), SinkError> {
        self.tx
            .reserve()
            .await
            .map(drop)
            .map_err(|_| SinkError::Disconnected)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let depth = self.tx.max_capacity();
        self.tx
            .reserve_many(depth)
            .await
            .map(drop)
            .map_err(|_| SinkError::Disconnected)
    }
}

/// A prepared download: random source seeded, session open.
pub struct DownloadGenerator {
    session: TransferSession,
    rng: StdRng,
}

impl DownloadGenerator {
    /// Seed the random source and open the session.
    ///
    /// Seeding is the only fallible step and happens first, so a setup
    /// failure leaves no session (and no session logs) behind.
    pub fn prepare(
        requested: Option<&str>,
        effective: u64,
        logger: Arc<dyn TransferLogger>,
    ) -> Result<Self, TransferError> {
        let seeded = StdRng::try_from_os_rng().map_err(|e| TransferError::Setup(e.to_string()));
        Self::open(seeded, requested, effective, logger)
    }

    fn open(
        seeded: Result<StdRng, TransferError>,
        requested: Option<&str>,
        effective: u64,
        logger: Arc<dyn TransferLogger>,
    ) -> Result<Self, TransferError> {
        let rng = seeded?;
        let session = TransferSession::open_download(requested, effective, logger);
        Ok(Self { session, rng })
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    /// Stream every byte into `sink`. Never yields except while the sink
    /// is saturated or being flushed.
    pub async fn run<S: ChunkSink>(mut self, mut sink: S) -> TerminalState {
        let total = self.session.total_bytes();

        while self.session.bytes_so_far() < total {
            let len = (total - self.session.bytes_so_far()).min(CHUNK_SIZE as u64) as usize;
            let chunk = self.next_chunk(len);

            let ready = match sink.write(chunk) {
                Ok(ready) => ready,
                Err(e) => return self.abort(e),
            };
            self.session.record(len as u64);

            if !ready {
                if let Err(e) = sink.drained().await {
                    return self.abort(e);
                }
            }
        }

        if let Err(e) = sink.finish().await {
            return self.abort(e);
        }
        self.session.transition_to(Finish::Completed);
        TerminalState::Completed
    }

    fn next_chunk(&mut self, len: usize) -> Bytes {
        let mut buf = BytesMut::zeroed(len);
        self.rng.fill_bytes(&mut buf);
        buf.freeze()
    }

    fn abort(&mut self, err: SinkError) -> TerminalState {
        self.session.transition_to(Finish::Aborted {
            reason: err.to_string(),
        });
        TerminalState::Aborted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::StreamExt;

    use super::*;
    use crate::logging::TransferEvent;
    use crate::logging::testing::RecordingLogger;

    #[derive(Default)]
    struct MockState {
        chunks: Vec<usize>,
        buffered: usize,
        saturated: bool,
        drains: usize,
    }

    /// Saturates every `depth` chunks; can be told to disconnect.
    struct MockSink {
        state: Arc<Mutex<MockState>>,
        depth: usize,
        disconnect_after: Option<usize>,
        fail_finish: bool,
    }

    impl MockSink {
        fn new(depth: usize) -> (Self, Arc<Mutex<MockState>>) {
            let state = Arc::new(Mutex::new(MockState::default()));
            let sink = Self {
                state: state.clone(),
                depth,
                disconnect_after: None,
                fail_finish: false,
            };
            (sink, state)
        }
    }

    impl ChunkSink for MockSink {
        fn write(&mut self, chunk: Bytes) -> Result<bool, SinkError> {
            let mut s = self.state.lock().unwrap();
            assert!(!s.saturated, "chunk produced while sink saturated");
            if self.disconnect_after == Some(s.chunks.len()) {
                return Err(SinkError::Disconnected);
            }
            s.chunks.push(chunk.len());
            s.buffered += 1;
            s.saturated = s.buffered >= self.depth;
            Ok(!s.saturated)
        }

        async fn drained(&mut self) -> Result<(), SinkError> {
            let mut s = self.state.lock().unwrap();
            s.drains += 1;
            s.buffered = 0;
            s.saturated = false;
            Ok(())
        }

        async fn finish(&mut self) -> Result<(), SinkError> {
            if self.fail_finish {
                Err(SinkError::Write("socket closed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn generator(size: u64, logger: &Arc<RecordingLogger>) -> DownloadGenerator {
        DownloadGenerator::prepare(Some(size.to_string().as_str()), size, logger.clone()).unwrap()
    }

    #[tokio::test]
    async fn writes_exact_size_in_64k_chunks() {
        let logger = Arc::new(RecordingLogger::default());
        let size = 3 * CHUNK_SIZE as u64 + 100;
        let (sink, state) = MockSink::new(2);

        let outcome = generator(size, &logger).run(sink).await;

        assert_eq!(outcome, TerminalState::Completed);
        let s = state.lock().unwrap();
        assert_eq!(s.chunks, vec![CHUNK_SIZE, CHUNK_SIZE, CHUNK_SIZE, 100]);
        assert_eq!(s.chunks.iter().sum::<usize>() as u64, size);
        // Saturated after the 2nd and 4th chunk.
        assert_eq!(s.drains, 2);

        let terminal = logger.terminal_events();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(terminal[0], TransferEvent::Completed { bytes, .. } if bytes == size));
    }

    #[test]
    fn failed_seeding_opens_no_session() {
        let logger = Arc::new(RecordingLogger::default());
        let seeded = Err(TransferError::Setup("no entropy".into()));

        let prepared = DownloadGenerator::open(seeded, Some("4096"), 4096, logger.clone());

        assert!(matches!(prepared, Err(TransferError::Setup(_))));
        assert!(logger.events().is_empty());
    }

    #[tokio::test]
    async fn single_byte_download() {
        let logger = Arc::new(RecordingLogger::default());
        let (sink, state) = MockSink::new(1);

        assert_eq!(generator(1, &logger).run(sink).await, TerminalState::Completed);
        assert_eq!(state.lock().unwrap().chunks, vec![1]);
    }

    #[tokio::test]
    async fn disconnect_mid_stream_aborts_once() {
        let logger = Arc::new(RecordingLogger::default());
        let (mut sink, state) = MockSink::new(8);
        sink.disconnect_after = Some(2);

        let outcome = generator(10 * CHUNK_SIZE as u64, &logger).run(sink).await;

        assert_eq!(outcome, TerminalState::Aborted);
        assert_eq!(state.lock().unwrap().chunks.len(), 2);
        let terminal = logger.terminal_events();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(
            terminal[0],
            TransferEvent::Aborted { bytes, .. } if bytes == 2 * CHUNK_SIZE as u64
        ));
    }

    #[tokio::test]
    async fn failed_flush_is_an_abort() {
        let logger = Arc::new(RecordingLogger::default());
        let (mut sink, _) = MockSink::new(4);
        sink.fail_finish = true;

        let outcome = generator(1000, &logger).run(sink).await;

        assert_eq!(outcome, TerminalState::Aborted);
        assert_eq!(logger.terminal_events().len(), 1);
    }

    #[tokio::test]
    async fn channel_sink_delivers_every_byte() {
        let logger = Arc::new(RecordingLogger::default());
        let size = 5 * CHUNK_SIZE as u64 + 7;
        let (sink, body) = channel_sink(2);

        let task = tokio::spawn(generator(size, &logger).run(sink));
        let chunks: Vec<Bytes> = body.map(|c| c.unwrap()).collect().await;

        assert_eq!(task.await.unwrap(), TerminalState::Completed);
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total as u64, size);
        assert!(chunks[0].iter().any(|&b| b != 0), "chunk should be random filler");
        assert_ne!(chunks[0], chunks[1]);
    }

    #[tokio::test]
    async fn dropping_body_aborts_generator() {
        let logger = Arc::new(RecordingLogger::default());
        let (sink, body) = channel_sink(1);

        let task = tokio::spawn(generator(50 * CHUNK_SIZE as u64, &logger).run(sink));
        let mut body = Box::pin(body);
        assert!(body.next().await.is_some());
        drop(body);

        assert_eq!(task.await.unwrap(), TerminalState::Aborted);
        let terminal = logger.terminal_events();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(terminal[0], TransferEvent::Aborted { .. }));
    }

    #[tokio::test]
    async fn channel_sink_reports_saturation() {
        let (mut sink, body) = channel_sink(2);
        assert_eq!(sink.write(Bytes::from_static(b"a")), Ok(true));
        assert_eq!(sink.write(Bytes::from_static(b"b")), Ok(false));

        let mut body = Box::pin(body);
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(sink.drained().await, Ok(()));
        drop(body);
        assert_eq!(sink.write(Bytes::from_static(b"c")), Err(SinkError::Disconnected));
    }
}
