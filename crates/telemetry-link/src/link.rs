//! Telemetry Link Reader
//!
//! Consumes the sensor feed line by line and publishes every accepted
//! distance to a [`DistanceStore`]. Bad lines and transient read failures
//! never leave this module; they are counted and the loop carries on.

use crate::error::LinkError;
use crate::protocol::parse_line;
use crate::reading::DistanceReading;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

/// Pause after a failed read before polling the link again
const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Longest line kept in memory; longer lines are skipped and rejected
pub const MAX_LINE_BYTES: u64 = 64;

type LinkReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Destination for accepted distance readings
pub trait DistanceStore: Send + Sync {
    /// Replace the stored reading
    fn store_distance(&self, reading: DistanceReading);
}

/// Counters reported when the link loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Lines parsed and stored
    pub accepted: u64,
    /// Lines dropped as malformed
    pub rejected: u64,
    /// Failed reads
    pub io_errors: u64,
}

/// Reader side of the sensor link
pub struct TelemetryLink {
    /// `None` when no sensor link was found at startup
    reader: Option<LinkReader>,
    /// Back-off after a failed read
    poll_interval: Duration,
    /// Line buffer, reused across reads
    line: Vec<u8>,
}

impl TelemetryLink {
    /// Create a link over any byte stream (serial read half, pipe, test buffer)
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        info!("Creating telemetry link");
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            reader: Some(BufReader::new(reader)),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            line: Vec::with_capacity(16),
        }
    }

    /// Create a degraded link: no sensor hardware, distance stays at the sentinel
    pub fn absent() -> Self {
        warn!(
            "Sensor link not connected; distance fixed at {} cm, proximity checks disabled",
            DistanceReading::SENTINEL.cm()
        );
        Self {
            reader: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            line: Vec::new(),
        }
    }

    /// Set the back-off used after a failed read
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether the link is running without hardware
    pub fn is_degraded(&self) -> bool {
        self.reader.is_none()
    }

    /// Read the next line and parse it
    pub async fn read_reading(&mut self) -> Result<DistanceReading, LinkError> {
        let reader = self.reader.as_mut().ok_or(LinkError::Absent)?;

        self.line.clear();
        let read = (&mut *reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut self.line)
            .await?;
        if read == 0 {
            return Err(LinkError::Closed);
        }

        if read as u64 == MAX_LINE_BYTES && self.line.last() != Some(&b'\n') {
            // Drain the rest of the line in bounded chunks
            loop {
                self.line.clear();
                let skipped = (&mut *reader)
                    .take(MAX_LINE_BYTES)
                    .read_until(b'\n', &mut self.line)
                    .await?;
                if skipped == 0 || self.line.last() == Some(&b'\n') {
                    break;
                }
            }
            self.line.clear();
            return Err(LinkError::MalformedLine(format!(
                "line longer than {} bytes",
                MAX_LINE_BYTES
            )));
        }

        parse_line(&String::from_utf8_lossy(&self.line))
    }

    /// Run until the link closes, publishing every accepted reading
    pub async fn run<S>(mut self, store: &S) -> LinkStats
    where
        S: DistanceStore + ?Sized,
    {
        let mut stats = LinkStats::default();
        if self.is_degraded() {
            debug!("Telemetry link degraded; reader not started");
            return stats;
        }

        info!("Telemetry link running");
        let mut consecutive_errors = 0u32;

        loop {
            match self.read_reading().await {
                Ok(reading) => {
                    consecutive_errors = 0;
                    stats.accepted += 1;
                    metrics::counter!("telemetry_lines_accepted_total").increment(1);
                    store.store_distance(reading);
                }
                Err(LinkError::MalformedLine(line)) => {
                    stats.rejected += 1;
                    metrics::counter!("telemetry_lines_rejected_total").increment(1);
                    debug!("Dropping telemetry line {:?}", line);
                }
                Err(LinkError::Closed) => {
                    warn!("Sensor link closed; keeping last distance reading");
                    break;
                }
                Err(LinkError::Absent) => break,
                Err(e) => {
                    stats.io_errors += 1;
                    consecutive_errors += 1;
                    if consecutive_errors == 1 {
                        warn!("Telemetry read failed: {}", e);
                    } else {
                        debug!("Telemetry read failed ({} in a row): {}", consecutive_errors, e);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        info!(
            "Telemetry link stopped (accepted={}, rejected={}, io_errors={})",
            stats.accepted, stats.rejected, stats.io_errors
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[derive(Default)]
    struct RecordingStore {
        readings: Mutex<Vec<u32>>,
    }

    impl DistanceStore for RecordingStore {
        fn store_distance(&self, reading: DistanceReading) {
            self.readings.lock().unwrap().push(reading.cm());
        }
    }

    impl RecordingStore {
        fn readings(&self) -> Vec<u32> {
            self.readings.lock().unwrap().clone()
        }
    }

    /// Fails a fixed number of reads, then serves `data` and hits EOF
    struct FlakyReader {
        failures_left: u32,
        data: &'static [u8],
    }

    impl AsyncRead for FlakyReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "unplugged")));
            }
            let data = self.data;
            let (head, tail) = data.split_at(buf.remaining().min(data.len()));
            buf.put_slice(head);
            self.data = tail;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_valid_lines_update_store() {
        let store = RecordingStore::default();
        let link = TelemetryLink::new(&b"D:87\r\nD:24\r\nD:3\r\n"[..]);

        let stats = link.run(&store).await;

        assert_eq!(store.readings(), vec![87, 24, 3]);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 0);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_dropped() {
        let store = RecordingStore::default();
        let link = TelemetryLink::new(&b"booting\nD:40\nD:x\n\xff\xfe\nD:-1\nD:12\n"[..]);

        let stats = link.run(&store).await;

        assert_eq!(store.readings(), vec![40, 12]);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 4);
    }

    #[tokio::test]
    async fn test_overlong_line_is_skipped() {
        let mut data = b"D:7\n".to_vec();
        data.extend(std::iter::repeat(b'x').take(10_000));
        data.extend_from_slice(b"\nD:8\n");

        let store = RecordingStore::default();
        let mut link = TelemetryLink::new(io::Cursor::new(data));
        assert_eq!(link.read_reading().await.unwrap().cm(), 7);
        assert!(matches!(link.read_reading().await, Err(LinkError::MalformedLine(_))));
        assert!(link.line.capacity() <= 2 * MAX_LINE_BYTES as usize);

        let stats = link.run(&store).await;
        assert_eq!(store.readings(), vec![8]);
        assert_eq!(stats.rejected, 0);
    }

    #[tokio::test]
    async fn test_overlong_line_counted_as_rejected() {
        let mut data = vec![b'9'; 500];
        data.extend_from_slice(b"\nD:30\n");

        let store = RecordingStore::default();
        let stats = TelemetryLink::new(io::Cursor::new(data)).run(&store).await;

        assert_eq!(store.readings(), vec![30]);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.accepted, 1);
    }

    #[tokio::test]
    async fn test_trailing_partial_line_is_parsed() {
        let store = RecordingStore::default();
        let stats = TelemetryLink::new(&b"D:5\nD:6"[..]).run(&store).await;

        assert_eq!(store.readings(), vec![5, 6]);
        assert_eq!(stats.accepted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_are_retried() {
        let store = RecordingStore::default();
        let reader = FlakyReader {
            failures_left: 3,
            data: b"D:55\n",
        };

        let stats = TelemetryLink::new(reader).run(&store).await;

        assert_eq!(stats.io_errors, 3);
        assert_eq!(store.readings(), vec![55]);
    }

    #[tokio::test]
    async fn test_absent_link_is_degraded() {
        let store = RecordingStore::default();
        let mut link = TelemetryLink::absent();
        assert!(link.is_degraded());
        assert!(matches!(link.read_reading().await, Err(LinkError::Absent)));

        let stats = link.run(&store).await;
        assert_eq!(stats, LinkStats::default());
        assert!(store.readings().is_empty());
    }

    #[tokio::test]
    async fn test_read_reading_reports_close() {
        let mut link = TelemetryLink::new(&b"D:9\n"[..]);
        assert_eq!(link.read_reading().await.unwrap().cm(), 9);
        assert!(matches!(link.read_reading().await, Err(LinkError::Closed)));
    }
}
