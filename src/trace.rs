//! Dump/trace sink, built on `tracing` instead of
//! hand-rolled `printf`-style output. Each layer emits a `tracing::event!`
//! at its own target (`dectmon::mac`, `dectmon::dlc`, `dectmon::nwk`);
//! the three `--dump-*` flags become an `EnvFilter` built once at
//! startup (see `src/cli.rs`), giving independent per-layer gating.

use tracing::{event, Level};

pub const TARGET_MAC: &str = "dectmon::mac";
pub const TARGET_DLC: &str = "dectmon::dlc";
pub const TARGET_NWK: &str = "dectmon::nwk";

/// Emits a MAC-layer trace line. `cluster` is always included as a
/// field so every line still carries a `"<cluster>: "` prefix.
pub fn mac(cluster: &str, message: &str) {
    event!(target: TARGET_MAC, Level::DEBUG, cluster, message);
}

pub fn dlc(cluster: &str, message: &str) {
    event!(target: TARGET_DLC, Level::DEBUG, cluster, message);
}

pub fn nwk(cluster: &str, message: &str) {
    event!(target: TARGET_NWK, Level::INFO, cluster, message);
}

/// Reports the lock/scan state machine's transitions, at
/// `dectmon::handle`. Always emitted regardless of the `--dump-*`
/// flags — lock state changes matter independent of layer dumps.
pub fn handle(cluster: &str, message: &str) {
    event!(target: "dectmon::handle", Level::INFO, cluster, message);
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::fmt::MakeWriter;

    struct CaptureWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    #[derive(Clone)]
    struct CaptureMakeWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
    impl<'a> MakeWriter<'a> for CaptureMakeWriter {
        type Writer = CaptureWriter;
        fn make_writer(&'a self) -> Self::Writer {
            CaptureWriter(self.0.clone())
        }
    }

    #[test]
    fn trace_line_contains_pari_display_format() {
        let buf = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(CaptureMakeWriter(buf.clone()))
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            super::handle("a", &format!("scan adopted {}", crate::ari::Pari::new(0x1234, 0x56789)));
        });
        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(out.contains("EMC: 1234 FPN: 56789"));
    }
}
