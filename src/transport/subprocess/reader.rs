//! Output reading logic for subprocess transport

use futures::StreamExt;
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::output::Utf8Decoder;

/// Spawn a background task forwarding decoded output chunks
///
/// The task ends at end-of-stream, on a read error, or when the receiver is
/// dropped. Chunks keep whatever boundaries the pipe delivered.
pub(super) fn spawn_output_reader(
    output: pipe::Receiver,
    tx: mpsc::UnboundedSender<String>,
    label: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut frames = FramedRead::new(output, BytesCodec::new());
        let mut decoder = Utf8Decoder::new();

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(bytes) => {
                    let text = decoder.push(&bytes);
                    if text.is_empty() {
                        continue;
                    }
                    if tx.send(text).is_err() {
                        // Receiver dropped, stop reading
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("[{label}] output read failed: {e}");
                    break;
                }
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            let _ = tx.send(rest);
        }
        log::debug!("[{label}] output stream closed");
    })
}
