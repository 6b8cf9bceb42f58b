use super::{GpuReadbackCallback, GpuTaskCallback};
use crossbeam_channel::Receiver;
use molten_api::MoltenResult;

/// Turns task callbacks into channels, for code that would rather poll (or block on) a result than
/// react to it inside the callback.
pub struct GpuTaskCompletion;

impl GpuTaskCompletion {
    /// A callback for uploads and resizes, and the receiver its result is sent to
    pub fn channel() -> (GpuTaskCallback, Receiver<MoltenResult<()>>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let callback: GpuTaskCallback = Box::new(move |result| {
            // The receiver may have been dropped, nobody is waiting then
            let _ = tx.send(result);
        });
        (callback, rx)
    }

    /// A callback for readbacks, and the receiver the bytes are sent to
    pub fn readback_channel() -> (GpuReadbackCallback, Receiver<MoltenResult<Vec<u8>>>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let callback: GpuReadbackCallback = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (callback, rx)
    }
}
