//! Handler abstraction for consumers of sticker-change events.

use async_trait::async_trait;

use super::SongSticker;

/// Trait for downstream consumers of [`SongSticker`] events.
///
/// Each handler runs in its own task and receives the events of one service
/// in emission order. Handlers should not block indefinitely: nothing
/// enforces a timeout, and a stuck handler delays the group's shutdown.
///
/// # Example
///
/// ```ignore
/// struct PrintHandler;
///
/// #[async_trait]
/// impl SongStickerHandler for PrintHandler {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     async fn handle(&self, event: SongSticker) {
///         println!("{} {}={}", event.song_file, event.sticker_name, event.value);
///     }
/// }
/// ```
#[async_trait]
pub trait SongStickerHandler: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Applies one event. Failures are the handler's to log.
    async fn handle(&self, event: SongSticker);
}
