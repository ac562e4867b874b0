//! Media player bridge trait.
//!
//! The live video player (an embedded web player, a native view, ...) is owned
//! by the host. The core only ever talks to it through this trait and never
//! controls its lifetime: hosts keep the `Arc` and hand the core a reference
//! once the player reports readiness.

use crate::error::Result;

/// Commands and queries the core issues against a live player.
///
/// Calls are synchronous because host players expose them as plain method
/// calls; implementations must not block on I/O.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::player::MediaPlayer;
///
/// fn jump(player: &dyn MediaPlayer) -> bridge_traits::error::Result<()> {
///     player.seek_to(42.0)?;
///     player.play()
/// }
/// ```
pub trait MediaPlayer: Send + Sync {
    /// Move the playhead to `seconds` from the start of the media.
    fn seek_to(&self, seconds: f64) -> Result<()>;

    /// Start or resume playback.
    fn play(&self) -> Result<()>;

    /// Pause playback, keeping the playhead where it is.
    fn pause(&self) -> Result<()>;

    /// Current playhead position in seconds.
    ///
    /// Players may report non-finite values while media is loading; callers
    /// are expected to filter them.
    fn current_time(&self) -> Result<f64>;
}
