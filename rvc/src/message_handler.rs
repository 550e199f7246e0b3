use crate::RvcFrame;

/// Trait for components that handle RV-C frames
///
/// The message loop hands every frame to every handler; each handler checks
/// the topic and message type and ignores what it is not interested in.
pub trait MessageHandler {
    /// Process an incoming RV-C frame
    fn handle_message(&mut self, frame: &RvcFrame);
}
