//! Plain-text report of a replayed scene.

use std::fmt;

use tessera::{notification::Notification, registry::VisualModelRegistry};

/// The visual models left after replaying a scene, followed by the
/// notifications the actions produced.
pub struct Report<'a> {
    registry: &'a VisualModelRegistry,
    notifications: &'a [Notification],
}

impl<'a> Report<'a> {
    pub fn new(registry: &'a VisualModelRegistry, notifications: &'a [Notification]) -> Self {
        Self {
            registry,
            notifications,
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for model in self.registry.available_visual_models() {
            writeln!(
                f,
                "visual model {} \"{}\" ({} entities)",
                model.id(),
                model.label(),
                model.len()
            )?;
            for entity in model.entities() {
                writeln!(f, "  {entity}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "notifications")?;
        for notification in self.notifications {
            let status = if notification.is_error() { "error" } else { "ok" };
            writeln!(f, "  {status:<5} {}", notification.message())?;
        }
        Ok(())
    }
}
