/// Render-thread command queue
///
/// Small named closures scheduled from any thread and run in submission order
/// at the next frame boundary. Resource re-initialization goes through here so
/// platform objects are only rebuilt between frames.

use std::sync::Mutex;
use crate::graphics::graphics_helper::GraphicsHelper;

pub type RenderCommandFn = Box<dyn FnOnce(&GraphicsHelper) + Send>;

struct RenderCommand {
    name: String,
    run: RenderCommandFn,
}

#[derive(Default)]
pub struct RenderCommandQueue {
    commands: Mutex<Vec<RenderCommand>>,
}

impl RenderCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_command(&self, name: impl Into<String>, command: RenderCommandFn) {
        let name = name.into();
        crate::rhi_trace!("rhi::RenderCommandQueue", "Queued command {}", name);
        self.lock_commands().push(RenderCommand { name, run: command });
    }

    /// Run every command queued so far, returns how many ran
    ///
    /// Commands queued while flushing run on the next flush.
    pub fn flush(&self, helper: &GraphicsHelper) -> usize {
        let commands = std::mem::take(&mut *self.lock_commands());
        let count = commands.len();
        for command in commands {
            crate::rhi_trace!("rhi::RenderCommandQueue", "Running command {}", command.name);
            (command.run)(helper);
        }
        count
    }

    /// Drop every pending command without running it
    pub fn clear(&self) -> usize {
        let dropped = std::mem::take(&mut *self.lock_commands());
        dropped.len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_commands().len()
    }

    pub fn pending_names(&self) -> Vec<String> {
        self.lock_commands().iter().map(|command| command.name.clone()).collect()
    }

    fn lock_commands(&self) -> std::sync::MutexGuard<'_, Vec<RenderCommand>> {
        self.commands.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
