//! Ordered, append-only command buffer.

use super::Command;
use crate::error::Result;

/// Commands queued for the client, in replay order.
///
/// A buffer belongs to exactly one response and is never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one command at the end.
    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Drop every queued command.
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over queued commands in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Serialize the buffer as a compact JSON array.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.commands)?)
    }

    /// Serialize the buffer, then clear it.
    pub fn drain_json(&mut self) -> Result<String> {
        let json = self.serialize()?;
        self.commands.clear();
        Ok(json)
    }
}

impl<'a> IntoIterator for &'a CommandBuffer {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
