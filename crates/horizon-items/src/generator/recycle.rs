//! FIFO of discarded containers awaiting reuse.

use std::collections::VecDeque;

use super::container::{ContainerId, ContainerType};
use super::error::{GeneratorError, Result};

/// Recycled containers of one container type.
///
/// The first container pushed fixes the type; pushing a container of another
/// type fails until the queue has drained.
#[derive(Debug, Default)]
pub(crate) struct RecycleQueue {
    containers: VecDeque<ContainerId>,
    container_type: Option<ContainerType>,
}

impl RecycleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn container_type(&self) -> Option<ContainerType> {
        self.container_type.filter(|_| !self.containers.is_empty())
    }

    /// Fails if the queue already holds containers of another type.
    pub fn check(&self, offered: ContainerType) -> Result<()> {
        match self.container_type() {
            Some(queued) if queued != offered => {
                Err(GeneratorError::HeterogeneousRecycle { queued, offered })
            }
            _ => Ok(()),
        }
    }

    pub fn push(&mut self, container: ContainerId, container_type: ContainerType) -> Result<()> {
        self.check(container_type)?;
        self.container_type = Some(container_type);
        self.containers.push_back(container);
        Ok(())
    }

    /// Takes the oldest container if the queue holds `wanted` containers.
    pub fn pop(&mut self, wanted: ContainerType) -> Option<ContainerId> {
        if self.container_type() != Some(wanted) {
            return None;
        }
        self.containers.pop_front()
    }

    pub fn drain(&mut self) -> Vec<ContainerId> {
        self.container_type = None;
        self.containers.drain(..).collect()
    }
}
