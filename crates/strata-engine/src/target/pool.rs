use std::collections::HashMap;

use crate::render::{RenderContext, RenderError, TargetId};

/// A pooled offscreen target, exclusively owned while checked out.
///
/// Not `Clone`: handing the handle back to [`RenderTargetPool::release`] is
/// the only way to return it.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    id: TargetId,
    size: u32,
}

impl RenderTarget {
    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Edge length in pixels; targets are square.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SlotState {
    CheckedOut,
    Pooled,
}

#[derive(Debug)]
struct Slot {
    size: u32,
    state: SlotState,
}

/// Allocation counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Targets whose GPU storage was allocated.
    pub created: u64,
    /// Acquisitions served from a free list.
    pub reused: u64,
}

/// Square render targets recycled by size.
///
/// GPU storage is allocated once per slot (a `CreateTarget` command recorded
/// on first acquisition) and never freed by `release`; released targets go
/// onto their size's free list and the most recently released one is handed
/// out first.
#[derive(Debug, Default)]
pub struct RenderTargetPool {
    slots: Vec<Slot>,
    free: HashMap<u32, Vec<TargetId>>,
    stats: PoolStats,
}

impl RenderTargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks out a `size`×`size` target.
    pub fn acquire(&mut self, ctx: &mut RenderContext, size: u32) -> RenderTarget {
        if let Some(id) = self.free.get_mut(&size).and_then(Vec::pop) {
            self.slots[id.index()].state = SlotState::CheckedOut;
            self.stats.reused += 1;
            return RenderTarget { id, size };
        }

        let id = TargetId::new(self.slots.len() as u32);
        self.slots.push(Slot {
            size,
            state: SlotState::CheckedOut,
        });
        self.stats.created += 1;
        ctx.create_target(id, size);
        log::debug!(
            "render target pool grew to {} ({size}x{size} target {})",
            self.slots.len(),
            id.index()
        );
        RenderTarget { id, size }
    }

    /// Returns a target to its free list. GPU storage is kept.
    pub fn release(&mut self, target: RenderTarget) -> Result<(), RenderError> {
        let slot = self
            .slots
            .get_mut(target.id.index())
            .filter(|slot| slot.size == target.size)
            .ok_or(RenderError::UnknownTarget(target.id))?;

        if slot.state == SlotState::Pooled {
            return Err(RenderError::DoubleRelease(target.id));
        }
        slot.state = SlotState::Pooled;
        self.free.entry(target.size).or_default().push(target.id);
        Ok(())
    }

    /// Targets currently checked out.
    pub fn checked_out(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::CheckedOut)
            .count()
    }

    /// Targets waiting on a free list.
    pub fn pooled(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    #[inline]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{GpuCmd, Viewport};

    fn ctx() -> RenderContext {
        RenderContext::new(Viewport::square(256))
    }

    fn creations(ctx: &RenderContext) -> usize {
        ctx.commands()
            .iter()
            .filter(|c| matches!(c, GpuCmd::CreateTarget { .. }))
            .count()
    }

    #[test]
    fn release_then_acquire_returns_same_handle() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();

        let a = pool.acquire(&mut ctx, 544);
        let id = a.id();
        pool.release(a).unwrap();
        let b = pool.acquire(&mut ctx, 544);

        assert_eq!(b.id(), id);
        assert_eq!(creations(&ctx), 1);
        assert_eq!(pool.stats(), PoolStats { created: 1, reused: 1 });
    }

    #[test]
    fn sizes_have_separate_free_lists() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();

        let a = pool.acquire(&mut ctx, 256);
        pool.release(a).unwrap();
        let b = pool.acquire(&mut ctx, 512);

        assert_eq!(b.size(), 512);
        assert_eq!(creations(&ctx), 2);
        assert_eq!(pool.pooled(), 1);
        assert_eq!(pool.checked_out(), 1);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();

        let a = pool.acquire(&mut ctx, 64);
        let b = pool.acquire(&mut ctx, 64);
        let (a_id, b_id) = (a.id(), b.id());
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        assert_eq!(pool.acquire(&mut ctx, 64).id(), b_id);
        assert_eq!(pool.acquire(&mut ctx, 64).id(), a_id);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut ctx = ctx();
        let mut pool = RenderTargetPool::new();

        let a = pool.acquire(&mut ctx, 128);
        let forged = RenderTarget { id: a.id(), size: a.size() };
        pool.release(a).unwrap();

        assert_eq!(pool.release(forged), Err(RenderError::DoubleRelease(TargetId::new(0))));
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn foreign_target_is_rejected() {
        let mut pool = RenderTargetPool::new();
        let stray = RenderTarget { id: TargetId::new(7), size: 128 };
        assert_eq!(pool.release(stray), Err(RenderError::UnknownTarget(TargetId::new(7))));
    }
}
