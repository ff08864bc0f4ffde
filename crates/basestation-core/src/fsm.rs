//! 状态机驱动
//!
//! 每个单元把状态拆成 entry / do / exit 三个函数，由这里的通用驱动负责
//! 公共的转换序列：exit(旧状态) → 设置新状态 → entry(新状态)。
//!
//! entry 和 do 通过返回 [`Step::Goto`] 请求转换，而不是在函数内部递归调用
//! `transition()`。entry 中请求的转换会被立即跟随（例如初始化失败直接进入 Error）。

use std::fmt;
use tracing::debug;

/// 单步执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<S> {
    /// 保持当前状态
    Stay,
    /// 转换到指定状态
    Goto(S),
}

/// entry / do / exit 三段式状态机
///
/// `C` 是驱动时传入的上下文（例如 PositioningUnit 的组播发送能力）。
pub trait Lifecycle<C: ?Sized> {
    type State: Copy + PartialEq + fmt::Debug;

    /// 当前状态
    fn current(&self) -> Self::State;

    /// 直接替换状态（不执行 entry/exit，仅供驱动使用）
    fn replace(&mut self, next: Self::State);

    /// 当前状态的 entry
    fn on_entry(&mut self, ctx: &mut C) -> Step<Self::State>;

    /// 当前状态的 do（每个 tick 执行一次）
    fn on_do(&mut self, ctx: &mut C) -> Step<Self::State>;

    /// 当前状态的 exit
    fn on_exit(&mut self, ctx: &mut C);
}

/// 执行当前状态的 entry（用于初始状态，不调用 exit）
pub fn enter<M, C>(machine: &mut M, ctx: &mut C)
where
    M: Lifecycle<C> + ?Sized,
    C: ?Sized,
{
    if let Step::Goto(next) = machine.on_entry(ctx) {
        transition(machine, ctx, next);
    }
}

/// 转换到 `next`，并跟随 entry 中请求的后续转换
pub fn transition<M, C>(machine: &mut M, ctx: &mut C, next: M::State)
where
    M: Lifecycle<C> + ?Sized,
    C: ?Sized,
{
    let mut next = next;
    loop {
        let prev = machine.current();
        machine.on_exit(ctx);
        machine.replace(next);
        debug!("state transition {:?} -> {:?}", prev, next);

        match machine.on_entry(ctx) {
            Step::Stay => return,
            Step::Goto(following) => next = following,
        }
    }
}

/// 执行一次当前状态的 do；若请求转换则立即转换
pub fn tick<M, C>(machine: &mut M, ctx: &mut C)
where
    M: Lifecycle<C> + ?Sized,
    C: ?Sized,
{
    if let Step::Goto(next) = machine.on_do(ctx) {
        transition(machine, ctx, next);
    }
}
