//! Timeout-driven callbacks
//!
//! Entries accumulate frame time and fire when it reaches their timeout.
//! Callbacks get the owning context (normally the [`World`](crate::World))
//! and may start or stop timers, including their own, while the scheduler
//! is ticking.

use std::ops::ControlFlow;

pub type TimerCallback<C> = Box<dyn FnMut(&mut C) -> ControlFlow<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Timer<C> {
    id: TimerId,
    elapsed: f32,
    timeout: f32,
    repeat: bool,
    /// Taken out while the callback runs
    callback: Option<TimerCallback<C>>,
}

pub struct Scheduler<C> {
    timers: Vec<Timer<C>>,
    next_id: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a callback firing after `timeout` seconds
    ///
    /// Repeating timers fire every `timeout` until stopped or until the
    /// callback returns [`ControlFlow::Break`].
    pub fn start<F>(&mut self, timeout: f32, repeat: bool, callback: F) -> TimerId
    where
        F: FnMut(&mut C) -> ControlFlow<()> + Send + 'static,
    {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        self.timers.push(Timer {
            id,
            elapsed: 0.0,
            timeout,
            repeat,
            callback: Some(Box::new(callback)),
        });
        id
    }

    /// Returns true if the timer was still registered
    pub fn stop(&mut self, id: TimerId) -> bool {
        if let Some(pos) = self.timers.iter().position(|t| t.id == id) {
            self.timers.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn stop_all(&mut self) {
        self.timers.clear();
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance every timer by `dt` seconds and fire the due ones
    ///
    /// `scheduler` locates this scheduler inside `ctx`. Timers started
    /// during the tick first advance on the next one. Returns the number of
    /// callbacks fired.
    pub fn tick(ctx: &mut C, dt: f32, scheduler: fn(&mut C) -> &mut Scheduler<C>) -> usize {
        let ids: Vec<TimerId> = scheduler(ctx).timers.iter().map(|t| t.id).collect();
        let mut fired = 0;

        for id in ids {
            let timers = &mut scheduler(ctx).timers;
            // Stopped by an earlier callback
            let Some(timer) = timers.iter_mut().find(|t| t.id == id) else {
                continue;
            };

            timer.elapsed += dt;
            if timer.elapsed < timer.timeout {
                continue;
            }
            timer.elapsed = 0.0;

            let Some(mut callback) = timer.callback.take() else {
                continue;
            };
            let flow = callback(ctx);
            fired += 1;

            let timers = &mut scheduler(ctx).timers;
            if let Some(pos) = timers.iter().position(|t| t.id == id) {
                if flow.is_break() || !timers[pos].repeat {
                    timers.remove(pos);
                } else {
                    timers[pos].callback = Some(callback);
                }
            }
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ctx {
        scheduler: Scheduler<Ctx>,
        fired: Vec<u32>,
    }

    fn scheduler_of(ctx: &mut Ctx) -> &mut Scheduler<Ctx> {
        &mut ctx.scheduler
    }

    fn run(ctx: &mut Ctx, dt: f32, ticks: usize) {
        for _ in 0..ticks {
            Scheduler::tick(ctx, dt, scheduler_of);
        }
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut ctx = Ctx::default();
        let id = ctx.scheduler.start(1.0, false, |ctx: &mut Ctx| {
            ctx.fired.push(1);
            ControlFlow::Continue(())
        });

        run(&mut ctx, 0.25, 3);
        assert!(ctx.fired.is_empty());

        run(&mut ctx, 0.25, 1);
        assert_eq!(ctx.fired, vec![1]);
        assert!(!ctx.scheduler.contains(id));

        run(&mut ctx, 0.25, 8);
        assert_eq!(ctx.fired, vec![1]);
    }

    #[test]
    fn test_repeat_fires_every_timeout() {
        let mut ctx = Ctx::default();
        let id = ctx.scheduler.start(0.5, true, |ctx: &mut Ctx| {
            ctx.fired.push(ctx.fired.len() as u32);
            ControlFlow::Continue(())
        });

        run(&mut ctx, 0.25, 8);
        assert_eq!(ctx.fired.len(), 4);

        assert!(ctx.scheduler.stop(id));
        run(&mut ctx, 0.25, 8);
        assert_eq!(ctx.fired.len(), 4);
    }

    #[test]
    fn test_break_removes_repeating() {
        let mut ctx = Ctx::default();
        ctx.scheduler.start(0.5, true, |ctx: &mut Ctx| {
            ctx.fired.push(0);
            if ctx.fired.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        run(&mut ctx, 0.5, 10);
        assert_eq!(ctx.fired.len(), 2);
        assert!(ctx.scheduler.is_empty());
    }

    #[test]
    fn test_callback_stops_other_timer() {
        let mut ctx = Ctx::default();
        let victim = ctx.scheduler.start(2.0, false, |ctx: &mut Ctx| {
            ctx.fired.push(99);
            ControlFlow::Continue(())
        });
        ctx.scheduler.start(1.0, false, move |ctx: &mut Ctx| {
            ctx.scheduler.stop(victim);
            ctx.fired.push(1);
            ControlFlow::Continue(())
        });

        run(&mut ctx, 1.0, 4);
        assert_eq!(ctx.fired, vec![1]);
        assert!(ctx.scheduler.is_empty());
    }

    #[test]
    fn test_callback_starts_timer() {
        let mut ctx = Ctx::default();
        ctx.scheduler.start(1.0, false, |ctx: &mut Ctx| {
            ctx.fired.push(1);
            ctx.scheduler.start(1.0, false, |ctx: &mut Ctx| {
                ctx.fired.push(2);
                ControlFlow::Continue(())
            });
            ControlFlow::Continue(())
        });

        run(&mut ctx, 1.0, 1);
        assert_eq!(ctx.fired, vec![1]);
        assert_eq!(ctx.scheduler.len(), 1);

        run(&mut ctx, 1.0, 1);
        assert_eq!(ctx.fired, vec![1, 2]);
    }

    #[test]
    fn test_stop_all_from_callback() {
        let mut ctx = Ctx::default();
        ctx.scheduler.start(1.0, true, |ctx: &mut Ctx| {
            ctx.fired.push(1);
            ctx.scheduler.stop_all();
            ControlFlow::Continue(())
        });
        ctx.scheduler.start(1.0, true, |ctx: &mut Ctx| {
            ctx.fired.push(2);
            ControlFlow::Continue(())
        });

        run(&mut ctx, 1.0, 3);
        assert_eq!(ctx.fired, vec![1]);
    }
}
