//! Normalized-progress interpolation driven by frame time
//!
//! A tween waits out its delay, then advances `t` from 0 to 1 over its
//! duration, calling its update callback every tick with the new `t`. It
//! completes when `t` reaches 1 or when the update callback returns true,
//! and the completion callback fires exactly once.

pub type TweenUpdate<C> = Box<dyn FnMut(f32, &mut C) -> bool + Send>;
pub type TweenComplete<C> = Box<dyn FnOnce(&mut C) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TweenId(u64);

pub struct Tween<C> {
    delay: f32,
    duration: f32,
    update: Option<TweenUpdate<C>>,
    complete: Option<TweenComplete<C>>,
}

impl<C> Tween<C> {
    /// `update` receives the progress in `[0, 1]`; returning true finishes
    /// the tween early
    pub fn new<F>(duration: f32, update: F) -> Self
    where
        F: FnMut(f32, &mut C) -> bool + Send + 'static,
    {
        Self {
            delay: 0.0,
            duration,
            update: Some(Box::new(update)),
            complete: None,
        }
    }

    /// Seconds to wait before progress starts
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_complete<F>(mut self, complete: F) -> Self
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.complete = Some(Box::new(complete));
        self
    }
}

struct Running<C> {
    id: TweenId,
    tween: Tween<C>,
    elapsed: f32,
    t: f32,
}

pub struct Tweener<C> {
    running: Vec<Running<C>>,
    next_id: u64,
}

impl<C> Default for Tweener<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Tweener<C> {
    pub fn new() -> Self {
        Self {
            running: Vec::new(),
            next_id: 1,
        }
    }

    pub fn start(&mut self, tween: Tween<C>) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;

        self.running.push(Running {
            id,
            tween,
            elapsed: 0.0,
            t: 0.0,
        });
        id
    }

    /// Current progress, `None` once the tween has completed
    pub fn progress(&self, id: TweenId) -> Option<f32> {
        self.running.iter().find(|r| r.id == id).map(|r| r.t)
    }

    /// Drop a tween without completing it
    pub fn cancel(&mut self, id: TweenId) -> bool {
        if let Some(pos) = self.running.iter().position(|r| r.id == id) {
            self.running.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Jump a tween to `t = 1` and run its completion now
    pub fn finish(ctx: &mut C, id: TweenId, tweener: fn(&mut C) -> &mut Tweener<C>) -> bool {
        let running = &mut tweener(ctx).running;
        let Some(pos) = running.iter().position(|r| r.id == id) else {
            return false;
        };

        let entry = running.remove(pos);
        if let Some(complete) = entry.tween.complete {
            complete(ctx);
        }
        true
    }

    /// Advance every tween by `dt` seconds. Returns the number completed.
    pub fn tick(ctx: &mut C, dt: f32, tweener: fn(&mut C) -> &mut Tweener<C>) -> usize {
        let ids: Vec<TweenId> = tweener(ctx).running.iter().map(|r| r.id).collect();
        let mut completed = 0;

        for id in ids {
            let running = &mut tweener(ctx).running;
            let Some(entry) = running.iter_mut().find(|r| r.id == id) else {
                continue;
            };

            if entry.tween.delay > 0.0 {
                entry.tween.delay -= dt;
                continue;
            }

            entry.elapsed += dt;
            entry.t = if entry.tween.duration > 0.0 {
                (entry.elapsed / entry.tween.duration).min(1.0)
            } else {
                1.0
            };
            let t = entry.t;

            let finished_early = match entry.tween.update.take() {
                Some(mut update) => {
                    let done = update(t, ctx);
                    if let Some(entry) = tweener(ctx).running.iter_mut().find(|r| r.id == id) {
                        entry.tween.update = Some(update);
                    }
                    done
                }
                None => false,
            };

            let running = &mut tweener(ctx).running;
            // Finished or cancelled from inside its own update
            let Some(pos) = running.iter().position(|r| r.id == id) else {
                continue;
            };

            if finished_early || t >= 1.0 {
                let entry = running.remove(pos);
                if let Some(complete) = entry.tween.complete {
                    complete(ctx);
                }
                completed += 1;
            }
        }

        completed
    }
}
